//! Top-level error type.
//!
//! Only two things end the process: the device missing at startup, and a
//! user interrupt. Serial hiccups during a session are handled inside the
//! bridge and never reach this type.

use crate::config::ConfigError;
use crate::connection::ConnectError;
use crate::device::ResolveError;
use crate::port::PortError;
use thiserror::Error;

/// A specialized `Result` type for startup and top-level operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Unified application error type.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No usable device at startup. Fatal, never retried.
    #[error("device not found: {0}")]
    DeviceNotFound(#[from] ResolveError),

    /// The device was found but the serial port failed.
    #[error("serial I/O error on {path}: {source}")]
    SerialIo {
        path: String,
        #[source]
        source: PortError,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ctrl-C or SIGTERM.
    #[error("interrupted")]
    Interrupted,
}

impl From<ConnectError> for BridgeError {
    fn from(err: ConnectError) -> Self {
        match err {
            ConnectError::Resolve(e) => Self::DeviceNotFound(e),
            ConnectError::Open { path, source } => Self::SerialIo { path, source },
        }
    }
}

impl BridgeError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Interrupted => 0,
            _ => 1,
        }
    }
}
