//! Port-specific error types.
//!
//! Everything in here is recoverable from the bridge's point of view: the
//! failing handle is closed and reopened on the next traffic cycle.

use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Port configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Attempted to use a port that's not open.
    #[error("Port is not open")]
    NotOpen,

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this is the "no data before the timeout" condition, which
    /// callers treat as an empty read rather than a failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::TimedOut)
    }
}
