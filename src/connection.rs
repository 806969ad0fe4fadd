//! Ownership of the single serial handle.
//!
//! `ConnectionManager` is the only place a serial handle lives. Every bridge
//! session shares one manager, so there is never more than one open handle.
//! Reconnection is lazy: callers invoke [`ConnectionManager::ensure_connected`]
//! at the start of each read or write, and a failed read or write simply
//! drops the handle so the next call reopens it.
//!
//! ```text
//! Downlink ─┐                      ┌─> DeviceResolver (which path?)
//!           ├──> ConnectionManager ┤
//! Uplink  ──┘                      └─> PortOpener (open that path)
//! ```

use crate::device::{DeviceResolver, Mcu, ResolveError};
use crate::port::{PortAdapter, PortConfiguration, PortError, PortOpener, SystemOpener};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failure to (re)establish the serial connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// No port matched the configured board.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A port was found but could not be opened.
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: PortError,
    },
}

/// Owns the serial handle and reopens it on demand.
pub struct ConnectionManager {
    mcu: &'static Mcu,
    resolver: DeviceResolver,
    opener: Box<dyn PortOpener>,
    link: PortConfiguration,
    /// `None` while disconnected. The lock also serialises individual reads
    /// and writes, so one message is never interleaved with another.
    port: Mutex<Option<PortAdapter>>,
    open_attempts: AtomicU64,
    opens: AtomicU64,
}

impl ConnectionManager {
    /// Create a disconnected manager for `mcu`.
    pub fn new(mcu: &'static Mcu, resolver: DeviceResolver, opener: Box<dyn PortOpener>) -> Self {
        Self {
            mcu,
            resolver,
            opener,
            link: PortConfiguration::bridge_link(),
            port: Mutex::new(None),
            open_attempts: AtomicU64::new(0),
            opens: AtomicU64::new(0),
        }
    }

    /// Manager backed by the operating system's ports.
    pub fn system(mcu: &'static Mcu) -> Self {
        Self::new(mcu, DeviceResolver::system(), Box::new(SystemOpener))
    }

    /// The board this manager connects to.
    pub fn mcu(&self) -> &'static Mcu {
        self.mcu
    }

    /// Whether a handle is currently open.
    pub fn is_connected(&self) -> bool {
        self.port.lock().is_some()
    }

    /// Resolve the device and open it, replacing any open handle.
    ///
    /// Returns the path that was opened.
    pub fn connect(&self) -> Result<String, ConnectError> {
        let mut slot = self.port.lock();
        if let Some(old) = slot.take() {
            debug!("Dropping existing handle on {}", old.name());
        }
        self.open_into(&mut slot)
    }

    /// Reopen the handle if it is closed.
    ///
    /// Returns `Ok(true)` when a new handle was opened and `Ok(false)` when one
    /// was already open, in which case nothing is resolved or opened.
    pub fn ensure_connected(&self) -> Result<bool, ConnectError> {
        let mut slot = self.port.lock();
        if slot.is_some() {
            return Ok(false);
        }
        info!("Serial disconnected, reconnecting to {}", self.mcu.nickname_determiner);
        self.open_into(&mut slot).map(|_| true)
    }

    fn open_into(&self, slot: &mut Option<PortAdapter>) -> Result<String, ConnectError> {
        self.open_attempts.fetch_add(1, Ordering::SeqCst);
        let resolution = self.resolver.find_port(self.mcu)?;
        let port = self
            .opener
            .open(&resolution.path, &self.link)
            .map_err(|source| ConnectError::Open {
                path: resolution.path.clone(),
                source,
            })?;

        self.opens.fetch_add(1, Ordering::SeqCst);
        info!(path = %resolution.path, "Serial port opened");
        *slot = Some(port);
        Ok(resolution.path)
    }

    /// Close the handle. The next `ensure_connected` reopens it.
    pub fn close(&self) {
        if let Some(port) = self.port.lock().take() {
            debug!("Closed serial handle {}", port.name());
        }
    }

    /// Write all of `data` to the device.
    ///
    /// On failure the handle is closed and the error logged; the caller does
    /// not need to clean up.
    pub fn write(&self, data: &[u8]) -> Result<usize, PortError> {
        let mut slot = self.port.lock();
        let port = slot.as_mut().ok_or(PortError::NotOpen)?;
        match port.write_bytes(data) {
            Ok(n) => Ok(n),
            Err(e) => {
                warn!("failing on write: {}", e);
                *slot = None;
                Err(e)
            }
        }
    }

    /// Read up to `max` bytes, waiting at most the link's read timeout.
    ///
    /// An expired timeout yields an empty vector. On failure the handle is
    /// closed and the error logged.
    pub fn read(&self, max: usize) -> Result<Vec<u8>, PortError> {
        let mut slot = self.port.lock();
        let port = slot.as_mut().ok_or(PortError::NotOpen)?;
        let mut buffer = vec![0u8; max];
        match port.read_bytes(&mut buffer) {
            Ok(n) => {
                buffer.truncate(n);
                Ok(buffer)
            }
            Err(e) if e.is_timeout() => Ok(Vec::new()),
            Err(e) => {
                warn!("failing on read: {}", e);
                *slot = None;
                Err(e)
            }
        }
    }

    /// Number of reconnect attempts (resolve + open), successful or not.
    pub fn open_attempts(&self) -> u64 {
        self.open_attempts.load(Ordering::SeqCst)
    }

    /// Number of handles successfully opened.
    pub fn opens(&self) -> u64 {
        self.opens.load(Ordering::SeqCst)
    }

    // Async wrappers. Serial calls block for up to the read timeout, so they run
    // on the blocking pool to keep the event loop free for the sibling task.

    /// [`Self::ensure_connected`] without blocking the runtime.
    pub async fn ensure_connected_async(self: &Arc<Self>) -> Result<bool, ConnectError> {
        if self.is_connected() {
            return Ok(false);
        }
        let this = Arc::clone(self);
        tokio::task::spawn_blocking(move || this.ensure_connected())
            .await
            .map_err(|e| ConnectError::Open {
                path: String::new(),
                source: PortError::Io(std::io::Error::other(e)),
            })?
    }

    /// [`Self::write`] without blocking the runtime.
    pub async fn write_async(self: &Arc<Self>, data: Vec<u8>) -> Result<usize, PortError> {
        let this = Arc::clone(self);
        tokio::task::spawn_blocking(move || this.write(&data))
            .await
            .map_err(|e| PortError::Io(std::io::Error::other(e)))?
    }

    /// [`Self::read`] without blocking the runtime.
    pub async fn read_async(self: &Arc<Self>, max: usize) -> Result<Vec<u8>, PortError> {
        let this = Arc::clone(self);
        tokio::task::spawn_blocking(move || this.read(max))
            .await
            .map_err(|e| PortError::Io(std::io::Error::other(e)))?
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("mcu", &self.mcu.nickname)
            .field("connected", &self.is_connected())
            .field("open_attempts", &self.open_attempts())
            .finish()
    }
}
