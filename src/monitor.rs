//! Verbose traffic mirror.
//!
//! When enabled, each non-empty transfer is written as one line with a
//! direction marker: `▼` for browser to device, `▲` for device to browser.
//! The mirror is observational only and never fails the caller.

use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

/// Direction of a transfer across the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Browser to device.
    Down,
    /// Device to browser.
    Up,
}

impl Direction {
    pub fn marker(self) -> &'static str {
        match self {
            Self::Down => "▼",
            Self::Up => "▲",
        }
    }
}

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Mirrors bridge traffic to a diagnostic writer.
#[derive(Clone, Default)]
pub struct TrafficMonitor {
    sink: Option<Sink>,
}

impl TrafficMonitor {
    /// A monitor that records nothing.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Mirror to standard output.
    pub fn stdout() -> Self {
        Self::to_writer(std::io::stdout())
    }

    /// Mirror to an arbitrary writer.
    pub fn to_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Some(Arc::new(Mutex::new(Box::new(writer)))),
        }
    }

    /// Stdout when `verbose`, otherwise disabled.
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Self::stdout()
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Record one transfer. Empty transfers and write errors are ignored.
    pub fn record(&self, direction: Direction, bytes: &[u8]) {
        let Some(sink) = &self.sink else {
            return;
        };
        if bytes.is_empty() {
            return;
        }
        let line = format!("{} {}\n", direction.marker(), escape_bytes(bytes));
        let mut out = sink.lock();
        let _ = out.write_all(line.as_bytes());
        let _ = out.flush();
    }
}

impl std::fmt::Debug for TrafficMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrafficMonitor")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Render bytes as an escaped byte-string literal, e.g. `b"PING\n"`.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 3);
    out.push_str("b\"");
    for &b in bytes {
        out.extend(std::ascii::escape_default(b).map(char::from));
    }
    out.push('"');
    out
}
