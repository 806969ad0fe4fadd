//! Mock serial port implementation for testing.
//!
//! Provides a `MockSerialPort` that simulates a microcontroller on the other
//! end of the link without requiring hardware, and a `MockOpener` that hands
//! out that port while counting open attempts.

use super::error::PortError;
use super::traits::{PortAdapter, PortConfiguration, PortOpener, SerialPortAdapter};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Inner state of the mock port, protected by a mutex for interior mutability.
#[derive(Debug, Default)]
struct MockPortState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all bytes written to the port.
    write_log: Vec<Vec<u8>>,
    /// Fail the next write with a broken-pipe error.
    fail_next_write: bool,
    /// Fail the next read with a broken-pipe error.
    fail_next_read: bool,
    /// Number of read calls observed.
    read_calls: usize,
    /// How long an empty read blocks before returning zero bytes.
    timeout: Duration,
}

/// Mock serial port implementation for testing.
///
/// Clones share state, so a test keeps one clone to play the device side
/// while the bridge owns another.
///
/// # Example
/// ```
/// use serial_ws_bridge::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
///
/// // The simulated device emits telemetry
/// port.enqueue_read(b"\x0ctemp=21\n");
///
/// let mut buffer = [0u8; 100];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"\x0ctemp=21\n");
///
/// // Commands written by the bridge are recorded
/// port.write_bytes(b"PING\n").unwrap();
/// assert_eq!(port.get_write_log(), vec![b"PING\n".to_vec()]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    /// The port name/identifier.
    name: String,
    /// The internal state, wrapped in Arc<Mutex<>> for interior mutability.
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState {
                timeout: Duration::from_millis(10),
                ..Default::default()
            })),
        }
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    pub fn enqueue_read(&self, data: &[u8]) {
        let mut state = self.state.lock().unwrap();
        state.read_queue.extend(data);
    }

    /// Get a copy of all data written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state.write_log.clone()
    }

    /// All written bytes, concatenated in write order.
    pub fn written_bytes(&self) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        state.write_log.concat()
    }

    /// Make the next write fail as if the device was unplugged.
    pub fn fail_next_write(&self) {
        let mut state = self.state.lock().unwrap();
        state.fail_next_write = true;
    }

    /// Make the next read fail as if the device was unplugged.
    pub fn fail_next_read(&self) {
        let mut state = self.state.lock().unwrap();
        state.fail_next_read = true;
    }

    /// Number of `read_bytes` calls made so far.
    pub fn read_calls(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.read_calls
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.read_queue.len()
    }

    /// Set how long an empty read blocks before returning zero bytes.
    pub fn set_timeout(&self, timeout: Duration) {
        let mut state = self.state.lock().unwrap();
        state.timeout = timeout;
    }
}

fn unplugged() -> PortError {
    PortError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "device disconnected",
    ))
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock().unwrap();

        if state.fail_next_write {
            state.fail_next_write = false;
            return Err(unplugged());
        }

        state.write_log.push(data.to_vec());
        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let timeout = {
            let mut state = self.state.lock().unwrap();
            state.read_calls += 1;

            if state.fail_next_read {
                state.fail_next_read = false;
                return Err(unplugged());
            }

            let mut bytes_read = 0;
            for byte in buffer.iter_mut() {
                match state.read_queue.pop_front() {
                    Some(queued) => {
                        *byte = queued;
                        bytes_read += 1;
                    }
                    None => break,
                }
            }

            if bytes_read > 0 {
                return Ok(bytes_read);
            }
            state.timeout
        };

        // Nothing queued: behave like a real port and wait out the timeout
        std::thread::sleep(timeout);
        Ok(0)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

/// A `PortOpener` that hands out clones of one `MockSerialPort`.
///
/// Counts every open attempt and can be told to refuse opens, which is how
/// tests observe reconnect behaviour.
#[derive(Clone)]
pub struct MockOpener {
    port: MockSerialPort,
    attempts: Arc<AtomicUsize>,
    refuse: Arc<AtomicBool>,
}

impl MockOpener {
    pub fn new(port: MockSerialPort) -> Self {
        Self {
            port,
            attempts: Arc::new(AtomicUsize::new(0)),
            refuse: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Number of open attempts, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Make subsequent opens fail with `PortError::NotFound`.
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

impl PortOpener for MockOpener {
    fn open(&self, path: &str, _config: &PortConfiguration) -> Result<PortAdapter, PortError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(PortError::not_found(path));
        }
        Ok(Box::new(self.port.clone()))
    }
}
