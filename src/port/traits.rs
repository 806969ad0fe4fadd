//! Core traits for serial port abstraction.
//!
//! Defines the `SerialPortAdapter` trait that lets the real serial port and
//! `MockSerialPort` be used interchangeably by the connection manager, plus
//! the `PortOpener` seam through which handles are (re)opened.

use super::error::PortError;
use std::time::Duration;

/// Baud rate of the bridge link.
pub const BRIDGE_BAUD_RATE: u32 = 115_200;

/// Read timeout of the bridge link. Keeps the uplink loop responsive.
pub const BRIDGE_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Configuration parameters for a serial port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfiguration {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Number of data bits per character.
    pub data_bits: DataBits,

    /// Flow control mode.
    pub flow_control: FlowControl,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Read timeout. A read that expires returns zero bytes.
    pub timeout: Duration,
}

impl PortConfiguration {
    /// The fixed link used between the bridge and the firmware:
    /// 115200 baud, 8N1, no flow control, 10ms read timeout.
    pub fn bridge_link() -> Self {
        Self {
            baud_rate: BRIDGE_BAUD_RATE,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            timeout: BRIDGE_READ_TIMEOUT,
        }
    }
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self::bridge_link()
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Seven,
    Eight,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// Trait for serial port I/O operations.
///
/// Implementations are blocking; callers on the async runtime move them onto
/// the blocking pool.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Blocks for at most the configured timeout. Returns `Ok(0)` when the
    /// timeout expires with nothing received.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;
}

/// A boxed adapter, as owned by the connection manager.
pub type PortAdapter = Box<dyn SerialPortAdapter>;

/// Opens serial handles.
///
/// The connection manager only ever opens ports through this trait, which
/// lets tests count and script open attempts.
pub trait PortOpener: Send + Sync {
    fn open(&self, path: &str, config: &PortConfiguration) -> Result<PortAdapter, PortError>;
}
