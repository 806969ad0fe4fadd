//! Serial to WebSocket bridge.
//!
//! Connects a browser-based control app to a microcontroller on a USB serial
//! port. The bridge finds the board by its USB vendor id, opens it at a fixed
//! link configuration, and relays bytes in both directions for every
//! WebSocket client on the loopback interface.
//!
//! # Modules
//!
//! - `device`: board registry and port resolution
//! - `port`: serial port abstraction, real and mock
//! - `connection`: the single shared serial handle with lazy reconnect
//! - `bridge`: per-client relay sessions
//! - `monitor`: optional traffic mirror on stdout
//! - `server`: WebSocket listener
//! - `config`: preferences file, environment overrides and wizard
//! - `logging`: tracing subscriber setup
//! - `error`: top-level error type

pub mod bridge;
pub mod config;
pub mod connection;
pub mod device;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod port;
pub mod server;

// Re-export commonly used types for convenience
pub use bridge::{Bridge, BridgeSettings, SessionEnd};
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
pub use connection::{ConnectError, ConnectionManager};
pub use device::{DeviceResolver, DeviceSource, Mcu, PortInfo, ResolveError, VALID_MCUS};
pub use error::{BridgeError, BridgeResult};
pub use monitor::{Direction, TrafficMonitor};
pub use port::{
    MockOpener, MockSerialPort, PortConfiguration, PortError, PortOpener, SerialPortAdapter,
    SyncSerialPort,
};
