//! Port abstraction layer for serial communication.
//!
//! Provides the adapter and opener traits, the `serialport`-backed
//! implementation and a mock used throughout the tests.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::{MockOpener, MockSerialPort};
pub use sync_port::{SyncSerialPort, SystemOpener};
pub use traits::*;
