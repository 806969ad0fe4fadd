//! Supported boards and serial port discovery.

pub mod registry;
pub mod resolver;

pub use registry::{by_index, by_vendor_id, device_list, Mcu, DEFAULT_DEVICE_INDEX, VALID_MCUS};
pub use resolver::{
    supported_board, DeviceResolver, DeviceSource, FixedPorts, PortEnumerator, PortInfo,
    Resolution, ResolveError, SystemPorts,
};
