//! Device selection through the connection manager.

use crate::common::{rig_with_ports, UNO_PATH, UNO_VID};
use serial_ws_bridge::device::{by_index, DeviceResolver, DeviceSource, FixedPorts, PortInfo};
use serial_ws_bridge::{BridgeError, ConnectError, ResolveError};

const TEENSY: usize = 0;
const UNO: usize = 1;

#[test]
fn test_single_generic_controller_wins_over_vendor_match() {
    // The generic converter reports a vendor id no board owns, yet it is
    // still chosen ahead of the real Uno listed after it
    let ports = vec![
        PortInfo::usb("/dev/ttyUSB7", 0x1234).with_product("USB-Serial Controller D"),
        PortInfo::usb(UNO_PATH, UNO_VID),
    ];
    let rig = rig_with_ports(UNO, ports, false);

    let path = rig.conn().connect().expect("generic controller accepted");
    assert_eq!(path, "/dev/ttyUSB7");
    assert_eq!(rig.opener.attempts(), 1);
}

#[test]
fn test_two_generic_controllers_fall_back_to_vendor_scan() {
    let ports = vec![
        PortInfo::usb("/dev/ttyUSB1", 0x1234).with_product("usb-serial controller"),
        PortInfo::usb("/dev/ttyUSB2", 0x4321).with_product("USB-Serial Controller"),
        PortInfo::usb("/dev/ttyACM0", 5824),
    ];
    let rig = rig_with_ports(TEENSY, ports, false);

    assert_eq!(rig.conn().connect().unwrap(), "/dev/ttyACM0");
}

#[test]
fn test_first_matching_port_in_enumeration_order() {
    let ports = vec![
        PortInfo::usb("/dev/ttyS0", 0x0001),
        PortInfo::usb("/dev/ttyUSB4", 9025),
        PortInfo::usb("/dev/ttyUSB5", UNO_VID),
    ];
    let resolver = DeviceResolver::new(Box::new(FixedPorts(ports)));

    let resolution = resolver.find_port(by_index(UNO).unwrap()).unwrap();
    assert_eq!(resolution.path, "/dev/ttyUSB4");
    assert!(!resolution.generic_controller);
}

#[test]
fn test_missing_device_is_fatal_with_guidance() {
    let ports = vec![PortInfo::usb("/dev/ttyUSB0", 4292).with_product("CP2102")];
    let rig = rig_with_ports(UNO, ports, false);

    let err = rig.conn().connect().unwrap_err();
    assert_eq!(rig.opener.attempts(), 0);

    let ConnectError::Resolve(resolve) = err else {
        panic!("expected a resolve error");
    };
    let guidance = resolve.guidance(DeviceSource::CommandLine);
    assert!(guidance.contains("I couldn't find your chosen device!"));
    assert!(guidance.contains("/dev/ttyUSB0 - CP2102 (Vendor ID: 4292)"));
    assert!(guidance.contains("I know you told me to search for an Uno"));
    assert!(guidance.contains("your ESP32?"));
    assert!(guidance.contains("ls -d /dev/ttyUSB*"));

    let fatal = BridgeError::from(resolve);
    assert!(matches!(fatal, BridgeError::DeviceNotFound(ResolveError::NotFound { .. })));
    assert_eq!(fatal.exit_code(), 1);
}

#[test]
fn test_preferences_guidance_mentions_wizard() {
    let resolver = DeviceResolver::new(Box::new(FixedPorts(vec![PortInfo::usb(
        "/dev/ttyUSB0",
        5824,
    )])));

    let err = resolver.find_port(by_index(UNO).unwrap()).unwrap_err();
    let guidance = err.guidance(DeviceSource::Preferences);
    assert!(guidance.contains("Your preferences told me to look for an Uno"));
    assert!(guidance.contains("-w flag"));
}
