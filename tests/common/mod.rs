//! Shared test utilities for the bridge tests.
//!
//! This module provides common test infrastructure including:
//! - A bridge wired to a mock device and a counting opener
//! - A cloneable capture buffer for the traffic mirror
//! - A helper that serves the bridge on an ephemeral loopback port

#![allow(dead_code)]

use serial_ws_bridge::device::{by_index, DeviceResolver, FixedPorts, PortInfo};
use serial_ws_bridge::port::{MockOpener, MockSerialPort};
use serial_ws_bridge::{Bridge, BridgeSettings, ConnectionManager, TrafficMonitor};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// Path the mock Uno enumerates at.
pub const UNO_PATH: &str = "/dev/ttyUSB0";

/// Uno vendor id (FTDI).
pub const UNO_VID: u16 = 10755;

/// Writer whose contents the test can inspect after handing it away.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Everything a test needs to drive and observe one bridge.
pub struct TestRig {
    pub bridge: Arc<Bridge>,
    pub device: MockSerialPort,
    pub opener: MockOpener,
    pub mirror: SharedBuf,
}

impl TestRig {
    pub fn conn(&self) -> &Arc<ConnectionManager> {
        self.bridge.connection()
    }
}

/// Settings with a short backoff so failure paths finish quickly.
pub fn fast_settings() -> BridgeSettings {
    BridgeSettings {
        read_backoff: Duration::from_millis(20),
        ..BridgeSettings::default()
    }
}

/// A bridge looking for an Uno, with one Uno plugged in.
pub fn uno_rig(verbose: bool) -> TestRig {
    rig_with_ports(1, vec![PortInfo::usb(UNO_PATH, UNO_VID)], verbose)
}

/// A bridge looking for registry entry `index` among `ports`.
pub fn rig_with_ports(index: usize, ports: Vec<PortInfo>, verbose: bool) -> TestRig {
    let device = MockSerialPort::new(UNO_PATH);
    let opener = MockOpener::new(device.clone());
    let mirror = SharedBuf::default();

    let conn = ConnectionManager::new(
        by_index(index).expect("valid registry index"),
        DeviceResolver::new(Box::new(FixedPorts(ports))),
        Box::new(opener.clone()),
    );
    let monitor = if verbose {
        TrafficMonitor::to_writer(mirror.clone())
    } else {
        TrafficMonitor::disabled()
    };

    TestRig {
        bridge: Arc::new(Bridge::new(Arc::new(conn), monitor, fast_settings())),
        device,
        opener,
        mirror,
    }
}

/// Serve `bridge` on 127.0.0.1 with an ephemeral port and return its URL.
pub async fn start_test_server(bridge: Arc<Bridge>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get address");

    tokio::spawn(async move {
        serial_ws_bridge::server::serve(listener, bridge)
            .await
            .expect("Server failed");
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    format!("ws://{}/", addr)
}

/// Poll `check` until it holds or `within` elapses.
pub async fn eventually(within: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
