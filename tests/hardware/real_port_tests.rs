//! Tests requiring an attached flat-field device.
//!
//! # Running Hardware Tests
//!
//! ```bash
//! export TEST_PORT=/dev/ttyACM0          # or COM3 on Windows
//! export TEST_BAUD=9600                  # optional, default: 9600
//!
//! cargo test --features hardware-tests -- --ignored
//! ```
//!
//! The light and cap will move. Keep the optics covered.

use flatfield_serial::device::{DustCap, FlatFieldDevice, LightBox};
use flatfield_serial::port::{PortConfiguration, SerialPortAdapter, SyncSerialPort, SystemConnector};
use flatfield_serial::transport::{LinkState, RetryPolicy, Transport};
use std::env;
use std::thread;
use std::time::Duration;

/// Get the test port from environment variable.
fn get_test_port() -> Option<String> {
    env::var("TEST_PORT").ok()
}

/// Get the test baud rate from environment variable (default: 9600).
fn get_test_baud() -> u32 {
    env::var("TEST_BAUD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(9600)
}

/// Skip test if hardware is not available.
fn skip_without_hardware() -> Option<String> {
    let port = get_test_port();
    if port.is_none() {
        println!("Skipping hardware test: TEST_PORT not set");
    }
    port
}

fn port_config() -> PortConfiguration {
    PortConfiguration {
        baud_rate: get_test_baud(),
        ..PortConfiguration::default()
    }
}

#[test]
#[ignore]
fn test_real_port_rts_can_be_dropped() {
    let Some(port_name) = skip_without_hardware() else {
        return;
    };

    let mut port = SyncSerialPort::open(&port_name, &port_config())
        .unwrap_or_else(|e| panic!("Port open failed: {e}"));

    port.clear_rts().expect("RTS clear");
    assert!(!port.read_rts().expect("RTS read-back"), "RTS still asserted");
}

#[test]
#[ignore]
fn test_real_device_light_cycle() {
    let Some(port_name) = skip_without_hardware() else {
        return;
    };

    let transport = Transport::new(
        Box::new(SystemConnector),
        port_config(),
        RetryPolicy::default(),
    );
    let mut device = FlatFieldDevice::new("Hardware Flat", transport, 255);
    device.connect(&port_name).expect("connect + handshake");
    assert_eq!(device.status().link, LinkState::Connected);

    device.set_brightness(32).expect("brightness 32");
    thread::sleep(Duration::from_millis(500));
    device.enable_light(false).expect("light off");
    thread::sleep(Duration::from_millis(500));
    device.enable_light(true).expect("light back on");
    assert_eq!(device.brightness(), Some(32));

    device.enable_light(false).expect("light off");
    device.disconnect();
}

#[test]
#[ignore]
fn test_real_device_cap_cycle() {
    let Some(port_name) = skip_without_hardware() else {
        return;
    };

    let transport = Transport::new(
        Box::new(SystemConnector),
        port_config(),
        RetryPolicy::default(),
    );
    let mut device = FlatFieldDevice::new("Hardware Flat", transport, 255);
    device.connect(&port_name).expect("connect + handshake");

    device.unpark().expect("unpark");
    thread::sleep(Duration::from_secs(5));
    device.park().expect("park");
}
