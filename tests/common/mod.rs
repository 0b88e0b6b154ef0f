//! Shared test utilities for the flat-field driver tests.
//!
//! Builds transports and devices over a shared [`MockSerialPort`] so tests
//! can inject faults and inspect the wire after the fact.

#![allow(dead_code)]

use flatfield_serial::device::FlatFieldDevice;
use flatfield_serial::port::{MockConnector, MockSerialPort, PortConfiguration};
use flatfield_serial::transport::{ConnectionHandle, RetryPolicy, Transport};
use std::time::Duration;

pub const MOCK_ADDRESS: &str = "/dev/ttyMOCK0";

/// Retry policy with a short delay for tests that do not measure timing.
pub fn quick_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(2))
}

/// A transport over a fresh mock, plus the connector for open-failure tests.
pub fn mock_transport(retry: RetryPolicy) -> (Transport, MockConnector) {
    let connector = MockConnector::new(MockSerialPort::new("MOCK0"));
    let transport = Transport::new(
        Box::new(connector.clone()),
        PortConfiguration::default(),
        retry,
    );
    (transport, connector)
}

/// A connected transport and its handle.
pub fn connected_transport(retry: RetryPolicy) -> (Transport, ConnectionHandle, MockSerialPort) {
    let (mut transport, connector) = mock_transport(retry);
    let handle = transport
        .connect(MOCK_ADDRESS)
        .expect("mock connect should succeed");
    (transport, handle, connector.port())
}

/// A connected device with the default initial brightness.
pub fn connected_device(retry: RetryPolicy) -> (FlatFieldDevice, MockSerialPort) {
    let (transport, connector) = mock_transport(retry);
    let mut device = FlatFieldDevice::new("Test Flat", transport, 255);
    device
        .connect(MOCK_ADDRESS)
        .expect("mock connect should succeed");
    let mut port = connector.port();
    port.reset_log();
    (device, port)
}

/// Frames the mock accepted, as strings.
pub fn frames(port: &MockSerialPort) -> Vec<String> {
    port.get_write_log()
        .into_iter()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .collect()
}
