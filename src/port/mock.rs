//! Mock serial port implementation for testing.
//!
//! Provides a `MockSerialPort` that simulates serial port behavior without
//! requiring actual hardware, with fault injection for writes and control
//! lines, plus a `MockConnector` that hands out clones of one mock port.

use super::error::PortError;
use super::traits::{PortConfiguration, PortConnector, SerialPortAdapter};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// One observable operation performed on a mock port, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    /// Input and output buffers were discarded.
    Clear,
    /// A write was attempted with these bytes (whether or not it failed).
    Write(Vec<u8>),
    /// RTS was dropped.
    ClearRts,
    /// RTS was read back.
    ReadRts,
}

/// How the next injected write failure should look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteFault {
    /// Transient busy line (`WouldBlock`).
    #[default]
    Busy,
    /// Device gone (`BrokenPipe`).
    Disconnected,
    /// Only the first half of the data is accepted.
    Short,
}

/// Inner state of the mock port, protected by a mutex for interior mutability.
#[derive(Debug)]
struct MockPortState {
    /// Every operation in call order.
    events: Vec<MockEvent>,
    /// Every byte the port accepted, in order, partial writes included.
    wire: Vec<u8>,
    /// Timestamp of every write attempt.
    write_attempts: Vec<Instant>,
    /// Faults for the upcoming writes, consumed one per write.
    write_faults: VecDeque<WriteFault>,
    /// Whether clearing buffers should fail.
    fail_clear: bool,
    /// Whether dropping RTS should fail.
    fail_clear_rts: bool,
    /// Whether reading RTS back should fail.
    fail_read_rts: bool,
    /// Current RTS level.
    rts: bool,
    /// Whether `read_rts` claims to query the line.
    rts_from_line: bool,
}

impl Default for MockPortState {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            wire: Vec::new(),
            write_attempts: Vec::new(),
            write_faults: VecDeque::new(),
            fail_clear: false,
            fail_clear_rts: false,
            fail_read_rts: false,
            // Lines come up asserted after open on most adapters.
            rts: true,
            rts_from_line: true,
        }
    }
}

/// Mock serial port implementation for testing.
///
/// Clones share state, so a test can keep one handle for inspection while
/// the transport owns another.
///
/// # Example
/// ```
/// use flatfield_serial::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.fail_next_writes(1);
///
/// assert!(port.write_bytes(b"close\n").is_err());
/// assert_eq!(port.write_bytes(b"close\n").unwrap(), 6);
///
/// assert_eq!(port.write_attempts(), 2);
/// assert_eq!(port.get_write_log(), vec![b"close\n".to_vec()]);
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
            state: Arc::new(Mutex::new(MockPortState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockPortState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `count` writes fail with a transient busy error.
    pub fn fail_next_writes(&mut self, count: usize) {
        self.fail_next_writes_with(count, WriteFault::Busy);
    }

    /// Make the next `count` writes fail with the given fault.
    pub fn fail_next_writes_with(&mut self, count: usize, fault: WriteFault) {
        self.state().write_faults = std::iter::repeat(fault).take(count).collect();
    }

    /// Make the next writes fail with `faults`, one per write, in order.
    pub fn fail_next_writes_in_order(&mut self, faults: &[WriteFault]) {
        self.state().write_faults = faults.iter().copied().collect();
    }

    /// Make buffer clearing fail (or succeed again).
    pub fn set_fail_clear(&mut self, fail: bool) {
        self.state().fail_clear = fail;
    }

    /// Make dropping RTS fail (or succeed again).
    pub fn set_fail_clear_rts(&mut self, fail: bool) {
        self.state().fail_clear_rts = fail;
    }

    /// Make the RTS read-back fail (or succeed again).
    pub fn set_fail_read_rts(&mut self, fail: bool) {
        self.state().fail_read_rts = fail;
    }

    /// Make the port behave like one whose RTS read-back only echoes the
    /// last written level.
    pub fn set_rts_echo_only(&mut self, echo_only: bool) {
        self.state().rts_from_line = !echo_only;
    }

    /// Get the accepted byte stream cut into newline-terminated lines.
    ///
    /// A trailing line without terminator is returned as-is.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state()
            .wire
            .split_inclusive(|&b| b == b'\n')
            .map(<[u8]>::to_vec)
            .collect()
    }

    /// Every byte the port accepted, exactly as it went out.
    pub fn wire(&self) -> Vec<u8> {
        self.state().wire.clone()
    }

    /// Get a copy of every operation performed, in order.
    pub fn events(&self) -> Vec<MockEvent> {
        self.state().events.clone()
    }

    /// Number of write attempts, failed ones included.
    pub fn write_attempts(&self) -> usize {
        self.state().write_attempts.len()
    }

    /// Timestamps of every write attempt.
    pub fn write_attempt_times(&self) -> Vec<Instant> {
        self.state().write_attempts.clone()
    }

    /// Number of times the buffers were cleared.
    pub fn clear_count(&self) -> usize {
        self.state()
            .events
            .iter()
            .filter(|e| matches!(e, MockEvent::Clear))
            .count()
    }

    /// Current RTS level.
    pub fn rts(&self) -> bool {
        self.state().rts
    }

    /// Forget all recorded events and writes. Fault settings are kept.
    pub fn reset_log(&mut self) {
        let mut state = self.state();
        state.events.clear();
        state.wire.clear();
        state.write_attempts.clear();
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state();
        state.events.push(MockEvent::Write(data.to_vec()));
        state.write_attempts.push(Instant::now());

        if let Some(fault) = state.write_faults.pop_front() {
            return match fault {
                WriteFault::Busy => Err(PortError::Io(std::io::Error::new(
                    std::io::ErrorKind::WouldBlock,
                    "Resource temporarily unavailable",
                ))),
                WriteFault::Disconnected => Err(PortError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "Broken pipe",
                ))),
                WriteFault::Short => {
                    let accepted = data.len() / 2;
                    state.wire.extend_from_slice(&data[..accepted]);
                    Ok(accepted)
                }
            };
        }

        state.wire.extend_from_slice(data);
        Ok(data.len())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        let mut state = self.state();
        state.events.push(MockEvent::Clear);
        if state.fail_clear {
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "tcflush failed",
            )));
        }
        Ok(())
    }

    fn clear_rts(&mut self) -> Result<(), PortError> {
        let mut state = self.state();
        state.events.push(MockEvent::ClearRts);
        if state.fail_clear_rts {
            return Err(PortError::control_line("Inappropriate ioctl for device"));
        }
        state.rts = false;
        Ok(())
    }

    fn read_rts(&mut self) -> Result<bool, PortError> {
        let mut state = self.state();
        state.events.push(MockEvent::ReadRts);
        if state.fail_read_rts {
            return Err(PortError::control_line("Input/output error"));
        }
        Ok(state.rts)
    }

    fn reads_rts_from_line(&self) -> bool {
        self.state().rts_from_line
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("write_attempts", &self.write_attempts())
            .finish()
    }
}

/// Connector that hands out clones of a single [`MockSerialPort`].
#[derive(Debug, Clone)]
pub struct MockConnector {
    port: MockSerialPort,
    state: Arc<Mutex<ConnectorState>>,
}

#[derive(Debug, Default)]
struct ConnectorState {
    opened: Vec<(String, PortConfiguration)>,
    fail_open: bool,
}

impl MockConnector {
    /// Create a connector around `port`.
    pub fn new(port: MockSerialPort) -> Self {
        Self {
            port,
            state: Arc::new(Mutex::new(ConnectorState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, ConnectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make subsequent opens fail (or succeed again).
    pub fn set_fail_open(&self, fail: bool) {
        self.state().fail_open = fail;
    }

    /// Addresses and settings of every successful open.
    pub fn opened(&self) -> Vec<(String, PortConfiguration)> {
        self.state().opened.clone()
    }

    /// A handle on the shared mock port.
    pub fn port(&self) -> MockSerialPort {
        self.port.clone()
    }
}

impl PortConnector for MockConnector {
    fn open(
        &self,
        address: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        let mut state = self.state();
        if state.fail_open {
            return Err(PortError::not_found(address));
        }
        state.opened.push((address.to_string(), config.clone()));
        Ok(Box::new(self.port.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_logging() {
        let mut port = MockSerialPort::new("MOCK0");
        port.write_bytes(b"close\n").unwrap();
        port.write_bytes(b"opena\n").unwrap();

        let log = port.get_write_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], b"close\n");
        assert_eq!(log[1], b"opena\n");
    }

    #[test]
    fn test_injected_failures_are_consumed() {
        let mut port = MockSerialPort::new("MOCK0");
        port.fail_next_writes(2);

        assert!(port.write_bytes(b"x").is_err());
        assert!(port.write_bytes(b"x").is_err());
        assert!(port.write_bytes(b"x").is_ok());
        assert_eq!(port.write_attempts(), 3);
        assert_eq!(port.get_write_log().len(), 1);
    }

    #[test]
    fn test_short_write_fault() {
        let mut port = MockSerialPort::new("MOCK0");
        port.fail_next_writes_with(1, WriteFault::Short);
        assert_eq!(port.write_bytes(b"00128\n").unwrap(), 3);
        assert_eq!(port.wire(), b"001".to_vec());

        assert_eq!(port.write_bytes(b"28\n").unwrap(), 3);
        assert_eq!(port.get_write_log(), vec![b"00128\n".to_vec()]);
    }

    #[test]
    fn test_disconnect_fault() {
        let mut port = MockSerialPort::new("MOCK0");
        port.fail_next_writes_with(1, WriteFault::Disconnected);
        let err = port.write_bytes(b"close\n").unwrap_err();
        assert!(err.is_disconnect());
    }

    #[test]
    fn test_rts_control() {
        let mut port = MockSerialPort::new("MOCK0");
        assert!(port.read_rts().unwrap());
        port.clear_rts().unwrap();
        assert!(!port.read_rts().unwrap());

        port.set_fail_read_rts(true);
        assert!(matches!(port.read_rts(), Err(PortError::ControlLine(_))));
    }

    #[test]
    fn test_events_in_order() {
        let mut port = MockSerialPort::new("MOCK0");
        port.clear_buffers().unwrap();
        port.write_bytes(b"a").unwrap();
        assert_eq!(
            port.events(),
            vec![MockEvent::Clear, MockEvent::Write(b"a".to_vec())]
        );
        assert_eq!(port.clear_count(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let port = MockSerialPort::new("MOCK0");
        let mut other = port.clone();
        other.write_bytes(b"shared").unwrap();
        assert_eq!(port.get_write_log(), vec![b"shared".to_vec()]);
    }

    #[test]
    fn test_connector_open_and_failure() {
        let connector = MockConnector::new(MockSerialPort::new("MOCK0"));
        let config = PortConfiguration::default();

        let port = connector.open("/dev/ttyMOCK", &config).unwrap();
        assert_eq!(port.name(), "MOCK0");
        assert_eq!(connector.opened().len(), 1);

        connector.set_fail_open(true);
        assert!(matches!(
            connector.open("/dev/ttyMOCK", &config),
            Err(PortError::NotFound(_))
        ));
    }
}
