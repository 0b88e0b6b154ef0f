//! Serial command transport.
//!
//! Owns one serial port at a time and moves it through
//! `Disconnected -> Handshaking -> Connected`. Commands are written as
//! fixed-length frames after a buffer flush, with a bounded fixed-delay retry.
//! Delivery means the OS accepted every byte of the frame; the controller
//! never answers, so nothing is read back.
//!
//! # Example
//! ```
//! use flatfield_serial::command::Command;
//! use flatfield_serial::port::{MockConnector, MockSerialPort, PortConfiguration};
//! use flatfield_serial::transport::{RetryPolicy, Transport};
//!
//! let mock = MockSerialPort::new("MOCK0");
//! let connector = MockConnector::new(mock.clone());
//! let mut transport = Transport::new(
//!     Box::new(connector),
//!     PortConfiguration::default(),
//!     RetryPolicy::default(),
//! );
//!
//! let handle = transport.connect("/dev/ttyUSB0")?;
//! transport.send_command(&handle, &Command::Brightness(128))?;
//! assert_eq!(mock.get_write_log(), vec![b"00128\n".to_vec()]);
//! # Ok::<(), flatfield_serial::DriverError>(())
//! ```

use crate::command::{Command, Frame};
use crate::error::{DriverError, DriverResult};
use crate::port::{PortConfiguration, PortConnector, PortError, SerialPortAdapter};
use serde::Serialize;
use std::io;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default number of write attempts per command.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause after a failed write attempt.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Fixed-delay retry budget for a single command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Total write attempts, first one included. Never zero.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause between a failed attempt and the next one.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

/// Observable link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Disconnected,
    Handshaking,
    Connected,
}

/// Token proving a caller holds the current connection.
///
/// A handle from an earlier connection stops working once the transport
/// disconnects or reconnects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    generation: u64,
    address: String,
}

impl ConnectionHandle {
    /// Address the connection was opened on.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Monotonic connection counter, starting at 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Outcome of a delivered command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Write attempts used, including the successful one.
    pub attempts: u32,
}

enum Link {
    Disconnected,
    Handshaking,
    Connected {
        port: Box<dyn SerialPortAdapter>,
        handle: ConnectionHandle,
    },
}

/// Line-oriented serial command transport.
pub struct Transport {
    connector: Box<dyn PortConnector>,
    port_config: PortConfiguration,
    retry: RetryPolicy,
    link: Link,
    generation: u64,
}

impl Transport {
    /// Create a disconnected transport.
    pub fn new(
        connector: Box<dyn PortConnector>,
        port_config: PortConfiguration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            connector,
            port_config,
            retry,
            link: Link::Disconnected,
            generation: 0,
        }
    }

    /// Open `address` and validate it with the RTS handshake.
    ///
    /// An existing connection is closed first. Handshake failures are not
    /// retried; the transport is left disconnected.
    ///
    /// # Errors
    ///
    /// - `DriverError::Connect` if the port cannot be opened
    /// - `DriverError::Handshake` if RTS cannot be dropped or read back
    pub fn connect(&mut self, address: &str) -> DriverResult<ConnectionHandle> {
        self.disconnect();

        let mut port = self
            .connector
            .open(address, &self.port_config)
            .map_err(|e| DriverError::Connect {
                address: address.to_string(),
                reason: e.to_string(),
            })?;

        self.link = Link::Handshaking;
        if let Err(e) = handshake(port.as_mut()) {
            self.link = Link::Disconnected;
            error!("Handshake on {} failed: {}", address, e);
            return Err(DriverError::Handshake {
                address: address.to_string(),
                reason: e.to_string(),
            });
        }

        self.generation += 1;
        let handle = ConnectionHandle {
            generation: self.generation,
            address: address.to_string(),
        };
        info!(
            "Connected to {} at {} baud",
            address, self.port_config.baud_rate
        );
        self.link = Link::Connected {
            port,
            handle: handle.clone(),
        };
        Ok(handle)
    }

    /// Close the port if one is open. Idempotent.
    pub fn disconnect(&mut self) {
        let previous = std::mem::replace(&mut self.link, Link::Disconnected);
        if let Link::Connected { handle, .. } = previous {
            info!("Disconnected from {}", handle.address);
        }
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        match self.link {
            Link::Disconnected => LinkState::Disconnected,
            Link::Handshaking => LinkState::Handshaking,
            Link::Connected { .. } => LinkState::Connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// Handle of the live connection, if any.
    pub fn handle(&self) -> Option<&ConnectionHandle> {
        match &self.link {
            Link::Connected { handle, .. } => Some(handle),
            _ => None,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn port_config(&self) -> &PortConfiguration {
        &self.port_config
    }

    /// Send one command from the controller vocabulary.
    pub fn send_command(
        &mut self,
        handle: &ConnectionHandle,
        command: &Command,
    ) -> DriverResult<Delivery> {
        let frame = command.frame()?;
        self.send_frame(handle, &frame)
    }

    /// Frame `payload` to exactly `expected_len` bytes and send it.
    ///
    /// # Errors
    ///
    /// - `DriverError::InvalidArgument` if `payload + "\n"` is not `expected_len` bytes
    /// - `DriverError::NotConnected` if `handle` is not the live connection
    /// - `DriverError::Transport` if every attempt fails
    pub fn send_raw(
        &mut self,
        handle: &ConnectionHandle,
        payload: &str,
        expected_len: usize,
    ) -> DriverResult<Delivery> {
        let frame = Frame::new(payload, expected_len)?;
        self.send_frame(handle, &frame)
    }

    /// Flush, then write `frame` with the retry policy.
    pub fn send_frame(
        &mut self,
        handle: &ConnectionHandle,
        frame: &Frame,
    ) -> DriverResult<Delivery> {
        let retry = self.retry;
        let port = match &mut self.link {
            Link::Connected {
                port,
                handle: current,
            } if current == handle => port,
            _ => return Err(DriverError::NotConnected),
        };

        if let Err(e) = port.clear_buffers() {
            if e.is_disconnect() {
                return Err(self.lose_link(frame, 0, e.to_string()));
            }
            warn!("Flush before <{}> failed: {}", frame.payload(), e);
        }

        debug!("CMD <{}> on {}", frame.payload(), port.name());

        let bytes = frame.as_bytes();
        let mut sent = 0;
        let mut reason = String::new();
        let mut lost = false;
        let mut attempts = 0;

        while attempts < retry.max_attempts {
            attempts += 1;
            match write_remaining(&mut **port, bytes, &mut sent) {
                Ok(()) => {
                    if attempts > 1 {
                        debug!("<{}> delivered on attempt {}", frame.payload(), attempts);
                    }
                    return Ok(Delivery { attempts });
                }
                Err(e) => {
                    lost = e.is_disconnect();
                    reason = e.to_string();
                }
            }

            warn!(
                "<{}> attempt {}/{} failed: {}",
                frame.payload(),
                attempts,
                retry.max_attempts,
                reason
            );

            if lost {
                break;
            }
            if attempts < retry.max_attempts {
                thread::sleep(retry.delay);
            }
        }

        if lost {
            return Err(self.lose_link(frame, attempts, reason));
        }

        error!("{} error: {}.", frame.payload(), reason);
        Err(DriverError::Transport {
            command: frame.payload().to_string(),
            attempts,
            reason,
        })
    }

    fn lose_link(&mut self, frame: &Frame, attempts: u32, reason: String) -> DriverError {
        error!("Lost device while sending <{}>: {}", frame.payload(), reason);
        self.disconnect();
        DriverError::Transport {
            command: frame.payload().to_string(),
            attempts,
            reason,
        }
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("state", &self.state())
            .field("address", &self.handle().map(ConnectionHandle::address))
            .field("retry", &self.retry)
            .finish()
    }
}

/// Write `bytes[*sent..]` until the whole frame is out.
///
/// `sent` counts bytes the OS already accepted, so the next attempt resumes
/// mid-frame instead of putting a second copy of the prefix on the wire.
fn write_remaining(
    port: &mut dyn SerialPortAdapter,
    bytes: &[u8],
    sent: &mut usize,
) -> Result<(), PortError> {
    while *sent < bytes.len() {
        let n = port.write_bytes(&bytes[*sent..])?;
        if n == 0 {
            return Err(PortError::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("write stalled after {} of {} bytes", sent, bytes.len()),
            )));
        }
        if *sent + n < bytes.len() {
            debug!("Partial write: {} of {} bytes", *sent + n, bytes.len());
        }
        *sent += n;
    }
    Ok(())
}

/// Drop RTS and confirm the line reads back low.
fn handshake(port: &mut dyn SerialPortAdapter) -> Result<(), PortError> {
    port.clear_rts()?;
    if !port.reads_rts_from_line() {
        warn!(
            "{} cannot read RTS back from the line; trusting the level just written",
            port.name()
        );
    }
    if port.read_rts()? {
        return Err(PortError::control_line("RTS still asserted after clear"));
    }
    debug!("RTS dropped on {}", port.name());
    Ok(())
}
