//! Port-specific error types.
//!
//! Kept separate from the driver-level [`DriverError`](crate::error::DriverError)
//! so the port layer can be reused without pulling in device semantics.

use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Port configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A modem control line could not be set or read.
    #[error("Control line error: {0}")]
    ControlLine(String),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a ControlLine error from a message.
    pub fn control_line(message: impl Into<String>) -> Self {
        Self::ControlLine(message.into())
    }

    /// Whether this error means the device has gone away.
    ///
    /// A transport seeing one of these must drop its connection; further
    /// writes on the same descriptor cannot succeed.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(e) => {
                matches!(
                    e.kind(),
                    std::io::ErrorKind::BrokenPipe
                        | std::io::ErrorKind::NotConnected
                        | std::io::ErrorKind::ConnectionAborted
                        | std::io::ErrorKind::ConnectionReset
                ) || e.raw_os_error().is_some_and(is_device_gone_errno)
            }
            Self::Serial(e) => e.kind() == serialport::ErrorKind::NoDevice,
            _ => false,
        }
    }
}

/// Errno values an unplugged tty reports on write.
#[cfg(unix)]
fn is_device_gone_errno(code: i32) -> bool {
    matches!(code, libc::EIO | libc::ENODEV | libc::ENXIO)
}

#[cfg(not(unix))]
fn is_device_gone_errno(_code: i32) -> bool {
    false
}
