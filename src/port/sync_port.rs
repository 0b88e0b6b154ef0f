//! Synchronous serial port implementation.
//!
//! Wraps the `serialport` crate's `SerialPort` trait with our own `SerialPortAdapter`
//! trait for dependency injection and testing.

use super::error::PortError;
use super::traits::{PortConfiguration, PortConnector, SerialPortAdapter};
use std::io::Write;

#[cfg(unix)]
use std::os::unix::io::{AsRawFd, RawFd};

/// Synchronous serial port implementation wrapping `serialport::SerialPort`.
pub struct SyncSerialPort {
    /// The underlying serial port implementation.
    port: Box<dyn serialport::SerialPort>,
    /// The port name/path for identification.
    name: String,
    /// Raw descriptor used for the TIOCMGET read-back of RTS.
    #[cfg(unix)]
    fd: RawFd,
    /// Last RTS level we drove, reported where the OS offers no read-back.
    #[cfg(not(unix))]
    rts_level: bool,
}

impl SyncSerialPort {
    /// Open a serial port with the given configuration.
    ///
    /// # Arguments
    /// * `port_name` - The system path to the serial port (e.g., "/dev/ttyUSB0" or "COM3")
    /// * `config` - Configuration parameters for the port
    ///
    /// # Example
    /// ```no_run
    /// use flatfield_serial::port::{SyncSerialPort, PortConfiguration};
    ///
    /// let config = PortConfiguration::default();
    /// let port = SyncSerialPort::open("/dev/ttyUSB0", &config)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(port_name: &str, config: &PortConfiguration) -> Result<Self, PortError> {
        let builder = serialport::new(port_name, config.baud_rate)
            .data_bits(config.data_bits.into())
            .flow_control(config.flow_control.into())
            .parity(config.parity.into())
            .stop_bits(config.stop_bits.into())
            .timeout(config.timeout);

        let map_open_error = |e: serialport::Error| match e.kind() {
            serialport::ErrorKind::NoDevice => PortError::not_found(port_name),
            serialport::ErrorKind::InvalidInput => PortError::config(e.to_string()),
            _ => PortError::Serial(e),
        };

        #[cfg(unix)]
        {
            let native = builder.open_native().map_err(map_open_error)?;
            let fd = native.as_raw_fd();
            Ok(Self {
                port: Box::new(native),
                name: port_name.to_string(),
                fd,
            })
        }

        #[cfg(not(unix))]
        {
            let port = builder.open().map_err(map_open_error)?;
            Ok(Self {
                port,
                name: port_name.to_string(),
                rts_level: true,
            })
        }
    }
}

impl SerialPortAdapter for SyncSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.port.write(data).map_err(PortError::Io)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        self.port
            .clear(serialport::ClearBuffer::All)
            .map_err(PortError::Serial)
    }

    fn clear_rts(&mut self) -> Result<(), PortError> {
        self.port
            .write_request_to_send(false)
            .map_err(|e| PortError::control_line(format!("RTS clear failed: {e}")))?;
        #[cfg(not(unix))]
        {
            self.rts_level = false;
        }
        Ok(())
    }

    #[cfg(unix)]
    fn read_rts(&mut self) -> Result<bool, PortError> {
        let mut bits: libc::c_int = 0;
        // SAFETY: `fd` belongs to the open TTY owned by `self.port`, and
        // TIOCMGET writes a single c_int through the pointer.
        let rc = unsafe { libc::ioctl(self.fd, libc::TIOCMGET, &mut bits as *mut libc::c_int) };
        if rc != 0 {
            let os = std::io::Error::last_os_error();
            return Err(PortError::control_line(format!("RTS read-back failed: {os}")));
        }
        Ok(bits & libc::TIOCM_RTS != 0)
    }

    /// No OS call reports the output RTS level here; this is the level
    /// last written by `clear_rts`.
    #[cfg(not(unix))]
    fn read_rts(&mut self) -> Result<bool, PortError> {
        Ok(self.rts_level)
    }

    fn reads_rts_from_line(&self) -> bool {
        cfg!(unix)
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate())
            .finish()
    }
}

/// Connector that opens real system serial ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemConnector;

impl PortConnector for SystemConnector {
    fn open(
        &self,
        address: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        Ok(Box::new(SyncSerialPort::open(address, config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_not_found_error() {
        let config = PortConfiguration::default();
        let result = SyncSerialPort::open("/dev/nonexistent_port_12345", &config);

        assert!(result.is_err());
        if let Err(e) = result {
            match e {
                PortError::NotFound(name) => {
                    assert!(name.contains("nonexistent"));
                }
                PortError::Serial(_) | PortError::Io(_) => {}
                _ => panic!("Expected an open error, got: {:?}", e),
            }
        }
    }

    #[test]
    fn test_system_connector_surfaces_open_failure() {
        let result = SystemConnector.open("/dev/nonexistent_port_12345", &PortConfiguration::default());
        assert!(result.is_err());
    }
}
