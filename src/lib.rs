//! Flat-field serial driver library
//!
//! A resilient line-oriented serial command transport for flat-field
//! accessories (dust cap plus calibration light box), and a small device
//! model built on top of it.
//!
//! # Modules
//!
//! - `port`: Port abstraction layer (real `serialport` ports and mocks)
//! - `command`: Command vocabulary and fixed-length wire framing
//! - `transport`: Connect/handshake and flush-then-write with bounded retry
//! - `device`: `FlatFieldDevice` and its `LightBox` / `DustCap` capabilities
//! - `config`: Configuration management with TOML support
//! - `logging`: Tracing subscriber setup
//! - `console`: Line-oriented command console
//! - `error`: Unified error handling

pub mod command;
pub mod config;
pub mod console;
pub mod device;
pub mod error;
pub mod logging;
pub mod port;
pub mod transport;

// Re-export commonly used types for convenience
pub use command::{encode_brightness, Command, Frame, FRAME_LEN};
pub use device::{CapRequest, DeviceStatus, DriverInterface, DustCap, FlatFieldDevice, LightBox};
pub use error::{DriverError, DriverResult};
pub use port::{
    MockConnector, MockSerialPort, PortConfiguration, PortConnector, PortError,
    SerialPortAdapter, SyncSerialPort, SystemConnector,
};
pub use transport::{ConnectionHandle, Delivery, LinkState, RetryPolicy, Transport};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
