//! Port abstraction layer for serial communication.
//!
//! Provides the traits the transport is written against, a real implementation
//! over the `serialport` crate, and mocks for testing.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::{MockConnector, MockEvent, MockSerialPort, WriteFault};
pub use sync_port::*;
pub use traits::*;
