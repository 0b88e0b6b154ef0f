//! Driver-level error type.
//!
//! Every public operation of the transport and device returns [`DriverResult`].
//! Port errors are flattened to their display text at this boundary so the
//! variants stay `Clone` and comparable in tests.

use thiserror::Error;

/// A specialized `Result` type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Unified driver error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The serial channel could not be opened.
    #[error("Failed to open '{address}': {reason}")]
    Connect { address: String, reason: String },

    /// Dropping or reading back RTS failed. A fresh connect is required.
    #[error("Handshake failed on '{address}': {reason}")]
    Handshake { address: String, reason: String },

    /// Every write attempt failed; carries the last OS error text.
    #[error("Command {command:?} not delivered after {attempts} attempt(s): {reason}")]
    Transport {
        command: String,
        attempts: u32,
        reason: String,
    },

    /// A caller contract was violated (brightness range, frame length).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No live connection, or the handle belongs to a closed connection.
    #[error("Operation requires a connected device, but the link is down.")]
    NotConnected,
}

impl DriverError {
    /// Create an InvalidArgument error from a message.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Short machine-friendly name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "ConnectError",
            Self::Handshake { .. } => "HandshakeError",
            Self::Transport { .. } => "TransportError",
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::NotConnected => "NotConnected",
        }
    }
}
