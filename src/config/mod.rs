//! Configuration module for the flat-field driver.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `FLATFIELD_CONFIG` environment variable (explicit path)
//! 2. `./flatfield.toml` (current directory)
//! 3. `~/.config/flatfield/flatfield.toml` (XDG on Linux/macOS)
//! 4. `%APPDATA%\flatfield\flatfield.toml` (Windows)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is `FLATFIELD_<SECTION>_<KEY>`, e.g.
//! `FLATFIELD_SERIAL_PORT=/dev/ttyACM0` or `FLATFIELD_TRANSPORT_RETRY_DELAY_MS=100`.
//!
//! # Example
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyACM0"
//! baud_rate = 9600
//!
//! [transport]
//! max_attempts = 3
//! retry_delay_ms = 50
//!
//! [device]
//! name = "Flat Field"
//! initial_brightness = 255
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_path, resolve_config_path, ConfigLoader};
pub use schema::{Config, DeviceConfig, LogFormat, LoggingConfig, SerialConfig, TransportConfig};
