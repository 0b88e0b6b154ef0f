//! Tracing subscriber setup for the binary.
//!
//! Logs go to stderr so stdout stays clean for status and console output.
//! `RUST_LOG` wins over the configured level when set.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG`, else the `-v` count, else the config level.
pub fn build_filter(config: &LoggingConfig, verbosity: u8) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = match verbosity {
        0 => config.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// Fails only if a subscriber is already installed.
pub fn init(config: &LoggingConfig, verbosity: u8) -> Result<(), String> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(config, verbosity))
        .with_writer(std::io::stderr);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    result.map_err(|e| e.to_string())
}
