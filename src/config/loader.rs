//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "FLATFIELD";

/// Config file name
const CONFIG_FILE_NAME: &str = "flatfield.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "FLATFIELD_CONFIG";

/// Application directory under the platform config dir
const APP_DIR: &str = "flatfield";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `FLATFIELD_CONFIG` environment variable (explicit path)
    /// 2. `./flatfield.toml` (current directory)
    /// 3. `~/.config/flatfield/flatfield.toml` (XDG on Linux/macOS)
    /// 4. `%APPDATA%\flatfield\flatfield.toml` (Windows)
    /// 5. Built-in defaults (no file required)
    ///
    /// Environment variables override file values, then the result is validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self { config_path, config })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        // Env overrides still apply; a bad value leaves the default in place.
        let mut overridden = config.clone();
        if apply_env_overrides(&mut overridden).is_ok() && overridden.validate().is_ok() {
            config = overridden;
        }

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. XDG config directory (Linux/macOS) or APPDATA (Windows)
    get_default_config_path().filter(|p| p.exists())
}

/// Get the platform-specific config directory.
fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Save configuration to a file.
fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Read `FLATFIELD_<key>` and parse it, if set.
fn env_value<T: FromStr>(key: &str, what: &str) -> ConfigResult<Option<T>> {
    let var = format!("{}_{}", ENV_PREFIX, key);
    match std::env::var(&var) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::env_parse(var, what)),
        Err(_) => Ok(None),
    }
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `FLATFIELD_<SECTION>_<KEY>`
/// For example:
/// - `FLATFIELD_SERIAL_PORT=/dev/ttyACM0`
/// - `FLATFIELD_TRANSPORT_MAX_ATTEMPTS=5`
/// - `FLATFIELD_LOGGING_LEVEL=debug`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Serial overrides
    if let Some(val) = env_value::<String>("SERIAL_PORT", "Invalid port")? {
        config.serial.port = Some(val);
    }
    if let Some(val) = env_value("SERIAL_BAUD_RATE", "Invalid baud rate")? {
        config.serial.baud_rate = val;
    }
    if let Some(val) = env_value("SERIAL_TIMEOUT_MS", "Invalid timeout")? {
        config.serial.timeout_ms = val;
    }

    // Transport overrides
    if let Some(val) = env_value("TRANSPORT_MAX_ATTEMPTS", "Invalid attempt count")? {
        config.transport.max_attempts = val;
    }
    if let Some(val) = env_value("TRANSPORT_RETRY_DELAY_MS", "Invalid retry delay")? {
        config.transport.retry_delay_ms = val;
    }

    // Device overrides
    if let Some(val) = env_value::<String>("DEVICE_NAME", "Invalid name")? {
        config.device.name = val;
    }
    if let Some(val) = env_value("DEVICE_INITIAL_BRIGHTNESS", "Invalid brightness")? {
        config.device.initial_brightness = val;
    }

    // Logging overrides
    if let Some(val) = env_value::<String>("LOGGING_LEVEL", "Invalid level")? {
        config.logging.level = val;
    }
    if let Some(val) = env_value("LOGGING_FORMAT", "Expected json, pretty or compact")? {
        config.logging.format = val;
    }

    Ok(())
}
