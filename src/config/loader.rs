//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SERVO_RUN";

/// Config file name
const CONFIG_FILE_NAME: &str = "servo-run.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "SERVO_RUN_CONFIG";

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
    /// 1. `explicit` (the `--config` flag); it must exist
    /// 2. `SERVO_RUN_CONFIG` environment variable
    /// 3. `./servo-run.toml`
    /// 4. `<platform config dir>/servo-run/servo-run.toml`
    /// 5. Built-in defaults
    ///
    /// Environment variables override file values; the result is validated.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        let config_path = match explicit {
            Some(path) if !path.exists() => return Err(ConfigError::MissingFile(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => resolve_config_path(),
        };

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Create a loader with default configuration (no file, no env overrides).
    pub fn with_defaults() -> Self {
        Self {
            config_path: None,
            config: Config::default(),
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
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_default_config_path().filter(|path| path.exists())
}

/// Get the platform config directory for servo-run.
pub fn get_default_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "servo-run").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the default config file path.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Override `target` from `SERVO_RUN_<key>` when the variable is set.
fn env_override<T: FromStr>(key: &str, target: &mut T, expected: &'static str) -> ConfigResult<()> {
    let var = format!("{}_{}", ENV_PREFIX, key);
    if let Ok(val) = std::env::var(&var) {
        *target = val
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid_env(&var, &val, expected))?;
    }
    Ok(())
}

/// On/off switch as written in CI job definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Flag(bool);

impl FromStr for Flag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Self(true)),
            "0" | "false" | "no" | "off" => Ok(Self(false)),
            _ => Err(()),
        }
    }
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern `SERVO_RUN_<SECTION>_<KEY>`, e.g.
/// `SERVO_RUN_PHASES_BOOTLOADER_TIMEOUT_SECS=300`.
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    env_override("SERIAL_BAUD_RATE", &mut config.serial.baud_rate, "baud rate")?;
    env_override(
        "SERIAL_READ_TIMEOUT_MS",
        &mut config.serial.read_timeout_ms,
        "read timeout in milliseconds",
    )?;
    env_override(
        "PHASES_BOOTLOADER_TIMEOUT_SECS",
        &mut config.phases.bootloader_timeout_secs,
        "timeout in seconds",
    )?;
    env_override(
        "PHASES_TRANSIENT_RETRY_THRESHOLD",
        &mut config.phases.transient_retry_threshold,
        "count",
    )?;
    env_override("RESULTS_DIR", &mut config.results.dir, "path")?;
    env_override("LOGGING_LEVEL", &mut config.logging.level, "log filter")?;

    let mut color = Flag(config.output.color);
    env_override("OUTPUT_COLOR", &mut color, "flag (true/false)")?;
    config.output.color = color.0;

    Ok(())
}

/// Reject values that would make the run meaningless.
pub fn validate(config: &Config) -> ConfigResult<()> {
    if config.serial.baud_rate == 0 {
        return Err(ConfigError::invalid_setting("serial.baud_rate", "must be positive"));
    }
    if config.serial.read_timeout_ms == 0 {
        return Err(ConfigError::invalid_setting(
            "serial.read_timeout_ms",
            "must be positive",
        ));
    }
    if config.phases.bootloader_timeout_secs == 0 {
        return Err(ConfigError::invalid_setting(
            "phases.bootloader_timeout_secs",
            "must be positive",
        ));
    }
    if config.phases.transient_retry_threshold == 0 {
        return Err(ConfigError::invalid_setting(
            "phases.transient_retry_threshold",
            "must be at least 1",
        ));
    }
    Ok(())
}
