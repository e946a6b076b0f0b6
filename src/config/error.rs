//! Why a servo-run configuration was rejected.
//!
//! Every variant names the file, setting or `SERVO_RUN_*` variable at fault so
//! a CI log shows what to fix without rerunning with debug logging.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// `--config` pointed at a file that does not exist. Implicit locations
    /// are skipped silently instead.
    #[error("config file given with --config does not exist: {0}")]
    MissingFile(PathBuf),

    #[error("cannot read config file '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file '{path}' is not valid servo-run TOML: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value parsed but makes no sense for a run, e.g. a zero timeout.
    #[error("setting '{key}' {reason}")]
    InvalidSetting { key: &'static str, reason: &'static str },

    /// A `SERVO_RUN_*` override could not be parsed.
    #[error("{var}={value:?} is not a valid {expected}")]
    InvalidEnv {
        var: String,
        value: String,
        expected: &'static str,
    },
}

impl ConfigError {
    pub fn invalid_setting(key: &'static str, reason: &'static str) -> Self {
        Self::InvalidSetting { key, reason }
    }

    pub fn invalid_env(var: impl Into<String>, value: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidEnv {
            var: var.into(),
            value: value.into(),
            expected,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_culprit() {
        let err = ConfigError::invalid_env("SERVO_RUN_OUTPUT_COLOR", "maybe", "flag (true/false)");
        assert_eq!(
            err.to_string(),
            "SERVO_RUN_OUTPUT_COLOR=\"maybe\" is not a valid flag (true/false)"
        );

        let err = ConfigError::invalid_setting("phases.transient_retry_threshold", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "setting 'phases.transient_retry_threshold' must be at least 1"
        );
    }
}
