//! Errors that stop a run before or after the phases.
//!
//! Faults seen on the consoles are never errors; they become a
//! [`Verdict`](crate::outcome::Verdict). A [`RunError`] means the run could not
//! be set up at all (bad configuration, a console that will not open, an
//! unwritable results directory) or its summary could not be saved.

use crate::config::ConfigError;
use crate::line::ChannelTag;
use crate::port::PortError;
use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for run setup and teardown.
pub type RunResult<T> = Result<T, RunError>;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A console device could not be opened.
    #[error("Failed to open {channel} console '{path}': {source}")]
    Open {
        channel: ChannelTag,
        path: String,
        #[source]
        source: PortError,
    },

    /// Transcript or summary file could not be created.
    #[error("Failed to write results to '{path}': {source}")]
    Results {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize run summary: {0}")]
    Summary(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_error_names_the_console() {
        let err = RunError::Open {
            channel: ChannelTag::Ec,
            path: "/dev/ttyUSB9".into(),
            source: PortError::not_found("/dev/ttyUSB9"),
        };
        let message = err.to_string();
        assert!(message.starts_with("Failed to open ec console '/dev/ttyUSB9'"));
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: RunError = ConfigError::invalid_setting("phases.bootloader_timeout_secs", "must be positive").into();
        assert_eq!(
            err.to_string(),
            "setting 'phases.bootloader_timeout_secs' must be positive"
        );
    }
}
