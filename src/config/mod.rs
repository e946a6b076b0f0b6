//! Configuration module for servo-run.
//!
//! TOML-based configuration with environment variable overrides. Command-line
//! flags are applied on top by the binary.
//!
//! # Configuration Resolution
//!
//! 1. `--config <FILE>` (explicit path)
//! 2. `SERVO_RUN_CONFIG` environment variable
//! 3. `./servo-run.toml` (current directory)
//! 4. `servo-run/servo-run.toml` under the platform config directory
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is `SERVO_RUN_<SECTION>_<KEY>`:
//! - `SERVO_RUN_PHASES_BOOTLOADER_TIMEOUT_SECS=300`
//! - `SERVO_RUN_RESULTS_DIR=/var/ci/results`
//! - `SERVO_RUN_OUTPUT_COLOR=0`
//!
//! # Example
//!
//! ```toml
//! [serial]
//! baud_rate = 115200
//!
//! [phases]
//! bootloader_timeout_secs = 120
//! transient_retry_threshold = 10
//!
//! [results]
//! dir = "results"
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, validate, ConfigLoader,
};
pub use schema::{
    Config, LogFormat, LoggingConfig, OutputConfig, PhaseConfig, ResultsConfig, SerialConfig,
};
