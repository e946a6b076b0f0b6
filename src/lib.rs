//! Servo Run Library
//!
//! Boot-and-test supervision for a board wired to a servo debug adapter. Two
//! serial consoles (CPU and EC) are read concurrently into one merged line
//! stream; a bootloader classifier and a test classifier each drain it under
//! their own inactivity timeout and reduce what they see to a verdict.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML support
//! - `port`: Serial port abstraction, real and mock
//! - `line`: Console lines and channel tags
//! - `report`: Operator-facing colored output
//! - `transcript`: Per-console transcript files
//! - `stream`: The merged line stream and its phase iteration
//! - `source`: Blocking line readers feeding the stream
//! - `channel`: Consoles: write half plus line source
//! - `signature`: The fixed signature tables
//! - `outcome`: Phase results, fault classes, exit codes
//! - `classify`: Bootloader and test phase classifiers
//! - `controller`: Run orchestration and the run summary
//! - `error`: Setup and teardown errors

pub mod channel;
pub mod classify;
pub mod config;
pub mod controller;
pub mod error;
pub mod line;
pub mod outcome;
pub mod port;
pub mod report;
pub mod signature;
pub mod source;
pub mod stream;
pub mod transcript;

// Re-export commonly used types for convenience
pub use channel::{ChannelWriter, Console};
pub use classify::{BootClassifier, RunContext, TestRunClassifier, NETBOOT_REQUEST};
pub use controller::{Devices, RunController, RunReport};
pub use error::{RunError, RunResult};
pub use line::{ChannelTag, LogLine};
pub use outcome::{exit_code, FaultClass, Phase, PhaseResult, Verdict};
pub use port::{MockSerialPort, PortConfiguration, PortError, SerialPortAdapter, SyncSerialPort};
pub use report::Reporter;
pub use stream::{merged_queue, LineSender, MergedStream, PhaseLines, StreamItem};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
