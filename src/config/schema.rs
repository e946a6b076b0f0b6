//! Configuration schema definitions.
//!
//! All sections carry defaults so an empty (or missing) file is a valid
//! configuration.

use crate::port::PortConfiguration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial console settings
    pub serial: SerialConfig,
    /// Phase timing and retry policy
    pub phases: PhaseConfig,
    /// Transcript and summary locations
    pub results: ResultsConfig,
    /// Operator console output
    pub output: OutputConfig,
    /// Structured logging
    pub logging: LoggingConfig,
}

/// Serial console configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Baud rate shared by the CPU and EC consoles
    pub baud_rate: u32,
    /// Read tick in milliseconds; bounds how long a line source takes to notice a stop request
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            read_timeout_ms: 100,
        }
    }
}

impl SerialConfig {
    /// Build the port configuration used to open both consoles.
    pub fn port_configuration(&self) -> PortConfiguration {
        PortConfiguration {
            baud_rate: self.baud_rate,
            timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }
}

/// Phase configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Bootloader inactivity timeout in seconds
    pub bootloader_timeout_secs: u64,
    /// Number of transient network read errors that turn the boot phase into a retry
    pub transient_retry_threshold: u32,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            bootloader_timeout_secs: 120,
            transient_retry_threshold: 10,
        }
    }
}

impl PhaseConfig {
    /// Bootloader inactivity timeout as Duration
    pub fn bootloader_timeout(&self) -> Duration {
        Duration::from_secs(self.bootloader_timeout_secs)
    }
}

/// Results configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    /// Directory receiving transcripts and the run summary
    pub dir: PathBuf,
    /// CPU console transcript file name
    pub cpu_transcript: String,
    /// EC console transcript file name
    pub ec_transcript: String,
    /// Run summary file name; `None` disables the summary
    pub summary: Option<String>,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("results"),
            cpu_transcript: "serial.txt".to_string(),
            ec_transcript: "serial-ec.txt".to_string(),
            summary: Some("summary.json".to_string()),
        }
    }
}

impl ResultsConfig {
    pub fn cpu_transcript_path(&self) -> PathBuf {
        self.dir.join(&self.cpu_transcript)
    }

    pub fn ec_transcript_path(&self) -> PathBuf {
        self.dir.join(&self.ec_transcript)
    }

    pub fn summary_path(&self) -> Option<PathBuf> {
        self.summary.as_ref().map(|name| self.dir.join(name))
    }
}

/// Operator output configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Color diagnostics and write echoes with ANSI escapes
    pub color: bool,
    /// Prefix echoed lines with their UTC receive time
    pub timestamps: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            color: true,
            timestamps: false,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}
