//! Port-specific error types.
//!
//! Kept separate from the run-level errors so the line sources can reason about
//! read outcomes without knowing anything about configuration or results files.

use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial device was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Port configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A read or write did not complete within the port timeout.
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The device went away underneath us.
    #[error("Serial port disconnected: {0}")]
    Disconnected(String),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a Timeout error from a duration.
    pub fn timeout(duration: std::time::Duration) -> Self {
        Self::Timeout(duration)
    }

    /// Create a Disconnected error from a port name.
    pub fn disconnected(port_name: impl Into<String>) -> Self {
        Self::Disconnected(port_name.into())
    }

    /// Whether this error only means "no data arrived within the read timeout".
    ///
    /// Real ports report this as `TimedOut`, non-blocking handles as `WouldBlock`.
    pub fn is_idle(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}
