//! Core traits for serial port abstraction.
//!
//! Defines the `SerialPortAdapter` trait that allows both the real servo
//! consoles and mock implementations to be used interchangeably.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration parameters for a servo console.
///
/// Servo consoles are always 8N1 without flow control, so only the speed and
/// the read tick are configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfiguration {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Read timeout. A read that sees no data within this window returns an
    /// idle error, which the line sources use as their polling tick.
    pub timeout: Duration,
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            timeout: Duration::from_millis(100),
        }
    }
}

/// Trait for serial port I/O operations.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Write the whole buffer, retrying short writes.
    fn write_all_bytes(&mut self, mut data: &[u8]) -> Result<(), PortError> {
        while !data.is_empty() {
            let n = self.write_bytes(data)?;
            if n == 0 {
                return Err(PortError::disconnected(self.name()));
            }
            data = &data[n..];
        }
        Ok(())
    }

    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Returns the number of bytes actually read; `Ok(0)` means end of stream.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Open an independent handle onto the same device.
    ///
    /// Reads and writes on a console happen on different threads; each side
    /// gets its own handle so a blocked read never delays a command write.
    fn try_clone_adapter(&self) -> Result<Box<dyn SerialPortAdapter>, PortError>;
}
