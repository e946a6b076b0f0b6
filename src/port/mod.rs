//! Port abstraction layer for the servo consoles.
//!
//! Provides the adapter trait plus the real and mock implementations, so the
//! line sources and the controller can be exercised without hardware.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::MockSerialPort;
pub use sync_port::SyncSerialPort;
pub use traits::{PortConfiguration, SerialPortAdapter};
