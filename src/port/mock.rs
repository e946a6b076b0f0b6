//! Mock serial port implementation for testing.
//!
//! Provides a `MockSerialPort` that simulates a servo console without
//! hardware. Clones share state, so a test can keep one handle to feed console
//! output and inspect writes while the supervisor owns the others.

use super::error::PortError;
use super::traits::SerialPortAdapter;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// How long a read waits for data, like a real console's read tick.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Inner state of the mock port.
#[derive(Debug, Default)]
struct MockPortState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all bytes written to the port.
    write_log: Vec<Vec<u8>>,
    /// Reads return end-of-stream once the queue drains.
    input_finished: bool,
    /// Every operation fails as if the device vanished.
    disconnected: bool,
    /// Number of live handles (original plus clones).
    handles: usize,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<MockPortState>,
    readable: Condvar,
}

/// Mock serial port implementation for testing.
///
/// Reads block for up to the configured timeout waiting for data, like a real
/// console opened with a read timeout.
///
/// # Example
/// ```
/// use servo_run::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK-CPU");
/// port.enqueue_read(b"Booting Linux\n");
///
/// let mut buffer = [0u8; 32];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"Booting Linux\n");
///
/// port.write_bytes(b"reboot\n").unwrap();
/// assert_eq!(port.written_text(), "reboot\n");
/// ```
pub struct MockSerialPort {
    /// The port name/identifier.
    name: String,
    shared: Arc<Shared>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        let shared = Shared::default();
        shared.state.lock().handles = 1;
        Self {
            name: name.into(),
            shared: Arc::new(shared),
        }
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    pub fn enqueue_read(&self, data: &[u8]) {
        let mut state = self.shared.state.lock();
        state.read_queue.extend(data);
        self.shared.readable.notify_all();
    }

    /// Enqueue each line followed by `\n`.
    pub fn enqueue_lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.shared.state.lock();
        for line in lines {
            state.read_queue.extend(line.as_ref().as_bytes());
            state.read_queue.push_back(b'\n');
        }
        self.shared.readable.notify_all();
    }

    /// Signal end-of-stream: once the queued bytes are consumed, reads return `Ok(0)`.
    pub fn finish_input(&self) {
        let mut state = self.shared.state.lock();
        state.input_finished = true;
        self.shared.readable.notify_all();
    }

    /// Simulate the device disappearing: every subsequent read and write fails.
    pub fn disconnect(&self) {
        let mut state = self.shared.state.lock();
        state.disconnected = true;
        self.shared.readable.notify_all();
    }

    /// Get a copy of all data written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.shared.state.lock().write_log.clone()
    }

    /// All written bytes concatenated and decoded lossily.
    pub fn written_text(&self) -> String {
        let state = self.shared.state.lock();
        let bytes: Vec<u8> = state.write_log.iter().flatten().copied().collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.shared.state.lock().read_queue.len()
    }

    /// Number of handles onto this device that are still alive.
    pub fn open_handles(&self) -> usize {
        self.shared.state.lock().handles
    }
}

impl Clone for MockSerialPort {
    fn clone(&self) -> Self {
        self.shared.state.lock().handles += 1;
        Self {
            name: self.name.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for MockSerialPort {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.handles = state.handles.saturating_sub(1);
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.shared.state.lock();
        if state.disconnected {
            return Err(PortError::disconnected(&self.name));
        }
        state.write_log.push(data.to_vec());
        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.shared.state.lock();

        if state.read_queue.is_empty() && !state.input_finished && !state.disconnected {
            self.shared.readable.wait_for(&mut state, READ_TIMEOUT);
        }

        if state.disconnected {
            return Err(PortError::disconnected(&self.name));
        }

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 && !state.input_finished {
            return Err(PortError::timeout(READ_TIMEOUT));
        }
        Ok(bytes_read)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn try_clone_adapter(&self) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        Ok(Box::new(self.clone()))
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}
