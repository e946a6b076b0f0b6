//! Operator-facing console output.
//!
//! Everything a CI log reader sees goes through a [`Reporter`]: echoes of
//! received lines, echoes of commands written to the board, and diagnostics.
//! Diagnostics are colored so they stand out from the console traffic.
//! Structured `tracing` output is separate and goes to stderr.

use crate::line::{ChannelTag, LogLine};
use chrono::{DateTime, Utc};
use crossterm::style::Stylize;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Shared, clone-able handle onto the operator output.
#[derive(Clone)]
pub struct Reporter {
    sink: Sink,
    color: bool,
    timestamps: bool,
}

impl Reporter {
    /// Report to stdout.
    pub fn stdout(color: bool, timestamps: bool) -> Self {
        Self::to_writer(io::stdout(), color, timestamps)
    }

    /// Report to an arbitrary writer.
    pub fn to_writer(writer: impl Write + Send + 'static, color: bool, timestamps: bool) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
            color,
            timestamps,
        }
    }

    /// Report into an in-memory buffer, without colors or timestamps.
    pub fn capture() -> (Self, CapturedOutput) {
        let captured = CapturedOutput::default();
        let reporter = Self::to_writer(captured.clone(), false, false);
        (reporter, captured)
    }

    /// Echo a line received from a console.
    pub fn echo_read(&self, line: &LogLine) {
        let stamp = self.stamp(line.received_at);
        self.emit(&format!("{}{}", stamp, line.tagged()), None);
    }

    /// Echo a command written to a console. Control characters are escaped so
    /// the echo stays on one line.
    pub fn echo_write(&self, tag: ChannelTag, text: &str) {
        let stamp = self.stamp(Utc::now());
        let message = format!("{}{}{}", stamp, tag.write_prefix(), text.escape_debug());
        self.emit(&message, Some(Tone::Write));
    }

    /// Report an abnormal condition.
    pub fn error(&self, message: &str) {
        self.emit(message, Some(Tone::Error));
    }

    /// Report a routine milestone.
    pub fn notice(&self, message: &str) {
        self.emit(message, Some(Tone::Notice));
    }

    fn stamp(&self, at: DateTime<Utc>) -> String {
        if self.timestamps {
            format!("[{}] ", at.format("%H:%M:%S%.3f"))
        } else {
            String::new()
        }
    }

    fn emit(&self, message: &str, tone: Option<Tone>) {
        let rendered = match (self.color, tone) {
            (true, Some(Tone::Error)) => message.red().to_string(),
            (true, Some(Tone::Write)) => message.blue().to_string(),
            (true, Some(Tone::Notice)) => message.green().to_string(),
            _ => message.to_string(),
        };
        let mut sink = self.sink.lock();
        // Operator output is best effort; a closed stdout must not end the run.
        let _ = writeln!(sink, "{}", rendered);
        let _ = sink.flush();
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("color", &self.color)
            .field("timestamps", &self.timestamps)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum Tone {
    Write,
    Error,
    Notice,
}

/// In-memory operator output, used by tests.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

impl CapturedOutput {
    /// Everything reported so far.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    /// Reported lines, in order.
    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_string).collect()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
