//! Line sources: one blocking reader per console.
//!
//! A source owns the read handle of its console, turns the byte stream into
//! lines, writes each through to the console transcript and operator output,
//! and publishes it on the merged queue. It stops when asked, when the
//! console reports end-of-stream or an error, or when nobody consumes anymore.

use crate::line::{ChannelTag, LogLine};
use crate::port::SerialPortAdapter;
use crate::report::Reporter;
use crate::stream::LineSender;
use crate::transcript::Transcript;
use memchr::memchr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const READ_CHUNK: usize = 1024;

/// Most bytes buffered without a newline before they are emitted as a line.
pub const MAX_LINE_BYTES: usize = 16 * 1024;

/// Splits a byte stream into lines.
///
/// Lines end at `\n`; a preceding `\r` is dropped. Content is decoded as
/// lossy UTF-8 only once the line is complete, so multi-byte characters split
/// across reads survive. A run of `max_len` bytes without a newline is cut
/// and emitted as a line of its own.
#[derive(Debug)]
pub struct LineAssembler {
    pending: Vec<u8>,
    max_len: usize,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::with_max_len(MAX_LINE_BYTES)
    }
}

impl LineAssembler {
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            pending: Vec::new(),
            max_len: max_len.max(1),
        }
    }

    /// Feed bytes, returning every line they complete.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = memchr(b'\n', &self.pending[start..]) {
            let end = start + offset;
            let raw = &self.pending[start..end];
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            lines.push(String::from_utf8_lossy(raw).into_owned());
            start = end + 1;
        }
        self.pending.drain(..start);

        while self.pending.len() >= self.max_len {
            let cut: Vec<u8> = self.pending.drain(..self.max_len).collect();
            lines.push(String::from_utf8_lossy(&cut).into_owned());
        }
        lines
    }

    /// Bytes of the current unterminated line.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

/// Why a line source stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceExit {
    /// `close` was called.
    Stopped,
    /// The console reported end-of-stream.
    EndOfStream,
    /// The merged stream's consumer is gone.
    ConsumerGone,
    /// A read failed; the console is considered lost.
    Failed(String),
}

/// Handle onto a running line source.
///
/// Dropping the handle asks the reader to stop; [`LineSource::close`] also
/// waits for it, which releases the console's read handle.
#[derive(Debug)]
pub struct LineSource {
    tag: ChannelTag,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<SourceExit>>,
}

impl LineSource {
    /// Start reading `port` on the blocking pool.
    ///
    /// The port's read timeout is the polling tick for stop requests.
    pub fn spawn(
        tag: ChannelTag,
        port: Box<dyn SerialPortAdapter>,
        transcript: Option<Transcript>,
        sender: LineSender,
        reporter: Reporter,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let reader = Reader {
            tag,
            port,
            transcript,
            sender,
            reporter,
            stop: Arc::clone(&stop),
        };
        info!(channel = %tag, port = reader.port.name(), "line source started");
        let handle = tokio::task::spawn_blocking(move || reader.run());
        Self {
            tag,
            stop,
            handle: Some(handle),
        }
    }

    pub fn tag(&self) -> ChannelTag {
        self.tag
    }

    /// Stop the reader and wait for it to release the console.
    pub async fn close(mut self) -> SourceExit {
        self.stop.store(true, Ordering::Release);
        let exit = match self.handle.take() {
            Some(handle) => handle
                .await
                .unwrap_or_else(|e| SourceExit::Failed(format!("reader task failed: {}", e))),
            None => SourceExit::Stopped,
        };
        debug!(channel = %self.tag, ?exit, "line source closed");
        exit
    }
}

impl Drop for LineSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

struct Reader {
    tag: ChannelTag,
    port: Box<dyn SerialPortAdapter>,
    transcript: Option<Transcript>,
    sender: LineSender,
    reporter: Reporter,
    stop: Arc<AtomicBool>,
}

impl Reader {
    fn run(mut self) -> SourceExit {
        let exit = self.pump();
        match &exit {
            SourceExit::Stopped | SourceExit::ConsumerGone => {
                debug!(channel = %self.tag, ?exit, "line source finished")
            }
            SourceExit::EndOfStream => {
                warn!(channel = %self.tag, port = self.port.name(), "console reached end of stream")
            }
            SourceExit::Failed(reason) => {
                warn!(channel = %self.tag, port = self.port.name(), %reason, "console read failed")
            }
        }
        // Dropping `self` drops the sender: this console's end-of-stream.
        exit
    }

    fn pump(&mut self) -> SourceExit {
        let mut assembler = LineAssembler::default();
        let mut buffer = [0u8; READ_CHUNK];
        let mut line_no = 0u64;

        loop {
            if self.stop.load(Ordering::Acquire) {
                return SourceExit::Stopped;
            }

            let n = match self.port.read_bytes(&mut buffer) {
                Ok(0) => {
                    if !assembler.pending().is_empty() {
                        debug!(
                            channel = %self.tag,
                            bytes = assembler.pending().len(),
                            "discarding unterminated trailing line"
                        );
                    }
                    return SourceExit::EndOfStream;
                }
                Ok(n) => n,
                Err(e) if e.is_idle() => continue,
                Err(e) => return SourceExit::Failed(e.to_string()),
            };

            for text in assembler.push(&buffer[..n]) {
                line_no += 1;
                let line = LogLine::new(self.tag, line_no, text);

                if let Some(Err(e)) = self.transcript.as_mut().map(|t| t.append(&line)) {
                    warn!(channel = %self.tag, error = %e, "transcript write failed, disabling transcript");
                    self.transcript = None;
                }
                self.reporter.echo_read(&line);

                if !self.sender.publish(line) {
                    return SourceExit::ConsumerGone;
                }
            }
        }
    }
}
