//! A servo console: the write half plus the line source reading the other half.

use crate::error::{RunError, RunResult};
use crate::line::ChannelTag;
use crate::port::{PortConfiguration, PortError, SerialPortAdapter, SyncSerialPort};
use crate::report::Reporter;
use crate::source::{LineSource, SourceExit};
use crate::stream::LineSender;
use crate::transcript::Transcript;
use std::path::Path;
use tracing::{debug, info};

/// Write half of a console. Every command is echoed to the operator first.
#[derive(Debug)]
pub struct ChannelWriter {
    tag: ChannelTag,
    port: Box<dyn SerialPortAdapter>,
    reporter: Reporter,
}

impl ChannelWriter {
    pub fn new(tag: ChannelTag, port: Box<dyn SerialPortAdapter>, reporter: Reporter) -> Self {
        Self {
            tag,
            port,
            reporter,
        }
    }

    pub fn tag(&self) -> ChannelTag {
        self.tag
    }

    /// Write `text` verbatim to the console.
    pub fn send(&mut self, text: &str) -> Result<(), PortError> {
        self.reporter.echo_write(self.tag, text);
        debug!(channel = %self.tag, bytes = text.len(), "writing to console");
        self.port.write_all_bytes(text.as_bytes())
    }
}

/// An open console. Closing (or dropping) it releases both port handles.
#[derive(Debug)]
pub struct Console {
    writer: ChannelWriter,
    source: LineSource,
}

impl Console {
    /// Open the device at `path` and start reading it into `sender`.
    pub fn open(
        tag: ChannelTag,
        path: &str,
        config: &PortConfiguration,
        transcript_path: &Path,
        sender: LineSender,
        reporter: Reporter,
    ) -> RunResult<Self> {
        let port = SyncSerialPort::open(path, config).map_err(|source| RunError::Open {
            channel: tag,
            path: path.to_string(),
            source,
        })?;
        let transcript =
            Transcript::create(transcript_path).map_err(|source| RunError::Results {
                path: transcript_path.to_path_buf(),
                source,
            })?;
        info!(channel = %tag, %path, transcript = %transcript_path.display(), "console opened");
        Self::attach(tag, Box::new(port), Some(transcript), sender, reporter).map_err(|source| {
            RunError::Open {
                channel: tag,
                path: path.to_string(),
                source,
            }
        })
    }

    /// Wrap an already open port: a cloned handle feeds the line source, the
    /// original becomes the write half.
    pub fn attach(
        tag: ChannelTag,
        port: Box<dyn SerialPortAdapter>,
        transcript: Option<Transcript>,
        sender: LineSender,
        reporter: Reporter,
    ) -> Result<Self, PortError> {
        let read_half = port.try_clone_adapter()?;
        let source = LineSource::spawn(tag, read_half, transcript, sender, reporter.clone());
        Ok(Self {
            writer: ChannelWriter::new(tag, port, reporter),
            source,
        })
    }

    pub fn tag(&self) -> ChannelTag {
        self.writer.tag()
    }

    pub fn writer(&mut self) -> &mut ChannelWriter {
        &mut self.writer
    }

    pub fn send(&mut self, text: &str) -> Result<(), PortError> {
        self.writer.send(text)
    }

    /// Stop the line source and release both handles.
    pub async fn close(self) -> SourceExit {
        let Self { writer, source } = self;
        drop(writer);
        source.close().await
    }
}
