//! Per-console transcript files.

use crate::line::LogLine;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Append-only plain-text record of every line received on one console.
///
/// Each line is written as `<read prefix><text>` and flushed immediately, so
/// the file is complete up to the last received line even if the process is
/// killed by the CI job timeout.
#[derive(Debug)]
pub struct Transcript {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Transcript {
    /// Create (or truncate) the transcript, creating parent directories.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Append one line.
    pub fn append(&mut self, line: &LogLine) -> io::Result<()> {
        writeln!(self.writer, "{}", line.tagged())?;
        self.writer.flush()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
