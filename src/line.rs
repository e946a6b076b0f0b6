//! Console lines as they travel from a line source to a classifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which servo console a line came from (or a command went to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelTag {
    /// The application processor console; boot and test output.
    Cpu,
    /// The embedded controller console; reboot and power commands.
    Ec,
}

impl ChannelTag {
    /// Prefix written before every received line in transcripts and echoes.
    pub const fn read_prefix(self) -> &'static str {
        match self {
            Self::Cpu => "R SERIAL-CPU> ",
            Self::Ec => "R SERIAL-EC> ",
        }
    }

    /// Prefix for echoes of commands written to the console.
    pub const fn write_prefix(self) -> &'static str {
        match self {
            Self::Cpu => "W SERIAL-CPU> ",
            Self::Ec => "W SERIAL-EC> ",
        }
    }
}

impl fmt::Display for ChannelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Ec => f.write_str("ec"),
        }
    }
}

/// One complete console line, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// Console the line was read from.
    pub source: ChannelTag,
    /// 1-based position of the line within its own console.
    pub line_no: u64,
    /// Line content; `\r\n` and `\n` terminators are stripped.
    pub text: String,
    /// When the line source finished assembling the line.
    pub received_at: DateTime<Utc>,
}

impl LogLine {
    pub fn new(source: ChannelTag, line_no: u64, text: impl Into<String>) -> Self {
        Self {
            source,
            line_no,
            text: text.into(),
            received_at: Utc::now(),
        }
    }

    /// The line as it appears in the transcript: prefix followed by content.
    pub fn tagged(&self) -> String {
        format!("{}{}", self.source.read_prefix(), self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes() {
        assert_eq!(ChannelTag::Cpu.read_prefix(), "R SERIAL-CPU> ");
        assert_eq!(ChannelTag::Ec.read_prefix(), "R SERIAL-EC> ");
        assert_eq!(ChannelTag::Ec.write_prefix(), "W SERIAL-EC> ");
    }

    #[test]
    fn test_tagged_line() {
        let line = LogLine::new(ChannelTag::Cpu, 1, "Booting Linux on physical CPU 0x0");
        assert_eq!(line.tagged(), "R SERIAL-CPU> Booting Linux on physical CPU 0x0");
    }
}
