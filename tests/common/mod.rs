//! Shared test utilities for servo_run integration tests.
//!
//! This module provides:
//! - A mock rig: CPU and EC mock consoles plus captured operator output
//! - Controller construction against the rig with a temporary results directory
//! - Console log fixtures

#![allow(dead_code)]

use servo_run::channel::Console;
use servo_run::report::CapturedOutput;
use servo_run::transcript::Transcript;
use servo_run::{
    merged_queue, ChannelTag, Devices, MockSerialPort, Reporter, RunContext, RunController,
};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Short timeouts so silent-console tests finish quickly.
pub const BOOT_TIMEOUT: Duration = Duration::from_millis(400);
pub const TEST_TIMEOUT: Duration = Duration::from_millis(400);

/// Depthcharge output up to the point where it waits for input.
pub const DEPTHCHARGE_PROMPT: &[&str] = &[
    "coreboot-v1.9308_26_0.0.22 bootblock starting (log level: 7)...",
    "Starting depthcharge on cheza...",
    "load_archive: loading locale_en.bin",
];

/// A kernel that boots and runs a passing job.
pub const PASSING_JOB: &[&str] = &[
    "[    0.000000] Booting Linux on physical CPU 0x0000000000 [0x517f803c]",
    "[    2.118000] Run /init as init process",
    "dEQP-GLES2.functional.color_clear.single_rgb: Pass",
    "hwci: mesa: pass",
];

/// Two mock consoles, the operator output they produce, and a results directory.
pub struct Rig {
    pub cpu: MockSerialPort,
    pub ec: MockSerialPort,
    pub output: CapturedOutput,
    pub reporter: Reporter,
    pub results: TempDir,
}

impl Rig {
    pub fn new() -> Self {
        let (reporter, output) = Reporter::capture();
        Self {
            cpu: MockSerialPort::new("MOCK-CPU"),
            ec: MockSerialPort::new("MOCK-EC"),
            output,
            reporter,
            results: TempDir::new().expect("create results dir"),
        }
    }

    pub fn context(&self) -> RunContext {
        RunContext::new(BOOT_TIMEOUT, TEST_TIMEOUT)
    }

    pub fn cpu_transcript(&self) -> PathBuf {
        self.results.path().join("serial.txt")
    }

    pub fn ec_transcript(&self) -> PathBuf {
        self.results.path().join("serial-ec.txt")
    }

    pub fn summary(&self) -> PathBuf {
        self.results.path().join("summary.json")
    }

    /// Build a controller over clones of the rig's mock consoles.
    pub fn controller(&self, ctx: RunContext) -> RunController {
        let (sender, stream) = merged_queue();
        let cpu = Console::attach(
            ChannelTag::Cpu,
            Box::new(self.cpu.clone()),
            Some(Transcript::create(self.cpu_transcript()).expect("cpu transcript")),
            sender.clone(),
            self.reporter.clone(),
        )
        .expect("attach cpu console");
        let ec = Console::attach(
            ChannelTag::Ec,
            Box::new(self.ec.clone()),
            Some(Transcript::create(self.ec_transcript()).expect("ec transcript")),
            sender,
            self.reporter.clone(),
        )
        .expect("attach ec console");

        let devices = Devices {
            cpu: "MOCK-CPU".into(),
            ec: "MOCK-EC".into(),
        };
        RunController::new(devices, cpu, ec, stream, ctx, self.reporter.clone())
            .with_summary(Some(self.summary()))
    }

    /// Everything written to the EC console.
    pub fn ec_commands(&self) -> String {
        self.ec.written_text()
    }

    /// Read a transcript back, one entry per line.
    pub fn read_transcript(path: &std::path::Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .expect("read transcript")
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn read_summary(&self) -> serde_json::Value {
        let text = std::fs::read_to_string(self.summary()).expect("read summary");
        serde_json::from_str(&text).expect("parse summary")
    }
}

impl Default for Rig {
    fn default() -> Self {
        Self::new()
    }
}

/// Assert the board was powered off exactly once, after the reboot.
pub fn assert_powered_off_once(rig: &Rig) {
    let commands = rig.ec_commands();
    assert_eq!(commands.matches("power off\n").count(), 1, "{:?}", commands);
    assert!(commands.ends_with("power off\n"), "{:?}", commands);
}

/// Assert that only the rig's own handles are still open.
pub fn assert_consoles_released(rig: &Rig) {
    assert_eq!(rig.cpu.open_handles(), 1);
    assert_eq!(rig.ec.open_handles(), 1);
}
