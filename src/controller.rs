//! Run orchestration.
//!
//! The controller owns both consoles and the merged stream. It reboots the
//! board, runs the bootloader phase and, if the kernel starts, the test
//! phase. Whatever happens in between, [`RunController::run_until`] powers the
//! board off once and closes both consoles before returning the report.

use crate::channel::Console;
use crate::classify::{conclude, BootClassifier, RunContext, TestRunClassifier};
use crate::config::Config;
use crate::error::{RunError, RunResult};
use crate::line::ChannelTag;
use crate::outcome::{exit_code, FaultClass, Phase, PhaseResult, Verdict};
use crate::report::Reporter;
use crate::source::SourceExit;
use crate::stream::{merged_queue, MergedStream};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Flushes whatever the EC shell has buffered.
pub const FLUSH_COMMAND: &str = "\n";
pub const REBOOT_COMMAND: &str = "reboot\n";
pub const POWER_OFF_COMMAND: &str = "power off\n";

const INTERRUPTED: &str = "Run interrupted by operator, abandoning run.";

/// Device nodes of the two consoles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Devices {
    pub cpu: String,
    pub ec: String,
}

/// What a finished run looked like; written to the results directory.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub devices: Devices,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub bootloader: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<Verdict>,
    /// The deciding phase result.
    pub result: PhaseResult,
    pub transient_failures: u32,
    /// Lines classifiers consumed across both phases.
    pub lines_consumed: u64,
    pub interrupted: bool,
    pub exit_code: u8,
}

impl RunReport {
    /// Write the report as pretty JSON, creating parent directories.
    pub fn write(&self, path: &Path) -> RunResult<()> {
        let results = |source| RunError::Results {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(results)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(results)
    }
}

/// Drives one boot-and-test run.
#[derive(Debug)]
pub struct RunController {
    devices: Devices,
    cpu: Console,
    ec: Console,
    stream: MergedStream,
    ctx: RunContext,
    reporter: Reporter,
    summary_path: Option<PathBuf>,
    phase: Phase,
    boot: Option<Verdict>,
    test: Option<Verdict>,
}

impl RunController {
    /// Assemble a controller from consoles already feeding `stream`.
    ///
    /// The caller must not keep any other sender for `stream`, or a run whose
    /// consoles both die would wait out the full inactivity timeout.
    pub fn new(
        devices: Devices,
        cpu: Console,
        ec: Console,
        stream: MergedStream,
        ctx: RunContext,
        reporter: Reporter,
    ) -> Self {
        Self {
            devices,
            cpu,
            ec,
            stream,
            ctx,
            reporter,
            summary_path: None,
            phase: Phase::Bootloader,
            boot: None,
            test: None,
        }
    }

    /// Open both consoles and their transcripts as configured.
    pub fn open(
        devices: Devices,
        config: &Config,
        test_timeout: Duration,
        reporter: Reporter,
    ) -> RunResult<Self> {
        let port_config = config.serial.port_configuration();
        let (sender, stream) = merged_queue();

        let cpu = Console::open(
            ChannelTag::Cpu,
            &devices.cpu,
            &port_config,
            &config.results.cpu_transcript_path(),
            sender.clone(),
            reporter.clone(),
        )?;
        let ec = Console::open(
            ChannelTag::Ec,
            &devices.ec,
            &port_config,
            &config.results.ec_transcript_path(),
            sender,
            reporter.clone(),
        )?;

        let ctx = RunContext::new(config.phases.bootloader_timeout(), test_timeout)
            .with_transient_threshold(config.phases.transient_retry_threshold);
        Ok(Self::new(devices, cpu, ec, stream, ctx, reporter)
            .with_summary(config.results.summary_path()))
    }

    /// Where to write the run summary; `None` disables it.
    pub fn with_summary(mut self, path: Option<PathBuf>) -> Self {
        self.summary_path = path;
        self
    }

    /// Run both phases to completion.
    pub async fn run(self) -> RunReport {
        self.run_until(std::future::pending()).await
    }

    /// Run both phases, abandoning the run if `shutdown` completes first.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> RunReport {
        let started_at = Utc::now();
        info!(cpu = %self.devices.cpu, ec = %self.devices.ec, "run started");

        let interrupted = tokio::select! {
            () = self.execute() => false,
            () = shutdown => true,
        };

        if interrupted {
            warn!(phase = %self.phase, "run interrupted");
            let verdict = conclude(
                &self.reporter,
                Verdict::new(self.phase, PhaseResult::Abort).with_diagnostic(INTERRUPTED),
            );
            match self.phase {
                Phase::Bootloader => self.boot = Some(verdict),
                Phase::Test => self.test = Some(verdict),
            }
        }

        self.finish(started_at, interrupted).await
    }

    async fn execute(&mut self) {
        for command in [FLUSH_COMMAND, REBOOT_COMMAND] {
            if let Err(e) = self.ec.send(command) {
                let verdict = Verdict::new(Phase::Bootloader, PhaseResult::Abort)
                    .with_fault(FaultClass::Channel)
                    .with_diagnostic(format!("Failed to reboot the board ({}), abandoning run.", e));
                self.boot = Some(conclude(&self.reporter, verdict));
                return;
            }
        }

        self.phase = Phase::Bootloader;
        let mut lines = self
            .stream
            .phase(Phase::Bootloader.as_str(), self.ctx.bootloader_timeout);
        let boot = BootClassifier::new(&mut self.ctx, &self.reporter)
            .run(&mut lines, self.cpu.writer())
            .await;
        let proceed = boot.result == PhaseResult::Proceed;
        self.boot = Some(boot);
        if !proceed {
            return;
        }

        self.phase = Phase::Test;
        let mut lines = self.stream.phase(Phase::Test.as_str(), self.ctx.test_timeout);
        let test = TestRunClassifier::new(&self.reporter).run(&mut lines).await;
        self.test = Some(test);
    }

    async fn finish(self, started_at: DateTime<Utc>, interrupted: bool) -> RunReport {
        let Self {
            devices,
            cpu,
            mut ec,
            stream,
            ctx,
            reporter,
            summary_path,
            phase,
            boot,
            test,
        } = self;

        if let Err(e) = ec.send(POWER_OFF_COMMAND) {
            warn!(error = %e, "power off command failed");
            reporter.error(&format!("Failed to power off the board: {}", e));
        }
        close_logged(cpu).await;
        close_logged(ec).await;
        let lines_consumed = stream.delivered();
        drop(stream);

        // Only reachable without a boot verdict if shutdown won before the
        // reboot command was even issued.
        let boot = boot.unwrap_or_else(|| {
            Verdict::new(phase, PhaseResult::Abort).with_diagnostic(INTERRUPTED)
        });
        let result = test.as_ref().unwrap_or(&boot).result;
        let report = RunReport {
            devices,
            started_at,
            finished_at: Utc::now(),
            lines_consumed,
            bootloader: boot,
            test,
            result,
            transient_failures: ctx.transient_failures,
            interrupted,
            exit_code: exit_code(result),
        };
        info!(result = ?report.result, exit_code = report.exit_code, "run finished");

        if let Some(path) = summary_path {
            match report.write(&path) {
                Ok(()) => debug!(path = %path.display(), "run summary written"),
                Err(e) => warn!(error = %e, "failed to write run summary"),
            }
        }
        report
    }
}

async fn close_logged(console: Console) {
    let tag = console.tag();
    match console.close().await {
        SourceExit::Failed(reason) => warn!(channel = %tag, %reason, "console closed after a read failure"),
        other => debug!(channel = %tag, exit = ?other, "console closed"),
    }
}
