use super::{conclude, RunContext};
use crate::channel::ChannelWriter;
use crate::outcome::{FaultClass, Phase, PhaseResult, Verdict};
use crate::report::Reporter;
use crate::signature::{first_match, BootAction, Signature, BOOT_SIGNATURES};
use crate::stream::{PhaseLines, StreamItem};
use tracing::{info, warn};

/// ^N: asks depthcharge for a network boot.
pub const NETBOOT_REQUEST: &str = "\u{0e}";

const BOOTLOADER_TIMEOUT: &str = "Failed to make it through bootloader, abandoning run.";
const CONSOLES_CLOSED: &str = "Serial consoles closed during the bootloader phase, abandoning run.";

/// Watches the bootloader phase until the kernel starts or the run is hopeless.
#[derive(Debug)]
pub struct BootClassifier<'a> {
    ctx: &'a mut RunContext,
    reporter: &'a Reporter,
}

impl<'a> BootClassifier<'a> {
    pub fn new(ctx: &'a mut RunContext, reporter: &'a Reporter) -> Self {
        Self { ctx, reporter }
    }

    /// Consume lines until a terminal signature, the inactivity timeout, or
    /// the end of the stream. `cpu` receives the netboot request.
    pub async fn run(&mut self, lines: &mut PhaseLines<'_>, cpu: &mut ChannelWriter) -> Verdict {
        let verdict = loop {
            let line = match lines.next().await {
                StreamItem::Line(line) => line,
                StreamItem::Timeout(_) => {
                    break Verdict::new(Phase::Bootloader, PhaseResult::Abort)
                        .with_fault(FaultClass::Timeout)
                        .with_diagnostic(BOOTLOADER_TIMEOUT)
                }
                StreamItem::Closed => {
                    break Verdict::new(Phase::Bootloader, PhaseResult::Timeout)
                        .with_fault(FaultClass::Channel)
                        .with_diagnostic(CONSOLES_CLOSED)
                }
            };

            let Some(sig) = first_match(&BOOT_SIGNATURES, &line.text) else {
                continue;
            };

            if let Some(verdict) = self.react(sig, cpu) {
                break verdict.with_line(line.text);
            }
        };
        conclude(self.reporter, verdict)
    }

    fn react(&mut self, sig: &Signature<BootAction>, cpu: &mut ChannelWriter) -> Option<Verdict> {
        let verdict = |result| {
            let verdict = Verdict::new(Phase::Bootloader, result).with_signature(sig.name);
            let verdict = match sig.fault {
                Some(fault) => verdict.with_fault(fault),
                None => verdict,
            };
            match sig.diagnostic {
                Some(diagnostic) => verdict.with_diagnostic(diagnostic),
                None => verdict,
            }
        };

        match sig.action {
            BootAction::RequestNetboot => {
                info!(signature = sig.name, "bootloader waiting for input, requesting netboot");
                if let Err(e) = cpu.send(NETBOOT_REQUEST) {
                    return Some(
                        verdict(PhaseResult::Abort)
                            .with_fault(FaultClass::Channel)
                            .with_diagnostic(format!(
                                "Failed to request network boot ({}), abandoning run.",
                                e
                            )),
                    );
                }
                Some(verdict(PhaseResult::Proceed))
            }
            BootAction::Proceed => Some(verdict(PhaseResult::Proceed)),
            BootAction::CountTransient => {
                self.ctx.transient_failures += 1;
                warn!(
                    signature = sig.name,
                    count = self.ctx.transient_failures,
                    threshold = self.ctx.transient_threshold,
                    "transient bootloader fault"
                );
                (self.ctx.transient_failures >= self.ctx.transient_threshold)
                    .then(|| verdict(PhaseResult::Retry))
            }
            BootAction::Abort => Some(verdict(PhaseResult::Abort)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::{ChannelTag, LogLine};
    use crate::port::MockSerialPort;
    use crate::stream::merged_queue;
    use std::time::Duration;

    struct Harness {
        ctx: RunContext,
        reporter: Reporter,
        output: crate::report::CapturedOutput,
        cpu_port: MockSerialPort,
        cpu: ChannelWriter,
    }

    fn harness() -> Harness {
        let (reporter, output) = Reporter::capture();
        let cpu_port = MockSerialPort::new("MOCK-CPU");
        let cpu = ChannelWriter::new(ChannelTag::Cpu, Box::new(cpu_port.clone()), reporter.clone());
        Harness {
            ctx: RunContext::new(Duration::from_millis(100), Duration::from_secs(1)),
            reporter,
            output,
            cpu_port,
            cpu,
        }
    }

    async fn classify(h: &mut Harness, lines: &[(ChannelTag, &str)]) -> Verdict {
        let (tx, mut stream) = merged_queue();
        for (n, (tag, text)) in lines.iter().enumerate() {
            tx.publish(LogLine::new(*tag, n as u64 + 1, *text));
        }
        let mut phase = stream.phase("bootloader", h.ctx.bootloader_timeout);
        let verdict = BootClassifier::new(&mut h.ctx, &h.reporter)
            .run(&mut phase, &mut h.cpu)
            .await;
        drop(tx);
        verdict
    }

    #[tokio::test]
    async fn test_locale_archive_requests_netboot() {
        let mut h = harness();
        let verdict = classify(
            &mut h,
            &[
                (ChannelTag::Cpu, "Starting depthcharge on cheza..."),
                (ChannelTag::Cpu, "load_archive: loading locale_en.bin"),
            ],
        )
        .await;

        assert_eq!(verdict.result, PhaseResult::Proceed);
        assert_eq!(verdict.signature, Some("locale_archive"));
        assert_eq!(h.cpu_port.get_write_log(), vec![vec![0x0e]]);
    }

    #[tokio::test]
    async fn test_booting_linux_proceeds_without_writing() {
        let mut h = harness();
        let verdict = classify(&mut h, &[(ChannelTag::Cpu, "[    0.000000] Booting Linux on physical CPU 0x0")]).await;

        assert_eq!(verdict.result, PhaseResult::Proceed);
        assert!(h.cpu_port.get_write_log().is_empty());
        assert!(h.output.text().is_empty());
    }

    #[tokio::test]
    async fn test_power_good_aborts_from_ec_console() {
        let mut h = harness();
        let verdict = classify(
            &mut h,
            &[
                (ChannelTag::Ec, "POWER_GOOD not seen in time"),
                (ChannelTag::Cpu, "Booting Linux"),
            ],
        )
        .await;

        assert_eq!(verdict.result, PhaseResult::Abort);
        assert_eq!(verdict.fault, Some(FaultClass::FatalHardware));
        assert_eq!(
            h.output.lines(),
            vec!["Detected intermittent poweron failure, abandoning run."]
        );
    }

    #[tokio::test]
    async fn test_nine_bulk_read_errors_then_milestone_proceeds() {
        let mut h = harness();
        let mut lines = vec![(ChannelTag::Cpu, "R8152: Bulk read error 0xffffffbf"); 9];
        lines.push((ChannelTag::Cpu, "Booting Linux on physical CPU 0x0"));
        let verdict = classify(&mut h, &lines).await;

        assert_eq!(verdict.result, PhaseResult::Proceed);
        assert_eq!(h.ctx.transient_failures, 9);
    }

    #[tokio::test]
    async fn test_ten_bulk_read_errors_retry() {
        let mut h = harness();
        let mut lines = vec![(ChannelTag::Cpu, "R8152: Bulk read error 0xffffffbf"); 10];
        lines.push((ChannelTag::Cpu, "Booting Linux on physical CPU 0x0"));
        let verdict = classify(&mut h, &lines).await;

        assert_eq!(verdict.result, PhaseResult::Retry);
        assert_eq!(verdict.fault, Some(FaultClass::TransientHardware));
        assert_eq!(h.ctx.transient_failures, 10);
        assert_eq!(
            h.output.lines(),
            vec!["Detected intermittent tftp failure, restarting run."]
        );
    }

    #[tokio::test]
    async fn test_silence_aborts() {
        let mut h = harness();
        let verdict = classify(&mut h, &[(ChannelTag::Cpu, "coreboot-v1 romstage starting")]).await;

        assert_eq!(verdict.result, PhaseResult::Abort);
        assert_eq!(verdict.fault, Some(FaultClass::Timeout));
        assert_eq!(h.output.lines(), vec![BOOTLOADER_TIMEOUT]);
    }

    #[tokio::test]
    async fn test_closed_stream_is_timeout() {
        let mut h = harness();
        let (tx, mut stream) = merged_queue();
        drop(tx);
        let mut phase = stream.phase("bootloader", Duration::from_secs(5));
        let verdict = BootClassifier::new(&mut h.ctx, &h.reporter)
            .run(&mut phase, &mut h.cpu)
            .await;
        assert_eq!(verdict.result, PhaseResult::Timeout);
        assert_eq!(verdict.fault, Some(FaultClass::Channel));
    }

    #[tokio::test]
    async fn test_netboot_write_failure_aborts() {
        let mut h = harness();
        h.cpu_port.disconnect();
        let verdict = classify(&mut h, &[(ChannelTag::Cpu, "load_archive: loading locale_en.bin")]).await;

        assert_eq!(verdict.result, PhaseResult::Abort);
        assert_eq!(verdict.fault, Some(FaultClass::Channel));
        assert!(h.output.text().contains("Failed to request network boot"));
    }
}
