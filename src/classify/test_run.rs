use super::conclude;
use crate::outcome::{FaultClass, Phase, PhaseResult, Verdict};
use crate::report::Reporter;
use crate::signature::{first_match, TestAction, PASS_TOKEN, TEST_SIGNATURES};
use crate::stream::{PhaseLines, StreamItem};
use tracing::info;

const NO_RESULT: &str = "Reached the end of the CPU serial log without finding a result";
const CONSOLES_CLOSED: &str = "Serial consoles closed before the test harness reported a result";

/// Watches the test phase for crash signatures and the harness result.
#[derive(Debug)]
pub struct TestRunClassifier<'a> {
    reporter: &'a Reporter,
}

impl<'a> TestRunClassifier<'a> {
    pub fn new(reporter: &'a Reporter) -> Self {
        Self { reporter }
    }

    /// Consume lines until the first fault signature or harness result.
    /// Nothing after the deciding line is looked at.
    pub async fn run(&mut self, lines: &mut PhaseLines<'_>) -> Verdict {
        let verdict = loop {
            let line = match lines.next().await {
                StreamItem::Line(line) => line,
                StreamItem::Timeout(_) => {
                    break Verdict::new(Phase::Test, PhaseResult::Fail)
                        .with_fault(FaultClass::Timeout)
                        .with_diagnostic(NO_RESULT)
                }
                StreamItem::Closed => {
                    break Verdict::new(Phase::Test, PhaseResult::Timeout)
                        .with_fault(FaultClass::Channel)
                        .with_diagnostic(CONSOLES_CLOSED)
                }
            };

            let Some(sig) = first_match(&TEST_SIGNATURES, &line.text) else {
                continue;
            };

            let mut verdict = Verdict::new(Phase::Test, PhaseResult::Fail).with_signature(sig.name);
            if let Some(fault) = sig.fault {
                verdict = verdict.with_fault(fault);
            }
            if let Some(diagnostic) = sig.diagnostic {
                verdict = verdict.with_diagnostic(diagnostic);
            }

            if sig.action == TestAction::HarnessResult {
                let token = sig.matcher.token(&line.text).unwrap_or_default();
                info!(token, "test harness reported a result");
                if token == PASS_TOKEN {
                    verdict.result = PhaseResult::Pass;
                } else {
                    verdict = verdict
                        .with_diagnostic(format!("Test harness reported result {:?}", token));
                }
            }
            break verdict.with_line(line.text);
        };
        conclude(self.reporter, verdict)
    }
}
