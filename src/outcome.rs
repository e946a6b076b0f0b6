//! Phase outcomes, fault classes and exit status mapping.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two phases a run goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Bootloader,
    Test,
}

impl Phase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bootloader => "bootloader",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseResult {
    /// The bootloader handed over to the kernel; start the test phase.
    Proceed,
    /// A known intermittent fault hit its threshold; an external retry may help.
    Retry,
    /// The board cannot get through this run.
    Abort,
    /// The test harness reported success.
    Pass,
    /// A fault signature matched, or the harness reported failure.
    Fail,
    /// Every console closed before the phase reached a decision.
    Timeout,
}

impl PhaseResult {
    /// Whether this is the one outcome that makes the run succeed.
    pub const fn is_pass(self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Why a phase ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultClass {
    /// Known glitch that usually goes away on reboot (counted).
    TransientHardware,
    /// Power rail, bus error or IOMMU deadlock.
    FatalHardware,
    /// Kernel panic, firmware message corruption, unexpected reboot.
    Software,
    /// Lab infrastructure, e.g. the network device dying.
    Environment,
    /// No console output within the phase's inactivity timeout.
    Timeout,
    /// The test harness reported its own result.
    ExplicitResult,
    /// A console could not be written, or every console closed.
    Channel,
}

/// The decision a phase reached, with enough context to explain it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub phase: Phase,
    pub result: PhaseResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<FaultClass>,
    /// Name of the signature that decided the phase, if one did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<&'static str>,
    /// Operator-facing explanation, printed for abnormal outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    /// The console line that decided the phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
}

impl Verdict {
    pub fn new(phase: Phase, result: PhaseResult) -> Self {
        Self {
            phase,
            result,
            fault: None,
            signature: None,
            diagnostic: None,
            line: None,
        }
    }

    pub fn with_fault(mut self, fault: FaultClass) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn with_signature(mut self, name: &'static str) -> Self {
        self.signature = Some(name);
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }

    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.line = Some(line.into());
        self
    }
}

/// Process exit status for the final verdict.
///
/// Retry, Abort, Fail and Timeout all collapse to 1; CI retry policies key on
/// the printed diagnostic, not the code.
pub const fn exit_code(result: PhaseResult) -> u8 {
    if result.is_pass() {
        0
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(PhaseResult::Pass), 0);
        for result in [
            PhaseResult::Proceed,
            PhaseResult::Retry,
            PhaseResult::Abort,
            PhaseResult::Fail,
            PhaseResult::Timeout,
        ] {
            assert_eq!(exit_code(result), 1, "{:?}", result);
        }
    }

    #[test]
    fn test_verdict_serialization_skips_empty_fields() {
        let verdict = Verdict::new(Phase::Test, PhaseResult::Fail)
            .with_fault(FaultClass::Environment)
            .with_signature("netdev_watchdog");
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["phase"], "test");
        assert_eq!(json["result"], "Fail");
        assert_eq!(json["fault"], "environment");
        assert_eq!(json["signature"], "netdev_watchdog");
        assert!(json.get("diagnostic").is_none());
    }
}
