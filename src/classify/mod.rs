//! Phase classifiers.
//!
//! Each classifier drains the merged stream for one phase and reduces it to a
//! [`Verdict`]. Faults never escape as errors: the worst a classifier does is
//! print a diagnostic and return a failing verdict.

mod boot;
mod test_run;

pub use boot::{BootClassifier, NETBOOT_REQUEST};
pub use test_run::TestRunClassifier;

use crate::outcome::{PhaseResult, Verdict};
use crate::report::Reporter;
use std::time::Duration;
use tracing::info;

/// Per-run settings and tallies, owned by the controller and lent to the
/// active classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Bootloader phase inactivity timeout.
    pub bootloader_timeout: Duration,
    /// Test phase inactivity timeout.
    pub test_timeout: Duration,
    /// Transient faults tolerated before the boot phase asks for a retry.
    pub transient_threshold: u32,
    /// Transient faults seen so far in this process.
    pub transient_failures: u32,
}

impl RunContext {
    pub fn new(bootloader_timeout: Duration, test_timeout: Duration) -> Self {
        Self {
            bootloader_timeout,
            test_timeout,
            transient_threshold: 10,
            transient_failures: 0,
        }
    }

    pub fn with_transient_threshold(mut self, threshold: u32) -> Self {
        self.transient_threshold = threshold;
        self
    }
}

/// Log the verdict and print its diagnostic, if any.
pub(crate) fn conclude(reporter: &Reporter, verdict: Verdict) -> Verdict {
    info!(
        phase = %verdict.phase,
        result = ?verdict.result,
        fault = ?verdict.fault,
        signature = verdict.signature.unwrap_or("-"),
        "phase concluded"
    );
    if let Some(diagnostic) = &verdict.diagnostic {
        match verdict.result {
            PhaseResult::Proceed | PhaseResult::Pass => reporter.notice(diagnostic),
            _ => reporter.error(diagnostic),
        }
    }
    verdict
}
