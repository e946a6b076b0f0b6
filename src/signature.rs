//! Known console signatures for both phases.
//!
//! Each table is evaluated top to bottom against every line and the first
//! matching entry wins. The entries are mutually exclusive in practice; the
//! order only matters for lines that should never exist. Adding a signature
//! means adding a row here, the classifiers do not change.

use crate::outcome::FaultClass;
use once_cell::sync::Lazy;
use regex::Regex;

/// How a signature recognizes a line.
#[derive(Debug)]
pub enum Matcher {
    /// Plain substring search.
    Literal(&'static str),
    /// Regular expression; capture group 1, if present, is the signature's token.
    Pattern(Regex),
}

impl Matcher {
    fn pattern(source: &str) -> Self {
        // Patterns are compile-time constants covered by the tests below.
        Self::Pattern(Regex::new(source).expect("signature pattern must compile"))
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Literal(needle) => text.contains(needle),
            Self::Pattern(re) => re.is_match(text),
        }
    }

    /// The token a structured signature extracts from the line.
    pub fn token<'t>(&self, text: &'t str) -> Option<&'t str> {
        match self {
            Self::Literal(_) => None,
            Self::Pattern(re) => re
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str()),
        }
    }
}

/// One row of a signature table.
#[derive(Debug)]
pub struct Signature<A> {
    /// Stable identifier, used in logs and the run summary.
    pub name: &'static str,
    pub matcher: Matcher,
    /// What the classifier does when this signature matches.
    pub action: A,
    pub fault: Option<FaultClass>,
    /// Operator-facing diagnostic for abnormal outcomes.
    pub diagnostic: Option<&'static str>,
}

/// Return the first signature in `table` that matches `text`.
pub fn first_match<'s, A>(table: &'s [Signature<A>], text: &str) -> Option<&'s Signature<A>> {
    table.iter().find(|sig| sig.matcher.is_match(text))
}

/// Reactions available during the bootloader phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootAction {
    /// Ask the firmware for a network boot (send ^N), then proceed.
    RequestNetboot,
    /// The kernel is starting; proceed.
    Proceed,
    /// Count a transient fault; retry once the threshold is reached.
    CountTransient,
    /// Give up on this run.
    Abort,
}

/// Reactions available during the test phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestAction {
    /// The run failed.
    Fail,
    /// The harness printed its result; the token decides pass or fail.
    HarnessResult,
}

/// The harness token that means success.
pub const PASS_TOKEN: &str = "pass";

/// Bootloader phase signatures, in priority order.
pub static BOOT_SIGNATURES: Lazy<Vec<Signature<BootAction>>> = Lazy::new(|| {
    vec![
        // Printed right when depthcharge pauses to check for input; the board
        // has no direct-to-netboot firmware.
        Signature {
            name: "locale_archive",
            matcher: Matcher::Literal("load_archive: loading locale_en.bin"),
            action: BootAction::RequestNetboot,
            fault: None,
            diagnostic: None,
        },
        // Netboot-capable firmware already got to the kernel.
        Signature {
            name: "booting_linux",
            matcher: Matcher::Literal("Booting Linux"),
            action: BootAction::Proceed,
            fault: None,
            diagnostic: None,
        },
        // The firmware occasionally loops in this state during TFTP, depending on
        // network traffic; a reboot usually recovers it.
        Signature {
            name: "r8152_bulk_read",
            matcher: Matcher::Literal("R8152: Bulk read error 0xffffffbf"),
            action: BootAction::CountTransient,
            fault: Some(FaultClass::TransientHardware),
            diagnostic: Some("Detected intermittent tftp failure, restarting run."),
        },
        Signature {
            name: "power_good_timeout",
            matcher: Matcher::Literal("POWER_GOOD not seen in time"),
            action: BootAction::Abort,
            fault: Some(FaultClass::FatalHardware),
            diagnostic: Some("Detected intermittent poweron failure, abandoning run."),
        },
    ]
});

/// Test phase signatures, in priority order.
pub static TEST_SIGNATURES: Lazy<Vec<Signature<TestAction>>> = Lazy::new(|| {
    vec![
        Signature {
            name: "kernel_panic",
            matcher: Matcher::pattern(r"---. end Kernel panic"),
            action: TestAction::Fail,
            fault: Some(FaultClass::Software),
            diagnostic: Some("Detected kernel panic, abandoning run."),
        },
        // Rare bus errors during power management transitions.
        Signature {
            name: "serror_bus_error",
            matcher: Matcher::Literal("Kernel panic - not syncing: Asynchronous SError Interrupt"),
            action: TestAction::Fail,
            fault: Some(FaultClass::FatalHardware),
            diagnostic: Some("Detected power management bus error, abandoning run."),
        },
        Signature {
            name: "netdev_watchdog",
            matcher: Matcher::Literal("NETDEV WATCHDOG"),
            action: TestAction::Fail,
            fault: Some(FaultClass::Environment),
            diagnostic: Some("Detected network device failure, abandoning run."),
        },
        // No such message id exists: the HFI queue parse went wrong, usually
        // right after a GPU fault, and breaks every test after it.
        Signature {
            name: "hfi_unexpected_message",
            matcher: Matcher::pattern(
                r"a6xx_hfi_send_msg.*Unexpected message id .* on the response queue",
            ),
            action: TestAction::Fail,
            fault: Some(FaultClass::Software),
            diagnostic: Some(
                "Detected malformed HFI response queue message (possible memory corruption near a GPU fault), abandoning run.",
            ),
        },
        Signature {
            name: "spontaneous_reboot",
            matcher: Matcher::pattern(r"coreboot.*bootblock starting"),
            action: TestAction::Fail,
            fault: Some(FaultClass::Software),
            diagnostic: Some("Detected spontaneous reboot, abandoning run."),
        },
        Signature {
            name: "smmu_tlb_sync_timeout",
            matcher: Matcher::pattern(
                r"arm-smmu [^:]+: TLB sync timed out -- SMMU may be deadlocked",
            ),
            action: TestAction::Fail,
            fault: Some(FaultClass::FatalHardware),
            diagnostic: Some("Detected MMU deadlock, abandoning run."),
        },
        Signature {
            name: "harness_result",
            matcher: Matcher::pattern(r"(?:hwci: mesa|test harness result): (\S*)"),
            action: TestAction::HarnessResult,
            fault: Some(FaultClass::ExplicitResult),
            diagnostic: None,
        },
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    fn boot(text: &str) -> Option<&'static str> {
        first_match(&BOOT_SIGNATURES, text).map(|s| s.name)
    }

    fn test(text: &str) -> Option<&'static str> {
        first_match(&TEST_SIGNATURES, text).map(|s| s.name)
    }

    #[test]
    fn test_boot_table_matches_real_lines() {
        assert_eq!(
            boot("load_archive: loading locale_en.bin"),
            Some("locale_archive")
        );
        assert_eq!(
            boot("[    0.000000] Booting Linux on physical CPU 0x0000000000 [0x517f803c]"),
            Some("booting_linux")
        );
        assert_eq!(
            boot("R8152: Bulk read error 0xffffffbf"),
            Some("r8152_bulk_read")
        );
        assert_eq!(
            boot("ERROR: POWER_GOOD not seen in time"),
            Some("power_good_timeout")
        );
        assert_eq!(boot("Starting depthcharge on cheza..."), None);
    }

    #[test]
    fn test_test_table_matches_real_lines() {
        assert_eq!(
            test("[  123.4] ---[ end Kernel panic - not syncing: Fatal exception ]---"),
            Some("kernel_panic")
        );
        assert_eq!(
            test("Kernel panic - not syncing: Asynchronous SError Interrupt"),
            Some("serror_bus_error")
        );
        assert_eq!(
            test("NETDEV WATCHDOG: eth0 (r8152): transmit queue 0 timed out"),
            Some("netdev_watchdog")
        );
        assert_eq!(
            test("msm 5000000.gpu: [drm:a6xx_hfi_send_msg] *ERROR* Unexpected message id 106 on the response queue"),
            Some("hfi_unexpected_message")
        );
        assert_eq!(
            test("coreboot-v1.9308_26_0.0.22-2599-g232a8f1 Fri Jan 10 bootblock starting..."),
            Some("spontaneous_reboot")
        );
        assert_eq!(
            test("arm-smmu 5040000.iommu: TLB sync timed out -- SMMU may be deadlocked"),
            Some("smmu_tlb_sync_timeout")
        );
        assert_eq!(test("hwci: mesa: pass"), Some("harness_result"));
        assert_eq!(test("test harness result: fail"), Some("harness_result"));
        assert_eq!(test("dEQP-GLES2.functional.color_clear.single_rgb: Pass"), None);
    }

    #[test]
    fn test_harness_token_extraction() {
        let sig = first_match(&TEST_SIGNATURES, "test harness result: pass").unwrap();
        assert_eq!(sig.matcher.token("test harness result: pass"), Some(PASS_TOKEN));
        assert_eq!(sig.matcher.token("hwci: mesa: fail"), Some("fail"));
        assert_eq!(sig.matcher.token("hwci: mesa: "), Some(""));
    }

    #[test]
    fn test_literal_matcher_has_no_token() {
        let matcher = Matcher::Literal("NETDEV WATCHDOG");
        assert!(matcher.is_match("NETDEV WATCHDOG: eth0"));
        assert_eq!(matcher.token("NETDEV WATCHDOG: eth0"), None);
    }

    #[test]
    fn test_every_failure_has_a_diagnostic() {
        for sig in BOOT_SIGNATURES.iter() {
            if matches!(sig.action, BootAction::Abort | BootAction::CountTransient) {
                assert!(sig.diagnostic.is_some(), "{}", sig.name);
            }
        }
        for sig in TEST_SIGNATURES.iter() {
            if sig.action == TestAction::Fail {
                assert!(sig.diagnostic.is_some(), "{}", sig.name);
            }
        }
    }
}
