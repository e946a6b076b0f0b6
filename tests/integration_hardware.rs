//! Hardware integration tests.
//!
//! These tests need a servo attached to a real board and are ignored by default.
//! Point them at the consoles and run with:
//!
//! ```bash
//! SERVO_CPU_PORT=/dev/ttyUSB0 SERVO_EC_PORT=/dev/ttyUSB2 \
//!     cargo test --features hardware-tests -- --ignored
//! ```

#![cfg(feature = "hardware-tests")]

use servo_run::config::Config;
use servo_run::{Devices, Reporter, RunController};
use std::env;
use std::time::Duration;
use tempfile::TempDir;

fn devices_from_env() -> Option<Devices> {
    Some(Devices {
        cpu: env::var("SERVO_CPU_PORT").ok()?,
        ec: env::var("SERVO_EC_PORT").ok()?,
    })
}

#[tokio::test]
#[ignore]
async fn test_real_board_boots_through_bootloader() {
    let Some(devices) = devices_from_env() else {
        eprintln!("SERVO_CPU_PORT / SERVO_EC_PORT not set, skipping");
        return;
    };
    let results = TempDir::new().unwrap();
    let mut config = Config::default();
    config.results.dir = results.path().to_path_buf();

    let reporter = Reporter::stdout(false, true);
    let controller =
        RunController::open(devices, &config, Duration::from_secs(60), reporter).unwrap();
    let report = controller.run().await;

    assert_ne!(
        report.bootloader.fault,
        Some(servo_run::FaultClass::Channel),
        "{:?}",
        report.bootloader
    );
    assert!(results.path().join("serial.txt").exists());
    assert!(results.path().join("serial-ec.txt").exists());
    assert!(results.path().join("summary.json").exists());
}

#[test]
#[ignore]
fn test_missing_device_is_reported() {
    let config = Config::default();
    let (reporter, _output) = Reporter::capture();
    let devices = Devices {
        cpu: "/dev/servo-run-does-not-exist".into(),
        ec: "/dev/servo-run-does-not-exist-either".into(),
    };
    let err = tokio_test::block_on(async {
        RunController::open(devices, &config, Duration::from_secs(60), reporter)
    })
    .unwrap_err();
    assert!(err.to_string().contains("cpu console"), "{}", err);
}
