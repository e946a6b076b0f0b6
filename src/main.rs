use clap::Parser;
use servo_run::config::{Config, ConfigLoader, LogFormat, LoggingConfig};
use servo_run::{Devices, Reporter, RunController};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::signal;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// A week; longer than any CI job is allowed to run.
const MAX_TEST_TIMEOUT_MINUTES: u64 = 7 * 24 * 60;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Reboot a servo-attached board, watch its consoles, and report whether the test run passed.",
    long_about = "Drives a device under test through its CPU and EC serial consoles: reboots it, \
                  requests a network boot when the firmware asks, classifies the boot and test \
                  logs against known fault signatures, and powers the board off when done. \
                  Exits 0 only when the test harness reports a pass."
)]
struct Args {
    /// CPU console device
    #[arg(long, value_name = "DEVICE")]
    cpu: String,

    /// EC console device
    #[arg(long, value_name = "DEVICE")]
    ec: String,

    /// Test phase inactivity timeout, in minutes
    #[arg(
        long,
        value_name = "MINUTES",
        value_parser = clap::value_parser!(u64).range(1..=MAX_TEST_TIMEOUT_MINUTES)
    )]
    test_timeout: u64,

    /// Bootloader phase inactivity timeout, in seconds
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    bootloader_timeout: Option<u64>,

    /// Directory for transcripts and the run summary
    #[arg(long, value_name = "DIR")]
    results_dir: Option<PathBuf>,

    /// Configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Disable ANSI colors in operator output
    #[arg(long)]
    no_color: bool,
}

impl Args {
    fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.test_timeout * 60)
    }

    fn apply(&self, config: &mut Config) {
        if let Some(secs) = self.bootloader_timeout {
            config.phases.bootloader_timeout_secs = secs;
        }
        if let Some(dir) = &self.results_dir {
            config.results.dir = dir.clone();
        }
        if self.no_color {
            config.output.color = false;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match ConfigLoader::load(args.config.as_deref()) {
        Ok(loader) => loader.into_config(),
        Err(e) => {
            eprintln!("servo_run: {}", e);
            return ExitCode::FAILURE;
        }
    };
    args.apply(&mut config);
    init_tracing(&config.logging);

    let reporter = Reporter::stdout(config.output.color, config.output.timestamps);
    let test_timeout = args.test_timeout();
    let devices = Devices {
        cpu: args.cpu,
        ec: args.ec,
    };

    let controller = match RunController::open(devices, &config, test_timeout, reporter.clone()) {
        Ok(controller) => controller,
        Err(e) => {
            error!(error = %e, "run setup failed");
            reporter.error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let report = controller.run_until(shutdown_signal()).await;
    ExitCode::from(report.exit_code)
}

/// Structured logs go to stderr; stdout carries the operator transcript.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

// --- Operator interruption ---
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(test_timeout: &str) -> Result<Args, clap::Error> {
        Args::try_parse_from([
            "servo_run",
            "--cpu",
            "/dev/ttyUSB0",
            "--ec",
            "/dev/ttyUSB2",
            "--test-timeout",
            test_timeout,
        ])
    }

    #[test]
    fn test_timeout_minutes_become_seconds() {
        let args = parse("20").unwrap();
        assert_eq!(args.test_timeout(), Duration::from_secs(1200));
        assert_eq!(args.bootloader_timeout, None);
    }

    #[test]
    fn test_timeout_bounds_are_enforced() {
        assert!(parse("0").is_err());
        assert!(parse(&(MAX_TEST_TIMEOUT_MINUTES + 1).to_string()).is_err());
        assert!(parse(&u64::MAX.to_string()).is_err());

        let longest = parse(&MAX_TEST_TIMEOUT_MINUTES.to_string()).unwrap();
        assert_eq!(longest.test_timeout(), Duration::from_secs(7 * 24 * 3600));
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::try_parse_from([
            "servo_run",
            "--cpu",
            "a",
            "--ec",
            "b",
            "--test-timeout",
            "5",
            "--bootloader-timeout",
            "300",
            "--results-dir",
            "/tmp/run-42",
            "--no-color",
        ])
        .unwrap();
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.phases.bootloader_timeout_secs, 300);
        assert_eq!(config.results.dir, PathBuf::from("/tmp/run-42"));
        assert!(!config.output.color);
    }
}
