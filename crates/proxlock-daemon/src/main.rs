//! # proxlock
//!
//! Raspberry Pi Bluetooth proximity door lock.
//!
//! Pass the Bluetooth MAC address of the "key" phone as the first argument.
//! While the phone answers `l2ping` the door stays unlocked; once it stops
//! answering the lock relay is pulsed. Relay timing and pins can be adjusted
//! for other relay hats.
//!
//! SIGINT or SIGTERM stops the loop after the current cycle and leaves both
//! relay lines low.
//!
//! ## Running
//!
//! ```bash
//! # Development, no relay attached
//! cargo run --package proxlock-daemon -- AB:CD:EF:12:34:56 --dry-run
//!
//! # Production (on Raspberry Pi)
//! ./proxlock AB:CD:EF:12:34:56 --production
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use proxlock_core::{L2pingProber, LockController, ProxlockError, ThreadSleeper};
use proxlock_daemon::cli::{self, Cli};
use proxlock_daemon::{hardware, logging, shutdown};
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Logging may not be up yet, so report on stderr directly.
            eprintln!("Error [{}]: {err:#}", cli::error_code(&err));
            ExitCode::from(cli::exit_status(&err))
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    // Validate before touching the radio or the relay.
    let config = cli
        .startup_options()
        .validate()
        .map_err(ProxlockError::from)
        .context("Invalid startup arguments")?;

    logging::init(cli.production)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        device = %config.device,
        lock_pin = config.pins.lock,
        unlock_pin = config.pins.unlock,
        probe_ceiling_ms = config.probe.ceiling.as_millis(),
        dry_run = cli.dry_run,
        "Starting proxlock"
    );

    let actuator = hardware::open_actuator(config.pins, cli.dry_run)
        .context("Failed to open relay outputs")?;
    let prober = L2pingProber::new(config.probe);

    let stop = Arc::new(AtomicBool::new(false));
    shutdown::watch(Arc::clone(&stop)).context("Failed to install signal handlers")?;

    // The control loop blocks, so it gets a thread of its own.
    tokio::task::spawn_blocking(move || {
        let mut controller =
            LockController::start(config.device, config.timing, prober, actuator, ThreadSleeper);
        controller.run(&stop);
    })
    .await
    .context("Control loop panicked")?;

    info!("proxlock stopped");
    Ok(())
}
