//! Command line interface.

use clap::Parser;
use proxlock_core::actuator::{DEFAULT_LOCK_PIN, DEFAULT_UNLOCK_PIN};
use proxlock_core::presence::{DEFAULT_L2PING_PROGRAM, DEFAULT_PROBE_TIMEOUT_SECS};
use proxlock_core::{ProxlockError, StartupOptions};

/// Exit status for invalid command line input (`EX_USAGE` in sysexits.h).
pub const EXIT_USAGE: u8 = 64;

/// Exit status when the relay hardware cannot be used (`EX_UNAVAILABLE`).
pub const EXIT_UNAVAILABLE: u8 = 69;

/// Unlock the door while the key phone is in Bluetooth range, lock it when it leaves.
#[derive(Debug, Clone, Parser)]
#[command(name = "proxlock", version, about)]
pub struct Cli {
    /// Bluetooth MAC address of the "key" device, e.g. AB:CD:EF:12:34:56
    pub device: String,

    /// Seconds to wait between proximity checks. l2ping itself takes a few
    /// seconds, so this only adds to that delay.
    #[arg(long, alias = "prox_delay", value_name = "SECS", default_value_t = 5.0)]
    pub prox_delay: f64,

    /// Seconds between relay on/off steps when simulating a button press.
    #[arg(long, alias = "gpio_delay", value_name = "SECS", default_value_t = 0.25)]
    pub gpio_delay: f64,

    /// BCM pin wired to the lock relay.
    #[arg(long, value_name = "BCM", default_value_t = DEFAULT_LOCK_PIN)]
    pub lock_pin: u8,

    /// BCM pin wired to the unlock relay.
    #[arg(long, value_name = "BCM", default_value_t = DEFAULT_UNLOCK_PIN)]
    pub unlock_pin: u8,

    /// Seconds l2ping waits for the echo reply.
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_PROBE_TIMEOUT_SECS)]
    pub probe_timeout: u32,

    /// Seconds after which a hung probe is killed and counted as absent.
    #[arg(long, value_name = "SECS", default_value_t = 5.0)]
    pub probe_ceiling: f64,

    /// Path to the l2ping program.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_L2PING_PROGRAM)]
    pub l2ping: String,

    /// Run l2ping directly instead of through sudo.
    #[arg(long)]
    pub no_sudo: bool,

    /// Log relay actions instead of driving GPIO.
    #[arg(long)]
    pub dry_run: bool,

    /// Use production logging (journald-friendly stdout plus JSON log files).
    #[arg(long)]
    pub production: bool,
}

impl Cli {
    /// Raw startup options for validation.
    #[must_use]
    pub fn startup_options(&self) -> StartupOptions {
        StartupOptions {
            device: self.device.clone(),
            poll_secs: self.prox_delay,
            pulse_secs: self.gpio_delay,
            lock_pin: self.lock_pin,
            unlock_pin: self.unlock_pin,
            probe_timeout_secs: self.probe_timeout,
            probe_ceiling_secs: self.probe_ceiling,
            l2ping: self.l2ping.clone(),
            use_sudo: !self.no_sudo,
        }
    }
}

/// Machine-readable code for a failure, `INTERNAL` if it is not a [`ProxlockError`].
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<ProxlockError>()
        .map_or("INTERNAL", ProxlockError::error_code)
}

/// Process exit status for a failure.
#[must_use]
pub fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ProxlockError>() {
        Some(e) if e.is_config_error() => EXIT_USAGE,
        Some(e) if e.is_hardware_error() => EXIT_UNAVAILABLE,
        _ => 1,
    }
}
