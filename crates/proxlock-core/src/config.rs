//! Startup configuration.
//!
//! proxlock has no configuration file: everything comes from the command
//! line. The binary fills in [`StartupOptions`] with raw user input, and
//! [`StartupOptions::validate`] turns it into a [`Config`], reporting every
//! problem at once. Nothing touches the radio or the relay until a `Config`
//! exists.

use std::time::Duration;

use thiserror::Error;

use crate::actuator::{PinAssignment, DEFAULT_LOCK_PIN, DEFAULT_UNLOCK_PIN};
use crate::controller::{Timing, DEFAULT_POLL_INTERVAL, DEFAULT_PULSE_INTERVAL};
use crate::device::{AddressError, DeviceAddress};
use crate::presence::{
    ProbeSettings, DEFAULT_L2PING_PROGRAM, DEFAULT_PROBE_CEILING, DEFAULT_PROBE_TIMEOUT_SECS,
};

/// Highest BCM GPIO number on the Raspberry Pi header.
pub const MAX_BCM_PIN: u8 = 27;

/// Longest accepted delay or probe ceiling, in seconds (one day).
pub const MAX_DELAY_SECS: f64 = 86_400.0;

/// Errors produced while validating startup options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The device address did not parse.
    #[error(transparent)]
    InvalidDevice(#[from] AddressError),

    /// A single field has an invalid value.
    #[error("{field}: {message}")]
    ValidationError {
        /// Option name.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// More than one field is invalid.
    #[error("{} invalid options: {}", .0.len(), join(.0))]
    MultipleValidationErrors(Vec<ConfigError>),
}

fn join(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConfigError {
    fn field(field: &'static str, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field,
            message: message.into(),
        }
    }
}

/// Result alias for configuration validation.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Validated configuration for one run of the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Key device address.
    pub device: DeviceAddress,
    /// Control loop delays.
    pub timing: Timing,
    /// Relay pins.
    pub pins: PinAssignment,
    /// Presence probe settings.
    pub probe: ProbeSettings,
}

/// Unvalidated startup options, as typed by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct StartupOptions {
    /// Key device MAC address.
    pub device: String,
    /// Pause between decision cycles, in seconds.
    pub poll_secs: f64,
    /// Pause between relay pulse phases, in seconds.
    pub pulse_secs: f64,
    /// BCM pin for the lock relay.
    pub lock_pin: u8,
    /// BCM pin for the unlock relay.
    pub unlock_pin: u8,
    /// `l2ping -t` value, in seconds.
    pub probe_timeout_secs: u32,
    /// Hard ceiling on a single probe, in seconds.
    pub probe_ceiling_secs: f64,
    /// Probe program.
    pub l2ping: String,
    /// Run the probe through `sudo`.
    pub use_sudo: bool,
}

impl StartupOptions {
    /// Options with every optional value at its default.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            poll_secs: DEFAULT_POLL_INTERVAL.as_secs_f64(),
            pulse_secs: DEFAULT_PULSE_INTERVAL.as_secs_f64(),
            lock_pin: DEFAULT_LOCK_PIN,
            unlock_pin: DEFAULT_UNLOCK_PIN,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            probe_ceiling_secs: DEFAULT_PROBE_CEILING.as_secs_f64(),
            l2ping: DEFAULT_L2PING_PROGRAM.to_string(),
            use_sudo: true,
        }
    }

    /// Validate every option and build a [`Config`].
    ///
    /// # Errors
    ///
    /// Returns the single error if exactly one option is invalid, otherwise
    /// [`ConfigError::MultipleValidationErrors`].
    pub fn validate(&self) -> ConfigResult<Config> {
        let mut errors = Vec::new();

        let device = DeviceAddress::parse(&self.device)
            .map_err(|e| errors.push(ConfigError::from(e)))
            .ok();

        let poll_interval = duration("prox_delay", self.poll_secs)
            .map_err(|e| errors.push(e))
            .ok();
        let pulse_interval = duration("gpio_delay", self.pulse_secs)
            .map_err(|e| errors.push(e))
            .ok();

        if self.lock_pin > MAX_BCM_PIN {
            errors.push(ConfigError::field(
                "lock_pin",
                format!("BCM pin must be 0-{MAX_BCM_PIN} (got {})", self.lock_pin),
            ));
        }
        if self.unlock_pin > MAX_BCM_PIN {
            errors.push(ConfigError::field(
                "unlock_pin",
                format!("BCM pin must be 0-{MAX_BCM_PIN} (got {})", self.unlock_pin),
            ));
        }
        if self.lock_pin == self.unlock_pin {
            errors.push(ConfigError::field(
                "unlock_pin",
                format!("must differ from lock_pin (both {})", self.lock_pin),
            ));
        }

        if self.probe_timeout_secs == 0 {
            errors.push(ConfigError::field(
                "probe_timeout",
                "must be at least 1 second",
            ));
        }
        let ceiling = duration("probe_ceiling", self.probe_ceiling_secs)
            .map_err(|e| errors.push(e))
            .ok();
        if let Some(ceiling) = ceiling {
            if ceiling < Duration::from_secs(u64::from(self.probe_timeout_secs)) {
                errors.push(ConfigError::field(
                    "probe_ceiling",
                    format!(
                        "must not be shorter than probe_timeout ({}s)",
                        self.probe_timeout_secs
                    ),
                ));
            }
        }

        if self.l2ping.trim().is_empty() {
            errors.push(ConfigError::field("l2ping", "program must not be empty"));
        }

        match (device, poll_interval, pulse_interval, ceiling) {
            (Some(device), Some(poll_interval), Some(pulse_interval), Some(ceiling))
                if errors.is_empty() =>
            {
                Ok(Config {
                    device,
                    timing: Timing {
                        poll_interval,
                        pulse_interval,
                    },
                    pins: PinAssignment {
                        lock: self.lock_pin,
                        unlock: self.unlock_pin,
                    },
                    probe: ProbeSettings {
                        program: self.l2ping.clone(),
                        use_sudo: self.use_sudo,
                        timeout_secs: self.probe_timeout_secs,
                        ceiling,
                    },
                })
            }
            _ if errors.len() == 1 => Err(errors.remove(0)),
            _ => Err(ConfigError::MultipleValidationErrors(errors)),
        }
    }
}

/// Convert user-supplied seconds into a [`Duration`].
fn duration(field: &'static str, secs: f64) -> ConfigResult<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(ConfigError::field(
            field,
            format!("must be a non-negative number of seconds (got {secs})"),
        ));
    }
    if secs > MAX_DELAY_SECS {
        return Err(ConfigError::field(
            field,
            format!("must not exceed {MAX_DELAY_SECS} seconds (got {secs})"),
        ));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| ConfigError::field(field, format!("out of range: {e}")))
}
