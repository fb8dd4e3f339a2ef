//! Relay output lines.
//!
//! The door lock is wired to a two channel relay board: one channel simulates
//! the "lock" button, the other the "unlock" button. The controller only ever
//! asks for a line to go high or low; how that reaches hardware is up to the
//! [`Actuator`] implementation.

use std::fmt;

use thiserror::Error;
use tracing::info;

/// Default BCM pin driving the lock relay.
pub const DEFAULT_LOCK_PIN: u8 = 4;

/// Default BCM pin driving the unlock relay.
pub const DEFAULT_UNLOCK_PIN: u8 = 17;

/// One of the two relay output lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputLine {
    /// Relay wired to the lock button.
    Lock,
    /// Relay wired to the unlock button.
    Unlock,
}

impl fmt::Display for OutputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lock => f.write_str("lock"),
            Self::Unlock => f.write_str("unlock"),
        }
    }
}

/// Logic level of an output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Relay energized.
    High,
    /// Relay released.
    Low,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => f.write_str("high"),
            Self::Low => f.write_str("low"),
        }
    }
}

/// Something that can drive the two relay lines.
///
/// Setting a line is assumed to always succeed. Failures to open the
/// underlying hardware are reported by the constructor instead.
pub trait Actuator {
    /// Drive `line` to `level`.
    fn set_line(&mut self, line: OutputLine, level: Level);
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn set_line(&mut self, line: OutputLine, level: Level) {
        (**self).set_line(line, level);
    }
}

/// BCM pin numbers for the two relay lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinAssignment {
    /// Pin wired to the lock relay.
    pub lock: u8,
    /// Pin wired to the unlock relay.
    pub unlock: u8,
}

impl Default for PinAssignment {
    fn default() -> Self {
        Self {
            lock: DEFAULT_LOCK_PIN,
            unlock: DEFAULT_UNLOCK_PIN,
        }
    }
}

impl PinAssignment {
    /// Pin number for the given line.
    #[must_use]
    pub const fn pin(&self, line: OutputLine) -> u8 {
        match line {
            OutputLine::Lock => self.lock,
            OutputLine::Unlock => self.unlock,
        }
    }
}

/// Errors raised while acquiring relay outputs.
#[derive(Debug, Error)]
pub enum ActuatorError {
    /// The GPIO peripheral could not be opened.
    #[error(
        "GPIO is unavailable: {message}. \
         Is this a Raspberry Pi and is the user in the 'gpio' group?"
    )]
    GpioUnavailable {
        /// Underlying error message.
        message: String,
    },

    /// A specific pin could not be claimed.
    #[error("Failed to claim GPIO pin {pin}: {message}")]
    PinUnavailable {
        /// BCM pin number.
        pin: u8,
        /// Underlying error message.
        message: String,
    },

    /// Lock and unlock were assigned the same pin.
    #[error("Lock and unlock lines must use different pins (both set to {0})")]
    PinConflict(u8),
}

/// Result alias for actuator setup.
pub type ActuatorResult<T> = std::result::Result<T, ActuatorError>;

/// Actuator that only logs what it would do.
///
/// Used with `--dry-run` and on builds without GPIO support.
#[derive(Debug, Default)]
pub struct DryRunActuator {
    pins: PinAssignment,
}

impl DryRunActuator {
    /// Create a dry-run actuator reporting the given pin numbers.
    #[must_use]
    pub const fn new(pins: PinAssignment) -> Self {
        Self { pins }
    }
}

impl Actuator for DryRunActuator {
    fn set_line(&mut self, line: OutputLine, level: Level) {
        info!(
            line = %line,
            pin = self.pins.pin(line),
            level = %level,
            "Dry run: would set relay line"
        );
    }
}

#[cfg(feature = "gpio")]
pub use gpio::GpioActuator;

#[cfg(feature = "gpio")]
mod gpio {
    use rppal::gpio::{Gpio, OutputPin};
    use tracing::debug;

    use super::{Actuator, ActuatorError, ActuatorResult, Level, OutputLine, PinAssignment};

    /// Relay outputs driven through the Raspberry Pi GPIO header.
    pub struct GpioActuator {
        lock: OutputPin,
        unlock: OutputPin,
    }

    impl GpioActuator {
        /// Claim both relay pins as outputs, driven low.
        ///
        /// # Errors
        ///
        /// Returns an error if the pins are identical, GPIO is unavailable,
        /// or either pin is already in use.
        pub fn open(pins: PinAssignment) -> ActuatorResult<Self> {
            if pins.lock == pins.unlock {
                return Err(ActuatorError::PinConflict(pins.lock));
            }

            let gpio = Gpio::new().map_err(|e| ActuatorError::GpioUnavailable {
                message: e.to_string(),
            })?;

            let claim = |pin: u8| -> ActuatorResult<OutputPin> {
                gpio.get(pin)
                    .map(rppal::gpio::Pin::into_output_low)
                    .map_err(|e| ActuatorError::PinUnavailable {
                        pin,
                        message: e.to_string(),
                    })
            };

            let lock = claim(pins.lock)?;
            let unlock = claim(pins.unlock)?;

            debug!(lock_pin = pins.lock, unlock_pin = pins.unlock, "Relay pins claimed");

            Ok(Self { lock, unlock })
        }
    }

    impl Actuator for GpioActuator {
        fn set_line(&mut self, line: OutputLine, level: Level) {
            let pin = match line {
                OutputLine::Lock => &mut self.lock,
                OutputLine::Unlock => &mut self.unlock,
            };
            match level {
                Level::High => pin.set_high(),
                Level::Low => pin.set_low(),
            }
            debug!(line = %line, pin = pin.pin(), level = %level, "Relay line set");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pins() {
        let pins = PinAssignment::default();
        assert_eq!(pins.pin(OutputLine::Lock), 4);
        assert_eq!(pins.pin(OutputLine::Unlock), 17);
    }

    #[test]
    fn test_line_and_level_display() {
        assert_eq!(OutputLine::Lock.to_string(), "lock");
        assert_eq!(OutputLine::Unlock.to_string(), "unlock");
        assert_eq!(Level::High.to_string(), "high");
        assert_eq!(Level::Low.to_string(), "low");
    }

    #[test]
    fn test_boxed_actuator_forwards() {
        let journal = crate::mock::Journal::new();
        let mut boxed: Box<dyn Actuator> =
            Box::new(crate::mock::RecordingActuator::new(journal.clone()));
        boxed.set_line(OutputLine::Unlock, Level::High);
        assert_eq!(
            journal.events(),
            vec![crate::mock::Event::SetLine(OutputLine::Unlock, Level::High)]
        );
    }

    #[test]
    fn test_pin_conflict_message() {
        let err = ActuatorError::PinConflict(4);
        assert!(err.to_string().contains("different pins"));
    }
}
