//! Wiring the controller to real or simulated relay outputs.

use proxlock_core::{Actuator, DryRunActuator, PinAssignment};
use tracing::info;

/// Open the relay outputs, or a dry-run stand-in.
///
/// Builds without the `gpio` feature always run dry.
///
/// # Errors
///
/// Returns an error if GPIO cannot be opened or a pin cannot be claimed.
pub fn open_actuator(
    pins: PinAssignment,
    dry_run: bool,
) -> proxlock_core::Result<Box<dyn Actuator + Send>> {
    if dry_run {
        info!("Dry run: relay lines will be logged, not driven");
        return Ok(Box::new(DryRunActuator::new(pins)));
    }

    #[cfg(feature = "gpio")]
    {
        let actuator = proxlock_core::GpioActuator::open(pins)?;
        info!(
            lock_pin = pins.lock,
            unlock_pin = pins.unlock,
            "GPIO relay outputs ready"
        );
        Ok(Box::new(actuator))
    }

    #[cfg(not(feature = "gpio"))]
    {
        tracing::warn!("Built without GPIO support; falling back to dry run");
        Ok(Box::new(DryRunActuator::new(pins)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxlock_core::{Level, OutputLine};

    #[test]
    fn test_dry_run_needs_no_hardware() {
        let mut actuator = open_actuator(PinAssignment::default(), true).unwrap();
        actuator.set_line(OutputLine::Lock, Level::High);
        actuator.set_line(OutputLine::Lock, Level::Low);
    }
}
