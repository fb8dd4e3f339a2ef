//! The proximity-to-actuation control loop.
//!
//! Each cycle probes the key device exactly once, compares the answer with
//! the last lock state the controller produced, issues at most one actuation
//! and then waits for the poll interval:
//!
//! | State    | Present | Action | Next     |
//! |----------|---------|--------|----------|
//! | Locked   | yes     | unlock | Unlocked |
//! | Unlocked | yes     | -      | Unlocked |
//! | Unlocked | no      | lock   | Locked   |
//! | Locked   | no      | -      | Locked   |
//!
//! Everything runs on the calling thread. Probes, pulses and the poll
//! interval are all blocking waits, so a cycle never overlaps the next one.
//! [`LockController::run`] checks its stop flag only between cycles, so an
//! actuation is never cut short.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use crate::actuator::{Actuator, Level, OutputLine};
use crate::device::DeviceAddress;
use crate::presence::PresenceProber;

/// Default pause between decision cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default pause between the phases of a relay pulse.
pub const DEFAULT_PULSE_INTERVAL: Duration = Duration::from_millis(250);

/// Number of high/low pulses per actuation.
pub const PULSES_PER_ACTUATION: usize = 2;

/// Blocking wait, injectable so tests can observe delays.
pub trait Sleeper {
    /// Block for `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Lock state as last commanded by the controller.
///
/// This is what the controller believes, not a reading from the door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockState {
    /// Door locked.
    Locked,
    /// Door unlocked.
    Unlocked,
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locked => f.write_str("locked"),
            Self::Unlocked => f.write_str("unlocked"),
        }
    }
}

/// A command to move the door to a new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actuation {
    /// Pulse the lock relay.
    Lock,
    /// Pulse the unlock relay.
    Unlock,
}

impl Actuation {
    /// Relay line this actuation pulses.
    #[must_use]
    pub const fn line(self) -> OutputLine {
        match self {
            Self::Lock => OutputLine::Lock,
            Self::Unlock => OutputLine::Unlock,
        }
    }

    /// State the door is in once this actuation completes.
    #[must_use]
    pub const fn target(self) -> LockState {
        match self {
            Self::Lock => LockState::Locked,
            Self::Unlock => LockState::Unlocked,
        }
    }
}

impl fmt::Display for Actuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lock => f.write_str("lock"),
            Self::Unlock => f.write_str("unlock"),
        }
    }
}

/// Decide what to do given the current state and this cycle's presence.
///
/// Returns `None` when the door is already where it should be.
#[must_use]
pub const fn decide(state: LockState, present: bool) -> Option<Actuation> {
    match (state, present) {
        (LockState::Locked, true) => Some(Actuation::Unlock),
        (LockState::Unlocked, false) => Some(Actuation::Lock),
        (LockState::Unlocked, true) | (LockState::Locked, false) => None,
    }
}

/// Delays used by the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Pause after every decision cycle.
    pub poll_interval: Duration,
    /// Pause between the high and low phases of a relay pulse.
    pub pulse_interval: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            pulse_interval: DEFAULT_PULSE_INTERVAL,
        }
    }
}

/// What happened during one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Whether the key device answered.
    pub present: bool,
    /// Actuation issued this cycle, if any.
    pub action: Option<Actuation>,
    /// Lock state at the end of the cycle.
    pub state: LockState,
}

/// Owns the lock state and drives the relay from presence probes.
pub struct LockController<P, A, S = ThreadSleeper> {
    device: DeviceAddress,
    timing: Timing,
    state: LockState,
    prober: P,
    actuator: A,
    sleeper: S,
    cycles: u64,
}

impl<P, A, S> LockController<P, A, S>
where
    P: PresenceProber,
    A: Actuator,
    S: Sleeper,
{
    /// Take ownership of the collaborators and unlock the door.
    ///
    /// The unlock is unconditional and happens before the first probe, so
    /// the controller always starts out [`LockState::Unlocked`].
    pub fn start(
        device: DeviceAddress,
        timing: Timing,
        prober: P,
        actuator: A,
        sleeper: S,
    ) -> Self {
        info!(
            device = %device,
            poll_ms = timing.poll_interval.as_millis(),
            pulse_ms = timing.pulse_interval.as_millis(),
            "Setting initial conditions and starting proximity scan"
        );

        let mut controller = Self {
            device,
            timing,
            state: LockState::Unlocked,
            prober,
            actuator,
            sleeper,
            cycles: 0,
        };
        controller.actuate(Actuation::Unlock);
        controller
    }

    /// Current lock state.
    #[must_use]
    pub const fn state(&self) -> LockState {
        self.state
    }

    /// Device being tracked.
    #[must_use]
    pub const fn device(&self) -> &DeviceAddress {
        &self.device
    }

    /// Number of completed cycles.
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run one probe → decide → actuate → sleep cycle.
    pub fn cycle(&mut self) -> CycleOutcome {
        let present = self.prober.probe(&self.device);
        if present {
            info!(device = %self.device, "Key device found");
        } else {
            info!(device = %self.device, "Key device not found");
        }

        let action = decide(self.state, present);
        if let Some(actuation) = action {
            self.actuate(actuation);
        } else {
            debug!(state = %self.state, "No change");
        }

        self.sleeper.sleep(self.timing.poll_interval);
        self.cycles += 1;

        CycleOutcome {
            present,
            action,
            state: self.state,
        }
    }

    /// Cycle until `stop` is set, then drive both relay lines low.
    pub fn run(&mut self, stop: &AtomicBool) {
        while !stop.load(Ordering::SeqCst) {
            self.cycle();
        }
        self.release();
        info!(cycles = self.cycles, state = %self.state, "Control loop stopped");
    }

    /// Leave both relay lines de-energized.
    fn release(&mut self) {
        self.actuator.set_line(OutputLine::Lock, Level::Low);
        self.actuator.set_line(OutputLine::Unlock, Level::Low);
    }

    /// Double-pulse the relay for `actuation`, then record the new state.
    fn actuate(&mut self, actuation: Actuation) {
        let line = actuation.line();
        match actuation {
            Actuation::Lock => info!("Locking door"),
            Actuation::Unlock => info!("Unlocking door"),
        }

        for pulse in 0..PULSES_PER_ACTUATION {
            if pulse > 0 {
                self.sleeper.sleep(self.timing.pulse_interval);
            }
            self.actuator.set_line(line, Level::High);
            self.sleeper.sleep(self.timing.pulse_interval);
            self.actuator.set_line(line, Level::Low);
        }

        self.state = actuation.target();
        debug!(state = %self.state, "Actuation complete");
    }
}
