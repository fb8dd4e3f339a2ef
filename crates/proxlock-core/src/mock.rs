//! In-memory stand-ins for the radio, the relay board and the clock.
//!
//! All three share a [`Journal`] so a test can assert the exact interleaving
//! of probes, line changes and sleeps the controller produced.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::actuator::{Actuator, Level, OutputLine};
use crate::controller::Sleeper;
use crate::device::DeviceAddress;
use crate::presence::PresenceProber;

/// One observable interaction with the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A presence probe returned the given value.
    Probe(bool),
    /// A relay line was driven.
    SetLine(OutputLine, Level),
    /// The controller slept.
    Sleep(Duration),
}

/// Shared, append-only record of [`Event`]s.
#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<Event>>>);

impl Journal {
    /// Create an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    /// Snapshot of all events so far.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Line changes only, in order.
    #[must_use]
    pub fn line_changes(&self) -> Vec<(OutputLine, Level)> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match *e {
                Event::SetLine(line, level) => Some((line, level)),
                _ => None,
            })
            .collect()
    }

    /// Number of probes issued.
    #[must_use]
    pub fn probe_count(&self) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|e| matches!(e, Event::Probe(_)))
            .count()
    }
}

/// Prober that replays a fixed script of answers.
///
/// Once the script runs out it reports absent.
#[derive(Debug)]
pub struct ScriptedProber {
    answers: VecDeque<bool>,
    journal: Journal,
}

impl ScriptedProber {
    /// Replay `answers`, then report absent.
    pub fn new(answers: impl IntoIterator<Item = bool>, journal: Journal) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            journal,
        }
    }
}

impl PresenceProber for ScriptedProber {
    fn probe(&mut self, _device: &DeviceAddress) -> bool {
        let present = self.answers.pop_front().unwrap_or(false);
        self.journal.push(Event::Probe(present));
        present
    }
}

/// Actuator that records every line change.
#[derive(Debug, Clone)]
pub struct RecordingActuator {
    journal: Journal,
}

impl RecordingActuator {
    /// Record into `journal`.
    #[must_use]
    pub const fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

impl Actuator for RecordingActuator {
    fn set_line(&mut self, line: OutputLine, level: Level) {
        self.journal.push(Event::SetLine(line, level));
    }
}

/// Sleeper that records durations instead of sleeping.
#[derive(Debug, Clone)]
pub struct RecordingSleeper {
    journal: Journal,
}

impl RecordingSleeper {
    /// Record into `journal`.
    #[must_use]
    pub const fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.journal.push(Event::Sleep(duration));
    }
}
