//! # proxlock-core
//!
//! Core logic for the proxlock Bluetooth proximity door lock.
//!
//! This crate provides:
//! - Key device address parsing and validation
//! - Presence probing via `l2ping`
//! - Relay output control (Raspberry Pi GPIO or dry run)
//! - The lock controller state machine
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`device`] - Bluetooth MAC address parsing
//! - [`presence`] - The presence prober trait and its `l2ping` implementation
//! - [`actuator`] - The relay actuator trait, GPIO and dry-run implementations
//! - [`controller`] - The probe → decide → actuate → sleep control loop
//! - [`config`] - Startup option validation
//! - [`error`] - Unified error types for the crate

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod actuator;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
#[cfg(any(test, feature = "mock-hardware"))]
pub mod mock;
pub mod presence;

// Re-export primary types for convenience
#[cfg(feature = "gpio")]
pub use actuator::GpioActuator;
pub use actuator::{
    Actuator, ActuatorError, ActuatorResult, DryRunActuator, Level, OutputLine, PinAssignment,
};
pub use config::{Config, ConfigError, ConfigResult, StartupOptions};
pub use controller::{
    decide, Actuation, CycleOutcome, LockController, LockState, Sleeper, ThreadSleeper, Timing,
};
pub use device::{is_valid_mac_address, AddressError, DeviceAddress};
pub use error::{ProxlockError, Result};
pub use presence::{L2pingProber, PresenceProber, ProbeError, ProbeSettings};
