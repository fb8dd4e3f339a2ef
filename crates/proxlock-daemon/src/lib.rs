//! # proxlock-daemon
//!
//! Command line parsing, logging, signal handling and hardware wiring for the
//! proxlock daemon.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod cli;
pub mod hardware;
pub mod logging;
pub mod shutdown;
