//! Change monitor - the poll/compare/dispatch/persist cycle
//!
//! A [`Monitor`] owns the last known snapshot outright. Each tick reads the
//! source, diffs against that snapshot, fans changes out to the sinks, and
//! writes the fresh snapshot through to history. Nothing outside the monitor's
//! own loop ever touches the in-memory baseline.

mod config;
mod engine;

pub use config::MonitorConfig;
pub use engine::{Monitor, Phase, TickOutcome};
