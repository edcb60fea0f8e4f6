//! Stormwatch - work-in-progress monitor
//!
//! Stormwatch polls an author's website for work-in-progress percentages,
//! compares each reading against the last one it recorded, and announces
//! changes through chat webhooks, mobile push and a static status page.
//!
//! # Modules
//!
//! - [`progress`] - Progress items, deltas and snapshots
//! - [`diff`] - Snapshot comparison
//! - [`source`] - Reading progress from the website
//! - [`history`] - Durable baseline backed by `historystore`
//! - [`sink`] - Notification sinks and best-effort fan-out
//! - [`monitor`] - The poll/compare/dispatch/persist loop
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod diff;
pub mod history;
pub mod monitor;
pub mod progress;
pub mod sink;
pub mod source;

// Re-export commonly used types
pub use config::Config;
pub use diff::{compute_deltas, has_changed};
pub use history::{Baseline, FileHistory, ProgressHistory};
pub use monitor::{Monitor, MonitorConfig, Phase, TickOutcome};
pub use progress::{ProgressDelta, ProgressItem, Snapshot};
pub use sink::{DispatchReport, NotificationSink, SinkError, SinkSet, build_sinks};
pub use source::{ProgressSource, SourceError, WebProgressSource};
