//! Monitor timing configuration

use std::time::Duration;

use crate::config::Config;

/// Timing knobs for the change monitor
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between ticks; the first tick fires after one full interval
    pub poll_interval: Duration,

    /// Upper bound on a single source read
    pub read_timeout: Duration,

    /// Upper bound on each sink's dispatch
    pub dispatch_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(300),
            read_timeout: Duration::from_secs(10),
            dispatch_timeout: Duration::from_secs(10),
        }
    }
}

impl MonitorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.monitor.poll_interval_secs),
            read_timeout: config.source.timeout(),
            dispatch_timeout: Duration::from_millis(config.monitor.dispatch_timeout_ms),
        }
    }
}
