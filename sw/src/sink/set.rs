//! Sink set - best-effort fan-out of deltas to every configured sink

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::{NotificationSink, PushSink, SinkError, SlackSink, StatusPageSink};
use crate::config::Config;
use crate::progress::ProgressDelta;

/// Result of one sink's delivery attempt
#[derive(Debug)]
pub struct SinkOutcome {
    pub sink: String,
    pub result: Result<(), SinkError>,
}

impl SinkOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-sink outcomes of one dispatch, in sink order
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<SinkOutcome>,
}

impl DispatchReport {
    /// Names of sinks that delivered
    pub fn succeeded(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_success())
            .map(|o| o.sink.as_str())
            .collect()
    }

    /// Sinks that failed, with their errors
    pub fn failed(&self) -> Vec<(&str, &SinkError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.sink.as_str(), e)))
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(SinkOutcome::is_success)
    }

    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }
}

/// Ordered set of sinks assembled once at startup
#[derive(Clone, Default)]
pub struct SinkSet {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl std::fmt::Debug for SinkSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink; dispatch order follows insertion order
    pub fn with(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn push(&mut self, sink: Arc<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    pub fn names(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Find a sink by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn NotificationSink>> {
        self.sinks.iter().find(|s| s.name() == name).cloned()
    }

    /// Deliver `deltas` to every sink concurrently
    ///
    /// Each sink gets its own `timeout`. Failures are logged with the sink
    /// name and never stop the other sinks. Returns once every sink has
    /// finished or timed out.
    pub async fn dispatch_all(&self, deltas: &[ProgressDelta], timeout: Duration) -> DispatchReport {
        debug!(sinks = self.sinks.len(), deltas = deltas.len(), "dispatch_all: called");

        let attempts = self.sinks.iter().map(|sink| async move {
            let result = match tokio::time::timeout(timeout, sink.dispatch(deltas)).await {
                Ok(result) => result,
                Err(_) => Err(SinkError::Timeout(timeout)),
            };
            SinkOutcome {
                sink: sink.name().to_string(),
                result,
            }
        });

        let outcomes = join_all(attempts).await;

        for outcome in &outcomes {
            match &outcome.result {
                Ok(()) => info!(sink = %outcome.sink, "Update sent"),
                Err(e) => warn!(sink = %outcome.sink, error = %e, transient = e.is_transient(), "Failed to send update"),
            }
        }

        DispatchReport { outcomes }
    }
}

/// Assemble the enabled sinks from configuration
///
/// Order is fixed: push, slack, status-page.
pub fn build_sinks(config: &Config) -> Result<SinkSet, SinkError> {
    debug!("build_sinks: called");
    let mut sinks = SinkSet::new();

    if config.push.enabled {
        sinks.push(Arc::new(PushSink::from_config(config)?));
        info!(topic = %config.push.topic, "Push notifications enabled");
    }

    if config.slack.enabled {
        sinks.push(Arc::new(SlackSink::from_config(config)?));
        info!("Slack notifications enabled");
    }

    if config.status_page.enabled {
        sinks.push(Arc::new(StatusPageSink::from_config(config)));
        info!(dir = %config.status_page.output_dir.display(), "Status page enabled");
    }

    if sinks.is_empty() {
        warn!("No notification sinks enabled; changes will only be recorded");
    }

    Ok(sinks)
}
