//! Monitor engine

use std::fmt;
use std::sync::Arc;

use eyre::{Context, Result};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::MonitorConfig;
use crate::diff::{compute_deltas, has_changed, moved};
use crate::history::{Baseline, ProgressHistory};
use crate::progress::Snapshot;
use crate::sink::{DispatchReport, SinkSet};
use crate::source::{ProgressSource, SourceError};

/// Where the monitor is within a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Polling,
    Comparing,
    Dispatching,
    Persisting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Polling => "polling",
            Phase::Comparing => "comparing",
            Phase::Dispatching => "dispatching",
            Phase::Persisting => "persisting",
        };
        f.write_str(name)
    }
}

/// What a single tick did
#[derive(Debug)]
pub enum TickOutcome {
    /// The source read failed or timed out; nothing else ran
    ReadFailed(String),
    /// The source returned no items; nothing else ran
    EmptyRead,
    /// No baseline existed; the snapshot was persisted without dispatch
    FirstObservation,
    /// Snapshot matched the baseline; persisted without dispatch
    Unchanged,
    /// Snapshot differed; sinks were attempted, then it was persisted
    Changed(DispatchReport),
}

impl TickOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, TickOutcome::Changed(_))
    }

    /// Whether this tick replaced the in-memory baseline
    pub fn observed(&self) -> bool {
        matches!(
            self,
            TickOutcome::FirstObservation | TickOutcome::Unchanged | TickOutcome::Changed(_)
        )
    }
}

/// Polls the source on a fixed interval and reports changes to the sinks
pub struct Monitor {
    source: Arc<dyn ProgressSource>,
    history: Arc<dyn ProgressHistory>,
    sinks: SinkSet,
    config: MonitorConfig,
    last_known: Snapshot,
    phase: Phase,
    ticks: u64,
}

impl Monitor {
    pub fn new(
        source: Arc<dyn ProgressSource>,
        history: Arc<dyn ProgressHistory>,
        sinks: SinkSet,
        config: MonitorConfig,
    ) -> Self {
        debug!(
            source = %source.describe(),
            sinks = ?sinks.names(),
            poll_interval = ?config.poll_interval,
            "Monitor::new: called"
        );
        Self {
            source,
            history,
            sinks,
            config,
            last_known: Snapshot::empty(),
            phase: Phase::Idle,
            ticks: 0,
        }
    }

    /// Load the baseline from history
    ///
    /// An empty history is a normal outcome. A read failure is not: the
    /// monitor cannot run without knowing what it last saw.
    pub async fn load_baseline(&mut self) -> Result<()> {
        debug!("load_baseline: called");
        let baseline = self
            .history
            .read_last()
            .await
            .context("Failed to load baseline from history")?;

        match &baseline {
            Baseline::Empty => info!("History is empty; first observation will become the baseline"),
            Baseline::Known(snapshot) => info!(items = snapshot.len(), "Loaded baseline from history"),
        }
        self.last_known = baseline.into_snapshot();
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Last snapshot the monitor observed
    pub fn last_known(&self) -> &Snapshot {
        &self.last_known
    }

    /// Number of ticks run to completion
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, "enter: phase transition");
        self.phase = phase;
    }

    /// Run one poll/compare/dispatch/persist cycle
    pub async fn tick(&mut self) -> TickOutcome {
        debug!(tick = self.ticks + 1, "tick: called");
        let outcome = self.run_cycle().await;
        self.enter(Phase::Idle);
        self.ticks += 1;
        outcome
    }

    async fn run_cycle(&mut self) -> TickOutcome {
        self.enter(Phase::Polling);
        let current = match self.read_source().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    source = %self.source.describe(),
                    error = %e,
                    page_changed = e.is_parse_failure(),
                    "Failed to read progress; skipping tick"
                );
                return TickOutcome::ReadFailed(e.to_string());
            }
        };

        if current.is_empty() {
            warn!(source = %self.source.describe(), "Source returned no progress items; skipping tick");
            return TickOutcome::EmptyRead;
        }

        self.enter(Phase::Comparing);
        let outcome = if self.last_known.is_empty() {
            info!(items = current.len(), "First observation; recording without notifying");
            TickOutcome::FirstObservation
        } else if !has_changed(&current, &self.last_known) {
            debug!("run_cycle: no change");
            TickOutcome::Unchanged
        } else {
            let deltas = compute_deltas(&current, &self.last_known);
            for delta in moved(&deltas) {
                info!(%delta, "Progress changed");
            }

            self.enter(Phase::Dispatching);
            let report = self.sinks.dispatch_all(&deltas, self.config.dispatch_timeout).await;
            if !report.all_succeeded() {
                warn!(
                    failed = report.failed().len(),
                    attempted = report.attempted(),
                    "Some sinks failed to deliver"
                );
            }
            TickOutcome::Changed(report)
        };

        self.enter(Phase::Persisting);
        if let Err(e) = self.history.write_last(&current).await {
            // The in-memory baseline still advances; the next successful write catches up
            error!(error = %e, "Failed to persist snapshot");
        }
        self.last_known = current;

        outcome
    }

    async fn read_source(&self) -> Result<Snapshot, SourceError> {
        let timeout = self.config.read_timeout;
        match tokio::time::timeout(timeout, self.source.read()).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout(timeout)),
        }
    }

    /// Tick on the poll interval until shutdown is signalled
    ///
    /// Shutdown is a message on `shutdown_rx` or the sender being dropped.
    /// A tick already under way completes first.
    pub async fn run(mut self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        debug!("run: called");
        let period = self.config.poll_interval;
        if period.is_zero() {
            return Err(eyre::eyre!("Poll interval must be greater than zero"));
        }

        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = ?period, sinks = ?self.sinks.names(), "Monitor started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let outcome = self.tick().await;
                    debug!(tick = self.ticks, ?outcome, "run: tick complete");
                }

                _ = shutdown_rx.recv() => {
                    debug!("run: shutdown signal received");
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!(ticks = self.ticks, "Monitor stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{HistoryReadError, HistoryWriteError};
    use crate::progress::ProgressItem;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedSource {
        reads: Mutex<Vec<Result<Snapshot, SourceError>>>,
    }

    #[async_trait]
    impl ProgressSource for ScriptedSource {
        async fn read(&self) -> Result<Snapshot, SourceError> {
            self.reads.lock().unwrap().remove(0)
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    #[derive(Default)]
    struct MemoryHistory {
        baseline: Option<Snapshot>,
        fail_read: bool,
        writes: Mutex<Vec<Snapshot>>,
    }

    #[async_trait]
    impl ProgressHistory for MemoryHistory {
        async fn read_last(&self) -> Result<Baseline, HistoryReadError> {
            if self.fail_read {
                return Err(HistoryReadError("disk on fire".to_string()));
            }
            Ok(self.baseline.clone().map_or(Baseline::Empty, Baseline::Known))
        }

        async fn write_last(&self, snapshot: &Snapshot) -> Result<(), HistoryWriteError> {
            self.writes.lock().unwrap().push(snapshot.clone());
            Ok(())
        }
    }

    fn snap(items: &[(&str, u8)]) -> Snapshot {
        items.iter().map(|(t, p)| ProgressItem::new(*t, *p)).collect()
    }

    fn monitor(reads: Vec<Result<Snapshot, SourceError>>, history: Arc<MemoryHistory>) -> Monitor {
        Monitor::new(
            Arc::new(ScriptedSource {
                reads: Mutex::new(reads),
            }),
            history,
            SinkSet::new(),
            MonitorConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_load_baseline_failure_is_fatal() {
        let history = Arc::new(MemoryHistory {
            fail_read: true,
            ..Default::default()
        });
        let mut monitor = monitor(vec![], history);
        let err = monitor.load_baseline().await.unwrap_err();
        assert!(format!("{:#}", err).contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_read_failure_keeps_state() {
        let history = Arc::new(MemoryHistory {
            baseline: Some(snap(&[("Book 1", 25)])),
            ..Default::default()
        });
        let mut monitor = monitor(vec![Err(SourceError::NoEntries)], history.clone());
        monitor.load_baseline().await.unwrap();

        let outcome = monitor.tick().await;

        assert!(matches!(outcome, TickOutcome::ReadFailed(_)));
        assert_eq!(monitor.last_known(), &snap(&[("Book 1", 25)]));
        assert!(history.writes.lock().unwrap().is_empty());
        assert_eq!(monitor.phase(), Phase::Idle);
        assert_eq!(monitor.ticks(), 1);
    }

    #[tokio::test]
    async fn test_unchanged_still_persists() {
        let history = Arc::new(MemoryHistory {
            baseline: Some(snap(&[("Book 1", 25)])),
            ..Default::default()
        });
        let mut monitor = monitor(vec![Ok(snap(&[("Book 1", 25)]))], history.clone());
        monitor.load_baseline().await.unwrap();

        assert!(matches!(monitor.tick().await, TickOutcome::Unchanged));
        assert_eq!(history.writes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_first_observation_becomes_baseline() {
        let history = Arc::new(MemoryHistory::default());
        let mut monitor = monitor(
            vec![Ok(snap(&[("Book 1", 10)])), Ok(snap(&[("Book 1", 20)]))],
            history.clone(),
        );
        monitor.load_baseline().await.unwrap();

        assert!(matches!(monitor.tick().await, TickOutcome::FirstObservation));
        assert!(monitor.tick().await.is_changed());
        assert_eq!(monitor.last_known(), &snap(&[("Book 1", 20)]));
        assert_eq!(history.writes.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_run_rejects_zero_interval() {
        let history = Arc::new(MemoryHistory::default());
        let mut monitor = monitor(vec![], history);
        monitor.config.poll_interval = std::time::Duration::ZERO;
        let (_tx, rx) = mpsc::channel(1);
        assert!(monitor.run(rx).await.is_err());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Dispatching.to_string(), "dispatching");
    }
}
