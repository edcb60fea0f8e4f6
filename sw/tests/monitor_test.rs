//! Change monitor behaviour against fake collaborators

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stormwatch::history::{Baseline, HistoryReadError, HistoryWriteError, ProgressHistory};
use stormwatch::monitor::{Monitor, MonitorConfig, TickOutcome};
use stormwatch::progress::{ProgressDelta, ProgressItem, Snapshot};
use stormwatch::sink::{NotificationSink, SinkError, SinkSet};
use stormwatch::source::{ProgressSource, SourceError};
use tokio::sync::mpsc;

const INTERVAL: Duration = Duration::from_secs(60);

fn snap(items: &[(&str, u8)]) -> Snapshot {
    items.iter().map(|(t, p)| ProgressItem::new(*t, *p)).collect()
}

/// Returns queued reads in order, then fails
struct FakeSource {
    reads: Mutex<VecDeque<Result<Snapshot, SourceError>>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeSource {
    fn new(reads: Vec<Result<Snapshot, SourceError>>) -> Arc<Self> {
        Self::slow(reads, Duration::ZERO)
    }

    fn slow(reads: Vec<Result<Snapshot, SourceError>>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reads: Mutex::new(reads.into()),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProgressSource for FakeSource {
    async fn read(&self) -> Result<Snapshot, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(SourceError::NoEntries))
    }

    fn describe(&self) -> String {
        "fake".to_string()
    }
}

#[derive(Default)]
struct FakeHistory {
    baseline: Option<Snapshot>,
    fail_writes: bool,
    writes: Mutex<Vec<Snapshot>>,
}

impl FakeHistory {
    fn with_baseline(snapshot: Snapshot) -> Arc<Self> {
        Arc::new(Self {
            baseline: Some(snapshot),
            ..Default::default()
        })
    }

    fn writes(&self) -> Vec<Snapshot> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressHistory for FakeHistory {
    async fn read_last(&self) -> Result<Baseline, HistoryReadError> {
        Ok(self.baseline.clone().map_or(Baseline::Empty, Baseline::Known))
    }

    async fn write_last(&self, snapshot: &Snapshot) -> Result<(), HistoryWriteError> {
        self.writes.lock().unwrap().push(snapshot.clone());
        if self.fail_writes {
            return Err(HistoryWriteError("read-only filesystem".to_string()));
        }
        Ok(())
    }
}

enum Behaviour {
    Succeed,
    Reject,
    Hang,
}

struct FakeSink {
    name: &'static str,
    behaviour: Behaviour,
    received: Mutex<Vec<Vec<ProgressDelta>>>,
}

impl FakeSink {
    fn new(name: &'static str, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            name,
            behaviour,
            received: Mutex::new(Vec::new()),
        })
    }

    fn received(&self) -> Vec<Vec<ProgressDelta>> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for FakeSink {
    fn name(&self) -> &str {
        self.name
    }

    async fn dispatch(&self, deltas: &[ProgressDelta]) -> Result<(), SinkError> {
        self.received.lock().unwrap().push(deltas.to_vec());
        match self.behaviour {
            Behaviour::Succeed => Ok(()),
            Behaviour::Reject => Err(SinkError::Rejected {
                status: 200,
                body: "invalid_token".to_string(),
            }),
            Behaviour::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

fn config() -> MonitorConfig {
    MonitorConfig {
        poll_interval: INTERVAL,
        read_timeout: Duration::from_secs(10),
        dispatch_timeout: Duration::from_secs(5),
    }
}

async fn started(source: Arc<FakeSource>, history: Arc<FakeHistory>, sinks: SinkSet) -> Monitor {
    let mut monitor = Monitor::new(source, history, sinks, config());
    monitor.load_baseline().await.unwrap();
    monitor
}

#[tokio::test]
async fn test_change_dispatches_deltas_to_every_sink() {
    let source = FakeSource::new(vec![Ok(snap(&[("Book 1", 50)]))]);
    let history = FakeHistory::with_baseline(snap(&[("Book 1", 25)]));
    let push = FakeSink::new("push", Behaviour::Succeed);
    let slack = FakeSink::new("slack", Behaviour::Succeed);
    let sinks = SinkSet::new().with(push.clone()).with(slack.clone());
    let mut monitor = started(source, history.clone(), sinks).await;

    let TickOutcome::Changed(report) = monitor.tick().await else {
        panic!("expected a change");
    };
    assert!(report.all_succeeded());
    let expected = vec![ProgressDelta::new("Book 1", 50, 25)];
    assert_eq!(push.received(), vec![expected.clone()]);
    assert_eq!(slack.received(), vec![expected]);
    assert_eq!(history.writes(), vec![snap(&[("Book 1", 50)])]);
    assert_eq!(monitor.last_known(), &snap(&[("Book 1", 50)]));
}

#[tokio::test]
async fn test_reordered_snapshot_counts_as_change() {
    let source = FakeSource::new(vec![Ok(snap(&[("Book 2", 20), ("Book 1", 10)]))]);
    let history = FakeHistory::with_baseline(snap(&[("Book 1", 10), ("Book 2", 20)]));
    let push = FakeSink::new("push", Behaviour::Succeed);
    let slack = FakeSink::new("slack", Behaviour::Succeed);
    let sinks = SinkSet::new().with(push.clone()).with(slack.clone());
    let mut monitor = started(source, history.clone(), sinks).await;

    let TickOutcome::Changed(report) = monitor.tick().await else {
        panic!("expected a reorder to count as a change");
    };
    assert_eq!(report.attempted(), 2);
    // Values are unchanged, so no item carries a previous value
    let expected = vec![ProgressDelta::new("Book 2", 20, 0), ProgressDelta::new("Book 1", 10, 0)];
    assert_eq!(push.received(), vec![expected.clone()]);
    assert_eq!(slack.received(), vec![expected]);
    assert_eq!(history.writes(), vec![snap(&[("Book 2", 20), ("Book 1", 10)])]);
    assert_eq!(monitor.last_known(), &snap(&[("Book 2", 20), ("Book 1", 10)]));
}

#[tokio::test]
async fn test_identical_snapshot_persists_without_dispatch() {
    let source = FakeSource::new(vec![Ok(snap(&[("Book 1", 25)]))]);
    let history = FakeHistory::with_baseline(snap(&[("Book 1", 25)]));
    let push = FakeSink::new("push", Behaviour::Succeed);
    let mut monitor = started(source, history.clone(), SinkSet::new().with(push.clone())).await;

    assert!(matches!(monitor.tick().await, TickOutcome::Unchanged));
    assert!(push.received().is_empty());
    assert_eq!(history.writes(), vec![snap(&[("Book 1", 25)])]);
}

#[tokio::test]
async fn test_empty_read_skips_tick_and_next_tick_proceeds() {
    let source = FakeSource::new(vec![Ok(Snapshot::empty()), Ok(snap(&[("Book 1", 30)]))]);
    let history = FakeHistory::with_baseline(snap(&[("Book 1", 25)]));
    let push = FakeSink::new("push", Behaviour::Succeed);
    let mut monitor = started(source, history.clone(), SinkSet::new().with(push.clone())).await;

    assert!(matches!(monitor.tick().await, TickOutcome::EmptyRead));
    assert_eq!(monitor.last_known(), &snap(&[("Book 1", 25)]));
    assert!(history.writes().is_empty());
    assert!(push.received().is_empty());

    assert!(monitor.tick().await.is_changed());
    assert_eq!(push.received(), vec![vec![ProgressDelta::new("Book 1", 30, 25)]]);
}

#[tokio::test]
async fn test_empty_history_first_observation_is_not_dispatched() {
    let source = FakeSource::new(vec![Ok(snap(&[("Book 1", 10)]))]);
    let history = Arc::new(FakeHistory::default());
    let push = FakeSink::new("push", Behaviour::Succeed);
    let mut monitor = started(source, history.clone(), SinkSet::new().with(push.clone())).await;

    assert!(monitor.last_known().is_empty());
    assert!(matches!(monitor.tick().await, TickOutcome::FirstObservation));
    assert!(push.received().is_empty());
    assert_eq!(history.writes(), vec![snap(&[("Book 1", 10)])]);
}

#[tokio::test(start_paused = true)]
async fn test_failing_sink_does_not_block_others_or_persistence() {
    let source = FakeSource::new(vec![
        Ok(snap(&[("Book 1", 50)])),
        Ok(snap(&[("Book 1", 60)])),
    ]);
    let history = FakeHistory::with_baseline(snap(&[("Book 1", 25)]));
    let slack = FakeSink::new("slack", Behaviour::Reject);
    let stuck = FakeSink::new("status-page", Behaviour::Hang);
    let push = FakeSink::new("push", Behaviour::Succeed);
    let sinks = SinkSet::new()
        .with(slack.clone())
        .with(stuck.clone())
        .with(push.clone());
    let mut monitor = started(source, history.clone(), sinks).await;

    let TickOutcome::Changed(report) = monitor.tick().await else {
        panic!("expected a change");
    };

    assert_eq!(report.succeeded(), vec!["push"]);
    let failed: Vec<&str> = report.failed().into_iter().map(|(name, _)| name).collect();
    assert_eq!(failed, vec!["slack", "status-page"]);
    assert!(matches!(report.outcomes[1].result, Err(SinkError::Timeout(_))));
    assert_eq!(slack.received().len(), 1);
    assert_eq!(stuck.received().len(), 1);
    assert_eq!(push.received().len(), 1);
    assert_eq!(history.writes(), vec![snap(&[("Book 1", 50)])]);

    // No retry of the failed sink; the next change is delivered fresh
    assert!(monitor.tick().await.is_changed());
    assert_eq!(slack.received().len(), 2);
    assert_eq!(slack.received()[1], vec![ProgressDelta::new("Book 1", 60, 50)]);
}

#[tokio::test]
async fn test_history_write_failure_is_not_fatal() {
    let source = FakeSource::new(vec![Ok(snap(&[("Book 1", 50)])), Ok(snap(&[("Book 1", 50)]))]);
    let history = Arc::new(FakeHistory {
        baseline: Some(snap(&[("Book 1", 25)])),
        fail_writes: true,
        ..Default::default()
    });
    let push = FakeSink::new("push", Behaviour::Succeed);
    let mut monitor = started(source, history.clone(), SinkSet::new().with(push.clone())).await;

    assert!(monitor.tick().await.is_changed());
    // In-memory baseline advanced, so the same reading is not reported twice
    assert!(matches!(monitor.tick().await, TickOutcome::Unchanged));
    assert_eq!(push.received().len(), 1);
    assert_eq!(history.writes().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_read_times_out() {
    let source = FakeSource::slow(vec![Ok(snap(&[("Book 1", 50)]))], Duration::from_secs(30));
    let history = FakeHistory::with_baseline(snap(&[("Book 1", 25)]));
    let mut monitor = started(source, history.clone(), SinkSet::new()).await;

    let outcome = monitor.tick().await;
    assert!(matches!(outcome, TickOutcome::ReadFailed(_)));
    assert_eq!(monitor.last_known(), &snap(&[("Book 1", 25)]));
    assert!(history.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_first_tick_waits_one_full_interval() {
    let source = FakeSource::new(vec![Ok(snap(&[("Book 1", 25)])), Ok(snap(&[("Book 1", 25)]))]);
    let history = FakeHistory::with_baseline(snap(&[("Book 1", 25)]));
    let monitor = started(source.clone(), history.clone(), SinkSet::new()).await;

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let handle = tokio::spawn(monitor.run(shutdown_rx));

    tokio::time::sleep(INTERVAL - Duration::from_secs(1)).await;
    assert_eq!(source.calls(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(source.calls(), 1);

    tokio::time::sleep(INTERVAL).await;
    assert_eq!(source.calls(), 2);

    shutdown_tx.send(()).await.unwrap();
    handle.await.unwrap().unwrap();
    assert_eq!(history.writes().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_lets_in_flight_tick_finish() {
    let source = FakeSource::slow(vec![Ok(snap(&[("Book 1", 50)]))], Duration::from_secs(5));
    let history = FakeHistory::with_baseline(snap(&[("Book 1", 25)]));
    let push = FakeSink::new("push", Behaviour::Succeed);
    let monitor = started(source.clone(), history.clone(), SinkSet::new().with(push.clone())).await;

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let handle = tokio::spawn(monitor.run(shutdown_rx));

    // Land inside the tick while the read is still pending
    tokio::time::sleep(INTERVAL + Duration::from_secs(1)).await;
    assert_eq!(source.calls(), 1);
    assert!(history.writes().is_empty());

    shutdown_tx.send(()).await.unwrap();
    handle.await.unwrap().unwrap();

    assert_eq!(push.received(), vec![vec![ProgressDelta::new("Book 1", 50, 25)]]);
    assert_eq!(history.writes(), vec![snap(&[("Book 1", 50)])]);
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_shutdown_sender_stops_monitor() {
    let source = FakeSource::new(vec![]);
    let history = Arc::new(FakeHistory::default());
    let monitor = started(source.clone(), history, SinkSet::new()).await;

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    drop(shutdown_tx);

    monitor.run(shutdown_rx).await.unwrap();
    assert_eq!(source.calls(), 0);
}
