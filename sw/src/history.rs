//! Progress history - durable baseline for the monitor
//!
//! The monitor reads the baseline once at startup and writes through after
//! every successful poll. [`FileHistory`] backs this with a
//! [`historystore::HistoryStore`], which only appends when the snapshot
//! actually changed.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use historystore::{HistoryError, HistoryStore, RecordOutcome};
use thiserror::Error;
use tracing::{debug, info};

use crate::diff::compute_deltas;
use crate::progress::{ProgressDelta, Snapshot};

/// Baseline loaded from history at startup
#[derive(Debug, Clone, PartialEq)]
pub enum Baseline {
    /// No entries exist yet
    Empty,
    /// Most recently recorded snapshot
    Known(Snapshot),
}

impl Baseline {
    /// The baseline snapshot, empty when nothing has been recorded
    pub fn into_snapshot(self) -> Snapshot {
        match self {
            Baseline::Empty => Snapshot::empty(),
            Baseline::Known(snapshot) => snapshot,
        }
    }
}

#[derive(Debug, Error)]
#[error("Failed to read history: {0}")]
pub struct HistoryReadError(pub String);

#[derive(Debug, Error)]
#[error("Failed to write history: {0}")]
pub struct HistoryWriteError(pub String);

/// Durable storage of the last observed snapshot
#[async_trait]
pub trait ProgressHistory: Send + Sync {
    /// Load the most recent snapshot
    async fn read_last(&self) -> Result<Baseline, HistoryReadError>;

    /// Persist the latest snapshot
    async fn write_last(&self, snapshot: &Snapshot) -> Result<(), HistoryWriteError>;
}

/// History backed by a JSONL [`HistoryStore`]
#[derive(Debug, Clone)]
pub struct FileHistory {
    store: HistoryStore<Snapshot>,
}

impl FileHistory {
    /// Open or create the history store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        debug!(path = %path.as_ref().display(), "FileHistory::open: called");
        Ok(Self {
            store: HistoryStore::open(path)?,
        })
    }

    pub fn store(&self) -> &HistoryStore<Snapshot> {
        &self.store
    }

    /// Deltas between the latest entry and the one recorded before it
    ///
    /// Returns the latest entry's timestamp alongside the deltas, or `None`
    /// when nothing has been recorded. A single entry diffs against an empty
    /// snapshot.
    pub fn latest_deltas(&self) -> Result<Option<(DateTime<Utc>, Vec<ProgressDelta>)>, HistoryError> {
        debug!("FileHistory::latest_deltas: called");
        let Some(latest) = self.store.latest()? else {
            return Ok(None);
        };
        let previous = self
            .store
            .entry_before(latest.timestamp)?
            .map(|entry| entry.snapshot)
            .unwrap_or_default();
        Ok(Some((latest.timestamp, compute_deltas(&latest.snapshot, &previous))))
    }
}

#[async_trait]
impl ProgressHistory for FileHistory {
    async fn read_last(&self) -> Result<Baseline, HistoryReadError> {
        debug!("FileHistory::read_last: called");
        let store = self.store.clone();
        let latest = tokio::task::spawn_blocking(move || store.latest())
            .await
            .map_err(|e| HistoryReadError(e.to_string()))?
            .map_err(|e| HistoryReadError(e.to_string()))?;

        match latest {
            Some(entry) => {
                debug!(id = %entry.id, items = entry.snapshot.len(), "FileHistory::read_last: found entry");
                Ok(Baseline::Known(entry.snapshot))
            }
            None => {
                debug!("FileHistory::read_last: history is empty");
                Ok(Baseline::Empty)
            }
        }
    }

    async fn write_last(&self, snapshot: &Snapshot) -> Result<(), HistoryWriteError> {
        debug!(items = snapshot.len(), "FileHistory::write_last: called");
        let store = self.store.clone();
        let snapshot = snapshot.clone();
        let outcome = tokio::task::spawn_blocking(move || store.record(snapshot))
            .await
            .map_err(|e| HistoryWriteError(e.to_string()))?
            .map_err(|e| HistoryWriteError(e.to_string()))?;

        match outcome {
            RecordOutcome::Appended(entry) => info!(id = %entry.id, "Recorded new progress entry"),
            RecordOutcome::Unchanged => debug!("FileHistory::write_last: snapshot unchanged"),
        }
        Ok(())
    }
}
