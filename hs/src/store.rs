//! Core HistoryStore implementation

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::HistoryError;
use crate::{HISTORY_FILE, LOCK_FILE};

/// A single persisted observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry<S> {
    /// Unique entry ID (UUIDv7, sorts by creation time)
    pub id: String,
    /// When the snapshot was observed
    pub timestamp: DateTime<Utc>,
    /// The observed snapshot
    pub snapshot: S,
}

/// Result of [`HistoryStore::record`]
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome<S> {
    /// The snapshot differed from the latest entry and was appended
    Appended(HistoryEntry<S>),
    /// The snapshot matched the latest entry; nothing was written
    Unchanged,
}

impl<S> RecordOutcome<S> {
    pub fn is_appended(&self) -> bool {
        matches!(self, RecordOutcome::Appended(_))
    }
}

/// Append-only snapshot history backed by a JSONL file
pub struct HistoryStore<S> {
    /// Base path for storage
    base_path: PathBuf,
    _snapshot: PhantomData<fn() -> S>,
}

impl<S> Clone for HistoryStore<S> {
    fn clone(&self) -> Self {
        Self {
            base_path: self.base_path.clone(),
            _snapshot: PhantomData,
        }
    }
}

impl<S> std::fmt::Debug for HistoryStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore").field("base_path", &self.base_path).finish()
    }
}

/// Exclusive writer lock, released on drop
struct WriteLock {
    file: File,
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl<S> HistoryStore<S>
where
    S: Serialize + DeserializeOwned + PartialEq,
{
    /// Open or create a history store at the given directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        debug!(?base_path, "Opened history store");
        Ok(Self {
            base_path,
            _snapshot: PhantomData,
        })
    }

    /// Directory holding the history files
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    fn history_path(&self) -> PathBuf {
        self.base_path.join(HISTORY_FILE)
    }

    fn lock(&self) -> Result<WriteLock, HistoryError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.base_path.join(LOCK_FILE))?;
        FileExt::lock_exclusive(&file).map_err(HistoryError::Lock)?;
        Ok(WriteLock { file })
    }

    /// Read every entry, oldest first
    fn read_all(&self) -> Result<Vec<HistoryEntry<S>>, HistoryError> {
        let path = self.history_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut entries = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line).map_err(|source| HistoryError::Json { line: idx + 1, source })?;
            entries.push(entry);
        }
        Ok(entries)
    }

    fn write_entry(&self, entry: &HistoryEntry<S>) -> Result<(), HistoryError> {
        let line = serde_json::to_string(entry).map_err(HistoryError::Serialize)?;
        let mut file = OpenOptions::new().create(true).append(true).open(self.history_path())?;
        writeln!(file, "{}", line)?;
        file.sync_data()?;
        Ok(())
    }

    /// The most recent entry, or `None` when nothing has been recorded yet
    pub fn latest(&self) -> Result<Option<HistoryEntry<S>>, HistoryError> {
        Ok(self.read_all()?.pop())
    }

    /// The most recent entry strictly older than `timestamp`
    pub fn entry_before(&self, timestamp: DateTime<Utc>) -> Result<Option<HistoryEntry<S>>, HistoryError> {
        Ok(self
            .read_all()?
            .into_iter()
            .rev()
            .find(|entry| entry.timestamp < timestamp))
    }

    /// Up to `limit` entries, newest first
    pub fn list(&self, limit: usize) -> Result<Vec<HistoryEntry<S>>, HistoryError> {
        Ok(self.read_all()?.into_iter().rev().take(limit).collect())
    }

    /// Number of recorded entries
    pub fn count(&self) -> Result<usize, HistoryError> {
        Ok(self.read_all()?.len())
    }

    /// Append a snapshot observed now
    pub fn append(&self, snapshot: S) -> Result<HistoryEntry<S>, HistoryError> {
        self.append_at(snapshot, Utc::now())
    }

    /// Append a snapshot with an explicit observation time
    pub fn append_at(&self, snapshot: S, timestamp: DateTime<Utc>) -> Result<HistoryEntry<S>, HistoryError> {
        let _lock = self.lock()?;
        let entry = HistoryEntry {
            id: Uuid::now_v7().to_string(),
            timestamp,
            snapshot,
        };
        self.write_entry(&entry)?;
        info!(id = %entry.id, "Appended history entry");
        Ok(entry)
    }

    /// Record a snapshot, appending only if it differs from the latest entry
    ///
    /// Writing the same snapshot any number of times leaves a single entry.
    pub fn record(&self, snapshot: S) -> Result<RecordOutcome<S>, HistoryError> {
        let _lock = self.lock()?;

        if let Some(latest) = self.read_all()?.pop()
            && latest.snapshot == snapshot
        {
            debug!(id = %latest.id, "Snapshot matches latest entry");
            return Ok(RecordOutcome::Unchanged);
        }

        let entry = HistoryEntry {
            id: Uuid::now_v7().to_string(),
            timestamp: Utc::now(),
            snapshot,
        };
        self.write_entry(&entry)?;
        info!(id = %entry.id, "Recorded new history entry");
        Ok(RecordOutcome::Appended(entry))
    }
}
