//! HistoryStore - append-only history of observed snapshots
//!
//! Keeps every distinct snapshot a poller has observed, newest last, in a
//! single JSON-lines file. The store is generic over the snapshot type so it
//! can be reused by anything that polls a source and wants a durable baseline.
//!
//! # Layout
//!
//! ```text
//! {store_path}/
//! ├── history.jsonl    # one HistoryEntry per line, oldest first
//! └── history.lock     # advisory lock held by writers
//! ```
//!
//! # Example
//!
//! ```ignore
//! use historystore::{HistoryStore, RecordOutcome};
//!
//! let store: HistoryStore<Vec<String>> = HistoryStore::open(".history")?;
//! match store.record(vec!["a".to_string()])? {
//!     RecordOutcome::Appended(entry) => println!("new entry {}", entry.id),
//!     RecordOutcome::Unchanged => println!("nothing new"),
//! }
//! let latest = store.latest()?;
//! ```

pub mod cli;
pub mod config;
mod error;
mod store;

pub use error::HistoryError;
pub use store::{HistoryEntry, HistoryStore, RecordOutcome};

/// File name of the history log inside the store directory
pub const HISTORY_FILE: &str = "history.jsonl";

/// File name of the writer lock inside the store directory
pub const LOCK_FILE: &str = "history.lock";
