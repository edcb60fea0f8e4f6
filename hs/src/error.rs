//! History store error types

use thiserror::Error;

/// Errors that can occur while reading or writing history
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt history entry on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize history entry: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to lock history: {0}")]
    Lock(#[source] std::io::Error),
}

impl HistoryError {
    /// Check if this error came from a damaged history file rather than the filesystem
    pub fn is_corrupt(&self) -> bool {
        matches!(self, HistoryError::Json { .. })
    }
}
