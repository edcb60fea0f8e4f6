//! Source reader error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while reading the live snapshot
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Source returned HTTP {0}")]
    Status(u16),

    #[error("Failed to parse progress: {0}")]
    Parse(String),

    #[error("No progress entries found")]
    NoEntries,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

impl SourceError {
    /// Whether the failure is in the page itself rather than getting to it
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, SourceError::Parse(_) | SourceError::NoEntries)
    }
}
