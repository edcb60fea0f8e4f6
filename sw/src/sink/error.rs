//! Sink error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while delivering a notification
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink not configured: {0}")]
    NotConfigured(String),

    #[error("No progress updates to send")]
    NoUpdates,

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Failed to render: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SinkError {
    /// Whether the same delivery could succeed on a later change
    ///
    /// Configuration problems will not fix themselves.
    pub fn is_transient(&self) -> bool {
        match self {
            SinkError::Http(_) | SinkError::Timeout(_) | SinkError::Io(_) | SinkError::Publish(_) => true,
            SinkError::Rejected { status, .. } => *status >= 500 || *status == 429,
            SinkError::NotConfigured(_) | SinkError::NoUpdates | SinkError::Render(_) | SinkError::Json(_) => false,
        }
    }
}
