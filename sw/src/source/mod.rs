//! Source reader - fetches the current snapshot from the live page
//!
//! The monitor only depends on [`ProgressSource`]; [`WebProgressSource`]
//! is the production implementation that scrapes the author's site.

use async_trait::async_trait;

mod error;
mod web;

pub use error::SourceError;
pub use web::{WebProgressSource, parse_progress_html};

use crate::progress::Snapshot;

/// Something that can report the current works in progress
#[async_trait]
pub trait ProgressSource: Send + Sync {
    /// Read the current snapshot
    async fn read(&self) -> Result<Snapshot, SourceError>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}
