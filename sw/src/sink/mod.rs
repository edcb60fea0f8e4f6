//! Notification sinks - destinations for progress deltas
//!
//! Each sink is independently enabled by configuration and assembled once
//! at startup into a [`SinkSet`]. The monitor only sees the
//! [`NotificationSink`] trait.

use async_trait::async_trait;

mod error;
mod push;
mod set;
mod slack;
mod status_page;

pub use error::SinkError;
pub use push::{AccessToken, PushSink};
pub use set::{DispatchReport, SinkOutcome, SinkSet, build_sinks};
pub use slack::SlackSink;
pub use status_page::{StatusPageSink, render_status_page};

use crate::progress::ProgressDelta;

/// A destination that accepts progress deltas and attempts delivery
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Sink name for logs and error attribution
    fn name(&self) -> &str;

    /// Deliver the full delta list
    async fn dispatch(&self, deltas: &[ProgressDelta]) -> Result<(), SinkError>;
}

/// Headline used by the chat and push sinks
pub(crate) fn headline(author: &str) -> String {
    format!("{} has posted a progress update", author)
}
