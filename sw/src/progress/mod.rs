//! Progress data model
//!
//! A [`Snapshot`] is the ordered list of works in progress observed at one
//! instant. A [`ProgressDelta`] pairs a work's current percentage with the
//! percentage it had in the previous snapshot, and is what notification
//! sinks receive.

mod item;
mod snapshot;

pub use item::{ProgressDelta, ProgressItem};
pub use snapshot::Snapshot;
