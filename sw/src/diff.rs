//! Diff engine - compares a fresh snapshot against the previous one
//!
//! Pure functions with no I/O. The whole-snapshot change check is
//! order-sensitive: the same items in a different order count as a change.

use tracing::debug;

use crate::progress::{ProgressDelta, Snapshot};

/// Compute one delta per item in `current`, in `current`'s order
///
/// For each item the first item in `previous` with the same title is the
/// match. `prev_progress` is the match's percentage when it differs from the
/// current one, and 0 otherwise (including when there is no match).
pub fn compute_deltas(current: &Snapshot, previous: &Snapshot) -> Vec<ProgressDelta> {
    debug!(current = current.len(), previous = previous.len(), "compute_deltas: called");
    current
        .iter()
        .map(|item| {
            let prev_progress = match previous.find(&item.title) {
                Some(matched) if matched.progress != item.progress => matched.progress,
                _ => 0,
            };
            ProgressDelta::new(item.title.clone(), item.progress, prev_progress)
        })
        .collect()
}

/// Whether `current` differs structurally from `previous`
pub fn has_changed(current: &Snapshot, previous: &Snapshot) -> bool {
    !current.same_as(previous)
}

/// Deltas whose percentage moved from a known previous value
pub fn moved(deltas: &[ProgressDelta]) -> impl Iterator<Item = &ProgressDelta> {
    deltas.iter().filter(|d| d.has_moved())
}
