//! Ordered snapshot of works in progress

use serde::{Deserialize, Serialize};

use super::ProgressItem;

/// Ordered works in progress observed at a single point in time
///
/// Titles are expected to be unique but this is not enforced.
#[derive(Debug, Clone, Default, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Vec<ProgressItem>);

impl Snapshot {
    pub fn new(items: Vec<ProgressItem>) -> Self {
        Self(items)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProgressItem> {
        self.0.iter()
    }

    pub fn items(&self) -> &[ProgressItem] {
        &self.0
    }

    /// First item with the given title
    pub fn find(&self, title: &str) -> Option<&ProgressItem> {
        self.0.iter().find(|item| item.title == title)
    }

    /// Element-by-element comparison over every field, order-sensitive
    ///
    /// The same items in a different order are not the same snapshot.
    pub fn same_as(&self, other: &Snapshot) -> bool {
        if self.0.len() != other.0.len() {
            return false;
        }
        self.0.iter().zip(other.0.iter()).all(|(a, b)| {
            a.title == b.title && a.progress == b.progress && a.prev_progress == b.prev_progress
        })
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl From<Vec<ProgressItem>> for Snapshot {
    fn from(items: Vec<ProgressItem>) -> Self {
        Self(items)
    }
}

impl FromIterator<ProgressItem> for Snapshot {
    fn from_iter<I: IntoIterator<Item = ProgressItem>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a ProgressItem;
    type IntoIter = std::slice::Iter<'a, ProgressItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
