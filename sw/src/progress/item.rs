//! Progress item and delta types

use std::fmt;

use serde::{Deserialize, Serialize};

/// One tracked work and its percentage complete
///
/// `prev_progress` of 0 means "no prior value recorded".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressItem {
    pub title: String,
    pub progress: u8,
    #[serde(default)]
    pub prev_progress: u8,
}

impl ProgressItem {
    /// Create an item as observed from the source (no previous value)
    pub fn new(title: impl Into<String>, progress: u8) -> Self {
        Self {
            title: title.into(),
            progress,
            prev_progress: 0,
        }
    }
}

impl fmt::Display for ProgressItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_progress(f, &self.title, self.progress, self.prev_progress)
    }
}

/// Comparison of one work's current percentage against the previous snapshot
///
/// Derived per tick and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDelta {
    pub title: String,
    pub progress: u8,
    pub prev_progress: u8,
}

impl ProgressDelta {
    pub fn new(title: impl Into<String>, progress: u8, prev_progress: u8) -> Self {
        Self {
            title: title.into(),
            progress,
            prev_progress,
        }
    }

    /// True when a known previous percentage differs from the current one
    pub fn has_moved(&self) -> bool {
        self.prev_progress > 0 && self.prev_progress != self.progress
    }
}

impl fmt::Display for ProgressDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_progress(f, &self.title, self.progress, self.prev_progress)
    }
}

fn write_progress(f: &mut fmt::Formatter<'_>, title: &str, progress: u8, prev_progress: u8) -> fmt::Result {
    if prev_progress > 0 && prev_progress != progress {
        write!(f, "{} ({}% => {}%)", title, prev_progress, progress)
    } else {
        write!(f, "{} ({}%)", title, progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_without_previous() {
        assert_eq!(ProgressDelta::new("Task A", 50, 0).to_string(), "Task A (50%)");
        assert_eq!(ProgressDelta::new("Task C", 0, 0).to_string(), "Task C (0%)");
    }

    #[test]
    fn test_display_with_previous() {
        assert_eq!(ProgressDelta::new("Task B", 100, 75).to_string(), "Task B (75% => 100%)");
    }

    #[test]
    fn test_display_previous_equal_to_current() {
        assert_eq!(ProgressDelta::new("Task B", 75, 75).to_string(), "Task B (75%)");
    }

    #[test]
    fn test_display_empty_title() {
        assert_eq!(ProgressDelta::new("", 25, 0).to_string(), " (25%)");
    }

    #[test]
    fn test_item_display_matches_delta() {
        let item = ProgressItem::new("Book 1", 40);
        assert_eq!(item.to_string(), "Book 1 (40%)");
    }

    #[test]
    fn test_has_moved() {
        assert!(ProgressDelta::new("a", 50, 25).has_moved());
        assert!(!ProgressDelta::new("a", 50, 0).has_moved());
        assert!(!ProgressDelta::new("a", 50, 50).has_moved());
    }

    #[test]
    fn test_serde_field_names() {
        let delta = ProgressDelta::new("Book 1", 50, 25);
        let json = serde_json::to_value(&delta).unwrap();
        assert_eq!(json, serde_json::json!({"title": "Book 1", "progress": 50, "prevProgress": 25}));

        let item: ProgressItem = serde_json::from_str(r#"{"title":"Book 2","progress":10}"#).unwrap();
        assert_eq!(item, ProgressItem::new("Book 2", 10));
    }
}
