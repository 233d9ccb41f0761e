//! State types for tracking sync progress
//!
//! These types are serialized to JSON and persisted between runs.

use crate::types::JsonObject;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Replication state for the whole tap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// stream id -> replication key -> bookmark value
    #[serde(default)]
    pub bookmarks: BTreeMap<String, BTreeMap<String, String>>,

    /// Top-level keys this tap does not interpret, carried through unchanged
    #[serde(flatten)]
    pub extra: JsonObject,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the bookmark value of a stream's replication key
    pub fn get_bookmark(&self, stream: &str, key: &str) -> Option<&str> {
        self.bookmarks.get(stream)?.get(key).map(String::as_str)
    }

    /// Set the bookmark value of a stream's replication key
    pub fn set_bookmark(&mut self, stream: &str, key: &str, value: String) {
        self.bookmarks
            .entry(stream.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Drop all bookmarks of a stream
    pub fn clear_stream(&mut self, stream: &str) {
        self.bookmarks.remove(stream);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_default() {
        let state = State::new();
        assert!(state.bookmarks.is_empty());
    }

    #[test]
    fn test_state_bookmark() {
        let mut state = State::new();
        assert!(state.get_bookmark("ad_reports", "date").is_none());

        state.set_bookmark("ad_reports", "date", "2016-06-04T00:00:00Z".to_string());
        assert_eq!(
            state.get_bookmark("ad_reports", "date"),
            Some("2016-06-04T00:00:00Z")
        );
        assert!(state.get_bookmark("ad_reports", "other").is_none());

        state.clear_stream("ad_reports");
        assert!(state.get_bookmark("ad_reports", "date").is_none());
    }

    #[test]
    fn test_state_wire_shape() {
        let state: State = serde_json::from_value(json!({
            "bookmarks": {"ad_reports": {"date": "2016-06-04T00:00:00Z"}},
            "currently_syncing": null
        }))
        .unwrap();

        assert_eq!(
            state.get_bookmark("ad_reports", "date"),
            Some("2016-06-04T00:00:00Z")
        );
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({
                "bookmarks": {"ad_reports": {"date": "2016-06-04T00:00:00Z"}},
                "currently_syncing": null
            })
        );
    }

    #[test]
    fn test_empty_document_is_empty_state() {
        let state: State = serde_json::from_str("{}").unwrap();
        assert_eq!(state, State::new());
    }
}
