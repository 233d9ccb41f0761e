//! Engine types
//!
//! Message types and statistics for the sync engine.

use crate::state::State;
use crate::types::JsonValue;
use serde_json::json;

/// A message emitted during sync
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A single record
    Record {
        /// Stream name
        stream: String,
        /// The record
        record: JsonValue,
    },
    /// Full state snapshot after a checkpoint
    State {
        /// State document
        value: State,
    },
}

impl Message {
    /// Create a record message
    pub fn record(stream: impl Into<String>, record: JsonValue) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
        }
    }

    /// Create a state message
    pub fn state(value: State) -> Self {
        Self::State { value }
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Stream of a record message
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Record { stream, .. } => Some(stream),
            Self::State { .. } => None,
        }
    }

    /// Wire form, one JSON object per line on stdout
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Record { stream, record } => json!({
                "type": "RECORD",
                "stream": stream,
                "record": record,
            }),
            Self::State { value } => json!({
                "type": "STATE",
                "value": value,
            }),
        }
    }
}

/// Statistics from a sync operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Total records emitted
    pub records_synced: usize,
    /// Total requests issued
    pub requests_made: usize,
    /// Total streams synced
    pub streams_synced: usize,
    /// Total day windows completed
    pub windows_synced: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records
    pub fn add_records(&mut self, count: usize) {
        self.records_synced += count;
    }

    /// Add a request
    pub fn add_request(&mut self) {
        self.requests_made += 1;
    }

    /// Add a stream
    pub fn add_stream(&mut self) {
        self.streams_synced += 1;
    }

    /// Add a window
    pub fn add_window(&mut self) {
        self.windows_synced += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
