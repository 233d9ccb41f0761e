//! Catalog types

use crate::http::ApiFamily;
use crate::types::ReplicationMethod;
use serde_json::{json, Value};

/// How a stream's records are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchShape {
    /// A single request, no scope parameter
    Direct,
    /// One request per advertisable
    FanOutFull,
    /// One request per (day window, advertisable), bookmarked per window
    FanOutWindowed,
}

/// Immutable descriptor of one stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDefinition {
    /// Stream identifier, also the state key
    pub stream_id: &'static str,
    /// API family hosting the endpoint
    pub api: ApiFamily,
    /// Endpoint path relative to the API root
    pub endpoint: &'static str,
    /// Fields that identify a record
    pub primary_key_fields: &'static [&'static str],
    /// Replication method
    pub replication_method: ReplicationMethod,
    /// Bookmark field for incremental streams
    pub replication_key: Option<&'static str>,
    /// Fetch plan
    pub shape: FetchShape,
}

impl StreamDefinition {
    /// Whether the stream keeps a bookmark
    pub fn is_incremental(&self) -> bool {
        self.replication_method == ReplicationMethod::Incremental
    }

    /// Stream metadata as printed by the `streams` command
    pub fn to_json(&self) -> Value {
        json!({
            "tap_stream_id": self.stream_id,
            "key_properties": self.primary_key_fields,
            "forced_replication_method": self.replication_method,
            "valid_replication_keys": self.replication_key.map(|k| vec![k]).unwrap_or_default(),
        })
    }
}
