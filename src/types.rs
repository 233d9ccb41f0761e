//! Common types used throughout tap-adroll
//!
//! This module contains shared type definitions, type aliases,
//! and timestamp formatting helpers used across multiple modules.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Query parameters, ordered so request logs are stable
pub type QueryParams = BTreeMap<String, String>;

// ============================================================================
// Replication Method
// ============================================================================

/// How a stream is replicated between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplicationMethod {
    /// Re-read everything on every run
    FullTable,
    /// Resume from a persisted bookmark
    Incremental,
}

// ============================================================================
// Timestamps
// ============================================================================

/// Format of bookmark values and stamped report dates
pub const BOOKMARK_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Format of date parameters sent to the reporting API
pub const API_DATE_FORMAT: &str = "%Y-%m-%d";

/// Format a timestamp as `2016-06-05T00:00:00.000000Z`
pub fn format_bookmark(dt: DateTime<Utc>) -> String {
    dt.format(BOOKMARK_FORMAT).to_string()
}

/// Parse an ISO-8601 timestamp or a bare date into UTC
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, API_DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}
