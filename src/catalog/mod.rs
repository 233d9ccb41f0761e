//! Entity catalog
//!
//! Static per-stream metadata: endpoint, primary keys, replication method,
//! replication key and fetch shape. Nothing here is discovered at runtime.

mod types;

pub use types::{FetchShape, StreamDefinition};

use crate::error::{Error, Result};
use crate::http::ApiFamily;
use crate::types::ReplicationMethod;

/// Stream id of the top-level account list
pub const ADVERTISABLES: &str = "advertisables";

/// Every stream the tap can replicate, in sync order
pub static STREAMS: &[StreamDefinition] = &[
    StreamDefinition {
        stream_id: ADVERTISABLES,
        api: ApiFamily::Crud,
        endpoint: "organization/get_advertisables",
        primary_key_fields: &["eid"],
        replication_method: ReplicationMethod::FullTable,
        replication_key: None,
        shape: FetchShape::Direct,
    },
    StreamDefinition {
        stream_id: "ads",
        api: ApiFamily::Crud,
        endpoint: "advertisable/get_ads",
        primary_key_fields: &["eid"],
        replication_method: ReplicationMethod::FullTable,
        replication_key: None,
        shape: FetchShape::FanOutFull,
    },
    StreamDefinition {
        stream_id: "ad_groups",
        api: ApiFamily::Crud,
        endpoint: "advertisable/get_adgroups",
        primary_key_fields: &["eid"],
        replication_method: ReplicationMethod::FullTable,
        replication_key: None,
        shape: FetchShape::FanOutFull,
    },
    StreamDefinition {
        stream_id: "campaigns",
        api: ApiFamily::Crud,
        endpoint: "advertisable/get_campaigns",
        primary_key_fields: &["eid"],
        replication_method: ReplicationMethod::FullTable,
        replication_key: None,
        shape: FetchShape::FanOutFull,
    },
    StreamDefinition {
        stream_id: "segments",
        api: ApiFamily::Crud,
        endpoint: "advertisable/get_segments",
        primary_key_fields: &["eid"],
        replication_method: ReplicationMethod::FullTable,
        replication_key: None,
        shape: FetchShape::FanOutFull,
    },
    StreamDefinition {
        stream_id: "ad_reports",
        api: ApiFamily::Reporting,
        endpoint: "report/ad",
        primary_key_fields: &["eid", "date"],
        replication_method: ReplicationMethod::Incremental,
        replication_key: Some("date"),
        shape: FetchShape::FanOutWindowed,
    },
];

/// All stream definitions
pub fn all() -> &'static [StreamDefinition] {
    STREAMS
}

/// Look up a stream by id
pub fn get(stream_id: &str) -> Result<&'static StreamDefinition> {
    STREAMS
        .iter()
        .find(|s| s.stream_id == stream_id)
        .ok_or_else(|| Error::StreamNotFound {
            stream: stream_id.to_string(),
        })
}

/// Resolve a comma-separated selection into definitions, in catalog order.
/// `None` or an empty selection means every stream.
pub fn select(selection: Option<&str>) -> Result<Vec<&'static StreamDefinition>> {
    let requested: Vec<&str> = selection
        .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    if requested.is_empty() {
        return Ok(STREAMS.iter().collect());
    }

    for name in &requested {
        get(name)?;
    }

    Ok(STREAMS
        .iter()
        .filter(|s| requested.contains(&s.stream_id))
        .collect())
}
