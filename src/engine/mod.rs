//! Execution engine module
//!
//! Main read loop and stream orchestration.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncEngine` - runs every selected stream in catalog order
//! - `SyncStats` - counters reported at the end of a run
//! - `Message` - the record and state messages delivered to a sink
//!
//! Requests are issued strictly one at a time. For the windowed report
//! stream the outer loop walks day windows and the inner loop walks
//! advertisables, so a window's bookmark is committed only after every
//! advertisable of that window has been fetched and emitted.

mod types;

pub use types::{Message, SyncStats};

use crate::catalog::{FetchShape, StreamDefinition};
use crate::config::SyncSettings;
use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::output::MessageSink;
use crate::partition::{AdvertisableResolver, DateWindow};
use crate::state::CheckpointManager;
use crate::types::{JsonValue, QueryParams};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Scope parameter carrying the advertisable eid
pub const ADVERTISABLE_PARAM: &str = "advertisable";

/// Fixed reporting parameters sent with every report request
pub const REPORT_PARAMS: &[(&str, &str)] = &[
    ("data_format", "entity"),
    ("breakdowns", "ad"),
    ("currency", "USD"),
];

/// Sync engine for orchestrating data extraction
pub struct SyncEngine {
    /// API client
    client: Arc<dyn ApiClient>,
    /// Checkpoint manager
    checkpoints: CheckpointManager,
    /// Window settings
    settings: SyncSettings,
    /// Shared advertisable list
    resolver: AdvertisableResolver,
    /// Fixed clock, `None` reads the system clock
    now: Option<DateTime<Utc>>,
    /// Statistics
    stats: SyncStats,
}

impl SyncEngine {
    /// Create a new sync engine
    pub fn new(
        client: Arc<dyn ApiClient>,
        checkpoints: CheckpointManager,
        settings: SyncSettings,
    ) -> Self {
        Self {
            client,
            checkpoints,
            settings,
            resolver: AdvertisableResolver::new(),
            now: None,
            stats: SyncStats::default(),
        }
    }

    /// Pin "now", which bounds open-ended windows and the lookback floor
    #[must_use]
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Use a pre-built advertisable resolver
    #[must_use]
    pub fn with_resolver(mut self, resolver: AdvertisableResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Get the checkpoint manager
    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    /// Sync streams in the given order. The first failure aborts the run.
    pub async fn sync_all(
        &mut self,
        streams: &[&StreamDefinition],
        sink: &mut dyn MessageSink,
    ) -> Result<SyncStats> {
        let start = Instant::now();

        for stream in streams {
            self.sync_stream(stream, sink).await?;
        }

        self.stats.set_duration(start.elapsed().as_millis() as u64);
        info!(
            streams = self.stats.streams_synced,
            records = self.stats.records_synced,
            requests = self.stats.requests_made,
            windows = self.stats.windows_synced,
            duration_ms = self.stats.duration_ms,
            "Sync complete"
        );
        Ok(self.stats.clone())
    }

    /// Sync a single stream according to its fetch shape
    pub async fn sync_stream(
        &mut self,
        stream: &StreamDefinition,
        sink: &mut dyn MessageSink,
    ) -> Result<()> {
        info!(stream = stream.stream_id, "Starting sync");
        let records_before = self.stats.records_synced;

        let result = match stream.shape {
            FetchShape::Direct => self.sync_direct(stream, sink).await,
            FetchShape::FanOutFull => self.sync_fan_out(stream, sink).await,
            FetchShape::FanOutWindowed => self.sync_windowed(stream, sink).await,
        };

        if let Err(e) = &result {
            error!(stream = stream.stream_id, "Stream failed: {e}");
        }
        result?;

        self.stats.add_stream();
        info!(
            stream = stream.stream_id,
            records = self.stats.records_synced - records_before,
            "Finished sync"
        );
        Ok(())
    }

    async fn sync_direct(
        &mut self,
        stream: &StreamDefinition,
        sink: &mut dyn MessageSink,
    ) -> Result<()> {
        self.fetch_and_emit(stream, &QueryParams::new(), sink)
            .await
            .map_err(|e| Error::sync(stream.stream_id, format!("GET {}", stream.endpoint), e))
    }

    async fn sync_fan_out(
        &mut self,
        stream: &StreamDefinition,
        sink: &mut dyn MessageSink,
    ) -> Result<()> {
        let ids = self.scope_ids(stream).await?;

        for eid in &ids {
            let mut params = QueryParams::new();
            params.insert(ADVERTISABLE_PARAM.to_string(), eid.clone());

            self.fetch_and_emit(stream, &params, sink)
                .await
                .map_err(|e| {
                    Error::sync(
                        stream.stream_id,
                        format!("GET {} for advertisable {eid}", stream.endpoint),
                        e,
                    )
                })?;
        }
        Ok(())
    }

    async fn sync_windowed(
        &mut self,
        stream: &StreamDefinition,
        sink: &mut dyn MessageSink,
    ) -> Result<()> {
        let key = stream
            .replication_key
            .ok_or_else(|| Error::checkpoint(stream.stream_id, "stream has no replication key"))?;

        let windows = self
            .checkpoints
            .generate_windows(stream, &self.settings, self.now())?;
        info!(
            stream = stream.stream_id,
            windows = windows.len(),
            "Planned report windows"
        );
        if windows.len() == 0 {
            return Ok(());
        }

        let ids = self.scope_ids(stream).await?;
        if ids.is_empty() {
            warn!(stream = stream.stream_id, "No advertisables, windows are committed empty");
        }

        for window in windows {
            for eid in &ids {
                let params = report_params(eid, &window);
                self.fetch_and_emit_stamped(stream, &params, key, &window, sink)
                    .await
                    .map_err(|e| {
                        Error::sync(
                            stream.stream_id,
                            format!(
                                "GET {} for advertisable {eid}, window {window}",
                                stream.endpoint
                            ),
                            e,
                        )
                    })?;
            }

            self.checkpoints
                .commit_bookmark(stream.stream_id, key, window.start, sink)
                .await
                .map_err(|e| {
                    Error::sync(stream.stream_id, format!("committing window {window}"), e)
                })?;
            self.stats.add_window();
        }
        Ok(())
    }

    /// Advertisable eids, resolved once and shared by every stream
    async fn scope_ids(&mut self, stream: &StreamDefinition) -> Result<Vec<String>> {
        let was_resolved = self.resolver.is_resolved();
        let ids = self
            .resolver
            .list_scope_ids(self.client.as_ref())
            .await
            .map_err(|e| Error::sync(stream.stream_id, "resolving advertisables", e))?
            .to_vec();
        if !was_resolved {
            self.stats.add_request();
        }
        Ok(ids)
    }

    async fn fetch_and_emit(
        &mut self,
        stream: &StreamDefinition,
        params: &QueryParams,
        sink: &mut dyn MessageSink,
    ) -> Result<()> {
        let records = self.fetch(stream, params).await?;
        for record in &records {
            sink.emit_record(stream.stream_id, record)?;
        }
        self.stats.add_records(records.len());
        Ok(())
    }

    async fn fetch_and_emit_stamped(
        &mut self,
        stream: &StreamDefinition,
        params: &QueryParams,
        key: &str,
        window: &DateWindow,
        sink: &mut dyn MessageSink,
    ) -> Result<()> {
        let records = self.fetch(stream, params).await?;
        let stamp = JsonValue::String(window.stamp());
        for mut record in records {
            let Some(object) = record.as_object_mut() else {
                return Err(Error::decode(stream.endpoint, "report row is not an object"));
            };
            object.insert(key.to_string(), stamp.clone());
            sink.emit_record(stream.stream_id, &record)?;
            self.stats.add_records(1);
        }
        Ok(())
    }

    /// One request, returning the records under `results`
    async fn fetch(
        &mut self,
        stream: &StreamDefinition,
        params: &QueryParams,
    ) -> Result<Vec<JsonValue>> {
        self.stats.add_request();
        let body = self.client.get(stream.api, stream.endpoint, params).await?;
        extract_results(stream.endpoint, body)
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("checkpoints", &self.checkpoints)
            .field("settings", &self.settings)
            .field("now", &self.now)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Query of one report request
pub(crate) fn report_params(eid: &str, window: &DateWindow) -> QueryParams {
    let mut params = QueryParams::new();
    params.insert(ADVERTISABLE_PARAM.to_string(), eid.to_string());
    params.insert("start_date".to_string(), window.start_param());
    params.insert("end_date".to_string(), window.end_param());
    for (name, value) in REPORT_PARAMS {
        params.insert((*name).to_string(), (*value).to_string());
    }
    params
}

/// Records under `results`. `null` means no records; a single object is
/// treated as one record.
pub(crate) fn extract_results(endpoint: &str, body: JsonValue) -> Result<Vec<JsonValue>> {
    let JsonValue::Object(mut object) = body else {
        return Err(Error::decode(endpoint, "response body is not a JSON object"));
    };

    match object.remove("results") {
        Some(JsonValue::Array(records)) => Ok(records),
        Some(JsonValue::Null) => Ok(Vec::new()),
        Some(record @ JsonValue::Object(_)) => Ok(vec![record]),
        Some(other) => Err(Error::decode(
            endpoint,
            format!("unexpected 'results' value: {other}"),
        )),
        None => Err(Error::decode(endpoint, "missing 'results' field")),
    }
}

#[cfg(test)]
mod tests;
