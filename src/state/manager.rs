//! Checkpoint manager implementation
//!
//! Owns the state document for a run. Reads bookmarks, plans the windows of
//! incremental streams and commits one bookmark per completed window. Every
//! commit is written back with an atomic temp-file rename when the state
//! came from a file, then announced to the sink.

use super::types::State;
use crate::catalog::StreamDefinition;
use crate::config::SyncSettings;
use crate::error::{Error, Result};
use crate::output::MessageSink;
use crate::partition::{plan_windows, DayWindows};
use crate::types::{format_bookmark, parse_datetime};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bookmark reads and per-window commits
#[derive(Debug, Default)]
pub struct CheckpointManager {
    /// Current state
    state: State,
    /// State file receiving every commit
    path: Option<PathBuf>,
    /// Last value committed in this run, per stream
    committed: HashMap<String, DateTime<Utc>>,
}

impl CheckpointManager {
    /// Create a manager over an existing state, without file persistence
    pub fn new(state: State) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    /// Create an in-memory manager starting from empty state
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Create a manager from a file, loading existing state if present.
    /// Commits are written back to the same file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::state(format!("Failed to read state file: {e}")))?;
            if contents.trim().is_empty() {
                State::new()
            } else {
                serde_json::from_str(&contents)
                    .map_err(|e| Error::state(format!("Failed to parse state file: {e}")))?
            }
        } else {
            State::new()
        };

        Ok(Self {
            state,
            path: Some(path),
            committed: HashMap::new(),
        })
    }

    /// Create a manager from an inline JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let state: State = serde_json::from_str(json)
            .map_err(|e| Error::state(format!("Failed to parse state JSON: {e}")))?;
        Ok(Self::new(state))
    }

    /// Current state
    pub fn state(&self) -> &State {
        &self.state
    }

    /// State file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Parsed bookmark of a stream's replication key.
    ///
    /// An absent bookmark is `None`; a present but unparseable one is an error.
    pub fn get_bookmark(&self, stream_id: &str, key: &str) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.state.get_bookmark(stream_id, key) else {
            return Ok(None);
        };

        parse_datetime(raw).map(Some).ok_or_else(|| {
            Error::state(format!(
                "Bookmark {stream_id}.{key} is not a timestamp: {raw}"
            ))
        })
    }

    /// Plan the day windows of an incremental stream.
    ///
    /// The base is the bookmark when present, else the configured start date.
    pub fn generate_windows(
        &self,
        stream: &StreamDefinition,
        settings: &SyncSettings,
        now: DateTime<Utc>,
    ) -> Result<DayWindows> {
        let key = stream.replication_key.ok_or_else(|| {
            Error::checkpoint(stream.stream_id, "stream has no replication key")
        })?;

        let base = match self.get_bookmark(stream.stream_id, key)? {
            Some(bookmark) => {
                debug!(stream = stream.stream_id, bookmark = %format_bookmark(bookmark), "Resuming from bookmark");
                bookmark
            }
            None => settings.start_date,
        };

        plan_windows(base, settings.lookback_days, now, settings.end_date)
    }

    /// Record a completed window.
    ///
    /// Within a run, values committed for a stream never decrease. The state
    /// file (if any) is replaced atomically and the full state is emitted.
    pub async fn commit_bookmark(
        &mut self,
        stream_id: &str,
        key: &str,
        value: DateTime<Utc>,
        sink: &mut dyn MessageSink,
    ) -> Result<()> {
        if let Some(previous) = self.committed.get(stream_id) {
            if value < *previous {
                return Err(Error::checkpoint(
                    stream_id,
                    format!(
                        "bookmark would move backwards from {} to {}",
                        format_bookmark(*previous),
                        format_bookmark(value)
                    ),
                ));
            }
        }

        let stamp = format_bookmark(value);
        self.state.set_bookmark(stream_id, key, stamp.clone());
        self.committed.insert(stream_id.to_string(), value);

        self.save().await?;
        sink.emit_state(&self.state)?;

        info!(stream = stream_id, bookmark = %stamp, "Checkpoint committed");
        Ok(())
    }

    /// Save the current state to the state file
    pub async fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(()); // In-memory mode
        };

        let contents = serde_json::to_string_pretty(&self.state)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))?;

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::state(format!("Failed to write state file: {e}")))?;

        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| Error::state(format!("Failed to rename state file: {e}")))?;

        Ok(())
    }
}
