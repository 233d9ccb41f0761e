//! State management module
//!
//! Handles bookmark tracking, checkpointing, and resumability.
//! State is persisted between sync runs to enable incremental syncs.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - the `{"bookmarks": {stream: {key: value}}}` document
//! - `CheckpointManager` - bookmark reads, window planning and per-window commits

mod manager;
mod types;

pub use manager::CheckpointManager;
pub use types::State;
