//! Output module
//!
//! Delivers records and state snapshots to the downstream consumer.
//!
//! # Overview
//!
//! This module provides:
//! - `MessageSink` - where the engine sends records and checkpoints
//! - `JsonLinesSink` - one JSON message per line on any writer (stdout in the CLI)
//! - `MemorySink` - collects messages in order, for tests and embedding

mod sink;

pub use sink::{JsonLinesSink, MemorySink, MessageSink};
