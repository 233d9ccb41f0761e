//! CLI module
//!
//! Command-line interface for running the tap.
//!
//! # Commands
//!
//! - `check` - Verify credentials against the API
//! - `read` - Replicate streams to stdout
//! - `streams` - List stream metadata

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::{probe, Runner, PROBE_ENDPOINT};
