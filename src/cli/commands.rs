//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// AdRoll tap: replicates AdRoll entities and ad reports as JSON lines
#[derive(Parser, Debug)]
#[command(name = "tap-adroll")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON). Refreshed credentials are written back to it.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// State file (JSON). Read at start, rewritten after every committed window.
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Use the configured access token as-is, without refreshing
    #[arg(long, global = true)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Test credentials against the API
    Check,

    /// Replicate streams to stdout
    Read {
        /// Streams to sync (comma-separated, empty = all)
        #[arg(long)]
        streams: Option<String>,
    },

    /// List available streams and their metadata
    Streams,
}
