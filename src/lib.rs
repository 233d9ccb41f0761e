// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # tap-adroll
//!
//! Replicates AdRoll entities and ad performance reports as a stream of
//! JSON-line messages, resuming incremental streams from persisted bookmarks.
//!
//! ## Features
//!
//! - **Full-table streams**: advertisables, plus ads, ad groups, campaigns
//!   and segments fetched once per advertisable
//! - **Incremental reports**: daily ad reports walked one day window at a time,
//!   with a lookback that re-reads late-arriving rows
//! - **Per-window checkpoints**: the bookmark is committed and flushed after
//!   every window, so a failed run redoes at most one window
//! - **Retries**: three attempts with a constant delay on transient failures
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tap_adroll::{catalog, config::TapConfig, engine::SyncEngine};
//! use tap_adroll::{auth::Authenticator, http::HttpClient, output::JsonLinesSink, state::CheckpointManager};
//!
//! #[tokio::main]
//! async fn main() -> tap_adroll::Result<()> {
//!     let config = TapConfig::from_file("config.json")?;
//!     let mut client = HttpClient::with_config(config.http_config())?;
//!     client.set_authenticator(Authenticator::new(config.auth_config(false)?));
//!
//!     let mut engine = SyncEngine::new(
//!         Arc::new(client),
//!         CheckpointManager::from_file("state.json")?,
//!         config.sync_settings()?,
//!     );
//!     let mut sink = JsonLinesSink::stdout();
//!     engine.sync_all(&catalog::select(None)?, &mut sink).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Sync Engine                           │
//! │   Direct │ FanOutFull │ FanOutWindowed  (per catalog entry) │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//! ┌──────────┬───────────┬──────┴──────┬────────────┬──────────┐
//! │   Auth   │   HTTP    │  Partition  │   State    │  Output  │
//! ├──────────┼───────────┼─────────────┼────────────┼──────────┤
//! │ Bearer   │ GET       │ Advertisers │ Bookmarks  │ JSON     │
//! │ OAuth2   │ Retry     │ Day windows │ Checkpoint │ lines    │
//! │ refresh  │ Rate Limit│ Lookback    │ Atomic save│          │
//! └──────────┴───────────┴─────────────┴────────────┴──────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the tap
pub mod error;

/// Common types and type aliases
pub mod types;

/// Configuration file and resolved settings
pub mod config;

/// Authentication implementations
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Static stream catalog
pub mod catalog;

/// Partition routing: advertisable fan-out and day windows
pub mod partition;

/// State management and checkpointing
pub mod state;

/// Main execution engine
pub mod engine;

/// Message sinks
pub mod output;

/// Command-line interface
pub mod cli;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{SyncSettings, TapConfig};
pub use engine::{Message, SyncEngine, SyncStats};
pub use state::{CheckpointManager, State};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
