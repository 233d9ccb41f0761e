//! CLI runner - executes commands

use crate::auth::Authenticator;
use crate::catalog;
use crate::cli::commands::{Cli, Commands};
use crate::config::TapConfig;
use crate::engine::{SyncEngine, SyncStats};
use crate::error::{Error, Result};
use crate::http::{ApiClient, ApiFamily, HttpClient};
use crate::output::{JsonLinesSink, MessageSink};
use crate::state::CheckpointManager;
use crate::types::QueryParams;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Endpoint called once at startup to verify credentials
pub const PROBE_ENDPOINT: &str = "organization/get";

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Check => self.check().await,
            Commands::Read { streams } => {
                let mut sink = JsonLinesSink::stdout();
                self.read(streams.as_deref(), &mut sink).await.map(|_| ())
            }
            Commands::Streams => self.streams(),
        }
    }

    /// Load configuration
    fn load_config(&self) -> Result<TapConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use -c flag)"))?;
        TapConfig::from_file(path)
    }

    /// Load state
    fn load_checkpoints(&self) -> Result<CheckpointManager> {
        match &self.cli.state {
            Some(path) => CheckpointManager::from_file(path),
            None => Ok(CheckpointManager::in_memory()),
        }
    }

    /// Build the authenticated HTTP client
    fn build_client(&self, config: &TapConfig) -> Result<HttpClient> {
        let auth_config = config.auth_config(self.cli.dev)?;
        let mut client = HttpClient::with_config(config.http_config())?;

        let mut authenticator = Authenticator::new(auth_config);
        if !self.cli.dev {
            if let Some(path) = &self.cli.config {
                authenticator = authenticator.persist_credentials_to(path);
            }
        }
        client.set_authenticator(authenticator);

        Ok(client)
    }

    /// Check credentials
    async fn check(&self) -> Result<()> {
        let config = self.load_config()?;
        let client = self.build_client(&config)?;

        match probe(&client).await {
            Ok(()) => {
                output_message(&json!({
                    "type": "CONNECTION_STATUS",
                    "connectionStatus": {
                        "status": "SUCCEEDED",
                        "message": "Connection successful"
                    }
                }));
                Ok(())
            }
            Err(e) => {
                output_message(&json!({
                    "type": "CONNECTION_STATUS",
                    "connectionStatus": {
                        "status": "FAILED",
                        "message": format!("Connection failed: {e}")
                    }
                }));
                Err(e)
            }
        }
    }

    /// Replicate the selected streams into `sink`.
    ///
    /// Configuration, stream selection and state are all validated before the
    /// first request is sent.
    pub async fn read(
        &self,
        streams: Option<&str>,
        sink: &mut dyn MessageSink,
    ) -> Result<SyncStats> {
        let config = self.load_config()?;
        let settings = config.sync_settings()?;
        let selected = catalog::select(streams)?;
        let checkpoints = self.load_checkpoints()?;
        let client = self.build_client(&config)?;

        probe(&client).await?;

        let client: Arc<dyn ApiClient> = Arc::new(client);
        let mut engine = SyncEngine::new(client, checkpoints, settings);

        let result = engine.sync_all(&selected, sink).await;
        if let Err(e) = &result {
            error!(
                records = engine.stats().records_synced,
                requests = engine.stats().requests_made,
                "Sync aborted: {e}"
            );
        }
        result
    }

    /// List streams
    fn streams(&self) -> Result<()> {
        let streams: Vec<_> = catalog::all().iter().map(|s| s.to_json()).collect();
        output_message(&json!({ "streams": streams }));
        Ok(())
    }
}

/// Verify credentials with a single call to [`PROBE_ENDPOINT`]
pub async fn probe(client: &dyn ApiClient) -> Result<()> {
    client
        .get(ApiFamily::Crud, PROBE_ENDPOINT, &QueryParams::new())
        .await
        .map_err(|e| Error::auth(format!("Credential check against {PROBE_ENDPOINT} failed: {e}")))?;
    info!("Credentials verified");
    Ok(())
}

fn output_message(msg: &serde_json::Value) {
    println!("{msg}");
}
