//! Authenticator implementation
//!
//! Handles applying authentication to requests and managing token refresh.

use super::types::{AuthConfig, CachedToken};
use crate::error::{Error, Result};
use crate::types::JsonValue;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Authenticator handles applying authentication to HTTP requests
pub struct Authenticator {
    /// Auth configuration
    config: AuthConfig,
    /// Cached access token for the refresh flow. Starts empty, so the first
    /// request always refreshes.
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    /// Refresh token currently in use; the token endpoint may rotate it
    refresh_token: Arc<RwLock<Option<String>>>,
    /// Config file receiving refreshed credentials
    credentials_path: Option<PathBuf>,
    /// HTTP client for token requests
    http_client: Client,
}

impl Authenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: AuthConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create an authenticator with a custom HTTP client
    pub fn with_client(config: AuthConfig, http_client: Client) -> Self {
        let refresh_token = match &config {
            AuthConfig::Oauth2Refresh { refresh_token, .. } => Some(refresh_token.clone()),
            _ => None,
        };

        Self {
            config,
            cached_token: Arc::new(RwLock::new(None)),
            refresh_token: Arc::new(RwLock::new(refresh_token)),
            credentials_path: None,
            http_client,
        }
    }

    /// Write refreshed tokens back into this config file
    #[must_use]
    pub fn persist_credentials_to(mut self, path: impl AsRef<Path>) -> Self {
        self.credentials_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Apply authentication to a request builder
    pub async fn apply(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        match &self.config {
            AuthConfig::None => Ok(req),
            AuthConfig::Bearer { token } => Ok(req.bearer_auth(token)),
            AuthConfig::Oauth2Refresh { .. } => {
                let token = self.get_or_refresh_token().await?;
                Ok(req.bearer_auth(token))
            }
        }
    }

    /// Get a valid token, refreshing if necessary
    async fn get_or_refresh_token(&self) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired() {
                    return Ok(token.token.clone());
                }
            }
        }

        let mut cached = self.cached_token.write().await;

        // Another task may have refreshed while we waited for the write lock
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }

        let new_token = self.fetch_oauth2_refresh().await?;
        let token_str = new_token.token.clone();
        *cached = Some(new_token);

        Ok(token_str)
    }

    /// Fetch OAuth2 token using refresh token flow
    async fn fetch_oauth2_refresh(&self) -> Result<CachedToken> {
        let AuthConfig::Oauth2Refresh {
            token_url,
            client_id,
            client_secret,
            ..
        } = &self.config
        else {
            return Err(Error::auth(
                "Token refresh not supported for this auth type",
            ));
        };

        let refresh_token = self
            .refresh_token
            .read()
            .await
            .clone()
            .unwrap_or_default();

        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
        ];

        let response = self
            .http_client
            .post(token_url)
            .form(&form)
            .send()
            .await
            .map_err(Error::Http)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TokenRefresh {
                message: format!("Refresh token request failed with status {status}: {body}"),
            });
        }

        let token_response: TokenResponse = response.json().await.map_err(Error::Http)?;
        info!("Credentials refreshed");

        if let Some(rotated) = &token_response.refresh_token {
            *self.refresh_token.write().await = Some(rotated.clone());
        }
        self.persist(&token_response, &refresh_token)?;

        Ok(token_response.into_cached_token())
    }

    /// Write the refreshed token pair into the config file, keeping every
    /// other key untouched
    fn persist(&self, token: &TokenResponse, previous_refresh: &str) -> Result<()> {
        let Some(path) = &self.credentials_path else {
            return Ok(());
        };

        let contents = std::fs::read_to_string(path)?;
        let mut config: JsonValue = serde_json::from_str(&contents)?;
        let Some(object) = config.as_object_mut() else {
            warn!(path = %path.display(), "Config file is not a JSON object, refreshed credentials not saved");
            return Ok(());
        };

        let refresh = token.refresh_token.as_deref().unwrap_or(previous_refresh);
        object.insert("access_token".to_string(), token.access_token.clone().into());
        object.insert("refresh_token".to_string(), refresh.into());

        std::fs::write(path, serde_json::to_string_pretty(&config)?)?;
        Ok(())
    }

    /// Get the current auth config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("kind", &self.config.kind())
            .field("credentials_path", &self.credentials_path)
            .finish_non_exhaustive()
    }
}

/// OAuth2 token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_cached_token(self) -> CachedToken {
        match self.expires_in {
            Some(secs) => CachedToken::expires_in(self.access_token, secs),
            None => CachedToken::without_expiry(self.access_token),
        }
    }
}
