//! HTTP client with retry and rate limiting
//!
//! Provides the client every stream fetches through. It handles:
//! - Retries with a constant backoff interval
//! - Rate limiting to prevent API throttling
//! - JSON body parsing
//! - Detection of application-level errors carried by 2xx responses

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::auth::Authenticator;
use crate::error::{Error, Result};
use crate::types::{JsonValue, QueryParams};
use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Which AdRoll API family an endpoint lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiFamily {
    /// Entity CRUD API (`/api/v1`)
    Crud,
    /// Reporting API (`/uhura/v1`)
    Reporting,
}

impl ApiFamily {
    /// Path segment of this API family
    pub fn segment(self) -> &'static str {
        match self {
            ApiFamily::Crud => "api",
            ApiFamily::Reporting => "uhura",
        }
    }
}

/// Authenticated GET, the only capability the sync engine needs from the API
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Fetch `endpoint` with `params` and return the decoded JSON body
    async fn get(&self, api: ApiFamily, endpoint: &str, params: &QueryParams) -> Result<JsonValue>;
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Services host, e.g. `https://services.adroll.com`
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Total attempts per request, the first one included
    pub max_attempts: u32,
    /// Constant delay between attempts
    pub retry_interval: Duration,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: crate::config::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
            max_attempts: 3,
            retry_interval: Duration::from_secs(crate::config::DEFAULT_RETRY_INTERVAL_SECS),
            rate_limit: None,
            user_agent: format!("tap-adroll/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the total number of attempts
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts.max(1);
        self
    }

    /// Set the constant delay between attempts
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.config.retry_interval = interval;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// HTTP client with retry and rate limiting
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    authenticator: Option<Authenticator>,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            authenticator: None,
            rate_limiter,
        })
    }

    /// Set the authenticator
    pub fn set_authenticator(&mut self, authenticator: Authenticator) {
        self.authenticator = Some(authenticator);
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Delay slept between two attempts of the same request
    pub fn retry_interval(&self) -> Duration {
        self.config.retry_interval
    }

    /// Build the full URL for an endpoint
    pub fn build_url(&self, api: ApiFamily, endpoint: &str) -> Result<url::Url> {
        let raw = format!(
            "{}/{}/v1/{}",
            self.config.base_url,
            api.segment(),
            endpoint.trim_start_matches('/')
        );
        Ok(url::Url::parse(&raw)?)
    }

    /// GET with retries. Transient failures (5xx, 429, connection errors,
    /// timeouts) are retried until `max_attempts` is reached.
    pub async fn get_json(
        &self,
        api: ApiFamily,
        endpoint: &str,
        params: &QueryParams,
    ) -> Result<JsonValue> {
        let url = self.build_url(api, endpoint)?;
        let max_attempts = self.config.max_attempts;
        let mut attempt = 1;

        loop {
            match self.send_once(&url, endpoint, params).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.retry_interval();
                    warn!(
                        endpoint,
                        "Request failed: {e}, attempt {attempt}/{max_attempts}, retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// A single attempt
    async fn send_once(
        &self,
        url: &url::Url,
        endpoint: &str,
        params: &QueryParams,
    ) -> Result<JsonValue> {
        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        info!(
            method = %Method::GET,
            url = %url,
            endpoint,
            params = ?params,
            "Making request"
        );

        let mut req = self.client.get(url.clone());
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(ref auth) = self.authenticator {
            req = auth.apply(req).await?;
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    endpoint: endpoint.to_string(),
                    timeout_ms: self.config.timeout.as_millis() as u64,
                }
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::http_status(status.as_u16(), endpoint, body));
        }

        let json: JsonValue = serde_json::from_str(&body)
            .map_err(|e| Error::decode(endpoint, format!("invalid JSON body: {e}")))?;

        if let Some(message) = application_error(&json) {
            return Err(Error::api(endpoint, message));
        }

        debug!(endpoint, "Request succeeded");
        Ok(json)
    }
}

#[async_trait]
impl ApiClient for HttpClient {
    async fn get(&self, api: ApiFamily, endpoint: &str, params: &QueryParams) -> Result<JsonValue> {
        self.get_json(api, endpoint, params).await
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("has_authenticator", &self.authenticator.is_some())
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Extract the message of an error payload returned with a success status.
///
/// Recognizes a non-null top-level `error` and a non-empty `errors` array.
pub(crate) fn application_error(body: &JsonValue) -> Option<String> {
    match body.get("error") {
        None | Some(JsonValue::Null) => {}
        Some(JsonValue::String(s)) => return Some(s.clone()),
        Some(other) => return Some(other.to_string()),
    }

    match body.get("errors") {
        Some(JsonValue::Array(errors)) if !errors.is_empty() => Some(
            errors
                .iter()
                .map(|e| match e {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("; "),
        ),
        _ => None,
    }
}
