//! Tap configuration
//!
//! The config file is a flat JSON object. It is deserialized into
//! [`TapConfig`] and then resolved once, before any network activity, into
//! the typed settings each component consumes.

use crate::auth::AuthConfig;
use crate::error::{Error, Result, ResultExt};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::partition::lookback_floor;
use crate::types::{parse_datetime, JsonValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default AdRoll services host
pub const DEFAULT_BASE_URL: &str = "https://services.adroll.com";

/// Default number of days re-read behind "now"
pub const DEFAULT_LOOKBACK_DAYS: i64 = 7;

/// Default delay between retry attempts
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 10;

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Raw configuration as read from the config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TapConfig {
    /// Earliest date to replicate (required)
    #[serde(default)]
    pub start_date: Option<String>,

    /// Last date to replicate, exclusive (defaults to now)
    #[serde(default)]
    pub end_date: Option<String>,

    /// Lookback in days, integer or numeric string
    #[serde(default)]
    pub lookback_window: Option<JsonValue>,

    /// OAuth2 client id
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth2 client secret
    #[serde(default)]
    pub client_secret: Option<String>,

    /// OAuth2 refresh token
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// OAuth2 access token
    #[serde(default)]
    pub access_token: Option<String>,

    /// Services host, overridable for testing
    #[serde(default)]
    pub base_url: Option<String>,

    /// Constant delay between retry attempts
    #[serde(default)]
    pub retry_interval_seconds: Option<u64>,

    /// Per-request timeout
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,

    /// Optional client-side request rate cap
    #[serde(default)]
    pub requests_per_second: Option<u32>,

    /// Custom user agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// Settings that drive window generation for incremental streams
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Configured start date
    pub start_date: DateTime<Utc>,
    /// Configured end date, `None` means "now"
    pub end_date: Option<DateTime<Utc>>,
    /// Lookback in days
    pub lookback_days: i64,
}

impl SyncSettings {
    /// Create settings with the default lookback and no end date
    pub fn new(start_date: DateTime<Utc>) -> Self {
        Self {
            start_date,
            end_date: None,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }

    /// Set the end date
    #[must_use]
    pub fn with_end_date(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Set the lookback in days
    #[must_use]
    pub fn with_lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = days;
        self
    }
}

impl TapConfig {
    /// Load a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&contents)
    }

    /// Parse config from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::config(format!("Invalid config JSON: {e}")))
    }

    /// Resolve the window-generation settings
    pub fn sync_settings(&self) -> Result<SyncSettings> {
        let raw_start = self
            .start_date
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| Error::missing_field("start_date"))?;
        let start_date = parse_datetime(raw_start)
            .ok_or_else(|| Error::invalid_value("start_date", format!("not a date: {raw_start}")))?;

        let end_date = match self.end_date.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => Some(
                parse_datetime(raw)
                    .ok_or_else(|| Error::invalid_value("end_date", format!("not a date: {raw}")))?,
            ),
            None => None,
        };

        Ok(SyncSettings {
            start_date,
            end_date,
            lookback_days: self.lookback_days()?,
        })
    }

    /// Resolve the lookback, accepting `7` as well as `"7"`
    pub fn lookback_days(&self) -> Result<i64> {
        let days = match &self.lookback_window {
            None | Some(JsonValue::Null) => return Ok(DEFAULT_LOOKBACK_DAYS),
            Some(JsonValue::Number(n)) => n.as_i64(),
            Some(JsonValue::String(s)) if s.trim().is_empty() => return Ok(DEFAULT_LOOKBACK_DAYS),
            Some(JsonValue::String(s)) => s.trim().parse::<i64>().ok(),
            Some(_) => None,
        };

        match days {
            Some(d) if d >= 0 && lookback_floor(Utc::now(), d).is_some() => Ok(d),
            _ => Err(Error::invalid_value(
                "lookback_window",
                "expected a non-negative number of days within the supported date range",
            )),
        }
    }

    /// Services host without a trailing slash
    pub fn base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string()
    }

    /// Build the HTTP client configuration
    pub fn http_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .base_url(self.base_url())
            .timeout(Duration::from_secs(
                self.request_timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .retry_interval(Duration::from_secs(
                self.retry_interval_seconds
                    .unwrap_or(DEFAULT_RETRY_INTERVAL_SECS),
            ));

        if let Some(rps) = self.requests_per_second {
            builder = builder.rate_limit(RateLimiterConfig::per_second(rps));
        }
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.clone());
        }

        builder.build()
    }

    /// Build the authentication configuration.
    ///
    /// In dev mode the configured access token is used as-is and never
    /// refreshed. Otherwise the refresh-token flow runs before the first request.
    pub fn auth_config(&self, dev_mode: bool) -> Result<AuthConfig> {
        if dev_mode {
            let token = self
                .access_token
                .clone()
                .filter(|t| !t.is_empty())
                .ok_or_else(|| Error::missing_field("access_token"))?;
            return Ok(AuthConfig::Bearer { token });
        }

        let field = |value: &Option<String>, name: &str| {
            value
                .clone()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::missing_field(name))
        };

        Ok(AuthConfig::Oauth2Refresh {
            token_url: format!("{}/auth/token", self.base_url()),
            client_id: field(&self.client_id, "client_id")?,
            client_secret: field(&self.client_secret, "client_secret")?,
            refresh_token: field(&self.refresh_token, "refresh_token")?,
        })
    }
}
