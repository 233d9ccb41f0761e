//! Auth configuration types

use chrono::{DateTime, Duration, Utc};

/// Seconds before the reported expiry at which an access token is renewed
pub const EXPIRY_MARGIN_SECS: i64 = 30;

/// How requests are authenticated
#[derive(Debug, Clone, Default)]
pub enum AuthConfig {
    /// No authentication, for local mock servers
    #[default]
    None,

    /// Static bearer token, never refreshed (dev mode)
    Bearer {
        /// The bearer token
        token: String,
    },

    /// OAuth2 refresh-token grant against the AdRoll token endpoint
    Oauth2Refresh {
        /// Token endpoint URL
        token_url: String,
        /// Client ID
        client_id: String,
        /// Client secret
        client_secret: String,
        /// Refresh token
        refresh_token: String,
    },
}

impl AuthConfig {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            AuthConfig::None => "none",
            AuthConfig::Bearer { .. } => "bearer",
            AuthConfig::Oauth2Refresh { .. } => "oauth2_refresh",
        }
    }
}

/// Access token obtained from the token endpoint
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// Reported expiry, `None` when the endpoint gave no lifetime
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Token without a known lifetime
    pub fn without_expiry(token: String) -> Self {
        Self {
            token,
            expires_at: None,
        }
    }

    /// Token valid for `seconds` from now
    pub fn expires_in(token: String, seconds: i64) -> Self {
        Self {
            token,
            expires_at: Some(Utc::now() + Duration::seconds(seconds)),
        }
    }

    /// Whether the token must be renewed before use at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| now + Duration::seconds(EXPIRY_MARGIN_SECS) >= at)
    }

    /// Whether the token must be renewed before use
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
