//! Error types for tap-adroll
//!
//! This module defines the error hierarchy for the whole tap.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use thiserror::Error;

/// The main error type for tap-adroll
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Token refresh failed: {message}")]
    TokenRefresh { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {endpoint}: {body}")]
    HttpStatus {
        status: u16,
        endpoint: String,
        body: String,
    },

    #[error("API error from {endpoint}: {message}")]
    Api { endpoint: String, message: String },

    #[error("Request to {endpoint} timed out after {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    // ============================================================================
    // State Errors
    // ============================================================================
    #[error("State error: {message}")]
    State { message: String },

    #[error("Checkpoint rejected for stream '{stream}': {message}")]
    Checkpoint { stream: String, message: String },

    // ============================================================================
    // Sync Errors
    // ============================================================================
    #[error("Stream '{stream}' not found in catalog")]
    StreamNotFound { stream: String },

    #[error("Sync of stream '{stream}' failed ({context}): {source}")]
    Sync {
        stream: String,
        context: String,
        #[source]
        source: Box<Error>,
    },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, endpoint: impl Into<String>, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            endpoint: endpoint.into(),
            body: body.into(),
        }
    }

    /// Create an application-level API error
    pub fn api(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create a checkpoint error
    pub fn checkpoint(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Checkpoint {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Wrap an error as a fatal failure of one stream
    pub fn sync(stream: impl Into<String>, context: impl Into<String>, source: Error) -> Self {
        Self::Sync {
            stream: stream.into(),
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Whether this error is a configuration problem detected before any network activity
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::Config { .. } | Error::MissingConfigField { .. } | Error::InvalidConfigValue { .. }
        )
    }
}

/// Check if an HTTP status code is retryable
pub(crate) fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Result type alias for tap-adroll
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
