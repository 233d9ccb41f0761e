//! HTTP client module
//!
//! Provides the authenticated GET used by every stream.
//!
//! # Features
//!
//! - **Automatic Retries**: up to 3 attempts with a constant delay
//! - **Rate Limiting**: optional token bucket rate limiter using governor
//! - **Application Errors**: `{"error": ...}` bodies on 2xx are reported as failures
//! - **Authentication**: Integration with auth module

mod client;
mod rate_limit;

pub use client::{ApiClient, ApiFamily, HttpClient, HttpClientConfig, HttpClientConfigBuilder};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
