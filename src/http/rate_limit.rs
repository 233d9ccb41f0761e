//! Client-side request pacing
//!
//! AdRoll throttles per account, so the tap can cap its own request rate
//! with `requests_per_second`. Pacing is a token bucket from governor.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

/// Request rate cap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Sustained requests per second
    pub requests_per_second: u32,
    /// Requests allowed back to back before pacing starts
    pub burst_size: u32,
}

impl RateLimiterConfig {
    /// Explicit rate and burst
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            requests_per_second,
            burst_size,
        }
    }

    /// Rate cap whose burst equals one second's worth of requests
    pub fn per_second(requests_per_second: u32) -> Self {
        Self::new(requests_per_second, requests_per_second)
    }

    fn quota(&self) -> Quota {
        // Zero would mean "never", read it as the slowest valid rate
        let rps = NonZeroU32::new(self.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(self.burst_size).unwrap_or(rps);
        Quota::per_second(rps).allow_burst(burst)
    }
}

/// Token bucket shared by every request of a client
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
    config: RateLimiterConfig,
}

impl RateLimiter {
    /// Create a limiter for `config`
    pub fn new(config: &RateLimiterConfig) -> Self {
        Self {
            limiter: Arc::new(Governor::direct(config.quota())),
            config: config.clone(),
        }
    }

    /// Wait for a permit
    pub async fn wait(&self) {
        if self.limiter.check().is_ok() {
            return;
        }
        debug!(
            requests_per_second = self.config.requests_per_second,
            "Request rate cap reached, pacing"
        );
        self.limiter.until_ready().await;
    }

    /// Take a permit if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Configured cap
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
