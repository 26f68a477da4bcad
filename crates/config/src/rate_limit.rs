//! Rate limiting configuration structures.

use duration_str::deserialize_duration;
use serde::Deserialize;
use std::time::Duration;

/// Throttling applied to the chat completion endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled.
    pub enabled: bool,
    /// Quota shared by every client.
    pub global: Option<RateLimitQuota>,
    /// Quota per client address.
    pub per_ip: Option<RateLimitQuota>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            global: None,
            per_ip: Some(RateLimitQuota::default()),
        }
    }
}

/// Configuration for a rate limit quota.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitQuota {
    /// Maximum number of requests allowed within the duration window.
    pub limit: u32,
    /// Time window for the rate limit.
    #[serde(deserialize_with = "deserialize_duration")]
    pub duration: Duration,
}

impl Default for RateLimitQuota {
    fn default() -> Self {
        Self {
            limit: 60,
            duration: Duration::from_secs(60),
        }
    }
}
