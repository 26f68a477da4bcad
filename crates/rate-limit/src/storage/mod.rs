//! Storage backends for rate limiting.

use std::time::Duration;

mod memory;

pub use memory::InMemoryStorage;

/// Result type for rate limit checks.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitResult {
    /// Whether the request is allowed.
    pub allowed: bool,
    /// Time to wait before retrying if not allowed.
    pub retry_after: Option<Duration>,
}

/// Trait for rate limit storage backends.
#[allow(async_fn_in_trait)]
pub trait RateLimitStorage: Send + Sync {
    /// Check and consume one request for the given key.
    async fn check_and_consume(&self, key: &str, limit: u32, duration: Duration)
    -> Result<RateLimitResult, StorageError>;
}

/// Errors that can occur in storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The quota cannot be represented, e.g. a zero limit or window.
    #[error("Invalid quota: {0}")]
    InvalidQuota(String),
}
