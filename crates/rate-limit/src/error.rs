//! Error types for rate limiting.

use crate::storage::StorageError;
use std::time::Duration;

/// Errors that can occur during rate limiting.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Global rate limit exceeded.
    #[error("too many requests across all clients")]
    GlobalLimitExceeded {
        /// Time to wait before retrying.
        retry_after: Duration,
    },

    /// IP-specific rate limit exceeded.
    #[error("too many requests from {ip}")]
    IpLimitExceeded {
        /// The client address that ran out of quota.
        ip: std::net::IpAddr,
        /// Time to wait before retrying.
        retry_after: Duration,
    },

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl RateLimitError {
    /// Get the retry-after duration if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::GlobalLimitExceeded { retry_after } => Some(*retry_after),
            Self::IpLimitExceeded { retry_after, .. } => Some(*retry_after),
            Self::Storage(_) => None,
        }
    }
}
