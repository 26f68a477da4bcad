//! Rate limit manager implementation.

use config::RateLimitConfig;

use crate::error::RateLimitError;
use crate::request::RateLimitRequest;
use crate::storage::{InMemoryStorage, RateLimitStorage};

/// Applies the configured global and per-IP quotas to incoming requests.
pub struct RateLimitManager {
    config: RateLimitConfig,
    storage: InMemoryStorage,
}

impl RateLimitManager {
    /// Create a new rate limit manager backed by in-memory storage.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            storage: InMemoryStorage::new(),
        }
    }

    /// Check if rate limiting is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Check all applicable rate limits for a request.
    ///
    /// The per-IP quota is checked first, so a client over its own quota does
    /// not consume the shared global quota. The first exhausted quota is
    /// returned as the error.
    pub async fn check_request(&self, request: &RateLimitRequest) -> Result<(), RateLimitError> {
        if !self.is_enabled() {
            return Ok(());
        }

        self.check_ip_limit(request).await?;
        self.check_global_limit().await?;

        Ok(())
    }

    async fn check_global_limit(&self) -> Result<(), RateLimitError> {
        let Some(quota) = &self.config.global else {
            return Ok(());
        };

        let result = self
            .storage
            .check_and_consume("global", quota.limit, quota.duration)
            .await?;

        if !result.allowed {
            return Err(RateLimitError::GlobalLimitExceeded {
                retry_after: result.retry_after.unwrap_or_default(),
            });
        }

        Ok(())
    }

    async fn check_ip_limit(&self, request: &RateLimitRequest) -> Result<(), RateLimitError> {
        let Some(ip) = request.ip else {
            log::debug!("No client address available - skipping per-IP rate limit");
            return Ok(());
        };

        let Some(quota) = &self.config.per_ip else {
            return Ok(());
        };

        let key = format!("ip:{ip}");

        let result = self
            .storage
            .check_and_consume(&key, quota.limit, quota.duration)
            .await?;

        if !result.allowed {
            return Err(RateLimitError::IpLimitExceeded {
                ip,
                retry_after: result.retry_after.unwrap_or_default(),
            });
        }

        Ok(())
    }
}
