//! In-memory rate limit storage using a sliding window log.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::{RateLimitResult, RateLimitStorage, StorageError};

/// A rate limit key together with the quota it is checked against.
type WindowKey = (String, u32, Duration);

/// Number of tracked windows after which idle ones are pruned.
const RETAIN_THRESHOLD: usize = 10_000;

/// In-memory rate limit storage implementation.
///
/// Every key keeps the admission times of its requests within the last
/// window. A request is admitted while fewer than `limit` requests were
/// admitted in the preceding `interval`, so no window of that length ever
/// holds more than `limit` requests. The check and the update happen under
/// the shard lock of the entry.
#[derive(Default)]
pub struct InMemoryStorage {
    windows: DashMap<WindowKey, VecDeque<Instant>>,
}

impl InMemoryStorage {
    /// Create a new in-memory storage instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop windows without a request in their last interval.
    fn prune_idle(&self, now: Instant) {
        self.windows.retain(|(_, _, interval), admitted| {
            admitted
                .back()
                .is_some_and(|last| now.saturating_duration_since(*last) < *interval)
        });
    }
}

impl RateLimitStorage for InMemoryStorage {
    async fn check_and_consume(
        &self,
        key: &str,
        limit: u32,
        interval: Duration,
    ) -> Result<RateLimitResult, StorageError> {
        log::debug!("Checking rate limit for key '{key}': {limit} requests allowed per {interval:?}");

        if limit == 0 {
            return Err(StorageError::InvalidQuota("limit must be non-zero".into()));
        }

        if interval.is_zero() {
            return Err(StorageError::InvalidQuota("duration must be non-zero".into()));
        }

        let now = Instant::now();

        if self.windows.len() > RETAIN_THRESHOLD {
            self.prune_idle(now);
        }

        let mut admitted = self.windows.entry((key.to_string(), limit, interval)).or_default();

        while admitted
            .front()
            .is_some_and(|first| now.saturating_duration_since(*first) >= interval)
        {
            admitted.pop_front();
        }

        if admitted.len() < limit as usize {
            admitted.push_back(now);
            log::debug!("Request allowed for key '{key}' - within rate limit");

            return Ok(RateLimitResult {
                allowed: true,
                retry_after: None,
            });
        }

        // The oldest admission leaving the window frees the next slot.
        let oldest = admitted.front().copied().unwrap_or(now);
        let retry_after = (oldest + interval).saturating_duration_since(now);

        log::debug!("Request blocked for key '{key}' - rate limit exceeded, retry after {retry_after:?}");

        Ok(RateLimitResult {
            allowed: false,
            retry_after: Some(retry_after),
        })
    }
}
