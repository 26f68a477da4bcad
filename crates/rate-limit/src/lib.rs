//! Rate limiting for the chat gateway.
//!
//! Requests are checked against an optional global quota shared by every
//! client and a per-IP quota. Both are enforced in memory with a sliding
//! window: no window of the configured duration admits more than the limit.

#![deny(missing_docs)]

mod error;
mod manager;
mod request;
mod storage;

pub use error::RateLimitError;
pub use manager::RateLimitManager;
pub use request::{RateLimitRequest, RateLimitRequestBuilder};
pub use storage::{InMemoryStorage, RateLimitResult, RateLimitStorage, StorageError};
