//! TTL-bound key-value storage for ephemeral records (sessions, OAuth state).
//!
//! The store is a cache of resolved state, never a system of record: flushing
//! it only forces users to log in again.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::deadline::DeadlineError;

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use in_memory::InMemoryKeyValueStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisKeyValueStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("key-value store unavailable: {0}")]
    Unavailable(String),

    #[error("key-value store call '{operation}' timed out after {after_ms}ms")]
    Timeout { operation: &'static str, after_ms: u64 },
}

impl DeadlineError for StoreError {
    fn deadline_exceeded(operation: &'static str, after: Duration) -> Self {
        StoreError::Timeout {
            operation,
            after_ms: after.as_millis() as u64,
        }
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Write `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Idempotent.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Remaining lifetime; `None` if the key is absent or has no expiry.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError>;

    /// All live keys starting with `prefix`. O(keyspace).
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Atomic get-and-delete.
    async fn take(&self, key: &str) -> Result<Option<String>, StoreError>;
}
