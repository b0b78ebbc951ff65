//! Key-value cache with per-entry TTL.
//!
//! Backs password-reset challenges and user snapshots. Two backends are
//! provided: an in-process map for single-instance deployments and tests, and
//! Redis for deployments where the cache must outlive the process.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub mod memory;
pub mod redis;

pub use memory::MemoryCache;
pub use redis::RedisCache;

/// Cache errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backend unreachable or command failed
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// Stored value could not be (de)serialized
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<::redis::RedisError> for CacheError {
    fn from(err: ::redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// String-valued cache with expiring entries
///
/// Keys are namespaced strings such as `password_reset:<email>`. Each
/// operation is atomic per key; there is no cross-key coordination.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Fetch a live entry; `None` when absent or expired
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Insert or overwrite an entry that expires after `ttl`
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Remove an entry; removing a missing key is not an error
    async fn delete(&self, key: &str) -> CacheResult<()>;
}
