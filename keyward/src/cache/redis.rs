//! Redis cache backend.
//!
//! Uses a single multiplexed connection, cloned per command. Entries are
//! written with `SET key value EX seconds`; sub-second TTLs round up to one
//! second since Redis `EX` has second granularity.

use super::{CacheResult, KeyValueCache};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::MultiplexedConnection};
use std::time::Duration;

/// Redis-backed [`KeyValueCache`]
#[derive(Clone)]
pub struct RedisCache {
    connection: MultiplexedConnection,
}

impl RedisCache {
    /// Connect to Redis
    ///
    /// # Arguments
    ///
    /// * `url` - Connection URL (e.g., "redis://localhost:6379")
    ///
    /// # Errors
    ///
    /// * `CacheError::Backend` - Invalid URL or server unreachable
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        log::info!("Connected to Redis cache");
        Ok(Self { connection })
    }

    /// Round-trip a `PING`
    pub async fn health_check(&self) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 { secs + 1 } else { secs.max(1) }
}

#[async_trait]
impl KeyValueCache for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn.set_ex(key, value, ttl_seconds(ttl)).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let _: i64 = conn.del(key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_rounds_up() {
        assert_eq!(ttl_seconds(Duration::from_secs(900)), 900);
        assert_eq!(ttl_seconds(Duration::from_millis(1500)), 2);
        assert_eq!(ttl_seconds(Duration::from_millis(10)), 1);
        assert_eq!(ttl_seconds(Duration::ZERO), 1);
    }

    #[tokio::test]
    #[ignore] // Requires a running Redis server
    async fn test_redis_round_trip() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
        let cache = RedisCache::connect(&url).await.unwrap();
        cache.health_check().await.unwrap();

        cache
            .set_with_ttl("keyward:test", "value", Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(
            cache.get("keyward:test").await.unwrap().as_deref(),
            Some("value")
        );
        cache.delete("keyward:test").await.unwrap();
        assert_eq!(cache.get("keyward:test").await.unwrap(), None);
    }
}
