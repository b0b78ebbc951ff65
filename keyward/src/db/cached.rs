//! Cache-aside decorator for user lookups by ID.
//!
//! Snapshots are stored as JSON under `user:<id>`. A cache outage degrades to
//! direct repository reads; it never fails the lookup.

use async_trait::async_trait;
use std::{sync::Arc, time::Duration};

use super::repository::UserRepository;
use crate::{
    auth::{AuthResult, NewUser, User, UserId},
    cache::KeyValueCache,
};

/// Key under which a user snapshot is cached
pub fn user_cache_key(id: UserId) -> String {
    format!("user:{id}")
}

/// [`UserRepository`] that serves `get_user_by_id` from a cache when possible
pub struct CachedUserRepository {
    inner: Arc<dyn UserRepository>,
    cache: Arc<dyn KeyValueCache>,
    ttl: Duration,
}

impl CachedUserRepository {
    pub fn new(inner: Arc<dyn UserRepository>, cache: Arc<dyn KeyValueCache>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    async fn cached(&self, id: UserId) -> Option<User> {
        match self.cache.get(&user_cache_key(id)).await {
            Ok(Some(json)) => serde_json::from_str(&json).ok(),
            Ok(None) => None,
            Err(e) => {
                log::warn!("User cache read failed for {}: {}", id, e);
                None
            }
        }
    }

    async fn store(&self, user: &User) {
        let json = match serde_json::to_string(user) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("User snapshot serialization failed: {}", e);
                return;
            }
        };
        if let Err(e) = self
            .cache
            .set_with_ttl(&user_cache_key(user.id), &json, self.ttl)
            .await
        {
            log::warn!("User cache write failed for {}: {}", user.id, e);
        }
    }

    async fn invalidate(&self, id: UserId) {
        if let Err(e) = self.cache.delete(&user_cache_key(id)).await {
            log::warn!("User cache invalidation failed for {}: {}", id, e);
        }
    }
}

#[async_trait]
impl UserRepository for CachedUserRepository {
    async fn get_user_by_email(&self, email: &str) -> AuthResult<User> {
        self.inner.get_user_by_email(email).await
    }

    async fn get_user_by_id(&self, id: UserId) -> AuthResult<User> {
        if let Some(user) = self.cached(id).await {
            return Ok(user);
        }

        let user = self.inner.get_user_by_id(id).await?;
        self.store(&user).await;
        Ok(user)
    }

    async fn create_user(&self, user: &NewUser) -> AuthResult<User> {
        self.inner.create_user(user).await
    }

    async fn update_user(&self, user: &User) -> AuthResult<User> {
        let result = self.inner.update_user(user).await;
        self.invalidate(user.id).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cache::MemoryCache, db::MemoryUserRepository};

    async fn setup() -> (CachedUserRepository, Arc<MemoryCache>, User) {
        let inner = Arc::new(MemoryUserRepository::new());
        let user = inner
            .create_user(&NewUser {
                username: "cached".to_string(),
                email: "cached@example.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        let cache = Arc::new(MemoryCache::new());
        let repo = CachedUserRepository::new(inner, cache.clone(), Duration::from_secs(60));
        (repo, cache, user)
    }

    #[tokio::test]
    async fn test_lookup_populates_cache() {
        let (repo, cache, user) = setup().await;
        assert!(cache.get(&user_cache_key(user.id)).await.unwrap().is_none());

        assert_eq!(repo.get_user_by_id(user.id).await.unwrap(), user);
        assert!(cache.get(&user_cache_key(user.id)).await.unwrap().is_some());
        assert_eq!(repo.get_user_by_id(user.id).await.unwrap(), user);
    }

    #[tokio::test]
    async fn test_update_invalidates_snapshot() {
        let (repo, cache, mut user) = setup().await;
        repo.get_user_by_id(user.id).await.unwrap();

        user.username = "renamed".to_string();
        repo.update_user(&user).await.unwrap();
        assert!(cache.get(&user_cache_key(user.id)).await.unwrap().is_none());
        assert_eq!(repo.get_user_by_id(user.id).await.unwrap().username, "renamed");
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_falls_back_to_store() {
        let (repo, cache, user) = setup().await;
        cache
            .set_with_ttl(&user_cache_key(user.id), "{not json", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(repo.get_user_by_id(user.id).await.unwrap(), user);
    }
}
