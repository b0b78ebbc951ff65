//! In-memory user store for development and tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::repository::UserRepository;
use crate::auth::{AuthError, AuthResult, NewUser, User, UserId};

#[derive(Default)]
struct Store {
    users: HashMap<UserId, User>,
    next_id: UserId,
}

/// `HashMap`-backed [`UserRepository`]; email uniqueness matches the
/// PostgreSQL unique index
#[derive(Default)]
pub struct MemoryUserRepository {
    store: RwLock<Store>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn len(&self) -> usize {
        self.store.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.users.is_empty()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn get_user_by_email(&self, email: &str) -> AuthResult<User> {
        let store = self.store.read().await;
        store
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(AuthError::UserNotFound)
    }

    async fn get_user_by_id(&self, id: UserId) -> AuthResult<User> {
        let store = self.store.read().await;
        store.users.get(&id).cloned().ok_or(AuthError::UserNotFound)
    }

    async fn create_user(&self, user: &NewUser) -> AuthResult<User> {
        let mut store = self.store.write().await;
        if store.users.values().any(|u| u.email == user.email) {
            return Err(AuthError::EmailTaken);
        }

        store.next_id += 1;
        let now = Utc::now();
        let created = User {
            id: store.next_id,
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            created_at: now,
            updated_at: now,
        };
        store.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_user(&self, user: &User) -> AuthResult<User> {
        let mut store = self.store.write().await;
        if store
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(AuthError::EmailTaken);
        }

        let existing = store.users.get_mut(&user.id).ok_or(AuthError::UserNotFound)?;
        existing.username = user.username.clone();
        existing.email = user.email.clone();
        existing.password_hash = user.password_hash.clone();
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }
}
