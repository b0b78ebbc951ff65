//! User repository trait and its PostgreSQL implementation.
//!
//! The trait is the seam between the auth flows and storage, so flows can be
//! exercised against [`super::MemoryUserRepository`] in tests.

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::timeouts::with_default_timeout;
use crate::auth::{AuthError, AuthResult, NewUser, User, UserId};

/// Trait for user storage operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by (normalized) email
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - No user has this email
    async fn get_user_by_email(&self, email: &str) -> AuthResult<User>;

    /// Find a user by ID
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - No user has this ID
    async fn get_user_by_id(&self, id: UserId) -> AuthResult<User>;

    /// Insert a user, returning the stored record
    ///
    /// # Errors
    ///
    /// * `AuthError::EmailTaken` - Email already registered
    async fn create_user(&self, user: &NewUser) -> AuthResult<User>;

    /// Persist username, email and password hash of an existing user
    ///
    /// # Errors
    ///
    /// * `AuthError::UserNotFound` - No user has this ID
    /// * `AuthError::EmailTaken` - New email belongs to another user
    async fn update_user(&self, user: &User) -> AuthResult<User>;
}

/// PostgreSQL implementation of UserRepository
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at";

fn row_to_user(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn map_write_error(err: AuthError) -> AuthError {
    match err {
        AuthError::Database(sqlx::Error::Database(ref db)) if db.is_unique_violation() => {
            AuthError::EmailTaken
        }
        other => other,
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_user_by_email(&self, email: &str) -> AuthResult<User> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = with_default_timeout(
            sqlx::query(&query)
                .bind(email)
                .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(row_to_user).ok_or(AuthError::UserNotFound)
    }

    async fn get_user_by_id(&self, id: UserId) -> AuthResult<User> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = with_default_timeout(sqlx::query(&query).bind(id).fetch_optional(&self.pool))
            .await?;

        row.as_ref().map(row_to_user).ok_or(AuthError::UserNotFound)
    }

    async fn create_user(&self, user: &NewUser) -> AuthResult<User> {
        let query = format!(
            "INSERT INTO users (username, email, password_hash)
             VALUES ($1, $2, $3)
             RETURNING {USER_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&query)
                .bind(&user.username)
                .bind(&user.email)
                .bind(&user.password_hash)
                .fetch_one(&self.pool),
        )
        .await
        .map_err(map_write_error)?;

        Ok(row_to_user(&row))
    }

    async fn update_user(&self, user: &User) -> AuthResult<User> {
        let query = format!(
            "UPDATE users
             SET username = $2, email = $3, password_hash = $4, updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&query)
                .bind(user.id)
                .bind(&user.username)
                .bind(&user.email)
                .bind(&user.password_hash)
                .fetch_optional(&self.pool),
        )
        .await
        .map_err(map_write_error)?;

        row.as_ref().map(row_to_user).ok_or(AuthError::UserNotFound)
    }
}
