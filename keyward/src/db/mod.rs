//! Database module providing PostgreSQL connection pooling and user storage.
//!
//! This module manages the database connection pool using sqlx and exposes
//! the [`UserRepository`] seam with PostgreSQL, in-memory, and cache-aside
//! implementations.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::auth::AuthResult;
use timeouts::{LONG_OPERATION_TIMEOUT, with_timeout};

pub mod cached;
pub mod config;
pub mod memory;
pub mod repository;
pub mod timeouts;

pub use cached::CachedUserRepository;
pub use config::DatabaseConfig;
pub use memory::MemoryUserRepository;
pub use repository::{PgUserRepository, UserRepository};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Arguments
    ///
    /// * `config` - Database configuration
    ///
    /// # Returns
    ///
    /// * `Result<Database, sqlx::Error>` - Database instance or error
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use keyward::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = DatabaseConfig::with_url("postgres://postgres@localhost/keyward");
    ///     let db = Database::new(&config).await?;
    ///     db.migrate().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded schema migrations
    ///
    /// # Errors
    ///
    /// * `AuthError::Database` - A migration failed
    /// * `AuthError::DatabaseTimeout` - Not finished within [`LONG_OPERATION_TIMEOUT`]
    pub async fn migrate(&self) -> AuthResult<()> {
        with_timeout(LONG_OPERATION_TIMEOUT, async {
            sqlx::migrate!("./migrations")
                .run(&self.pool)
                .await
                .map_err(sqlx::Error::from)
        })
        .await
    }

    /// Check if the database connection is healthy
    ///
    /// # Returns
    ///
    /// * `Result<(), sqlx::Error>` - Ok if healthy, error otherwise
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}
