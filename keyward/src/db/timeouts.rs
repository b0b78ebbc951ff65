//! Database query timeout helpers
//!
//! Wraps database futures so a stalled connection surfaces as
//! [`AuthError::DatabaseTimeout`] instead of hanging the request.

use crate::auth::{AuthError, AuthResult};
use std::time::Duration;
use tokio::time::timeout;

/// Default timeout for database queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for [`super::Database::migrate`] (30 seconds)
pub const LONG_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Execute a query with timeout
///
/// # Arguments
///
/// * `duration` - Timeout duration
/// * `future` - Async operation to execute
///
/// # Returns
///
/// * `AuthResult<T>` - Result, `AuthError::Database`, or `AuthError::DatabaseTimeout`
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> AuthResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(AuthError::Database(e)),
        Err(_) => {
            log::warn!("Database operation timed out after {:?}", duration);
            Err(AuthError::DatabaseTimeout)
        }
    }
}

/// Execute a query with default timeout (5 seconds)
pub async fn with_default_timeout<F, T>(future: F) -> AuthResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completed_future_passes_through() {
        let result = with_default_timeout(async { Ok::<_, sqlx::Error>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_stalled_future_times_out() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, sqlx::Error>(())
        })
        .await;
        assert!(matches!(result, Err(AuthError::DatabaseTimeout)));
    }

    #[tokio::test]
    async fn test_database_error_preserved() {
        let result =
            with_default_timeout(async { Err::<(), _>(sqlx::Error::RowNotFound) }).await;
        assert!(matches!(result, Err(AuthError::Database(sqlx::Error::RowNotFound))));
    }
}
