//! Password reset error types.

use crate::{auth::AuthError, cache::CacheError};
use thiserror::Error;

/// Password reset errors
#[derive(Debug, Error)]
pub enum ResetError {
    /// No live challenge for this email
    #[error("Reset code expired or not requested")]
    ExpiredChallenge,

    /// Attempt cap reached for the current challenge
    #[error("Too many attempts")]
    TooManyAttempts,

    /// Code does not match the current challenge
    #[error("Invalid reset code")]
    InvalidCode,

    /// New password fails the policy
    #[error("Password too weak: {0}")]
    WeakPassword(String),

    /// Account disappeared between request and confirmation
    #[error("User not found")]
    UserNotFound,

    /// Hashing or storage failure
    #[error(transparent)]
    Auth(AuthError),

    /// Challenge store failure
    #[error("Challenge store error: {0}")]
    Cache(#[from] CacheError),
}

impl From<AuthError> for ResetError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::WeakPassword(reason) => ResetError::WeakPassword(reason),
            AuthError::UserNotFound => ResetError::UserNotFound,
            other => ResetError::Auth(other),
        }
    }
}

impl ResetError {
    /// Get a client-safe error message
    ///
    /// Challenge errors are specific since the caller already proved control
    /// of the mailbox. Infrastructure failures stay generic.
    pub fn client_message(&self) -> String {
        match self {
            ResetError::ExpiredChallenge
            | ResetError::TooManyAttempts
            | ResetError::InvalidCode
            | ResetError::WeakPassword(_) => self.to_string(),
            ResetError::UserNotFound => ResetError::InvalidCode.to_string(),
            ResetError::Auth(_) | ResetError::Cache(_) => "Internal server error".to_string(),
        }
    }
}

/// Result type for password reset operations
pub type ResetResult<T> = Result<T, ResetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_are_lifted() {
        assert!(matches!(
            ResetError::from(AuthError::WeakPassword("x".to_string())),
            ResetError::WeakPassword(_)
        ));
        assert!(matches!(
            ResetError::from(AuthError::HashingError),
            ResetError::Auth(AuthError::HashingError)
        ));
    }

    #[test]
    fn test_infrastructure_detail_hidden() {
        let err = ResetError::Cache(CacheError::Backend("redis://secret-host".to_string()));
        assert_eq!(err.client_message(), "Internal server error");
    }
}
