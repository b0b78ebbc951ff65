//! Authentication error types.

use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token `exp` is in the past
    #[error("Token expired")]
    TokenExpired,

    /// Access token presented where a refresh token is required (or vice versa)
    #[error("Wrong token type")]
    WrongTokenType,

    /// `sub`/`email`/`exp` missing or not of the expected type
    #[error("Malformed token claims")]
    MalformedClaims,

    /// Bad signature, unexpected algorithm, or unparseable token
    #[error("Invalid token")]
    InvalidToken,

    /// Signer misconfiguration while minting a token
    #[error("Token encoding failed: {0}")]
    EncodingError(String),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingError,

    /// Password did not match the stored hash (or the hash was unusable)
    #[error("Password verification failed")]
    VerificationFailed,

    /// Unknown email or wrong password at login
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// User not found
    #[error("User not found")]
    UserNotFound,

    /// Email already registered
    #[error("Email already exists")]
    EmailTaken,

    /// Invalid email format
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Invalid username format
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// Password too weak
    #[error("Password too weak: {0}")]
    WeakPassword(String),

    /// Caller may not act on the requested resource
    #[error("Forbidden")]
    Forbidden,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database call exceeded its deadline
    #[error("Database operation timed out")]
    DatabaseTimeout,

    /// Cache error from the user snapshot layer
    #[error("Cache error: {0}")]
    Cache(#[from] crate::cache::CacheError),
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Every token failure collapses to one message, and storage failures are
    /// reported as a generic internal error.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::TokenExpired
            | AuthError::WrongTokenType
            | AuthError::MalformedClaims
            | AuthError::InvalidToken => "Authentication failed".to_string(),
            AuthError::InvalidCredentials
            | AuthError::VerificationFailed
            | AuthError::UserNotFound => "Invalid credentials".to_string(),
            AuthError::EncodingError(_)
            | AuthError::HashingError
            | AuthError::Database(_)
            | AuthError::DatabaseTimeout
            | AuthError::Cache(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether this error means the presented token must be rejected (401)
    pub fn is_token_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::TokenExpired
                | AuthError::WrongTokenType
                | AuthError::MalformedClaims
                | AuthError::InvalidToken
        )
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
