//! Access/refresh token lifecycle.

use super::{
    codec::TokenCodec,
    config::AuthConfig,
    errors::AuthResult,
    models::{TokenKind, TokenPair, UserClaims},
};
use chrono::Duration;

/// Issues and validates token pairs
///
/// Holds only the immutable codec and lifetimes, so a single instance can be
/// shared across request handlers without synchronization.
#[derive(Clone)]
pub struct TokenManager {
    codec: TokenCodec,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenManager {
    /// Create a token manager from auth configuration
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            codec: TokenCodec::new(&config.jwt_secret),
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
        }
    }

    /// Access token lifetime
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Refresh token lifetime
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Mint an access token and a refresh token for the same identity
    ///
    /// # Errors
    ///
    /// * `AuthError::EncodingError` - Signer misconfiguration
    pub fn issue_token_pair(&self, claims: &UserClaims) -> AuthResult<TokenPair> {
        let access_token = self.codec.encode(claims, self.access_ttl, TokenKind::Access)?;
        let refresh_token = self
            .codec
            .encode(claims, self.refresh_ttl, TokenKind::Refresh)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Validate an access token
    pub fn validate_access(&self, token: &str) -> AuthResult<UserClaims> {
        self.codec.decode(token, TokenKind::Access)
    }

    /// Validate a refresh token
    pub fn validate_refresh(&self, token: &str) -> AuthResult<UserClaims> {
        self.codec.decode(token, TokenKind::Refresh)
    }

    /// Rotate a session: validate the refresh token and mint a fresh pair
    ///
    /// The presented refresh token is not revoked; it is simply superseded.
    ///
    /// # Errors
    ///
    /// Any error from [`TokenManager::validate_refresh`], or
    /// `AuthError::EncodingError` while minting.
    pub fn refresh_session(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let claims = self.validate_refresh(refresh_token)?;
        self.issue_token_pair(&claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::errors::AuthError;

    fn manager() -> TokenManager {
        TokenManager::new(&AuthConfig::new("test_secret_key_for_jwt_signing_0123456789"))
    }

    fn claims() -> UserClaims {
        UserClaims {
            user_id: "7".to_string(),
            email: "alice@example.com".to_string(),
        }
    }

    #[test]
    fn test_pair_shares_identity() {
        let manager = manager();
        let pair = manager.issue_token_pair(&claims()).unwrap();

        let from_access = manager.validate_access(&pair.access_token).unwrap();
        let from_refresh = manager.validate_refresh(&pair.refresh_token).unwrap();
        assert_eq!(from_access, from_refresh);
        assert_eq!(from_access, claims());
    }

    #[test]
    fn test_refresh_session_mints_usable_pair() {
        let manager = manager();
        let pair = manager.issue_token_pair(&claims()).unwrap();

        let rotated = manager.refresh_session(&pair.refresh_token).unwrap();
        assert_eq!(manager.validate_access(&rotated.access_token).unwrap(), claims());
        assert_eq!(manager.validate_refresh(&rotated.refresh_token).unwrap(), claims());
    }

    #[test]
    fn test_refresh_session_rejects_access_token() {
        let manager = manager();
        let pair = manager.issue_token_pair(&claims()).unwrap();

        assert!(matches!(
            manager.refresh_session(&pair.access_token),
            Err(AuthError::WrongTokenType)
        ));
    }

    #[test]
    fn test_expired_access_token() {
        let config = AuthConfig::new("test_secret_key_for_jwt_signing_0123456789")
            .with_ttls(Duration::seconds(-1), Duration::days(1));
        let manager = TokenManager::new(&config);
        let pair = manager.issue_token_pair(&claims()).unwrap();

        assert!(matches!(
            manager.validate_access(&pair.access_token),
            Err(AuthError::TokenExpired)
        ));
        assert!(manager.refresh_session(&pair.refresh_token).is_ok());
    }
}
