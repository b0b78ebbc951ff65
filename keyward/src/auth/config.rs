//! Token and hashing configuration.

use chrono::Duration;
use std::fmt;

/// Secrets and lifetimes shared by the token and password layers
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC signing secret for JWTs
    pub jwt_secret: String,
    /// Server-side pepper appended before hashing; empty disables it
    pub password_pepper: String,
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,
}

impl AuthConfig {
    /// Config with the standard 15 minute / 7 day lifetimes
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            password_pepper: String::new(),
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(7),
        }
    }

    pub fn with_pepper(mut self, pepper: impl Into<String>) -> Self {
        self.password_pepper = pepper.into();
        self
    }

    pub fn with_ttls(mut self, access: Duration, refresh: Duration) -> Self {
        self.access_token_ttl = access;
        self.refresh_token_ttl = refresh;
        self
    }
}

// Secrets stay out of logs.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("password_pepper", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let config = AuthConfig::new("super-secret-signing-key").with_pepper("pepper-value");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("pepper-value"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn test_default_lifetimes() {
        let config = AuthConfig::new("k");
        assert_eq!(config.access_token_ttl, Duration::minutes(15));
        assert_eq!(config.refresh_token_ttl, Duration::days(7));
    }
}
