//! Reset challenge record and code generation.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Number of digits in a reset code
pub const CODE_LENGTH: usize = 6;

/// Cache key namespace for reset challenges
pub const CHALLENGE_KEY_PREFIX: &str = "password_reset:";

/// Cache key holding the challenge for `email`
pub fn challenge_key(email: &str) -> String {
    format!("{CHALLENGE_KEY_PREFIX}{email}")
}

/// Draw a numeric code, each digit uniform over 0-9 from the thread CSPRNG
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// Pending reset challenge, stored as JSON in the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetChallenge {
    pub code: String,
    pub attempts: u32,
    pub expires_at: DateTime<Utc>,
}

impl PasswordResetChallenge {
    /// Fresh challenge with a new code, zero attempts, expiring after `ttl`
    pub fn issue(ttl: Duration) -> Self {
        Self {
            code: generate_code(),
            attempts: 0,
            expires_at: Utc::now() + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, `None` once expired
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        (self.expires_at - now).to_std().ok().filter(|d| !d.is_zero())
    }

    /// Constant-time code comparison
    pub fn matches(&self, candidate: &str) -> bool {
        self.code.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_shape() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_codes_vary() {
        let codes: std::collections::HashSet<_> = (0..50).map(|_| generate_code()).collect();
        assert!(codes.len() > 40);
    }

    #[test]
    fn test_matches() {
        let challenge = PasswordResetChallenge {
            code: "012345".to_string(),
            attempts: 0,
            expires_at: Utc::now() + Duration::minutes(15),
        };
        assert!(challenge.matches("012345"));
        assert!(!challenge.matches("012346"));
        assert!(!challenge.matches("01234"));
        assert!(!challenge.matches(""));
    }

    #[test]
    fn test_expiry_and_remaining_ttl() {
        let now = Utc::now();
        let live = PasswordResetChallenge {
            code: "000000".to_string(),
            attempts: 0,
            expires_at: now + Duration::minutes(15),
        };
        assert!(!live.is_expired(now));
        assert!(live.remaining_ttl(now).is_some());

        let dead = PasswordResetChallenge {
            expires_at: now - Duration::seconds(1),
            ..live
        };
        assert!(dead.is_expired(now));
        assert!(dead.remaining_ttl(now).is_none());
    }

    #[test]
    fn test_key_namespace() {
        assert_eq!(challenge_key("bob@example.com"), "password_reset:bob@example.com");
    }
}
