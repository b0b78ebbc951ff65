//! Password hashing and strength rules.

use super::errors::{AuthError, AuthResult};
use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
        rand_core::OsRng,
    },
};

/// Symbols accepted by the password policy's symbol class
pub const PASSWORD_SYMBOLS: &str = "!@#$%^&*()-_+=[]{}|\\:;\"'<>,.?/";

/// Argon2id hasher with an optional server-side pepper
///
/// Hashing is deliberately slow. Async callers should use
/// [`PasswordHasher::hash_async`] and [`PasswordHasher::verify_async`], which
/// move the work onto tokio's blocking pool.
#[derive(Clone, Default)]
pub struct PasswordHasher {
    pepper: String,
}

impl PasswordHasher {
    /// Create a hasher; an empty pepper disables peppering
    pub fn new(pepper: impl Into<String>) -> Self {
        Self {
            pepper: pepper.into(),
        }
    }

    /// Hash a password with Argon2id + pepper
    ///
    /// # Returns
    ///
    /// * `AuthResult<String>` - PHC-formatted hash string
    ///
    /// # Errors
    ///
    /// * `AuthError::HashingError` - Salt generation or hashing failed
    pub fn hash(&self, plaintext: &str) -> AuthResult<String> {
        let peppered = format!("{}{}", plaintext, self.pepper);
        let salt = SaltString::generate(&mut OsRng);

        Ok(Argon2::default()
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingError)?
            .to_string())
    }

    /// Verify a password against a stored hash
    ///
    /// A corrupt hash and a wrong password yield the same error.
    ///
    /// # Errors
    ///
    /// * `AuthError::VerificationFailed` - Mismatch or unusable hash
    pub fn verify(&self, hash: &str, plaintext: &str) -> AuthResult<()> {
        let peppered = format!("{}{}", plaintext, self.pepper);
        let parsed = PasswordHash::new(hash).map_err(|_| AuthError::VerificationFailed)?;

        Argon2::default()
            .verify_password(peppered.as_bytes(), &parsed)
            .map_err(|_| AuthError::VerificationFailed)
    }

    /// [`PasswordHasher::hash`] on the blocking pool
    pub async fn hash_async(&self, plaintext: String) -> AuthResult<String> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|_| AuthError::HashingError)?
    }

    /// [`PasswordHasher::verify`] on the blocking pool
    pub async fn verify_async(&self, hash: String, plaintext: String) -> AuthResult<()> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&hash, &plaintext))
            .await
            .map_err(|_| AuthError::VerificationFailed)?
    }

    /// Spend roughly one verification's worth of work and discard the result
    ///
    /// Used on the unknown-user login path so response timing matches a real
    /// verification.
    pub async fn equalize_timing(&self, plaintext: String) {
        let hasher = self.clone();
        let _ = tokio::task::spawn_blocking(move || hasher.hash(&plaintext)).await;
    }
}

/// Password complexity rules
#[derive(Debug, Clone, Copy)]
pub struct PasswordPolicy {
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { min_length: 8 }
    }
}

impl PasswordPolicy {
    /// Check a candidate password
    ///
    /// Requires the minimum length plus at least one uppercase letter, one
    /// lowercase letter, one digit, and one character from [`PASSWORD_SYMBOLS`].
    ///
    /// # Errors
    ///
    /// * `AuthError::WeakPassword` - A rule is not met
    pub fn validate(&self, password: &str) -> AuthResult<()> {
        if password.chars().count() < self.min_length {
            return Err(AuthError::WeakPassword(format!(
                "Password must be at least {} characters",
                self.min_length
            )));
        }

        let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
        let has_digit = password.chars().any(|c| c.is_ascii_digit());
        let has_symbol = password.chars().any(|c| PASSWORD_SYMBOLS.contains(c));

        if !(has_upper && has_lower && has_digit && has_symbol) {
            return Err(AuthError::WeakPassword(
                "Password must contain an uppercase letter, a lowercase letter, a number and a symbol"
                    .to_string(),
            ));
        }

        Ok(())
    }
}
