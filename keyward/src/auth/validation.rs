//! Input validation for registration and profile changes.

use super::errors::{AuthError, AuthResult};

const MAX_EMAIL_LEN: usize = 254;
const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=50;

/// Canonical form used for storage and lookups
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Validate email shape: `local@domain.tld`, no whitespace
pub fn validate_email(email: &str) -> AuthResult<()> {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return Err(AuthError::InvalidEmail(
            "Email must be between 1 and 254 characters".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(AuthError::InvalidEmail("Email must contain '@'".to_string()));
    };

    let well_formed = !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty());

    if !well_formed {
        return Err(AuthError::InvalidEmail("Email format is invalid".to_string()));
    }

    Ok(())
}

/// Validate username format
pub fn validate_username(username: &str) -> AuthResult<()> {
    if !USERNAME_LEN.contains(&username.chars().count()) {
        return Err(AuthError::InvalidUsername(
            "Username must be 3-50 characters".to_string(),
        ));
    }

    if !username.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(AuthError::InvalidUsername(
            "Username can only contain letters, numbers, and underscores".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Bob@Example.COM "), "bob@example.com");
    }

    #[test]
    fn test_email_shapes() {
        assert!(validate_email("bob@example.com").is_ok());
        assert!(validate_email("first.last@mail.example.org").is_ok());

        for bad in ["", "bob", "@example.com", "bob@", "bob@example", "bob@@example.com", "bo b@example.com", "bob@example..com"] {
            assert!(validate_email(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("bob_42").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"x".repeat(51)).is_err());
        assert!(validate_username("bob smith").is_err());
        assert!(validate_username("bob-smith").is_err());
    }
}
