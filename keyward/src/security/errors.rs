//! Error types for security module

use std::time::Duration;
use thiserror::Error;

/// Result type for rate limiting operations
pub type RateLimiterResult<T> = Result<T, RateLimitError>;

/// Rate limiting errors
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Rate limit exceeded
    #[error("Rate limit of {limit} exceeded; retry after {retry_after:?}")]
    Exceeded { limit: usize, retry_after: Duration },
}

impl RateLimitError {
    /// Get a client-safe error message
    pub fn client_message(&self) -> String {
        match self {
            RateLimitError::Exceeded { .. } => "Too many requests".to_string(),
        }
    }

    /// Whole seconds a client should wait, rounded up and at least 1
    pub fn retry_after_secs(&self) -> u64 {
        match self {
            RateLimitError::Exceeded { retry_after, .. } => {
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                secs.max(1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_rounds_up() {
        let err = RateLimitError::Exceeded {
            limit: 5,
            retry_after: Duration::from_millis(1200),
        };
        assert_eq!(err.retry_after_secs(), 2);
        assert_eq!(err.client_message(), "Too many requests");
    }
}
