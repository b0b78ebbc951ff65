//! Out-of-band delivery of reset codes and registration notices.
//!
//! Delivery is fire-and-report: callers decide whether a failure matters.
//! The reset flow swallows delivery failures so that its response never
//! depends on whether a message went out.

use async_trait::async_trait;
use thiserror::Error;

pub mod http;
pub mod log;

pub use self::http::{HttpNotifier, RetryPolicy};
pub use self::log::LogNotifier;

/// Notification delivery errors
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Connection, timeout, or other transport failure
    #[error("Notification transport error: {0}")]
    Transport(String),

    /// Notification service answered with a non-success status
    #[error("Notification service returned status {0}")]
    Status(u16),
}

impl NotifyError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            NotifyError::Transport(_) => true,
            NotifyError::Status(code) => *code >= 500,
        }
    }
}

/// Result type for notification delivery
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Outbound message channel to users
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a password reset code to `email`
    async fn send_password_reset_code(&self, email: &str, code: &str) -> NotifyResult<()>;

    /// Announce a new registration for `email`
    async fn send_registration(&self, email: &str, username: &str) -> NotifyResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(NotifyError::Transport("reset".to_string()).is_transient());
        assert!(NotifyError::Status(503).is_transient());
        assert!(!NotifyError::Status(400).is_transient());
        assert!(!NotifyError::Status(404).is_transient());
    }
}
