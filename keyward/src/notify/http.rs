//! HTTP client for the external notification service.
//!
//! Each message is a JSON `POST`. Transient failures (transport errors and
//! 5xx answers) are retried with linear backoff up to
//! [`RetryPolicy::max_attempts`]; 4xx answers fail immediately. Dropping the
//! returned future aborts both the in-flight request and any pending backoff.

use super::{Notifier, NotifyError, NotifyResult};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Bounded retry with linear backoff
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Delay before retry `n` is `backoff * n`
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

#[derive(Debug, Serialize)]
struct ResetCodeMessage<'a> {
    email: &'a str,
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct RegistrationMessage<'a> {
    email: &'a str,
    username: &'a str,
}

/// [`Notifier`] that posts to `{base_url}/api/password-reset` and
/// `{base_url}/api/registration`
#[derive(Clone)]
pub struct HttpNotifier {
    base_url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpNotifier {
    /// Create a notifier
    ///
    /// # Arguments
    ///
    /// * `base_url` - Notification service root, without trailing slash
    /// * `request_timeout` - Per-attempt timeout
    /// * `retry` - Retry policy for transient failures
    ///
    /// # Errors
    ///
    /// * `NotifyError::Transport` - The HTTP client could not be built
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
        retry: RetryPolicy,
    ) -> NotifyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            retry,
        })
    }

    async fn post_once<T: Serialize + Sync>(&self, url: &str, body: &T) -> NotifyResult<()> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Status(status.as_u16()))
        }
    }

    async fn post_with_retry<T: Serialize + Sync>(&self, path: &str, body: &T) -> NotifyResult<()> {
        let url = format!("{}{}", self.base_url, path);
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match self.post_once(&url, body).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_after(attempt);
                    log::warn!(
                        "Notification to {} failed (attempt {}/{}): {}; retrying in {:?}",
                        path,
                        attempt,
                        max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    log::error!("Notification to {} failed after {} attempt(s): {}", path, attempt, e);
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send_password_reset_code(&self, email: &str, code: &str) -> NotifyResult<()> {
        self.post_with_retry("/api/password-reset", &ResetCodeMessage { email, code })
            .await
    }

    async fn send_registration(&self, email: &str, username: &str) -> NotifyResult<()> {
        self.post_with_retry("/api/registration", &RegistrationMessage { email, username })
            .await
    }
}
