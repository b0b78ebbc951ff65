//! Development notifier that writes messages to the log.

use super::{Notifier, NotifyResult};
use async_trait::async_trait;

/// Logs each message instead of delivering it
///
/// Reset codes appear in the log output, so this is only suitable for local
/// development.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_password_reset_code(&self, email: &str, code: &str) -> NotifyResult<()> {
        log::info!("Password reset code for {}: {}", email, code);
        Ok(())
    }

    async fn send_registration(&self, email: &str, username: &str) -> NotifyResult<()> {
        log::info!("Registration notice for {} ({})", email, username);
        Ok(())
    }
}
