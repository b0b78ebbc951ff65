//! Request / validate / confirm protocol for password resets.

use super::{
    challenge::{PasswordResetChallenge, challenge_key},
    errors::{ResetError, ResetResult},
};
use crate::{
    auth::{AuthError, PasswordHasher, PasswordPolicy, validation::normalize_email},
    cache::KeyValueCache,
    db::UserRepository,
    notify::Notifier,
};
use chrono::Utc;
use std::{sync::Arc, time::Duration};

/// Reset challenge lifetime, attempt cap and delivery budget
#[derive(Debug, Clone, Copy)]
pub struct ResetConfig {
    pub code_ttl: Duration,
    pub max_attempts: u32,
    /// Upper bound on one detached code delivery, retries included
    pub delivery_timeout: Duration,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            code_ttl: Duration::from_secs(15 * 60),
            max_attempts: 5,
            delivery_timeout: Duration::from_secs(30),
        }
    }
}

/// What [`PasswordResetFlow::request_reset`] did
///
/// Callers must answer both variants identically; the distinction exists so
/// the outer layer can record a security event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetRequestOutcome {
    /// A challenge was stored and its delivery started
    Issued,
    /// No account has this email; nothing was stored or sent
    UnknownAccount,
}

/// Password reset state machine
///
/// Challenges live in the [`KeyValueCache`] under `password_reset:<email>`.
/// Concurrent validations for one email may both read the same attempt count;
/// the cap can then be under-counted by one, which the expiry bounds.
pub struct PasswordResetFlow {
    users: Arc<dyn UserRepository>,
    cache: Arc<dyn KeyValueCache>,
    notifier: Arc<dyn Notifier>,
    hasher: PasswordHasher,
    policy: PasswordPolicy,
    config: ResetConfig,
}

impl PasswordResetFlow {
    pub fn new(
        users: Arc<dyn UserRepository>,
        cache: Arc<dyn KeyValueCache>,
        notifier: Arc<dyn Notifier>,
        hasher: PasswordHasher,
        config: ResetConfig,
    ) -> Self {
        Self {
            users,
            cache,
            notifier,
            hasher,
            policy: PasswordPolicy::default(),
            config,
        }
    }

    pub fn config(&self) -> ResetConfig {
        self.config
    }

    /// Start a reset for `email`
    ///
    /// Succeeds whether or not the account exists. For an existing account a
    /// new challenge replaces any pending one and the code is handed to the
    /// notifier on a detached task bounded by
    /// [`ResetConfig::delivery_timeout`], so both outcomes return after the
    /// same work. Delivery failures are logged, not returned.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// * `ResetError::Cache` - Challenge could not be stored
    /// * `ResetError::Auth` - User lookup failed for a reason other than absence
    pub async fn request_reset(&self, email: &str) -> ResetResult<ResetRequestOutcome> {
        let email = normalize_email(email);

        match self.users.get_user_by_email(&email).await {
            Ok(_) => {}
            Err(AuthError::UserNotFound) => return Ok(ResetRequestOutcome::UnknownAccount),
            Err(e) => return Err(e.into()),
        }

        let ttl = chrono::Duration::from_std(self.config.code_ttl)
            .unwrap_or_else(|_| chrono::Duration::minutes(15));
        let challenge = PasswordResetChallenge::issue(ttl);
        self.save(&email, &challenge, self.config.code_ttl).await?;

        self.spawn_delivery(email, challenge.code);
        Ok(ResetRequestOutcome::Issued)
    }

    fn spawn_delivery(&self, email: String, code: String) {
        let notifier = Arc::clone(&self.notifier);
        let budget = self.config.delivery_timeout;

        tokio::spawn(async move {
            match tokio::time::timeout(budget, notifier.send_password_reset_code(&email, &code)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::error!("Password reset code delivery failed: {}", e),
                Err(_) => log::error!("Password reset code delivery timed out after {:?}", budget),
            }
        });
    }

    /// Check `code` against the pending challenge, consuming one attempt
    ///
    /// A matching code leaves the challenge in place for [`Self::confirm_reset`].
    ///
    /// # Errors
    ///
    /// * `ResetError::ExpiredChallenge` - No challenge, or it expired
    /// * `ResetError::TooManyAttempts` - Cap already reached; nothing is consumed
    /// * `ResetError::InvalidCode` - Wrong code; the attempt is recorded
    pub async fn validate_code(&self, email: &str, code: &str) -> ResetResult<()> {
        let email = normalize_email(email);
        let key = challenge_key(&email);
        let now = Utc::now();

        let Some(raw) = self.cache.get(&key).await? else {
            return Err(ResetError::ExpiredChallenge);
        };
        let mut challenge: PasswordResetChallenge =
            serde_json::from_str(&raw).map_err(crate::cache::CacheError::from)?;

        let Some(remaining) = challenge.remaining_ttl(now) else {
            return Err(ResetError::ExpiredChallenge);
        };

        if challenge.attempts >= self.config.max_attempts {
            log::warn!("Password reset attempt cap reached");
            return Err(ResetError::TooManyAttempts);
        }

        challenge.attempts += 1;
        self.save(&email, &challenge, remaining).await?;

        if challenge.matches(code) {
            Ok(())
        } else {
            Err(ResetError::InvalidCode)
        }
    }

    /// Consume a valid code, then set the new password
    ///
    /// The challenge is deleted before the password is written, so a code can
    /// change the password at most once. If the write then fails the code is
    /// already spent and a new reset must be requested.
    ///
    /// # Errors
    ///
    /// * `ResetError::WeakPassword` - Checked before the code, consumes no attempt
    /// * Any error from [`Self::validate_code`], unchanged
    /// * `ResetError::Cache` - Challenge could not be deleted; password unchanged
    /// * `ResetError::UserNotFound` - Account removed since the request
    pub async fn confirm_reset(&self, email: &str, code: &str, new_password: &str) -> ResetResult<()> {
        self.policy.validate(new_password)?;
        self.validate_code(email, code).await?;

        let email = normalize_email(email);
        self.cache.delete(&challenge_key(&email)).await?;

        let password_hash = self.hasher.hash_async(new_password.to_string()).await?;
        let mut user = self.users.get_user_by_email(&email).await?;
        user.password_hash = password_hash;
        self.users.update_user(&user).await?;

        log::info!("Password reset completed for user {}", user.id);
        Ok(())
    }

    async fn save(&self, email: &str, challenge: &PasswordResetChallenge, ttl: Duration) -> ResetResult<()> {
        let json = serde_json::to_string(challenge).map_err(crate::cache::CacheError::from)?;
        self.cache
            .set_with_ttl(&challenge_key(email), &json, ttl)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::NewUser,
        cache::{CacheError, CacheResult, MemoryCache},
        db::MemoryUserRepository,
        notify::{NotifyError, NotifyResult},
    };
    use async_trait::async_trait;
    use tokio::{sync::Mutex, time::Instant};

    #[derive(Default)]
    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send_password_reset_code(&self, _email: &str, _code: &str) -> NotifyResult<()> {
            Err(NotifyError::Status(503))
        }

        async fn send_registration(&self, _email: &str, _username: &str) -> NotifyResult<()> {
            Err(NotifyError::Status(503))
        }
    }

    #[derive(Default)]
    struct CapturingNotifier {
        codes: Mutex<Vec<(String, String)>>,
        delay: Duration,
    }

    impl CapturingNotifier {
        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Self::default()
            }
        }

        /// Wait for the detached delivery task to hand over a code
        async fn delivered_code(&self) -> String {
            for _ in 0..200 {
                if let Some((_, code)) = self.codes.lock().await.last() {
                    return code.clone();
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            panic!("no reset code was delivered");
        }
    }

    /// Memory cache whose deletes always fail
    #[derive(Default)]
    struct StickyCache {
        inner: MemoryCache,
    }

    #[async_trait]
    impl KeyValueCache for StickyCache {
        async fn get(&self, key: &str) -> CacheResult<Option<String>> {
            self.inner.get(key).await
        }

        async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
            self.inner.set_with_ttl(key, value, ttl).await
        }

        async fn delete(&self, _key: &str) -> CacheResult<()> {
            Err(CacheError::Backend("down".to_string()))
        }
    }

    #[async_trait]
    impl Notifier for CapturingNotifier {
        async fn send_password_reset_code(&self, email: &str, code: &str) -> NotifyResult<()> {
            tokio::time::sleep(self.delay).await;
            self.codes.lock().await.push((email.to_string(), code.to_string()));
            Ok(())
        }

        async fn send_registration(&self, _email: &str, _username: &str) -> NotifyResult<()> {
            Ok(())
        }
    }

    async fn setup(notifier: Arc<dyn Notifier>) -> (PasswordResetFlow, Arc<MemoryCache>) {
        let users = Arc::new(MemoryUserRepository::new());
        users
            .create_user(&NewUser {
                username: "bob".to_string(),
                email: "bob@example.com".to_string(),
                password_hash: "unused".to_string(),
            })
            .await
            .unwrap();
        let cache = Arc::new(MemoryCache::new());
        let flow = PasswordResetFlow::new(
            users,
            cache.clone(),
            notifier,
            PasswordHasher::default(),
            ResetConfig::default(),
        );
        (flow, cache)
    }

    async fn stored(cache: &MemoryCache) -> PasswordResetChallenge {
        let raw = cache.get(&challenge_key("bob@example.com")).await.unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_email_succeeds_silently() {
        let notifier = Arc::new(CapturingNotifier::default());
        let (flow, cache) = setup(notifier.clone()).await;

        let outcome = flow.request_reset("nobody@example.com").await.unwrap();
        assert_eq!(outcome, ResetRequestOutcome::UnknownAccount);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(notifier.codes.lock().await.is_empty());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_request_stores_fresh_challenge() {
        let notifier = Arc::new(CapturingNotifier::default());
        let (flow, cache) = setup(notifier.clone()).await;

        let outcome = flow.request_reset("Bob@Example.com").await.unwrap();
        assert_eq!(outcome, ResetRequestOutcome::Issued);
        let challenge = stored(&cache).await;
        assert_eq!(challenge.attempts, 0);
        assert_eq!(notifier.delivered_code().await, challenge.code);
    }

    #[tokio::test]
    async fn test_slow_delivery_does_not_delay_request() {
        let notifier = Arc::new(CapturingNotifier::slow(Duration::from_millis(300)));
        let (flow, _) = setup(notifier.clone()).await;

        let started = Instant::now();
        flow.request_reset("nobody@example.com").await.unwrap();
        let unknown = started.elapsed();

        let started = Instant::now();
        flow.request_reset("bob@example.com").await.unwrap();
        let known = started.elapsed();

        assert!(unknown < Duration::from_millis(100), "unknown took {unknown:?}");
        assert!(known < Duration::from_millis(100), "known took {known:?}");

        notifier.delivered_code().await;
    }

    #[tokio::test]
    async fn test_stuck_delivery_is_abandoned() {
        let notifier = Arc::new(CapturingNotifier::slow(Duration::from_secs(60)));
        let users = Arc::new(MemoryUserRepository::new());
        users
            .create_user(&NewUser {
                username: "bob".to_string(),
                email: "bob@example.com".to_string(),
                password_hash: "unused".to_string(),
            })
            .await
            .unwrap();
        let flow = PasswordResetFlow::new(
            users,
            Arc::new(MemoryCache::new()),
            notifier.clone(),
            PasswordHasher::default(),
            ResetConfig {
                delivery_timeout: Duration::from_millis(20),
                ..ResetConfig::default()
            },
        );

        flow.request_reset("bob@example.com").await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(notifier.codes.lock().await.is_empty());
        assert_eq!(Arc::strong_count(&notifier), 2);
    }

    #[tokio::test]
    async fn test_undeletable_challenge_leaves_password_unchanged() {
        let users = Arc::new(MemoryUserRepository::new());
        users
            .create_user(&NewUser {
                username: "bob".to_string(),
                email: "bob@example.com".to_string(),
                password_hash: "original".to_string(),
            })
            .await
            .unwrap();
        let notifier = Arc::new(CapturingNotifier::default());
        let flow = PasswordResetFlow::new(
            users.clone(),
            Arc::new(StickyCache::default()),
            notifier.clone(),
            PasswordHasher::default(),
            ResetConfig::default(),
        );

        flow.request_reset("bob@example.com").await.unwrap();
        let code = notifier.delivered_code().await;

        for password in ["NewPass2@x", "Attacker9!x"] {
            assert!(matches!(
                flow.confirm_reset("bob@example.com", &code, password).await,
                Err(ResetError::Cache(_))
            ));
        }

        let user = users.get_user_by_email("bob@example.com").await.unwrap();
        assert_eq!(user.password_hash, "original");
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        let (flow, cache) = setup(Arc::new(FailingNotifier)).await;
        flow.request_reset("bob@example.com").await.unwrap();
        assert!(!cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_wrong_code_consumes_attempt() {
        let (flow, cache) = setup(Arc::new(FailingNotifier)).await;
        flow.request_reset("bob@example.com").await.unwrap();
        let code = stored(&cache).await.code;
        let wrong = if code == "000000" { "111111" } else { "000000" };

        assert!(matches!(
            flow.validate_code("bob@example.com", wrong).await,
            Err(ResetError::InvalidCode)
        ));
        assert_eq!(stored(&cache).await.attempts, 1);

        flow.validate_code("bob@example.com", &code).await.unwrap();
        assert_eq!(stored(&cache).await.attempts, 2);
    }

    #[tokio::test]
    async fn test_cap_does_not_mutate() {
        let (flow, cache) = setup(Arc::new(FailingNotifier)).await;
        flow.request_reset("bob@example.com").await.unwrap();
        let mut challenge = stored(&cache).await;
        challenge.attempts = 5;
        cache
            .set_with_ttl(
                &challenge_key("bob@example.com"),
                &serde_json::to_string(&challenge).unwrap(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        for _ in 0..3 {
            assert!(matches!(
                flow.validate_code("bob@example.com", &challenge.code).await,
                Err(ResetError::TooManyAttempts)
            ));
        }
        assert_eq!(stored(&cache).await.attempts, 5);
    }

    #[tokio::test]
    async fn test_missing_challenge_is_expired() {
        let (flow, _) = setup(Arc::new(FailingNotifier)).await;
        assert!(matches!(
            flow.validate_code("bob@example.com", "123456").await,
            Err(ResetError::ExpiredChallenge)
        ));
    }

    #[tokio::test]
    async fn test_stale_challenge_is_expired() {
        let (flow, cache) = setup(Arc::new(FailingNotifier)).await;
        let stale = PasswordResetChallenge {
            code: "123456".to_string(),
            attempts: 0,
            expires_at: Utc::now() - chrono::Duration::seconds(1),
        };
        cache
            .set_with_ttl(
                &challenge_key("bob@example.com"),
                &serde_json::to_string(&stale).unwrap(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        assert!(matches!(
            flow.validate_code("bob@example.com", "123456").await,
            Err(ResetError::ExpiredChallenge)
        ));
    }

    #[tokio::test]
    async fn test_weak_password_checked_before_code() {
        let (flow, cache) = setup(Arc::new(FailingNotifier)).await;
        flow.request_reset("bob@example.com").await.unwrap();
        let code = stored(&cache).await.code;

        assert!(matches!(
            flow.confirm_reset("bob@example.com", &code, "short1!").await,
            Err(ResetError::WeakPassword(_))
        ));
        assert_eq!(stored(&cache).await.attempts, 0);
    }
}
