//! Per-client sliding-window rate limiting.

use super::errors::{RateLimitError, RateLimiterResult};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::{Duration, Instant},
};

/// Rate limit configuration for a route class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests admitted per client within `window`
    pub max_requests: usize,

    /// Sliding window length
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    /// Configuration for login and registration (5 per minute)
    pub fn login() -> Self {
        Self::new(5, Duration::from_secs(60))
    }

    /// Configuration for password reset endpoints (3 per minute)
    pub fn password_reset() -> Self {
        Self::new(3, Duration::from_secs(60))
    }

    /// Configuration for general API traffic (100 per minute)
    pub fn api() -> Self {
        Self::new(100, Duration::from_secs(60))
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request admitted and recorded
    Allowed { remaining: usize },

    /// Request rejected; the oldest in-window request ages out after `retry_after`
    Limited { retry_after: Duration },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Sliding-window limiter keyed by client identifier
///
/// All state lives behind one mutex that is held only for the prune and
/// push of a single client's history. Rejected requests are not recorded,
/// so a client regains access as soon as its in-window traffic ages out.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Example
    ///
    /// ```
    /// use keyward::security::{RateLimitConfig, RateLimiter};
    /// use std::time::Duration;
    ///
    /// let limiter = RateLimiter::new(RateLimitConfig::new(3, Duration::from_secs(1)));
    /// assert!(limiter.allow("10.0.0.1"));
    /// assert!(limiter.allow("10.0.0.1"));
    /// assert!(limiter.allow("10.0.0.1"));
    /// assert!(!limiter.allow("10.0.0.1"));
    /// assert!(limiter.allow("10.0.0.2"));
    /// ```
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Instant>>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check and record a request from `client_id`
    pub fn check(&self, client_id: &str) -> RateLimitResult {
        let now = Instant::now();
        let window = self.config.window;
        let mut windows = self.lock();
        let history = windows.entry(client_id.to_string()).or_default();

        while let Some(ts) = history.front() {
            if now.duration_since(*ts) >= window {
                history.pop_front();
            } else {
                break;
            }
        }

        if history.len() >= self.config.max_requests {
            let retry_after = history
                .front()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(window);
            return RateLimitResult::Limited { retry_after };
        }

        history.push_back(now);
        RateLimitResult::Allowed {
            remaining: self.config.max_requests - history.len(),
        }
    }

    /// Admit or reject a request from `client_id`
    pub fn allow(&self, client_id: &str) -> bool {
        self.check(client_id).is_allowed()
    }

    /// Like [`RateLimiter::check`], but rejection is an error
    ///
    /// # Errors
    ///
    /// * `RateLimitError::Exceeded` - Client is over its limit
    pub fn check_and_record(&self, client_id: &str) -> RateLimiterResult<usize> {
        match self.check(client_id) {
            RateLimitResult::Allowed { remaining } => Ok(remaining),
            RateLimitResult::Limited { retry_after } => Err(RateLimitError::Exceeded {
                limit: self.config.max_requests,
                retry_after,
            }),
        }
    }

    /// Drop histories whose newest entry has left the window
    ///
    /// Returns the number of clients removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let window = self.config.window;
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, history| {
            history
                .back()
                .is_some_and(|newest| now.duration_since(*newest) < window)
        });
        before - windows.len()
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    /// Run [`RateLimiter::sweep`] every `window` until the limiter is dropped
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.config.window.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(limiter) = weak.upgrade() else {
                    break;
                };
                let removed = limiter.sweep();
                if removed > 0 {
                    log::debug!("Rate limiter sweep removed {} idle clients", removed);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_boundary_three_per_second() {
        let limiter = RateLimiter::new(RateLimitConfig::new(3, Duration::from_secs(1)));

        assert!(limiter.allow("1.2.3.4"));
        assert!(limiter.allow("1.2.3.4"));
        assert!(limiter.allow("1.2.3.4"));
        assert!(!limiter.allow("1.2.3.4"));
        assert!(limiter.allow("5.6.7.8"), "Other clients are unaffected");

        thread::sleep(Duration::from_millis(1050));
        assert!(limiter.allow("1.2.3.4"), "Should allow after window expires");
    }

    #[test]
    fn test_rejections_are_not_recorded() {
        let limiter = RateLimiter::new(RateLimitConfig::new(2, Duration::from_millis(100)));

        assert!(limiter.allow("c"));
        assert!(limiter.allow("c"));
        for _ in 0..10 {
            assert!(!limiter.allow("c"));
        }

        thread::sleep(Duration::from_millis(120));
        assert!(limiter.allow("c"));
        assert!(limiter.allow("c"));
    }

    #[test]
    fn test_remaining_and_retry_after() {
        let limiter = RateLimiter::new(RateLimitConfig::new(2, Duration::from_secs(10)));

        assert_eq!(limiter.check("c"), RateLimitResult::Allowed { remaining: 1 });
        assert_eq!(limiter.check("c"), RateLimitResult::Allowed { remaining: 0 });
        match limiter.check("c") {
            RateLimitResult::Limited { retry_after } => {
                assert!(retry_after <= Duration::from_secs(10));
                assert!(retry_after > Duration::from_secs(9));
            }
            other => panic!("expected Limited, got {other:?}"),
        }
    }

    #[test]
    fn test_check_and_record_error() {
        let limiter = RateLimiter::new(RateLimitConfig::new(1, Duration::from_secs(10)));
        assert_eq!(limiter.check_and_record("c").unwrap(), 0);
        assert!(matches!(
            limiter.check_and_record("c"),
            Err(RateLimitError::Exceeded { limit: 1, .. })
        ));
    }

    #[test]
    fn test_sweep_removes_idle_clients() {
        let limiter = RateLimiter::new(RateLimitConfig::new(5, Duration::from_millis(50)));
        limiter.allow("idle");
        thread::sleep(Duration::from_millis(60));
        limiter.allow("active");

        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_concurrent_admission_is_exact() {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::new(50, Duration::from_secs(60))));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                thread::spawn(move || (0..25).filter(|_| limiter.allow("shared")).count())
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 50);
    }

    #[tokio::test]
    async fn test_sweeper_runs_and_stops_with_limiter() {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::new(5, Duration::from_millis(20))));
        limiter.allow("transient");
        let handle = limiter.spawn_sweeper();

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(limiter.tracked_clients(), 0);

        drop(limiter);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should exit once the limiter is dropped")
            .unwrap();
    }

    #[test]
    fn test_presets() {
        assert_eq!(RateLimitConfig::login().max_requests, 5);
        assert_eq!(RateLimitConfig::password_reset().max_requests, 3);
        assert_eq!(RateLimitConfig::api().window, Duration::from_secs(60));
    }
}
