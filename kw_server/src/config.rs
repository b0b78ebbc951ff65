//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use keyward::{
    AuthConfig, RateLimitConfig, ResetConfig, db::DatabaseConfig, notify::RetryPolicy,
};
use std::{fmt, net::SocketAddr, str::FromStr, time::Duration};

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration; `None` selects the in-memory user store
    pub database: Option<DatabaseConfig>,
    /// Redis URL; `None` selects the in-memory cache
    pub redis_url: Option<String>,
    /// Token and hashing secrets
    pub security: SecurityConfig,
    /// Password reset challenge settings
    pub reset: ResetSettings,
    /// Per route class rate limits
    pub rate_limits: RateLimitSettings,
    /// Outbound notification service
    pub notification: NotificationConfig,
    /// Upper bound on a single reset flow call
    pub request_deadline: Duration,
    /// Lifetime of cached user snapshots
    pub user_cache_ttl: Duration,
    /// Whether `/metrics` is served
    pub metrics_enabled: bool,
    /// Log output format
    pub log_format: LogFormat,
}

/// Security-related configuration
#[derive(Clone)]
pub struct SecurityConfig {
    /// JWT signing secret (required)
    pub jwt_secret: String,
    /// Password hashing pepper (optional)
    pub password_pepper: String,
    /// Access token lifetime in seconds
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl_secs: i64,
}

impl SecurityConfig {
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(self.jwt_secret.clone())
            .with_pepper(self.password_pepper.clone())
            .with_ttls(
                chrono::Duration::seconds(self.access_token_ttl_secs),
                chrono::Duration::seconds(self.refresh_token_ttl_secs),
            )
    }
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"<redacted>")
            .field("password_pepper", &"<redacted>")
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .finish()
    }
}

/// Password reset configuration
#[derive(Debug, Clone, Copy)]
pub struct ResetSettings {
    /// Reset code lifetime in seconds
    pub code_ttl_secs: u64,
    /// Wrong guesses allowed per code
    pub max_attempts: u32,
    /// Budget for delivering one code, retries included
    pub delivery_timeout_secs: u64,
}

impl ResetSettings {
    pub fn reset_config(&self) -> ResetConfig {
        ResetConfig {
            code_ttl: Duration::from_secs(self.code_ttl_secs),
            max_attempts: self.max_attempts,
            delivery_timeout: Duration::from_secs(self.delivery_timeout_secs),
        }
    }
}

/// Rate limits for each route class
#[derive(Debug, Clone, Copy)]
pub struct RateLimitSettings {
    pub login: RateLimitConfig,
    pub reset: RateLimitConfig,
    pub api: RateLimitConfig,
}

/// Notification service configuration
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// Service root; `None` logs codes instead of sending them
    pub url: Option<String>,
    /// Retry policy for transient delivery failures
    pub retry: RetryPolicy,
    /// Per-attempt request timeout
    pub request_timeout: Duration,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        Self::from_lookup(
            |key| std::env::var(key).ok(),
            bind_override,
            database_url_override,
        )
    }

    /// Load configuration from an arbitrary key/value source
    pub fn from_lookup<F>(
        lookup: F,
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let bind = match bind_override {
            Some(bind) => bind,
            None => env.parse_or("SERVER_BIND", default_bind())?,
        };

        let database = database_url_override
            .or_else(|| env.get("DATABASE_URL"))
            .map(|database_url| -> Result<DatabaseConfig, ConfigError> {
                let defaults = DatabaseConfig::development();
                Ok(DatabaseConfig {
                    database_url,
                    max_connections: env
                        .parse_or("DB_MAX_CONNECTIONS", defaults.max_connections)?,
                    min_connections: env
                        .parse_or("DB_MIN_CONNECTIONS", defaults.min_connections)?,
                    connection_timeout_secs: env.parse_or(
                        "DB_CONNECTION_TIMEOUT_SECS",
                        defaults.connection_timeout_secs,
                    )?,
                    idle_timeout_secs: env
                        .parse_or("DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs)?,
                    max_lifetime_secs: env
                        .parse_or("DB_MAX_LIFETIME_SECS", defaults.max_lifetime_secs)?,
                })
            })
            .transpose()?;

        // Security configuration (REQUIRED)
        let jwt_secret = env.get("JWT_SECRET").ok_or_else(|| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        if jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: "Must be at least 32 characters (128-bit security)".to_string(),
            });
        }

        let password_pepper = env.get("PASSWORD_PEPPER").unwrap_or_default();
        if !password_pepper.is_empty() && password_pepper.len() < 16 {
            return Err(ConfigError::Invalid {
                var: "PASSWORD_PEPPER".to_string(),
                reason: "Must be at least 16 characters (64-bit security)".to_string(),
            });
        }

        let security = SecurityConfig {
            jwt_secret,
            password_pepper,
            access_token_ttl_secs: env.parse_or("ACCESS_TOKEN_TTL_SECS", 900)?,
            refresh_token_ttl_secs: env.parse_or("REFRESH_TOKEN_TTL_SECS", 604_800)?,
        };

        let reset = ResetSettings {
            code_ttl_secs: env.parse_or("RESET_CODE_TTL_SECS", 900)?,
            max_attempts: env.parse_or("RESET_MAX_ATTEMPTS", 5)?,
            delivery_timeout_secs: env.parse_or("RESET_DELIVERY_TIMEOUT_SECS", 30)?,
        };

        let rate_limits = RateLimitSettings {
            login: env.rate_limit("LOGIN", RateLimitConfig::login())?,
            reset: env.rate_limit("RESET", RateLimitConfig::password_reset())?,
            api: env.rate_limit("API", RateLimitConfig::api())?,
        };

        let request_deadline = Duration::from_secs(env.parse_or("REQUEST_DEADLINE_SECS", 10)?);

        let defaults = RetryPolicy::default();
        let notification = NotificationConfig {
            url: env.get("NOTIFICATION_URL"),
            retry: RetryPolicy {
                max_attempts: env.parse_or("NOTIFY_MAX_ATTEMPTS", defaults.max_attempts)?,
                backoff: Duration::from_millis(env.parse_or(
                    "NOTIFY_BACKOFF_MS",
                    defaults.backoff.as_millis() as u64,
                )?),
            },
            request_timeout: request_deadline,
        };

        Ok(ServerConfig {
            bind,
            database,
            redis_url: env.get("REDIS_URL"),
            security,
            reset,
            rate_limits,
            notification,
            request_deadline,
            user_cache_ttl: Duration::from_secs(env.parse_or("USER_CACHE_TTL_SECS", 300)?),
            metrics_enabled: env.parse_or("METRICS_ENABLED", true)?,
            log_format: env.parse_or("LOG_FORMAT", LogFormat::Text)?,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("ACCESS_TOKEN_TTL_SECS", self.security.access_token_ttl_secs > 0),
            ("REFRESH_TOKEN_TTL_SECS", self.security.refresh_token_ttl_secs > 0),
            ("RESET_CODE_TTL_SECS", self.reset.code_ttl_secs > 0),
            ("RESET_MAX_ATTEMPTS", self.reset.max_attempts > 0),
            ("RESET_DELIVERY_TIMEOUT_SECS", self.reset.delivery_timeout_secs > 0),
            ("RATE_LIMIT_LOGIN_REQUESTS", self.rate_limits.login.max_requests > 0),
            ("RATE_LIMIT_LOGIN_WINDOW_SECS", !self.rate_limits.login.window.is_zero()),
            ("RATE_LIMIT_RESET_REQUESTS", self.rate_limits.reset.max_requests > 0),
            ("RATE_LIMIT_RESET_WINDOW_SECS", !self.rate_limits.reset.window.is_zero()),
            ("RATE_LIMIT_API_REQUESTS", self.rate_limits.api.max_requests > 0),
            ("RATE_LIMIT_API_WINDOW_SECS", !self.rate_limits.api.window.is_zero()),
            ("NOTIFY_MAX_ATTEMPTS", self.notification.retry.max_attempts > 0),
            ("REQUEST_DEADLINE_SECS", !self.request_deadline.is_zero()),
        ];

        if let Some((var, _)) = positive.iter().find(|(_, ok)| !ok) {
            return Err(ConfigError::Invalid {
                var: var.to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.security.refresh_token_ttl_secs <= self.security.access_token_ttl_secs {
            return Err(ConfigError::Invalid {
                var: "REFRESH_TOKEN_TTL_SECS".to_string(),
                reason: format!(
                    "Must be greater than access token TTL ({})",
                    self.security.access_token_ttl_secs
                ),
            });
        }

        if let Some(database) = &self.database
            && database.min_connections > database.max_connections
        {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    database.max_connections
                ),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    /// Parse a variable, falling back to `default` when unset
    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
    {
        match self.get(key) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: key.to_string(),
                reason: format!("Could not parse '{raw}'"),
            }),
            None => Ok(default),
        }
    }

    fn rate_limit(&self, class: &str, default: RateLimitConfig) -> Result<RateLimitConfig, ConfigError> {
        let max_requests =
            self.parse_or(&format!("RATE_LIMIT_{class}_REQUESTS"), default.max_requests)?;
        let window_secs = self.parse_or(
            &format!("RATE_LIMIT_{class}_WINDOW_SECS"),
            default.window.as_secs(),
        )?;
        Ok(RateLimitConfig::new(
            max_requests,
            Duration::from_secs(window_secs),
        ))
    }
}
