//! # Keyward
//!
//! Session security core for an authentication service: JWT access/refresh
//! token lifecycle, password reset by emailed code, and per-client rate
//! limiting.
//!
//! ## Architecture
//!
//! An inbound request first passes a [`security::RateLimiter`] for its route
//! class. Admitted requests reach either the token layer
//! ([`auth::TokenManager`], via [`auth::AuthService`]) or the reset protocol
//! ([`reset::PasswordResetFlow`]). [`auth::PasswordHasher`] is used wherever a
//! plaintext password is checked or stored.
//!
//! Collaborators are injected as trait objects:
//!
//! - [`db::UserRepository`]: PostgreSQL, in-memory, or cache-aside storage
//! - [`cache::KeyValueCache`]: Redis or in-memory store with per-entry TTL
//! - [`notify::Notifier`]: HTTP notification service or the log
//!
//! ## Core Modules
//!
//! - [`auth`]: Token codec and manager, password hashing, account operations
//! - [`reset`]: Reset challenges and the request/validate/confirm flow
//! - [`security`]: Sliding-window rate limiting
//!
//! ## Example
//!
//! ```
//! use keyward::auth::{AuthConfig, TokenManager, UserClaims};
//!
//! let manager = TokenManager::new(&AuthConfig::new("a-signing-secret-of-at-least-32-bytes!"));
//! let claims = UserClaims { user_id: "1".into(), email: "bob@example.com".into() };
//! let pair = manager.issue_token_pair(&claims).unwrap();
//! assert_eq!(manager.validate_access(&pair.access_token).unwrap(), claims);
//! ```

/// Tokens, password hashing, and account operations.
pub mod auth;

/// Key-value cache with TTL.
pub mod cache;

/// User storage.
pub mod db;

/// Outbound notifications.
pub mod notify;

/// Password reset protocol.
pub mod reset;

/// Rate limiting.
pub mod security;

pub use auth::{AuthConfig, AuthError, AuthResult, AuthService, TokenManager, UserClaims};
pub use reset::{PasswordResetFlow, ResetConfig, ResetError};
pub use security::{RateLimitConfig, RateLimiter};
