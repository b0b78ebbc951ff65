//! Authentication module providing token lifecycle, password hashing, and
//! account operations.
//!
//! This module implements:
//! - HS256 JWT access tokens (15-minute expiry) and refresh tokens (7-day expiry)
//! - Refresh-token rotation without a server-side revocation list
//! - Argon2id password hashing with server-side pepper
//! - Registration, login, and self-service profile updates
//!
//! ## Example
//!
//! ```no_run
//! use keyward::auth::{AuthConfig, AuthService, RegisterRequest};
//! use keyward::db::MemoryUserRepository;
//! use keyward::notify::LogNotifier;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AuthConfig::new("a-signing-secret-of-at-least-32-bytes!");
//!     let auth = AuthService::new(
//!         &config,
//!         Arc::new(MemoryUserRepository::new()),
//!         Arc::new(LogNotifier),
//!     );
//!
//!     let request = RegisterRequest {
//!         email: "bob@example.com".to_string(),
//!         username: "bob".to_string(),
//!         password: "GoodPass1!".to_string(),
//!     };
//!
//!     let (user, tokens) = auth.register(request).await?;
//!     let claims = auth.tokens().validate_access(&tokens.access_token)?;
//!     println!("Registered user {} as {}", user.id, claims.email);
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod errors;
pub mod models;
pub mod password;
pub mod service;
pub mod tokens;
pub mod validation;

pub use codec::TokenCodec;
pub use config::AuthConfig;
pub use errors::{AuthError, AuthResult};
pub use models::{
    LoginRequest, NewUser, ProfileUpdate, RegisterRequest, TokenKind, TokenPair, User, UserClaims,
    UserId,
};
pub use password::{PasswordHasher, PasswordPolicy};
pub use service::AuthService;
pub use tokens::TokenManager;
