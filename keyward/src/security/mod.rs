//! Security module providing request rate limiting.
//!
//! Each protected route class gets its own [`RateLimiter`] instance:
//! - **Login / registration**: 5 requests per minute
//! - **Password reset**: 3 requests per minute
//! - **General API**: 100 requests per minute
//!
//! Limiter state is per process. Replicas behind a load balancer each keep
//! their own windows.
//!
//! ## Example
//!
//! ```no_run
//! use keyward::security::{RateLimitConfig, RateLimiter};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let limiter = Arc::new(RateLimiter::new(RateLimitConfig::login()));
//!     let _sweeper = limiter.spawn_sweeper();
//!
//!     if limiter.allow("192.168.1.1") {
//!         println!("Login allowed");
//!     }
//! }
//! ```

pub mod errors;
pub mod rate_limiter;

pub use errors::{RateLimitError, RateLimiterResult};
pub use rate_limiter::{RateLimitConfig, RateLimitResult, RateLimiter};
