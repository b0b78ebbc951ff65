//! Password reset by emailed code.
//!
//! States per email: no challenge, pending (code, attempts, expiry), then
//! confirmed (challenge deleted), expired (TTL elapsed), or exhausted
//! (attempt cap reached). Requesting again replaces any pending challenge.

pub mod challenge;
pub mod errors;
pub mod flow;

pub use challenge::{PasswordResetChallenge, challenge_key, generate_code};
pub use errors::{ResetError, ResetResult};
pub use flow::{PasswordResetFlow, ResetConfig, ResetRequestOutcome};
