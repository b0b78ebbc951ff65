//! HTTP surface of the keyward authentication service.
//!
//! The binary in `main.rs` loads [`config::ServerConfig`], initializes
//! [`logging`] and [`metrics`], wires the collaborators into an
//! [`api::AppState`] and serves [`api::create_router`].

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
