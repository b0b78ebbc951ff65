//! Prometheus metrics for monitoring the authentication service.
//!
//! Metrics are exposed in Prometheus text format on `/metrics` when a
//! recorder has been installed. Without one, every helper here is a no-op.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts and duration per matched route
//! - **Auth Metrics**: Login and token refresh outcomes
//! - **Reset Metrics**: Password reset outcomes per stage
//! - **Rate Limiting Metrics**: Rejections per route class
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use kw_server::metrics;
//!
//! let handle = metrics::install_recorder().unwrap();
//! metrics::http_requests_total("POST", "/api/v1/auth/login", 200);
//! println!("{}", handle.render());
//! ```

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder.
///
/// Returns a handle whose `render()` output is served on `/metrics`.
///
/// # Errors
///
/// Fails if a recorder is already installed for this process.
pub fn install_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
///
/// Increments the total HTTP request counter with method, path, and status labels.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Increment login attempts counter.
pub fn auth_login_total(success: bool) {
    metrics::counter!("auth_login_total",
        "result" => outcome(success)
    )
    .increment(1);
}

/// Increment token refresh counter.
pub fn auth_token_refresh_total(success: bool) {
    metrics::counter!("auth_token_refresh_total",
        "result" => outcome(success)
    )
    .increment(1);
}

// ============================================================================
// Password Reset Metrics
// ============================================================================

/// Increment password reset counter for `stage` (request, validate, confirm).
pub fn password_reset_total(stage: &'static str, success: bool) {
    metrics::counter!("password_reset_total",
        "stage" => stage,
        "result" => outcome(success)
    )
    .increment(1);
}

// ============================================================================
// Rate Limiting Metrics
// ============================================================================

/// Increment rate limit rejections counter.
pub fn rate_limit_rejections_total(class: &'static str) {
    metrics::counter!("rate_limit_rejections_total",
        "class" => class
    )
    .increment(1);
}

fn outcome(success: bool) -> &'static str {
    if success { "success" } else { "failure" }
}
