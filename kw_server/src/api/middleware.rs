//! Authentication and request metrics middleware.
//!
//! [`auth_middleware`] validates the access token and injects the
//! authenticated [`UserClaims`] into request extensions:
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use keyward::UserClaims;
//!
//! async fn protected_handler(Extension(claims): Extension<UserClaims>) -> String {
//!     format!("Authenticated as user {}", claims.user_id)
//! }
//! # let _ = protected_handler;
//! ```

use super::{AppState, auth::cookie_value, auth::ACCESS_COOKIE, error::ApiError, rate_limit::ClientId};
use crate::{logging, metrics};
use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use keyward::{AuthError, UserClaims};
use std::time::Instant;

/// Read the access token from `Authorization: Bearer`, then the cookie
fn access_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .or_else(|| cookie_value(headers, ACCESS_COOKIE))
}

/// Authentication middleware that validates access tokens and injects claims.
///
/// # Behavior
///
/// - **Success**: Token valid → Injects [`UserClaims`] into request extensions → Calls next handler
/// - **Missing token**: Returns `401 Unauthorized`
/// - **Expired, refresh-typed, or invalid token**: Returns `401 Unauthorized`
///
/// All failures share one response body.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = match access_token(request.headers()) {
        Some(token) => state.auth.tokens().validate_access(token),
        None => Err(AuthError::InvalidToken),
    };

    match claims {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => {
            let client = request.extensions().get::<ClientId>().cloned();
            logging::log_security_event(
                "rejected_access_token",
                None,
                client.as_ref().map(ClientId::as_str),
                &err.to_string(),
            );
            ApiError::from(err).into_response()
        }
    }
}

/// Record request count and latency per matched route
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    metrics::http_requests_total(&method, &path, status);
    metrics::http_request_duration_ms(&method, &path, elapsed.as_secs_f64() * 1000.0);
    logging::log_api_request(&method, &path, status, elapsed.as_millis() as u64);

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, header::COOKIE};

    #[test]
    fn test_bearer_preferred_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        headers.insert(COOKIE, HeaderValue::from_static("access-token=cookie-token"));
        assert_eq!(access_token(&headers), Some("header-token"));
    }

    #[test]
    fn test_cookie_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; access-token=cookie-token"),
        );
        assert_eq!(access_token(&headers), Some("cookie-token"));
    }

    #[test]
    fn test_non_bearer_scheme_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(access_token(&headers), None);
    }
}
