//! Per route class rate limiting middleware.
//!
//! Clients are identified by the first `X-Forwarded-For` entry, then
//! `X-Real-IP`, then the peer address, then the literal `unknown`.

use crate::{logging::log_security_event, metrics};
use axum::{
    Json,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{Extensions, HeaderMap, HeaderName, HeaderValue, StatusCode, header::RETRY_AFTER, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use keyward::{RateLimiter, security::RateLimitError};
use serde_json::json;
use std::{convert::Infallible, net::SocketAddr, sync::Arc};

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";
const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Limiter bound to the route class it guards
#[derive(Clone)]
pub struct RouteLimiter {
    class: &'static str,
    limiter: Arc<RateLimiter>,
}

impl RouteLimiter {
    pub fn new(class: &'static str, limiter: Arc<RateLimiter>) -> Self {
        Self { class, limiter }
    }
}

/// Identity used as the rate limiting key, also available to handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Derive the client key from proxy headers or the peer address
pub fn client_id(headers: &HeaderMap, extensions: &Extensions) -> ClientId {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let forwarded = header(X_FORWARDED_FOR).and_then(|v| {
        v.split(',')
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    });

    let id = forwarded
        .or_else(|| {
            header(X_REAL_IP)
                .map(|v| v.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string());

    ClientId(id)
}

impl<S> FromRequestParts<S> for ClientId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<ClientId>()
            .cloned()
            .unwrap_or_else(|| client_id(&parts.headers, &parts.extensions)))
    }
}

/// Admit or reject a request against the route's limiter
///
/// Admitted responses carry `X-RateLimit-Limit` and `X-RateLimit-Remaining`.
/// Rejections are `429 Too Many Requests` with `Retry-After` set to the
/// window length in seconds.
pub async fn rate_limit_middleware(
    State(route): State<RouteLimiter>,
    mut request: Request,
    next: Next,
) -> Response {
    let client = client_id(request.headers(), request.extensions());
    let limit = route.limiter.config().max_requests;

    match route.limiter.check_and_record(client.as_str()) {
        Ok(remaining) => {
            request.extensions_mut().insert(client);
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
            response
        }
        Err(err) => {
            metrics::rate_limit_rejections_total(route.class);
            log_security_event(
                "rate_limit_exceeded",
                None,
                Some(client.as_str()),
                &format!("Rate limit exceeded for {} routes", route.class),
            );
            too_many_requests(&route.limiter, &err)
        }
    }
}

fn too_many_requests(limiter: &RateLimiter, err: &RateLimitError) -> Response {
    let config = limiter.config();
    let window_secs = config.window.as_secs().max(1);

    let body = json!({
        "error": err.client_message(),
        "retry_after": err.retry_after_secs(),
    });

    (
        StatusCode::TOO_MANY_REQUESTS,
        [
            (RETRY_AFTER, HeaderValue::from(window_secs)),
            (X_RATELIMIT_LIMIT, HeaderValue::from(config.max_requests)),
        ],
        Json(body),
    )
        .into_response()
}
