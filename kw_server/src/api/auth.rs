//! Authentication API handlers.
//!
//! Register, login and refresh all answer with the token pair in JSON and
//! also set it as cookies:
//!
//! - `access-token`, `Path=/`
//! - `refresh-token`, `Path=/api/v1/auth`
//!
//! Both are `HttpOnly; Secure; SameSite=Strict` with a `Max-Age` equal to
//! the token lifetime.
//!
//! # Examples
//!
//! Register a new user:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/auth/register \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "bob@example.com", "username": "bob", "password": "GoodPass1!"}'
//! ```
//!
//! Login:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/auth/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "bob@example.com", "password": "GoodPass1!"}'
//! ```

use super::{AppState, error::ApiError, rate_limit::ClientId, users::UserResponse};
use crate::{logging::log_security_event, metrics};
use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header::{COOKIE, SET_COOKIE}},
    response::{IntoResponse, Response},
};
use keyward::{
    AuthError,
    auth::{LoginRequest, RegisterRequest, TokenPair, User},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Cookie carrying the access token
pub const ACCESS_COOKIE: &str = "access-token";

/// Cookie carrying the refresh token
pub const REFRESH_COOKIE: &str = "refresh-token";

const ACCESS_COOKIE_PATH: &str = "/";
const REFRESH_COOKIE_PATH: &str = "/api/v1/auth";

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshPayload {
    pub refresh_token: Option<String>,
}

/// Find `name` among the request's `Cookie` headers
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

fn session_cookie(name: &str, value: &str, path: &str, max_age_secs: i64) -> String {
    format!(
        "{name}={value}; Path={path}; Max-Age={max_age_secs}; HttpOnly; Secure; SameSite=Strict"
    )
}

/// Build the token response and its two cookies
fn session_response(
    state: &AppState,
    status: StatusCode,
    tokens: TokenPair,
    user: Option<User>,
) -> Response {
    let access_ttl = state.auth.tokens().access_ttl().num_seconds();
    let refresh_ttl = state.auth.tokens().refresh_ttl().num_seconds();

    let cookies = [
        session_cookie(
            ACCESS_COOKIE,
            &tokens.access_token,
            ACCESS_COOKIE_PATH,
            access_ttl,
        ),
        session_cookie(
            REFRESH_COOKIE,
            &tokens.refresh_token,
            REFRESH_COOKIE_PATH,
            refresh_ttl,
        ),
    ];

    let body = AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        token_type: "Bearer",
        expires_in: access_ttl,
        user: user.map(UserResponse::from),
    };

    let mut response = (status, Json(body)).into_response();
    for cookie in cookies {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => tracing::error!("Session cookie not set: {}", e),
        }
    }
    response
}

/// Register a new user account and log them in.
///
/// # Response
///
/// `201 Created` with the token pair and the new user.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid email or username, or weak password
/// - `409 Conflict`: Email already registered
/// - `500 Internal Server Error`: Storage or hashing failure
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let (user, tokens) = state.auth.register(request).await?;
    Ok(session_response(&state, StatusCode::CREATED, tokens, Some(user)))
}

/// Authenticate with email and password.
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password (indistinguishable)
pub async fn login(
    State(state): State<AppState>,
    client: ClientId,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;

    match state.auth.login(request).await {
        Ok((user, tokens)) => {
            metrics::auth_login_total(true);
            Ok(session_response(&state, StatusCode::OK, tokens, Some(user)))
        }
        Err(err) => {
            metrics::auth_login_total(false);
            if matches!(err, AuthError::InvalidCredentials) {
                log_security_event(
                    "failed_login",
                    None,
                    Some(client.as_str()),
                    "Invalid credentials",
                );
            }
            Err(err.into())
        }
    }
}

/// Exchange a refresh token for a new token pair.
///
/// The token is read from the JSON body (`{"refresh_token": "..."}`) or,
/// when the body is empty, from the `refresh-token` cookie.
///
/// # Errors
///
/// - `400 Bad Request`: Body is present but not valid JSON
/// - `401 Unauthorized`: Missing, expired, invalid, or access-typed token
pub async fn refresh(
    State(state): State<AppState>,
    client: ClientId,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let payload: RefreshPayload = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshPayload::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };

    let token = payload
        .refresh_token
        .filter(|t| !t.is_empty())
        .or_else(|| cookie_value(&headers, REFRESH_COOKIE).map(str::to_string))
        .ok_or(AuthError::InvalidToken);

    match token.and_then(|token| state.auth.refresh(&token)) {
        Ok(tokens) => {
            metrics::auth_token_refresh_total(true);
            Ok(session_response(&state, StatusCode::OK, tokens, None))
        }
        Err(err) => {
            metrics::auth_token_refresh_total(false);
            if err.is_token_rejection() {
                log_security_event(
                    "rejected_refresh_token",
                    None,
                    Some(client.as_str()),
                    &err.to_string(),
                );
            }
            Err(err.into())
        }
    }
}

/// Clear both session cookies.
///
/// Tokens are stateless, so a copied token stays valid until it expires.
pub async fn logout() -> Response {
    let mut response = (StatusCode::OK, Json(json!({ "message": "Logged out" }))).into_response();
    for (name, path) in [
        (ACCESS_COOKIE, ACCESS_COOKIE_PATH),
        (REFRESH_COOKIE, REFRESH_COOKIE_PATH),
    ] {
        if let Ok(value) = HeaderValue::from_str(&session_cookie(name, "", path, 0)) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}
