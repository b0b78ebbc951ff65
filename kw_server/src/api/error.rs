//! HTTP error mapping.
//!
//! Handlers return `Result<_, ApiError>`; the body is always
//! `{"error": "<client message>"}` and internal detail goes to the log only.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use keyward::{AuthError, ResetError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors surfaced by HTTP handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Reset(#[from] ResetError),

    /// Request body could not be understood
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A flow call ran past the request deadline
    #[error("Request deadline exceeded")]
    Timeout,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(err) => auth_status(err),
            ApiError::Reset(err) => match err {
                ResetError::ExpiredChallenge
                | ResetError::InvalidCode
                | ResetError::WeakPassword(_)
                | ResetError::UserNotFound => StatusCode::BAD_REQUEST,
                ResetError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
                ResetError::Auth(inner) => auth_status(inner),
                ResetError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn client_message(&self) -> String {
        match self {
            ApiError::Auth(err) => err.client_message(),
            ApiError::Reset(err) => err.client_message(),
            ApiError::BadRequest(reason) => reason.clone(),
            ApiError::Timeout => "Service unavailable".to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::TokenExpired
        | AuthError::WrongTokenType
        | AuthError::MalformedClaims
        | AuthError::InvalidToken
        | AuthError::InvalidCredentials
        | AuthError::VerificationFailed
        | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
        AuthError::EmailTaken => StatusCode::CONFLICT,
        AuthError::InvalidEmail(_) | AuthError::InvalidUsername(_) | AuthError::WeakPassword(_) => {
            StatusCode::BAD_REQUEST
        }
        AuthError::Forbidden => StatusCode::FORBIDDEN,
        AuthError::DatabaseTimeout => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::EncodingError(_)
        | AuthError::HashingError
        | AuthError::Database(_)
        | AuthError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = ErrorResponse {
            error: self.client_message(),
        };
        (status, Json(body)).into_response()
    }
}
