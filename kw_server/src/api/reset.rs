//! Password reset API handlers.
//!
//! Every call into the reset flow is bounded by the configured request
//! deadline. Code delivery is detached from the request and carries its own
//! budget (`RESET_DELIVERY_TIMEOUT_SECS`).

use super::{AppState, error::ApiError, rate_limit::ClientId, request_id::RequestId};
use crate::{logging::log_security_event, metrics};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use keyward::{
    ResetError,
    reset::{ResetRequestOutcome, ResetResult},
};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Identical for existing and unknown accounts
pub const RESET_REQUESTED_MESSAGE: &str =
    "If an account exists for that email, a reset code has been sent";

#[derive(Debug, Deserialize)]
pub struct ResetRequestPayload {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidateCodePayload {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmResetPayload {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

async fn within_deadline<F, T>(state: &AppState, flow_call: F) -> Result<T, ApiError>
where
    F: Future<Output = ResetResult<T>>,
{
    match tokio::time::timeout(state.request_deadline, flow_call).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(_) => Err(ApiError::Timeout),
    }
}

fn record_outcome<T>(stage: &'static str, result: &Result<T, ApiError>, client: &ClientId) {
    metrics::password_reset_total(stage, result.is_ok());
    if let Err(ApiError::Reset(ResetError::TooManyAttempts)) = result {
        log_security_event(
            "reset_attempts_exhausted",
            None,
            Some(client.as_str()),
            "Password reset attempt cap reached",
        );
    }
}

/// `POST /api/v1/auth/password-reset/request`
///
/// Always answers `200 OK` with [`RESET_REQUESTED_MESSAGE`]: unknown
/// accounts, delivery failures and backend errors are only logged. Code
/// delivery runs in the background, so the answer does not wait on the
/// notification service.
pub async fn request_reset(
    State(state): State<AppState>,
    request_id: RequestId,
    client: ClientId,
    payload: Result<Json<ResetRequestPayload>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(payload) = payload?;

    let result = within_deadline(&state, state.reset.request_reset(&payload.email)).await;
    record_outcome("request", &result, &client);
    match result {
        Ok(ResetRequestOutcome::Issued) => {}
        Ok(ResetRequestOutcome::UnknownAccount) => log_security_event(
            "reset_unknown_account",
            None,
            Some(client.as_str()),
            "Password reset requested for unknown account",
        ),
        Err(e) => {
            tracing::error!(request_id = %request_id.as_str(), "Password reset request failed: {}", e);
        }
    }

    Ok(MessageResponse::new(RESET_REQUESTED_MESSAGE))
}

/// `POST /api/v1/auth/password-reset/validate`
///
/// Consumes one attempt. A valid code leaves the challenge pending for
/// confirmation.
///
/// # Errors
///
/// - `400 Bad Request`: Wrong code, or no live challenge
/// - `429 Too Many Requests`: Attempt cap reached
pub async fn validate_code(
    State(state): State<AppState>,
    client: ClientId,
    payload: Result<Json<ValidateCodePayload>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(payload) = payload?;

    let result = within_deadline(
        &state,
        state.reset.validate_code(&payload.email, &payload.code),
    )
    .await;
    record_outcome("validate", &result, &client);
    result?;

    Ok(MessageResponse::new("Code is valid"))
}

/// `POST /api/v1/auth/password-reset/confirm`
///
/// # Errors
///
/// - `400 Bad Request`: Weak password, wrong code, or no live challenge
/// - `429 Too Many Requests`: Attempt cap reached
pub async fn confirm_reset(
    State(state): State<AppState>,
    client: ClientId,
    payload: Result<Json<ConfirmResetPayload>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(payload) = payload?;

    let result = within_deadline(
        &state,
        state
            .reset
            .confirm_reset(&payload.email, &payload.code, &payload.new_password),
    )
    .await;
    record_outcome("confirm", &result, &client);
    result?;

    Ok(MessageResponse::new("Password has been reset"))
}
