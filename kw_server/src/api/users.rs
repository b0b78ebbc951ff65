//! User profile endpoints. Both require a valid access token.

use super::{AppState, error::ApiError};
use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
};
use chrono::{DateTime, Utc};
use keyward::{
    UserClaims,
    auth::{ProfileUpdate, User, UserId},
};
use serde::Serialize;

/// Public view of a user; never carries the password hash
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// `GET /api/v1/users/me`
pub async fn current_user(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth.current_user(&claims).await?;
    Ok(Json(user.into()))
}

/// `PATCH /api/v1/users/{id}`
///
/// Absent fields are left unchanged. A new password must satisfy the
/// password policy. Editing any account but one's own is `403 Forbidden`.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(id): Path<UserId>,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Json(changes) = payload?;
    let user = state.auth.update_profile(&claims, id, changes).await?;
    Ok(Json(user.into()))
}
