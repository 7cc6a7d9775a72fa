// HTTP handlers for account registration, login and lookup.

use crate::domain::errors::UserStoreError;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::state::AppState;
use crate::use_cases::UserProfile;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

// Request payload for both register and login.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

// Result envelope shared by register and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub user_id: String,
    pub username: String,
    pub created_at: u64,
}

impl From<UserProfile> for UserDto {
    fn from(profile: UserProfile) -> Self {
        Self {
            user_id: profile.user_id,
            username: profile.username,
            created_at: profile.created_at,
        }
    }
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CredentialsRequest>,
) -> (StatusCode, Json<AuthResponse>) {
    match state
        .accounts
        .register(&payload.username, &payload.password)
        .await
    {
        Ok(profile) => (
            StatusCode::CREATED,
            Json(AuthResponse {
                success: true,
                message: "User registered successfully".to_string(),
                user_id: Some(profile.user_id),
                username: None,
            }),
        ),
        Err(err) => auth_failure(err),
    }
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CredentialsRequest>,
) -> (StatusCode, Json<AuthResponse>) {
    match state
        .accounts
        .login(&payload.username, &payload.password)
        .await
    {
        Ok(profile) => (
            StatusCode::OK,
            Json(AuthResponse {
                success: true,
                message: "Login successful".to_string(),
                user_id: Some(profile.user_id),
                username: Some(profile.username),
            }),
        ),
        Err(err) => auth_failure(err),
    }
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserDto>, (StatusCode, Json<ErrorResponse>)> {
    state
        .accounts
        .get_user(&user_id)
        .await
        .map(|profile| Json(profile.into()))
        .map_err(error_response)
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserDto>>, (StatusCode, Json<ErrorResponse>)> {
    state
        .accounts
        .all_users()
        .await
        .map(|users| Json(users.into_iter().map(UserDto::from).collect()))
        .map_err(error_response)
}

fn status_for(err: UserStoreError) -> StatusCode {
    match err {
        UserStoreError::InvalidUsername | UserStoreError::InvalidPassword => {
            StatusCode::BAD_REQUEST
        }
        UserStoreError::UsernameTaken => StatusCode::CONFLICT,
        UserStoreError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        UserStoreError::NotFound => StatusCode::NOT_FOUND,
        UserStoreError::StorageFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn auth_failure(err: UserStoreError) -> (StatusCode, Json<AuthResponse>) {
    debug!(?err, "account request rejected");
    (
        status_for(err),
        Json(AuthResponse {
            success: false,
            message: err.message().to_string(),
            user_id: None,
            username: None,
        }),
    )
}

fn error_response(err: UserStoreError) -> (StatusCode, Json<ErrorResponse>) {
    (
        status_for(err),
        Json(ErrorResponse {
            error: err.message().to_string(),
        }),
    )
}
