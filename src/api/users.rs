//! `/api/users` handlers.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::api::{ApiError, AppState};
use crate::auth::{NewUser, UserContext};
use crate::db::{ConnectionState, UserProfile, check_connection};

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100, message = "Please provide a name"))]
    pub name: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

impl SignupRequest {
    fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Please provide email and password"))]
    pub email: String,
    #[validate(length(min = 1, message = "Please provide email and password"))]
    pub password: String,
}

/// Body of a successful signup or login.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub success: bool,
    pub status: String,
    pub database: ConnectionState,
}

/// POST /api/users/signup
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(payload) = payload?;
    let payload = payload.trimmed();
    payload.validate()?;

    let user = state
        .users
        .create(NewUser {
            name: payload.name,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    let issued = state
        .tokens
        .issue(&user.user_id)
        .map_err(|e| ApiError::Internal(format!("{:#}", e)))?;

    info!("User signed up: {}", user.user_id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token: issued.token,
            user: user.into(),
        }),
    ))
}

/// POST /api/users/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let Some(user) = state
        .users
        .authenticate(&payload.email, &payload.password)
        .await?
    else {
        warn!("Failed login attempt for {}", payload.email.trim());
        return Err(ApiError::InvalidCredentials);
    };

    let issued = state
        .tokens
        .issue(&user.user_id)
        .map_err(|e| ApiError::Internal(format!("{:#}", e)))?;

    info!("User logged in: {}", user.user_id);

    Ok(Json(AuthResponse {
        success: true,
        token: issued.token,
        user: user.into(),
    }))
}

/// GET /api/users/me (behind the auth gate)
pub async fn me(Extension(ctx): Extension<UserContext>) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        success: true,
        user: ctx.into_profile(),
    })
}

/// GET /api/users/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = check_connection(&state.db).await;

    Json(HealthResponse {
        success: true,
        status: "API is running".to_string(),
        database,
    })
}
