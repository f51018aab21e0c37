//! Login and logout for the three session tiers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::sessions::Tier;
use crate::error::ApiError;
use crate::models::now_unix;
use crate::security::verify_password;

#[derive(Deserialize)]
pub struct PinLoginRequest {
    pub pin: String,
}

pub async fn pin_login(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<PinLoginRequest>,
) -> Result<StatusCode, ApiError> {
    let brigade = super::load_brigade(&state, &slug).await?;
    if !verify_password(&brigade.pin_hash, &req.pin) {
        return Err(ApiError::InvalidCredentials);
    }
    state.sessions.login(Tier::Pin, &slug, now_unix()).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn pin_logout(State(state): State<AppState>, Path(slug): Path<String>) -> StatusCode {
    state.sessions.logout(Tier::Pin, &slug).await;
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
pub struct AdminLoginRequest {
    pub password: String,
}

pub async fn admin_login(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<AdminLoginRequest>,
) -> Result<StatusCode, ApiError> {
    let brigade = super::load_brigade(&state, &slug).await?;
    if !verify_password(&brigade.admin_password_hash, &req.password) {
        return Err(ApiError::InvalidCredentials);
    }
    state.sessions.login(Tier::Admin, &slug, now_unix()).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn admin_logout(State(state): State<AppState>, Path(slug): Path<String>) -> StatusCode {
    state.sessions.logout(Tier::Admin, &slug).await;
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
pub struct SuperLoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn super_login(
    State(state): State<AppState>,
    Json(req): Json<SuperLoginRequest>,
) -> Result<StatusCode, ApiError> {
    // Without a configured hash this tier cannot be entered at all.
    let Some(hash) = state.config.auth.superadmin_password_hash.as_deref() else {
        return Err(ApiError::InvalidCredentials);
    };
    if req.username != state.config.auth.superadmin_username
        || !verify_password(hash, &req.password)
    {
        return Err(ApiError::InvalidCredentials);
    }
    state.sessions.login(Tier::SuperAdmin, "", now_unix()).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn super_logout(State(state): State<AppState>) -> StatusCode {
    state.sessions.logout(Tier::SuperAdmin, "").await;
    StatusCode::NO_CONTENT
}
