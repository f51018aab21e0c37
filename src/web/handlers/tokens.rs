//! Admin API-token management and the token audit trail.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use base64::Engine as _;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::models::api_token::{ApiToken, Permission};
use crate::models::now_rfc3339;
use crate::security::hash_secret;
use crate::web::session::AdminSession;

const DEFAULT_WINDOW_SECONDS: i32 = 900;
const DEFAULT_MAX_REQUESTS: i32 = 60;

#[derive(Deserialize)]
pub struct CreateTokenRequest {
    pub name: String,
    /// Space-separated permission strings; unknown ones are rejected.
    pub permissions: String,
    #[serde(default)]
    pub window_seconds: Option<i32>,
    #[serde(default)]
    pub max_requests: Option<i32>,
}

#[derive(Serialize)]
pub struct CreateTokenResponse {
    pub id: String,
    pub name: String,
    pub secret: String, // Only returned once on creation
    pub permissions: String,
    pub window_seconds: i32,
    pub max_requests: i32,
    pub created_at: String,
}

pub async fn create_token(
    AdminSession(brigade): AdminSession,
    State(state): State<AppState>,
    Json(req): Json<CreateTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation("name must not be empty".to_string()));
    }
    let permissions = Permission::parse_list(&req.permissions)
        .map_err(|unknown| ApiError::Validation(format!("unknown permission: {unknown}")))?;
    if permissions.is_empty() {
        return Err(ApiError::Validation(
            "at least one permission is required".to_string(),
        ));
    }
    let window_seconds = req.window_seconds.unwrap_or(DEFAULT_WINDOW_SECONDS);
    if !(1..=86_400).contains(&window_seconds) {
        return Err(ApiError::Validation(
            "window_seconds must be between 1 and 86400".to_string(),
        ));
    }
    let max_requests = req.max_requests.unwrap_or(DEFAULT_MAX_REQUESTS);
    if !(1..=100_000).contains(&max_requests) {
        return Err(ApiError::Validation(
            "max_requests must be between 1 and 100000".to_string(),
        ));
    }

    let secret = generate_token_secret();
    let token = ApiToken {
        id: Uuid::new_v4().to_string(),
        brigade_id: brigade.id,
        name,
        secret_hash: hash_secret(&secret),
        permissions: Permission::join(&permissions),
        window_seconds,
        max_requests,
        created_at: now_rfc3339(),
        last_used_at: None,
        revoked_at: None,
    };

    let response = CreateTokenResponse {
        id: token.id.clone(),
        name: token.name.clone(),
        secret, // Return plaintext secret only once
        permissions: token.permissions.clone(),
        window_seconds: token.window_seconds,
        max_requests: token.max_requests,
        created_at: token.created_at.clone(),
    };
    state.repo.create_api_token(token).await.map_err(|e| {
        tracing::error!(error = ?e, "failed to create api token");
        ApiError::Internal
    })?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_tokens(
    AdminSession(brigade): AdminSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = state.repo.list_api_tokens(&brigade.id).await.map_err(|e| {
        tracing::error!(error = ?e, "failed to list api tokens");
        ApiError::Internal
    })?;
    // Don't expose secret_hash to the client
    let items: Vec<_> = tokens
        .into_iter()
        .map(|t| {
            json!({
                "id": t.id,
                "name": t.name,
                "permissions": t.permissions,
                "window_seconds": t.window_seconds,
                "max_requests": t.max_requests,
                "created_at": t.created_at,
                "last_used_at": t.last_used_at,
                "revoked_at": t.revoked_at,
            })
        })
        .collect();
    Ok(Json(json!({ "items": items })))
}

pub async fn revoke_token(
    AdminSession(brigade): AdminSession,
    State(state): State<AppState>,
    Path((_slug, token_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let n = state
        .repo
        .revoke_api_token(&token_id, &brigade.id)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "failed to revoke api token");
            ApiError::Internal
        })?;
    if n == 0 {
        return Err(ApiError::NotFound("token"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_audit(
    AdminSession(brigade): AdminSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let records = state.repo.list_audit(&brigade.id, 200).await.map_err(|e| {
        tracing::error!(error = ?e, "failed to list audit records");
        ApiError::Internal
    })?;
    Ok(Json(json!({ "items": records })))
}

fn generate_token_secret() -> String {
    let mut buf = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    format!(
        "mtk_{}",
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_prefixed_and_unique() {
        let a = generate_token_secret();
        let b = generate_token_secret();
        assert!(a.starts_with("mtk_"));
        assert!(a.len() > 40);
        assert_ne!(a, b);
    }
}
