//! Super-admin brigade management.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::models::brigade::{is_valid_slug, Brigade};
use crate::models::now_rfc3339;
use crate::security::hash_password;
use crate::web::session::SuperSession;

#[derive(Serialize)]
pub struct BrigadeSummary {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub created_at: String,
    pub member_count: i64,
    pub callout_count: i64,
}

pub async fn list_brigades(
    _session: SuperSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let overviews = state.repo.list_brigade_overviews().await.map_err(|e| {
        tracing::error!(error = ?e, "failed to list brigades");
        ApiError::Internal
    })?;
    let items: Vec<BrigadeSummary> = overviews
        .into_iter()
        .map(|o| BrigadeSummary {
            id: o.brigade.id,
            slug: o.brigade.slug,
            name: o.brigade.name,
            created_at: o.brigade.created_at,
            member_count: o.member_count,
            callout_count: o.callout_count,
        })
        .collect();
    Ok(Json(json!({ "items": items })))
}

#[derive(Deserialize)]
pub struct CreateBrigadeRequest {
    pub slug: String,
    pub name: String,
    pub pin: String,
    pub admin_password: String,
}

#[derive(Serialize)]
pub struct CreateBrigadeResponse {
    pub id: String,
    pub slug: String,
    pub name: String,
}

pub async fn create_brigade(
    _session: SuperSession,
    State(state): State<AppState>,
    Json(req): Json<CreateBrigadeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_valid_slug(&req.slug) {
        return Err(ApiError::Validation(
            "slug must be 2-64 lowercase letters, digits or hyphens".to_string(),
        ));
    }
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".to_string()));
    }
    if req.pin.len() < 4 {
        return Err(ApiError::Validation(
            "pin must be at least 4 characters".to_string(),
        ));
    }
    if req.admin_password.len() < 8 {
        return Err(ApiError::Validation(
            "admin password must be at least 8 characters".to_string(),
        ));
    }

    let pin_hash = hash_password(&req.pin).map_err(|e| {
        tracing::error!(error = ?e, "failed to hash pin");
        ApiError::Internal
    })?;
    let admin_password_hash = hash_password(&req.admin_password).map_err(|e| {
        tracing::error!(error = ?e, "failed to hash admin password");
        ApiError::Internal
    })?;

    let brigade = Brigade {
        id: Uuid::new_v4().to_string(),
        slug: req.slug,
        name: req.name.trim().to_string(),
        pin_hash,
        admin_password_hash,
        created_at: now_rfc3339(),
    };
    let response = CreateBrigadeResponse {
        id: brigade.id.clone(),
        slug: brigade.slug.clone(),
        name: brigade.name.clone(),
    };

    let created = state.repo.create_brigade(brigade).await.map_err(|e| {
        tracing::error!(error = ?e, "failed to create brigade");
        ApiError::Internal
    })?;
    if !created {
        return Err(ApiError::Conflict("slug already in use".to_string()));
    }
    Ok((StatusCode::CREATED, Json(response)))
}
