//! Admin roster management.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::models::member::Member;
use crate::models::now_rfc3339;
use crate::web::session::AdminSession;

#[derive(Deserialize)]
pub struct ListMembersQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

pub async fn list_members(
    AdminSession(brigade): AdminSession,
    State(state): State<AppState>,
    Query(query): Query<ListMembersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let members = state
        .repo
        .list_members(&brigade.id, query.include_inactive)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "failed to list members");
            ApiError::Internal
        })?;
    Ok(Json(json!({ "items": members })))
}

#[derive(Deserialize)]
pub struct CreateMemberRequest {
    pub name: String,
    #[serde(default)]
    pub rank: Option<String>,
}

pub async fn create_member(
    AdminSession(brigade): AdminSession,
    State(state): State<AppState>,
    Json(req): Json<CreateMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation("name must not be empty".to_string()));
    }

    let member = Member {
        id: Uuid::new_v4().to_string(),
        brigade_id: brigade.id,
        name,
        rank: req.rank,
        active: 1,
        created_at: now_rfc3339(),
    };
    state
        .repo
        .create_member(member.clone())
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "failed to create member");
            ApiError::Internal
        })?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn deactivate_member(
    AdminSession(brigade): AdminSession,
    State(state): State<AppState>,
    Path((_slug, member_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let n = state
        .repo
        .deactivate_member(&member_id, &brigade.id)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "failed to deactivate member");
            ApiError::Internal
        })?;
    if n == 0 {
        return Err(ApiError::NotFound("member"));
    }
    Ok(StatusCode::NO_CONTENT)
}
