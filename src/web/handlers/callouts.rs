//! Admin callout lifecycle: open, submit, lock.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::models::brigade::Brigade;
use crate::models::callout::{Callout, CalloutStatus};
use crate::models::now_rfc3339;
use crate::web::session::AdminSession;

pub async fn list_callouts(
    AdminSession(brigade): AdminSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let callouts = state.repo.list_callouts(&brigade.id, 100).await.map_err(|e| {
        tracing::error!(error = ?e, "failed to list callouts");
        ApiError::Internal
    })?;
    Ok(Json(json!({ "items": callouts })))
}

#[derive(Deserialize)]
pub struct CreateCalloutRequest {
    pub icad_number: String,
}

pub async fn create_callout(
    AdminSession(brigade): AdminSession,
    State(state): State<AppState>,
    Json(req): Json<CreateCalloutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (callout, created) = create_for_brigade(&state, &brigade, &req.icad_number).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(callout)))
}

pub async fn submit_callout(
    AdminSession(brigade): AdminSession,
    State(state): State<AppState>,
    Path((_slug, callout_id)): Path<(String, String)>,
) -> Result<Json<Callout>, ApiError> {
    let mut callout = owned_callout(&state, &brigade, &callout_id).await?;
    if callout.status != CalloutStatus::Draft.as_str() {
        return Err(ApiError::Conflict(
            "only a draft callout can be submitted".to_string(),
        ));
    }
    set_status(&state, &callout.id, CalloutStatus::Submitted).await?;
    callout.status = CalloutStatus::Submitted.as_str().to_string();
    Ok(Json(callout))
}

pub async fn lock_callout(
    AdminSession(brigade): AdminSession,
    State(state): State<AppState>,
    Path((_slug, callout_id)): Path<(String, String)>,
) -> Result<Json<Callout>, ApiError> {
    let mut callout = owned_callout(&state, &brigade, &callout_id).await?;
    if callout.is_locked() {
        // locking twice is a no-op, not an error
        return Ok(Json(callout));
    }
    set_status(&state, &callout.id, CalloutStatus::Locked).await?;
    state.live.publish_locked(&brigade.id, &callout.id).await;
    callout.status = CalloutStatus::Locked.as_str().to_string();
    Ok(Json(callout))
}

/// Open a callout, converging on the existing row when the brigade has
/// already seen this ICAD number. Shared with the bearer API.
pub(crate) async fn create_for_brigade(
    state: &AppState,
    brigade: &Brigade,
    icad_number: &str,
) -> Result<(Callout, bool), ApiError> {
    let icad_number = icad_number.trim();
    if icad_number.is_empty() {
        return Err(ApiError::Validation(
            "icad_number must not be empty".to_string(),
        ));
    }
    let callout = Callout {
        id: Uuid::new_v4().to_string(),
        brigade_id: brigade.id.clone(),
        icad_number: icad_number.to_string(),
        status: CalloutStatus::Draft.as_str().to_string(),
        opened_at: now_rfc3339(),
    };
    state.repo.create_callout(callout).await.map_err(|e| {
        tracing::error!(error = ?e, "failed to create callout");
        ApiError::Internal
    })
}

/// Load a callout and prove it belongs to the brigade. A callout of
/// another brigade is reported as missing, not forbidden.
pub(crate) async fn owned_callout(
    state: &AppState,
    brigade: &Brigade,
    callout_id: &str,
) -> Result<Callout, ApiError> {
    let callout = state.repo.get_callout(callout_id).await.map_err(|e| {
        tracing::error!(error = ?e, "failed to load callout");
        ApiError::Internal
    })?;
    match callout {
        Some(callout) if callout.brigade_id == brigade.id => Ok(callout),
        _ => Err(ApiError::NotFound("callout")),
    }
}

async fn set_status(
    state: &AppState,
    callout_id: &str,
    status: CalloutStatus,
) -> Result<(), ApiError> {
    state
        .repo
        .set_callout_status(callout_id, status.as_str())
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "failed to update callout status");
            ApiError::Internal
        })?;
    Ok(())
}
