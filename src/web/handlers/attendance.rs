//! Attendance marking and the active-callout snapshot.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::live::{AttendanceDelta, DeltaOp};
use crate::models::attendance::{AttendanceChange, AttendanceRow};
use crate::models::brigade::Brigade;
use crate::models::callout::Callout;
use crate::models::now_rfc3339;
use crate::web::session::{AdminSession, ObserverSession, PinSession};

/// Active callout plus its persisted attendance, for page loads and
/// reconnect resyncs.
pub async fn active_callout(
    ObserverSession(brigade): ObserverSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let callout = state
        .repo
        .active_callout(&brigade.id)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "failed to load active callout");
            ApiError::Internal
        })?
        .ok_or(ApiError::NotFound("active callout"))?;
    let attendance = state.repo.list_attendance(&callout.id).await.map_err(|e| {
        tracing::error!(error = ?e, "failed to load attendance");
        ApiError::Internal
    })?;
    Ok(Json(json!({ "callout": callout, "attendance": attendance })))
}

#[derive(Deserialize)]
pub struct MarkRequest {
    pub member_id: String,
    #[serde(default)]
    pub truck_id: Option<String>,
    #[serde(default)]
    pub position_id: Option<String>,
    pub status: String,
}

/// PIN-tier write. Always targets the brigade's active callout.
pub async fn pin_mark(
    PinSession(brigade): PinSession,
    State(state): State<AppState>,
    Json(req): Json<MarkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let callout = state
        .repo
        .active_callout(&brigade.id)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "failed to load active callout");
            ApiError::Internal
        })?
        .ok_or(ApiError::NotFound("active callout"))?;
    let change = apply_mark(&state, &brigade, &callout, req).await?;
    Ok(Json(json!({ "change": change.as_str() })))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkOp {
    Upsert,
    Remove,
}

fn default_op() -> MarkOp {
    MarkOp::Upsert
}

#[derive(Deserialize)]
pub struct AdminMarkRequest {
    pub member_id: String,
    #[serde(default = "default_op")]
    pub op: MarkOp,
    #[serde(default)]
    pub truck_id: Option<String>,
    #[serde(default)]
    pub position_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Admin write against a specific callout: place, move or remove a
/// member.
pub async fn admin_mark(
    AdminSession(brigade): AdminSession,
    State(state): State<AppState>,
    Path((_slug, callout_id)): Path<(String, String)>,
    Json(req): Json<AdminMarkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let callout = super::callouts::owned_callout(&state, &brigade, &callout_id).await?;
    if callout.is_locked() {
        return Err(ApiError::Conflict("callout is locked".to_string()));
    }

    match req.op {
        MarkOp::Upsert => {
            let status = req
                .status
                .ok_or_else(|| ApiError::Validation("status is required".to_string()))?;
            let change = apply_mark(
                &state,
                &brigade,
                &callout,
                MarkRequest {
                    member_id: req.member_id,
                    truck_id: req.truck_id,
                    position_id: req.position_id,
                    status,
                },
            )
            .await?;
            Ok(Json(json!({ "change": change.as_str() })))
        }
        MarkOp::Remove => {
            let removed = state
                .repo
                .remove_attendance(&callout.id, &req.member_id)
                .await
                .map_err(|e| {
                    tracing::error!(error = ?e, "failed to remove attendance");
                    ApiError::Internal
                })?;
            match removed {
                Some(row) => {
                    let delta = AttendanceDelta {
                        callout_id: callout.id.clone(),
                        member_id: row.member_id,
                        truck_id: row.truck_id,
                        position_id: row.position_id,
                        status: row.status,
                        op: DeltaOp::Removed,
                        sequence: 0,
                    };
                    state.live.publish(&brigade.id, &callout.id, delta).await;
                    Ok(Json(json!({ "change": "removed" })))
                }
                // removing an absent entry converges, like a duplicate add
                None => Ok(Json(json!({ "change": "unchanged" }))),
            }
        }
    }
}

/// Upsert one member's attendance and publish the resulting delta. A
/// write identical to the stored row is a no-op and publishes nothing,
/// which is what makes offline replays safe.
pub(crate) async fn apply_mark(
    state: &AppState,
    brigade: &Brigade,
    callout: &Callout,
    req: MarkRequest,
) -> Result<AttendanceChange, ApiError> {
    if req.status.trim().is_empty() {
        return Err(ApiError::Validation("status must not be empty".to_string()));
    }

    let member = state.repo.get_member(&req.member_id).await.map_err(|e| {
        tracing::error!(error = ?e, "failed to load member");
        ApiError::Internal
    })?;
    let member = match member {
        Some(member) if member.brigade_id == brigade.id => member,
        _ => return Err(ApiError::NotFound("member")),
    };
    if !member.is_active() {
        return Err(ApiError::Validation("member is inactive".to_string()));
    }

    let entry = AttendanceRow {
        id: Uuid::new_v4().to_string(),
        callout_id: callout.id.clone(),
        member_id: member.id.clone(),
        truck_id: req.truck_id.clone(),
        position_id: req.position_id.clone(),
        status: req.status.clone(),
        recorded_at: now_rfc3339(),
    };
    let change = state.repo.upsert_attendance(entry).await.map_err(|e| {
        tracing::error!(error = ?e, "failed to upsert attendance");
        ApiError::Internal
    })?;

    let op = match change {
        AttendanceChange::Added => Some(DeltaOp::Added),
        AttendanceChange::Moved => Some(DeltaOp::Moved),
        AttendanceChange::Unchanged => None,
    };
    if let Some(op) = op {
        let delta = AttendanceDelta {
            callout_id: callout.id.clone(),
            member_id: member.id,
            truck_id: req.truck_id,
            position_id: req.position_id,
            status: req.status,
            op,
            sequence: 0,
        };
        state.live.publish(&brigade.id, &callout.id, delta).await;
    }
    Ok(change)
}
