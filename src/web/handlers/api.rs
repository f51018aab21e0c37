//! Bearer-token integration API for external systems (CAD feeds,
//! pagers, dashboards).

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::app::AppState;
use crate::auth::rate::RateDecision;
use crate::error::{ApiError, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET};
use crate::models::api_token::Permission;
use crate::models::now_unix;
use crate::web::handlers::attendance::MarkRequest;

#[derive(Deserialize)]
pub struct CreateMusterRequest {
    pub icad_number: String,
}

pub async fn create_muster(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateMusterRequest>,
) -> Result<Response, ApiError> {
    let brigade = super::load_brigade(&state, &slug).await?;
    let (_, decision) = state
        .tokens
        .authorize(
            &headers,
            &brigade,
            Permission::MustersCreate,
            &format!("/api/{slug}/musters"),
            "POST",
            now_unix(),
        )
        .await?;

    let (callout, created) =
        super::callouts::create_for_brigade(&state, &brigade, &req.icad_number).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok(with_rate_headers(
        decision,
        (status, Json(callout)).into_response(),
    ))
}

pub async fn list_musters(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let brigade = super::load_brigade(&state, &slug).await?;
    let (_, decision) = state
        .tokens
        .authorize(
            &headers,
            &brigade,
            Permission::MustersRead,
            &format!("/api/{slug}/musters"),
            "GET",
            now_unix(),
        )
        .await?;

    let callouts = state.repo.list_callouts(&brigade.id, 100).await.map_err(|e| {
        tracing::error!(error = ?e, "failed to list callouts");
        ApiError::Internal
    })?;
    Ok(with_rate_headers(
        decision,
        Json(json!({ "items": callouts })).into_response(),
    ))
}

pub async fn get_attendance(
    State(state): State<AppState>,
    Path((slug, callout_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let brigade = super::load_brigade(&state, &slug).await?;
    let (_, decision) = state
        .tokens
        .authorize(
            &headers,
            &brigade,
            Permission::AttendanceRead,
            &format!("/api/{slug}/musters/{callout_id}/attendance"),
            "GET",
            now_unix(),
        )
        .await?;

    let callout = super::callouts::owned_callout(&state, &brigade, &callout_id).await?;
    let attendance = state.repo.list_attendance(&callout.id).await.map_err(|e| {
        tracing::error!(error = ?e, "failed to load attendance");
        ApiError::Internal
    })?;
    Ok(with_rate_headers(
        decision,
        Json(json!({ "items": attendance })).into_response(),
    ))
}

pub async fn create_attendance(
    State(state): State<AppState>,
    Path((slug, callout_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(req): Json<MarkRequest>,
) -> Result<Response, ApiError> {
    let brigade = super::load_brigade(&state, &slug).await?;
    let (_, decision) = state
        .tokens
        .authorize(
            &headers,
            &brigade,
            Permission::AttendanceCreate,
            &format!("/api/{slug}/musters/{callout_id}/attendance"),
            "POST",
            now_unix(),
        )
        .await?;

    let callout = super::callouts::owned_callout(&state, &brigade, &callout_id).await?;
    if callout.is_locked() {
        return Err(ApiError::Conflict("callout is locked".to_string()));
    }
    let change = super::attendance::apply_mark(&state, &brigade, &callout, req).await?;
    Ok(with_rate_headers(
        decision,
        Json(json!({ "change": change.as_str() })).into_response(),
    ))
}

/// Attach the rate-limit headers every authorized response carries.
fn with_rate_headers(decision: RateDecision, mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(decision.reset));
    response
}
