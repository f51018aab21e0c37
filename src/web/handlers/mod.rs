use crate::app::AppState;
use crate::error::ApiError;
use crate::models::brigade::Brigade;

pub mod api;
pub mod attendance;
pub mod auth;
pub mod brigades;
pub mod callouts;
pub mod members;
pub mod stream;
pub mod tokens;

/// Resolve a slug to its brigade for handlers that authenticate by
/// other means than a session extractor (logins, bearer API).
pub(crate) async fn load_brigade(state: &AppState, slug: &str) -> Result<Brigade, ApiError> {
    state
        .repo
        .get_brigade_by_slug(slug)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "failed to load brigade");
            ApiError::Internal
        })?
        .ok_or(ApiError::NotFound("brigade"))
}
