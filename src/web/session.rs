//! Session extractors for the three authentication tiers.
//!
//! Each extractor resolves the brigade named in the URL and requires a
//! live session of its tier. Unauthenticated requests from declared
//! API clients get a JSON 401; anything else is redirected to the
//! tier's login page.

use std::collections::HashMap;
use std::future::Future;

use axum::{
    extract::{FromRequestParts, Path},
    http::{header, request::Parts, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};

use crate::app::AppState;
use crate::auth::sessions::Tier;
use crate::error::ApiError;
use crate::models::brigade::Brigade;
use crate::models::now_unix;

/// A PIN-tier session for the brigade in the URL.
pub struct PinSession(pub Brigade);

/// An admin-tier session for the brigade in the URL.
pub struct AdminSession(pub Brigade);

/// Either a PIN or an admin session; grants read access to live state.
pub struct ObserverSession(pub Brigade);

/// The single super-admin session.
pub struct SuperSession;

impl FromRequestParts<AppState> for PinSession {
    type Rejection = Response;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let (slug, brigade) = brigade_from_parts(parts, state).await?;
            if state.sessions.check(Tier::Pin, &slug, now_unix()).await {
                return Ok(PinSession(brigade));
            }
            Err(reject(parts, Tier::Pin, &slug))
        }
    }
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = Response;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let (slug, brigade) = brigade_from_parts(parts, state).await?;
            if state.sessions.check(Tier::Admin, &slug, now_unix()).await {
                return Ok(AdminSession(brigade));
            }
            Err(reject(parts, Tier::Admin, &slug))
        }
    }
}

impl FromRequestParts<AppState> for ObserverSession {
    type Rejection = Response;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let (slug, brigade) = brigade_from_parts(parts, state).await?;
            let now = now_unix();
            if state.sessions.check(Tier::Pin, &slug, now).await
                || state.sessions.check(Tier::Admin, &slug, now).await
            {
                return Ok(ObserverSession(brigade));
            }
            Err(reject(parts, Tier::Pin, &slug))
        }
    }
}

impl FromRequestParts<AppState> for SuperSession {
    type Rejection = Response;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            if state.sessions.check(Tier::SuperAdmin, "", now_unix()).await {
                return Ok(SuperSession);
            }
            Err(reject(parts, Tier::SuperAdmin, ""))
        }
    }
}

/// Resolve the `{slug}` path parameter to its brigade row.
async fn brigade_from_parts(
    parts: &mut Parts,
    state: &AppState,
) -> Result<(String, Brigade), Response> {
    let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "failed to read path parameters");
            ApiError::Internal.into_response()
        })?;
    let Some(slug) = params.get("slug").cloned() else {
        tracing::error!("route is missing the slug parameter");
        return Err(ApiError::Internal.into_response());
    };

    let brigade = state
        .repo
        .get_brigade_by_slug(&slug)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "failed to load brigade");
            ApiError::Internal.into_response()
        })?;
    match brigade {
        Some(brigade) => Ok((slug, brigade)),
        None => Err(ApiError::NotFound("brigade").into_response()),
    }
}

fn reject(parts: &Parts, tier: Tier, slug: &str) -> Response {
    if is_api_client(&parts.headers) {
        ApiError::NotAuthenticated.into_response()
    } else {
        Redirect::temporary(&tier.login_path(slug)).into_response()
    }
}

/// A request declares itself an API client through its Accept header
/// or the XHR marker; those get JSON errors instead of redirects.
fn is_api_client(headers: &HeaderMap) -> bool {
    if let Some(requested_with) = headers.get("x-requested-with") {
        if requested_with
            .as_bytes()
            .eq_ignore_ascii_case(b"XMLHttpRequest")
        {
            return true;
        }
    }
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("application/json") || accept.contains("text/event-stream"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn api_clients_are_detected_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(!is_api_client(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html"));
        assert!(!is_api_client(&headers));

        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );
        assert!(is_api_client(&headers));

        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        assert!(is_api_client(&headers));

        headers.remove(header::ACCEPT);
        headers.insert("x-requested-with", HeaderValue::from_static("xmlhttprequest"));
        assert!(is_api_client(&headers));
    }
}
