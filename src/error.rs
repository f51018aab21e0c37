use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::models::api_token::Permission;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Request-level failures with their wire representation. Handlers
/// return this directly; the JSON body carries a stable `code` so
/// clients can branch without parsing the message.
#[derive(Debug)]
pub enum ApiError {
    InvalidCredentials,
    NotAuthenticated,
    InvalidToken,
    InsufficientScope(Permission),
    RateLimited {
        limit: u32,
        reset: i64,
        retry_after: i64,
    },
    NotFound(&'static str),
    Validation(String),
    Conflict(String),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidCredentials => error_response(
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "invalid credentials".to_string(),
            ),
            ApiError::NotAuthenticated => error_response(
                StatusCode::UNAUTHORIZED,
                "NOT_AUTHENTICATED",
                "not authenticated".to_string(),
            ),
            ApiError::InvalidToken => error_response(
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                "invalid or unknown token".to_string(),
            ),
            ApiError::InsufficientScope(permission) => error_response(
                StatusCode::FORBIDDEN,
                "INSUFFICIENT_SCOPE",
                format!("token lacks permission {permission}"),
            ),
            ApiError::RateLimited {
                limit,
                reset,
                retry_after,
            } => {
                let mut response = error_response(
                    StatusCode::TOO_MANY_REQUESTS,
                    "RATE_LIMITED",
                    "rate limit exceeded".to_string(),
                );
                let headers = response.headers_mut();
                headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
                headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(0u32));
                headers.insert(X_RATELIMIT_RESET, HeaderValue::from(reset));
                headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
                response
            }
            ApiError::NotFound(what) => error_response(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{what} not found"),
            ),
            ApiError::Validation(message) => {
                error_response(StatusCode::BAD_REQUEST, "VALIDATION", message)
            }
            ApiError::Conflict(message) => {
                error_response(StatusCode::CONFLICT, "CONFLICT", message)
            }
            ApiError::Internal => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                "internal error".to_string(),
            ),
        }
    }
}

fn error_response(status: StatusCode, code: &'static str, message: String) -> Response {
    (status, Json(json!({ "error": message, "code": code }))).into_response()
}
