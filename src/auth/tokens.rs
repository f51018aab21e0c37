//! Bearer-token verification and per-request authorization.

use std::sync::Arc;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use uuid::Uuid;

use crate::auth::rate::{RateDecision, RateLimiter};
use crate::error::ApiError;
use crate::models::api_token::{ApiToken, Permission};
use crate::models::audit::AuditRecord;
use crate::models::brigade::Brigade;
use crate::models::now_rfc3339;
use crate::repos::MusterRepo;
use crate::security::hash_secret;

#[derive(Clone)]
pub struct TokenAuth {
    repo: Arc<dyn MusterRepo>,
    limiter: Arc<RateLimiter>,
}

impl TokenAuth {
    pub fn new(repo: Arc<dyn MusterRepo>) -> Self {
        Self {
            repo,
            limiter: Arc::new(RateLimiter::new()),
        }
    }

    /// Look up a presented secret by its SHA-256 hash. Revoked tokens
    /// verify as absent.
    pub async fn verify(&self, secret: &str) -> anyhow::Result<Option<ApiToken>> {
        let hash = hash_secret(secret);
        let Some(token) = self.repo.get_api_token_by_hash(&hash).await? else {
            return Ok(None);
        };
        if token.is_revoked() {
            return Ok(None);
        }
        Ok(Some(token))
    }

    /// Authorize one bearer request against a brigade. Checks run in a
    /// fixed order and the first failure wins: token identity, then
    /// brigade ownership (a foreign token is indistinguishable from an
    /// unknown one), then the rate limit, then the permission. Success
    /// writes an audit row and touches `last_used_at`.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        brigade: &Brigade,
        permission: Permission,
        endpoint: &str,
        method: &str,
        now: i64,
    ) -> Result<(ApiToken, RateDecision), ApiError> {
        let secret = bearer_secret(headers).ok_or(ApiError::InvalidToken)?;
        let token = match self.verify(secret).await {
            Ok(Some(token)) => token,
            Ok(None) => return Err(ApiError::InvalidToken),
            Err(e) => {
                tracing::error!(error = ?e, "token lookup failed");
                return Err(ApiError::Internal);
            }
        };
        if token.brigade_id != brigade.id {
            return Err(ApiError::InvalidToken);
        }

        let decision = self
            .limiter
            .check(
                &token.id,
                token.max_requests.max(0) as u32,
                i64::from(token.window_seconds),
                now,
            )
            .await;
        if !decision.allowed {
            return Err(ApiError::RateLimited {
                limit: decision.limit,
                reset: decision.reset,
                retry_after: (decision.reset - now).max(0),
            });
        }

        if !token.has_permission(permission) {
            return Err(ApiError::InsufficientScope(permission));
        }

        let record = AuditRecord {
            id: Uuid::new_v4().to_string(),
            brigade_id: brigade.id.clone(),
            token_id: token.id.clone(),
            token_name: token.name.clone(),
            permission: permission.as_str().to_string(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
            created_at: now_rfc3339(),
        };
        if let Err(e) = self.repo.append_audit(record).await {
            tracing::error!(error = ?e, "failed to append audit record");
        }

        // Update last used timestamp (fire and forget)
        let repo = self.repo.clone();
        let token_id = token.id.clone();
        tokio::spawn(async move {
            let _ = repo.update_api_token_last_used(&token_id).await;
        });

        Ok((token, decision))
    }
}

fn bearer_secret(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
