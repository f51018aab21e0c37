//! Fixed-window request counter, one window per API token.
//!
//! The outer map lock is held only to fetch or create a token's window
//! cell; counting happens under that token's own mutex, so a busy
//! token never serializes requests for other tokens.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

/// Outcome of one rate-limit check, with the values the response
/// headers need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Epoch seconds at which the current window ends.
    pub reset: i64,
}

#[derive(Debug)]
struct Window {
    window_start: i64,
    count: u32,
}

#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Arc<Mutex<Window>>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request against the token's window. The first request
    /// at or past the window end starts a fresh window; a denied
    /// request does not consume anything.
    pub async fn check(
        &self,
        token_id: &str,
        max_requests: u32,
        window_seconds: i64,
        now: i64,
    ) -> RateDecision {
        let cell = {
            let mut windows = self.windows.lock().await;
            windows
                .entry(token_id.to_string())
                .or_insert_with(|| {
                    Arc::new(Mutex::new(Window {
                        window_start: now,
                        count: 0,
                    }))
                })
                .clone()
        };

        let mut window = cell.lock().await;
        if now - window.window_start >= window_seconds {
            window.window_start = now;
            window.count = 0;
        }
        let reset = window.window_start + window_seconds;
        if window.count >= max_requests {
            return RateDecision {
                allowed: false,
                limit: max_requests,
                remaining: 0,
                reset,
            };
        }
        window.count += 1;
        RateDecision {
            allowed: true,
            limit: max_requests,
            remaining: max_requests - window.count,
            reset,
        }
    }
}
