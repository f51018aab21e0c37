//! Client-side mutation queue for devices that go offline mid-shift.
//!
//! Writes the server never answers are parked in a durable local log
//! and replayed strictly in enqueue order once connectivity returns.
//! Application-level rejections are never queued; the server's answer
//! is surfaced to the caller as-is. Replay relies on the server
//! tolerating duplicate delivery, since an acknowledgment can be lost
//! after the mutation applied.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Method;
use thiserror::Error;

use crate::models::now_rfc3339;

pub mod store;

use store::{NewQueuedMutation, QueueStore, QueuedMutation};

#[derive(Debug, Error)]
pub enum QueueError {
    /// A read was attempted while the network is unreachable. Reads
    /// are never queued.
    #[error("network unreachable")]
    Offline,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("queue storage error: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for QueueError {
    fn from(e: anyhow::Error) -> Self {
        QueueError::Storage(e.to_string())
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// The server answered. Rejections travel in the response; they
    /// are never queued.
    Delivered(reqwest::Response),
    /// The server never answered; the request is parked locally.
    Queued,
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub delivered: usize,
    /// Entries abandoned after a permanent (4xx) rejection, kept in
    /// the log for manual resolution.
    pub abandoned: usize,
    /// Entries still queued for the next trigger.
    pub remaining: usize,
}

pub struct OfflineQueue {
    store: QueueStore,
    http: reqwest::Client,
}

impl OfflineQueue {
    /// `request_timeout` bounds every request the queue sends. A
    /// server that accepts the connection and then goes silent counts
    /// as a network failure once the deadline passes.
    pub fn open(database_url: &str, request_timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            store: QueueStore::open(database_url)?,
            http: reqwest::Client::builder().timeout(request_timeout).build()?,
        })
    }

    /// Send one request. A mutation the server never answers is
    /// enqueued and reported as `Queued`; a read in the same situation
    /// fails with `QueueError::Offline` so the caller can degrade
    /// instead of hanging.
    pub async fn submit(
        &self,
        method: Method,
        url: &str,
        headers: &HashMap<String, String>,
        body: Option<&str>,
    ) -> Result<SubmitOutcome, QueueError> {
        let mut req = self.http.request(method.clone(), url);
        for (name, value) in headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            req = req.body(body.to_string());
        }
        match req.send().await {
            Ok(resp) => Ok(SubmitOutcome::Delivered(resp)),
            Err(e) if is_network_error(&e) => {
                if method == Method::GET {
                    return Err(QueueError::Offline);
                }
                self.store
                    .enqueue(NewQueuedMutation {
                        url: url.to_string(),
                        method: method.as_str().to_string(),
                        headers: serde_json::to_string(headers)?,
                        body: body.map(str::to_string),
                        enqueued_at: now_rfc3339(),
                    })
                    .await?;
                Ok(SubmitOutcome::Queued)
            }
            Err(e) => Err(QueueError::Http(e)),
        }
    }

    /// Replay parked entries in enqueue order. A delivered entry is
    /// removed; a 4xx rejection abandons the entry without blocking
    /// the ones behind it; a 5xx or an unanswered request ends the
    /// pass with the entry still at the head for the next trigger.
    /// An entry that cannot be sent at all is abandoned like a
    /// rejection.
    pub async fn drain(&self) -> Result<DrainReport, QueueError> {
        let pending = self.store.pending().await?;
        let mut report = DrainReport {
            delivered: 0,
            abandoned: 0,
            remaining: pending.len(),
        };
        for entry in pending {
            let headers: HashMap<String, String> = serde_json::from_str(&entry.headers)?;
            let Ok(method) = Method::from_bytes(entry.method.as_bytes()) else {
                self.store.mark_failed(entry.id, "invalid method").await?;
                report.abandoned += 1;
                report.remaining -= 1;
                continue;
            };
            let mut req = self.http.request(method, &entry.url);
            for (name, value) in &headers {
                req = req.header(name.as_str(), value.as_str());
            }
            if let Some(body) = &entry.body {
                req = req.body(body.clone());
            }
            match req.send().await {
                Err(e) if is_network_error(&e) => break,
                Err(e) => {
                    // only a request that cannot be built lands here;
                    // it would fail the same way on every pass
                    self.store.mark_failed(entry.id, &e.to_string()).await?;
                    report.abandoned += 1;
                    report.remaining -= 1;
                }
                Ok(resp) if resp.status().is_success() => {
                    self.store.remove(entry.id).await?;
                    report.delivered += 1;
                    report.remaining -= 1;
                }
                Ok(resp) if resp.status().is_client_error() => {
                    self.store
                        .mark_failed(entry.id, &format!("HTTP {}", resp.status()))
                        .await?;
                    report.abandoned += 1;
                    report.remaining -= 1;
                }
                Ok(_) => break,
            }
        }
        Ok(report)
    }

    pub async fn pending(&self) -> Result<Vec<QueuedMutation>, QueueError> {
        Ok(self.store.pending().await?)
    }

    pub async fn failed_entries(&self) -> Result<Vec<QueuedMutation>, QueueError> {
        Ok(self.store.failed_entries().await?)
    }
}

/// A failure carrying no HTTP status means the server never answered,
/// so the request may or may not have applied. A connection dropped
/// after the request was written classifies the same as a refused
/// connect or a timeout. Errors from building the request itself are
/// the caller's, not the network's.
fn is_network_error(e: &reqwest::Error) -> bool {
    !e.is_builder() && e.status().is_none()
}
