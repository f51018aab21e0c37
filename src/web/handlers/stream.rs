//! Live attendance over SSE: one snapshot, then deltas until the
//! callout locks or the client disconnects.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

use crate::app::AppState;
use crate::error::ApiError;
use crate::live::LiveEvent;
use crate::models::attendance::AttendanceRow;
use crate::models::callout::Callout;
use crate::web::session::ObserverSession;

#[derive(Serialize)]
struct SnapshotPayload {
    callout: Callout,
    attendance: Vec<AttendanceRow>,
    /// Deltas at or below this sequence are already folded into the
    /// snapshot; the client applies only what comes after.
    sequence: u64,
}

pub async fn callout_stream(
    ObserverSession(brigade): ObserverSession,
    State(state): State<AppState>,
    Path((_slug, callout_id)): Path<(String, String)>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let mut callout = super::callouts::owned_callout(&state, &brigade, &callout_id).await?;

    // Subscribe before reading the snapshot. A delta published while
    // we read arrives on the receiver as well; the sequence watermark
    // keeps the client from applying it twice.
    let sub = if callout.is_locked() {
        None
    } else {
        let sub = state.live.subscribe(&brigade.id, &callout.id).await;
        // reload to catch a lock racing the subscription
        callout = super::callouts::owned_callout(&state, &brigade, &callout_id).await?;
        if callout.is_locked() {
            state.live.publish_locked(&brigade.id, &callout.id).await;
        }
        Some(sub)
    };

    let attendance = state.repo.list_attendance(&callout.id).await.map_err(|e| {
        tracing::error!(error = ?e, "failed to load attendance");
        ApiError::Internal
    })?;
    let watermark = sub.as_ref().map(|s| s.sequence).unwrap_or(0);
    let snapshot = SnapshotPayload {
        callout,
        attendance,
        sequence: watermark,
    };

    let keep_alive = KeepAlive::new()
        .interval(Duration::from_secs(state.config.stream.keep_alive_secs))
        .text("keep-alive");

    let stream = async_stream::stream! {
        yield Event::default().event("snapshot").json_data(&snapshot);

        match sub {
            None => {
                yield Event::default()
                    .event("locked")
                    .json_data(&json!({ "callout_id": snapshot.callout.id }));
            }
            Some(sub) => {
                let mut rx = sub.rx;
                loop {
                    match rx.recv().await {
                        Ok(LiveEvent::Delta(delta)) => {
                            if delta.sequence <= watermark {
                                continue;
                            }
                            yield Event::default().event("delta").json_data(&delta);
                        }
                        Ok(LiveEvent::Locked { callout_id }) => {
                            yield Event::default()
                                .event("locked")
                                .json_data(&json!({ "callout_id": callout_id }));
                            break;
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "live subscriber lagged, closing stream");
                            break;
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(keep_alive))
}
