use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt; // for oneshot

#[path = "common.rs"]
mod common;

async fn open_stream(router: &axum::Router, uri: &str) -> Response<Body> {
    router
        .clone()
        .oneshot(
            Request::get(uri)
                .header("accept", "text/event-stream")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Pull frames off the SSE body until `count` named events have been
/// parsed. Keep-alive comments are skipped.
async fn read_events(body: &mut Body, count: usize) -> Vec<(String, serde_json::Value)> {
    let mut buf = String::new();
    let mut events = Vec::new();
    while events.len() < count {
        let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
            .await
            .expect("timed out waiting for an sse frame")
            .expect("stream ended before all events arrived")
            .expect("frame error");
        if let Some(data) = frame.data_ref() {
            buf.push_str(std::str::from_utf8(data).unwrap());
        }
        while let Some(pos) = buf.find("\n\n") {
            let raw: String = buf.drain(..pos + 2).collect();
            if let Some(event) = parse_event(&raw) {
                events.push(event);
            }
        }
    }
    events
}

fn parse_event(raw: &str) -> Option<(String, serde_json::Value)> {
    let mut name = None;
    let mut data = String::new();
    for line in raw.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            name = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            data.push_str(rest.trim());
        }
    }
    let value = serde_json::from_str(&data).ok()?;
    Some((name?, value))
}

async fn expect_stream_end(body: &mut Body) {
    let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
        .await
        .expect("timed out waiting for the stream to end");
    assert!(frame.is_none(), "stream kept going after its terminal event");
}

struct Fixture {
    app: common::TestApp,
    member_id: String,
    callout_id: String,
}

async fn fixture() -> Fixture {
    let app = common::init_test_app().expect("init app");
    common::seed_brigade(&app.state, "pukekohe", "4217", "station-admin-pw").await;

    let res = common::admin_login(&app, "pukekohe", "station-admin-pw").await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = common::post_json(
        &app.router,
        "/b/pukekohe/admin/members",
        json!({ "name": "Aroha Ngata" }),
    )
    .await;
    let member_id = common::read_json(res).await["id"]
        .as_str()
        .unwrap()
        .to_string();
    let res = common::post_json(
        &app.router,
        "/b/pukekohe/admin/callouts",
        json!({ "icad_number": "F3210456" }),
    )
    .await;
    let callout_id = common::read_json(res).await["id"]
        .as_str()
        .unwrap()
        .to_string();

    let res = common::pin_login(&app, "pukekohe", "4217").await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    Fixture {
        app,
        member_id,
        callout_id,
    }
}

async fn mark(fx: &Fixture, truck: &str) {
    let res = common::post_json(
        &fx.app.router,
        "/b/pukekohe/attendance",
        json!({
            "member_id": fx.member_id,
            "truck_id": truck,
            "position_id": "officer",
            "status": "responding",
        }),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn subscriber_sees_snapshot_then_ordered_deltas() {
    let fx = fixture().await;

    let res = open_stream(
        &fx.app.router,
        &format!("/b/pukekohe/callouts/{}/stream", fx.callout_id),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    let mut body = res.into_body();

    // Mutations land after the subscription is live
    mark(&fx, "pump-1").await;
    mark(&fx, "pump-2").await;

    let events = read_events(&mut body, 3).await;
    assert_eq!(events[0].0, "snapshot");
    assert_eq!(events[0].1["sequence"], 0);
    assert_eq!(events[0].1["attendance"].as_array().unwrap().len(), 0);
    assert_eq!(events[0].1["callout"]["id"].as_str().unwrap(), fx.callout_id);

    assert_eq!(events[1].0, "delta");
    assert_eq!(events[1].1["op"], "added");
    assert_eq!(events[1].1["sequence"], 1);
    assert_eq!(events[1].1["truck_id"], "pump-1");

    assert_eq!(events[2].0, "delta");
    assert_eq!(events[2].1["op"], "moved");
    assert_eq!(events[2].1["sequence"], 2);
    assert_eq!(events[2].1["truck_id"], "pump-2");
}

#[tokio::test]
async fn late_subscriber_starts_from_a_consistent_snapshot() {
    let fx = fixture().await;

    // Two deltas happen before anyone is listening
    mark(&fx, "pump-1").await;
    mark(&fx, "pump-2").await;

    let res = open_stream(
        &fx.app.router,
        &format!("/b/pukekohe/callouts/{}/stream", fx.callout_id),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let mut body = res.into_body();

    mark(&fx, "tanker-1").await;

    // The snapshot already folds in sequences 1 and 2; only the later
    // delta streams
    let events = read_events(&mut body, 2).await;
    assert_eq!(events[0].0, "snapshot");
    assert_eq!(events[0].1["sequence"], 2);
    let attendance = events[0].1["attendance"].as_array().unwrap();
    assert_eq!(attendance.len(), 1);
    assert_eq!(attendance[0]["truck_id"], "pump-2");

    assert_eq!(events[1].0, "delta");
    assert_eq!(events[1].1["sequence"], 3);
    assert_eq!(events[1].1["truck_id"], "tanker-1");
}

#[tokio::test]
async fn locking_terminates_the_stream() {
    let fx = fixture().await;

    let res = open_stream(
        &fx.app.router,
        &format!("/b/pukekohe/callouts/{}/stream", fx.callout_id),
    )
    .await;
    let mut body = res.into_body();

    mark(&fx, "pump-1").await;
    let res = common::post_json(
        &fx.app.router,
        &format!("/b/pukekohe/admin/callouts/{}/lock", fx.callout_id),
        json!({}),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let events = read_events(&mut body, 3).await;
    assert_eq!(events[0].0, "snapshot");
    assert_eq!(events[1].0, "delta");
    assert_eq!(events[2].0, "locked");
    assert_eq!(events[2].1["callout_id"].as_str().unwrap(), fx.callout_id);

    expect_stream_end(&mut body).await;
}

#[tokio::test]
async fn already_locked_callout_streams_snapshot_then_locked() {
    let fx = fixture().await;

    mark(&fx, "pump-1").await;
    let res = common::post_json(
        &fx.app.router,
        &format!("/b/pukekohe/admin/callouts/{}/lock", fx.callout_id),
        json!({}),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = open_stream(
        &fx.app.router,
        &format!("/b/pukekohe/callouts/{}/stream", fx.callout_id),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let mut body = res.into_body();

    let events = read_events(&mut body, 2).await;
    assert_eq!(events[0].0, "snapshot");
    assert_eq!(events[0].1["attendance"].as_array().unwrap().len(), 1);
    assert_eq!(events[1].0, "locked");

    expect_stream_end(&mut body).await;
}

#[tokio::test]
async fn streams_are_guarded_like_any_observer_surface() {
    let app = common::init_test_app().expect("init app");
    common::seed_brigade(&app.state, "pukekohe", "4217", "station-admin-pw").await;
    common::seed_brigade(&app.state, "waiuku", "8844", "other-admin-pw").await;

    // No session: an event-stream client gets a structured 401
    let res = open_stream(&app.router, "/b/pukekohe/callouts/whatever/stream").await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // With a session: unknown callout is a 404
    let res = common::pin_login(&app, "pukekohe", "4217").await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = open_stream(&app.router, "/b/pukekohe/callouts/whatever/stream").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Another brigade's callout is invisible through this slug
    let res = common::admin_login(&app, "waiuku", "other-admin-pw").await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = common::post_json(
        &app.router,
        "/b/waiuku/admin/callouts",
        json!({ "icad_number": "F9990001" }),
    )
    .await;
    let foreign_id = common::read_json(res).await["id"]
        .as_str()
        .unwrap()
        .to_string();
    let res = open_stream(
        &app.router,
        &format!("/b/pukekohe/callouts/{foreign_id}/stream"),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
