// Shared between the integration test binaries; not every binary uses
// every helper.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header::CONTENT_TYPE, Request, Response};
use axum::Router;
use muster::app::{build_router, AppState};
use muster::config::{AppConfig, AuthCfg, DbCfg, ServerCfg, StreamCfg};
use muster::db;
use muster::models::brigade::Brigade;
use muster::models::{now_rfc3339, now_unix};
use muster::repos::sqlite::SqliteMusterRepo;
use muster::repos::MusterRepo;
use muster::security::hash_password;
use tempfile::TempDir;
use tower::ServiceExt; // for oneshot

pub const SUPER_USER: &str = "superadmin";
pub const SUPER_PASSWORD: &str = "sup3r-secret-pw";

pub struct TestApp {
    pub _dir: TempDir,
    pub state: AppState,
    pub router: Router,
}

pub fn init_test_app() -> anyhow::Result<TestApp> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("test.sqlite").display().to_string();

    let pool = db::make_pool(&db_path)?;
    {
        let mut conn = pool.get()?;
        db::run_migrations(&mut conn)?;
    }

    let config = AppConfig {
        server: ServerCfg {
            bind_addr: "127.0.0.1:0".into(),
        },
        db: DbCfg {
            url: db_path.clone(),
        },
        auth: AuthCfg {
            session_timeout_secs: 1800,
            superadmin_username: SUPER_USER.into(),
            superadmin_password_hash: Some(hash_password(SUPER_PASSWORD)?),
        },
        stream: StreamCfg {
            keep_alive_secs: 15,
            channel_capacity: 64,
        },
    };

    let repo: Arc<dyn MusterRepo> = SqliteMusterRepo::new(pool);
    let state = AppState::new(config, repo);
    let router = build_router(state.clone());
    Ok(TestApp {
        _dir: dir,
        state,
        router,
    })
}

/// Insert a brigade directly through the repo so tests that are not
/// about the super-admin surface can skip it.
pub async fn seed_brigade(state: &AppState, slug: &str, pin: &str, admin_password: &str) -> Brigade {
    let brigade = Brigade {
        id: uuid::Uuid::new_v4().to_string(),
        slug: slug.to_string(),
        name: format!("{slug} volunteer brigade"),
        pin_hash: hash_password(pin).expect("hash pin"),
        admin_password_hash: hash_password(admin_password).expect("hash password"),
        created_at: now_rfc3339(),
    };
    assert!(state
        .repo
        .create_brigade(brigade.clone())
        .await
        .expect("create brigade"));
    brigade
}

pub async fn pin_login(app: &TestApp, slug: &str, pin: &str) -> Response<Body> {
    post_json(
        &app.router,
        &format!("/b/{slug}/login"),
        serde_json::json!({ "pin": pin }),
    )
    .await
}

pub async fn admin_login(app: &TestApp, slug: &str, password: &str) -> Response<Body> {
    post_json(
        &app.router,
        &format!("/b/{slug}/admin/login"),
        serde_json::json!({ "password": password }),
    )
    .await
}

pub async fn super_login(app: &TestApp) -> Response<Body> {
    post_json(
        &app.router,
        "/admin/login",
        serde_json::json!({ "username": SUPER_USER, "password": SUPER_PASSWORD }),
    )
    .await
}

/// POST a JSON body. Requests carry an `Accept: application/json`
/// header so unauthenticated failures come back as structured errors
/// rather than login redirects.
pub async fn post_json(
    router: &Router,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    router
        .clone()
        .oneshot(
            Request::post(uri)
                .header(CONTENT_TYPE, "application/json")
                .header("accept", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn get_json(router: &Router, uri: &str) -> Response<Body> {
    router
        .clone()
        .oneshot(
            Request::get(uri)
                .header("accept", "application/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn delete_json(router: &Router, uri: &str) -> Response<Body> {
    router
        .clone()
        .oneshot(
            Request::delete(uri)
                .header("accept", "application/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

/// POST with a bearer token, the shape integration clients use.
pub async fn post_bearer(
    router: &Router,
    uri: &str,
    secret: &str,
    body: serde_json::Value,
) -> Response<Body> {
    router
        .clone()
        .oneshot(
            Request::post(uri)
                .header(CONTENT_TYPE, "application/json")
                .header("authorization", format!("Bearer {secret}"))
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn get_bearer(router: &Router, uri: &str, secret: &str) -> Response<Body> {
    router
        .clone()
        .oneshot(
            Request::get(uri)
                .header("authorization", format!("Bearer {secret}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn read_json(res: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(res.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Log in as admin and mint a token in one move; returns the plaintext
/// secret alongside the response body.
pub async fn issue_token(
    app: &TestApp,
    slug: &str,
    admin_password: &str,
    permissions: &str,
    window_seconds: i32,
    max_requests: i32,
) -> serde_json::Value {
    let res = admin_login(app, slug, admin_password).await;
    assert_eq!(res.status(), axum::http::StatusCode::NO_CONTENT);
    let res = post_json(
        &app.router,
        &format!("/b/{slug}/admin/tokens"),
        serde_json::json!({
            "name": "integration",
            "permissions": permissions,
            "window_seconds": window_seconds,
            "max_requests": max_requests,
        }),
    )
    .await;
    assert_eq!(res.status(), axum::http::StatusCode::CREATED);
    read_json(res).await
}

/// Backdate a session's activity clock; drives the sliding-timeout
/// scenarios without sleeping.
pub async fn age_session(
    state: &AppState,
    tier: muster::auth::sessions::Tier,
    slug: &str,
    seconds: i64,
) {
    state
        .sessions
        .login(tier, slug, now_unix() - seconds)
        .await;
}
