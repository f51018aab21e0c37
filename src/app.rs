use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::auth::sessions::SessionStore;
use crate::auth::tokens::TokenAuth;
use crate::config::AppConfig;
use crate::live::LiveChannels;
use crate::repos::MusterRepo;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub repo: Arc<dyn MusterRepo>,
    pub sessions: Arc<SessionStore>,
    pub tokens: TokenAuth,
    pub live: Arc<LiveChannels>,
}

impl AppState {
    pub fn new(config: AppConfig, repo: Arc<dyn MusterRepo>) -> Self {
        let sessions = Arc::new(SessionStore::new(config.auth.session_timeout_secs));
        let tokens = TokenAuth::new(repo.clone());
        let live = Arc::new(LiveChannels::new(config.stream.channel_capacity));
        Self {
            config,
            repo,
            sessions,
            tokens,
            live,
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    // logging
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize DB pool and run migrations eagerly on startup
    let pool = crate::db::make_pool(&config.db.url)?;
    {
        let mut conn = pool.get()?;
        crate::db::run_migrations(&mut conn)?;
    }

    let repo: Arc<dyn MusterRepo> = crate::repos::sqlite::SqliteMusterRepo::new(pool);
    let state = AppState::new(config.clone(), repo);

    let app = build_router(state);

    let addr = config.server.bind_addr.clone();
    tracing::info!(%addr, "listening");
    // Axum 0.8 uses hyper directly for serving
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        // member kiosk
        .route("/b/{slug}/login", post(crate::web::handlers::auth::pin_login))
        .route("/b/{slug}/logout", post(crate::web::handlers::auth::pin_logout))
        .route("/b/{slug}/callout", get(crate::web::handlers::attendance::active_callout))
        .route("/b/{slug}/attendance", post(crate::web::handlers::attendance::pin_mark))
        .route(
            "/b/{slug}/callouts/{id}/stream",
            get(crate::web::handlers::stream::callout_stream),
        )
        // brigade admin
        .route("/b/{slug}/admin/login", post(crate::web::handlers::auth::admin_login))
        .route("/b/{slug}/admin/logout", post(crate::web::handlers::auth::admin_logout))
        .route(
            "/b/{slug}/admin/members",
            get(crate::web::handlers::members::list_members)
                .post(crate::web::handlers::members::create_member),
        )
        .route(
            "/b/{slug}/admin/members/{id}",
            delete(crate::web::handlers::members::deactivate_member),
        )
        .route(
            "/b/{slug}/admin/callouts",
            get(crate::web::handlers::callouts::list_callouts)
                .post(crate::web::handlers::callouts::create_callout),
        )
        .route(
            "/b/{slug}/admin/callouts/{id}/submit",
            post(crate::web::handlers::callouts::submit_callout),
        )
        .route(
            "/b/{slug}/admin/callouts/{id}/lock",
            post(crate::web::handlers::callouts::lock_callout),
        )
        .route(
            "/b/{slug}/admin/callouts/{id}/attendance",
            post(crate::web::handlers::attendance::admin_mark),
        )
        .route(
            "/b/{slug}/admin/tokens",
            get(crate::web::handlers::tokens::list_tokens)
                .post(crate::web::handlers::tokens::create_token),
        )
        .route(
            "/b/{slug}/admin/tokens/{id}",
            delete(crate::web::handlers::tokens::revoke_token),
        )
        .route("/b/{slug}/admin/audit", get(crate::web::handlers::tokens::list_audit))
        // super admin
        .route("/admin/login", post(crate::web::handlers::auth::super_login))
        .route("/admin/logout", post(crate::web::handlers::auth::super_logout))
        .route(
            "/admin/brigades",
            get(crate::web::handlers::brigades::list_brigades)
                .post(crate::web::handlers::brigades::create_brigade),
        )
        // bearer token API
        .route(
            "/api/{slug}/musters",
            get(crate::web::handlers::api::list_musters)
                .post(crate::web::handlers::api::create_muster),
        )
        .route(
            "/api/{slug}/musters/{id}/attendance",
            get(crate::web::handlers::api::get_attendance)
                .post(crate::web::handlers::api::create_attendance),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
