use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerCfg {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbCfg {
    /// SQLite database path, e.g. muster.db
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthCfg {
    /// Sliding inactivity timeout for admin and super-admin sessions,
    /// in seconds.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: i64,
    #[serde(default = "default_superadmin_username")]
    pub superadmin_username: String,
    /// Argon2 hash of the super-admin password. Login for that tier is
    /// disabled while unset.
    #[serde(default)]
    pub superadmin_password_hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamCfg {
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// Broadcast buffer per callout channel. A subscriber that falls
    /// this far behind is disconnected and must resnapshot.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerCfg,
    pub db: DbCfg,
    pub auth: AuthCfg,
    pub stream: StreamCfg,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_session_timeout_secs() -> i64 {
    1800
}
fn default_superadmin_username() -> String {
    "superadmin".to_string()
}
fn default_keep_alive_secs() -> u64 {
    15
}
fn default_channel_capacity() -> usize {
    64
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let settings = config::Config::builder()
            .add_source(config::Environment::default().separator("_"))
            .build()?;

        // Map flat env names to nested structure for convenience
        // APP_BIND_ADDR, DATABASE_URL, SESSION_TIMEOUT_SECS,
        // SUPERADMIN_USERNAME, SUPERADMIN_PASSWORD_HASH,
        // STREAM_KEEP_ALIVE_SECS, STREAM_CHANNEL_CAPACITY
        let server = settings.get::<ServerCfg>("server").unwrap_or(ServerCfg {
            bind_addr: std::env::var("APP_BIND_ADDR").unwrap_or_else(|_| default_bind_addr()),
        });

        let db = settings.get::<DbCfg>("db").unwrap_or(DbCfg {
            url: std::env::var("DATABASE_URL")?,
        });

        let auth = settings.get::<AuthCfg>("auth").unwrap_or(AuthCfg {
            session_timeout_secs: std::env::var("SESSION_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_session_timeout_secs),
            superadmin_username: std::env::var("SUPERADMIN_USERNAME")
                .unwrap_or_else(|_| default_superadmin_username()),
            superadmin_password_hash: std::env::var("SUPERADMIN_PASSWORD_HASH").ok(),
        });
        if auth.superadmin_password_hash.is_none() {
            tracing::warn!(
                "SUPERADMIN_PASSWORD_HASH not provided; super-admin login is disabled."
            );
        }

        let stream = settings.get::<StreamCfg>("stream").unwrap_or(StreamCfg {
            keep_alive_secs: std::env::var("STREAM_KEEP_ALIVE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_keep_alive_secs),
            channel_capacity: std::env::var("STREAM_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_channel_capacity),
        });

        Ok(AppConfig {
            server,
            db,
            auth,
            stream,
        })
    }
}
