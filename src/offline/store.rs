//! Durable local log backing the offline queue. Lives in its own
//! SQLite file on the submitting device, separate from the server
//! database.

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use serde::Serialize;

diesel::table! {
    queued_mutations (id) {
        id -> Integer,
        url -> Text,
        method -> Text,
        headers -> Text,
        body -> Nullable<Text>,
        enqueued_at -> Text,
        failed_at -> Nullable<Text>,
        failure -> Nullable<Text>,
    }
}

pub const QUEUE_MIGRATIONS: EmbeddedMigrations = embed_migrations!("offline_migrations");

/// One parked request. `id` is the AUTOINCREMENT drain cursor; replay
/// order is ascending `id`.
#[derive(Debug, Clone, Queryable, Serialize)]
pub struct QueuedMutation {
    pub id: i32,
    pub url: String,
    pub method: String,
    /// JSON object of header name to value.
    pub headers: String,
    pub body: Option<String>,
    pub enqueued_at: String,
    pub failed_at: Option<String>,
    pub failure: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = queued_mutations)]
pub struct NewQueuedMutation {
    pub url: String,
    pub method: String,
    pub headers: String,
    pub body: Option<String>,
    pub enqueued_at: String,
}

pub struct QueueStore {
    pool: Pool<ConnectionManager<SqliteConnection>>,
}

impl QueueStore {
    pub fn open(database_url: &str) -> anyhow::Result<Self> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder().max_size(2).build(manager)?;
        {
            let mut conn = pool.get()?;
            if let Err(e) = conn.run_pending_migrations(QUEUE_MIGRATIONS) {
                return Err(anyhow::anyhow!(e.to_string()));
            }
        }
        Ok(Self { pool })
    }

    pub async fn enqueue(&self, entry: NewQueuedMutation) -> anyhow::Result<()> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let mut conn = pool.get()?;
            diesel::insert_into(queued_mutations::table)
                .values(&entry)
                .execute(&mut conn)?;
            Ok(())
        })
        .await??;
        Ok(())
    }

    /// Entries still awaiting replay, in enqueue order.
    pub async fn pending(&self) -> anyhow::Result<Vec<QueuedMutation>> {
        let pool = self.pool.clone();
        let entries = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<QueuedMutation>> {
            let mut conn = pool.get()?;
            let rows = queued_mutations::table
                .filter(queued_mutations::failed_at.is_null())
                .order(queued_mutations::id.asc())
                .load::<QueuedMutation>(&mut conn)?;
            Ok(rows)
        })
        .await??;
        Ok(entries)
    }

    /// Entries abandoned after a permanent rejection, kept for manual
    /// resolution.
    pub async fn failed_entries(&self) -> anyhow::Result<Vec<QueuedMutation>> {
        let pool = self.pool.clone();
        let entries = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<QueuedMutation>> {
            let mut conn = pool.get()?;
            let rows = queued_mutations::table
                .filter(queued_mutations::failed_at.is_not_null())
                .order(queued_mutations::id.asc())
                .load::<QueuedMutation>(&mut conn)?;
            Ok(rows)
        })
        .await??;
        Ok(entries)
    }

    pub async fn remove(&self, entry_id: i32) -> anyhow::Result<usize> {
        let pool = self.pool.clone();
        let n = tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
            let mut conn = pool.get()?;
            let n = diesel::delete(
                queued_mutations::table.filter(queued_mutations::id.eq(entry_id)),
            )
            .execute(&mut conn)?;
            Ok(n)
        })
        .await??;
        Ok(n)
    }

    pub async fn mark_failed(&self, entry_id: i32, reason: &str) -> anyhow::Result<usize> {
        let reason = reason.to_string();
        let pool = self.pool.clone();
        let n = tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
            let mut conn = pool.get()?;
            let n = diesel::update(
                queued_mutations::table.filter(queued_mutations::id.eq(entry_id)),
            )
            .set((
                queued_mutations::failed_at.eq(crate::models::now_rfc3339()),
                queued_mutations::failure.eq(&reason),
            ))
            .execute(&mut conn)?;
            Ok(n)
        })
        .await??;
        Ok(n)
    }
}
