use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::OptionalExtension;

use crate::models::{
    api_token::ApiToken,
    attendance::{AttendanceChange, AttendanceRow},
    audit::AuditRecord,
    brigade::Brigade,
    callout::Callout,
    member::Member,
    now_rfc3339,
};
use crate::repos::{BrigadeOverview, MusterRepo};
use crate::schema::{api_tokens, attendance_entries, audit_log, brigades, callouts, members};

pub struct SqliteMusterRepo {
    pool: crate::db::SqlitePool,
}

impl SqliteMusterRepo {
    pub fn new(pool: crate::db::SqlitePool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl MusterRepo for SqliteMusterRepo {
    async fn create_brigade(&self, brigade: Brigade) -> anyhow::Result<bool> {
        let pool = self.pool.clone();
        let created = tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
            let mut conn = pool.get()?;
            conn.immediate_transaction(|conn| {
                let taken = brigades::table
                    .filter(brigades::slug.eq(&brigade.slug))
                    .select(brigades::id)
                    .first::<String>(conn)
                    .optional()?
                    .is_some();
                if taken {
                    return Ok(false);
                }
                diesel::insert_into(brigades::table)
                    .values(&brigade)
                    .execute(conn)?;
                Ok(true)
            })
        })
        .await??;
        Ok(created)
    }

    async fn get_brigade_by_slug(&self, slug: &str) -> anyhow::Result<Option<Brigade>> {
        let slug = slug.to_string();
        let pool = self.pool.clone();
        let brigade = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<Brigade>> {
            let mut conn = pool.get()?;
            let b = brigades::table
                .filter(brigades::slug.eq(&slug))
                .first::<Brigade>(&mut conn)
                .optional()?;
            Ok(b)
        })
        .await??;
        Ok(brigade)
    }

    async fn list_brigade_overviews(&self) -> anyhow::Result<Vec<BrigadeOverview>> {
        let pool = self.pool.clone();
        let overviews = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<BrigadeOverview>> {
            let mut conn = pool.get()?;
            use diesel::dsl::count_star;
            let rows = brigades::table
                .order(brigades::slug.asc())
                .load::<Brigade>(&mut conn)?;
            let mut out = Vec::with_capacity(rows.len());
            for brigade in rows {
                let member_count: i64 = members::table
                    .filter(members::brigade_id.eq(&brigade.id))
                    .select(count_star())
                    .first(&mut conn)?;
                let callout_count: i64 = callouts::table
                    .filter(callouts::brigade_id.eq(&brigade.id))
                    .select(count_star())
                    .first(&mut conn)?;
                out.push(BrigadeOverview {
                    brigade,
                    member_count,
                    callout_count,
                });
            }
            Ok(out)
        })
        .await??;
        Ok(overviews)
    }

    async fn create_member(&self, member: Member) -> anyhow::Result<()> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let mut conn = pool.get()?;
            diesel::insert_into(members::table)
                .values(&member)
                .execute(&mut conn)?;
            Ok(())
        })
        .await??;
        Ok(())
    }

    async fn list_members(
        &self,
        brigade_id: &str,
        include_inactive: bool,
    ) -> anyhow::Result<Vec<Member>> {
        let brigade_id = brigade_id.to_string();
        let pool = self.pool.clone();
        let list = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<Member>> {
            let mut conn = pool.get()?;
            let mut query = members::table
                .filter(members::brigade_id.eq(&brigade_id))
                .into_boxed();
            if !include_inactive {
                query = query.filter(members::active.eq(1));
            }
            let rows = query.order(members::name.asc()).load::<Member>(&mut conn)?;
            Ok(rows)
        })
        .await??;
        Ok(list)
    }

    async fn get_member(&self, id: &str) -> anyhow::Result<Option<Member>> {
        let id = id.to_string();
        let pool = self.pool.clone();
        let member = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<Member>> {
            let mut conn = pool.get()?;
            let m = members::table
                .find(id)
                .first::<Member>(&mut conn)
                .optional()?;
            Ok(m)
        })
        .await??;
        Ok(member)
    }

    async fn deactivate_member(&self, id: &str, brigade_id: &str) -> anyhow::Result<usize> {
        let id = id.to_string();
        let brigade_id = brigade_id.to_string();
        let pool = self.pool.clone();
        let n = tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
            let mut conn = pool.get()?;
            let n = diesel::update(
                members::table
                    .filter(members::id.eq(&id))
                    .filter(members::brigade_id.eq(&brigade_id)),
            )
            .set(members::active.eq(0))
            .execute(&mut conn)?;
            Ok(n)
        })
        .await??;
        Ok(n)
    }

    async fn create_callout(&self, callout: Callout) -> anyhow::Result<(Callout, bool)> {
        let pool = self.pool.clone();
        let res = tokio::task::spawn_blocking(move || -> anyhow::Result<(Callout, bool)> {
            let mut conn = pool.get()?;
            conn.immediate_transaction(|conn| {
                let existing = callouts::table
                    .filter(callouts::brigade_id.eq(&callout.brigade_id))
                    .filter(callouts::icad_number.eq(&callout.icad_number))
                    .first::<Callout>(conn)
                    .optional()?;
                if let Some(existing) = existing {
                    return Ok((existing, false));
                }
                diesel::insert_into(callouts::table)
                    .values(&callout)
                    .execute(conn)?;
                Ok((callout, true))
            })
        })
        .await??;
        Ok(res)
    }

    async fn get_callout(&self, id: &str) -> anyhow::Result<Option<Callout>> {
        let id = id.to_string();
        let pool = self.pool.clone();
        let callout = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<Callout>> {
            let mut conn = pool.get()?;
            let c = callouts::table
                .find(id)
                .first::<Callout>(&mut conn)
                .optional()?;
            Ok(c)
        })
        .await??;
        Ok(callout)
    }

    async fn active_callout(&self, brigade_id: &str) -> anyhow::Result<Option<Callout>> {
        let brigade_id = brigade_id.to_string();
        let pool = self.pool.clone();
        let callout = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<Callout>> {
            let mut conn = pool.get()?;
            let c = callouts::table
                .filter(callouts::brigade_id.eq(&brigade_id))
                .filter(callouts::status.ne(crate::models::callout::CalloutStatus::Locked.as_str()))
                .order(callouts::opened_at.desc())
                .first::<Callout>(&mut conn)
                .optional()?;
            Ok(c)
        })
        .await??;
        Ok(callout)
    }

    async fn list_callouts(&self, brigade_id: &str, limit: i64) -> anyhow::Result<Vec<Callout>> {
        let brigade_id = brigade_id.to_string();
        let pool = self.pool.clone();
        let list = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<Callout>> {
            let mut conn = pool.get()?;
            let rows = callouts::table
                .filter(callouts::brigade_id.eq(&brigade_id))
                .order(callouts::opened_at.desc())
                .limit(limit)
                .load::<Callout>(&mut conn)?;
            Ok(rows)
        })
        .await??;
        Ok(list)
    }

    async fn set_callout_status(&self, id: &str, status: &str) -> anyhow::Result<usize> {
        let id = id.to_string();
        let status = status.to_string();
        let pool = self.pool.clone();
        let n = tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
            let mut conn = pool.get()?;
            let n = diesel::update(callouts::table.find(&id))
                .set(callouts::status.eq(&status))
                .execute(&mut conn)?;
            Ok(n)
        })
        .await??;
        Ok(n)
    }

    async fn upsert_attendance(&self, entry: AttendanceRow) -> anyhow::Result<AttendanceChange> {
        let pool = self.pool.clone();
        let change = tokio::task::spawn_blocking(move || -> anyhow::Result<AttendanceChange> {
            let mut conn = pool.get()?;
            conn.immediate_transaction(|conn| {
                let existing = attendance_entries::table
                    .filter(attendance_entries::callout_id.eq(&entry.callout_id))
                    .filter(attendance_entries::member_id.eq(&entry.member_id))
                    .first::<AttendanceRow>(conn)
                    .optional()?;
                match existing {
                    None => {
                        diesel::insert_into(attendance_entries::table)
                            .values(&entry)
                            .execute(conn)?;
                        Ok(AttendanceChange::Added)
                    }
                    Some(row)
                        if row.truck_id == entry.truck_id
                            && row.position_id == entry.position_id
                            && row.status == entry.status =>
                    {
                        Ok(AttendanceChange::Unchanged)
                    }
                    Some(row) => {
                        diesel::update(attendance_entries::table.find(&row.id))
                            .set((
                                attendance_entries::truck_id.eq(&entry.truck_id),
                                attendance_entries::position_id.eq(&entry.position_id),
                                attendance_entries::status.eq(&entry.status),
                                attendance_entries::recorded_at.eq(&entry.recorded_at),
                            ))
                            .execute(conn)?;
                        Ok(AttendanceChange::Moved)
                    }
                }
            })
        })
        .await??;
        Ok(change)
    }

    async fn remove_attendance(
        &self,
        callout_id: &str,
        member_id: &str,
    ) -> anyhow::Result<Option<AttendanceRow>> {
        let callout_id = callout_id.to_string();
        let member_id = member_id.to_string();
        let pool = self.pool.clone();
        let removed = tokio::task::spawn_blocking(
            move || -> anyhow::Result<Option<AttendanceRow>> {
                let mut conn = pool.get()?;
                conn.immediate_transaction(|conn| {
                    let existing = attendance_entries::table
                        .filter(attendance_entries::callout_id.eq(&callout_id))
                        .filter(attendance_entries::member_id.eq(&member_id))
                        .first::<AttendanceRow>(conn)
                        .optional()?;
                    if let Some(row) = existing {
                        diesel::delete(attendance_entries::table.find(&row.id)).execute(conn)?;
                        return Ok(Some(row));
                    }
                    Ok(None)
                })
            },
        )
        .await??;
        Ok(removed)
    }

    async fn list_attendance(&self, callout_id: &str) -> anyhow::Result<Vec<AttendanceRow>> {
        let callout_id = callout_id.to_string();
        let pool = self.pool.clone();
        let list = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<AttendanceRow>> {
            let mut conn = pool.get()?;
            let rows = attendance_entries::table
                .filter(attendance_entries::callout_id.eq(&callout_id))
                .order((
                    attendance_entries::recorded_at.asc(),
                    attendance_entries::id.asc(),
                ))
                .load::<AttendanceRow>(&mut conn)?;
            Ok(rows)
        })
        .await??;
        Ok(list)
    }

    async fn create_api_token(&self, token: ApiToken) -> anyhow::Result<()> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let mut conn = pool.get()?;
            diesel::insert_into(api_tokens::table)
                .values(&token)
                .execute(&mut conn)?;
            Ok(())
        })
        .await??;
        Ok(())
    }

    async fn list_api_tokens(&self, brigade_id: &str) -> anyhow::Result<Vec<ApiToken>> {
        let brigade_id = brigade_id.to_string();
        let pool = self.pool.clone();
        let tokens = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<ApiToken>> {
            let mut conn = pool.get()?;
            let rows = api_tokens::table
                .filter(api_tokens::brigade_id.eq(&brigade_id))
                .order(api_tokens::created_at.desc())
                .load::<ApiToken>(&mut conn)?;
            Ok(rows)
        })
        .await??;
        Ok(tokens)
    }

    async fn get_api_token_by_hash(&self, secret_hash: &str) -> anyhow::Result<Option<ApiToken>> {
        let secret_hash = secret_hash.to_string();
        let pool = self.pool.clone();
        let token = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<ApiToken>> {
            let mut conn = pool.get()?;
            let t = api_tokens::table
                .filter(api_tokens::secret_hash.eq(&secret_hash))
                .first::<ApiToken>(&mut conn)
                .optional()?;
            Ok(t)
        })
        .await??;
        Ok(token)
    }

    async fn update_api_token_last_used(&self, id: &str) -> anyhow::Result<()> {
        let id = id.to_string();
        let pool = self.pool.clone();
        let now = now_rfc3339();
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let mut conn = pool.get()?;
            diesel::update(api_tokens::table.find(&id))
                .set(api_tokens::last_used_at.eq(&now))
                .execute(&mut conn)?;
            Ok(())
        })
        .await??;
        Ok(())
    }

    async fn revoke_api_token(&self, id: &str, brigade_id: &str) -> anyhow::Result<usize> {
        let id = id.to_string();
        let brigade_id = brigade_id.to_string();
        let pool = self.pool.clone();
        let now = now_rfc3339();
        let n = tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
            let mut conn = pool.get()?;
            let n = diesel::update(
                api_tokens::table
                    .filter(api_tokens::id.eq(&id))
                    .filter(api_tokens::brigade_id.eq(&brigade_id))
                    .filter(api_tokens::revoked_at.is_null()),
            )
            .set(api_tokens::revoked_at.eq(&now))
            .execute(&mut conn)?;
            Ok(n)
        })
        .await??;
        Ok(n)
    }

    async fn append_audit(&self, record: AuditRecord) -> anyhow::Result<()> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let mut conn = pool.get()?;
            diesel::insert_into(audit_log::table)
                .values(&record)
                .execute(&mut conn)?;
            Ok(())
        })
        .await??;
        Ok(())
    }

    async fn list_audit(&self, brigade_id: &str, limit: i64) -> anyhow::Result<Vec<AuditRecord>> {
        let brigade_id = brigade_id.to_string();
        let pool = self.pool.clone();
        let rows = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<AuditRecord>> {
            let mut conn = pool.get()?;
            let rows = audit_log::table
                .filter(audit_log::brigade_id.eq(&brigade_id))
                .order(audit_log::created_at.desc())
                .limit(limit)
                .load::<AuditRecord>(&mut conn)?;
            Ok(rows)
        })
        .await??;
        Ok(rows)
    }
}
