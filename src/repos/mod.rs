use async_trait::async_trait;

use crate::models::{
    api_token::ApiToken,
    attendance::{AttendanceChange, AttendanceRow},
    audit::AuditRecord,
    brigade::Brigade,
    callout::Callout,
    member::Member,
};

/// A brigade row joined with roster and callout counts, for the
/// super-admin overview.
#[derive(Debug, Clone)]
pub struct BrigadeOverview {
    pub brigade: Brigade,
    pub member_count: i64,
    pub callout_count: i64,
}

#[async_trait]
pub trait MusterRepo: Send + Sync {
    // Brigade operations
    /// Returns false when the slug is already taken.
    async fn create_brigade(&self, brigade: Brigade) -> anyhow::Result<bool>;
    async fn get_brigade_by_slug(&self, slug: &str) -> anyhow::Result<Option<Brigade>>;
    async fn list_brigade_overviews(&self) -> anyhow::Result<Vec<BrigadeOverview>>;

    // Roster operations
    async fn create_member(&self, member: Member) -> anyhow::Result<()>;
    async fn list_members(&self, brigade_id: &str, include_inactive: bool) -> anyhow::Result<Vec<Member>>;
    async fn get_member(&self, id: &str) -> anyhow::Result<Option<Member>>;
    async fn deactivate_member(&self, id: &str, brigade_id: &str) -> anyhow::Result<usize>;

    // Callout operations
    /// Idempotent on (brigade_id, icad_number): returns the existing
    /// callout with `created = false` instead of inserting a duplicate.
    async fn create_callout(&self, callout: Callout) -> anyhow::Result<(Callout, bool)>;
    async fn get_callout(&self, id: &str) -> anyhow::Result<Option<Callout>>;
    /// Most recently opened callout that is not locked.
    async fn active_callout(&self, brigade_id: &str) -> anyhow::Result<Option<Callout>>;
    async fn list_callouts(&self, brigade_id: &str, limit: i64) -> anyhow::Result<Vec<Callout>>;
    async fn set_callout_status(&self, id: &str, status: &str) -> anyhow::Result<usize>;

    // Attendance operations
    /// Insert or move a member's entry for a callout. UNIQUE
    /// (callout_id, member_id) is the idempotency anchor: replaying an
    /// identical write reports `Unchanged`.
    async fn upsert_attendance(&self, entry: AttendanceRow) -> anyhow::Result<AttendanceChange>;
    /// Returns the removed row, or None when no entry existed.
    async fn remove_attendance(
        &self,
        callout_id: &str,
        member_id: &str,
    ) -> anyhow::Result<Option<AttendanceRow>>;
    async fn list_attendance(&self, callout_id: &str) -> anyhow::Result<Vec<AttendanceRow>>;

    // API token operations
    async fn create_api_token(&self, token: ApiToken) -> anyhow::Result<()>;
    async fn list_api_tokens(&self, brigade_id: &str) -> anyhow::Result<Vec<ApiToken>>;
    async fn get_api_token_by_hash(&self, secret_hash: &str) -> anyhow::Result<Option<ApiToken>>;
    async fn update_api_token_last_used(&self, id: &str) -> anyhow::Result<()>;
    async fn revoke_api_token(&self, id: &str, brigade_id: &str) -> anyhow::Result<usize>;

    // Audit operations
    async fn append_audit(&self, record: AuditRecord) -> anyhow::Result<()>;
    async fn list_audit(&self, brigade_id: &str, limit: i64) -> anyhow::Result<Vec<AuditRecord>>;
}

pub mod sqlite;
