use diesel::prelude::*;
use serde::Serialize;

/// One successful permission check by an API token. Written on every
/// authorized bearer request so brigade admins can see which feed
/// touched what.
#[derive(Debug, Clone, Queryable, Insertable, Serialize)]
#[diesel(table_name = crate::schema::audit_log)]
pub struct AuditRecord {
    pub id: String,
    pub brigade_id: String,
    pub token_id: String,
    pub token_name: String,
    pub permission: String,
    pub endpoint: String,
    pub method: String,
    pub created_at: String,
}
