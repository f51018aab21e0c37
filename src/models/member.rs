use diesel::prelude::*;
use serde::Serialize;

/// A rostered brigade member. Attendance rows reference members by id;
/// removal is a soft deactivation so history stays intact.
#[derive(Debug, Clone, Serialize, Queryable, Insertable)]
#[diesel(table_name = crate::schema::members)]
pub struct Member {
    pub id: String,
    pub brigade_id: String,
    pub name: String,
    pub rank: Option<String>,
    pub active: i32,
    pub created_at: String,
}

impl Member {
    pub fn is_active(&self) -> bool {
        self.active == 1
    }
}
