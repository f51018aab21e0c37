use diesel::prelude::*;
use serde::Serialize;

/// One member's attendance on one callout. Truck and position are
/// opaque labels to this service; (callout_id, member_id) is unique so
/// a duplicate write converges instead of duplicating the row.
#[derive(Debug, Clone, Serialize, Queryable, Insertable)]
#[diesel(table_name = crate::schema::attendance_entries)]
pub struct AttendanceRow {
    pub id: String,
    pub callout_id: String,
    pub member_id: String,
    pub truck_id: Option<String>,
    pub position_id: Option<String>,
    pub status: String,
    pub recorded_at: String,
}

/// Outcome of applying an attendance write, used to derive the live
/// delta op (or suppress it for a no-op replay).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceChange {
    Added,
    Moved,
    Unchanged,
}

impl AttendanceChange {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Moved => "moved",
            Self::Unchanged => "unchanged",
        }
    }
}
