use diesel::prelude::*;
use serde::Serialize;

/// An incident to which members record attendance. The active callout
/// for a brigade is the most recently opened one that is not locked.
#[derive(Debug, Clone, Serialize, Queryable, Insertable)]
#[diesel(table_name = crate::schema::callouts)]
pub struct Callout {
    pub id: String,
    pub brigade_id: String,
    pub icad_number: String,
    pub status: String,
    pub opened_at: String,
}

impl Callout {
    pub fn is_locked(&self) -> bool {
        self.status == CalloutStatus::Locked.as_str()
    }
}

/// Lifecycle: draft -> submitted -> locked. Locking is terminal; it
/// closes the live channel and freezes attendance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalloutStatus {
    Draft,
    Submitted,
    Locked,
}

impl CalloutStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Locked => "locked",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "locked" => Some(Self::Locked),
            _ => None,
        }
    }
}
