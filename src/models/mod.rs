pub mod api_token;
pub mod attendance;
pub mod audit;
pub mod brigade;
pub mod callout;
pub mod member;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Current UTC time as an RFC 3339 string, the storage format for all
/// persisted timestamps (sortable lexicographically).
pub fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339).unwrap_or_else(|_| now.to_string())
}

/// Current UTC time in unix seconds, used by the session and rate-limit
/// clocks.
pub fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
