use diesel::prelude::*;

/// A tenant organization. All sessions, tokens, callouts and live
/// channels are scoped to one brigade; the slug is the URL-facing
/// identity and immutable once created.
#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::brigades)]
pub struct Brigade {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub pin_hash: String,
    pub admin_password_hash: String,
    pub created_at: String,
}

/// Slugs are URL-safe lowercase: letters, digits, hyphens.
pub fn is_valid_slug(value: &str) -> bool {
    (2..=64).contains(&value.len())
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !value.starts_with('-')
        && !value.ends_with('-')
}

#[cfg(test)]
mod tests {
    use super::is_valid_slug;

    #[test]
    fn accepts_urlsafe_slugs() {
        assert!(is_valid_slug("pukekohe"));
        assert!(is_valid_slug("station-41"));
    }

    #[test]
    fn rejects_bad_slugs() {
        assert!(!is_valid_slug("x"));
        assert!(!is_valid_slug("Pukekohe"));
        assert!(!is_valid_slug("a b"));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug("trailing-"));
    }
}
