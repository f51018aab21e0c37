use diesel::prelude::*;

/// A bearer credential owned by one brigade. Only the SHA-256 hash of
/// the secret is stored; revocation takes effect on the next
/// verification.
#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::api_tokens)]
pub struct ApiToken {
    pub id: String,
    pub brigade_id: String,
    pub name: String,
    pub secret_hash: String,
    /// Canonical space-separated permission strings, validated at
    /// creation via [`Permission::parse_list`].
    pub permissions: String,
    pub window_seconds: i32,
    pub max_requests: i32,
    pub created_at: String,
    pub last_used_at: Option<String>,
    pub revoked_at: Option<String>,
}

impl ApiToken {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Exact-match containment check against the token's permission set.
    pub fn has_permission(&self, required: Permission) -> bool {
        self.permissions
            .split_whitespace()
            .any(|p| p == required.as_str())
    }
}

/// The closed set of API permissions. Free-form permission strings are
/// rejected at token creation so a typo fails loudly instead of
/// silently granting nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Permission {
    MustersCreate,
    MustersRead,
    AttendanceCreate,
    AttendanceRead,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MustersCreate => "musters:create",
            Self::MustersRead => "musters:read",
            Self::AttendanceCreate => "attendance:create",
            Self::AttendanceRead => "attendance:read",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "musters:create" => Some(Self::MustersCreate),
            "musters:read" => Some(Self::MustersRead),
            "attendance:create" => Some(Self::AttendanceCreate),
            "attendance:read" => Some(Self::AttendanceRead),
            _ => None,
        }
    }

    /// Parse a whitespace-separated permission list into the canonical
    /// sorted, deduplicated form. Returns the offending string on the
    /// first unknown permission.
    pub fn parse_list(value: &str) -> Result<Vec<Permission>, String> {
        let mut perms = Vec::new();
        for raw in value.split_whitespace() {
            match Permission::parse(raw) {
                Some(p) => perms.push(p),
                None => return Err(raw.to_string()),
            }
        }
        perms.sort();
        perms.dedup();
        Ok(perms)
    }

    pub fn join(perms: &[Permission]) -> String {
        perms
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_round_trip() {
        for p in [
            Permission::MustersCreate,
            Permission::MustersRead,
            Permission::AttendanceCreate,
            Permission::AttendanceRead,
        ] {
            assert_eq!(Permission::parse(p.as_str()), Some(p));
        }
        assert_eq!(Permission::parse("musters:delete"), None);
    }

    #[test]
    fn parse_list_rejects_unknown() {
        let err = Permission::parse_list("musters:create attendnce:read").unwrap_err();
        assert_eq!(err, "attendnce:read");
    }

    #[test]
    fn parse_list_canonicalizes() {
        let perms =
            Permission::parse_list("attendance:read musters:create attendance:read").unwrap();
        assert_eq!(
            Permission::join(&perms),
            "musters:create attendance:read"
        );
    }

    #[test]
    fn has_permission_is_exact_match() {
        let token = ApiToken {
            id: "t1".into(),
            brigade_id: "b1".into(),
            name: "cad feed".into(),
            secret_hash: "x".into(),
            permissions: "musters:create attendance:read".into(),
            window_seconds: 900,
            max_requests: 5,
            created_at: "2026-01-01T00:00:00Z".into(),
            last_used_at: None,
            revoked_at: None,
        };
        assert!(token.has_permission(Permission::MustersCreate));
        assert!(token.has_permission(Permission::AttendanceRead));
        assert!(!token.has_permission(Permission::AttendanceCreate));
    }
}
