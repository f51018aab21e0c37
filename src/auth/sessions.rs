//! Keyed session store for the three authentication tiers.
//!
//! Sessions are held in process memory only. A key is `(tier, slug)`;
//! the super-admin tier is a single global key. PIN sessions are
//! station devices that stay signed in until explicit logout; admin and
//! super-admin sessions expire on inactivity with a sliding timeout.

use std::collections::HashMap;

use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Pin,
    Admin,
    SuperAdmin,
}

impl Tier {
    /// Path a browser is redirected to when a session of this tier is
    /// missing or expired.
    pub fn login_path(self, slug: &str) -> String {
        match self {
            Tier::Pin => format!("/b/{slug}/login"),
            Tier::Admin => format!("/b/{slug}/admin/login"),
            Tier::SuperAdmin => "/admin/login".to_string(),
        }
    }
}

#[derive(Debug)]
struct SessionEntry {
    last_activity: i64,
}

pub struct SessionStore {
    entries: Mutex<HashMap<(Tier, String), SessionEntry>>,
    /// Sliding inactivity timeout for the admin and super-admin tiers,
    /// in seconds. PIN sessions never time out.
    timeout_secs: i64,
}

impl SessionStore {
    pub fn new(timeout_secs: i64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            timeout_secs,
        }
    }

    /// The super-admin tier ignores the slug so there is exactly one
    /// session regardless of how the caller derived it.
    fn key(tier: Tier, slug: &str) -> (Tier, String) {
        match tier {
            Tier::SuperAdmin => (tier, String::new()),
            _ => (tier, slug.to_string()),
        }
    }

    pub async fn login(&self, tier: Tier, slug: &str, now: i64) {
        let mut entries = self.entries.lock().await;
        entries.insert(Self::key(tier, slug), SessionEntry { last_activity: now });
    }

    /// Returns true when an authenticated, unexpired session exists.
    /// For timed tiers a successful check refreshes `last_activity`,
    /// which is what makes the timeout sliding; an expired entry is
    /// removed on the spot.
    pub async fn check(&self, tier: Tier, slug: &str, now: i64) -> bool {
        let key = Self::key(tier, slug);
        let mut entries = self.entries.lock().await;
        let Some(entry) = entries.get_mut(&key) else {
            return false;
        };
        if tier == Tier::Pin {
            return true;
        }
        if now - entry.last_activity > self.timeout_secs {
            entries.remove(&key);
            return false;
        }
        entry.last_activity = now;
        true
    }

    pub async fn logout(&self, tier: Tier, slug: &str) {
        let mut entries = self.entries.lock().await;
        entries.remove(&Self::key(tier, slug));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(1800)
    }

    #[tokio::test]
    async fn check_without_login_fails() {
        let store = store();
        assert!(!store.check(Tier::Admin, "kinglake", 0).await);
    }

    #[tokio::test]
    async fn admin_session_expires_after_timeout() {
        let store = store();
        store.login(Tier::Admin, "kinglake", 0).await;
        assert!(store.check(Tier::Admin, "kinglake", 1799).await);
        store.logout(Tier::Admin, "kinglake").await;

        store.login(Tier::Admin, "kinglake", 0).await;
        assert!(!store.check(Tier::Admin, "kinglake", 1801).await);
        // the expired entry is gone, not just rejected
        assert!(!store.check(Tier::Admin, "kinglake", 0).await);
    }

    #[tokio::test]
    async fn sliding_refresh_extends_the_window() {
        let store = store();
        store.login(Tier::Admin, "kinglake", 0).await;
        assert!(store.check(Tier::Admin, "kinglake", 1799).await);
        // 1801 is within 1800s of the refreshed activity at 1799
        assert!(store.check(Tier::Admin, "kinglake", 1801).await);
        assert!(store.check(Tier::Admin, "kinglake", 3599).await);
        assert!(!store.check(Tier::Admin, "kinglake", 5400).await);
    }

    #[tokio::test]
    async fn boundary_is_inclusive() {
        let store = store();
        store.login(Tier::Admin, "kinglake", 0).await;
        assert!(store.check(Tier::Admin, "kinglake", 1800).await);
    }

    #[tokio::test]
    async fn pin_session_never_times_out() {
        let store = store();
        store.login(Tier::Pin, "kinglake", 0).await;
        assert!(store.check(Tier::Pin, "kinglake", 10_000_000).await);
        store.logout(Tier::Pin, "kinglake").await;
        assert!(!store.check(Tier::Pin, "kinglake", 10_000_000).await);
    }

    #[tokio::test]
    async fn tiers_and_slugs_are_isolated() {
        let store = store();
        store.login(Tier::Pin, "kinglake", 0).await;
        assert!(!store.check(Tier::Admin, "kinglake", 0).await);
        assert!(!store.check(Tier::Pin, "marysville", 0).await);

        store.login(Tier::Admin, "marysville", 0).await;
        store.logout(Tier::Admin, "kinglake").await;
        assert!(store.check(Tier::Admin, "marysville", 0).await);
    }

    #[tokio::test]
    async fn superadmin_is_a_single_key() {
        let store = store();
        store.login(Tier::SuperAdmin, "", 0).await;
        assert!(store.check(Tier::SuperAdmin, "ignored", 100).await);
        store.logout(Tier::SuperAdmin, "also-ignored").await;
        assert!(!store.check(Tier::SuperAdmin, "", 100).await);
    }
}
