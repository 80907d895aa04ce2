//! services/api/src/sessions.rs
//!
//! In-memory browser session store. Credential verification belongs to the
//! identity provider; this only maps the session cookie issued after a
//! successful sign-in back to the authenticated account.

use chrono::{DateTime, Duration, Utc};
use samvaad_core::ports::AuthUser;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Session cookie lifetime.
pub const SESSION_TTL_DAYS: i64 = 30;

struct Session {
    user: AuthUser,
    expires_at: DateTime<Utc>,
}

/// Maps session ids to authenticated accounts, pruning expired entries on
/// validation.
#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session for an authenticated account and returns its id.
    pub async fn create(&self, user: AuthUser) -> String {
        let id = Uuid::new_v4().to_string();
        let session = Session {
            user,
            expires_at: Utc::now() + Duration::days(SESSION_TTL_DAYS),
        };
        self.inner.write().await.insert(id.clone(), session);
        id
    }

    /// Resolves a session id to its account, dropping it when expired.
    pub async fn validate(&self, id: &str) -> Option<AuthUser> {
        let mut sessions = self.inner.write().await;
        match sessions.get(id) {
            Some(s) if s.expires_at > Utc::now() => Some(s.user.clone()),
            Some(_) => {
                sessions.remove(id);
                None
            }
            None => None,
        }
    }

    pub async fn remove(&self, id: &str) {
        self.inner.write().await.remove(id);
    }

    /// Drops every session of one account (used on account deletion).
    pub async fn remove_user(&self, uid: &str) {
        self.inner
            .write()
            .await
            .retain(|_, s| s.user.uid != uid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(uid: &str) -> AuthUser {
        AuthUser {
            uid: uid.to_string(),
            email: format!("{uid}@example.com"),
            display_name: None,
            photo_url: None,
        }
    }

    #[tokio::test]
    async fn create_then_validate_roundtrip() {
        let store = SessionStore::new();
        let id = store.create(user("u1")).await;
        let resolved = store.validate(&id).await.unwrap();
        assert_eq!(resolved.uid, "u1");
    }

    #[tokio::test]
    async fn removed_sessions_no_longer_validate() {
        let store = SessionStore::new();
        let id = store.create(user("u1")).await;
        store.remove(&id).await;
        assert!(store.validate(&id).await.is_none());

        let id2 = store.create(user("u2")).await;
        store.remove_user("u2").await;
        assert!(store.validate(&id2).await.is_none());
    }
}
