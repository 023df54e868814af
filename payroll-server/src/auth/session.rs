//! Server-side cookie sessions

use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum_extra::headers::{Cookie, HeaderMapExt};
use dashmap::DashMap;
use shared::models::{Role, User};
use shared::util::now_millis;

/// Ephemeral session record; a session without `user_id` is anonymous
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub user_id: Option<i64>,
    pub user_role: Option<Role>,
    /// Unix milliseconds
    pub expires_at: i64,
}

impl Session {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    /// Identity usable for role-gated decisions
    pub fn identity(&self) -> Option<(i64, Option<Role>)> {
        self.user_id.map(|id| (id, self.user_role))
    }
}

/// Session id carried by the named cookie
pub fn session_id_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let cookie = headers.typed_get::<Cookie>()?;
    cookie
        .get(cookie_name)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Open a session for an authenticated user
    async fn create(&self, user: &User) -> Session;

    /// Live session by id; expired sessions are purged and reported absent
    async fn load(&self, session_id: &str) -> Option<Session>;

    async fn destroy(&self, session_id: &str) -> bool;

    /// Drop every expired session, returning how many were removed
    async fn purge_expired(&self) -> usize;
}

pub struct MemorySessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Store a prepared session as-is (anonymous or pre-expired sessions in tests)
    pub fn insert(&self, session: Session) {
        self.sessions.insert(session.session_id.clone(), session);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user: &User) -> Session {
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        let session = Session {
            session_id: uuid::Uuid::new_v4().simple().to_string(),
            user_id: Some(user.id),
            user_role: Some(user.role),
            expires_at: now_millis().saturating_add(ttl_ms),
        };
        self.insert(session.clone());
        tracing::debug!(user_id = user.id, "Session created");
        session
    }

    async fn load(&self, session_id: &str) -> Option<Session> {
        let session = self.sessions.get(session_id).map(|s| s.clone())?;
        if session.is_expired(now_millis()) {
            self.sessions.remove(session_id);
            tracing::debug!(user_id = ?session.user_id, "Expired session discarded");
            return None;
        }
        Some(session)
    }

    async fn destroy(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    async fn purge_expired(&self) -> usize {
        let now = now_millis();
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired(now));
        before.saturating_sub(self.sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, role: Role) -> User {
        User {
            id,
            matricule: format!("M{id:03}"),
            password_hash: String::new(),
            role,
            first_name: "Awa".into(),
            last_name: "Diallo".into(),
            phone: None,
            email: None,
            is_active: true,
            created_at: 0,
        }
    }

    #[tokio::test]
    async fn create_and_load() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let session = store.create(&user(3, Role::Accountant)).await;
        assert_eq!(session.identity(), Some((3, Some(Role::Accountant))));

        let loaded = store.load(&session.session_id).await.unwrap();
        assert_eq!(loaded, session);
        assert!(store.load("missing").await.is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_absent() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        store.insert(Session {
            session_id: "old".into(),
            user_id: Some(1),
            user_role: Some(Role::Admin),
            expires_at: now_millis() - 1,
        });
        assert!(store.load("old").await.is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn destroy_and_purge() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let live = store.create(&user(1, Role::Admin)).await;
        store.insert(Session {
            session_id: "stale".into(),
            user_id: None,
            user_role: None,
            expires_at: 0,
        });
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len(), 1);

        assert!(store.destroy(&live.session_id).await);
        assert!(!store.destroy(&live.session_id).await);
    }

    #[test]
    fn cookie_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", "theme=dark; sid=abc123".parse().unwrap());
        assert_eq!(session_id_from_headers(&headers, "sid").as_deref(), Some("abc123"));
        assert_eq!(session_id_from_headers(&headers, "other"), None);
        assert_eq!(session_id_from_headers(&HeaderMap::new(), "sid"), None);
    }

    #[test]
    fn anonymous_session_has_no_identity() {
        let session = Session {
            session_id: "anon".into(),
            user_id: None,
            user_role: Some(Role::Admin),
            expires_at: i64::MAX,
        };
        assert_eq!(session.identity(), None);
    }
}
