//! WebSocket upgrade gate
//!
//! Every upgrade request passes three checks, in order: endpoint path,
//! protocol headers, then session. A request on the wrong path is refused
//! before its cookie is ever looked at.

use std::fmt;
use std::str::FromStr;

use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use shared::error::{AppError, ErrorCode};
use shared::models::Role;
use thiserror::Error;

use crate::auth::{SessionStore, session_id_from_headers};

/// Policy for upgrade requests without an authenticated session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WsAuthMode {
    /// Reject with 401
    #[default]
    Strict,
    /// Accept as anonymous (diagnostics only)
    Permissive,
}

impl WsAuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WsAuthMode::Strict => "strict",
            WsAuthMode::Permissive => "permissive",
        }
    }
}

impl fmt::Display for WsAuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WsAuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(WsAuthMode::Strict),
            "permissive" => Ok(WsAuthMode::Permissive),
            other => Err(format!("unknown WebSocket auth mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpgradeRejection {
    #[error("no WebSocket endpoint at {0}")]
    WrongPath(String),

    #[error("Upgrade header missing or not 'websocket'")]
    NotWebSocket,

    #[error("WebSocket handshake rejected: {0}")]
    Handshake(String),

    #[error("authenticated session required")]
    Unauthorized,
}

impl UpgradeRejection {
    pub fn code(&self) -> ErrorCode {
        match self {
            UpgradeRejection::WrongPath(_) => ErrorCode::NotFound,
            UpgradeRejection::NotWebSocket | UpgradeRejection::Handshake(_) => {
                ErrorCode::InvalidRequest
            }
            UpgradeRejection::Unauthorized => ErrorCode::NotAuthenticated,
        }
    }
}

impl IntoResponse for UpgradeRejection {
    fn into_response(self) -> Response {
        let mut response = AppError::with_message(self.code(), self.to_string()).into_response();
        // Refused upgrades never keep the socket
        response
            .headers_mut()
            .insert(header::CONNECTION, HeaderValue::from_static("close"));
        response
    }
}

/// Identity attached to an accepted upgrade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub user_id: Option<i64>,
    pub role: Option<Role>,
}

impl Admission {
    pub const ANONYMOUS: Admission = Admission {
        user_id: None,
        role: None,
    };

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct UpgradeGate {
    path: String,
    mode: WsAuthMode,
    cookie_name: String,
}

impl UpgradeGate {
    pub fn new(path: impl Into<String>, mode: WsAuthMode, cookie_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode,
            cookie_name: cookie_name.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mode(&self) -> WsAuthMode {
        self.mode
    }

    pub fn check_path(&self, path: &str) -> Result<(), UpgradeRejection> {
        if path == self.path {
            Ok(())
        } else {
            Err(UpgradeRejection::WrongPath(path.to_string()))
        }
    }

    /// Decide whether an upgrade request may proceed
    pub async fn admit(
        &self,
        path: &str,
        headers: &HeaderMap,
        sessions: &dyn SessionStore,
    ) -> Result<Admission, UpgradeRejection> {
        self.check_path(path)?;

        if !is_websocket_upgrade(headers) {
            return Err(UpgradeRejection::NotWebSocket);
        }

        let identity = match session_id_from_headers(headers, &self.cookie_name) {
            Some(sid) => sessions.load(&sid).await.and_then(|s| s.identity()),
            None => None,
        };

        match (identity, self.mode) {
            (Some((user_id, role)), _) => Ok(Admission {
                user_id: Some(user_id),
                role,
            }),
            (None, WsAuthMode::Permissive) => {
                tracing::debug!("Anonymous WebSocket upgrade accepted (permissive mode)");
                Ok(Admission::ANONYMOUS)
            }
            (None, WsAuthMode::Strict) => Err(UpgradeRejection::Unauthorized),
        }
    }
}

/// `Upgrade: websocket`, compared case-insensitively
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("websocket"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::auth::{MemorySessionStore, Session};

    fn headers(upgrade: Option<&str>, cookie: Option<&str>) -> HeaderMap {
        let mut h = HeaderMap::new();
        if let Some(u) = upgrade {
            h.insert(header::UPGRADE, u.parse().unwrap());
        }
        if let Some(c) = cookie {
            h.insert(header::COOKIE, c.parse().unwrap());
        }
        h
    }

    fn sessions() -> MemorySessionStore {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        store.insert(Session {
            session_id: "admin".into(),
            user_id: Some(1),
            user_role: Some(Role::Admin),
            expires_at: i64::MAX,
        });
        store.insert(Session {
            session_id: "anon".into(),
            user_id: None,
            user_role: None,
            expires_at: i64::MAX,
        });
        store
    }

    #[tokio::test]
    async fn wrong_path_is_rejected_before_anything_else() {
        let gate = UpgradeGate::new("/ws", WsAuthMode::Strict, "sid");
        let err = gate
            .admit("/socket", &HeaderMap::new(), &sessions())
            .await
            .unwrap_err();
        assert_eq!(err, UpgradeRejection::WrongPath("/socket".into()));
        assert_eq!(err.into_response().status(), http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upgrade_header_is_required() {
        let gate = UpgradeGate::new("/ws", WsAuthMode::Permissive, "sid");
        let store = sessions();
        for upgrade in [None, Some("h2c")] {
            let err = gate
                .admit("/ws", &headers(upgrade, Some("sid=admin")), &store)
                .await
                .unwrap_err();
            assert_eq!(err, UpgradeRejection::NotWebSocket);
        }
        assert!(
            gate.admit("/ws", &headers(Some("WebSocket"), None), &store)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn strict_mode_requires_identity() {
        let gate = UpgradeGate::new("/ws", WsAuthMode::Strict, "sid");
        let store = sessions();

        let ok = gate
            .admit("/ws", &headers(Some("websocket"), Some("sid=admin")), &store)
            .await
            .unwrap();
        assert_eq!(ok.user_id, Some(1));
        assert_eq!(ok.role, Some(Role::Admin));

        for cookie in [None, Some("sid=anon"), Some("sid=unknown")] {
            let err = gate
                .admit("/ws", &headers(Some("websocket"), cookie), &store)
                .await
                .unwrap_err();
            assert_eq!(err, UpgradeRejection::Unauthorized);
        }
        let response = UpgradeRejection::Unauthorized.into_response();
        assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::CONNECTION], "close");
    }

    #[tokio::test]
    async fn permissive_mode_admits_anonymous() {
        let gate = UpgradeGate::new("/ws", WsAuthMode::Permissive, "sid");
        let store = sessions();
        for cookie in [None, Some("sid=anon"), Some("sid=unknown")] {
            let admission = gate
                .admit("/ws", &headers(Some("websocket"), cookie), &store)
                .await
                .unwrap();
            assert!(!admission.is_authenticated());
        }
    }

    #[test]
    fn auth_mode_parsing() {
        assert_eq!("Strict".parse::<WsAuthMode>(), Ok(WsAuthMode::Strict));
        assert_eq!(" permissive ".parse::<WsAuthMode>(), Ok(WsAuthMode::Permissive));
        assert!("open".parse::<WsAuthMode>().is_err());
        assert_eq!(WsAuthMode::default(), WsAuthMode::Strict);
    }
}
