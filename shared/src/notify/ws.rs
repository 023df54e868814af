//! WebSocket wire format

use serde::{Deserialize, Serialize};

use crate::models::{ComplaintWithEmployee, Role};

/// Server → Client push
///
/// Events are transient: never persisted and never replayed to a client that
/// connects after they fired.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum NotificationEvent {
    /// Sent once to the connecting client right after the upgrade
    #[serde(rename = "connection_established", rename_all = "camelCase")]
    ConnectionEstablished {
        user_id: Option<i64>,
        authenticated: bool,
        /// Unix milliseconds
        timestamp: i64,
    },

    /// A complaint was filed; `user_role` is the audience hint for client filtering
    #[serde(rename = "NEW_COMPLAINT", rename_all = "camelCase")]
    NewComplaint {
        complaint: Box<ComplaintWithEmployee>,
        user_role: Role,
    },

    #[serde(rename = "COMPLAINT_UPDATED")]
    ComplaintUpdated { complaint: Box<ComplaintWithEmployee> },

    #[serde(rename = "COMPLAINT_DELETED", rename_all = "camelCase")]
    ComplaintDeleted { complaint_id: i64 },

    /// Reply to the originating connection only
    #[serde(rename = "error")]
    Error { message: String },
}

impl NotificationEvent {
    /// Wire name of the event, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished { .. } => "connection_established",
            Self::NewComplaint { .. } => "NEW_COMPLAINT",
            Self::ComplaintUpdated { .. } => "COMPLAINT_UPDATED",
            Self::ComplaintDeleted { .. } => "COMPLAINT_DELETED",
            Self::Error { .. } => "error",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Client → Server application message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Application-level liveness signal
    Heartbeat,
    /// Admin marks a complaint notification as seen
    Acknowledge {
        #[serde(rename = "complaintId")]
        complaint_id: i64,
    },
}

impl InboundMessage {
    /// Known message types
    pub const TYPES: &'static [&'static str] = &["heartbeat", "acknowledge"];

    /// Whether an anonymous connection must be refused this message
    pub fn requires_auth(&self) -> bool {
        matches!(self, Self::Acknowledge { .. })
    }
}
