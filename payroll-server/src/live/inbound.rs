//! Client → server application messages
//!
//! Nothing received here can close a connection: malformed frames are logged
//! and dropped, unknown types are ignored, and refusals are answered with an
//! `error` event to the sender only.

use shared::{InboundMessage, NotificationEvent};
use thiserror::Error;

use super::registry::{ConnectionId, ConnectionRegistry};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InboundError {
    #[error("malformed JSON: {0}")]
    Malformed(String),

    #[error("message has no string 'type' field")]
    MissingType,

    #[error("invalid '{kind}' message: {reason}")]
    Invalid { kind: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Message(InboundMessage),
    /// Well-formed JSON with an unrecognized `type`
    Unknown(String),
}

pub fn parse(text: &str) -> Result<Inbound, InboundError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| InboundError::Malformed(e.to_string()))?;
    let kind = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or(InboundError::MissingType)?
        .to_owned();

    if !InboundMessage::TYPES.contains(&kind.as_str()) {
        return Ok(Inbound::Unknown(kind));
    }
    serde_json::from_value(value)
        .map(Inbound::Message)
        .map_err(|e| InboundError::Invalid {
            kind,
            reason: e.to_string(),
        })
}

/// Process one text frame; returns the reply for the sender, if any
pub fn handle(
    registry: &ConnectionRegistry,
    connection_id: ConnectionId,
    user_id: Option<i64>,
    text: &str,
) -> Option<NotificationEvent> {
    let message = match parse(text) {
        Ok(Inbound::Message(message)) => message,
        Ok(Inbound::Unknown(kind)) => {
            tracing::debug!(connection_id, kind = %kind, "Ignoring unknown inbound message type");
            return None;
        }
        Err(err @ InboundError::Invalid { .. }) => {
            tracing::debug!(connection_id, error = %err, "Rejected inbound message");
            return Some(NotificationEvent::error(err.to_string()));
        }
        Err(err) => {
            tracing::warn!(connection_id, error = %err, "Dropping malformed inbound frame");
            return None;
        }
    };

    if message.requires_auth() && user_id.is_none() {
        tracing::debug!(connection_id, "Anonymous connection sent an authenticated message");
        return Some(NotificationEvent::error("Authentication required"));
    }

    match message {
        InboundMessage::Heartbeat => registry.record_pong(connection_id),
        InboundMessage::Acknowledge { complaint_id } => {
            tracing::info!(connection_id, user_id = ?user_id, complaint_id, "Complaint notification acknowledged");
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use shared::models::Role;

    use super::*;

    #[test]
    fn parse_variants() {
        assert_eq!(
            parse(r#"{"type":"heartbeat"}"#),
            Ok(Inbound::Message(InboundMessage::Heartbeat))
        );
        assert_eq!(
            parse(r#"{"type":"acknowledge","complaintId":4}"#),
            Ok(Inbound::Message(InboundMessage::Acknowledge { complaint_id: 4 }))
        );
        assert_eq!(
            parse(r#"{"type":"typing","to":3}"#),
            Ok(Inbound::Unknown("typing".into()))
        );
        assert!(matches!(parse("{not json"), Err(InboundError::Malformed(_))));
        assert_eq!(parse(r#"{"kind":"heartbeat"}"#), Err(InboundError::MissingType));
        assert_eq!(parse(r#"{"type":7}"#), Err(InboundError::MissingType));
        assert!(matches!(
            parse(r#"{"type":"acknowledge"}"#),
            Err(InboundError::Invalid { .. })
        ));
    }

    #[tokio::test]
    async fn malformed_and_unknown_frames_get_no_reply() {
        let registry = ConnectionRegistry::new(4);
        let reg = registry.register(Some(1), Some(Role::Admin));
        assert_eq!(handle(&registry, reg.id, Some(1), "garbage"), None);
        assert_eq!(handle(&registry, reg.id, Some(1), r#"{"type":"nope"}"#), None);
        assert!(registry.get(reg.id).is_some());
    }

    #[tokio::test]
    async fn anonymous_acknowledge_is_refused() {
        let registry = ConnectionRegistry::new(4);
        let reg = registry.register(None, None);
        let reply = handle(&registry, reg.id, None, r#"{"type":"acknowledge","complaintId":9}"#);
        assert_eq!(reply, Some(NotificationEvent::error("Authentication required")));

        // Same message from an authenticated connection is accepted silently
        let admin = registry.register(Some(2), Some(Role::Admin));
        let reply = handle(&registry, admin.id, Some(2), r#"{"type":"acknowledge","complaintId":9}"#);
        assert_eq!(reply, None);
    }

    #[tokio::test]
    async fn heartbeat_resets_missed_pings() {
        let registry = ConnectionRegistry::new(8);
        let mut reg = registry.register(None, None);

        registry.sweep(1);
        assert_eq!(handle(&registry, reg.id, None, r#"{"type":"heartbeat"}"#), None);
        // The answered ping does not count against the connection
        assert!(registry.sweep(1).evicted.is_empty());
        assert!(reg.rx.try_recv().is_ok());
    }
}
