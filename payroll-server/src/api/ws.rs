//! WebSocket endpoint for live notifications
//!
//! The gate decides admission before the handshake completes; an admitted
//! socket is registered, greeted with `connection_established`, and then
//! served until either side closes it or the keepalive sweep evicts it.

use axum::extract::State;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::{HeaderMap, Uri};
use axum::response::{IntoResponse, Response};
use futures::{Sink, SinkExt, StreamExt};
use shared::NotificationEvent;

use crate::live::{Admission, Outbound, Registration, UpgradeRejection, inbound};
use crate::state::AppState;

/// GET {WS_PATH}: upgrade to WebSocket
pub async fn handle_upgrade(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let admission = match state
        .gate
        .admit(uri.path(), &headers, state.sessions.as_ref())
        .await
    {
        Ok(admission) => admission,
        Err(rejection) => {
            tracing::warn!(path = %uri.path(), reason = %rejection, "WebSocket upgrade rejected");
            return rejection.into_response();
        }
    };

    let ws = match upgrade {
        Ok(ws) => ws,
        Err(e) => {
            let rejection = UpgradeRejection::Handshake(e.body_text());
            tracing::warn!(reason = %rejection, "WebSocket upgrade rejected");
            return rejection.into_response();
        }
    };

    ws.on_upgrade(move |socket| run_session(socket, state, admission))
}

async fn run_session(socket: WebSocket, state: AppState, admission: Admission) {
    let Registration { id, mut rx, .. } = state.registry.register(admission.user_id, admission.role);
    let (mut ws_sink, mut ws_stream) = socket.split();

    let welcome = NotificationEvent::ConnectionEstablished {
        user_id: admission.user_id,
        authenticated: admission.is_authenticated(),
        timestamp: shared::util::now_millis(),
    };
    if send_event(&mut ws_sink, &welcome).await.is_err() {
        tracing::warn!(connection_id = id, "Failed to send welcome, disconnecting");
        state.registry.deregister(id);
        return;
    }

    loop {
        tokio::select! {
            // Frames queued by the registry
            frame = rx.recv() => {
                let message = match frame {
                    Some(Outbound::Event(json)) => Message::Text(json.to_string().into()),
                    Some(Outbound::Ping) => Message::Ping(Vec::new().into()),
                    Some(Outbound::Close) => {
                        tracing::info!(connection_id = id, "Closing evicted connection");
                        break;
                    }
                    None => break,
                };
                if let Err(e) = ws_sink.send(message).await {
                    tracing::debug!(connection_id = id, "WebSocket send failed: {e}");
                    break;
                }
            }

            // Frames from the client
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) =
                            inbound::handle(&state.registry, id, admission.user_id, text.as_str())
                            && send_event(&mut ws_sink, &reply).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => state.registry.record_pong(id),
                    // tungstenite queues the pong reply itself
                    Some(Ok(Message::Ping(_))) => {}
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(connection_id = id, "WebSocket disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(connection_id = id, "WebSocket error: {e}");
                        break;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::debug!(connection_id = id, "Ignoring binary frame");
                    }
                }
            }
        }
    }

    // Close frame (best-effort)
    let _ = ws_sink.close().await;
    state.registry.deregister(id);
}

async fn send_event<S>(sink: &mut S, event: &NotificationEvent) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    match serde_json::to_string(event) {
        Ok(json) => sink.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::error!(kind = event.kind(), "Failed to encode event: {e}");
            Ok(())
        }
    }
}
