use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use taskwatch_core::error::CoreError;
use taskwatch_core::types::DbId;
use taskwatch_events::RealtimeEvent;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;
use crate::ws::manager::WsManager;

/// Query parameters accepted on upgrade.
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    /// Optional access token; browsers cannot set headers on upgrade.
    pub token: Option<String>,
}

/// GET /api/v1/realtime/ws
///
/// Upgrades to a WebSocket that receives every realtime event. The stream
/// is public; a `token`, when given, must be valid and tags the connection
/// with its user.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
) -> Response {
    let user_id = match params.token.as_deref().filter(|t| !t.is_empty()) {
        None => None,
        Some(token) => match validate_token(token, &state.config.jwt) {
            Ok(claims) => Some(claims.sub),
            Err(_) => {
                return AppError::Core(CoreError::Unauthorized(
                    "Invalid or expired token".into(),
                ))
                .into_response();
            }
        },
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state.ws_manager, user_id))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Registers the connection, queues the initial `ready` frame, forwards
/// manager messages from a sender task, and drains inbound frames until
/// the client goes away.
async fn handle_socket(socket: WebSocket, ws_manager: Arc<WsManager>, user_id: Option<DbId>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, user_id = ?user_id, "WebSocket connected");

    let mut rx = ws_manager.add(conn_id.clone(), user_id).await;
    let (mut sink, mut stream) = socket.split();

    match serde_json::to_string(&RealtimeEvent::Ready) {
        Ok(ready) => {
            if sink.send(Message::Text(ready.into())).await.is_err() {
                ws_manager.remove(&conn_id).await;
                return;
            }
        }
        Err(e) => tracing::warn!(conn_id = %conn_id, error = %e, "Failed to encode ready frame"),
    }

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            // The stream is one-way; client messages are ignored.
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
