//! WebSocket handler for Axum
//!
//! Handles live-view connections: subscribe to the conversation room on
//! connect, pump accepted messages out as JSON frames, unsubscribe on
//! disconnect.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::Response,
};
use futures::{stream::StreamExt, SinkExt};
use uuid::Uuid;

use chatline_events::store;

use crate::state::AppState;

/// WebSocket handler - upgrades HTTP connection to WebSocket
///
/// Rejects the upgrade with 404 when the conversation does not exist, so a
/// client cannot sit subscribed to an id that will never receive traffic.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Response, StatusCode> {
    match store::conversation_exists(&state.pool, conversation_id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(
                conversation_id = %conversation_id,
                "Live view rejected: conversation not found"
            );
            return Err(StatusCode::NOT_FOUND);
        }
        Err(e) => {
            tracing::error!(error = ?e, "Live view upgrade: database error");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, conversation_id, state)))
}

/// Handle individual live-view connection
async fn handle_socket(socket: WebSocket, conversation_id: Uuid, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let mut subscription = state.broker.subscribe(conversation_id).await;
    let subscription_id = subscription.id;

    tracing::info!(
        conversation_id = %conversation_id,
        subscription_id = %subscription_id,
        "Live view session connected"
    );

    // Spawn task to push accepted messages to the client
    let send_task = tokio::spawn(async move {
        while let Some(push) = subscription.receiver.recv().await {
            match serde_json::to_string(&push) {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break; // Connection closed
                    }
                }
                Err(e) => {
                    tracing::error!(error = ?e, "Failed to serialize message push");
                }
            }
        }
    });

    // The live view is read-only; drain the socket so close frames are seen
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                tracing::warn!(
                    subscription_id = %subscription_id,
                    message = %text,
                    "Unexpected message from live viewer"
                );
            }
            Ok(Message::Close(_)) => {
                tracing::info!(
                    subscription_id = %subscription_id,
                    "WebSocket close frame received"
                );
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // Axum handles ping/pong automatically
            }
            Ok(_) => {} // Ignore binary messages
            Err(_) => break,
        }
    }

    // Cleanup on disconnect
    tracing::info!(
        conversation_id = %conversation_id,
        subscription_id = %subscription_id,
        "Live view session closing"
    );
    state
        .broker
        .unsubscribe(&conversation_id, &subscription_id)
        .await;

    send_task.abort();
}
