//! Subscriber WebSocket connections
//!
//! Each connection registers with the model, sends the snapshot it was given,
//! then forwards changes until either side goes away. Anything the client sends
//! other than ping or close is ignored.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use kittens_core::Subscription;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::protocol::ServerMessage;
use crate::AppState;

/// WebSocket upgrade handler for `/atl/str`
pub async fn subscriber_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let Subscription {
        id,
        snapshot,
        mut changes,
    } = match state.model.subscribe().await {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!("Could not register subscriber: {}", e);
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let (mut sender, mut receiver) = socket.split();
    info!(subscriber = %id, revisions = snapshot.revisions.len(), "Subscriber connected");

    if let Err(e) = send_json(&mut sender, &ServerMessage::from(snapshot)).await {
        warn!(subscriber = %id, "Snapshot send failed: {}", e);
    } else {
        loop {
            tokio::select! {
                msg = receiver.next() => match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(subscriber = %id, "WebSocket error: {}", e);
                        break;
                    }
                },
                change = changes.recv() => match change {
                    Some(change) => {
                        let revision = change.revision.id;
                        if let Err(e) = send_json(&mut sender, &ServerMessage::from(change)).await {
                            warn!(subscriber = %id, revision, "Change send failed: {}", e);
                            break;
                        }
                    }
                    None => {
                        debug!(subscriber = %id, "Model closed the change stream");
                        break;
                    }
                },
            }
        }
    }

    if let Err(e) = state.model.unsubscribe(id).await {
        debug!(subscriber = %id, "Unsubscribe skipped: {}", e);
    }
    info!(subscriber = %id, "Subscriber disconnected");
}

/// Helper to serialize and send a JSON message
async fn send_json<S, T>(sender: &mut S, msg: &T) -> Result<(), String>
where
    S: SinkExt<Message> + Unpin,
    S::Error: std::fmt::Display,
    T: Serialize,
{
    let json = serde_json::to_string(msg).map_err(|e| format!("Serialize error: {}", e))?;
    sender
        .send(Message::Text(json))
        .await
        .map_err(|e| format!("Send error: {}", e))
}
