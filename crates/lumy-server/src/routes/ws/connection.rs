//! WebSocket connection lifecycle.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use lumy_types::Target;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::state::AppState;

/// Serve one socket attached to `target` until either side closes.
pub async fn handle_socket(
    socket: WebSocket,
    state: AppState,
    target: Target,
    mut outbound: broadcast::Receiver<String>,
) {
    let (mut sender, mut receiver) = socket.split();
    let connection_id = Uuid::new_v4();

    tracing::debug!(
        connection_id = %connection_id,
        target = %target,
        "WebSocket connection established"
    );

    loop {
        tokio::select! {
            inbound = receiver.next() => {
                // Text and UTF-8 binary frames both carry JSON envelopes.
                let text = match inbound {
                    Some(Ok(Message::Text(text))) => text.to_string(),
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                        Ok(text) => text,
                        Err(_) => {
                            tracing::warn!(
                                connection_id = %connection_id,
                                "Ignoring non-UTF-8 binary frame"
                            );
                            continue;
                        }
                    },
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                        continue;
                    }
                    Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::warn!(connection_id = %connection_id, "WebSocket error: {}", e);
                        break;
                    }
                };
                state.controller.handle_client_text(target, &text).await;
            }
            frame = outbound.recv() => match frame {
                Ok(frame) => {
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        connection_id = %connection_id,
                        target = %target,
                        skipped,
                        "Socket lagged behind, frames dropped"
                    );
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    tracing::debug!(
        connection_id = %connection_id,
        target = %target,
        "WebSocket connection closed"
    );
}
