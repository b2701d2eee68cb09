//! WebSocket transport: one socket per target channel.
//!
//! `GET /ws/{target}` attaches a socket to a target. Text frames (or UTF-8
//! binary frames) carry `{action, content?}` envelopes. Every publish on a
//! target is broadcast to all sockets attached to it.

mod connection;

use std::collections::HashMap;

use axum::{
    extract::{
        Path, State,
        ws::{WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lumy_types::Target;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::publisher::Transport;
use crate::state::AppState;

/// Per-target broadcast of encoded frames.
#[derive(Debug)]
pub struct WsTransport {
    channels: HashMap<Target, broadcast::Sender<String>>,
}

impl WsTransport {
    pub fn new(capacity: usize) -> Self {
        let channels = Target::ALL
            .into_iter()
            .map(|target| (target, broadcast::channel(capacity.max(1)).0))
            .collect();
        Self { channels }
    }

    /// Frames published on `target` from now on.
    pub fn subscribe(&self, target: Target) -> broadcast::Receiver<String> {
        self.channels[&target].subscribe()
    }

    /// Sockets currently attached to `target`.
    pub fn socket_count(&self, target: Target) -> usize {
        self.channels[&target].receiver_count()
    }
}

impl Transport for WsTransport {
    fn publish(&self, target: Target, payload: Value) {
        let frame = payload.to_string();
        if self.channels[&target].send(frame).is_err() {
            debug!(target = %target, "No sockets attached, frame dropped");
        }
    }
}

/// GET /ws/{target} - WebSocket upgrade handler.
pub async fn ws_handler(
    Path(target): Path<String>,
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Ok(target) = target.parse::<Target>() else {
        return (StatusCode::NOT_FOUND, format!("Unknown target: {target}")).into_response();
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };
    // Attach before the handshake completes so no publish after it is missed.
    let outbound = state.transport.subscribe(target);
    ws.on_upgrade(move |socket| connection::handle_socket(socket, state, target, outbound))
}
