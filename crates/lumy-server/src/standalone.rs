//! In-memory transport: client and controller in one process.
//!
//! Each target is one broadcast channel shared by both ends. Payloads are
//! framed with [`StandaloneCodec`] so each end skips what it sent itself.

use std::collections::HashMap;
use std::sync::Arc;

use lumy_pipeline::Backend;
use lumy_types::{MessageEnvelope, Target};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::warn;

use crate::codec::{EnvelopeCodec, StandaloneCodec};
use crate::controller::{DispatchController, DispatchControllerBuilder};
use crate::error::Result;
use crate::publisher::Transport;

/// Default per-target channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// One broadcast channel per target.
#[derive(Debug)]
pub struct StandaloneTransport {
    channels: HashMap<Target, broadcast::Sender<Value>>,
}

impl StandaloneTransport {
    pub fn new(capacity: usize) -> Self {
        let channels = Target::ALL
            .into_iter()
            .map(|target| (target, broadcast::channel(capacity).0))
            .collect();
        Self { channels }
    }

    pub fn subscribe(&self, target: Target) -> broadcast::Receiver<Value> {
        self.channels[&target].subscribe()
    }
}

impl Default for StandaloneTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl Transport for StandaloneTransport {
    fn publish(&self, target: Target, payload: Value) {
        // No receivers is fine: nobody is listening on that target yet.
        let _ = self.channels[&target].send(payload);
    }
}

/// Client end of the in-memory transport.
#[derive(Clone)]
pub struct StandaloneClient {
    controller: Arc<DispatchController>,
    transport: Arc<StandaloneTransport>,
    codec: StandaloneCodec,
}

impl StandaloneClient {
    /// Controller with default settings over `backend`.
    pub fn new(backend: Arc<dyn Backend>) -> Result<Self> {
        Self::with_controller(backend, |builder| builder)
    }

    /// Controller over `backend`, customised by `configure`.
    ///
    /// The server-side codec is always [`StandaloneCodec::server`].
    pub fn with_controller(
        backend: Arc<dyn Backend>,
        configure: impl FnOnce(DispatchControllerBuilder) -> DispatchControllerBuilder,
    ) -> Result<Self> {
        let transport = Arc::new(StandaloneTransport::default());
        let builder = DispatchController::builder(backend, transport.clone());
        let controller = configure(builder)
            .with_codec(Arc::new(StandaloneCodec::server()))
            .build()?;
        Ok(Self {
            controller: Arc::new(controller),
            transport,
            codec: StandaloneCodec::client(),
        })
    }

    /// Send an envelope and run it to completion on this task.
    pub async fn publish(&self, target: Target, envelope: &MessageEnvelope) {
        let payload = self.codec.encode(envelope);
        self.transport.publish(target, payload.clone());
        self.controller.handle_client_message(target, &payload).await;
    }

    /// Server envelopes published on `target` from now on.
    pub fn subscribe(&self, target: Target) -> StandaloneSubscription {
        StandaloneSubscription {
            target,
            receiver: self.transport.subscribe(target),
            codec: self.codec,
        }
    }

    pub fn controller(&self) -> &Arc<DispatchController> {
        &self.controller
    }
}

impl std::fmt::Debug for StandaloneClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandaloneClient")
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

/// Stream of server envelopes on one target.
pub struct StandaloneSubscription {
    target: Target,
    receiver: broadcast::Receiver<Value>,
    codec: StandaloneCodec,
}

impl StandaloneSubscription {
    /// Next server envelope; `None` once the transport is gone.
    pub async fn recv(&mut self) -> Option<MessageEnvelope> {
        loop {
            match self.receiver.recv().await {
                Ok(payload) => {
                    if let Some(envelope) = self.decode(&payload) {
                        return Some(envelope);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(target = %self.target, skipped, "Subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Every server envelope already waiting, without blocking.
    pub fn drain(&mut self) -> Vec<MessageEnvelope> {
        let mut envelopes = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(payload) => envelopes.extend(self.decode(&payload)),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(target = %self.target, skipped, "Subscriber lagged");
                }
                Err(_) => return envelopes,
            }
        }
    }

    fn decode(&self, payload: &Value) -> Option<MessageEnvelope> {
        match self.codec.decode(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(target = %self.target, "Undecodable server payload: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumy_pipeline::MockBackend;
    use serde_json::json;

    #[tokio::test]
    async fn test_client_only_sees_server_envelopes() {
        let client = StandaloneClient::new(Arc::new(MockBackend::default())).unwrap();
        let mut notes = client.subscribe(Target::Notes);

        client
            .publish(
                Target::Notes,
                &MessageEnvelope::new("GetNotes", Some(json!({"stepId": "P"}))),
            )
            .await;

        let received = notes.drain();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].action, "Notes");
    }

    #[tokio::test]
    async fn test_recv_waits_for_next_envelope() {
        let client = StandaloneClient::new(Arc::new(MockBackend::default())).unwrap();
        let mut workflow = client.subscribe(Target::Workflow);
        client
            .publish(Target::Workflow, &MessageEnvelope::empty("GetCurrent"))
            .await;
        let envelope = workflow.recv().await.unwrap();
        assert_eq!(envelope.action, "Updated");
        assert_eq!(envelope.content, Some(json!({})));
    }
}
