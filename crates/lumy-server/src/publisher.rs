//! Outbound path: envelope → codec → transport.

use std::sync::Arc;

use lumy_types::{Message, MessageEnvelope, Target};
use serde_json::Value;
use tracing::{Level, debug};

use crate::codec::EnvelopeCodec;
use crate::error::HandlerResult;

/// Default length above which outbound log lines are truncated.
pub const DEFAULT_MAX_LOG_LEN: usize = 1000;

const ELLIPSIS: &str = "...";

/// The transport adapter's publish primitive.
///
/// Called concurrently from request handling and from backend event
/// callbacks; implementations must not block.
pub trait Transport: Send + Sync {
    fn publish(&self, target: Target, payload: Value);
}

/// Shared handle that publishes on any target.
///
/// Cloned into every handler and every backend subscription callback.
#[derive(Clone)]
pub struct Publisher {
    codec: Arc<dyn EnvelopeCodec>,
    transport: Arc<dyn Transport>,
    max_log_len: usize,
}

impl Publisher {
    pub fn new(codec: Arc<dyn EnvelopeCodec>, transport: Arc<dyn Transport>) -> Self {
        Self {
            codec,
            transport,
            max_log_len: DEFAULT_MAX_LOG_LEN,
        }
    }

    pub fn with_max_log_len(mut self, max_log_len: usize) -> Self {
        self.max_log_len = max_log_len;
        self
    }

    /// Encode and hand an envelope to the transport.
    pub fn publish_on_target(&self, target: Target, envelope: &MessageEnvelope) {
        if tracing::enabled!(Level::DEBUG) {
            let rendered = serde_json::to_string(&envelope.content).unwrap_or_default();
            debug!(
                target = %target,
                action = %envelope.action,
                content = %truncate(&rendered, self.max_log_len),
                "Publishing"
            );
        }
        self.transport.publish(target, self.codec.encode(envelope));
    }

    /// Publish a typed message on its own target.
    pub fn publish<M: Message>(&self, message: &M) -> HandlerResult<()> {
        let envelope = message.to_envelope()?;
        self.publish_on_target(M::target(), &envelope);
        Ok(())
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("max_log_len", &self.max_log_len)
            .finish_non_exhaustive()
    }
}

/// Cut `text` to `max` chars, ending in `...` when cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(ELLIPSIS.len());
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str(ELLIPSIS);
    cut
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    /// Transport that records every payload.
    #[derive(Debug, Default)]
    pub struct RecordingTransport {
        pub sent: Mutex<Vec<(Target, Value)>>,
    }

    impl RecordingTransport {
        pub fn on(&self, target: Target) -> Vec<Value> {
            self.sent
                .lock()
                .iter()
                .filter(|(t, _)| *t == target)
                .map(|(_, v)| v.clone())
                .collect()
        }

        pub fn actions(&self, target: Target) -> Vec<String> {
            self.on(target)
                .iter()
                .filter_map(|v| v["action"].as_str().map(str::to_string))
                .collect()
        }
    }

    impl Transport for RecordingTransport {
        fn publish(&self, target: Target, payload: Value) {
            self.sent.lock().push((target, payload));
        }
    }
}
