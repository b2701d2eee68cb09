//! Envelope codecs: [`MessageEnvelope`] ⇄ transport payload.
//!
//! Payloads are JSON values; transports own the byte framing. Decoding yields
//! `Ok(None)` for payloads that carry no action (noise, or our own echo) and
//! `Err` only when an action is present but malformed.

use lumy_types::MessageEnvelope;
use serde_json::{Map, Value};

use crate::error::CodecError;

/// Translation between envelopes and one transport's payload format.
pub trait EnvelopeCodec: Send + Sync {
    /// Encode an envelope. Pure: no side effects.
    fn encode(&self, envelope: &MessageEnvelope) -> Value;

    /// Decode a payload; `Ok(None)` when there is nothing to handle.
    fn decode(&self, payload: &Value) -> Result<Option<MessageEnvelope>, CodecError>;

    /// Decode payload text.
    fn decode_text(&self, text: &str) -> Result<Option<MessageEnvelope>, CodecError> {
        let payload: Value = serde_json::from_str(text)?;
        self.decode(&payload)
    }
}

/// Bare `{action, content?}` objects, as carried by WebSocket frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl EnvelopeCodec for JsonCodec {
    fn encode(&self, envelope: &MessageEnvelope) -> Value {
        envelope.to_value()
    }

    fn decode(&self, payload: &Value) -> Result<Option<MessageEnvelope>, CodecError> {
        Ok(MessageEnvelope::from_value(payload)?)
    }
}

/// Which end of a standalone channel a payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    Client,
    Server,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::Client => "client",
            Sender::Server => "server",
        }
    }
}

const SENDER_FIELD: &str = "sender";
const CONTENT_FIELD: &str = "content";

/// `{sender, content: envelope}` framing for the in-memory transport.
///
/// Both ends share one channel per target, so each end tags what it sends and
/// ignores payloads carrying its own tag.
#[derive(Debug, Clone, Copy)]
pub struct StandaloneCodec {
    side: Sender,
}

impl StandaloneCodec {
    pub fn client() -> Self {
        Self {
            side: Sender::Client,
        }
    }

    pub fn server() -> Self {
        Self {
            side: Sender::Server,
        }
    }
}

impl EnvelopeCodec for StandaloneCodec {
    fn encode(&self, envelope: &MessageEnvelope) -> Value {
        let mut framed = Map::new();
        framed.insert(
            SENDER_FIELD.to_string(),
            Value::String(self.side.as_str().to_string()),
        );
        framed.insert(CONTENT_FIELD.to_string(), envelope.to_value());
        Value::Object(framed)
    }

    fn decode(&self, payload: &Value) -> Result<Option<MessageEnvelope>, CodecError> {
        if payload.get(SENDER_FIELD).and_then(Value::as_str) == Some(self.side.as_str()) {
            return Ok(None);
        }
        match payload.get(CONTENT_FIELD) {
            Some(content) => Ok(MessageEnvelope::from_value(content)?),
            None => Ok(None),
        }
    }
}
