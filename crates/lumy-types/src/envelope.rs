//! Transport-neutral message envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Message, ProtocolError, Result};

const ACTION_FIELD: &str = "action";
const CONTENT_FIELD: &str = "content";

/// `{ action, content? }`, always scoped to one target by the transport.
///
/// A `null` content is normalized to `None`, so an envelope survives a trip
/// through [`MessageEnvelope::to_value`] and [`MessageEnvelope::from_value`]
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

impl MessageEnvelope {
    /// Create an envelope.
    pub fn new(action: impl Into<String>, content: Option<Value>) -> Self {
        Self {
            action: action.into(),
            content: content.filter(|c| !c.is_null()),
        }
    }

    /// Create an envelope with no content.
    pub fn empty(action: impl Into<String>) -> Self {
        Self::new(action, None)
    }

    /// Wrap a typed message using its own action.
    pub fn from_message<M: Message>(message: &M) -> Result<Self> {
        Ok(Self::new(M::action(), Some(serde_json::to_value(message)?)))
    }

    /// Parse the content into a typed message.
    ///
    /// Missing content is treated as an empty object so that schemas whose
    /// fields are all optional decode from a bare action.
    pub fn parse_content<M: Message>(&self) -> Result<M> {
        let content = self
            .content
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()));
        serde_json::from_value(content).map_err(|source| ProtocolError::Content {
            type_name: M::TYPE_NAME,
            source,
        })
    }

    /// Render as a JSON object.
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert(ACTION_FIELD.to_string(), Value::String(self.action.clone()));
        if let Some(content) = &self.content {
            object.insert(CONTENT_FIELD.to_string(), content.clone());
        }
        Value::Object(object)
    }

    /// Read an envelope out of a JSON value.
    ///
    /// Returns `Ok(None)` when the value is not an object or has no action;
    /// a present but non-string action is an error.
    pub fn from_value(value: &Value) -> Result<Option<Self>> {
        let Some(object) = value.as_object() else {
            return Ok(None);
        };
        let action = match object.get(ACTION_FIELD) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(action)) => action.clone(),
            Some(other) => return Err(ProtocolError::InvalidAction(other.to_string())),
        };
        Ok(Some(Self::new(action, object.get(CONTENT_FIELD).cloned())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{MsgModuleIOInputValuesUpdated, MsgWorkflowGetWorkflowList};
    use serde_json::json;

    #[test]
    fn test_from_message_uses_schema_action() {
        let msg = MsgModuleIOInputValuesUpdated {
            step_id: "P".to_string(),
            input_ids: vec!["a".to_string()],
        };
        let envelope = MessageEnvelope::from_message(&msg).unwrap();
        assert_eq!(envelope.action, "InputValuesUpdated");
        assert_eq!(
            envelope.content,
            Some(json!({"stepId": "P", "inputIds": ["a"]}))
        );
    }

    #[test]
    fn test_null_content_is_normalized() {
        let envelope = MessageEnvelope::new("GetCurrent", Some(Value::Null));
        assert_eq!(envelope.content, None);
        assert_eq!(envelope.to_value(), json!({"action": "GetCurrent"}));
    }

    #[test]
    fn test_from_value_missing_action_is_none() {
        assert!(MessageEnvelope::from_value(&json!({"content": {}}))
            .unwrap()
            .is_none());
        assert!(MessageEnvelope::from_value(&json!("text")).unwrap().is_none());
    }

    #[test]
    fn test_from_value_non_string_action_is_error() {
        let err = MessageEnvelope::from_value(&json!({"action": 42})).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidAction(_)));
    }

    #[test]
    fn test_value_round_trip() {
        let envelope = MessageEnvelope::new("Add", Some(json!({"stepId": "s", "note": {}})));
        let decoded = MessageEnvelope::from_value(&envelope.to_value()).unwrap();
        assert_eq!(decoded, Some(envelope));
    }

    #[test]
    fn test_parse_content_defaults_missing_content() {
        let envelope = MessageEnvelope::empty("GetWorkflowList");
        let msg: MsgWorkflowGetWorkflowList = envelope.parse_content().unwrap();
        assert_eq!(msg.include_workflow, None);
    }

    #[test]
    fn test_parse_content_reports_schema() {
        let envelope = MessageEnvelope::new("InputValuesUpdated", Some(json!({"stepId": 1})));
        let err = envelope
            .parse_content::<MsgModuleIOInputValuesUpdated>()
            .unwrap_err();
        match err {
            ProtocolError::Content { type_name, .. } => {
                assert_eq!(type_name, "MsgModuleIOInputValuesUpdated")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
