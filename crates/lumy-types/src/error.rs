//! Error types for the protocol layer.

use thiserror::Error;

use crate::Target;

/// Result type alias using the protocol error type.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while building the registry or decoding message content.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Two schemas resolved to the same `(target, action)` pair.
    #[error("duplicate action '{action}' on target '{target}': {existing} and {duplicate}")]
    DuplicateAction {
        target: Target,
        action: String,
        existing: &'static str,
        duplicate: &'static str,
    },

    /// A schema type name that carries no `Msg` prefix or no action.
    #[error("invalid message type name '{0}'")]
    InvalidTypeName(String),

    /// Unknown target name.
    #[error("unknown target '{0}'")]
    InvalidTarget(String),

    /// An envelope whose action field is present but not a string.
    #[error("envelope action must be a string, got {0}")]
    InvalidAction(String),

    /// Envelope content did not match the message schema.
    #[error("failed to decode {type_name} content: {source}")]
    Content {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Workflow definition failed validation.
    #[error("invalid workflow: {0}")]
    InvalidWorkflow(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
