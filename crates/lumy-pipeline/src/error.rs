//! Error types for the backend collaborator.

use thiserror::Error;

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors that can occur while loading workflows or touching the engine.
#[derive(Debug, Error)]
pub enum BackendError {
    /// An operation needs a workflow but none is loaded.
    #[error("No workflow loaded")]
    NoWorkflow,

    /// Workflow file not found.
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    /// Invalid workflow definition.
    #[error("Invalid workflow: {0}")]
    InvalidWorkflow(String),

    /// Step id not known to the engine.
    #[error("Unknown step: {0}")]
    UnknownStep(String),

    /// I/O id not known on a step.
    #[error("Unknown I/O '{io_id}' on step '{step_id}'")]
    UnknownIo { step_id: String, io_id: String },

    /// Module name not known to the engine.
    #[error("Unknown module: {0}")]
    UnknownModule(String),

    /// A module failed while processing.
    #[error("Module '{module}' failed: {message}")]
    ModuleFailed { module: String, message: String },

    /// Data registry item not found.
    #[error("Data item not found: {0}")]
    ItemNotFound(String),

    /// Filesystem failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// YAML workflow parse failure.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parse failure.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol-level type failure.
    #[error(transparent)]
    Protocol(#[from] lumy_types::ProtocolError),
}

impl BackendError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        BackendError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub(crate) fn module_failed(module: impl Into<String>, message: impl Into<String>) -> Self {
        BackendError::ModuleFailed {
            module: module.into(),
            message: message.into(),
        }
    }
}
