//! Error types for the server.

use lumy_pipeline::BackendError;
use lumy_types::ProtocolError;
use thiserror::Error;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind the listener.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Building the message registry failed.
    #[error("Registry error: {0}")]
    Registry(#[from] ProtocolError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Transport payload could not be turned into an envelope.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Payload text is not JSON.
    #[error("Payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is JSON but not a valid envelope.
    #[error(transparent)]
    Envelope(#[from] ProtocolError),
}

/// A handler operation failed.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Inbound content did not decode, or an outbound message did not encode.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The backend collaborator failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// The inbound payload did not decode.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Result type for handler operations.
pub type HandlerResult<T> = std::result::Result<T, HandlerError>;

/// Render an error and its `source()` chain, outermost first.
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join("\n  caused by: ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_chain_lists_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.tsx");
        let err = HandlerError::Backend(BackendError::Io {
            path: "/tmp/missing.tsx".into(),
            source: io,
        });
        let chain = error_chain(&err);
        assert!(chain.starts_with("Backend error:"));
        assert!(chain.ends_with("caused by: missing.tsx"));
    }
}
