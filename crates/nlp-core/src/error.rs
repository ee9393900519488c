// Error types shared by collaborators

use thiserror::Error;

use crate::message::MessageError;

/// Result type alias for collaborator operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by pipelines, document sources and buses
#[derive(Debug, Error)]
pub enum CoreError {
    /// Document could not be resolved in the given index
    #[error("Document not found: {id} (index: {index}, routing: {routing})")]
    DocumentNotFound {
        index: String,
        id: String,
        routing: String,
    },

    /// Pipeline initialization or processing failed
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Transport-level bus failure
    #[error("Bus error: {0}")]
    Bus(String),

    /// Bus connection is gone; nothing more can be received
    #[error("Bus closed")]
    BusClosed,

    /// Message did not match the bus protocol
    #[error("Invalid message: {0}")]
    Message(#[from] MessageError),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem or stream I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    /// Create a document-not-found error
    pub fn not_found(
        index: impl Into<String>,
        id: impl Into<String>,
        routing: impl Into<String>,
    ) -> Self {
        CoreError::DocumentNotFound {
            index: index.into(),
            id: id.into(),
            routing: routing.into(),
        }
    }

    /// Create a pipeline error
    pub fn pipeline(msg: impl Into<String>) -> Self {
        CoreError::Pipeline(msg.into())
    }

    /// Create a bus error
    pub fn bus(msg: impl Into<String>) -> Self {
        CoreError::Bus(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = CoreError::not_found("local-datashare", "doc1", "root1");
        assert_eq!(
            err.to_string(),
            "Document not found: doc1 (index: local-datashare, routing: root1)"
        );
    }

    #[test]
    fn test_message_error_converts() {
        let err: CoreError = MessageError::InvalidValue("abc".to_string()).into();
        assert!(matches!(err, CoreError::Message(_)));
    }
}
