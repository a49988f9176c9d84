//! Validation errors shared by the IR and protocol layers.

use thiserror::Error;

/// A malformed IR document or protocol message.
///
/// Rejected as a whole, never partially applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid IR document: {}", .0.join("; "))]
    Document(Vec<String>),

    #[error("schema version {found} does not match store version {expected}")]
    SchemaVersion { expected: String, found: String },

    #[error("invalid protocol message: {0}")]
    Message(String),
}

impl ValidationError {
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }
}
