//! Error types for the log core.

use thiserror::Error;

/// Errors surfaced by log operations.
///
/// Mirrors the four error kinds of the design: bad constructor arguments,
/// blob store failures, malformed persisted bytes, and internal invariant
/// breaks. Every variant carries enough context (node kind, URI) to act on
/// without re-deriving it from a stack trace.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("storage error at {uri}: {source}")]
    Storage { uri: String, source: String },

    #[error("decode error for {node_kind}: {message}")]
    Decode { node_kind: String, message: String },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl LogError {
    pub(crate) fn storage(uri: impl Into<String>, source: impl Into<String>) -> Self {
        LogError::Storage {
            uri: uri.into(),
            source: source.into(),
        }
    }

    pub(crate) fn decode(node_kind: impl Into<String>, message: impl Into<String>) -> Self {
        LogError::Decode {
            node_kind: node_kind.into(),
            message: message.into(),
        }
    }
}
