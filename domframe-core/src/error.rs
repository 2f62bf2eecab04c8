//! Error types for document operations.

use thiserror::Error;

/// Result type for core document operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while building or serializing a document.
///
/// Style and geometry normalization never produce these: malformed input
/// degrades to `None`/empty values instead.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Node not found in the document tree.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// The document violates a structural invariant.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Document serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
