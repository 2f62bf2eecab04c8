//! Critical run failures.
//!
//! Anything in here aborts the whole run. Per-node problems are recorded in
//! the diagnostics log instead and never surface as an error.

use domframe_core::CoreError;
use thiserror::Error;

/// Result type for extraction runs.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Errors that abort an extraction run.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The wall-clock budget ran out.
    #[error("Extraction exceeded its time budget of {budget_ms}ms")]
    Timeout {
        /// Configured budget.
        budget_ms: u64,
    },

    /// More nodes than the configured cap.
    #[error("Node limit of {limit} exceeded")]
    NodeLimitExceeded {
        /// Configured cap.
        limit: usize,
    },

    /// No root node could be produced.
    #[error("Root element unavailable: {0}")]
    RootUnavailable(String),

    /// The render snapshot could not be read.
    #[error("Invalid render snapshot: {0}")]
    Snapshot(String),

    /// The assembled document failed validation or serialization.
    #[error("Document error: {0}")]
    Document(#[from] CoreError),

    /// JSON error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_limit_message_names_the_cap() {
        let err = ExtractError::NodeLimitExceeded { limit: 15_000 };
        assert_eq!(err.to_string(), "Node limit of 15000 exceeded");
    }

    #[test]
    fn test_timeout_message() {
        let err = ExtractError::Timeout { budget_ms: 60_000 };
        assert!(err.to_string().contains("60000ms"));
    }
}
