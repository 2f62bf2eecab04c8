//! Asset pipeline error types.

use thiserror::Error;

/// Result type for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;

/// Errors that can occur while resolving an asset.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// The URL could not be parsed or joined against the base.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Connection-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Request did not complete in time.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Payload exceeds the configured cap.
    #[error("Payload too large: {size} bytes (limit {limit})")]
    TooLarge {
        /// Actual or announced size in bytes.
        size: usize,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// Malformed `data:` URI.
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    /// The run's deadline passed before resolution finished.
    #[error("Asset budget exhausted")]
    BudgetExhausted,
}

impl AssetError {
    /// Whether another attempt may succeed.
    ///
    /// Network failures, timeouts, 429 and 5xx responses are transient;
    /// everything else is terminal.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for AssetError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(ToString::to_string).unwrap_or_default();
        if err.is_timeout() {
            Self::Timeout(url)
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
                url,
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}
