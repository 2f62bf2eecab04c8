//! Exponential backoff around a fetcher.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AssetResult;
use crate::fetch::{AssetFetcher, FetchedAsset};

/// Configuration for retry with exponential backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 2000,
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay_ms: u64, max_delay_ms: u64, multiplier: f64) -> Self {
        Self {
            max_attempts,
            initial_delay_ms,
            max_delay_ms,
            multiplier,
        }
    }

    /// Calculate delay for a given attempt number (0-indexed).
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let base_delay = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        base_delay.min(self.max_delay_ms as f64) as u64
    }
}

/// Fetch `url`, retrying transient failures.
///
/// Returns the outcome together with the number of requests issued. The
/// outcome is the last error once attempts are exhausted, or the first
/// non-retryable error.
pub async fn fetch_with_retry(
    fetcher: &dyn AssetFetcher,
    url: &str,
    config: &RetryConfig,
) -> (AssetResult<FetchedAsset>, u32) {
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match fetcher.fetch_bytes(url).await {
            Ok(fetched) => return (Ok(fetched), attempt + 1),
            Err(error) if error.is_retryable() && attempt + 1 < max_attempts => {
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    "Asset fetch {} failed (attempt {}/{}), retrying in {}ms: {}",
                    url,
                    attempt + 1,
                    max_attempts,
                    delay,
                    error
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
                attempt += 1;
            }
            Err(error) => return (Err(error), attempt + 1),
        }
    }
}
