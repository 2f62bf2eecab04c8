//! Network access for the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{AssetError, AssetResult};

/// Bytes returned by a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAsset {
    /// Response body.
    pub bytes: Vec<u8>,
    /// `Content-Type` header, if any.
    pub mime: Option<String>,
}

/// Fetches asset bytes by absolute URL.
///
/// Implementations must be cheap to share across concurrent fetches.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetch one URL.
    ///
    /// # Errors
    ///
    /// Returns an [`AssetError`]; [`AssetError::is_retryable`] decides
    /// whether the pipeline tries again.
    async fn fetch_bytes(&self, url: &str) -> AssetResult<FetchedAsset>;
}

/// HTTP fetcher built on `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpFetcher {
    /// Create a fetcher with a per-request timeout and response size cap.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration, max_bytes: usize) -> AssetResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("domframe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AssetError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, max_bytes })
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch_bytes(&self, url: &str) -> AssetResult<FetchedAsset> {
        debug!(url, "fetching asset");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(length) = response.content_length() {
            let length = usize::try_from(length).unwrap_or(usize::MAX);
            if length > self.max_bytes {
                return Err(AssetError::TooLarge {
                    size: length,
                    limit: self.max_bytes,
                });
            }
        }

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or_default().trim().to_lowercase())
            .filter(|v| !v.is_empty());

        let bytes = response.bytes().await?;
        if bytes.len() > self.max_bytes {
            return Err(AssetError::TooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }

        Ok(FetchedAsset {
            bytes: bytes.to_vec(),
            mime,
        })
    }
}
