//! Batched resolution of registered assets.
//!
//! Pending records are processed in batches of `concurrency`; each batch is
//! awaited as a whole before the next starts. A record resolves at most once
//! no matter how many nodes referenced it, and a failed record keeps its URL
//! with a terminal error instead of being removed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use domframe_core::{AssetKind, Dimensions};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::timeout_at;
use tracing::{info, warn};

use crate::data_uri::{is_data_uri, parse_data_uri, ImageFormat};
use crate::error::{AssetError, AssetResult};
use crate::fetch::AssetFetcher;
use crate::probe::decode_image_dimensions;
use crate::registry::{AssetRegistry, PendingAsset};
use crate::retry::{fetch_with_retry, RetryConfig};

/// Pipeline limits.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Fetch/encode operations outstanding at once.
    pub concurrency: usize,
    /// Backoff policy for transient failures.
    pub retry: RetryConfig,
    /// Largest decoded `data:` URI payload accepted.
    pub max_inline_bytes: usize,
    /// Largest fetched response accepted.
    pub max_fetch_bytes: usize,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            retry: RetryConfig::default(),
            max_inline_bytes: 5 * 1024 * 1024,
            max_fetch_bytes: 15 * 1024 * 1024,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// One asset that ended with a terminal error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetFailure {
    /// Asset kind.
    pub kind: AssetKind,
    /// Absolute URL.
    pub url: String,
    /// Error message stored on the record.
    pub error: String,
}

/// Outcome of a resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    /// Records processed.
    pub attempted: usize,
    /// Records that received a payload.
    pub resolved: usize,
    /// Records that received a terminal error.
    pub failed: usize,
    /// Records decoded from `data:` URIs.
    pub inline: usize,
    /// Network requests issued, retries included.
    pub fetches: u32,
    /// Batches awaited.
    pub batches: usize,
    /// Failure details, in processing order.
    pub failures: Vec<AssetFailure>,
    /// Wall-clock time spent.
    pub duration_ms: u64,
}

struct Encoded {
    payload: String,
    mime: Option<String>,
    dimensions: Option<Dimensions>,
}

struct Resolution {
    result: AssetResult<Encoded>,
    fetches: u32,
    inline: bool,
}

/// Resolves registry records through an [`AssetFetcher`].
#[derive(Clone)]
pub struct AssetPipeline {
    fetcher: Arc<dyn AssetFetcher>,
    config: PipelineConfig,
}

impl std::fmt::Debug for AssetPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetPipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AssetPipeline {
    /// Create a pipeline.
    #[must_use]
    pub fn new(fetcher: Arc<dyn AssetFetcher>, config: PipelineConfig) -> Self {
        Self { fetcher, config }
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Resolve every pending record in the registry.
    pub async fn resolve(&self, registry: &mut AssetRegistry) -> PipelineReport {
        let started = Instant::now();
        let pending = registry.pending();
        let mut report = PipelineReport {
            attempted: pending.len(),
            ..PipelineReport::default()
        };

        for batch in pending.chunks(self.batch_size()) {
            let results = self.resolve_batch(batch).await;
            Self::record_batch(registry, &mut report, batch, results);
        }

        Self::finish(report, started)
    }

    /// Resolve pending records, giving up once `deadline` passes.
    ///
    /// A batch still in flight at the deadline is abandoned and its records
    /// stay pending.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::BudgetExhausted`] when the deadline passes
    /// before every batch has finished.
    pub async fn resolve_until(&self, registry: &mut AssetRegistry, deadline: Instant) -> AssetResult<PipelineReport> {
        let started = Instant::now();
        let pending = registry.pending();
        let mut report = PipelineReport {
            attempted: pending.len(),
            ..PipelineReport::default()
        };

        for batch in pending.chunks(self.batch_size()) {
            if Instant::now() >= deadline {
                return Err(Self::exhausted(&report, pending.len()));
            }
            let Ok(results) = timeout_at(deadline.into(), self.resolve_batch(batch)).await else {
                return Err(Self::exhausted(&report, pending.len()));
            };
            Self::record_batch(registry, &mut report, batch, results);
        }

        Ok(Self::finish(report, started))
    }

    fn batch_size(&self) -> usize {
        self.config.concurrency.max(1)
    }

    async fn resolve_batch(&self, batch: &[PendingAsset]) -> Vec<Resolution> {
        join_all(batch.iter().map(|asset| self.resolve_one(asset))).await
    }

    fn record_batch(
        registry: &mut AssetRegistry,
        report: &mut PipelineReport,
        batch: &[PendingAsset],
        results: Vec<Resolution>,
    ) {
        report.batches += 1;
        for (asset, resolution) in batch.iter().zip(results) {
            report.fetches += resolution.fetches;
            if resolution.inline {
                report.inline += 1;
            }
            Self::apply(registry, report, asset, resolution.result);
        }
    }

    fn exhausted(report: &PipelineReport, pending: usize) -> AssetError {
        warn!(
            settled = report.resolved + report.failed,
            pending,
            "asset deadline passed"
        );
        AssetError::BudgetExhausted
    }

    fn finish(mut report: PipelineReport, started: Instant) -> PipelineReport {
        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            attempted = report.attempted,
            resolved = report.resolved,
            failed = report.failed,
            fetches = report.fetches,
            "asset pipeline finished"
        );
        report
    }

    fn apply(registry: &mut AssetRegistry, report: &mut PipelineReport, asset: &PendingAsset, result: AssetResult<Encoded>) {
        let Some(record) = registry.get_mut(asset.kind, &asset.key) else {
            return;
        };
        match result {
            Ok(encoded) => {
                if record.resolve(encoded.payload, encoded.mime, encoded.dimensions) {
                    report.resolved += 1;
                }
            }
            Err(error) => {
                let message = error.to_string();
                warn!(url = %asset.url, error = %message, "asset failed");
                if record.fail(message.clone()) {
                    report.failed += 1;
                    report.failures.push(AssetFailure {
                        kind: asset.kind,
                        url: asset.url.clone(),
                        error: message,
                    });
                }
            }
        }
    }

    async fn resolve_one(&self, asset: &PendingAsset) -> Resolution {
        if is_data_uri(&asset.url) {
            let result = parse_data_uri(&asset.url, self.config.max_inline_bytes)
                .map(|data| encode(asset.kind, &data.bytes, Some(data.mime)));
            return Resolution {
                result,
                fetches: 0,
                inline: true,
            };
        }

        let (result, fetches) = fetch_with_retry(self.fetcher.as_ref(), &asset.url, &self.config.retry).await;
        Resolution {
            result: result.map(|fetched| encode(asset.kind, &fetched.bytes, fetched.mime)),
            fetches,
            inline: false,
        }
    }
}

/// Turn raw bytes into a record payload.
///
/// SVGs keep their markup as text; images and fonts are base64 encoded.
fn encode(kind: AssetKind, bytes: &[u8], mime: Option<String>) -> Encoded {
    let sniffed = ImageFormat::from_magic_bytes(bytes);
    let mime = mime
        .filter(|m| m != "application/octet-stream" && m != "text/plain")
        .or_else(|| sniffed.mime().map(str::to_string));

    match kind {
        AssetKind::Svg => Encoded {
            dimensions: decode_image_dimensions(bytes),
            payload: String::from_utf8_lossy(bytes).into_owned(),
            mime: mime.or_else(|| Some("image/svg+xml".to_string())),
        },
        AssetKind::Image => Encoded {
            dimensions: decode_image_dimensions(bytes),
            payload: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime,
        },
        AssetKind::Font => Encoded {
            dimensions: None,
            payload: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime,
        },
    }
}
