//! Asset Pipeline Tests
//!
//! Drives registry + pipeline together:
//! - Deduplicated references fetch once
//! - Data URIs resolve without the network, under a size cap
//! - Terminal failures keep the URL
//! - Batching honors the concurrency bound
//! - The deadline aborts resolution, even mid-batch
//! - HTTP fetching with retry against a mock server

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use domframe_assets::{
    AssetError, AssetFetcher, AssetPipeline, AssetRegistry, AssetResult, FetchedAsset, HttpFetcher,
    PipelineConfig, RetryConfig,
};
use domframe_core::{AssetKind, Dimensions};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

fn pixel_png() -> Vec<u8> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(PIXEL_PNG)
        .expect("base64")
}

/// Serves fixed responses by URL and records every call.
#[derive(Default)]
struct StaticFetcher {
    responses: HashMap<String, AssetResult<FetchedAsset>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl StaticFetcher {
    fn with(mut self, url: &str, response: AssetResult<FetchedAsset>) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl AssetFetcher for StaticFetcher {
    async fn fetch_bytes(&self, url: &str) -> AssetResult<FetchedAsset> {
        self.calls.lock().expect("lock").push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(AssetError::Status { status: 404, url: url.to_string() }))
    }
}

fn png(bytes: Vec<u8>) -> AssetResult<FetchedAsset> {
    Ok(FetchedAsset {
        bytes,
        mime: Some("image/png".to_string()),
    })
}

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        retry: RetryConfig::new(3, 1, 4, 2.0),
        ..PipelineConfig::default()
    }
}

// ============================================================================
// Deduplication
// ============================================================================

#[tokio::test]
async fn test_same_absolute_url_fetches_once() {
    let fetcher = Arc::new(
        StaticFetcher::default().with("https://example.com/img/logo.png", png(pixel_png())),
    );
    let mut registry = AssetRegistry::new("https://example.com/about/");
    let a = registry.register_image("../img/logo.png").expect("key");
    let b = registry.register_image("/img/logo.png").expect("key");
    assert_eq!(a, b);

    let pipeline = AssetPipeline::new(fetcher.clone(), fast_config());
    let report = pipeline.resolve(&mut registry).await;

    assert_eq!(fetcher.calls(), vec!["https://example.com/img/logo.png"]);
    assert_eq!(report.attempted, 1);
    assert_eq!(report.resolved, 1);
    assert_eq!(report.fetches, 1);

    let record = registry.get(AssetKind::Image, a.as_str()).expect("record");
    assert_eq!(record.payload.as_deref(), Some(PIXEL_PNG));
    assert_eq!(record.mime_type.as_deref(), Some("image/png"));
    assert_eq!(record.dimensions, Some(Dimensions { width: 1, height: 1 }));
    assert_eq!(record.references, 2);
}

#[tokio::test]
async fn test_second_pass_does_not_refetch() {
    let fetcher = Arc::new(StaticFetcher::default().with("https://example.com/a.png", png(pixel_png())));
    let mut registry = AssetRegistry::new("https://example.com/");
    registry.register_image("/a.png");
    let pipeline = AssetPipeline::new(fetcher.clone(), fast_config());

    pipeline.resolve(&mut registry).await;
    let again = pipeline.resolve(&mut registry).await;

    assert_eq!(again.attempted, 0);
    assert_eq!(fetcher.calls().len(), 1);
}

// ============================================================================
// Data URIs
// ============================================================================

#[tokio::test]
async fn test_data_uri_bypasses_network() {
    let fetcher = Arc::new(StaticFetcher::default());
    let mut registry = AssetRegistry::new("https://example.com/");
    let uri = format!("data:image/png;base64,{PIXEL_PNG}");
    let key = registry.register_image(&uri).expect("key");

    let report = AssetPipeline::new(fetcher.clone(), fast_config())
        .resolve(&mut registry)
        .await;

    assert!(fetcher.calls().is_empty());
    assert_eq!(report.inline, 1);
    let record = registry.get(AssetKind::Image, key.as_str()).expect("record");
    assert!(record.is_inline());
    assert_eq!(record.dimensions, Some(Dimensions { width: 1, height: 1 }));
}

#[tokio::test]
async fn test_oversized_data_uri_fails_but_keeps_url() {
    let fetcher = Arc::new(StaticFetcher::default());
    let mut registry = AssetRegistry::new("https://example.com/");
    let uri = format!("data:image/png;base64,{}", "A".repeat(8192));
    let key = registry.register_image(&uri).expect("key");

    let config = PipelineConfig {
        max_inline_bytes: 1024,
        ..fast_config()
    };
    let report = AssetPipeline::new(fetcher, config).resolve(&mut registry).await;

    assert_eq!(report.failed, 1);
    let record = registry.get(AssetKind::Image, key.as_str()).expect("record");
    assert!(record.payload.is_none());
    assert!(record.error.as_deref().is_some_and(|e| e.contains("too large")));
    assert_eq!(record.absolute_url, uri);
}

// ============================================================================
// Failures and Batching
// ============================================================================

#[tokio::test]
async fn test_failed_asset_does_not_block_others() {
    let fetcher = Arc::new(
        StaticFetcher::default()
            .with("https://example.com/ok.png", png(pixel_png()))
            .with(
                "https://example.com/flaky.png",
                Err(AssetError::Network("connection reset".into())),
            ),
    );
    let mut registry = AssetRegistry::new("https://example.com/");
    let ok = registry.register_image("/ok.png").expect("key");
    let missing = registry.register_image("/missing.png").expect("key");
    let flaky = registry.register_image("/flaky.png").expect("key");

    let report = AssetPipeline::new(fetcher.clone(), fast_config())
        .resolve(&mut registry)
        .await;

    assert_eq!(report.resolved, 1);
    assert_eq!(report.failed, 2);
    // 1 for ok, 1 for the terminal 404, 3 for the exhausted retries.
    assert_eq!(report.fetches, 5);

    assert!(registry.get(AssetKind::Image, ok.as_str()).expect("ok").payload.is_some());
    let missing = registry.get(AssetKind::Image, missing.as_str()).expect("missing");
    assert_eq!(missing.absolute_url, "https://example.com/missing.png");
    assert_eq!(
        missing.error.as_deref(),
        Some("HTTP 404 for https://example.com/missing.png")
    );
    let flaky = registry.get(AssetKind::Image, flaky.as_str()).expect("flaky");
    assert!(flaky.error.as_deref().is_some_and(|e| e.contains("connection reset")));
    assert!(registry.pending().is_empty());
}

#[tokio::test]
async fn test_concurrency_bound_respected() {
    let mut fetcher = StaticFetcher::default();
    let mut registry = AssetRegistry::new("https://example.com/");
    for i in 0..12 {
        let url = format!("https://example.com/{i}.png");
        fetcher = fetcher.with(&url, png(pixel_png()));
        registry.register_image(&url);
    }
    let fetcher = Arc::new(fetcher);
    let config = PipelineConfig {
        concurrency: 4,
        ..fast_config()
    };

    let report = AssetPipeline::new(fetcher.clone(), config).resolve(&mut registry).await;

    assert_eq!(report.resolved, 12);
    assert_eq!(report.batches, 3);
    assert!(fetcher.peak.load(Ordering::SeqCst) <= 4);
}

#[tokio::test]
async fn test_expired_deadline_is_an_error() {
    let fetcher = Arc::new(StaticFetcher::default());
    let mut registry = AssetRegistry::new("https://example.com/");
    registry.register_image("/a.png");
    registry.register_svg("/b.svg");

    let result = AssetPipeline::new(fetcher.clone(), fast_config())
        .resolve_until(&mut registry, Instant::now())
        .await;

    assert!(matches!(result, Err(AssetError::BudgetExhausted)));
    assert!(fetcher.calls().is_empty());
    assert_eq!(registry.pending().len(), 2);
}

/// Answers every request after a fixed delay.
struct SlowFetcher {
    delay: Duration,
}

#[async_trait]
impl AssetFetcher for SlowFetcher {
    async fn fetch_bytes(&self, _url: &str) -> AssetResult<FetchedAsset> {
        tokio::time::sleep(self.delay).await;
        png(pixel_png())
    }
}

#[tokio::test]
async fn test_batch_in_flight_is_abandoned_at_deadline() {
    let fetcher = Arc::new(SlowFetcher {
        delay: Duration::from_millis(400),
    });
    let mut registry = AssetRegistry::new("https://example.com/");
    for name in ["a0", "a1", "a2"] {
        registry.register_image(&format!("/{name}.png"));
    }
    let config = PipelineConfig {
        concurrency: 1,
        ..fast_config()
    };

    let started = Instant::now();
    let result = AssetPipeline::new(fetcher, config)
        .resolve_until(&mut registry, started + Duration::from_millis(100))
        .await;

    assert!(matches!(result, Err(AssetError::BudgetExhausted)));
    assert!(started.elapsed() < Duration::from_millis(400));
    assert_eq!(registry.pending().len(), 3);
}

#[tokio::test]
async fn test_deadline_with_room_resolves_everything() {
    let fetcher = Arc::new(
        StaticFetcher::default()
            .with("https://example.com/a.png", png(pixel_png()))
            .with("https://example.com/b.png", png(pixel_png())),
    );
    let mut registry = AssetRegistry::new("https://example.com/");
    registry.register_image("/a.png");
    registry.register_image("/b.png");

    let report = AssetPipeline::new(fetcher, fast_config())
        .resolve_until(&mut registry, Instant::now() + Duration::from_secs(10))
        .await
        .unwrap();

    assert_eq!(report.resolved, 2);
    assert!(registry.pending().is_empty());
}

#[tokio::test]
async fn test_svg_payload_is_markup_and_font_is_base64() {
    let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="4"/>"#.to_vec();
    let fetcher = Arc::new(
        StaticFetcher::default()
            .with(
                "https://example.com/icon.svg",
                Ok(FetchedAsset {
                    bytes: svg,
                    mime: None,
                }),
            )
            .with(
                "https://example.com/inter.woff2",
                Ok(FetchedAsset {
                    bytes: b"wOF2".to_vec(),
                    mime: Some("font/woff2".into()),
                }),
            ),
    );
    let mut registry = AssetRegistry::new("https://example.com/");
    let icon = registry.register_svg("/icon.svg").expect("key");
    let font = registry
        .register_font(
            domframe_core::FontFace {
                family: "Inter".into(),
                weight: "400".into(),
                style: "normal".into(),
            },
            "/inter.woff2",
        )
        .expect("key");

    AssetPipeline::new(fetcher, fast_config()).resolve(&mut registry).await;

    let icon = registry.get(AssetKind::Svg, icon.as_str()).expect("svg");
    assert!(icon.payload.as_deref().is_some_and(|p| p.starts_with("<svg")));
    assert_eq!(icon.mime_type.as_deref(), Some("image/svg+xml"));
    assert_eq!(icon.dimensions, Some(Dimensions { width: 8, height: 4 }));
    let font = registry.get(AssetKind::Font, font.as_str()).expect("font");
    assert_eq!(font.payload.as_deref(), Some("d09GMg=="));
    assert_eq!(font.mime_type.as_deref(), Some("font/woff2"));
}

// ============================================================================
// HTTP Fetcher
// ============================================================================

#[tokio::test]
async fn test_http_fetcher_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hero.png"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hero.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(pixel_png()),
        )
        .mount(&server)
        .await;

    let config = fast_config();
    let fetcher = HttpFetcher::new(config.request_timeout, config.max_fetch_bytes).expect("client");
    let mut registry = AssetRegistry::new(&server.uri());
    let key = registry.register_image("/hero.png").expect("key");

    let report = AssetPipeline::new(Arc::new(fetcher), config)
        .resolve(&mut registry)
        .await;

    assert_eq!(report.fetches, 3);
    assert_eq!(report.resolved, 1);
    let record = registry.get(AssetKind::Image, key.as_str()).expect("record");
    assert_eq!(record.mime_type.as_deref(), Some("image/png"));
    assert_eq!(record.dimensions, Some(Dimensions { width: 1, height: 1 }));
}

#[tokio::test]
async fn test_http_fetcher_not_found_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.png"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_secs(5), 1024).expect("client");
    let url = format!("{}/gone.png", server.uri());
    let err = fetcher.fetch_bytes(&url).await.expect_err("404");

    assert_eq!(err, AssetError::Status { status: 404, url });
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_http_fetcher_enforces_size_cap() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/huge.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0_u8; 4096]))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(Duration::from_secs(5), 1024).expect("client");
    let err = fetcher
        .fetch_bytes(&format!("{}/huge.bin", server.uri()))
        .await
        .expect_err("too large");

    assert!(matches!(err, AssetError::TooLarge { limit: 1024, .. }));
}
