//! Media and Asset Tests
//!
//! Drives the compiler with a recording fetcher:
//! - Repeated references resolve once
//! - Running out of time while fetching fails the run
//! - Fonts are collected only for families in use
//! - Video, embeds, inline SVG and form controls
//! - Snapshots read from disk

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use domframe_assets::{AssetError, AssetFetcher, AssetResult, FetchedAsset};
use domframe_core::{Fill, NodeKind, Rect, Viewport};
use domframe_extract::{
    extract, Compiler, ElementId, ExtractConfig, ExtractError, PageInfo, RenderSnapshot, SnapshotElement,
};

/// Serves fixed bodies by URL and records every call.
#[derive(Default)]
struct RecordingFetcher {
    bodies: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl RecordingFetcher {
    fn with(mut self, url: &str, body: &[u8]) -> Self {
        self.bodies.insert(url.to_string(), body.to_vec());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl AssetFetcher for RecordingFetcher {
    async fn fetch_bytes(&self, url: &str) -> AssetResult<FetchedAsset> {
        self.calls.lock().expect("lock").push(url.to_string());
        match self.bodies.get(url) {
            Some(bytes) => Ok(FetchedAsset {
                bytes: bytes.clone(),
                mime: Some("image/png".to_string()),
            }),
            None => Err(AssetError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

fn page() -> PageInfo {
    PageInfo {
        url: "https://example.com/shop/".to_string(),
        title: "Shop".to_string(),
        viewport: Viewport::default(),
        color_scheme: "light".to_string(),
    }
}

fn el(tag: &str, style: &[(&str, &str)], rect: Rect) -> SnapshotElement {
    SnapshotElement::new(tag, style.iter().copied(), rect)
}

fn snapshot_with_body() -> (RenderSnapshot, ElementId) {
    let mut snapshot = RenderSnapshot::new(page());
    let body = snapshot.push_element(None, el("body", &[("display", "block")], Rect::new(0.0, 0.0, 1280.0, 800.0)));
    (snapshot, body)
}

fn tile(y: f32) -> Rect {
    Rect::new(0.0, y, 200.0, 100.0)
}

// ============================================================================
// Images
// ============================================================================

#[tokio::test]
async fn test_repeated_image_resolves_once() {
    let (mut snapshot, body) = snapshot_with_body();
    snapshot.push_element(Some(body), el("img", &[("display", "block")], tile(0.0)).with_attribute("src", "a.png"));
    snapshot.push_element(
        Some(body),
        el("img", &[("display", "block")], tile(100.0)).with_attribute("src", "/shop/a.png"),
    );
    snapshot.push_element(
        Some(body),
        el(
            "div",
            &[("display", "block"), ("background-image", "url(\"https://example.com/shop/a.png\")")],
            tile(200.0),
        ),
    );
    snapshot.push_element(Some(body), el("img", &[("display", "block")], tile(300.0)).with_attribute("src", "missing.png"));

    let fetcher = Arc::new(RecordingFetcher::default().with("https://example.com/shop/a.png", b"\x89PNG-ish"));
    let shared_fetcher: Arc<dyn AssetFetcher> = fetcher.clone();
    let document = extract(&snapshot, Some(shared_fetcher), ExtractConfig::default())
        .await
        .unwrap();

    let a = fetcher
        .calls()
        .iter()
        .filter(|u| u.as_str() == "https://example.com/shop/a.png")
        .count();
    assert_eq!(a, 1);
    assert_eq!(document.images.len(), 2);

    let shared = document
        .images
        .values()
        .find(|r| r.absolute_url.ends_with("/a.png"))
        .unwrap();
    assert_eq!(shared.references, 3);
    assert!(shared.payload.is_some());

    let missing = document
        .images
        .values()
        .find(|r| r.absolute_url.ends_with("/missing.png"))
        .unwrap();
    assert!(missing.payload.is_none());
    assert!(missing.error.is_some());
    assert_eq!(missing.url, "missing.png");
    assert!(document.diagnostics.counts.warnings >= 1);

    let keys: Vec<Option<&str>> = document
        .root
        .children
        .iter()
        .map(|n| match &n.kind {
            NodeKind::Image { asset_key, .. } => asset_key.as_deref(),
            NodeKind::Frame { .. } => n.paint.fills.iter().find_map(|f| match f {
                Fill::Image { asset_key, .. } => Some(asset_key.as_str()),
                _ => None,
            }),
            _ => None,
        })
        .collect();
    assert_eq!(keys[0], Some(shared.key.as_str()));
    assert_eq!(keys[1], keys[0]);
    assert_eq!(keys[2], keys[0]);
}

#[tokio::test]
async fn test_srcset_prefers_largest_candidate() {
    let (mut snapshot, body) = snapshot_with_body();
    snapshot.push_element(
        Some(body),
        el("img", &[("display", "block")], tile(0.0))
            .with_attribute("src", "data:image/gif;base64,R0lGODlhAQABAAAAACw=")
            .with_attribute("data-srcset", "small.jpg 320w, large.jpg 1280w"),
    );

    let document = Compiler::new(ExtractConfig::default()).compile(&snapshot).await.unwrap();
    assert_eq!(document.images.len(), 1);
    let record = document.images.values().next().unwrap();
    assert_eq!(record.absolute_url, "https://example.com/shop/large.jpg");
    // No fetcher: registered but left alone.
    assert!(record.payload.is_none() && record.error.is_none());
}

/// Answers every request after a fixed delay.
struct SlowFetcher {
    delay: Duration,
}

#[async_trait]
impl AssetFetcher for SlowFetcher {
    async fn fetch_bytes(&self, _url: &str) -> AssetResult<FetchedAsset> {
        tokio::time::sleep(self.delay).await;
        Ok(FetchedAsset {
            bytes: b"\x89PNG-ish".to_vec(),
            mime: Some("image/png".to_string()),
        })
    }
}

#[tokio::test]
async fn test_deadline_during_asset_resolution_is_fatal() {
    let (mut snapshot, body) = snapshot_with_body();
    for (name, y) in [("a0.png", 0.0), ("a1.png", 100.0), ("a2.png", 200.0)] {
        snapshot.push_element(Some(body), el("img", &[("display", "block")], tile(y)).with_attribute("src", name));
    }
    let mut config = ExtractConfig {
        time_budget: Duration::from_millis(200),
        ..ExtractConfig::default()
    };
    config.pipeline.concurrency = 1;
    let fetcher: Arc<dyn AssetFetcher> = Arc::new(SlowFetcher {
        delay: Duration::from_millis(400),
    });

    let started = Instant::now();
    let err = extract(&snapshot, Some(fetcher), config).await.unwrap_err();

    assert!(matches!(err, ExtractError::Timeout { budget_ms: 200 }));
    assert!(started.elapsed() < Duration::from_millis(400));
}

// ============================================================================
// Fonts
// ============================================================================

#[tokio::test]
async fn test_only_used_font_faces_are_collected() {
    let (mut snapshot, body) = snapshot_with_body();
    let p = snapshot.push_element(
        Some(body),
        el("p", &[("display", "block"), ("font-family", "\"Inter\", sans-serif")], tile(0.0)),
    );
    snapshot.push_text(p, "Hello", vec![Rect::new(0.0, 0.0, 40.0, 20.0)]);
    snapshot.font_faces = serde_json::from_str(
        r#"[
            { "family": "Inter", "weight": "400", "url": "/fonts/inter.woff2" },
            { "family": "Roboto", "url": "/fonts/roboto.woff2" }
        ]"#,
    )
    .unwrap();

    let fetcher: Arc<dyn AssetFetcher> =
        Arc::new(RecordingFetcher::default().with("https://example.com/fonts/inter.woff2", b"wOF2"));
    let document = extract(&snapshot, Some(fetcher), ExtractConfig::default()).await.unwrap();

    assert_eq!(document.fonts.len(), 1);
    let font = document.fonts.values().next().unwrap();
    assert_eq!(font.font.as_ref().map(|f| f.family.as_str()), Some("Inter"));
    assert!(font.payload.is_some());
    assert!(document
        .design_tokens
        .typography
        .iter()
        .any(|t| t.font_family == "Inter"));
}

// ============================================================================
// Embedded Media
// ============================================================================

#[tokio::test]
async fn test_video_and_embeds() {
    let (mut snapshot, body) = snapshot_with_body();
    snapshot.push_element(
        Some(body),
        el("iframe", &[("display", "block")], tile(0.0))
            .with_attribute("src", "https://www.youtube.com/embed/dQw4w9WgXcQ"),
    );
    snapshot.push_element(Some(body), el("video", &[("display", "block")], tile(100.0)));
    snapshot.push_element(
        Some(body),
        el("iframe", &[("display", "block")], tile(200.0)).with_attribute("src", "https://maps.example.net/embed"),
    );
    snapshot.push_element(Some(body), el("canvas", &[("display", "block")], tile(300.0)));

    let document = Compiler::new(ExtractConfig::default()).compile(&snapshot).await.unwrap();
    let kinds: Vec<&NodeKind> = document.root.children.iter().map(|n| &n.kind).collect();

    match kinds[0] {
        NodeKind::Image { asset_key: Some(key), .. } => {
            let record = &document.images[key];
            assert_eq!(record.absolute_url, "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg");
            assert!(document.root.children[0]
                .paint
                .fills
                .iter()
                .any(|f| matches!(f, Fill::Image { asset_key, .. } if asset_key == key)));
        }
        other => panic!("expected thumbnail image, got {other:?}"),
    }
    assert!(matches!(kinds[1], NodeKind::Other { .. }));
    assert!(matches!(kinds[2], NodeKind::Other { .. }));
    assert!(matches!(kinds[3], NodeKind::Other { reason } if reason == "canvas"));
}

#[tokio::test]
async fn test_inline_svg_is_stored_with_markup() {
    let (mut snapshot, body) = snapshot_with_body();
    let markup = r#"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24"><path d="M0 0h24v24H0z"/></svg>"#;
    for y in [0.0, 30.0] {
        let mut icon = el("svg", &[("display", "inline")], Rect::new(0.0, y, 24.0, 24.0));
        icon.markup = Some(markup.to_string());
        snapshot.push_element(Some(body), icon);
    }

    let document = Compiler::new(ExtractConfig::default()).compile(&snapshot).await.unwrap();
    assert_eq!(document.svgs.len(), 1);
    let record = document.svgs.values().next().unwrap();
    assert_eq!(record.url, "inline");
    assert_eq!(record.payload.as_deref(), Some(markup));
    assert_eq!(record.references, 2);
    assert!(document
        .root
        .children
        .iter()
        .all(|n| matches!(&n.kind, NodeKind::Vector { asset_key: Some(k) } if *k == record.key.to_string())));
}

#[tokio::test]
async fn test_form_control_shows_placeholder() {
    let (mut snapshot, body) = snapshot_with_body();
    snapshot.push_element(
        Some(body),
        el(
            "input",
            &[
                ("display", "inline-block"),
                ("border-top-width", "1px"),
                ("border-top-style", "solid"),
                ("border-top-color", "rgb(200, 200, 200)"),
            ],
            Rect::new(0.0, 0.0, 240.0, 32.0),
        )
        .with_attribute("placeholder", "Search products"),
    );

    let document = Compiler::new(ExtractConfig::default()).compile(&snapshot).await.unwrap();
    let input = &document.root.children[0];
    assert!(matches!(input.kind, NodeKind::Frame { .. }));
    assert_eq!(input.children.len(), 1);
    assert!(matches!(&input.children[0].kind, NodeKind::Text { characters, .. } if characters == "Search products"));
}

// ============================================================================
// Snapshot Files
// ============================================================================

#[tokio::test]
async fn test_snapshot_file_compiles() {
    let json = r#"{
        "page": { "url": "https://example.com/", "title": "Hello" },
        "root": 0,
        "elements": [
            {
                "tag": "body",
                "style": { "display": "block", "background-color": "rgb(250, 250, 250)" },
                "rect": { "x": 0, "y": 0, "width": 1280, "height": 800 },
                "children": [ { "element": 1 } ]
            },
            {
                "tag": "h1",
                "style": { "display": "block", "font-size": "32px", "color": "rgb(17, 17, 17)" },
                "rect": { "x": 0, "y": 0, "width": 600, "height": 40 },
                "children": [ { "text": "Welcome", "rects": [ { "x": 0, "y": 0, "width": 160, "height": 40 } ] } ]
            }
        ]
    }"#;
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();

    let snapshot = RenderSnapshot::from_path(file.path()).unwrap();
    let config = ExtractConfig {
        resolve_assets: false,
        ..ExtractConfig::default()
    };
    let document = Compiler::new(config).compile(&snapshot).await.unwrap();

    assert_eq!(document.metadata.title, "Hello");
    assert_eq!(document.metadata.node_count, 2);
    assert_eq!(document.metadata.run_id.len(), 36);
    assert!(matches!(&document.root.children[0].kind, NodeKind::Text { characters, .. } if characters == "Welcome"));

    let out = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(out.path(), document.to_json_pretty().unwrap()).unwrap();
    let reread = domframe_core::DesignDocument::from_json(&std::fs::read_to_string(out.path()).unwrap()).unwrap();
    assert_eq!(reread.root, document.root);
    reread.validate().unwrap();
}

#[test]
fn test_snapshot_rejects_shared_children() {
    let json = r#"{
        "elements": [
            { "tag": "body", "children": [ { "element": 1 }, { "element": 1 } ] },
            { "tag": "div" }
        ]
    }"#;
    assert!(RenderSnapshot::from_json(json).is_err());
}
