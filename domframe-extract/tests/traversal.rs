//! Traversal Tests
//!
//! Compiles small recorded render trees end to end:
//! - Text leaves, promoted text and mixed runs
//! - Hidden and zero-size elements
//! - Stacking order and fixed-position coordinates
//! - Pseudo-element synthesis
//! - Depth, node and time budgets

use std::time::Duration;

use domframe_core::{CoordinateSpace, Node, NodeKind, Rect, Viewport};
use domframe_extract::{
    Compiler, ElementId, ExtractConfig, ExtractError, PageInfo, PseudoBox, PseudoKind, RenderSnapshot,
    SnapshotElement,
};

fn page() -> PageInfo {
    PageInfo {
        url: "https://example.com/".to_string(),
        title: "Example".to_string(),
        viewport: Viewport::default(),
        color_scheme: "light".to_string(),
    }
}

fn el(tag: &str, style: &[(&str, &str)], rect: Rect) -> SnapshotElement {
    SnapshotElement::new(tag, style.iter().copied(), rect)
}

fn red_box(rect: Rect) -> SnapshotElement {
    el("div", &[("display", "block"), ("background-color", "rgb(255, 0, 0)")], rect)
}

fn body(snapshot: &mut RenderSnapshot, style: &[(&str, &str)]) -> ElementId {
    snapshot.push_element(None, el("body", style, Rect::new(0.0, 0.0, 1280.0, 800.0)))
}

fn config() -> ExtractConfig {
    ExtractConfig {
        resolve_assets: false,
        ..ExtractConfig::default()
    }
}

async fn compile(snapshot: &RenderSnapshot, config: ExtractConfig) -> Result<Node, ExtractError> {
    let document = Compiler::new(config).compile(snapshot).await?;
    Ok(document.root)
}

fn text_of(node: &Node) -> Option<&str> {
    match &node.kind {
        NodeKind::Text { characters, .. } => Some(characters),
        _ => None,
    }
}

// ============================================================================
// Text
// ============================================================================

#[tokio::test]
async fn test_text_leaf_becomes_text_node() {
    let mut snapshot = RenderSnapshot::new(page());
    let root = body(&mut snapshot, &[("display", "block")]);
    let p = snapshot.push_element(
        Some(root),
        el("p", &[("display", "block"), ("font-size", "18px")], Rect::new(0.0, 0.0, 300.0, 24.0)),
    );
    snapshot.push_text(p, "  Hello \n  world ", vec![Rect::new(0.0, 0.0, 90.0, 24.0)]);

    let root = compile(&snapshot, config()).await.unwrap();
    assert_eq!(root.children.len(), 1);
    let text = &root.children[0];
    assert_eq!(text_of(text), Some("Hello world"));
    assert_eq!(text.source_tag, "p");
    assert!(text.children.is_empty());
    if let NodeKind::Text { typography, .. } = &text.kind {
        assert_eq!(typography.font_size, 18.0);
    }
}

#[tokio::test]
async fn test_text_with_box_is_promoted_to_frame() {
    let mut snapshot = RenderSnapshot::new(page());
    let root = body(&mut snapshot, &[("display", "block")]);
    let button = snapshot.push_element(
        Some(root),
        el(
            "button",
            &[
                ("display", "inline-block"),
                ("background-color", "rgb(0, 0, 255)"),
                ("padding-top", "8px"),
                ("padding-left", "12px"),
            ],
            Rect::new(10.0, 10.0, 120.0, 40.0),
        ),
    );
    snapshot.push_text(button, "Buy now", vec![Rect::new(22.0, 18.0, 60.0, 20.0)]);

    let root = compile(&snapshot, config()).await.unwrap();
    let frame = &root.children[0];
    assert!(matches!(frame.kind, NodeKind::Frame { .. }));
    assert_eq!(frame.paint.fills.len(), 1);
    assert_eq!(frame.children.len(), 1);
    let label = &frame.children[0];
    assert_eq!(text_of(label), Some("Buy now"));
    assert_eq!(label.absolute_layout.rect, Rect::new(22.0, 18.0, 60.0, 20.0));
    assert_eq!((label.layout.x, label.layout.y), (12.0, 8.0));
}

#[tokio::test]
async fn test_mixed_text_keeps_source_order() {
    let mut snapshot = RenderSnapshot::new(page());
    let root = body(&mut snapshot, &[("display", "block")]);
    let div = snapshot.push_element(Some(root), el("div", &[("display", "block")], Rect::new(0.0, 0.0, 400.0, 20.0)));
    snapshot.push_text(div, "Hello ", vec![Rect::new(0.0, 0.0, 40.0, 20.0)]);
    let span = snapshot.push_element(
        Some(div),
        el("span", &[("display", "inline"), ("font-weight", "700")], Rect::new(40.0, 0.0, 50.0, 20.0)),
    );
    snapshot.push_text(span, "brave", vec![Rect::new(40.0, 0.0, 50.0, 20.0)]);
    snapshot.push_text(div, " world", vec![Rect::new(90.0, 0.0, 45.0, 20.0)]);

    let root = compile(&snapshot, config()).await.unwrap();
    let div = &root.children[0];
    let texts: Vec<Option<&str>> = div.children.iter().map(text_of).collect();
    assert_eq!(texts, vec![Some("Hello"), Some("brave"), Some("world")]);
    assert_eq!(div.children[1].source_tag, "span");
    assert_eq!(div.children[0].source_tag, "#text");
}

// ============================================================================
// Visibility and Size
// ============================================================================

#[tokio::test]
async fn test_hidden_elements_are_skipped() {
    let mut snapshot = RenderSnapshot::new(page());
    let root = body(&mut snapshot, &[("display", "block")]);
    let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
    let bg = ("background-color", "rgb(255, 0, 0)");
    snapshot.push_element(Some(root), el("div", &[("display", "none"), bg], rect));
    snapshot.push_element(Some(root), el("div", &[("visibility", "hidden"), bg], rect));
    snapshot.push_element(Some(root), el("div", &[("opacity", "0"), bg], rect));
    snapshot.push_element(
        Some(root),
        el("div", &[("opacity", "0"), ("position", "absolute"), bg], rect).with_attribute("id", "toast"),
    );
    snapshot.push_element(Some(root), el("script", &[("display", "block")], rect));

    let root = compile(&snapshot, config()).await.unwrap();
    assert_eq!(root.children.len(), 1);
    assert_eq!(root.children[0].name, "div#toast");
    assert!(root.children[0].paint.opacity.abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_zero_size_box_with_background_gets_minimum_size() {
    let mut snapshot = RenderSnapshot::new(page());
    let root = body(&mut snapshot, &[("display", "block")]);
    snapshot.push_element(Some(root), red_box(Rect::new(10.0, 10.0, 0.0, 0.0)));
    snapshot.push_element(Some(root), el("div", &[("display", "block")], Rect::new(10.0, 10.0, 0.0, 0.0)));

    let root = compile(&snapshot, config()).await.unwrap();
    assert_eq!(root.children.len(), 1);
    let dot = &root.children[0];
    assert_eq!(dot.absolute_layout.rect, Rect::new(10.0, 10.0, 1.0, 1.0));
    match &dot.kind {
        NodeKind::Frame { hints, .. } => assert!(hints.substituted_size),
        other => panic!("expected frame, got {other:?}"),
    }
}

// ============================================================================
// Stacking and Coordinates
// ============================================================================

#[tokio::test]
async fn test_children_sorted_by_z_then_source_order() {
    let mut snapshot = RenderSnapshot::new(page());
    let root = body(&mut snapshot, &[("display", "block")]);
    let rect = Rect::new(0.0, 0.0, 50.0, 50.0);
    snapshot.push_element(
        Some(root),
        el(
            "div",
            &[("position", "absolute"), ("z-index", "10"), ("background-color", "rgb(0, 0, 0)")],
            rect,
        )
        .with_attribute("id", "overlay"),
    );
    snapshot.push_element(Some(root), red_box(rect).with_attribute("id", "flow"));
    snapshot.push_element(
        Some(root),
        el(
            "div",
            &[("position", "relative"), ("z-index", "-1"), ("background-color", "rgb(0, 255, 0)")],
            rect,
        )
        .with_attribute("id", "under"),
    );

    let root = compile(&snapshot, config()).await.unwrap();
    let names: Vec<&str> = root.children.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, ["div#under", "div#flow", "div#overlay"]);
    assert_eq!(root.children[2].layout.z_index, 10);
    assert!(root.children[2].layout.absolute);
}

#[tokio::test]
async fn test_scrolled_page_coordinates() {
    let mut page = page();
    page.viewport.scroll_y = 300.0;
    let mut snapshot = RenderSnapshot::new(page);
    let root = snapshot.push_element(
        None,
        el("body", &[("display", "block")], Rect::new(0.0, -300.0, 1280.0, 2000.0)),
    );
    snapshot.push_element(
        Some(root),
        el(
            "header",
            &[("position", "fixed"), ("background-color", "rgb(255, 255, 255)")],
            Rect::new(0.0, 0.0, 1280.0, 60.0),
        ),
    );
    snapshot.push_element(Some(root), red_box(Rect::new(0.0, 100.0, 200.0, 100.0)));

    let root = compile(&snapshot, config()).await.unwrap();
    assert_eq!(root.absolute_layout.rect.y, 0.0);

    let header = root.children.iter().find(|n| n.source_tag == "header").unwrap();
    assert_eq!(header.absolute_layout.space, CoordinateSpace::Viewport);
    assert_eq!(header.absolute_layout.rect.y, 0.0);

    let block = root.children.iter().find(|n| n.source_tag == "div").unwrap();
    assert_eq!(block.absolute_layout.space, CoordinateSpace::Document);
    assert_eq!(block.absolute_layout.rect.y, 400.0);
    assert_eq!(block.layout.y, 400.0);
}

// ============================================================================
// Pseudo-elements
// ============================================================================

#[tokio::test]
async fn test_before_badge_is_synthesized_ahead_of_text() {
    let mut snapshot = RenderSnapshot::new(page());
    let root = body(&mut snapshot, &[("display", "block")]);
    let badge = PseudoBox {
        style: domframe_core::StyleSnapshot::from_pairs([
            ("content", "\"New\""),
            ("display", "inline-block"),
            ("background-color", "rgb(255, 200, 0)"),
        ]),
        rect: Some(Rect::new(0.0, 0.0, 30.0, 16.0)),
    };
    let item = snapshot.push_element(
        Some(root),
        el("li", &[("display", "list-item")], Rect::new(0.0, 0.0, 200.0, 16.0)).with_pseudo(PseudoKind::Before, badge),
    );
    snapshot.push_text(item, "Inbox", vec![Rect::new(34.0, 0.0, 40.0, 16.0)]);

    let root = compile(&snapshot, config()).await.unwrap();
    let item = &root.children[0];
    assert_eq!(item.children.len(), 2);
    let before = &item.children[0];
    assert_eq!(before.name, "::before");
    assert!(matches!(before.kind, NodeKind::Frame { .. }));
    assert_eq!(text_of(&before.children[0]), Some("New"));
    assert_eq!(text_of(&item.children[1]), Some("Inbox"));
}

#[tokio::test]
async fn test_pseudo_elements_can_be_disabled() {
    let mut snapshot = RenderSnapshot::new(page());
    let root = body(&mut snapshot, &[("display", "block")]);
    let arrow = PseudoBox {
        style: domframe_core::StyleSnapshot::from_pairs([("content", "\"→\"")]),
        rect: Some(Rect::new(90.0, 0.0, 10.0, 16.0)),
    };
    snapshot.push_element(
        Some(root),
        red_box(Rect::new(0.0, 0.0, 100.0, 16.0)).with_pseudo(PseudoKind::After, arrow),
    );

    let enabled = compile(&snapshot, config()).await.unwrap();
    assert_eq!(enabled.children[0].children.len(), 1);
    assert_eq!(enabled.children[0].children[0].name, "::after");

    let disabled = ExtractConfig {
        include_pseudo_elements: false,
        ..config()
    };
    let root = compile(&snapshot, disabled).await.unwrap();
    assert!(root.children[0].children.is_empty());
}

// ============================================================================
// Budgets
// ============================================================================

#[tokio::test]
async fn test_node_limit_aborts_run() {
    let mut snapshot = RenderSnapshot::new(page());
    let root = body(&mut snapshot, &[("display", "block")]);
    for i in 0..5_u8 {
        snapshot.push_element(Some(root), red_box(Rect::new(0.0, f32::from(i) * 20.0, 100.0, 20.0)));
    }
    let limited = ExtractConfig {
        max_nodes: 3,
        ..config()
    };

    let err = compile(&snapshot, limited).await.unwrap_err();
    assert!(matches!(err, ExtractError::NodeLimitExceeded { limit: 3 }));
    assert_eq!(err.to_string(), "Node limit of 3 exceeded");
}

#[tokio::test]
async fn test_depth_limit_drops_subtree_only() {
    let mut snapshot = RenderSnapshot::new(page());
    let mut parent = body(&mut snapshot, &[("display", "block")]);
    for _ in 0..4 {
        parent = snapshot.push_element(Some(parent), red_box(Rect::new(0.0, 0.0, 100.0, 100.0)));
    }
    snapshot.push_element(Some(ElementId(0)), red_box(Rect::new(200.0, 0.0, 100.0, 100.0)));

    let shallow = ExtractConfig {
        max_depth: 2,
        ..config()
    };
    let document = Compiler::new(shallow).compile(&snapshot).await.unwrap();
    // body, two nested levels, and the sibling.
    assert_eq!(document.metadata.node_count, 4);
    assert!(document.diagnostics.counts.warnings >= 1);
    assert!(document
        .diagnostics
        .entries
        .iter()
        .any(|e| e.message.contains("Depth limit of 2")));
}

#[tokio::test]
async fn test_exhausted_time_budget_is_fatal() {
    let mut snapshot = RenderSnapshot::new(page());
    body(&mut snapshot, &[("display", "block")]);
    let instant = ExtractConfig {
        time_budget: Duration::ZERO,
        ..config()
    };

    let err = compile(&snapshot, instant).await.unwrap_err();
    assert!(matches!(err, ExtractError::Timeout { budget_ms: 0 }));
}

#[tokio::test]
async fn test_missing_root_is_fatal() {
    let empty = RenderSnapshot::new(page());
    let err = compile(&empty, config()).await.unwrap_err();
    assert!(matches!(err, ExtractError::RootUnavailable(_)));

    let mut unmeasured = RenderSnapshot::new(page());
    let mut root = el("body", &[("display", "block")], Rect::default());
    root.rect = None;
    unmeasured.push_element(None, root);
    let err = compile(&unmeasured, config()).await.unwrap_err();
    assert!(matches!(err, ExtractError::RootUnavailable(_)));
}

// ============================================================================
// Auto-layout
// ============================================================================

#[tokio::test]
async fn test_flex_row_gets_auto_layout() {
    let mut snapshot = RenderSnapshot::new(page());
    let root = snapshot.push_element(
        None,
        el(
            "body",
            &[
                ("display", "flex"),
                ("flex-direction", "row"),
                ("column-gap", "8px"),
                ("justify-content", "flex-start"),
                ("align-items", "stretch"),
            ],
            Rect::new(0.0, 0.0, 600.0, 40.0),
        ),
    );
    for i in 0..3_u8 {
        snapshot.push_element(Some(root), red_box(Rect::new(f32::from(i) * 108.0, 0.0, 100.0, 40.0)));
    }

    let document = Compiler::new(config()).compile(&snapshot).await.unwrap();
    let layout = document.root.kind.auto_layout().expect("flex row is a candidate");
    assert_eq!(layout.config.spacing, 8.0);
    assert!(layout.verdict.safe, "reasons: {:?}", layout.verdict.reasons);
    assert_eq!(document.auto_layout_metrics.candidates, 1);
    assert!(document.design_tokens.spacing.iter().any(|t| t.value == 8.0));
}
