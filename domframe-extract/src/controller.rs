//! Bounded, cooperatively-yielding traversal.
//!
//! The render tree is walked with an explicit work-list over an arena of
//! nodes addressed by index, so depth and node caps do not depend on the
//! call stack:
//!
//! ```text
//!   Visit(root) ─▶ classify ─▶ reconcile ─▶ paint ─▶ push node
//!                                                     │
//!            Finalize(node) ◀─ Visit(children) ◀──────┘
//!                 │
//!                 └─▶ auto-layout (source order) ─▶ stacking sort
//! ```
//!
//! Children are attached to their parent only once their own subtree has
//! been finalized. The tree is assembled bottom-up from the arena at the end.

use std::sync::Arc;
use std::time::Instant;

use domframe_core::geometry::{reconcile, reconcile_synthetic, Geometry, GeometryInput, MIN_VISIBLE_SIZE};
use domframe_core::style::box_model::{has_visible_box, BoxModel};
use domframe_core::style::transform::{parse_transform, parse_transform_origin};
use domframe_core::{
    Fill, FrameHints, LayoutChild, LayoutContainer, Node, NodeId, NodeKind, NodeLayout, AbsoluteLayout, Paint,
    Position, Rect, ScaleMode, Sides, StyleSnapshot, Typography,
};
use tracing::{debug, info};

use crate::accessor::{ChildItem, ElementId, PseudoKind, TextRun};
use crate::classify::{hidden_reason, is_skipped_tag, text_shape, SpecialTag, TextShape};
use crate::context::RunContext;
use crate::error::{ExtractError, ExtractResult};
use crate::media::{MediaCapability, MediaSource};
use crate::paint::{collapse_whitespace, element_paint, text_paint, typography};
use crate::pseudo::{estimate_rect, parse_content, PseudoContent};
use crate::stacking::{effective_z, sort_by_stacking};

/// What a parent's layout inference needs to know about a child.
#[derive(Debug, Clone)]
struct FlowInfo {
    style: Arc<StyleSnapshot>,
    border: Sides,
    padding: Sides,
    position: Position,
    margin: Sides,
}

impl FlowInfo {
    /// Synthesized text flows like a static, unpadded box.
    fn text(style: &Arc<StyleSnapshot>) -> Self {
        Self {
            style: Arc::clone(style),
            border: Sides::default(),
            padding: Sides::default(),
            position: Position::Static,
            margin: Sides::default(),
        }
    }
}

#[derive(Debug)]
struct ArenaNode {
    id: NodeId,
    parent: Option<usize>,
    name: String,
    source_tag: String,
    geometry: Geometry,
    layout: NodeLayout,
    paint: Paint,
    kind: NodeKind,
    children: Vec<usize>,
    order: usize,
    flow: FlowInfo,
}

#[derive(Debug, Clone, Copy)]
struct Visit {
    element: ElementId,
    parent: Option<usize>,
    depth: usize,
    order: usize,
    /// Border box of the nearest positioned ancestor, viewport-relative.
    containing: Rect,
}

#[derive(Debug)]
enum Task {
    Visit(Visit),
    Finalize(usize),
}

/// The host of synthesized children (text runs, pseudo-elements).
#[derive(Debug, Clone, Copy)]
struct Host {
    index: usize,
    element: ElementId,
    /// Content box, viewport-relative.
    content: Rect,
    containing: Rect,
}

/// Walks a render tree into a node tree.
pub struct Controller<'c, 'a> {
    ctx: &'c mut RunContext<'a>,
    arena: Vec<ArenaNode>,
    tasks: Vec<Task>,
    processed: usize,
    last_yield: Instant,
}

impl<'c, 'a> Controller<'c, 'a> {
    /// Controller over a run context.
    pub fn new(ctx: &'c mut RunContext<'a>) -> Self {
        Self {
            ctx,
            arena: Vec::new(),
            tasks: Vec::new(),
            processed: 0,
            last_yield: Instant::now(),
        }
    }

    /// Walk the whole tree and assemble the root node.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::Timeout`] when the time budget runs out
    /// - [`ExtractError::NodeLimitExceeded`] when the node cap is crossed
    /// - [`ExtractError::RootUnavailable`] when no root node can be built
    pub async fn run(mut self) -> ExtractResult<Node> {
        let root = self
            .ctx
            .accessor
            .root()
            .ok_or_else(|| ExtractError::RootUnavailable("the render tree has no root element".into()))?;
        let viewport = *self.ctx.viewport();
        self.tasks.push(Task::Visit(Visit {
            element: root,
            parent: None,
            depth: 0,
            order: 0,
            containing: Rect::new(-viewport.scroll_x, -viewport.scroll_y, viewport.width, viewport.height),
        }));

        while let Some(task) = self.tasks.pop() {
            if self.ctx.is_past_deadline() {
                return Err(ExtractError::Timeout {
                    budget_ms: self.ctx.config.time_budget_ms(),
                });
            }
            match task {
                Task::Visit(visit) => {
                    self.visit(visit)?;
                    self.processed += 1;
                    self.maybe_yield().await;
                }
                Task::Finalize(index) => self.finalize(index),
            }
        }

        if self.arena.is_empty() {
            return Err(ExtractError::RootUnavailable("the root element produced no node".into()));
        }
        info!(
            nodes = self.arena.len(),
            elements = self.processed,
            elapsed_ms = u64::try_from(self.ctx.elapsed().as_millis()).unwrap_or(u64::MAX),
            "traversal complete"
        );
        self.assemble()
    }

    /// Suspend briefly every `yield_every` nodes, but only if
    /// `yield_interval` has passed since the last suspension.
    async fn maybe_yield(&mut self) {
        let config = self.ctx.config;
        if config.yield_every == 0 || self.processed % config.yield_every != 0 {
            return;
        }
        if self.last_yield.elapsed() < config.yield_interval {
            return;
        }
        tokio::time::sleep(config.yield_pause).await;
        self.last_yield = Instant::now();
    }

    fn visit(&mut self, visit: Visit) -> ExtractResult<()> {
        let accessor = self.ctx.accessor;
        let element = visit.element;
        let is_root = visit.parent.is_none();
        let tag = accessor.tag_name(element);
        let location = format!("{tag}[{element}]");

        if visit.depth > self.ctx.config.max_depth {
            let limit = self.ctx.config.max_depth;
            self.ctx
                .diagnostics
                .warn(location, format!("Depth limit of {limit} reached, subtree dropped"));
            return Ok(());
        }
        if !is_root && is_skipped_tag(&tag) {
            return Ok(());
        }

        let style = if let Some(style) = self.ctx.style(element, None) {
            style
        } else {
            self.ctx.node_error(location.as_str(), "Computed style unavailable");
            Arc::new(StyleSnapshot::default())
        };
        if !is_root {
            if let Some(reason) = hidden_reason(&style) {
                debug!(%element, ?reason, "skipping hidden element");
                return Ok(());
            }
        }

        let Some(rect) = accessor.bounding_rect(element) else {
            if is_root {
                return Err(ExtractError::RootUnavailable("the root element has no bounding box".into()));
            }
            self.ctx.node_error(location.as_str(), "Bounding box unavailable");
            return Ok(());
        };

        match SpecialTag::from_tag(&tag) {
            Some(special) if !is_root => self.visit_special(visit, special, &tag, &style, rect, &location),
            _ => self.visit_container(visit, &tag, &style, rect, &location),
        }
    }

    fn visit_container(
        &mut self,
        visit: Visit,
        tag: &str,
        style: &Arc<StyleSnapshot>,
        rect: Rect,
        location: &str,
    ) -> ExtractResult<()> {
        let accessor = self.ctx.accessor;
        let element = visit.element;
        let is_root = visit.parent.is_none();
        let model = BoxModel::from_style(style, rect.size(), &mut self.ctx.colors);
        let items = accessor.children(element);
        let has_text = items
            .iter()
            .any(|item| matches!(item, ChildItem::Text(run) if !run.is_blank()));
        let has_child_elements = items
            .iter()
            .any(|item| matches!(item, ChildItem::Element(c) if !is_skipped_tag(&accessor.tag_name(*c))));
        let visible_box = has_visible_box(style, &model, &mut self.ctx.colors);
        let pseudos = if self.ctx.pseudo_enabled() {
            self.pseudo_contents(element)
        } else {
            Vec::new()
        };

        let geometry = self.reconcile(
            visit,
            rect,
            style,
            &model,
            has_text || has_child_elements || !pseudos.is_empty(),
            visible_box,
        );
        if geometry.is_empty() && !is_root {
            debug!(%element, "skipping empty element");
            return Ok(());
        }

        let flow = flow_info(style, &model);
        let content = inset(rect, &flow.border.add(&flow.padding));
        let layout = self.node_layout(visit, style, &geometry);
        let shape = match text_shape(has_text, has_child_elements, visible_box, !pseudos.is_empty()) {
            TextShape::Leaf if is_root => TextShape::Promoted,
            shape => shape,
        };

        if shape == TextShape::Leaf && !is_root {
            let characters = leaf_text(&items, style);
            let mut paint = text_paint(style, &mut self.ctx.colors);
            paint.opacity = style.opacity();
            let typography = self.observe_typography(style);
            self.push_node(ArenaNode {
                id: NodeId(0),
                parent: visit.parent,
                name: text_name(&characters),
                source_tag: tag.to_string(),
                geometry,
                layout,
                paint,
                kind: NodeKind::Text {
                    characters,
                    typography,
                },
                children: Vec::new(),
                order: visit.order,
                flow,
            })?;
            return Ok(());
        }

        let paint = element_paint(self.ctx, style, &model, geometry.absolute.size(), location);
        let position = flow.position;
        let index = self.push_node(ArenaNode {
            id: NodeId(0),
            parent: visit.parent,
            name: element_name(tag, accessor.attribute(element, "id"), accessor.attribute(element, "class")),
            source_tag: tag.to_string(),
            kind: frame_kind(style, &model, &geometry),
            geometry,
            layout,
            paint,
            children: Vec::new(),
            order: visit.order,
            flow,
        })?;
        self.tasks.push(Task::Finalize(index));

        let host = Host {
            index,
            element,
            content,
            containing: if position.is_positioned() { rect } else { visit.containing },
        };
        let after_order = items.len() + 1;
        for (kind, pseudo_style, generated) in pseudos {
            let order = match kind {
                PseudoKind::Before => 0,
                PseudoKind::After => after_order,
            };
            self.emit_pseudo(host, kind, &pseudo_style, generated, order)?;
        }

        if shape == TextShape::Promoted {
            let characters = leaf_text(&items, style);
            let rects: Vec<Rect> = runs(&items).flat_map(|run| run.rects.iter().copied()).collect();
            let text_rect = Rect::union_all(&rects).unwrap_or(content);
            self.emit_text(index, style, characters, text_rect, 1)?;
        }

        let mut visits = Vec::new();
        for (slot, item) in items.into_iter().enumerate() {
            let order = slot + 1;
            match item {
                ChildItem::Text(run) if shape == TextShape::Mixed && !run.is_blank() => {
                    let characters = collapse_whitespace(&run.text, style.value("white-space"));
                    let text_rect = Rect::union_all(&run.rects).unwrap_or(content);
                    self.emit_text(index, style, characters, text_rect, order)?;
                }
                ChildItem::Text(_) => {}
                ChildItem::Element(child) => visits.push(Visit {
                    element: child,
                    parent: Some(index),
                    depth: visit.depth + 1,
                    order,
                    containing: host.containing,
                }),
            }
        }
        self.tasks.extend(visits.into_iter().rev().map(Task::Visit));
        Ok(())
    }

    /// Images, SVG, video, embeds, canvas and form controls.
    fn visit_special(
        &mut self,
        visit: Visit,
        special: SpecialTag,
        tag: &str,
        style: &Arc<StyleSnapshot>,
        rect: Rect,
        location: &str,
    ) -> ExtractResult<()> {
        let accessor = self.ctx.accessor;
        let element = visit.element;
        let media = MediaSource::probe(accessor, element, special, rect.width);
        let rect = match media.as_ref().and_then(MediaSource::intrinsic_size) {
            Some(natural) if rect.is_empty() => Rect::new(rect.x, rect.y, natural.width, natural.height),
            _ => rect,
        };
        let model = BoxModel::from_style(style, rect.size(), &mut self.ctx.colors);
        let visible_box = has_visible_box(style, &model, &mut self.ctx.colors);
        let geometry = self.reconcile(visit, rect, style, &model, media.is_some(), visible_box);
        if geometry.is_empty() {
            debug!(%element, "skipping empty replaced element");
            return Ok(());
        }

        let layout = self.node_layout(visit, style, &geometry);
        let mut paint = element_paint(self.ctx, style, &model, geometry.absolute.size(), location);
        let flow = flow_info(style, &model);
        let content = inset(rect, &flow.border.add(&flow.padding));
        let object_fit = ScaleMode::from_css(style.value("object-fit"), "no-repeat");

        let kind = match (special, &media) {
            (_, Some(MediaSource::Vector(vector))) => {
                let key = match (&vector.markup, &vector.url) {
                    (Some(markup), _) => Some(self.ctx.assets.register_inline_svg(markup)),
                    (None, Some(url)) => self.ctx.assets.register_svg(url),
                    (None, None) => None,
                };
                if key.is_none() {
                    self.ctx.diagnostics.warn(location, "SVG without usable markup or URL");
                }
                NodeKind::Vector {
                    asset_key: key.map(|k| k.to_string()),
                }
            }
            (_, Some(source)) => {
                let key = source
                    .best_source_url()
                    .and_then(|url| self.ctx.assets.register_image(&url))
                    .map(|k| k.to_string());
                match (key, source) {
                    (None, MediaSource::Video(_) | MediaSource::Embed(_)) => NodeKind::Other {
                        reason: format!("{tag} without poster or thumbnail"),
                    },
                    (None, _) => {
                        self.ctx.diagnostics.warn(location, "No usable image source");
                        NodeKind::Image {
                            asset_key: None,
                            scale_mode: object_fit,
                        }
                    }
                    // Posters and thumbnails double as a fill.
                    (Some(key), MediaSource::Video(_) | MediaSource::Embed(_)) => {
                        paint.fills.push(Fill::Image {
                            asset_key: key.clone(),
                            scale_mode: object_fit,
                        });
                        NodeKind::Image {
                            asset_key: Some(key),
                            scale_mode: object_fit,
                        }
                    }
                    (Some(key), _) => NodeKind::Image {
                        asset_key: Some(key),
                        scale_mode: object_fit,
                    },
                }
            }
            (SpecialTag::FormControl, None) => frame_kind(style, &model, &geometry),
            (_, None) => NodeKind::Other {
                reason: tag.to_string(),
            },
        };

        let is_frame = matches!(kind, NodeKind::Frame { .. });
        let index = self.push_node(ArenaNode {
            id: NodeId(0),
            parent: visit.parent,
            name: element_name(tag, accessor.attribute(element, "id"), accessor.attribute(element, "class")),
            source_tag: tag.to_string(),
            geometry,
            layout,
            paint,
            kind,
            children: Vec::new(),
            order: visit.order,
            flow,
        })?;

        if is_frame {
            let value = accessor
                .attribute(element, "value")
                .filter(|v| !v.trim().is_empty())
                .or_else(|| accessor.attribute(element, "placeholder"));
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                self.emit_text(index, style, collapse_whitespace(&value, "normal"), content, 1)?;
            }
            self.finalize(index);
        }
        Ok(())
    }

    fn reconcile(
        &self,
        visit: Visit,
        rect: Rect,
        style: &StyleSnapshot,
        model: &BoxModel,
        has_content: bool,
        visually_meaningful: bool,
    ) -> Geometry {
        let is_root = visit.parent.is_none();
        let parent = visit.parent.map(|p| self.arena[p].geometry);
        reconcile(&GeometryInput {
            rect,
            border: model.border_widths(),
            padding: model.padding,
            position: style.position(),
            viewport: self.ctx.viewport(),
            parent: parent.as_ref(),
            has_content,
            visually_meaningful,
            is_root,
            scroll_size: if is_root {
                self.ctx.accessor.scroll_size(visit.element)
            } else {
                None
            },
        })
    }

    fn node_layout(&self, visit: Visit, style: &StyleSnapshot, geometry: &Geometry) -> NodeLayout {
        let size = geometry.absolute.size();
        let mut layout = NodeLayout::from_rect(geometry.relative);
        layout.transform = parse_transform(style.value("transform"), size);
        if layout.transform.is_some() {
            layout.transform_origin = Some(parse_transform_origin(style.value("transform-origin"), size));
        }
        layout.absolute = style.position().is_out_of_flow();
        layout.z_index = visit
            .parent
            .map_or(0, |p| effective_z(style, self.arena[p].flow.style.display()));
        layout
    }

    /// Pseudo-elements that generate a box.
    fn pseudo_contents(&mut self, element: ElementId) -> Vec<(PseudoKind, Arc<StyleSnapshot>, PseudoContent)> {
        [PseudoKind::Before, PseudoKind::After]
            .into_iter()
            .filter_map(|kind| {
                let style = self.ctx.style(element, Some(kind))?;
                if style.is("display", "none") {
                    return None;
                }
                let content = parse_content(style.value("content"))?;
                Some((kind, style, content))
            })
            .collect()
    }

    fn emit_pseudo(
        &mut self,
        host: Host,
        kind: PseudoKind,
        style: &Arc<StyleSnapshot>,
        content: PseudoContent,
        order: usize,
    ) -> ExtractResult<()> {
        let accessor = self.ctx.accessor;
        let location = format!("{}{}", host.element, kind.selector());
        let containing = if style.position() == Position::Fixed {
            let viewport = self.ctx.viewport();
            Rect::new(0.0, 0.0, viewport.width, viewport.height)
        } else {
            host.containing
        };
        let rect = accessor
            .pseudo_rect(host.element, kind)
            .unwrap_or_else(|| estimate_rect(style, kind, host.content, containing));
        let model = BoxModel::from_style(style, rect.size(), &mut self.ctx.colors);
        let visible = has_visible_box(style, &model, &mut self.ctx.colors);

        let host_geometry = self.arena[host.index].geometry;
        let mut geometry = reconcile_synthetic(rect, &host_geometry, self.ctx.viewport());
        let needs_size = visible || matches!(content, PseudoContent::Text(_));
        if needs_size && geometry.absolute.is_empty() {
            substitute_min_size(&mut geometry);
        }

        let mut layout = NodeLayout::from_rect(geometry.relative);
        layout.absolute = style.position().is_out_of_flow();
        layout.z_index = effective_z(style, self.arena[host.index].flow.style.display());
        let flow = flow_info(style, &model);
        let name = kind.selector().to_string();

        match content {
            PseudoContent::Text(text) if !visible => {
                let characters = collapse_whitespace(&text, style.value("white-space"));
                let index = self.emit_text(host.index, style, characters, rect, order)?;
                let node = &mut self.arena[index];
                node.name = name;
                node.source_tag = kind.selector().to_string();
                node.layout.absolute = layout.absolute;
                node.layout.z_index = layout.z_index;
                node.flow.position = flow.position;
            }
            PseudoContent::Image(url) => {
                let Some(key) = self.ctx.assets.register_image(&url) else {
                    self.ctx.diagnostics.warn(location, format!("Unusable pseudo-element image '{url}'"));
                    return Ok(());
                };
                let paint = element_paint(self.ctx, style, &model, geometry.absolute.size(), &location);
                self.push_node(ArenaNode {
                    id: NodeId(0),
                    parent: Some(host.index),
                    name,
                    source_tag: kind.selector().to_string(),
                    geometry,
                    layout,
                    paint,
                    kind: NodeKind::Image {
                        asset_key: Some(key.to_string()),
                        scale_mode: ScaleMode::Fit,
                    },
                    children: Vec::new(),
                    order,
                    flow,
                })?;
            }
            PseudoContent::Empty if !visible => {}
            content => {
                let paint = element_paint(self.ctx, style, &model, geometry.absolute.size(), &location);
                let text_box = inset(rect, &flow.border.add(&flow.padding));
                let index = self.push_node(ArenaNode {
                    id: NodeId(0),
                    parent: Some(host.index),
                    name,
                    source_tag: kind.selector().to_string(),
                    kind: frame_kind(style, &model, &geometry),
                    geometry,
                    layout,
                    paint,
                    children: Vec::new(),
                    order,
                    flow,
                })?;
                if let PseudoContent::Text(text) = content {
                    let characters = collapse_whitespace(&text, style.value("white-space"));
                    self.emit_text(index, style, characters, text_box, 0)?;
                }
                self.finalize(index);
            }
        }
        Ok(())
    }

    /// Synthesize a TEXT child measured by its own text range.
    fn emit_text(
        &mut self,
        parent: usize,
        style: &Arc<StyleSnapshot>,
        characters: String,
        rect: Rect,
        order: usize,
    ) -> ExtractResult<usize> {
        let host = self.arena[parent].geometry;
        let mut geometry = reconcile_synthetic(rect, &host, self.ctx.viewport());
        if geometry.absolute.is_empty() {
            substitute_min_size(&mut geometry);
        }
        let typography = self.observe_typography(style);
        let paint = text_paint(style, &mut self.ctx.colors);
        self.push_node(ArenaNode {
            id: NodeId(0),
            parent: Some(parent),
            name: text_name(&characters),
            source_tag: "#text".to_string(),
            geometry,
            layout: NodeLayout::from_rect(geometry.relative),
            paint,
            kind: NodeKind::Text {
                characters,
                typography,
            },
            children: Vec::new(),
            order,
            flow: FlowInfo::text(style),
        })
    }

    fn observe_typography(&mut self, style: &StyleSnapshot) -> Typography {
        let typography = typography(style, &mut self.ctx.colors);
        self.ctx.tokens.observe_typography(&typography);
        self.ctx.note_font_family(&typography.font_family);
        typography
    }

    /// Append a node to the arena and link it to its parent.
    fn push_node(&mut self, mut node: ArenaNode) -> ExtractResult<usize> {
        let limit = self.ctx.config.max_nodes;
        if self.arena.len() >= limit {
            return Err(ExtractError::NodeLimitExceeded { limit });
        }
        let index = self.arena.len();
        node.id = NodeId(u32::try_from(index).map_err(|_| ExtractError::NodeLimitExceeded { limit })?);
        self.ctx.tokens.observe_paint(&node.paint);
        debug!(id = %node.id, kind = node.kind.label(), tag = %node.source_tag, "node");
        if let Some(parent) = node.parent {
            self.arena[parent].children.push(index);
        }
        self.arena.push(node);
        Ok(index)
    }

    /// Infer auto-layout over children in source order, then sort them into
    /// paint order.
    fn finalize(&mut self, index: usize) {
        let mut children = std::mem::take(&mut self.arena[index].children);
        children.sort_by_key(|&c| self.arena[c].order);

        if matches!(self.arena[index].kind, NodeKind::Frame { .. }) && !children.is_empty() {
            let node = &self.arena[index];
            let viewport = self.ctx.viewport();
            let layout_children: Vec<LayoutChild> = children
                .iter()
                .map(|&c| {
                    let child = &self.arena[c];
                    let (x, y) = child.geometry.origin_in(node.geometry.space, viewport);
                    LayoutChild {
                        rect: Rect::new(x, y, child.geometry.absolute.width, child.geometry.absolute.height),
                        position: child.flow.position,
                        margin: child.flow.margin,
                    }
                })
                .collect();
            let container = LayoutContainer {
                style: node.flow.style.as_ref(),
                border_box: node.geometry.absolute,
                border: node.flow.border,
                padding: node.flow.padding,
            };
            let outcome = self.ctx.layout.evaluate(&container, &layout_children);
            if let Some(auto_layout) = outcome.auto_layout {
                self.ctx.tokens.observe_spacing(auto_layout.config.spacing);
                let padding = auto_layout.config.padding;
                for side in [padding.top, padding.right, padding.bottom, padding.left] {
                    self.ctx.tokens.observe_spacing(side);
                }
                if let NodeKind::Frame {
                    auto_layout: slot, ..
                } = &mut self.arena[index].kind
                {
                    *slot = Some(auto_layout);
                }
            }
        }

        let arena = &self.arena;
        sort_by_stacking(&mut children, |&c| (arena[c].layout.z_index, arena[c].order));
        self.arena[index].children = children;
    }

    /// Build the node tree bottom-up; children always sit after their parent
    /// in the arena.
    fn assemble(mut self) -> ExtractResult<Node> {
        let mut built: Vec<Option<Node>> = Vec::new();
        built.resize_with(self.arena.len(), || None);
        while let Some(node) = self.arena.pop() {
            let index = self.arena.len();
            let children = node
                .children
                .iter()
                .filter_map(|&c| built.get_mut(c).and_then(Option::take))
                .collect();
            let parent_id = node.parent.and_then(|p| u32::try_from(p).ok()).map(NodeId);
            built[index] = Some(Node {
                id: node.id,
                parent_id,
                name: node.name,
                source_tag: node.source_tag,
                layout: node.layout,
                absolute_layout: AbsoluteLayout {
                    rect: node.geometry.absolute,
                    space: node.geometry.space,
                },
                paint: node.paint,
                kind: node.kind,
                children,
            });
        }
        built
            .first_mut()
            .and_then(Option::take)
            .ok_or_else(|| ExtractError::RootUnavailable("the root node could not be assembled".into()))
    }
}

fn flow_info(style: &Arc<StyleSnapshot>, model: &BoxModel) -> FlowInfo {
    FlowInfo {
        style: Arc::clone(style),
        border: model.border_widths(),
        padding: model.padding,
        position: style.position(),
        margin: Sides {
            top: style.px("margin-top"),
            right: style.px("margin-right"),
            bottom: style.px("margin-bottom"),
            left: style.px("margin-left"),
        },
    }
}

fn frame_kind(style: &StyleSnapshot, model: &BoxModel, geometry: &Geometry) -> NodeKind {
    NodeKind::Frame {
        hints: FrameHints {
            display: style.display().to_string(),
            clips_content: clips_content(style),
            corner_radii: (!model.radii.is_zero()).then_some(model.radii),
            substituted_size: geometry.substituted,
        },
        auto_layout: None,
    }
}

fn clips_content(style: &StyleSnapshot) -> bool {
    ["overflow", "overflow-x", "overflow-y"]
        .iter()
        .any(|p| matches!(style.value(p), "hidden" | "clip" | "scroll" | "auto"))
}

fn inset(rect: Rect, sides: &Sides) -> Rect {
    Rect::new(
        rect.x + sides.left,
        rect.y + sides.top,
        (rect.width - sides.horizontal()).max(0.0),
        (rect.height - sides.vertical()).max(0.0),
    )
}

fn substitute_min_size(geometry: &mut Geometry) {
    for rect in [&mut geometry.absolute, &mut geometry.relative, &mut geometry.content] {
        rect.width = rect.width.max(MIN_VISIBLE_SIZE);
        rect.height = rect.height.max(MIN_VISIBLE_SIZE);
    }
    geometry.substituted = true;
}

fn runs(items: &[ChildItem]) -> impl Iterator<Item = &TextRun> {
    items.iter().filter_map(|item| match item {
        ChildItem::Text(run) => Some(run),
        ChildItem::Element(_) => None,
    })
}

fn leaf_text(items: &[ChildItem], style: &StyleSnapshot) -> String {
    let raw: String = runs(items).map(|run| run.text.as_str()).collect();
    collapse_whitespace(&raw, style.value("white-space"))
}

fn element_name(tag: &str, id: Option<String>, class: Option<String>) -> String {
    if let Some(id) = id.filter(|id| !id.trim().is_empty()) {
        return format!("{tag}#{}", id.trim());
    }
    match class.as_deref().and_then(|c| c.split_whitespace().next()) {
        Some(class) => format!("{tag}.{class}"),
        None => tag.to_string(),
    }
}

fn text_name(characters: &str) -> String {
    const MAX_CHARS: usize = 40;
    let mut name: String = characters.chars().take(MAX_CHARS).collect();
    if characters.chars().count() > MAX_CHARS {
        name.push('…');
    }
    name
}
