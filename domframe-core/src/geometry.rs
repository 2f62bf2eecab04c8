//! Geometry reconciliation.
//!
//! Combines the raw border-box reported by the render tree with the computed
//! box model to produce visual (border-box) and content-box dimensions, in
//! both absolute and parent-relative coordinates.
//!
//! ```text
//! reported rect (viewport-relative)
//!        │  + scroll offset (unless fixed/sticky)
//!        ▼
//! absolute border box ──► relative box (minus parent origin)
//!        │  − border − padding
//!        ▼
//! content box (clamped ≥ 0)
//! ```

use serde::{Deserialize, Serialize};

/// Size substituted on a zero-length axis of a node that must stay visible.
pub const MIN_VISIBLE_SIZE: f32 = 1.0;

/// An axis-aligned rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Rect {
    /// Create a rectangle.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Whether either axis has no extent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Size of the rectangle.
    #[must_use]
    pub const fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }

    /// Offset by the given amounts.
    #[must_use]
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Smallest rectangle containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Self {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Whether the interiors of two rectangles overlap by more than `epsilon`.
    #[must_use]
    pub fn overlaps(&self, other: &Self, epsilon: f32) -> bool {
        let overlap_x = self.right().min(other.right()) - self.x.max(other.x);
        let overlap_y = self.bottom().min(other.bottom()) - self.y.max(other.y);
        overlap_x > epsilon && overlap_y > epsilon
    }

    /// Union of a set of rectangles, `None` when empty.
    pub fn union_all<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Option<Self> {
        rects.into_iter().fold(None, |acc: Option<Rect>, r| {
            Some(acc.map_or(*r, |a| a.union(r)))
        })
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Size {
    /// Create a size.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Per-side lengths (border widths, padding).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sides {
    /// Top side.
    pub top: f32,
    /// Right side.
    pub right: f32,
    /// Bottom side.
    pub bottom: f32,
    /// Left side.
    pub left: f32,
}

impl Sides {
    /// The same length on every side.
    #[must_use]
    pub const fn uniform(v: f32) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    /// Left + right.
    #[must_use]
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    /// Top + bottom.
    #[must_use]
    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }

    /// Whether every side is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.right == 0.0 && self.bottom == 0.0 && self.left == 0.0
    }

    /// Whether all sides are equal.
    #[must_use]
    pub fn is_uniform(&self) -> bool {
        self.top == self.right && self.right == self.bottom && self.bottom == self.left
    }

    /// Side-wise sum.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        Self {
            top: self.top + other.top,
            right: self.right + other.right,
            bottom: self.bottom + other.bottom,
            left: self.left + other.left,
        }
    }
}

/// CSS `position` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// Normal flow.
    #[default]
    Static,
    /// Flow position with offset.
    Relative,
    /// Out of flow, relative to containing block.
    Absolute,
    /// Out of flow, relative to viewport.
    Fixed,
    /// Flow position pinned within scroll container.
    Sticky,
}

impl Position {
    /// Parse a computed `position` value; unknown values are static.
    #[must_use]
    pub fn from_css(value: &str) -> Self {
        match value.trim() {
            "relative" => Self::Relative,
            "absolute" => Self::Absolute,
            "fixed" => Self::Fixed,
            "sticky" | "-webkit-sticky" => Self::Sticky,
            _ => Self::Static,
        }
    }

    /// Anything other than `static` establishes a positioning context.
    #[must_use]
    pub const fn is_positioned(self) -> bool {
        !matches!(self, Self::Static)
    }

    /// Taken out of normal flow (`absolute`/`fixed`).
    #[must_use]
    pub const fn is_out_of_flow(self) -> bool {
        matches!(self, Self::Absolute | Self::Fixed)
    }

    /// Uses viewport-relative coordinates.
    #[must_use]
    pub const fn is_viewport_anchored(self) -> bool {
        matches!(self, Self::Fixed | Self::Sticky)
    }
}

/// The coordinate space a node's absolute box is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSpace {
    /// Document coordinates (scroll offset added).
    #[default]
    Document,
    /// Viewport coordinates (no scroll offset).
    Viewport,
}

/// Viewport state at extraction time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    /// Viewport width.
    pub width: f32,
    /// Viewport height.
    pub height: f32,
    /// Horizontal scroll offset.
    #[serde(default)]
    pub scroll_x: f32,
    /// Vertical scroll offset.
    #[serde(default)]
    pub scroll_y: f32,
    /// Device pixel ratio.
    #[serde(default = "Viewport::default_dpr")]
    pub device_pixel_ratio: f32,
}

impl Viewport {
    const fn default_dpr() -> f32 {
        1.0
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
            device_pixel_ratio: 1.0,
        }
    }
}

/// Reconciled geometry for one node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geometry {
    /// Border box in `space` coordinates.
    pub absolute: Rect,
    /// Border box relative to the parent's border box.
    pub relative: Rect,
    /// Content box in `space` coordinates.
    pub content: Rect,
    /// Coordinate space of `absolute` and `content`.
    pub space: CoordinateSpace,
    /// Whether a minimum visible size was substituted.
    pub substituted: bool,
}

impl Geometry {
    /// Origin of this node's border box expressed in `target` space.
    #[must_use]
    pub fn origin_in(&self, target: CoordinateSpace, viewport: &Viewport) -> (f32, f32) {
        convert_point(
            self.absolute.x,
            self.absolute.y,
            self.space,
            target,
            viewport,
        )
    }

    /// Whether the node should be dropped as empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.absolute.is_empty() && !self.substituted
    }
}

fn convert_point(
    x: f32,
    y: f32,
    from: CoordinateSpace,
    to: CoordinateSpace,
    viewport: &Viewport,
) -> (f32, f32) {
    match (from, to) {
        (CoordinateSpace::Document, CoordinateSpace::Viewport) => {
            (x - viewport.scroll_x, y - viewport.scroll_y)
        }
        (CoordinateSpace::Viewport, CoordinateSpace::Document) => {
            (x + viewport.scroll_x, y + viewport.scroll_y)
        }
        _ => (x, y),
    }
}

/// Everything the reconciler needs about one element.
#[derive(Debug, Clone, Copy)]
pub struct GeometryInput<'a> {
    /// Border box as reported (viewport-relative).
    pub rect: Rect,
    /// Border widths.
    pub border: Sides,
    /// Padding widths.
    pub padding: Sides,
    /// Computed `position`.
    pub position: Position,
    /// Viewport and scroll state.
    pub viewport: &'a Viewport,
    /// Parent geometry, `None` for the root.
    pub parent: Option<&'a Geometry>,
    /// The element has descendant content.
    pub has_content: bool,
    /// The element paints something (background, border, shadow).
    pub visually_meaningful: bool,
    /// Root/document element.
    pub is_root: bool,
    /// Scroll extent of the element (roots only).
    pub scroll_size: Option<Size>,
}

/// Reconcile raw geometry with the box model.
#[must_use]
pub fn reconcile(input: &GeometryInput<'_>) -> Geometry {
    let space = if input.position.is_viewport_anchored() {
        CoordinateSpace::Viewport
    } else {
        CoordinateSpace::Document
    };

    let mut width = input.rect.width.max(0.0);
    let mut height = input.rect.height.max(0.0);

    if input.is_root {
        if let Some(scroll) = input.scroll_size {
            height = height.max(scroll.height);
        }
    }

    let mut substituted = false;
    if (width <= 0.0 || height <= 0.0) && (input.has_content || input.visually_meaningful) {
        if width <= 0.0 {
            width = MIN_VISIBLE_SIZE;
        }
        if height <= 0.0 {
            height = MIN_VISIBLE_SIZE;
        }
        substituted = true;
    }

    let (x, y) = convert_point(
        input.rect.x,
        input.rect.y,
        CoordinateSpace::Viewport,
        space,
        input.viewport,
    );
    let absolute = Rect::new(x, y, width, height);

    let inset = input.border.add(&input.padding);
    let content = Rect::new(
        x + inset.left,
        y + inset.top,
        (width - inset.horizontal()).max(0.0),
        (height - inset.vertical()).max(0.0),
    );

    Geometry {
        absolute,
        relative: relative_to(absolute, space, input.parent, input.viewport),
        content,
        space,
        substituted,
    }
}

/// Geometry for a synthesized child (text run, pseudo-element) of `host`.
///
/// The child inherits the host's coordinate space so fixed hosts keep their
/// synthesized children in viewport coordinates.
#[must_use]
pub fn reconcile_synthetic(rect: Rect, host: &Geometry, viewport: &Viewport) -> Geometry {
    let (x, y) = convert_point(
        rect.x,
        rect.y,
        CoordinateSpace::Viewport,
        host.space,
        viewport,
    );
    let absolute = Rect::new(x, y, rect.width.max(0.0), rect.height.max(0.0));
    Geometry {
        absolute,
        relative: relative_to(absolute, host.space, Some(host), viewport),
        content: absolute,
        space: host.space,
        substituted: false,
    }
}

fn relative_to(
    absolute: Rect,
    space: CoordinateSpace,
    parent: Option<&Geometry>,
    viewport: &Viewport,
) -> Rect {
    match parent {
        Some(parent) => {
            let (px, py) = parent.origin_in(space, viewport);
            absolute.translate(-px, -py)
        }
        None => absolute,
    }
}
