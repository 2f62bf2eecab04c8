//! Output node model.
//!
//! A node is a shared base (identity, geometry, paint, children) plus a
//! closed [`NodeKind`] union. Frame-only data such as auto-layout lives on
//! [`NodeKind::Frame`], so text and media nodes cannot carry it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::autolayout::AutoLayout;
use crate::geometry::{CoordinateSpace, Rect};
use crate::paint::{Paint, ScaleMode};
use crate::style::box_model::CornerRadii;
use crate::style::color::Color;
use crate::style::transform::{Affine, TransformOrigin};

/// Node identifier, assigned sequentially in traversal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Parent-relative box plus layout-system hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLayout {
    /// Left edge relative to the parent.
    pub x: f32,
    /// Top edge relative to the parent.
    pub y: f32,
    /// Border-box width.
    pub width: f32,
    /// Border-box height.
    pub height: f32,
    /// Affine transform from CSS `transform`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Affine>,
    /// Transform origin (present with `transform`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_origin: Option<TransformOrigin>,
    /// Taken out of the parent's auto-layout flow (absolute/fixed).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub absolute: bool,
    /// Effective stacking order.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub z_index: i32,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &i32) -> bool {
    *value == 0
}

impl NodeLayout {
    /// Layout from a parent-relative rectangle.
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            transform: None,
            transform_origin: None,
            absolute: false,
            z_index: 0,
        }
    }
}

/// Absolute box and its coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsoluteLayout {
    /// Border box.
    #[serde(flatten)]
    pub rect: Rect,
    /// `document` or `viewport`.
    pub space: CoordinateSpace,
}

/// Layout-system flags of a frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameHints {
    /// Computed `display`.
    pub display: String,
    /// Overflow is clipped.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub clips_content: bool,
    /// Corner radii.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radii: Option<CornerRadii>,
    /// A minimum size was substituted for a zero-size box.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub substituted_size: bool,
}

/// Text style of a text node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    /// Primary font family (first of the stack, unquoted).
    pub font_family: String,
    /// Full `font-family` stack.
    pub font_stack: String,
    /// Numeric weight.
    pub font_weight: u16,
    /// Size in pixels.
    pub font_size: f32,
    /// Line height in pixels, `None` for `normal`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f32>,
    /// Letter spacing in pixels.
    #[serde(default)]
    pub letter_spacing: f32,
    /// Italic or oblique.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub italic: bool,
    /// `text-align`.
    pub text_align: String,
    /// `text-decoration-line`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text_decoration: String,
    /// `text-transform`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text_transform: String,
    /// Text color.
    pub color: Color,
}

/// Kind-specific node data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    /// Container.
    Frame {
        /// Layout-system flags.
        #[serde(flatten)]
        hints: FrameHints,
        /// Validated auto-layout, `null` when not a candidate.
        #[serde(rename = "autoLayout")]
        auto_layout: Option<AutoLayout>,
    },
    /// A text run.
    Text {
        /// The text.
        characters: String,
        /// Typography.
        typography: Typography,
    },
    /// Raster image or video poster.
    Image {
        /// Key into the image map, `None` when no source resolved.
        #[serde(rename = "assetKey")]
        asset_key: Option<String>,
        /// Fitting mode.
        #[serde(rename = "scaleMode")]
        scale_mode: ScaleMode,
    },
    /// Vector graphic.
    Vector {
        /// Key into the SVG map.
        #[serde(rename = "assetKey")]
        asset_key: Option<String>,
    },
    /// Content that cannot be represented (canvas, form controls...).
    Other {
        /// What the node stands for.
        reason: String,
    },
}

impl NodeKind {
    /// Short label used in names and logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Frame { .. } => "FRAME",
            Self::Text { .. } => "TEXT",
            Self::Image { .. } => "IMAGE",
            Self::Vector { .. } => "VECTOR",
            Self::Other { .. } => "OTHER",
        }
    }

    /// Auto-layout of a frame.
    #[must_use]
    pub fn auto_layout(&self) -> Option<&AutoLayout> {
        match self {
            Self::Frame { auto_layout, .. } => auto_layout.as_ref(),
            _ => None,
        }
    }
}

/// One output node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Identifier.
    pub id: NodeId,
    /// Parent identifier, `None` for the root.
    pub parent_id: Option<NodeId>,
    /// Display name.
    pub name: String,
    /// Source element tag (`#text` and `::before` for synthesized nodes).
    pub source_tag: String,
    /// Parent-relative layout.
    pub layout: NodeLayout,
    /// Absolute layout.
    pub absolute_layout: AbsoluteLayout,
    /// Fills, strokes and effects.
    pub paint: Paint,
    /// Kind-specific data.
    #[serde(flatten)]
    pub kind: NodeKind,
    /// Children in paint order, bottom to top.
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Node {
    /// Whether this is a text node.
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text { .. })
    }

    /// Depth-first pre-order iterator over this subtree.
    #[must_use]
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Number of nodes in this subtree, including itself.
    #[must_use]
    pub fn count(&self) -> usize {
        self.descendants().count()
    }
}

/// Pre-order iterator returned by [`Node::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
