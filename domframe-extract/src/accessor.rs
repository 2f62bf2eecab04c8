//! The render-tree accessor contract.
//!
//! The compiler never talks to a browser directly. Hosts implement
//! [`RenderTreeAccessor`] over whatever exposes the live render tree; the
//! bundled [`RenderSnapshot`](crate::snapshot::RenderSnapshot) implements it
//! over a recorded JSON snapshot.

use std::fmt;
use std::sync::Arc;

use domframe_core::{ColorNormalizer, Rect, Size, StyleSnapshot, Viewport};
use serde::{Deserialize, Serialize};

/// Opaque element handle, stable for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Generated content boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PseudoKind {
    /// `::before`.
    Before,
    /// `::after`.
    After,
}

impl PseudoKind {
    /// Selector text.
    #[must_use]
    pub const fn selector(self) -> &'static str {
        match self {
            Self::Before => "::before",
            Self::After => "::after",
        }
    }
}

/// Page-level information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Document URL, used as the base for relative asset URLs.
    pub url: String,
    /// Document title.
    #[serde(default)]
    pub title: String,
    /// Viewport and scroll state.
    #[serde(default)]
    pub viewport: Viewport,
    /// Preferred color scheme.
    #[serde(default = "PageInfo::default_color_scheme")]
    pub color_scheme: String,
}

impl PageInfo {
    fn default_color_scheme() -> String {
        "light".to_string()
    }
}

/// A run of text directly under an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// Raw text content.
    pub text: String,
    /// Client rects of the text range (viewport-relative), one per line box.
    #[serde(default)]
    pub rects: Vec<Rect>,
}

impl TextRun {
    /// Whether the run holds anything but whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One entry of an element's child list, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildItem {
    /// A child element.
    Element(ElementId),
    /// A direct text run.
    Text(TextRun),
}

/// A `<source>` inside a `<picture>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PictureSource {
    /// `srcset` attribute.
    #[serde(default)]
    pub srcset: String,
    /// `media` attribute.
    #[serde(default)]
    pub media: Option<String>,
    /// `type` attribute.
    #[serde(default, rename = "type")]
    pub mime: Option<String>,
}

/// A declared `@font-face` source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontFaceSource {
    /// `font-family`.
    pub family: String,
    /// `font-weight`.
    #[serde(default = "FontFaceSource::default_weight")]
    pub weight: String,
    /// `font-style`.
    #[serde(default = "FontFaceSource::default_style")]
    pub style: String,
    /// Source URL as declared.
    pub url: String,
}

impl FontFaceSource {
    fn default_weight() -> String {
        "400".to_string()
    }

    fn default_style() -> String {
        "normal".to_string()
    }
}

/// Read access to a rendered element tree.
///
/// Every query is infallible from the compiler's point of view: `None` or an
/// empty list means the information is unavailable for that element, and the
/// compiler degrades locally.
pub trait RenderTreeAccessor {
    /// Page URL, title, viewport and color scheme.
    fn page_info(&self) -> PageInfo;

    /// The document root element.
    fn root(&self) -> Option<ElementId>;

    /// Lowercase tag name.
    fn tag_name(&self, element: ElementId) -> String;

    /// Attribute value.
    fn attribute(&self, element: ElementId, name: &str) -> Option<String>;

    /// Computed style of the element or one of its pseudo-elements.
    fn computed_style(&self, element: ElementId, pseudo: Option<PseudoKind>) -> Option<Arc<StyleSnapshot>>;

    /// Border box, viewport-relative.
    fn bounding_rect(&self, element: ElementId) -> Option<Rect>;

    /// Measured box of a pseudo-element, viewport-relative, when the host can
    /// measure it.
    fn pseudo_rect(&self, element: ElementId, pseudo: PseudoKind) -> Option<Rect>;

    /// Child elements and text runs in source order.
    fn children(&self, element: ElementId) -> Vec<ChildItem>;

    /// Natural size of replaced content (images, video, canvas).
    fn intrinsic_size(&self, element: ElementId) -> Option<Size>;

    /// Scroll extent of the element.
    fn scroll_size(&self, element: ElementId) -> Option<Size>;

    /// Serialized markup of the element (used for inline SVG).
    fn outer_markup(&self, element: ElementId) -> Option<String>;

    /// Markup of an external sprite reference such as `icons.svg#close`.
    fn sprite_markup(&self, href: &str) -> Option<String>;

    /// `<source>` entries of the element's enclosing `<picture>`.
    fn picture_sources(&self, element: ElementId) -> Vec<PictureSource>;

    /// The source the browser actually selected for a media element.
    fn current_src(&self, element: ElementId) -> Option<String> {
        self.attribute(element, "currentSrc")
    }

    /// Declared `@font-face` sources.
    fn font_faces(&self) -> Vec<FontFaceSource>;

    /// Normalize a color string the built-in parser does not understand.
    fn normalize_color(&self, _raw: &str) -> Option<String> {
        None
    }
}

/// Adapts an accessor's color normalization to the color parser.
pub struct AccessorNormalizer<'a>(pub &'a dyn RenderTreeAccessor);

impl ColorNormalizer for AccessorNormalizer<'_> {
    fn normalize(&self, raw: &str) -> Option<String> {
        self.0.normalize_color(raw)
    }
}
