//! Element classification.
//!
//! Decides, per element, whether it is skipped, hidden, routed to a media
//! handler, emitted as a text leaf or walked as a container.

use domframe_core::StyleSnapshot;

/// Tags that never paint anything.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "meta", "link", "head", "title", "noscript", "template", "base", "source", "track",
    "param", "datalist", "br", "wbr",
];

/// Embedded or replaced content with a dedicated handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialTag {
    /// `<img>`.
    Image,
    /// Inline `<svg>`.
    Svg,
    /// `<video>`.
    Video,
    /// `<iframe>`, `<object>`, `<embed>`.
    Embed,
    /// `<canvas>`.
    Canvas,
    /// `<input>`, `<textarea>`, `<select>`.
    FormControl,
    /// `<audio>`.
    Audio,
}

impl SpecialTag {
    /// Classify a lowercase tag name.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "img" => Self::Image,
            "svg" => Self::Svg,
            "video" => Self::Video,
            "iframe" | "object" | "embed" => Self::Embed,
            "canvas" => Self::Canvas,
            "input" | "textarea" | "select" => Self::FormControl,
            "audio" => Self::Audio,
            _ => return None,
        })
    }
}

/// Why an element produced no node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Non-visual tag.
    NonVisual,
    /// `display: none`.
    DisplayNone,
    /// `visibility: hidden` or `collapse`.
    Invisible,
    /// `opacity: 0` on a non-positioned element.
    Transparent,
}

/// Whether a tag is on the skip-list.
#[must_use]
pub fn is_skipped_tag(tag: &str) -> bool {
    SKIPPED_TAGS.contains(&tag)
}

/// Hidden-element check.
///
/// Zero opacity hides an element unless it is positioned out of flow or
/// sticky; those are usually transition targets about to appear.
#[must_use]
pub fn hidden_reason(style: &StyleSnapshot) -> Option<SkipReason> {
    if style.is("display", "none") {
        return Some(SkipReason::DisplayNone);
    }
    if style.is("visibility", "hidden") || style.is("visibility", "collapse") {
        return Some(SkipReason::Invisible);
    }
    let position = style.position();
    if style.opacity() <= 0.0 && !(position.is_out_of_flow() || position.is_viewport_anchored()) {
        return Some(SkipReason::Transparent);
    }
    None
}

/// What to do with the direct text of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextShape {
    /// No direct text.
    None,
    /// A text leaf emitted as a single TEXT node.
    Leaf,
    /// A text leaf with its own box, emitted as a FRAME wrapping TEXT.
    Promoted,
    /// Text mixed with child elements; each run becomes a TEXT child.
    Mixed,
}

/// Classify direct text content.
///
/// `has_box` is whether the element paints a visible box (background,
/// border, shadow, radius or padding); `has_pseudo` is whether it
/// generates `::before`/`::after` content.
#[must_use]
pub fn text_shape(has_text: bool, has_child_elements: bool, has_box: bool, has_pseudo: bool) -> TextShape {
    match (has_text, has_child_elements) {
        (false, _) => TextShape::None,
        (true, true) => TextShape::Mixed,
        (true, false) if has_box || has_pseudo => TextShape::Promoted,
        (true, false) => TextShape::Leaf,
    }
}
