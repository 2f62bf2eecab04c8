//! Paint descriptions: fills, strokes and effects.
//!
//! Lists are in paint order, bottom to top.

use serde::{Deserialize, Serialize};

use crate::geometry::Sides;
use crate::style::color::Color;
use crate::style::gradient::Gradient;

/// How an image fill is fitted into its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScaleMode {
    /// Cover the node, cropping overflow (`object-fit: cover`, `background-size: cover`).
    #[default]
    Fill,
    /// Fit inside the node (`contain`).
    Fit,
    /// Repeat at intrinsic size.
    Tile,
    /// Stretch to the node box (`object-fit: fill`).
    Stretch,
}

impl ScaleMode {
    /// Map `object-fit` / `background-size` / `background-repeat` evidence.
    #[must_use]
    pub fn from_css(object_fit_or_size: &str, repeat: &str) -> Self {
        match object_fit_or_size.trim() {
            "contain" | "scale-down" => Self::Fit,
            "fill" | "100% 100%" => Self::Stretch,
            "cover" => Self::Fill,
            _ if repeat.trim().starts_with("repeat") && repeat.trim() != "repeat-x" => Self::Tile,
            _ => Self::Fill,
        }
    }
}

/// A fill layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Fill {
    /// A solid color.
    Solid {
        /// The color (alpha carries opacity).
        color: Color,
    },
    /// A gradient.
    Gradient(Gradient),
    /// An image referenced by asset key.
    Image {
        /// Key into the document's image map.
        #[serde(rename = "assetKey")]
        asset_key: String,
        /// Fitting mode.
        #[serde(rename = "scaleMode")]
        scale_mode: ScaleMode,
    },
}

/// Stroke alignment relative to the node edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrokeAlign {
    /// Drawn inside the border box (CSS borders).
    #[default]
    Inside,
    /// Centred on the edge.
    Center,
    /// Drawn outside (CSS outlines).
    Outside,
}

/// A stroke layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    /// Stroke color.
    pub color: Color,
    /// Uniform weight (the maximum side weight when sides differ).
    pub weight: f32,
    /// Alignment.
    pub align: StrokeAlign,
    /// Dash pattern, empty for solid strokes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dash_pattern: Vec<f32>,
    /// Per-side weights when the border is not uniform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_weights: Option<Sides>,
}

/// Parameters shared by drop and inner shadows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowEffect {
    /// Shadow color.
    pub color: Color,
    /// Horizontal offset.
    pub offset_x: f32,
    /// Vertical offset.
    pub offset_y: f32,
    /// Blur radius.
    pub radius: f32,
    /// Spread distance.
    pub spread: f32,
}

/// A visual effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Effect {
    /// Outer shadow.
    DropShadow(ShadowEffect),
    /// Inset shadow.
    InnerShadow(ShadowEffect),
    /// Blur of the layer itself (`filter: blur()`).
    LayerBlur {
        /// Blur radius.
        radius: f32,
    },
    /// Blur of what is behind the layer (`backdrop-filter: blur()`).
    BackgroundBlur {
        /// Blur radius.
        radius: f32,
    },
}

/// Color adjustments from `brightness()`, `contrast()` and `saturate()`.
///
/// Each value is the CSS multiplier (1.0 = unchanged).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorAdjustments {
    /// `brightness()` multiplier.
    pub brightness: f32,
    /// `contrast()` multiplier.
    pub contrast: f32,
    /// `saturate()` multiplier.
    pub saturation: f32,
}

impl Default for ColorAdjustments {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
        }
    }
}

impl ColorAdjustments {
    /// Whether every multiplier is 1.
    #[must_use]
    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }
}

/// Layer blend modes representable in the target document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

/// Complete paint of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paint {
    /// Fills, bottom to top.
    pub fills: Vec<Fill>,
    /// Strokes.
    pub strokes: Vec<Stroke>,
    /// Effects in paint order.
    pub effects: Vec<Effect>,
    /// Filter-derived color adjustments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustments: Option<ColorAdjustments>,
    /// Layer blend mode.
    #[serde(default)]
    pub blend_mode: BlendMode,
    /// Layer opacity.
    #[serde(default = "Paint::default_opacity")]
    pub opacity: f32,
    /// Reasons the node cannot be represented faithfully and should be
    /// rasterized by the consumer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rasterize: Vec<String>,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            fills: Vec::new(),
            strokes: Vec::new(),
            effects: Vec::new(),
            adjustments: None,
            blend_mode: BlendMode::Normal,
            opacity: 1.0,
            rasterize: Vec::new(),
        }
    }
}

impl Paint {
    const fn default_opacity() -> f32 {
        1.0
    }

    /// Whether the paint draws anything by itself.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        !self.fills.is_empty() || !self.strokes.is_empty() || !self.effects.is_empty()
    }

    /// Every color referenced by fills, gradient stops and strokes.
    pub fn colors(&self) -> impl Iterator<Item = Color> + '_ {
        let fill_colors = self.fills.iter().flat_map(|fill| match fill {
            Fill::Solid { color } => vec![*color],
            Fill::Gradient(g) => g.stops.iter().map(|s| s.color).collect(),
            Fill::Image { .. } => Vec::new(),
        });
        fill_colors.chain(self.strokes.iter().map(|s| s.color))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_mode_mapping() {
        assert_eq!(ScaleMode::from_css("contain", "no-repeat"), ScaleMode::Fit);
        assert_eq!(ScaleMode::from_css("cover", "repeat"), ScaleMode::Fill);
        assert_eq!(ScaleMode::from_css("auto", "repeat"), ScaleMode::Tile);
        assert_eq!(ScaleMode::from_css("auto", "no-repeat"), ScaleMode::Fill);
    }

    #[test]
    fn test_effect_serialization_is_tagged() {
        let effect = Effect::LayerBlur { radius: 4.0 };
        let json = serde_json::to_value(&effect).expect("serialize");
        assert_eq!(json["type"], "LAYER_BLUR");
        assert_eq!(json["radius"], 4.0);
    }
}
