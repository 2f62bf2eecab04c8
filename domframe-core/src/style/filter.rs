//! `filter`, `backdrop-filter` and `mix-blend-mode` parsing.
//!
//! Functions the target document can represent become effects or color
//! adjustments. Everything else is reported as a rasterization reason so the
//! consumer can fall back to a bitmap instead of silently losing the effect.

use super::color::ColorParser;
use super::shadow::{parse_layer, ShadowKind};
use super::{parse_px, split_function, split_top_level_whitespace};
use crate::paint::{BlendMode, ColorAdjustments, Effect};

/// Which property the filter list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterContext {
    /// `filter`: blurs apply to the layer itself.
    Foreground,
    /// `backdrop-filter`: blurs apply to what is behind the layer. Color
    /// functions recolor the backdrop, which has no representation, so
    /// they request rasterization.
    Backdrop,
}

impl FilterContext {
    fn property(self) -> &'static str {
        match self {
            Self::Foreground => "filter",
            Self::Backdrop => "backdrop-filter",
        }
    }
}

/// Result of parsing a filter list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    /// Representable effects in declared order.
    pub effects: Vec<Effect>,
    /// Combined color adjustments of the layer itself, `None` when neutral.
    /// Always `None` for [`FilterContext::Backdrop`].
    pub adjustments: Option<ColorAdjustments>,
    /// Unsupported functions, one reason per function.
    pub rasterize: Vec<String>,
}

impl FilterOutcome {
    /// Whether nothing was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty() && self.adjustments.is_none() && self.rasterize.is_empty()
    }
}

/// Parse a filter function list.
pub fn parse_filter(raw: &str, context: FilterContext, colors: &mut ColorParser<'_>) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();
    let raw = raw.trim();
    if raw.is_empty() || raw == "none" {
        return outcome;
    }

    let property = context.property();
    let mut adjustments = ColorAdjustments::default();
    for token in split_top_level_whitespace(raw) {
        let Some((name, args)) = split_function(token) else {
            outcome.rasterize.push(format!("{property}: {token}"));
            continue;
        };
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "blur" => match parse_px(args) {
                Some(radius) if radius > 0.0 => outcome.effects.push(match context {
                    FilterContext::Foreground => Effect::LayerBlur { radius },
                    FilterContext::Backdrop => Effect::BackgroundBlur { radius },
                }),
                Some(_) => {}
                None => outcome.rasterize.push(format!("{property}: {token}")),
            },
            "drop-shadow" if context == FilterContext::Foreground => {
                match parse_layer(args, ShadowKind::Text, colors) {
                    Some(shadow) => outcome.effects.push(shadow.to_effect()),
                    None => outcome.rasterize.push(format!("{property}: {token}")),
                }
            }
            "brightness" | "contrast" | "saturate" if context == FilterContext::Foreground => {
                match parse_amount(args) {
                    Some(amount) => {
                        let slot = match name.as_str() {
                            "brightness" => &mut adjustments.brightness,
                            "contrast" => &mut adjustments.contrast,
                            _ => &mut adjustments.saturation,
                        };
                        *slot *= amount;
                    }
                    None => outcome.rasterize.push(format!("{property}: {token}")),
                }
            }
            _ => outcome.rasterize.push(format!("{property}: {name}()")),
        }
    }

    if !adjustments.is_neutral() {
        outcome.adjustments = Some(adjustments);
    }
    outcome
}

/// Filter amounts: `1.2`, `120%`, or empty for the default of 1.
fn parse_amount(args: &str) -> Option<f32> {
    let args = args.trim();
    if args.is_empty() {
        return Some(1.0);
    }
    if let Some(pct) = args.strip_suffix('%') {
        return pct.trim().parse::<f32>().ok().map(|p| p / 100.0);
    }
    args.parse::<f32>().ok().filter(|n| n.is_finite())
}

/// Result of mapping a CSS blend mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlendOutcome {
    /// Representable blend mode.
    Mode(BlendMode),
    /// Not representable; carries the rasterization reason.
    Rasterize(String),
}

/// Map a `mix-blend-mode` value.
#[must_use]
pub fn parse_blend_mode(raw: &str) -> BlendOutcome {
    let mode = match raw.trim().to_ascii_lowercase().as_str() {
        "" | "normal" => BlendMode::Normal,
        "multiply" => BlendMode::Multiply,
        "screen" => BlendMode::Screen,
        "overlay" => BlendMode::Overlay,
        "darken" => BlendMode::Darken,
        "lighten" => BlendMode::Lighten,
        "color-dodge" => BlendMode::ColorDodge,
        "color-burn" => BlendMode::ColorBurn,
        "hard-light" => BlendMode::HardLight,
        "soft-light" => BlendMode::SoftLight,
        "difference" => BlendMode::Difference,
        "exclusion" => BlendMode::Exclusion,
        "hue" => BlendMode::Hue,
        "saturation" => BlendMode::Saturation,
        "color" => BlendMode::Color,
        "luminosity" => BlendMode::Luminosity,
        other => return BlendOutcome::Rasterize(format!("mix-blend-mode: {other}")),
    };
    BlendOutcome::Mode(mode)
}
