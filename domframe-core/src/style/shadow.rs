//! `box-shadow` and `text-shadow` parsing.

use serde::{Deserialize, Serialize};

use super::color::{Color, ColorParser};
use super::{parse_px, split_top_level, split_top_level_whitespace};
use crate::paint::{Effect, ShadowEffect};

/// Which property a shadow list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowKind {
    /// `box-shadow` (supports `inset` and spread).
    Box,
    /// `text-shadow` (no spread).
    Text,
}

/// One parsed shadow layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shadow {
    /// Inner shadow.
    pub inset: bool,
    /// Horizontal offset.
    pub offset_x: f32,
    /// Vertical offset.
    pub offset_y: f32,
    /// Blur radius.
    pub blur: f32,
    /// Spread distance.
    pub spread: f32,
    /// Shadow color.
    pub color: Color,
}

impl Shadow {
    /// The equivalent effect.
    #[must_use]
    pub fn to_effect(&self) -> Effect {
        let params = ShadowEffect {
            color: self.color,
            offset_x: self.offset_x,
            offset_y: self.offset_y,
            radius: self.blur,
            spread: self.spread,
        };
        if self.inset {
            Effect::InnerShadow(params)
        } else {
            Effect::DropShadow(params)
        }
    }
}

/// Parse a shadow list in declared order (first = topmost).
///
/// Layers that cannot be parsed are skipped; fully transparent layers are
/// dropped since they paint nothing.
pub fn parse_shadows(raw: &str, kind: ShadowKind, colors: &mut ColorParser<'_>) -> Vec<Shadow> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "none" {
        return Vec::new();
    }
    split_top_level(raw, ',')
        .into_iter()
        .filter_map(|layer| parse_layer(layer, kind, colors))
        .filter(|shadow| !shadow.color.is_transparent())
        .collect()
}

/// Parse a single shadow layer (also used by `drop-shadow()` filters).
pub fn parse_layer(layer: &str, kind: ShadowKind, colors: &mut ColorParser<'_>) -> Option<Shadow> {
    let mut inset = false;
    let mut color: Option<Color> = None;
    let mut lengths: Vec<f32> = Vec::new();

    for token in split_top_level_whitespace(layer) {
        if token.eq_ignore_ascii_case("inset") {
            inset = kind == ShadowKind::Box;
        } else if let Some(length) = parse_px(token) {
            lengths.push(length);
        } else if color.is_none() {
            color = Some(colors.parse(token)?);
        } else {
            return None;
        }
    }

    if lengths.len() < 2 {
        return None;
    }
    let spread = match kind {
        ShadowKind::Box => lengths.get(3).copied().unwrap_or(0.0),
        ShadowKind::Text => 0.0,
    };
    Some(Shadow {
        inset,
        offset_x: lengths[0],
        offset_y: lengths[1],
        blur: lengths.get(2).copied().unwrap_or(0.0).max(0.0),
        spread,
        color: color.unwrap_or(Color::BLACK),
    })
}

/// Box-shadow effects in paint order.
///
/// CSS lists the topmost shadow first; the output is reversed so the last
/// declared (bottom-most) shadow is painted first.
pub fn box_shadow_effects(raw: &str, colors: &mut ColorParser<'_>) -> Vec<Effect> {
    parse_shadows(raw, ShadowKind::Box, colors)
        .iter()
        .rev()
        .map(Shadow::to_effect)
        .collect()
}

/// Text-shadow effects in paint order.
pub fn text_shadow_effects(raw: &str, colors: &mut ColorParser<'_>) -> Vec<Effect> {
    parse_shadows(raw, ShadowKind::Text, colors)
        .iter()
        .rev()
        .map(Shadow::to_effect)
        .collect()
}
