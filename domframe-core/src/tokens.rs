//! Design tokens gathered during traversal.
//!
//! Colors, typography styles and spacing values are counted as nodes are
//! built and emitted most-used first.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::node::Typography;
use crate::paint::Paint;
use crate::style::color::Color;

/// A color token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorToken {
    /// Canonical hex (`#rrggbb` or `#rrggbbaa`).
    pub hex: String,
    /// The color.
    pub color: Color,
    /// Number of uses.
    pub usage: u64,
}

/// A typography token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypographyToken {
    /// Primary family.
    pub font_family: String,
    /// Weight.
    pub font_weight: u16,
    /// Size in pixels.
    pub font_size: f32,
    /// Line height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f32>,
    /// Number of uses.
    pub usage: u64,
}

/// A spacing token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacingToken {
    /// Value in pixels.
    pub value: f32,
    /// Number of uses.
    pub usage: u64,
}

/// Design tokens section of the document, each list sorted by usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignTokens {
    /// Color tokens.
    pub colors: Vec<ColorToken>,
    /// Typography tokens.
    pub typography: Vec<TypographyToken>,
    /// Spacing tokens.
    pub spacing: Vec<SpacingToken>,
}

impl DesignTokens {
    /// Keep at most the given number of each kind.
    pub fn truncate(&mut self, colors: usize, typography: usize, spacing: usize) -> usize {
        let before = self.colors.len() + self.typography.len() + self.spacing.len();
        self.colors.truncate(colors);
        self.typography.truncate(typography);
        self.spacing.truncate(spacing);
        before - (self.colors.len() + self.typography.len() + self.spacing.len())
    }
}

/// Spacing values are bucketed to tenths of a pixel.
fn spacing_key(value: f32) -> i64 {
    #[allow(clippy::cast_possible_truncation)]
    let key = (value * 10.0).round() as i64;
    key
}

/// Usage counter for one run.
#[derive(Debug, Default)]
pub struct TokenCollector {
    colors: HashMap<String, (Color, u64)>,
    typography: HashMap<String, (TypographyToken, u64)>,
    spacing: HashMap<i64, u64>,
}

impl TokenCollector {
    /// New empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one color use; fully transparent colors are ignored.
    pub fn observe_color(&mut self, color: Color) {
        if color.is_transparent() {
            return;
        }
        self.colors.entry(color.to_hex()).or_insert((color, 0)).1 += 1;
    }

    /// Count every color in a paint.
    pub fn observe_paint(&mut self, paint: &Paint) {
        for color in paint.colors() {
            self.observe_color(color);
        }
    }

    /// Count a text style and its color.
    pub fn observe_typography(&mut self, typography: &Typography) {
        self.observe_color(typography.color);
        let key = format!(
            "{}|{}|{}|{:?}",
            typography.font_family, typography.font_weight, typography.font_size, typography.line_height
        );
        self.typography
            .entry(key)
            .or_insert_with(|| {
                (
                    TypographyToken {
                        font_family: typography.font_family.clone(),
                        font_weight: typography.font_weight,
                        font_size: typography.font_size,
                        line_height: typography.line_height,
                        usage: 0,
                    },
                    0,
                )
            })
            .1 += 1;
    }

    /// Count a spacing value; zero and negative values are ignored.
    pub fn observe_spacing(&mut self, value: f32) {
        if value > 0.0 && value.is_finite() {
            *self.spacing.entry(spacing_key(value)).or_default() += 1;
        }
    }

    /// Tokens sorted by usage (descending), ties by value.
    #[must_use]
    pub fn finish(self) -> DesignTokens {
        let mut colors: Vec<ColorToken> = self
            .colors
            .into_iter()
            .map(|(hex, (color, usage))| ColorToken { hex, color, usage })
            .collect();
        colors.sort_by(|a, b| b.usage.cmp(&a.usage).then_with(|| a.hex.cmp(&b.hex)));

        let mut typography: Vec<TypographyToken> = self
            .typography
            .into_values()
            .map(|(token, usage)| TypographyToken { usage, ..token })
            .collect();
        typography.sort_by(|a, b| {
            b.usage
                .cmp(&a.usage)
                .then_with(|| b.font_size.total_cmp(&a.font_size))
                .then_with(|| a.font_family.cmp(&b.font_family))
                .then_with(|| a.font_weight.cmp(&b.font_weight))
        });

        #[allow(clippy::cast_precision_loss)]
        let mut spacing: Vec<SpacingToken> = self
            .spacing
            .into_iter()
            .map(|(key, usage)| SpacingToken {
                value: key as f32 / 10.0,
                usage,
            })
            .collect();
        spacing.sort_by(|a, b| b.usage.cmp(&a.usage).then_with(|| a.value.total_cmp(&b.value)));

        DesignTokens {
            colors,
            typography,
            spacing,
        }
    }
}
