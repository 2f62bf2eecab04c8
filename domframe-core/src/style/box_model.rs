//! Border, padding and corner-radius extraction.

use serde::{Deserialize, Serialize};

use super::color::{Color, ColorParser};
use super::{Length, StyleSnapshot};
use crate::geometry::{Sides, Size};
use crate::paint::{Stroke, StrokeAlign};

const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];

/// Corner radii in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CornerRadii {
    /// Top-left.
    pub top_left: f32,
    /// Top-right.
    pub top_right: f32,
    /// Bottom-right.
    pub bottom_right: f32,
    /// Bottom-left.
    pub bottom_left: f32,
}

impl CornerRadii {
    /// Whether every corner is square.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.top_left <= 0.0
            && self.top_right <= 0.0
            && self.bottom_right <= 0.0
            && self.bottom_left <= 0.0
    }

    /// Whether all four corners match.
    #[must_use]
    pub fn is_uniform(&self) -> bool {
        self.top_left == self.top_right
            && self.top_left == self.bottom_right
            && self.top_left == self.bottom_left
    }
}

/// Border line style of one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderStyle {
    /// `none` / `hidden`.
    #[default]
    None,
    /// `solid` and the 3D styles approximated as solid.
    Solid,
    /// `dashed`.
    Dashed,
    /// `dotted`.
    Dotted,
}

impl BorderStyle {
    /// Parse a computed `border-*-style`.
    #[must_use]
    pub fn from_css(value: &str) -> Self {
        match value.trim() {
            "" | "none" | "hidden" => Self::None,
            "dashed" => Self::Dashed,
            "dotted" => Self::Dotted,
            _ => Self::Solid,
        }
    }

    fn dash_pattern(self, weight: f32) -> Vec<f32> {
        match self {
            Self::Dashed => vec![weight * 3.0, weight * 3.0],
            Self::Dotted => vec![weight, weight],
            Self::None | Self::Solid => Vec::new(),
        }
    }
}

/// One border side.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BorderSide {
    /// Width in pixels.
    pub width: f32,
    /// Line style.
    pub style: BorderStyle,
    /// Color, `None` when unparseable.
    pub color: Option<Color>,
}

impl BorderSide {
    /// Whether this side paints anything.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.width > 0.0
            && self.style != BorderStyle::None
            && self.color.is_some_and(|c| !c.is_transparent())
    }
}

/// Box model of one element.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxModel {
    /// Borders in top/right/bottom/left order.
    pub borders: [BorderSide; 4],
    /// Padding.
    pub padding: Sides,
    /// Corner radii.
    pub radii: CornerRadii,
    /// Outline (drawn outside the border box).
    pub outline: BorderSide,
}

impl BoxModel {
    /// Read the box model from computed style.
    ///
    /// Percentage radii resolve against the border box; radii are clamped to
    /// half the shorter side.
    pub fn from_style(style: &StyleSnapshot, size: Size, colors: &mut ColorParser<'_>) -> Self {
        let borders = SIDES.map(|side| {
            let style_value = BorderStyle::from_css(style.value(&format!("border-{side}-style")));
            BorderSide {
                width: if style_value == BorderStyle::None {
                    0.0
                } else {
                    style.px(&format!("border-{side}-width")).max(0.0)
                },
                style: style_value,
                color: colors.parse(style.value(&format!("border-{side}-color"))),
            }
        });

        let padding = Sides {
            top: style.px("padding-top").max(0.0),
            right: style.px("padding-right").max(0.0),
            bottom: style.px("padding-bottom").max(0.0),
            left: style.px("padding-left").max(0.0),
        };

        let limit = size.width.min(size.height) / 2.0;
        let radius = |property: &str| -> f32 {
            let first = style.value(property).split_whitespace().next().unwrap_or("");
            Length::parse(first)
                .map_or(0.0, |l| l.resolve(size.width.min(size.height)))
                .clamp(0.0, limit.max(0.0))
        };
        let radii = CornerRadii {
            top_left: radius("border-top-left-radius"),
            top_right: radius("border-top-right-radius"),
            bottom_right: radius("border-bottom-right-radius"),
            bottom_left: radius("border-bottom-left-radius"),
        };

        let outline_style = BorderStyle::from_css(style.value("outline-style"));
        let outline = BorderSide {
            width: if outline_style == BorderStyle::None {
                0.0
            } else {
                style.px("outline-width").max(0.0)
            },
            style: outline_style,
            color: colors.parse(style.value("outline-color")),
        };

        Self {
            borders,
            padding,
            radii,
            outline,
        }
    }

    /// Border widths counted for box-sizing (visible or not, styled sides only).
    #[must_use]
    pub fn border_widths(&self) -> Sides {
        Sides {
            top: self.borders[0].width,
            right: self.borders[1].width,
            bottom: self.borders[2].width,
            left: self.borders[3].width,
        }
    }

    /// Whether any border side paints.
    #[must_use]
    pub fn has_visible_border(&self) -> bool {
        self.borders.iter().any(BorderSide::is_visible)
    }

    /// Strokes for the border and outline.
    ///
    /// Visible sides sharing one color produce a single stroke; when their
    /// widths differ the per-side weights are attached. Sides with distinct
    /// colors produce one stroke per color, each carrying only its sides.
    #[must_use]
    pub fn strokes(&self) -> Vec<Stroke> {
        let mut strokes: Vec<Stroke> = Vec::new();
        let visible: Vec<(usize, &BorderSide)> = self
            .borders
            .iter()
            .enumerate()
            .filter(|(_, side)| side.is_visible())
            .collect();

        let mut groups: Vec<(Color, BorderStyle, [f32; 4])> = Vec::new();
        for (index, side) in visible {
            let Some(color) = side.color else { continue };
            if let Some(group) = groups.iter_mut().find(|(c, _, _)| *c == color) {
                group.2[index] = side.width;
            } else {
                let mut weights = [0.0; 4];
                weights[index] = side.width;
                groups.push((color, side.style, weights));
            }
        }

        for (color, style, weights) in groups {
            let sides = Sides {
                top: weights[0],
                right: weights[1],
                bottom: weights[2],
                left: weights[3],
            };
            let weight = weights.iter().copied().fold(0.0_f32, f32::max);
            let all_equal = weights.iter().all(|w| (*w - weight).abs() < f32::EPSILON);
            strokes.push(Stroke {
                color,
                weight,
                align: StrokeAlign::Inside,
                dash_pattern: style.dash_pattern(weight),
                side_weights: (!all_equal).then_some(sides),
            });
        }

        if self.outline.is_visible() {
            if let Some(color) = self.outline.color {
                strokes.push(Stroke {
                    color,
                    weight: self.outline.width,
                    align: StrokeAlign::Outside,
                    dash_pattern: self.outline.style.dash_pattern(self.outline.width),
                    side_weights: None,
                });
            }
        }
        strokes
    }
}

/// Whether the element paints a visible box of its own: background color or
/// image, border, shadow, rounded corners or padding.
pub fn has_visible_box(style: &StyleSnapshot, model: &BoxModel, colors: &mut ColorParser<'_>) -> bool {
    let background = colors
        .parse(style.value("background-color"))
        .is_some_and(|c| !c.is_transparent());
    let image = style
        .get("background-image")
        .is_some_and(|v| !v.is_empty() && v != "none");
    let shadow = style
        .get("box-shadow")
        .is_some_and(|v| !v.is_empty() && v != "none");
    background
        || image
        || shadow
        || model.has_visible_border()
        || !model.radii.is_zero()
        || !model.padding.is_zero()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bordered(width: &str, color: &str) -> StyleSnapshot {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for side in SIDES {
            pairs.push((format!("border-{side}-width"), width.to_string()));
            pairs.push((format!("border-{side}-style"), "solid".to_string()));
            pairs.push((format!("border-{side}-color"), color.to_string()));
        }
        StyleSnapshot::from_pairs(pairs)
    }

    #[test]
    fn test_uniform_border_is_one_stroke() {
        let mut colors = ColorParser::new();
        let model = BoxModel::from_style(&bordered("2px", "red"), Size::new(100.0, 50.0), &mut colors);
        let strokes = model.strokes();
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].weight, 2.0);
        assert_eq!(strokes[0].side_weights, None);
        assert_eq!(model.border_widths(), Sides::uniform(2.0));
    }

    #[test]
    fn test_bottom_border_only_keeps_side_weights() {
        let mut colors = ColorParser::new();
        let style = StyleSnapshot::from_pairs([
            ("border-bottom-width", "1px"),
            ("border-bottom-style", "dashed"),
            ("border-bottom-color", "rgb(0, 0, 0)"),
            ("border-top-width", "3px"),
            ("border-top-style", "none"),
        ]);
        let model = BoxModel::from_style(&style, Size::new(10.0, 10.0), &mut colors);
        assert_eq!(model.border_widths().top, 0.0);
        let strokes = model.strokes();
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].dash_pattern, vec![3.0, 3.0]);
        let sides = strokes[0].side_weights.expect("per-side weights");
        assert_eq!(sides.bottom, 1.0);
        assert_eq!(sides.top, 0.0);
    }

    #[test]
    fn test_radii_resolve_and_clamp() {
        let mut colors = ColorParser::new();
        let style = StyleSnapshot::from_pairs([
            ("border-top-left-radius", "50%"),
            ("border-top-right-radius", "999px"),
            ("border-bottom-right-radius", "4px 8px"),
        ]);
        let model = BoxModel::from_style(&style, Size::new(40.0, 20.0), &mut colors);
        assert_eq!(model.radii.top_left, 10.0);
        assert_eq!(model.radii.top_right, 10.0);
        assert_eq!(model.radii.bottom_right, 4.0);
        assert_eq!(model.radii.bottom_left, 0.0);
    }

    #[test]
    fn test_visible_box_detection() {
        let mut colors = ColorParser::new();
        let plain = StyleSnapshot::from_pairs([("background-color", "rgba(0, 0, 0, 0)")]);
        let model = BoxModel::from_style(&plain, Size::new(10.0, 10.0), &mut colors);
        assert!(!has_visible_box(&plain, &model, &mut colors));

        let padded = StyleSnapshot::from_pairs([("padding-left", "8px")]);
        let model = BoxModel::from_style(&padded, Size::new(10.0, 10.0), &mut colors);
        assert!(has_visible_box(&padded, &model, &mut colors));
    }

    #[test]
    fn test_outline_is_outside_stroke() {
        let mut colors = ColorParser::new();
        let style = StyleSnapshot::from_pairs([
            ("outline-style", "solid"),
            ("outline-width", "2px"),
            ("outline-color", "blue"),
        ]);
        let strokes = BoxModel::from_style(&style, Size::new(10.0, 10.0), &mut colors).strokes();
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].align, StrokeAlign::Outside);
    }
}
