//! Gradient parsing.
//!
//! `linear-gradient` is fully modelled (direction, stops, transform).
//! `radial-gradient` only keeps its stops; shape, size and position are not
//! modelled and the transform is the identity.

use serde::{Deserialize, Serialize};

use super::color::{Color, ColorParser};
use super::transform::Affine;
use super::{parse_angle, split_function, split_top_level, split_top_level_whitespace, Length};
use crate::geometry::Size;

/// Default CSS angle for a linear gradient without a direction (`to bottom`).
pub const DEFAULT_LINEAR_ANGLE: f32 = 180.0;

/// Gradient geometry family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GradientKind {
    /// `linear-gradient`.
    Linear,
    /// `radial-gradient` (stops only).
    Radial,
}

/// A color stop with its position along the gradient line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Position in `[0, 1]`.
    pub position: f32,
    /// Stop color.
    pub color: Color,
}

/// A parsed gradient layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gradient {
    /// Linear or radial.
    pub kind: GradientKind,
    /// CSS angle in degrees (0° = up); `None` for radial gradients.
    pub angle: Option<f32>,
    /// Whether the source was a `repeating-*` gradient.
    pub repeating: bool,
    /// Ordered stops.
    pub stops: Vec<GradientStop>,
    /// Gradient transform (rotation about the box centre for linear).
    pub transform: Affine,
}

/// Parse every gradient layer of a `background-image` value.
///
/// Non-gradient layers (`url(...)`, `none`) are skipped. A gradient with any
/// unparseable stop color is dropped entirely. Layers are returned in CSS
/// order (topmost first).
pub fn parse_gradients(raw: &str, size: Size, colors: &mut ColorParser<'_>) -> Vec<Gradient> {
    split_top_level(raw, ',')
        .into_iter()
        .filter_map(|layer| parse_gradient(layer, size, colors))
        .collect()
}

/// Parse a single gradient function.
pub fn parse_gradient(layer: &str, size: Size, colors: &mut ColorParser<'_>) -> Option<Gradient> {
    let (name, args) = split_function(layer)?;
    let name = name.to_ascii_lowercase();
    let repeating = name.starts_with("repeating-");
    match name.trim_start_matches("repeating-") {
        "linear-gradient" => parse_linear(args, size, repeating, colors),
        "radial-gradient" => parse_radial(args, repeating, colors),
        _ => None,
    }
}

fn parse_linear(
    args: &str,
    size: Size,
    repeating: bool,
    colors: &mut ColorParser<'_>,
) -> Option<Gradient> {
    let parts = split_top_level(args, ',');
    let first = *parts.first()?;

    let (angle, stop_parts) = if let Some(direction) = first.strip_prefix("to ") {
        (direction_angle(direction, size)?, &parts[1..])
    } else if let Some(angle) = parse_angle(first) {
        (angle, &parts[1..])
    } else {
        (DEFAULT_LINEAR_ANGLE, &parts[..])
    };

    let line_length = gradient_line_length(angle, size);
    let stops = parse_stops(stop_parts, line_length, colors)?;
    Some(Gradient {
        kind: GradientKind::Linear,
        angle: Some(angle),
        repeating,
        stops,
        transform: linear_transform(angle),
    })
}

fn parse_radial(args: &str, repeating: bool, colors: &mut ColorParser<'_>) -> Option<Gradient> {
    let parts = split_top_level(args, ',');
    let first = *parts.first()?;
    let first_is_stop = split_top_level_whitespace(first)
        .first()
        .is_some_and(|token| colors.parse(token).is_some());
    let stop_parts = if first_is_stop { &parts[..] } else { &parts[1..] };
    let stops = parse_stops(stop_parts, 0.0, colors)?;
    Some(Gradient {
        kind: GradientKind::Radial,
        angle: None,
        repeating,
        stops,
        transform: Affine::IDENTITY,
    })
}

/// Resolve a `to <side-or-corner>` direction into a CSS angle.
fn direction_angle(direction: &str, size: Size) -> Option<f32> {
    let mut words: Vec<&str> = direction.split_whitespace().collect();
    words.sort_unstable();
    let corner = if size.width > 0.0 && size.height > 0.0 {
        size.height.atan2(size.width).to_degrees()
    } else {
        45.0
    };
    let angle = match words.as_slice() {
        ["top"] => 0.0,
        ["right"] => 90.0,
        ["bottom"] => 180.0,
        ["left"] => 270.0,
        ["right", "top"] => corner,
        ["bottom", "right"] => 180.0 - corner,
        ["bottom", "left"] => 180.0 + corner,
        ["left", "top"] => 360.0 - corner,
        _ => return None,
    };
    Some(angle)
}

/// Length of the gradient line for a box and CSS angle.
#[must_use]
pub fn gradient_line_length(angle: f32, size: Size) -> f32 {
    let rad = angle.to_radians();
    (size.width * rad.sin()).abs() + (size.height * rad.cos()).abs()
}

/// Rotation by `angle - 90°` about the unit box centre.
///
/// CSS measures angles from "up"; the design-tool convention is 0° =
/// left-to-right, hence the fixed −90° offset.
#[must_use]
pub fn linear_transform(angle: f32) -> Affine {
    let theta = (angle - 90.0).to_radians();
    let (sin, cos) = theta.sin_cos();
    Affine([
        [cos, -sin, 0.5 - 0.5 * cos + 0.5 * sin],
        [sin, cos, 0.5 - 0.5 * sin - 0.5 * cos],
    ])
}

fn parse_stops(
    parts: &[&str],
    line_length: f32,
    colors: &mut ColorParser<'_>,
) -> Option<Vec<GradientStop>> {
    let mut raw: Vec<(Color, Option<f32>)> = Vec::new();
    for part in parts {
        let tokens = split_top_level_whitespace(part);
        let Some((color_token, positions)) = tokens.split_first() else {
            continue;
        };
        let Some(color) = colors.parse(color_token) else {
            // A bare length is an interpolation hint, not a stop.
            if Length::parse(color_token).is_some() && positions.is_empty() {
                continue;
            }
            return None;
        };
        let resolve = |token: &str| -> Option<f32> {
            match Length::parse(token)? {
                Length::Percent(p) => Some(p / 100.0),
                Length::Px(px) if line_length > 0.0 => Some(px / line_length),
                Length::Px(_) => None,
            }
        };
        if positions.is_empty() {
            raw.push((color, None));
        }
        for token in positions {
            raw.push((color, resolve(token)));
        }
    }
    if raw.is_empty() {
        return None;
    }

    let positions = interpolate_positions(&raw.iter().map(|(_, p)| *p).collect::<Vec<_>>());
    Some(
        raw.into_iter()
            .zip(positions)
            .map(|((color, _), position)| GradientStop { position, color })
            .collect(),
    )
}

/// Fill in missing stop positions.
///
/// Unanchored first/last stops become 0 and 1; anchored positions are made
/// non-decreasing; runs of missing positions are spaced evenly between their
/// anchored neighbours. Results are clamped to `[0, 1]`.
#[must_use]
pub fn interpolate_positions(positions: &[Option<f32>]) -> Vec<f32> {
    let n = positions.len();
    if n == 0 {
        return Vec::new();
    }
    let mut anchored: Vec<Option<f32>> = positions.to_vec();
    if anchored[0].is_none() {
        anchored[0] = Some(0.0);
    }
    if n > 1 && anchored[n - 1].is_none() {
        anchored[n - 1] = Some(1.0);
    }

    let mut running_max = f32::NEG_INFINITY;
    for slot in &mut anchored {
        if let Some(p) = slot {
            *p = p.max(running_max);
            running_max = *p;
        }
    }

    let mut out = vec![0.0; n];
    let mut last_anchor = 0;
    out[0] = anchored[0].unwrap_or(0.0);
    for i in 1..n {
        if let Some(p) = anchored[i] {
            let start = out[last_anchor];
            #[allow(clippy::cast_precision_loss)]
            let span = (i - last_anchor) as f32;
            for (step, slot) in out.iter_mut().enumerate().take(i).skip(last_anchor + 1) {
                #[allow(clippy::cast_precision_loss)]
                let k = (step - last_anchor) as f32;
                *slot = start + (p - start) * k / span;
            }
            out[i] = p;
            last_anchor = i;
        }
    }
    out.into_iter().map(|p| p.clamp(0.0, 1.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn size() -> Size {
        Size::new(200.0, 100.0)
    }

    #[test]
    fn test_unset_stops_are_evenly_spaced() {
        let out = interpolate_positions(&[Some(0.0), None, None, Some(1.0)]);
        assert!((out[1] - 1.0 / 3.0).abs() < 1e-5);
        assert!((out[2] - 2.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_unanchored_ends_default_to_zero_and_one() {
        let out = interpolate_positions(&[None, None, None]);
        assert_eq!(out, vec![0.0, 0.5, 1.0]);
        let out = interpolate_positions(&[None, Some(0.8), None]);
        assert_eq!(out, vec![0.0, 0.8, 1.0]);
    }

    #[test]
    fn test_decreasing_positions_are_clamped() {
        let out = interpolate_positions(&[Some(0.5), Some(0.2), Some(1.0)]);
        assert_eq!(out, vec![0.5, 0.5, 1.0]);
    }

    #[test]
    fn test_linear_default_direction() {
        let mut colors = ColorParser::new();
        let g = parse_gradient("linear-gradient(red, blue)", size(), &mut colors).expect("gradient");
        assert_eq!(g.angle, Some(180.0));
        assert_eq!(g.stops.len(), 2);
        assert_eq!(g.stops[0].position, 0.0);
        assert_eq!(g.stops[1].position, 1.0);
    }

    #[test]
    fn test_linear_direction_keywords_and_angles() {
        let mut colors = ColorParser::new();
        let right = parse_gradient("linear-gradient(to right, red, blue)", size(), &mut colors)
            .expect("gradient");
        assert_eq!(right.angle, Some(90.0));
        assert_eq!(right.transform, Affine::IDENTITY);

        let turn = parse_gradient("linear-gradient(0.25turn, red, blue)", size(), &mut colors)
            .expect("gradient");
        assert_eq!(turn.angle, Some(90.0));

        let square = Size::new(100.0, 100.0);
        let corner = parse_gradient("linear-gradient(to top right, red, blue)", square, &mut colors)
            .expect("gradient");
        assert!((corner.angle.unwrap_or_default() - 45.0).abs() < 1e-4);
    }

    #[test]
    fn test_pixel_stop_positions_use_line_length() {
        let mut colors = ColorParser::new();
        let g = parse_gradient(
            "linear-gradient(90deg, rgb(0, 0, 0) 50px, rgb(255, 255, 255) 150px)",
            size(),
            &mut colors,
        )
        .expect("gradient");
        assert!((g.stops[0].position - 0.25).abs() < 1e-4);
        assert!((g.stops[1].position - 0.75).abs() < 1e-4);
    }

    #[test]
    fn test_nested_color_functions_and_layers() {
        let mut colors = ColorParser::new();
        let layers = parse_gradients(
            "linear-gradient(rgba(0, 0, 0, 0.5) 0%, rgba(0, 0, 0, 0) 100%), url(\"a.png\")",
            size(),
            &mut colors,
        );
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].stops[0].color.a, 0.5);
    }

    #[test]
    fn test_radial_keeps_stops_only() {
        let mut colors = ColorParser::new();
        let g = parse_gradient(
            "radial-gradient(circle at 30% 40%, #fff 10%, #000)",
            size(),
            &mut colors,
        )
        .expect("gradient");
        assert_eq!(g.kind, GradientKind::Radial);
        assert_eq!(g.stops.len(), 2);
        assert_eq!(g.stops[0].position, 0.1);
        assert_eq!(g.transform, Affine::IDENTITY);
    }

    #[test]
    fn test_bad_stop_color_drops_gradient() {
        let mut colors = ColorParser::new();
        assert!(parse_gradient("linear-gradient(red, notacolor)", size(), &mut colors).is_none());
    }

    proptest! {
        #[test]
        fn prop_interpolated_positions_are_monotonic(
            slots in prop::collection::vec(prop::option::of(0.0f32..=1.0), 1..12)
        ) {
            let out = interpolate_positions(&slots);
            prop_assert_eq!(out.len(), slots.len());
            for pair in out.windows(2) {
                prop_assert!(pair[0] <= pair[1] + 1e-6);
            }
        }
    }
}
