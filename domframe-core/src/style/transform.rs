//! CSS transform parsing.
//!
//! `matrix()` and `matrix3d()` are read directly (3D reduced to its 2D affine
//! sub-block); otherwise individual functions are composed left-to-right.

use serde::{Deserialize, Serialize};

use super::{parse_angle, split_function, split_top_level, split_top_level_whitespace, Length};
use crate::geometry::Size;

/// A 2×3 affine matrix `[[a, c, e], [b, d, f]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Affine(pub [[f32; 3]; 2]);

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    /// The identity transform.
    pub const IDENTITY: Self = Self([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);

    /// Build from CSS `matrix(a, b, c, d, e, f)` arguments.
    #[must_use]
    pub const fn from_css(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self([[a, c, e], [b, d, f]])
    }

    /// Translation.
    #[must_use]
    pub const fn translate(tx: f32, ty: f32) -> Self {
        Self([[1.0, 0.0, tx], [0.0, 1.0, ty]])
    }

    /// Scale.
    #[must_use]
    pub const fn scale(sx: f32, sy: f32) -> Self {
        Self([[sx, 0.0, 0.0], [0.0, sy, 0.0]])
    }

    /// Clockwise rotation (screen coordinates, y down) by `degrees`.
    #[must_use]
    pub fn rotate(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self([[cos, -sin, 0.0], [sin, cos, 0.0]])
    }

    /// Skew by the given angles in degrees.
    #[must_use]
    pub fn skew(ax: f32, ay: f32) -> Self {
        Self([
            [1.0, ax.to_radians().tan(), 0.0],
            [ay.to_radians().tan(), 1.0, 0.0],
        ])
    }

    /// `self × other` (apply `other` first, then `self`).
    #[must_use]
    pub fn multiply(&self, other: &Self) -> Self {
        let [[a1, c1, e1], [b1, d1, f1]] = self.0;
        let [[a2, c2, e2], [b2, d2, f2]] = other.0;
        Self([
            [a1 * a2 + c1 * b2, a1 * c2 + c1 * d2, a1 * e2 + c1 * f2 + e1],
            [b1 * a2 + d1 * b2, b1 * c2 + d1 * d2, b1 * e2 + d1 * f2 + f1],
        ])
    }

    /// Whether this is the identity within `1e-6`.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.0
            .iter()
            .flatten()
            .zip(Self::IDENTITY.0.iter().flatten())
            .all(|(a, b)| (a - b).abs() < 1e-6)
    }

    /// Rotation component in degrees.
    #[must_use]
    pub fn rotation_degrees(&self) -> f32 {
        self.0[1][0].atan2(self.0[0][0]).to_degrees()
    }
}

/// Transform origin as a fraction of the element's border box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformOrigin {
    /// Horizontal fraction (0 = left, 1 = right).
    pub x: f32,
    /// Vertical fraction (0 = top, 1 = bottom).
    pub y: f32,
}

impl Default for TransformOrigin {
    fn default() -> Self {
        Self { x: 0.5, y: 0.5 }
    }
}

/// Parse a `transform` value; `None` for `none`, identity or unparseable
/// input.
#[must_use]
pub fn parse_transform(raw: &str, size: Size) -> Option<Affine> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "none" {
        return None;
    }
    let mut result = Affine::IDENTITY;
    for token in split_top_level_whitespace(raw) {
        let (name, args) = split_function(token)?;
        let step = parse_function(&name.to_ascii_lowercase(), args, size)?;
        result = result.multiply(&step);
    }
    (!result.is_identity()).then_some(result)
}

fn numbers(args: &str) -> Option<Vec<f32>> {
    split_top_level(args, ',')
        .into_iter()
        .map(|a| a.parse::<f32>().ok())
        .collect()
}

fn lengths(args: &str, reference: [f32; 2]) -> Option<Vec<f32>> {
    split_top_level(args, ',')
        .into_iter()
        .enumerate()
        .map(|(i, a)| Length::parse(a).map(|l| l.resolve(reference[i.min(1)])))
        .collect()
}

fn angles(args: &str) -> Option<Vec<f32>> {
    split_top_level(args, ',').into_iter().map(parse_angle).collect()
}

fn parse_function(name: &str, args: &str, size: Size) -> Option<Affine> {
    let box_ref = [size.width, size.height];
    let m = match name {
        "matrix" => {
            let v = numbers(args)?;
            if v.len() != 6 {
                return None;
            }
            Affine::from_css(v[0], v[1], v[2], v[3], v[4], v[5])
        }
        "matrix3d" => {
            let v = numbers(args)?;
            if v.len() != 16 {
                return None;
            }
            Affine::from_css(v[0], v[1], v[4], v[5], v[12], v[13])
        }
        "translate" => {
            let v = lengths(args, box_ref)?;
            Affine::translate(*v.first()?, v.get(1).copied().unwrap_or(0.0))
        }
        "translatex" => Affine::translate(*lengths(args, box_ref)?.first()?, 0.0),
        "translatey" => {
            let v = lengths(args, [size.height, size.height])?;
            Affine::translate(0.0, *v.first()?)
        }
        "rotate" | "rotatez" => Affine::rotate(*angles(args)?.first()?),
        "scale" => {
            let v = numbers(args)?;
            let sx = *v.first()?;
            Affine::scale(sx, v.get(1).copied().unwrap_or(sx))
        }
        "scalex" => Affine::scale(*numbers(args)?.first()?, 1.0),
        "scaley" => Affine::scale(1.0, *numbers(args)?.first()?),
        "skew" => {
            let v = angles(args)?;
            Affine::skew(*v.first()?, v.get(1).copied().unwrap_or(0.0))
        }
        "skewx" => Affine::skew(*angles(args)?.first()?, 0.0),
        "skewy" => Affine::skew(0.0, *angles(args)?.first()?),
        _ => return None,
    };
    Some(m)
}

/// Parse `transform-origin` into box fractions.
///
/// Accepts keywords, percentages and pixel offsets; the default is the
/// centre. A zero-sized axis resolves pixel offsets to the centre.
#[must_use]
pub fn parse_transform_origin(raw: &str, size: Size) -> TransformOrigin {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.is_empty() {
        return TransformOrigin::default();
    }

    let mut horizontal: Option<f32> = None;
    let mut vertical: Option<f32> = None;
    let mut pending: Vec<f32> = Vec::new();

    for (i, token) in tokens.iter().take(2).enumerate() {
        let reference = if i == 0 { size.width } else { size.height };
        match *token {
            "left" => horizontal = Some(0.0),
            "right" => horizontal = Some(1.0),
            "top" => vertical = Some(0.0),
            "bottom" => vertical = Some(1.0),
            "center" => pending.push(0.5),
            other => match Length::parse(other) {
                Some(Length::Percent(p)) => pending.push(p / 100.0),
                Some(Length::Px(px)) if reference > 0.0 => pending.push(px / reference),
                _ => pending.push(0.5),
            },
        }
    }

    let mut pending = pending.into_iter();
    let x = horizontal.or_else(|| pending.next()).unwrap_or(0.5);
    let y = vertical.or_else(|| pending.next()).unwrap_or(0.5);
    TransformOrigin { x, y }
}
