//! Style normalization.
//!
//! Pure functions turning computed style strings into structured values.
//! None of them fail: unparseable input yields `None` or an empty list.

pub mod box_model;
pub mod color;
pub mod filter;
pub mod gradient;
pub mod shadow;
pub mod transform;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::Position;

/// Immutable bundle of computed style values for one element.
///
/// Keys are kebab-case property names (`background-color`); values are the
/// browser-resolved strings. Snapshots are shared behind an `Arc` and never
/// mutated after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleSnapshot {
    values: BTreeMap<String, String>,
}

impl StyleSnapshot {
    /// Build a snapshot from property/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw value of a property, if present.
    #[must_use]
    pub fn get(&self, property: &str) -> Option<&str> {
        self.values.get(property).map(|v| v.trim())
    }

    /// Raw value of a property, or `""`.
    #[must_use]
    pub fn value(&self, property: &str) -> &str {
        self.get(property).unwrap_or("")
    }

    /// Whether a property equals `expected`.
    #[must_use]
    pub fn is(&self, property: &str, expected: &str) -> bool {
        self.value(property).eq_ignore_ascii_case(expected)
    }

    /// Pixel value of a length property; `0.0` when absent or not a length.
    #[must_use]
    pub fn px(&self, property: &str) -> f32 {
        parse_px(self.value(property)).unwrap_or(0.0)
    }

    /// Computed `position`.
    #[must_use]
    pub fn position(&self) -> Position {
        Position::from_css(self.value("position"))
    }

    /// Computed `display`, `inline` when absent.
    #[must_use]
    pub fn display(&self) -> &str {
        self.get("display").unwrap_or("inline")
    }

    /// Computed `opacity`, `1.0` when absent.
    #[must_use]
    pub fn opacity(&self) -> f32 {
        self.get("opacity")
            .and_then(|v| v.parse::<f32>().ok())
            .map_or(1.0, |o| o.clamp(0.0, 1.0))
    }

    /// Resolved integer `z-index`; `None` for `auto`.
    #[must_use]
    pub fn z_index(&self) -> Option<i32> {
        self.get("z-index").and_then(|v| v.parse().ok())
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the snapshot holds no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parse a pixel length (`12px`, `12`, `-3.5px`).
#[must_use]
pub fn parse_px(value: &str) -> Option<f32> {
    let v = value.trim();
    let number = v.strip_suffix("px").unwrap_or(v);
    number.trim().parse::<f32>().ok().filter(|n| n.is_finite())
}

/// A length that may be relative to a reference size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    /// Absolute pixels.
    Px(f32),
    /// Percentage (0–100).
    Percent(f32),
}

impl Length {
    /// Parse `12px`, `50%` or a bare number.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let v = value.trim();
        if let Some(p) = v.strip_suffix('%') {
            return p.trim().parse::<f32>().ok().map(Self::Percent);
        }
        parse_px(v).map(Self::Px)
    }

    /// Resolve against a reference length.
    #[must_use]
    pub fn resolve(self, reference: f32) -> f32 {
        match self {
            Self::Px(px) => px,
            Self::Percent(p) => reference * p / 100.0,
        }
    }
}

/// Parse a CSS angle into degrees (`deg`, `rad`, `grad`, `turn`, bare `0`).
#[must_use]
pub fn parse_angle(value: &str) -> Option<f32> {
    let v = value.trim();
    let parse = |s: &str| s.trim().parse::<f32>().ok();
    if let Some(n) = v.strip_suffix("deg") {
        parse(n)
    } else if let Some(n) = v.strip_suffix("grad") {
        parse(n).map(|g| g * 0.9)
    } else if let Some(n) = v.strip_suffix("rad") {
        parse(n).map(f32::to_degrees)
    } else if let Some(n) = v.strip_suffix("turn") {
        parse(n).map(|t| t * 360.0)
    } else if v == "0" {
        Some(0.0)
    } else {
        None
    }
}

/// Split on `separator` at parenthesis depth zero.
///
/// Empty segments are dropped and every segment is trimmed.
#[must_use]
pub fn split_top_level(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_i32;
    let mut start = 0;
    for (i, ch) in input.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = (depth - 1).max(0),
            c if c == separator && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Split on runs of whitespace at parenthesis depth zero.
#[must_use]
pub fn split_top_level_whitespace(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_i32;
    let mut start: Option<usize> = None;
    for (i, ch) in input.char_indices() {
        match ch {
            '(' => {
                depth += 1;
                start.get_or_insert(i);
            }
            ')' => {
                depth = (depth - 1).max(0);
                start.get_or_insert(i);
            }
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    parts.push(&input[s..i]);
                }
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }
    if let Some(s) = start {
        parts.push(&input[s..]);
    }
    parts
}

/// Split a function call `name(args)` into its name and argument string.
#[must_use]
pub fn split_function(token: &str) -> Option<(&str, &str)> {
    let token = token.trim();
    let open = token.find('(')?;
    let inner = token[open + 1..].strip_suffix(')')?;
    Some((token[..open].trim(), inner))
}
