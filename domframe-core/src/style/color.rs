//! Color parsing.
//!
//! Parsing order: `transparent`, `rgb()`/`rgba()` (legacy comma and modern
//! space/slash syntax), hex (`#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`), then a
//! chain of [`ColorNormalizer`] fallbacks for named and modern color spaces
//! whose output is re-parsed as a literal.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::split_top_level;

/// An RGBA color with every channel in `[0, 1]`.
///
/// `None` from the parser means "unparseable"; a fully transparent color is
/// `Some(Color { a: 0.0, .. })`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);

    /// Create a color from unit channels.
    #[must_use]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from 8-bit channels and unit alpha.
    #[must_use]
    pub fn from_rgb8(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self {
            r: f32::from(r) / 255.0,
            g: f32::from(g) / 255.0,
            b: f32::from(b) / 255.0,
            a: a.clamp(0.0, 1.0),
        }
    }

    /// Whether alpha is zero.
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }

    /// Same color with alpha scaled by `factor`.
    #[must_use]
    pub fn multiply_alpha(self, factor: f32) -> Self {
        Self {
            a: (self.a * factor).clamp(0.0, 1.0),
            ..self
        }
    }

    /// Canonical CSS serialization, `rgba(r, g, b, a)` with 8-bit channels.
    ///
    /// Parsing the output yields the same color within 1/255.
    #[must_use]
    pub fn to_css(&self) -> String {
        let [r, g, b] = self.rgb8();
        let alpha = (self.a * 1000.0).round() / 1000.0;
        format!("rgba({r}, {g}, {b}, {alpha})")
    }

    /// `#rrggbb`, or `#rrggbbaa` when not opaque.
    #[must_use]
    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.rgb8();
        if self.a >= 1.0 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            let a = unit_to_u8(self.a);
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }

    fn rgb8(&self) -> [u8; 3] {
        [unit_to_u8(self.r), unit_to_u8(self.g), unit_to_u8(self.b)]
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Converts a color string the literal parser does not understand into one
/// it does (typically `rgb()`/`rgba()`).
///
/// Browser hosts implement this with a canvas `fillStyle` round-trip.
pub trait ColorNormalizer {
    /// Normalize `raw`, or `None` when it is not a color.
    fn normalize(&self, raw: &str) -> Option<String>;
}

/// Fallback normalizer backed by `csscolorparser` (named colors, `hsl()`,
/// `hwb()`, `lab()`, `lch()`, `oklab()`, `oklch()`).
#[derive(Debug, Clone, Copy, Default)]
pub struct CssColorNormalizer;

impl ColorNormalizer for CssColorNormalizer {
    fn normalize(&self, raw: &str) -> Option<String> {
        let parsed: csscolorparser::Color = raw.parse().ok()?;
        let [r, g, b, a] = parsed.to_rgba8();
        Some(format!("rgba({r}, {g}, {b}, {})", f32::from(a) / 255.0))
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorCacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to parse.
    pub misses: u64,
    /// Parses that needed a normalizer fallback.
    pub fallbacks: u64,
}

/// Run-scoped color parser with a memo cache keyed by the raw string.
pub struct ColorParser<'a> {
    cache: HashMap<String, Option<Color>>,
    normalizers: Vec<Box<dyn ColorNormalizer + 'a>>,
    stats: ColorCacheStats,
}

impl Default for ColorParser<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ColorParser<'a> {
    /// Parser with only the built-in [`CssColorNormalizer`] fallback.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
            normalizers: vec![Box::new(CssColorNormalizer)],
            stats: ColorCacheStats::default(),
        }
    }

    /// Parser that consults `primary` before the built-in fallback.
    #[must_use]
    pub fn with_normalizer(primary: impl ColorNormalizer + 'a) -> Self {
        let mut parser = Self::new();
        parser.normalizers.insert(0, Box::new(primary));
        parser
    }

    /// Parse a CSS color.
    pub fn parse(&mut self, raw: &str) -> Option<Color> {
        let key = raw.trim();
        if key.is_empty() {
            return None;
        }
        if let Some(hit) = self.cache.get(key) {
            self.stats.hits += 1;
            return *hit;
        }
        self.stats.misses += 1;

        let parsed = parse_color_literal(key).or_else(|| {
            self.stats.fallbacks += 1;
            self.normalizers.iter().find_map(|n| {
                n.normalize(key)
                    .filter(|normalized| normalized.trim() != key)
                    .and_then(|normalized| parse_color_literal(&normalized))
            })
        });

        if parsed.is_none() {
            tracing::debug!(color = key, "unparseable color");
        }
        self.cache.insert(key.to_string(), parsed);
        parsed
    }

    /// Cache statistics.
    #[must_use]
    pub fn stats(&self) -> ColorCacheStats {
        self.stats
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Parse `transparent`, `rgb()`/`rgba()` and hex forms without any fallback.
#[must_use]
pub fn parse_color_literal(raw: &str) -> Option<Color> {
    let value = raw.trim().to_ascii_lowercase();
    if value == "transparent" {
        return Some(Color::TRANSPARENT);
    }
    if let Some(inner) = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))
    {
        return parse_rgb_args(inner.strip_suffix(')')?);
    }
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }
    None
}

fn parse_rgb_args(args: &str) -> Option<Color> {
    let (channels, alpha): (Vec<&str>, Option<&str>) = if args.contains(',') {
        let parts = split_top_level(args, ',');
        match parts.len() {
            3 => (parts, None),
            4 => (parts[..3].to_vec(), Some(parts[3])),
            _ => return None,
        }
    } else {
        let mut halves = args.splitn(2, '/');
        let channels: Vec<&str> = halves.next()?.split_whitespace().collect();
        let alpha = halves.next().map(str::trim);
        (channels, alpha)
    };

    if channels.len() != 3 {
        return None;
    }
    let r = parse_channel(channels[0])?;
    let g = parse_channel(channels[1])?;
    let b = parse_channel(channels[2])?;
    let a = match alpha {
        Some(a) => parse_alpha(a)?,
        None => 1.0,
    };
    Some(Color::rgba(r, g, b, a))
}

fn parse_channel(token: &str) -> Option<f32> {
    let token = token.trim();
    if token == "none" {
        return Some(0.0);
    }
    let value = if let Some(pct) = token.strip_suffix('%') {
        pct.trim().parse::<f32>().ok()? / 100.0
    } else {
        token.parse::<f32>().ok()? / 255.0
    };
    value.is_finite().then(|| value.clamp(0.0, 1.0))
}

fn parse_alpha(token: &str) -> Option<f32> {
    let token = token.trim();
    if token == "none" {
        return Some(0.0);
    }
    let value = if let Some(pct) = token.strip_suffix('%') {
        pct.trim().parse::<f32>().ok()? / 100.0
    } else {
        token.parse::<f32>().ok()?
    };
    value.is_finite().then(|| value.clamp(0.0, 1.0))
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let digit = |i: usize| u8::from_str_radix(&hex[i..=i].repeat(2), 16).ok();
    let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let (r, g, b, a) = match hex.len() {
        3 => (digit(0)?, digit(1)?, digit(2)?, 255),
        4 => (digit(0)?, digit(1)?, digit(2)?, digit(3)?),
        6 => (pair(0)?, pair(2)?, pair(4)?, 255),
        8 => (pair(0)?, pair(2)?, pair(4)?, pair(6)?),
        _ => return None,
    };
    Some(Color::from_rgb8(r, g, b, f32::from(a) / 255.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: Color, b: Color) -> bool {
        let tol = 1.0 / 255.0 + f32::EPSILON;
        (a.r - b.r).abs() <= tol
            && (a.g - b.g).abs() <= tol
            && (a.b - b.b).abs() <= tol
            && (a.a - b.a).abs() <= tol
    }

    #[test]
    fn test_transparent_is_distinct_from_unparseable() {
        assert_eq!(parse_color_literal("transparent"), Some(Color::TRANSPARENT));
        assert_eq!(parse_color_literal("not-a-color"), None);
    }

    #[test]
    fn test_legacy_and_modern_rgb() {
        let legacy = parse_color_literal("rgba(255, 0, 0, 0.5)").expect("legacy");
        let modern = parse_color_literal("rgb(255 0 0 / 50%)").expect("modern");
        assert!(close(legacy, modern));
        assert_eq!(legacy.a, 0.5);

        let pct = parse_color_literal("rgb(100%, 50%, 0%)").expect("percent");
        assert!((pct.g - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_hex_forms() {
        let short = parse_color_literal("#f00").expect("short");
        let long = parse_color_literal("#ff0000").expect("long");
        assert_eq!(short, long);
        let with_alpha = parse_color_literal("#ff000080").expect("alpha");
        assert!((with_alpha.a - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(parse_color_literal("#f008"), parse_color_literal("#ff000088"));
        assert_eq!(parse_color_literal("#12345"), None);
        assert_eq!(parse_color_literal("#gggggg"), None);
    }

    #[test]
    fn test_named_and_modern_colors_use_fallback() {
        let mut parser = ColorParser::new();
        let red = parser.parse("red").expect("named");
        assert_eq!(red, Color::rgba(1.0, 0.0, 0.0, 1.0));
        let hsl = parser.parse("hsl(120, 100%, 50%)").expect("hsl");
        assert!(close(hsl, Color::rgba(0.0, 1.0, 0.0, 1.0)));
        assert_eq!(parser.stats().fallbacks, 2);
    }

    #[test]
    fn test_cache_hits() {
        let mut parser = ColorParser::new();
        parser.parse("#000");
        parser.parse("#000");
        parser.parse("garbage");
        parser.parse("garbage");
        let stats = parser.stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, 2);
        assert_eq!(parser.len(), 2);
    }

    struct FixedNormalizer;

    impl ColorNormalizer for FixedNormalizer {
        fn normalize(&self, raw: &str) -> Option<String> {
            (raw == "brand").then(|| "rgb(1, 2, 3)".to_string())
        }
    }

    #[test]
    fn test_primary_normalizer_consulted_first() {
        let mut parser = ColorParser::with_normalizer(FixedNormalizer);
        let c = parser.parse("brand").expect("normalized");
        assert_eq!(c, Color::from_rgb8(1, 2, 3, 1.0));
    }

    proptest! {
        #[test]
        fn prop_rgba_round_trips(r in 0u8..=255, g in 0u8..=255, b in 0u8..=255, a in 0u8..=255) {
            let alpha = f32::from(a) / 255.0;
            let input = format!("rgba({r}, {g}, {b}, {alpha})");
            let expected = Color::from_rgb8(r, g, b, alpha);
            let parsed = parse_color_literal(&input).expect("valid rgba");
            prop_assert!(close(parsed, expected));

            let again = parse_color_literal(&parsed.to_css()).expect("canonical");
            prop_assert!(close(again, parsed));
            let twice = parse_color_literal(&again.to_css()).expect("canonical");
            prop_assert_eq!(twice, again);
        }

        #[test]
        fn prop_hex_round_trips(r in 0u8..=255, g in 0u8..=255, b in 0u8..=255) {
            let input = format!("#{r:02x}{g:02x}{b:02x}");
            let parsed = parse_color_literal(&input).expect("valid hex");
            prop_assert_eq!(parsed.to_hex(), input);
            let again = parse_color_literal(&parsed.to_css()).expect("canonical");
            prop_assert!(close(again, parsed));
        }
    }
}
