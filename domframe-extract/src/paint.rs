//! Paint and typography for one element.
//!
//! Thin glue between the style normalizer and the run context: parse
//! results become fills, strokes and effects, image layers are registered
//! with the asset registry, and anything unparseable is logged as a warning.

use domframe_core::style::box_model::BoxModel;
use domframe_core::style::filter::{parse_blend_mode, parse_filter, BlendOutcome, FilterContext};
use domframe_core::style::gradient::parse_gradient;
use domframe_core::style::shadow::{box_shadow_effects, text_shadow_effects};
use domframe_core::style::{parse_px, split_function, split_top_level, Length};
use domframe_core::{Color, ColorParser, Fill, Paint, ScaleMode, Size, StyleSnapshot, Typography};

use crate::context::RunContext;

/// Fallback font size when none is computed.
const DEFAULT_FONT_SIZE: f32 = 16.0;

/// Build the paint of a box-generating element.
pub fn element_paint(ctx: &mut RunContext<'_>, style: &StyleSnapshot, model: &BoxModel, size: Size, location: &str) -> Paint {
    let mut paint = Paint {
        opacity: style.opacity(),
        ..Paint::default()
    };

    let background = style.value("background-color");
    match ctx.colors.parse(background) {
        Some(color) if !color.is_transparent() => paint.fills.push(Fill::Solid { color }),
        Some(_) => {}
        None if background.is_empty() => {}
        None => ctx
            .diagnostics
            .warn(location, format!("Unparseable background-color '{background}'")),
    }
    paint.fills.extend(background_layers(ctx, style, size, location));

    paint.strokes = model.strokes();
    paint.effects = box_shadow_effects(style.value("box-shadow"), &mut ctx.colors);
    apply_filters(&mut paint, style, &mut ctx.colors);
    paint
}

/// Fills for `background-image`, bottom to top.
fn background_layers(ctx: &mut RunContext<'_>, style: &StyleSnapshot, size: Size, location: &str) -> Vec<Fill> {
    let raw = style.value("background-image");
    if raw.is_empty() || raw == "none" {
        return Vec::new();
    }
    let scale_mode = ScaleMode::from_css(style.value("background-size"), style.value("background-repeat"));
    let mut fills = Vec::new();
    for layer in split_top_level(raw, ',') {
        if layer == "none" {
            continue;
        }
        if let Some(("url", args)) = split_function(layer) {
            let url = unquote(args);
            match ctx.assets.register_image(url) {
                Some(key) => fills.push(Fill::Image {
                    asset_key: key.to_string(),
                    scale_mode,
                }),
                None => ctx
                    .diagnostics
                    .warn(location, format!("Unusable background image URL '{url}'")),
            }
            continue;
        }
        match parse_gradient(layer, size, &mut ctx.colors) {
            Some(gradient) => fills.push(Fill::Gradient(gradient)),
            None => ctx
                .diagnostics
                .warn(location, format!("Unsupported background layer '{layer}'")),
        }
    }
    // CSS lists the top layer first.
    fills.reverse();
    fills
}

/// Apply `filter`, `backdrop-filter` and `mix-blend-mode`.
pub fn apply_filters(paint: &mut Paint, style: &StyleSnapshot, colors: &mut ColorParser<'_>) {
    for (property, context) in [
        ("filter", FilterContext::Foreground),
        ("backdrop-filter", FilterContext::Backdrop),
    ] {
        let outcome = parse_filter(style.value(property), context, colors);
        paint.effects.extend(outcome.effects);
        if context == FilterContext::Foreground {
            paint.adjustments = outcome.adjustments;
        }
        paint.rasterize.extend(outcome.rasterize);
    }
    match parse_blend_mode(style.value("mix-blend-mode")) {
        BlendOutcome::Mode(mode) => paint.blend_mode = mode,
        BlendOutcome::Rasterize(reason) => paint.rasterize.push(reason),
    }
}

/// Paint of a text node: only shadows, filters and opacity of the text
/// itself; the color lives in the typography.
pub fn text_paint(style: &StyleSnapshot, colors: &mut ColorParser<'_>) -> Paint {
    let mut paint = Paint {
        effects: text_shadow_effects(style.value("text-shadow"), colors),
        ..Paint::default()
    };
    apply_filters(&mut paint, style, colors);
    paint
}

/// Typography from computed font properties.
pub fn typography(style: &StyleSnapshot, colors: &mut ColorParser<'_>) -> Typography {
    let font_stack = style.value("font-family").to_string();
    let font_size = parse_px(style.value("font-size"))
        .filter(|s| *s > 0.0)
        .unwrap_or(DEFAULT_FONT_SIZE);
    Typography {
        font_family: primary_family(&font_stack),
        font_stack,
        font_weight: font_weight(style.value("font-weight")),
        font_size,
        line_height: line_height(style.value("line-height"), font_size),
        letter_spacing: parse_px(style.value("letter-spacing")).unwrap_or(0.0),
        italic: style.is("font-style", "italic") || style.value("font-style").starts_with("oblique"),
        text_align: match style.value("text-align") {
            "" => "start".to_string(),
            other => other.to_string(),
        },
        text_decoration: keyword_or_empty(
            style
                .get("text-decoration-line")
                .unwrap_or_else(|| style.value("text-decoration")),
        ),
        text_transform: keyword_or_empty(style.value("text-transform")),
        color: colors.parse(style.value("color")).unwrap_or(Color::BLACK),
    }
}

fn keyword_or_empty(value: &str) -> String {
    let first = value.split_whitespace().next().unwrap_or("");
    if first.is_empty() || first == "none" {
        String::new()
    } else {
        value.to_string()
    }
}

/// First family of a `font-family` stack, unquoted.
#[must_use]
pub fn primary_family(stack: &str) -> String {
    split_top_level(stack, ',')
        .first()
        .map(|f| unquote(f).to_string())
        .unwrap_or_default()
}

/// Numeric font weight.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn font_weight(value: &str) -> u16 {
    match value.trim() {
        "bold" | "bolder" => 700,
        "lighter" => 300,
        "" | "normal" => 400,
        other => other
            .parse::<f32>()
            .ok()
            .filter(|w| (1.0..=1000.0).contains(w))
            .map_or(400, |w| w.round() as u16),
    }
}

/// Line height in pixels; `None` for `normal`.
#[must_use]
pub fn line_height(value: &str, font_size: f32) -> Option<f32> {
    let value = value.trim();
    if value.is_empty() || value == "normal" {
        return None;
    }
    if let Ok(multiplier) = value.parse::<f32>() {
        return Some(multiplier * font_size);
    }
    Length::parse(value).map(|l| l.resolve(font_size))
}

/// Apply `white-space` collapsing to raw text.
#[must_use]
pub fn collapse_whitespace(text: &str, white_space: &str) -> String {
    match white_space.trim() {
        "pre" | "pre-wrap" | "break-spaces" => text.to_string(),
        "pre-line" => text
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string(),
        _ => text.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

fn unquote(value: &str) -> &str {
    let v = value.trim();
    v.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| v.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(v)
}
