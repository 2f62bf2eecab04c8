//! Intrinsic dimension probing.

use std::io::Cursor;

use domframe_core::Dimensions;
use image::ImageReader;

use crate::data_uri::ImageFormat;

/// Read pixel dimensions from encoded image bytes without decoding pixels.
///
/// SVG markup is measured from the root element's `width`/`height`, falling
/// back to its `viewBox`. Returns `None` for anything undecodable.
#[must_use]
pub fn decode_image_dimensions(bytes: &[u8]) -> Option<Dimensions> {
    if ImageFormat::from_magic_bytes(bytes) == ImageFormat::Svg {
        return svg_dimensions(&String::from_utf8_lossy(bytes));
    }
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()?;
    Some(Dimensions { width, height })
}

/// Dimensions of an SVG document's root element.
#[must_use]
pub fn svg_dimensions(markup: &str) -> Option<Dimensions> {
    let start = markup.find("<svg")?;
    let end = markup[start..].find('>')? + start;
    let tag = &markup[start..end];

    let width = attribute(tag, "width").and_then(parse_length);
    let height = attribute(tag, "height").and_then(parse_length);
    if let (Some(width), Some(height)) = (width, height) {
        return Some(Dimensions { width, height });
    }

    let view_box: Vec<f32> = attribute(tag, "viewBox")?
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    match view_box.as_slice() {
        [_, _, w, h] => Some(Dimensions {
            width: to_pixels(*w)?,
            height: to_pixels(*h)?,
        }),
        _ => None,
    }
}

fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let mut rest = tag;
    while let Some(pos) = rest.find(name) {
        let preceded_by_space = rest[..pos].ends_with(char::is_whitespace);
        let after = rest[pos + name.len()..].trim_start();
        if preceded_by_space {
            if let Some(value) = after.strip_prefix('=') {
                let value = value.trim_start();
                let quote = value.chars().next()?;
                if quote == '"' || quote == '\'' {
                    let inner = &value[1..];
                    return inner.find(quote).map(|close| &inner[..close]);
                }
            }
        }
        rest = &rest[pos + name.len()..];
    }
    None
}

fn parse_length(raw: &str) -> Option<u32> {
    let number = raw.trim().trim_end_matches("px");
    to_pixels(number.parse().ok()?)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_pixels(value: f32) -> Option<u32> {
    (value.is_finite() && value > 0.0).then(|| value.round() as u32)
}
