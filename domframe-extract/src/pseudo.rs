//! `::before` / `::after` synthesis.

use domframe_core::style::{split_function, Length};
use domframe_core::{Position, Rect, StyleSnapshot};

use crate::accessor::PseudoKind;

/// What a pseudo-element's `content` generates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoContent {
    /// Generated text.
    Text(String),
    /// `url()` image.
    Image(String),
    /// `content: ""`: a decorative box with nothing inside.
    Empty,
}

/// Parse a computed `content` value.
///
/// `None` means no box is generated (`none`, `normal`, or only unsupported
/// functions such as `counter()`).
#[must_use]
pub fn parse_content(raw: &str) -> Option<PseudoContent> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "none" || raw == "normal" {
        return None;
    }
    let mut text = String::new();
    let mut saw_string = false;
    for token in content_tokens(raw) {
        if let Some(literal) = unquote(token) {
            text.push_str(&unescape(literal));
            saw_string = true;
        } else if let Some(("url", args)) = split_function(token) {
            let url = unquote(args.trim()).unwrap_or(args.trim());
            if !url.is_empty() {
                return Some(PseudoContent::Image(url.to_string()));
            }
        }
    }
    match (saw_string, text.is_empty()) {
        (false, _) => None,
        (true, true) => Some(PseudoContent::Empty),
        (true, false) => Some(PseudoContent::Text(text)),
    }
}

/// Split `content` into quoted strings and bare tokens.
fn content_tokens(raw: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut chars = raw.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut end = raw.len();
        if c == '"' || c == '\'' {
            chars.next();
            let mut escaped = false;
            for (i, ch) in chars.by_ref() {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == c {
                    end = i + ch.len_utf8();
                    break;
                }
            }
        } else {
            let mut depth = 0_i32;
            while let Some(&(i, ch)) = chars.peek() {
                match ch {
                    '(' => depth += 1,
                    ')' => depth -= 1,
                    w if w.is_whitespace() && depth <= 0 => {
                        end = i;
                        break;
                    }
                    _ => {}
                }
                chars.next();
            }
        }
        tokens.push(&raw[start..end]);
    }
    tokens
}

fn unquote(token: &str) -> Option<&str> {
    let first = token.chars().next()?;
    if (first == '"' || first == '\'') && token.len() >= 2 && token.ends_with(first) {
        Some(&token[1..token.len() - 1])
    } else {
        None
    }
}

/// Resolve CSS escapes (`\201C`, `\"`).
fn unescape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let mut hex = String::new();
        while hex.len() < 6 {
            match chars.peek() {
                Some(h) if h.is_ascii_hexdigit() => {
                    hex.push(*h);
                    chars.next();
                }
                _ => break,
            }
        }
        if hex.is_empty() {
            if let Some(next) = chars.next() {
                out.push(next);
            }
            continue;
        }
        if chars.peek() == Some(&' ') {
            chars.next();
        }
        if let Some(decoded) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
            out.push(decoded);
        }
    }
    out
}

/// Estimate a pseudo-element box when the host cannot measure it.
///
/// Out-of-flow pseudos resolve `top/right/bottom/left` against
/// `containing` (the host when it is positioned, otherwise the host's
/// nearest positioned ancestor). In-flow pseudos sit at the start
/// (`::before`) or end (`::after`) of the host's content box.
#[must_use]
pub fn estimate_rect(style: &StyleSnapshot, kind: PseudoKind, host_content: Rect, containing: Rect) -> Rect {
    let width = length(style, "width", containing.width).unwrap_or(0.0);
    let height = length(style, "height", containing.height).unwrap_or(0.0);

    if matches!(style.position(), Position::Absolute | Position::Fixed) {
        let x = match (
            length(style, "left", containing.width),
            length(style, "right", containing.width),
        ) {
            (Some(left), _) => containing.x + left,
            (None, Some(right)) => containing.right() - right - width,
            (None, None) => host_content.x,
        };
        let y = match (
            length(style, "top", containing.height),
            length(style, "bottom", containing.height),
        ) {
            (Some(top), _) => containing.y + top,
            (None, Some(bottom)) => containing.bottom() - bottom - height,
            (None, None) => host_content.y,
        };
        return Rect::new(x, y, width, height);
    }

    match kind {
        PseudoKind::Before => Rect::new(host_content.x, host_content.y, width, height),
        PseudoKind::After => Rect::new(
            (host_content.right() - width).max(host_content.x),
            (host_content.bottom() - height).max(host_content.y),
            width,
            height,
        ),
    }
}

fn length(style: &StyleSnapshot, property: &str, reference: f32) -> Option<f32> {
    Length::parse(style.get(property)?).map(|l| l.resolve(reference))
}
