//! Inline `data:` URI decoding and format sniffing.
//!
//! Data URIs never touch the network: they are validated, size-capped and
//! decoded locally.

use base64::Engine;

use crate::error::{AssetError, AssetResult};

/// Image formats the pipeline recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// GIF.
    Gif,
    /// WebP (alpha support).
    WebP,
    /// SVG markup.
    Svg,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from MIME type.
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_lowercase().as_str() {
            "image/png" => Self::Png,
            "image/jpeg" | "image/jpg" => Self::Jpeg,
            "image/gif" => Self::Gif,
            "image/webp" => Self::WebP,
            "image/svg+xml" => Self::Svg,
            _ => Self::Unknown,
        }
    }

    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }

        if data.starts_with(b"GIF8") {
            return Self::Gif;
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }

        let head = String::from_utf8_lossy(&data[..data.len().min(256)]);
        let head = head.trim_start();
        if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
            return Self::Svg;
        }

        Self::Unknown
    }

    /// Canonical MIME type, if known.
    #[must_use]
    pub fn mime(self) -> Option<&'static str> {
        match self {
            Self::Png => Some("image/png"),
            Self::Jpeg => Some("image/jpeg"),
            Self::Gif => Some("image/gif"),
            Self::WebP => Some("image/webp"),
            Self::Svg => Some("image/svg+xml"),
            Self::Unknown => None,
        }
    }
}

/// A decoded `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    /// Declared MIME type (`text/plain` when omitted).
    pub mime: String,
    /// Decoded bytes.
    pub bytes: Vec<u8>,
}

impl DataUri {
    /// Declared format, falling back to sniffing the bytes.
    #[must_use]
    pub fn format(&self) -> ImageFormat {
        match ImageFormat::from_mime(&self.mime) {
            ImageFormat::Unknown => ImageFormat::from_magic_bytes(&self.bytes),
            known => known,
        }
    }
}

/// Whether a URL is an inline `data:` URI.
#[must_use]
pub fn is_data_uri(url: &str) -> bool {
    url.get(..5).is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"))
}

/// Decode a `data:` URI, refusing payloads above `max_bytes`.
///
/// Supports formats like: `data:image/png;base64,iVBORw0KGgo...` and
/// percent-encoded `data:image/svg+xml,%3Csvg...`.
///
/// # Errors
///
/// Returns [`AssetError::InvalidDataUri`] if the URI is malformed and
/// [`AssetError::TooLarge`] if the payload exceeds `max_bytes`.
pub fn parse_data_uri(uri: &str, max_bytes: usize) -> AssetResult<DataUri> {
    if !is_data_uri(uri) {
        return Err(AssetError::InvalidDataUri("not a data URI".to_string()));
    }

    let uri_data = &uri[5..];

    let comma_pos = uri_data
        .find(',')
        .ok_or_else(|| AssetError::InvalidDataUri("missing comma".to_string()))?;

    let metadata = &uri_data[..comma_pos];
    let encoded_data = &uri_data[comma_pos + 1..];

    let is_base64 = metadata
        .split(';')
        .any(|part| part.trim().eq_ignore_ascii_case("base64"));

    // Reject before decoding so oversized payloads never get allocated twice.
    let estimated = if is_base64 {
        encoded_data.len() / 4 * 3
    } else {
        encoded_data.len()
    };
    if estimated > max_bytes {
        return Err(AssetError::TooLarge {
            size: estimated,
            limit: max_bytes,
        });
    }

    let bytes = if is_base64 {
        let compact: String = encoded_data.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| AssetError::InvalidDataUri(format!("bad base64: {e}")))?
    } else {
        percent_decode(encoded_data)?
    };

    if bytes.len() > max_bytes {
        return Err(AssetError::TooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }

    let mime = metadata
        .split(';')
        .next()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or("text/plain")
        .to_lowercase();

    Ok(DataUri { mime, bytes })
}

fn percent_decode(input: &str) -> AssetResult<Vec<u8>> {
    let raw = input.as_bytes();
    let mut result = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        if raw[i] == b'%' {
            let decoded = raw
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| AssetError::InvalidDataUri("invalid percent encoding".to_string()))?;
            result.push(decoded);
            i += 3;
        } else {
            result.push(raw[i]);
            i += 1;
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

    #[test]
    fn test_base64_png() {
        let uri = format!("data:image/png;base64,{PIXEL_PNG}");
        let decoded = parse_data_uri(&uri, 1024).expect("decode");
        assert_eq!(decoded.mime, "image/png");
        assert_eq!(decoded.format(), ImageFormat::Png);
        assert_eq!(ImageFormat::from_magic_bytes(&decoded.bytes), ImageFormat::Png);
    }

    #[test]
    fn test_percent_encoded_svg() {
        let uri = "data:image/svg+xml,%3Csvg%20xmlns%3D%22http%3A%2F%2Fwww.w3.org%2F2000%2Fsvg%22%2F%3E";
        let decoded = parse_data_uri(uri, 1024).expect("decode");
        assert_eq!(decoded.format(), ImageFormat::Svg);
        assert_eq!(
            String::from_utf8(decoded.bytes).expect("utf8"),
            r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#
        );
    }

    #[test]
    fn test_missing_mime_defaults_to_text() {
        let decoded = parse_data_uri("data:,hello", 64).expect("decode");
        assert_eq!(decoded.mime, "text/plain");
        assert_eq!(decoded.bytes, b"hello");
    }

    #[test]
    fn test_size_cap_rejects_before_decode() {
        let uri = format!("data:image/png;base64,{}", "A".repeat(4000));
        let err = parse_data_uri(&uri, 1000).expect_err("too large");
        assert!(matches!(err, AssetError::TooLarge { limit: 1000, .. }));
    }

    #[test]
    fn test_invalid_data_uri() {
        assert!(parse_data_uri("https://example.com/a.png", 10).is_err());
        assert!(parse_data_uri("data:image/png;base64", 10).is_err());
        assert!(parse_data_uri("data:image/png;base64,!!!!", 10).is_err());
        assert!(parse_data_uri("data:text/plain,%zz", 10).is_err());
    }

    #[test]
    fn test_format_detection_from_mime() {
        assert_eq!(ImageFormat::from_mime("image/png"), ImageFormat::Png);
        assert_eq!(ImageFormat::from_mime("IMAGE/JPEG"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_mime("image/svg+xml; charset=utf-8"), ImageFormat::Svg);
        assert_eq!(ImageFormat::from_mime("application/octet-stream"), ImageFormat::Unknown);
    }

    #[test]
    fn test_format_detection_from_magic_bytes() {
        assert_eq!(ImageFormat::from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_magic_bytes(b"GIF89a"), ImageFormat::Gif);
        assert_eq!(ImageFormat::from_magic_bytes(b"RIFF\0\0\0\0WEBPVP8 "), ImageFormat::WebP);
        assert_eq!(ImageFormat::from_magic_bytes(b"  <svg viewBox='0 0 1 1'/>"), ImageFormat::Svg);
        assert_eq!(ImageFormat::from_magic_bytes(&[0x00, 0x01]), ImageFormat::Unknown);
    }
}
