//! Asset records shared by traversal, the pipeline and the document.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stable 64-bit content key: the first 8 bytes of SHA-256, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetKey(String);

impl AssetKey {
    /// Key for an image or SVG by absolute URL.
    #[must_use]
    pub fn for_url(absolute_url: &str) -> Self {
        Self::hash(absolute_url.as_bytes())
    }

    /// Key for a font face by family, weight and source URL.
    #[must_use]
    pub fn for_font(family: &str, weight: &str, url: &str) -> Self {
        Self::hash(format!("{family}|{weight}|{url}").as_bytes())
    }

    /// Key for inline content with no URL (inline SVG markup).
    #[must_use]
    pub fn for_content(content: &str) -> Self {
        Self::hash(content.as_bytes())
    }

    fn hash(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(hex::encode(&digest[..8]))
    }

    /// The hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which asset map a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetKind {
    /// Raster image (payload is base64).
    Image,
    /// SVG document (payload is markup).
    Svg,
    /// Font file (payload is base64).
    Font,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Image => "image",
            Self::Svg => "svg",
            Self::Font => "font",
        })
    }
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Font face identity for font records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontFace {
    /// `font-family` name.
    pub family: String,
    /// `font-weight` value.
    pub weight: String,
    /// `font-style` value.
    #[serde(default = "FontFace::default_style")]
    pub style: String,
}

impl FontFace {
    fn default_style() -> String {
        "normal".to_string()
    }
}

/// A deduplicated external resource and its resolution state.
///
/// Created unresolved during traversal. Becomes immutable once it carries
/// either a payload or a terminal error; the URL is never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    /// Content key.
    pub key: AssetKey,
    /// Asset kind.
    pub kind: AssetKind,
    /// URL as it appeared in the source.
    pub url: String,
    /// Resolved absolute URL (equal to `url` for `data:` URIs).
    pub absolute_url: String,
    /// MIME type once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Encoded payload once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// Intrinsic dimensions when decodable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    /// Terminal error after exhausting retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Payload was dropped by compaction; consumers must use the URL.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub omitted: bool,
    /// Number of nodes referencing this asset.
    pub references: u32,
    /// Font identity (fonts only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<FontFace>,
}

impl AssetRecord {
    /// New unresolved record.
    #[must_use]
    pub fn new(key: AssetKey, kind: AssetKind, url: impl Into<String>, absolute_url: impl Into<String>) -> Self {
        Self {
            key,
            kind,
            url: url.into(),
            absolute_url: absolute_url.into(),
            mime_type: None,
            payload: None,
            dimensions: None,
            error: None,
            omitted: false,
            references: 1,
            font: None,
        }
    }

    /// Whether the record carries a payload or a terminal error.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.payload.is_some() || self.error.is_some()
    }

    /// Whether the source is an inline `data:` URI.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.absolute_url.starts_with("data:")
    }

    /// Attach a payload; ignored when already resolved.
    ///
    /// Returns whether the record changed.
    pub fn resolve(&mut self, payload: String, mime_type: Option<String>, dimensions: Option<Dimensions>) -> bool {
        if self.is_resolved() {
            return false;
        }
        self.payload = Some(payload);
        self.mime_type = mime_type.or_else(|| self.mime_type.take());
        self.dimensions = dimensions.or(self.dimensions);
        true
    }

    /// Record a terminal error; ignored when already resolved.
    ///
    /// Returns whether the record changed.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.is_resolved() {
            return false;
        }
        self.error = Some(error.into());
        true
    }

    /// Approximate payload size in bytes.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.payload.as_ref().map_or(0, String::len)
    }
}
