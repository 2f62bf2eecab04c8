//! Reference collection and deduplication.
//!
//! Traversal registers every asset reference here. Registration never blocks
//! and never fails the node: URLs that cannot be resolved against the page
//! are skipped and reported to the caller as `None`.

use std::collections::BTreeMap;

use domframe_core::{AssetKey, AssetKind, AssetRecord, FontFace};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::data_uri::is_data_uri;

/// Reference counters for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    /// Total references registered.
    pub references: u64,
    /// Distinct records created.
    pub unique: u64,
    /// References that hit an existing record.
    pub duplicates: u64,
    /// References dropped for unusable URLs.
    pub rejected: u64,
}

/// An unresolved record waiting for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAsset {
    /// Map the record lives in.
    pub kind: AssetKind,
    /// Record key.
    pub key: String,
    /// Absolute URL to fetch or decode.
    pub url: String,
}

/// Deduplicating store for image, SVG and font records.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    base_url: Option<Url>,
    images: BTreeMap<String, AssetRecord>,
    svgs: BTreeMap<String, AssetRecord>,
    fonts: BTreeMap<String, AssetRecord>,
    stats: RegistryStats,
}

impl AssetRegistry {
    /// Create a registry resolving relative URLs against `base_url`.
    ///
    /// An unparseable base leaves only absolute and `data:` URLs usable.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: Url::parse(base_url).ok(),
            ..Self::default()
        }
    }

    /// Resolve a URL as it appeared in the page to an absolute URL.
    ///
    /// `data:` URIs pass through unchanged. Empty strings and schemes that
    /// cannot be fetched (`javascript:`, `about:`) yield `None`.
    #[must_use]
    pub fn resolve_url(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if is_data_uri(raw) {
            return Some(raw.to_string());
        }
        let parsed = match Url::parse(raw) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => self.base_url.as_ref()?.join(raw).ok()?,
            Err(_) => return None,
        };
        matches!(parsed.scheme(), "http" | "https" | "file").then(|| parsed.to_string())
    }

    /// Register an image reference, returning its key.
    pub fn register_image(&mut self, raw_url: &str) -> Option<AssetKey> {
        self.register_url(AssetKind::Image, raw_url)
    }

    /// Register an external SVG reference, returning its key.
    pub fn register_svg(&mut self, raw_url: &str) -> Option<AssetKey> {
        self.register_url(AssetKind::Svg, raw_url)
    }

    /// Register serialized inline SVG markup.
    ///
    /// The record is resolved immediately; identical markup shares a record.
    pub fn register_inline_svg(&mut self, markup: &str) -> AssetKey {
        let key = AssetKey::for_content(markup);
        self.stats.references += 1;
        if let Some(record) = self.svgs.get_mut(key.as_str()) {
            record.references += 1;
            self.stats.duplicates += 1;
            return key;
        }
        let mut record = AssetRecord::new(key.clone(), AssetKind::Svg, "inline", "inline");
        record.resolve(
            markup.to_string(),
            Some("image/svg+xml".to_string()),
            crate::probe::svg_dimensions(markup),
        );
        self.svgs.insert(key.to_string(), record);
        self.stats.unique += 1;
        key
    }

    /// Register a font face source.
    pub fn register_font(&mut self, face: FontFace, raw_url: &str) -> Option<AssetKey> {
        let Some(absolute) = self.resolve_url(raw_url) else {
            self.stats.rejected += 1;
            return None;
        };
        let key = AssetKey::for_font(&face.family, &face.weight, &absolute);
        let created = self.insert(AssetKind::Font, &key, raw_url, &absolute);
        if created {
            if let Some(record) = self.fonts.get_mut(key.as_str()) {
                record.font = Some(face);
            }
        }
        Some(key)
    }

    fn register_url(&mut self, kind: AssetKind, raw_url: &str) -> Option<AssetKey> {
        let Some(absolute) = self.resolve_url(raw_url) else {
            debug!(url = raw_url, "skipping unusable asset URL");
            self.stats.rejected += 1;
            return None;
        };
        let key = AssetKey::for_url(&absolute);
        self.insert(kind, &key, raw_url, &absolute);
        Some(key)
    }

    /// Insert or bump a record; returns whether a record was created.
    fn insert(&mut self, kind: AssetKind, key: &AssetKey, raw_url: &str, absolute: &str) -> bool {
        self.stats.references += 1;
        let map = self.map_mut(kind);
        if let Some(record) = map.get_mut(key.as_str()) {
            record.references += 1;
            self.stats.duplicates += 1;
            return false;
        }
        map.insert(
            key.to_string(),
            AssetRecord::new(key.clone(), kind, raw_url, absolute),
        );
        self.stats.unique += 1;
        true
    }

    fn map_mut(&mut self, kind: AssetKind) -> &mut BTreeMap<String, AssetRecord> {
        match kind {
            AssetKind::Image => &mut self.images,
            AssetKind::Svg => &mut self.svgs,
            AssetKind::Font => &mut self.fonts,
        }
    }

    fn map(&self, kind: AssetKind) -> &BTreeMap<String, AssetRecord> {
        match kind {
            AssetKind::Image => &self.images,
            AssetKind::Svg => &self.svgs,
            AssetKind::Font => &self.fonts,
        }
    }

    /// Look up a record.
    #[must_use]
    pub fn get(&self, kind: AssetKind, key: &str) -> Option<&AssetRecord> {
        self.map(kind).get(key)
    }

    /// Mutable access to a record.
    pub fn get_mut(&mut self, kind: AssetKind, key: &str) -> Option<&mut AssetRecord> {
        self.map_mut(kind).get_mut(key)
    }

    /// Records still lacking a payload or terminal error, in key order.
    #[must_use]
    pub fn pending(&self) -> Vec<PendingAsset> {
        [AssetKind::Image, AssetKind::Svg, AssetKind::Font]
            .into_iter()
            .flat_map(|kind| {
                self.map(kind)
                    .values()
                    .filter(|r| !r.is_resolved())
                    .map(move |r| PendingAsset {
                        kind,
                        key: r.key.to_string(),
                        url: r.absolute_url.clone(),
                    })
            })
            .collect()
    }

    /// Total records across all maps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len() + self.svgs.len() + self.fonts.len()
    }

    /// Whether no asset was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reference counters.
    #[must_use]
    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }

    /// Hand the three maps (images, svgs, fonts) to the document.
    #[must_use]
    pub fn into_maps(
        self,
    ) -> (
        BTreeMap<String, AssetRecord>,
        BTreeMap<String, AssetRecord>,
        BTreeMap<String, AssetRecord>,
    ) {
        (self.images, self.svgs, self.fonts)
    }
}
