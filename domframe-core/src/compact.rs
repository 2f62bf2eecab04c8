//! Payload compaction for oversized documents.
//!
//! Large inline payloads are dropped (the record and its URL stay, flagged
//! `omitted`), token lists are trimmed and very deep subtrees are cut.
//! Everything removed is counted and logged as a warning in the document
//! diagnostics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::asset::AssetRecord;
use crate::diagnostics::{now_millis, DiagnosticEntry, Severity};
use crate::document::DesignDocument;
use crate::error::CoreResult;
use crate::node::Node;

/// Compaction strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompactLevel {
    /// Moderate limits.
    Standard,
    /// Tight limits.
    Aggressive,
}

/// Limits applied at one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactLimits {
    /// Largest decoded image payload kept, in bytes.
    pub max_image_bytes: usize,
    /// Largest SVG markup kept, in bytes.
    pub max_svg_bytes: usize,
    /// Color tokens kept.
    pub max_color_tokens: usize,
    /// Typography tokens kept.
    pub max_typography_tokens: usize,
    /// Spacing tokens kept.
    pub max_spacing_tokens: usize,
    /// Depth below which children are removed.
    pub max_depth: usize,
}

impl CompactLevel {
    /// Limits for this level.
    #[must_use]
    pub const fn limits(self) -> CompactLimits {
        match self {
            Self::Standard => CompactLimits {
                max_image_bytes: 75 * 1024,
                max_svg_bytes: 30 * 1024,
                max_color_tokens: 30,
                max_typography_tokens: 20,
                max_spacing_tokens: 25,
                max_depth: 10,
            },
            Self::Aggressive => CompactLimits {
                max_image_bytes: 25 * 1024,
                max_svg_bytes: 10 * 1024,
                max_color_tokens: 15,
                max_typography_tokens: 10,
                max_spacing_tokens: 10,
                max_depth: 6,
            },
        }
    }
}

/// What a compaction pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactReport {
    /// Image payloads dropped.
    pub images_omitted: usize,
    /// SVG payloads dropped.
    pub svgs_omitted: usize,
    /// Tokens removed.
    pub tokens_removed: usize,
    /// Nodes cut from the tree.
    pub nodes_truncated: usize,
    /// Serialized size before, in bytes.
    pub bytes_before: usize,
    /// Serialized size after, in bytes.
    pub bytes_after: usize,
}

impl CompactReport {
    fn merge(&mut self, other: &Self) {
        self.images_omitted += other.images_omitted;
        self.svgs_omitted += other.svgs_omitted;
        self.tokens_removed += other.tokens_removed;
        self.nodes_truncated += other.nodes_truncated;
        self.bytes_after = other.bytes_after;
    }
}

/// Decoded size of a base64 payload.
fn decoded_len(payload: &str) -> usize {
    payload.len() / 4 * 3
}

fn omit_large(map: &mut BTreeMap<String, AssetRecord>, limit: usize, size: fn(&str) -> usize) -> Vec<String> {
    let mut omitted = Vec::new();
    for record in map.values_mut() {
        let too_large = record.payload.as_deref().is_some_and(|p| size(p) > limit);
        if too_large {
            record.payload = None;
            record.omitted = true;
            omitted.push(record.absolute_url.clone());
        }
    }
    omitted
}

/// Remove children below `max_depth`; returns how many nodes were removed.
fn truncate_tree(node: &mut Node, depth: usize, max_depth: usize) -> usize {
    if depth >= max_depth {
        let removed: usize = node.children.iter().map(Node::count).sum();
        node.children.clear();
        return removed;
    }
    node.children
        .iter_mut()
        .map(|child| truncate_tree(child, depth + 1, max_depth))
        .sum()
}

fn warn(document: &mut DesignDocument, message: String) {
    document.diagnostics.counts.warnings += 1;
    document.diagnostics.entries.push(DiagnosticEntry {
        severity: Severity::Warning,
        location: "compact".to_string(),
        message,
        timestamp: now_millis(),
    });
}

/// Compact a document in place.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized to measure it.
pub fn compact(document: &mut DesignDocument, level: CompactLevel) -> CoreResult<CompactReport> {
    let limits = level.limits();
    let bytes_before = document.to_json()?.len();

    let images = omit_large(&mut document.images, limits.max_image_bytes, decoded_len);
    let svgs = omit_large(&mut document.svgs, limits.max_svg_bytes, str::len);
    let tokens_removed = document.design_tokens.truncate(
        limits.max_color_tokens,
        limits.max_typography_tokens,
        limits.max_spacing_tokens,
    );
    let nodes_truncated = truncate_tree(&mut document.root, 0, limits.max_depth);
    document.metadata.node_count -= nodes_truncated;
    document.metadata.truncated_nodes += nodes_truncated;

    if !images.is_empty() {
        warn(
            document,
            format!(
                "omitted {} image payloads over {} KB",
                images.len(),
                limits.max_image_bytes / 1024
            ),
        );
    }
    if !svgs.is_empty() {
        warn(
            document,
            format!("omitted {} SVG payloads over {} KB", svgs.len(), limits.max_svg_bytes / 1024),
        );
    }
    if tokens_removed > 0 {
        warn(document, format!("removed {tokens_removed} low-usage design tokens"));
    }
    if nodes_truncated > 0 {
        warn(
            document,
            format!("truncated {nodes_truncated} nodes below depth {}", limits.max_depth),
        );
    }

    let report = CompactReport {
        images_omitted: images.len(),
        svgs_omitted: svgs.len(),
        tokens_removed,
        nodes_truncated,
        bytes_before,
        bytes_after: document.to_json()?.len(),
    };
    info!(
        level = ?level,
        before = report.bytes_before,
        after = report.bytes_after,
        "document compacted"
    );
    Ok(report)
}

/// Compact until the serialized document fits `target_bytes`.
///
/// Nothing happens when it already fits. Standard compaction runs first and
/// aggressive compaction follows if the result is still too large. The
/// document may still exceed the target afterwards.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn compact_to_target(document: &mut DesignDocument, target_bytes: usize) -> CoreResult<CompactReport> {
    let size = document.to_json()?.len();
    if size <= target_bytes {
        return Ok(CompactReport {
            bytes_before: size,
            bytes_after: size,
            ..CompactReport::default()
        });
    }
    let mut report = compact(document, CompactLevel::Standard)?;
    if report.bytes_after > target_bytes {
        let aggressive = compact(document, CompactLevel::Aggressive)?;
        report.merge(&aggressive);
    }
    Ok(report)
}
