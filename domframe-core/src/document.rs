//! The output document: metadata, node tree, asset maps and run summaries.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::asset::AssetRecord;
use crate::autolayout::LayoutMetricsReport;
use crate::diagnostics::DiagnosticsSummary;
use crate::error::{CoreError, CoreResult};
use crate::geometry::Viewport;
use crate::node::{Node, NodeId};
use crate::paint::Fill;
use crate::tokens::DesignTokens;

/// Version of the document shape.
pub const SCHEMA_VERSION: &str = "1.0";

/// Run and page metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Page URL.
    pub source_url: String,
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Viewport and scroll state.
    pub viewport: Viewport,
    /// Preferred color scheme (`light`/`dark`).
    #[serde(default = "DocumentMetadata::default_color_scheme")]
    pub color_scheme: String,
    /// Unique run identifier.
    pub run_id: String,
    /// Extraction start (ms since epoch).
    pub extracted_at: u64,
    /// Run duration in milliseconds.
    pub duration_ms: u64,
    /// Nodes in the tree.
    pub node_count: usize,
    /// Nodes removed by compaction.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub truncated_nodes: usize,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &usize) -> bool {
    *value == 0
}

impl DocumentMetadata {
    fn default_color_scheme() -> String {
        "light".to_string()
    }
}

/// Compiled design document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignDocument {
    /// Document shape version.
    pub schema_version: String,
    /// Metadata.
    pub metadata: DocumentMetadata,
    /// Root node.
    pub root: Node,
    /// Raster images by key.
    pub images: BTreeMap<String, AssetRecord>,
    /// SVGs by key.
    pub svgs: BTreeMap<String, AssetRecord>,
    /// Fonts by key.
    pub fonts: BTreeMap<String, AssetRecord>,
    /// Design tokens.
    #[serde(default)]
    pub design_tokens: DesignTokens,
    /// Diagnostics summary.
    pub diagnostics: DiagnosticsSummary,
    /// Auto-layout acceptance metrics.
    pub auto_layout_metrics: LayoutMetricsReport,
}

impl DesignDocument {
    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to indented JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a document.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Number of frames carrying an auto-layout.
    #[must_use]
    pub fn auto_layout_count(&self) -> usize {
        self.root
            .descendants()
            .filter(|n| n.kind.auto_layout().is_some())
            .count()
    }

    /// Find a node by id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NodeNotFound`] if no node has that id.
    pub fn node(&self, id: NodeId) -> CoreResult<&Node> {
        self.root
            .descendants()
            .find(|n| n.id == id)
            .ok_or_else(|| CoreError::NodeNotFound(id.to_string()))
    }

    /// Check structural invariants: unique ids, consistent parent links,
    /// asset keys that resolve, and auto-layout metrics matching the tree.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidDocument`] describing the first violation.
    pub fn validate(&self) -> CoreResult<()> {
        if self.root.parent_id.is_some() {
            return Err(CoreError::InvalidDocument("root has a parent".into()));
        }
        let mut seen = HashSet::new();
        let mut stack: Vec<&Node> = vec![&self.root];
        while let Some(node) = stack.pop() {
            if !seen.insert(node.id) {
                return Err(CoreError::InvalidDocument(format!("duplicate node id {}", node.id)));
            }
            for child in &node.children {
                if child.parent_id != Some(node.id) {
                    return Err(CoreError::InvalidDocument(format!(
                        "node {} does not point at parent {}",
                        child.id, node.id
                    )));
                }
                stack.push(child);
            }
            if node.is_text() && !node.children.is_empty() {
                return Err(CoreError::InvalidDocument(format!("text node {} has children", node.id)));
            }
            for key in node.paint.fills.iter().filter_map(|f| match f {
                Fill::Image { asset_key, .. } => Some(asset_key),
                _ => None,
            }) {
                if !self.images.contains_key(key) {
                    return Err(CoreError::InvalidDocument(format!(
                        "node {} references missing image {key}",
                        node.id
                    )));
                }
            }
        }
        if seen.len() != self.metadata.node_count {
            return Err(CoreError::InvalidDocument(format!(
                "node count {} does not match tree size {}",
                self.metadata.node_count,
                seen.len()
            )));
        }
        // Compaction may cut subtrees that held auto-layouts.
        let with_layout = self.auto_layout_count() as u64;
        let consistent = if self.metadata.truncated_nodes == 0 {
            with_layout == self.auto_layout_metrics.candidates
        } else {
            with_layout <= self.auto_layout_metrics.candidates
        };
        if !consistent {
            return Err(CoreError::InvalidDocument(format!(
                "{with_layout} auto-layouts but {} candidates",
                self.auto_layout_metrics.candidates
            )));
        }
        Ok(())
    }
}
