//! Per-run state.
//!
//! A [`RunContext`] owns every cache and counter of one extraction run and is
//! dropped with it. Nothing is shared across runs.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use domframe_assets::AssetRegistry;
use domframe_core::{ColorParser, Diagnostics, LayoutEngine, StyleSnapshot, TokenCollector, Viewport};
use tracing::warn;

use crate::accessor::{AccessorNormalizer, ElementId, PageInfo, PseudoKind, RenderTreeAccessor};
use crate::config::ExtractConfig;

type StyleKey = (ElementId, Option<PseudoKind>);

/// Caches, counters and budgets of one run.
pub struct RunContext<'a> {
    /// The render tree being compiled.
    pub accessor: &'a dyn RenderTreeAccessor,
    /// Run configuration.
    pub config: &'a ExtractConfig,
    /// Page information captured at the start of the run.
    pub page: PageInfo,
    /// Run-scoped color cache.
    pub colors: ColorParser<'a>,
    /// Auto-layout engine and its metrics.
    pub layout: LayoutEngine,
    /// Design token usage.
    pub tokens: TokenCollector,
    /// Collected asset references.
    pub assets: AssetRegistry,
    /// Diagnostics log.
    pub diagnostics: Diagnostics,
    styles: HashMap<StyleKey, Option<Arc<StyleSnapshot>>>,
    font_families: BTreeSet<String>,
    started: Instant,
    deadline: Instant,
    degraded: bool,
}

impl<'a> RunContext<'a> {
    /// Fresh context; the time budget starts now.
    #[must_use]
    pub fn new(accessor: &'a dyn RenderTreeAccessor, config: &'a ExtractConfig) -> Self {
        let page = accessor.page_info();
        let started = Instant::now();
        Self {
            accessor,
            config,
            colors: ColorParser::with_normalizer(AccessorNormalizer(accessor)),
            layout: LayoutEngine::new(config.layout.clone()),
            tokens: TokenCollector::new(),
            assets: AssetRegistry::new(&page.url),
            diagnostics: Diagnostics::with_capacity(config.diagnostics_capacity),
            styles: HashMap::new(),
            font_families: BTreeSet::new(),
            page,
            started,
            deadline: started + config.time_budget,
            degraded: false,
        }
    }

    /// Viewport and scroll state of the page.
    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.page.viewport
    }

    /// Computed style, fetched from the accessor once per element and pseudo.
    pub fn style(&mut self, element: ElementId, pseudo: Option<PseudoKind>) -> Option<Arc<StyleSnapshot>> {
        let accessor = self.accessor;
        self.styles
            .entry((element, pseudo))
            .or_insert_with(|| accessor.computed_style(element, pseudo))
            .clone()
    }

    /// Time since the run started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Instant the time budget runs out.
    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Whether the time budget has run out.
    #[must_use]
    pub fn is_past_deadline(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Log a node-level error and degrade once the configured threshold is
    /// crossed.
    pub fn node_error(&mut self, location: impl Into<String>, message: impl Into<String>) {
        self.diagnostics.error(location, message);
        if !self.degraded && self.diagnostics.errors() >= self.config.degrade_after_errors {
            warn!(
                errors = self.diagnostics.errors(),
                "too many node errors, disabling pseudo-elements and layout validation"
            );
            self.degraded = true;
            self.layout.disable_validation();
        }
    }

    /// Whether the run is in degraded mode.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Whether pseudo-elements should be synthesized.
    #[must_use]
    pub fn pseudo_enabled(&self) -> bool {
        self.config.include_pseudo_elements && !self.degraded
    }

    /// Remember a font family used by a text node.
    pub fn note_font_family(&mut self, family: &str) {
        if !family.is_empty() && !self.font_families.contains(family) {
            self.font_families.insert(family.to_string());
        }
    }

    /// Font families used by text nodes, lowercased for matching.
    #[must_use]
    pub fn used_font_families(&self) -> BTreeSet<String> {
        self.font_families
            .iter()
            .map(|f| f.to_ascii_lowercase())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{RenderSnapshot, SnapshotElement};
    use domframe_core::Rect;

    fn snapshot() -> RenderSnapshot {
        let mut snapshot = RenderSnapshot::default();
        snapshot.push_element(
            None,
            SnapshotElement::new("body", [("display", "block")], Rect::new(0.0, 0.0, 100.0, 100.0)),
        );
        snapshot
    }

    #[test]
    fn test_style_is_cached() {
        let snapshot = snapshot();
        let config = ExtractConfig::default();
        let mut ctx = RunContext::new(&snapshot, &config);
        let first = ctx.style(ElementId(0), None).expect("style");
        let second = ctx.style(ElementId(0), None).expect("style");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(ctx.style(ElementId(0), Some(PseudoKind::Before)).is_none());
    }

    #[test]
    fn test_degrades_after_threshold() {
        let snapshot = snapshot();
        let config = ExtractConfig {
            degrade_after_errors: 2,
            ..ExtractConfig::default()
        };
        let mut ctx = RunContext::new(&snapshot, &config);
        ctx.node_error("e1", "first");
        assert!(ctx.pseudo_enabled());
        ctx.node_error("e2", "second");
        assert!(ctx.is_degraded());
        assert!(!ctx.pseudo_enabled());
    }
}
