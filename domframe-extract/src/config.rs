//! Run configuration.
//!
//! Every budget is caller-supplied and scoped to one run; nothing here is
//! global.

use std::time::Duration;

use domframe_assets::PipelineConfig;
use domframe_core::LayoutInferenceConfig;

/// Budgets and switches for one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Subtrees deeper than this are dropped (the rest of the run continues).
    pub max_depth: usize,
    /// Exceeding this many nodes aborts the run.
    pub max_nodes: usize,
    /// Wall-clock budget for traversal and asset resolution.
    pub time_budget: Duration,
    /// Consider yielding after this many processed nodes.
    pub yield_every: usize,
    /// Only yield if at least this long has passed since the last yield.
    pub yield_interval: Duration,
    /// How long to suspend at a yield point.
    pub yield_pause: Duration,
    /// Synthesize `::before`/`::after` nodes.
    pub include_pseudo_elements: bool,
    /// Fetch and inline collected assets after traversal.
    pub resolve_assets: bool,
    /// Retained diagnostics entries.
    pub diagnostics_capacity: usize,
    /// Node-level errors after which the run degrades (no pseudo-elements,
    /// no layout validation).
    pub degrade_after_errors: u64,
    /// Auto-layout inference tunables.
    pub layout: LayoutInferenceConfig,
    /// Asset pipeline tunables.
    pub pipeline: PipelineConfig,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_nodes: 15_000,
            time_budget: Duration::from_secs(60),
            yield_every: 50,
            yield_interval: Duration::from_millis(16),
            yield_pause: Duration::from_millis(1),
            include_pseudo_elements: true,
            resolve_assets: true,
            diagnostics_capacity: 200,
            degrade_after_errors: 50,
            layout: LayoutInferenceConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ExtractConfig {
    /// Budget in milliseconds, for error messages.
    #[must_use]
    pub fn time_budget_ms(&self) -> u64 {
        u64::try_from(self.time_budget.as_millis()).unwrap_or(u64::MAX)
    }
}
