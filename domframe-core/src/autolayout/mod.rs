//! Auto-layout inference.
//!
//! Each container goes through four phases, stopping at the first decline:
//!
//! 1. **Candidacy** ([`candidacy`]): child count, positioned children, and
//!    flex/grid/stacking evidence.
//! 2. **Detection** ([`detect`]): derive direction, spacing, padding and
//!    alignment.
//! 3. **Validation** ([`validate`]): simulate child positions and compare
//!    them with the measured ones.
//! 4. **Commit**: candidates get an [`AutoLayout`] carrying the verdict and
//!    the run-wide [`LayoutMetrics`] are updated.
//!
//! Validation is governed by [`LayoutGovernor`]: large containers skip it,
//! slow validations are discarded, and repeated slowness opens a circuit
//! breaker for the rest of the run.

pub mod candidacy;
pub mod detect;
pub mod metrics;
pub mod validate;

use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use candidacy::{DeclineReason, Evidence};
pub use metrics::{LayoutGovernor, LayoutMetrics, LayoutMetricsReport};
pub use validate::RejectionReason;

use crate::geometry::{Position, Rect, Sides};
use crate::style::StyleSnapshot;

/// Tunables for inference and validation.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutInferenceConfig {
    /// Maximum per-child delta for a safe verdict.
    pub tolerance_px: f32,
    /// Allowed spread between the smallest and largest measured gap.
    pub gap_tolerance_px: f32,
    /// Containers with more children are declined.
    pub max_candidate_children: usize,
    /// Gap range accepted for inferred (non-flex/grid) stacks.
    pub inferred_gap_range: RangeInclusive<f32>,
    /// Candidates with more children skip validation (unsafe).
    pub validation_child_ceiling: usize,
    /// Wall-clock allowance for one validation.
    pub validation_timeout: Duration,
    /// Timeouts before the circuit breaker opens.
    pub timeout_threshold: u32,
}

impl Default for LayoutInferenceConfig {
    fn default() -> Self {
        Self {
            tolerance_px: 1.0,
            gap_tolerance_px: 2.0,
            max_candidate_children: 50,
            inferred_gap_range: 0.0..=20.0,
            validation_child_ceiling: 40,
            validation_timeout: Duration::from_millis(50),
            timeout_threshold: 5,
        }
    }
}

/// Primary axis of an auto-layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayoutDirection {
    /// Children flow left to right.
    Horizontal,
    /// Children flow top to bottom.
    Vertical,
}

/// Alignment along either axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Alignment {
    /// Start edge.
    #[default]
    Min,
    /// Centred.
    Center,
    /// End edge.
    Max,
    /// Free space distributed between children (primary axis only).
    SpaceBetween,
    /// Text baselines (counter axis only).
    Baseline,
}

/// Where the layout evidence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayoutSource {
    /// Flexbox container.
    Flex,
    /// Single-axis grid.
    Grid,
    /// Measured stacking pattern.
    Inferred,
}

/// Detected auto-layout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoLayoutConfig {
    /// Evidence source.
    pub source: LayoutSource,
    /// Primary axis.
    pub direction: LayoutDirection,
    /// Space between children.
    pub spacing: f32,
    /// Border plus padding of the container.
    pub padding: Sides,
    /// Primary-axis alignment.
    pub primary_align: Alignment,
    /// Counter-axis alignment.
    pub counter_align: Alignment,
    /// Children fill the counter axis.
    pub stretch_children: bool,
    /// `flex-wrap` requested wrapping.
    pub wrap: bool,
}

/// Outcome of pixel-safe validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoLayoutVerdict {
    /// Whether the layout reproduces the measured positions.
    pub safe: bool,
    /// Tolerance the verdict was checked against.
    #[serde(rename = "toleranceOverridePx")]
    pub tolerance_px: f32,
    /// Largest per-child delta.
    pub max_child_delta_px: f32,
    /// Mean per-child delta.
    pub avg_child_delta_px: f32,
    /// Rejection reason codes; empty when safe.
    pub reasons: Vec<String>,
}

impl AutoLayoutVerdict {
    pub(crate) fn unsafe_without_simulation(tolerance_px: f32, reason: RejectionReason) -> Self {
        Self {
            safe: false,
            tolerance_px,
            max_child_delta_px: 0.0,
            avg_child_delta_px: 0.0,
            reasons: vec![reason.code().to_string()],
        }
    }
}

/// A fully populated auto-layout with its verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoLayout {
    /// Configuration.
    #[serde(flatten)]
    pub config: AutoLayoutConfig,
    /// Validation verdict.
    pub verdict: AutoLayoutVerdict,
}

/// The container being analyzed.
#[derive(Debug, Clone, Copy)]
pub struct LayoutContainer<'a> {
    /// Computed style.
    pub style: &'a StyleSnapshot,
    /// Border box.
    pub border_box: Rect,
    /// Border widths.
    pub border: Sides,
    /// Padding widths.
    pub padding: Sides,
}

impl LayoutContainer<'_> {
    /// Content box.
    #[must_use]
    pub fn content_box(&self) -> Rect {
        let inset = self.border.add(&self.padding);
        Rect::new(
            self.border_box.x + inset.left,
            self.border_box.y + inset.top,
            (self.border_box.width - inset.horizontal()).max(0.0),
            (self.border_box.height - inset.vertical()).max(0.0),
        )
    }
}

/// One in-flow child, in the container's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutChild {
    /// Border box.
    pub rect: Rect,
    /// Computed `position`.
    pub position: Position,
    /// Margins.
    pub margin: Sides,
}

impl LayoutChild {
    /// Static child without margins.
    #[must_use]
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            position: Position::Static,
            margin: Sides::default(),
        }
    }
}

/// Result of evaluating one container.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutOutcome {
    /// Set for candidates (safe or not).
    pub auto_layout: Option<AutoLayout>,
    /// Set when the container was declined.
    pub declined: Option<DeclineReason>,
}

/// Run-scoped inference engine.
#[derive(Debug)]
pub struct LayoutEngine {
    config: LayoutInferenceConfig,
    governor: LayoutGovernor,
    metrics: LayoutMetrics,
    validation_enabled: bool,
}

impl LayoutEngine {
    /// New engine for one run.
    #[must_use]
    pub fn new(config: LayoutInferenceConfig) -> Self {
        let governor = LayoutGovernor::new(config.validation_timeout, config.timeout_threshold);
        Self {
            config,
            governor,
            metrics: LayoutMetrics::default(),
            validation_enabled: true,
        }
    }

    /// Stop validating; later candidates are committed as unsafe.
    pub fn disable_validation(&mut self) {
        if self.validation_enabled {
            warn!("auto-layout validation disabled for the rest of the run");
        }
        self.validation_enabled = false;
    }

    /// Run all four phases for one container.
    pub fn evaluate(&mut self, container: &LayoutContainer<'_>, children: &[LayoutChild]) -> LayoutOutcome {
        let evidence = match candidacy::assess(container, children, &self.config) {
            Ok(evidence) => evidence,
            Err(reason) => {
                self.metrics.record_decline(reason);
                return LayoutOutcome {
                    auto_layout: None,
                    declined: Some(reason),
                };
            }
        };

        let detected = detect::detect(container, children, evidence);
        let verdict = self.validate(container, children, &detected);
        debug!(
            safe = verdict.safe,
            max_delta = verdict.max_child_delta_px,
            reasons = ?verdict.reasons,
            "auto-layout candidate"
        );
        self.metrics.record_verdict(&verdict);
        LayoutOutcome {
            auto_layout: Some(AutoLayout {
                config: detected.config,
                verdict,
            }),
            declined: None,
        }
    }

    fn validate(
        &mut self,
        container: &LayoutContainer<'_>,
        children: &[LayoutChild],
        detected: &detect::Detected,
    ) -> AutoLayoutVerdict {
        let tolerance = self.config.tolerance_px;
        if !self.validation_enabled {
            return AutoLayoutVerdict::unsafe_without_simulation(tolerance, RejectionReason::ValidationDisabled);
        }
        if self.governor.is_open() {
            return AutoLayoutVerdict::unsafe_without_simulation(tolerance, RejectionReason::CircuitOpen);
        }
        if children.len() > self.config.validation_child_ceiling {
            return AutoLayoutVerdict::unsafe_without_simulation(tolerance, RejectionReason::ValidationSkipped);
        }

        let started = Instant::now();
        let verdict = validate::validate(container, children, detected, &self.config);
        if self.governor.record(started.elapsed()) {
            self.metrics.validation_timeouts += 1;
            self.metrics.circuit_open = self.governor.is_open();
            return AutoLayoutVerdict::unsafe_without_simulation(tolerance, RejectionReason::ValidationTimeout);
        }
        verdict
    }

    /// Metrics gathered so far.
    #[must_use]
    pub fn metrics(&self) -> &LayoutMetrics {
        &self.metrics
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &LayoutInferenceConfig {
        &self.config
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(LayoutInferenceConfig::default())
    }
}
