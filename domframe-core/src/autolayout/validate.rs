//! Phase 3: pixel-safe validation.
//!
//! The configuration is simulated the way a design tool would lay the
//! children out. The result is compared with the measured boxes, and the
//! layout is only safe when every child lands within tolerance.

use std::fmt;

use super::candidacy::measured_gaps;
use super::detect::Detected;
use super::{
    Alignment, AutoLayoutConfig, AutoLayoutVerdict, LayoutChild, LayoutContainer, LayoutDirection,
    LayoutInferenceConfig,
};
use crate::geometry::Rect;

/// Why a candidate was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    /// A child moved further than the tolerance.
    DeltaExceedsTolerance,
    /// `flex-wrap` requested wrapping.
    WrapUnsupported,
    /// The simulated children overlap.
    SimulatedOverlap,
    /// Measured gaps differ by more than the gap tolerance.
    NonUniformGaps,
    /// `justify-content` has no equivalent alignment.
    JustifyUnsupported,
    /// Too many children to validate.
    ValidationSkipped,
    /// Validation took longer than allowed; its result was discarded.
    ValidationTimeout,
    /// The circuit breaker is open.
    CircuitOpen,
    /// Validation was turned off for the run.
    ValidationDisabled,
}

impl RejectionReason {
    /// Stable code used in verdicts and histograms.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::DeltaExceedsTolerance => "delta-exceeds-tolerance",
            Self::WrapUnsupported => "wrap-unsupported",
            Self::SimulatedOverlap => "simulated-overlap",
            Self::NonUniformGaps => "non-uniform-gaps",
            Self::JustifyUnsupported => "justify-unsupported",
            Self::ValidationSkipped => "validation-skipped",
            Self::ValidationTimeout => "validation-timeout",
            Self::CircuitOpen => "circuit-open",
            Self::ValidationDisabled => "validation-disabled",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Axis helpers so the simulation is written once for both directions.
#[derive(Clone, Copy)]
struct Axis(LayoutDirection);

impl Axis {
    fn main(self, r: &Rect) -> (f32, f32) {
        match self.0 {
            LayoutDirection::Horizontal => (r.x, r.width),
            LayoutDirection::Vertical => (r.y, r.height),
        }
    }

    fn cross(self, r: &Rect) -> (f32, f32) {
        match self.0 {
            LayoutDirection::Horizontal => (r.y, r.height),
            LayoutDirection::Vertical => (r.x, r.width),
        }
    }

    fn margins(self, child: &LayoutChild) -> ((f32, f32), (f32, f32)) {
        let m = child.margin;
        match self.0 {
            LayoutDirection::Horizontal => ((m.left, m.right), (m.top, m.bottom)),
            LayoutDirection::Vertical => ((m.top, m.bottom), (m.left, m.right)),
        }
    }

    fn rect(self, main: (f32, f32), cross: (f32, f32)) -> Rect {
        match self.0 {
            LayoutDirection::Horizontal => Rect::new(main.0, cross.0, main.1, cross.1),
            LayoutDirection::Vertical => Rect::new(cross.0, main.0, cross.1, main.1),
        }
    }
}

/// Child boxes as the configuration would place them.
///
/// Sizes are taken from the measured children (auto-layout children keep
/// their fixed size); children are placed in source order.
#[must_use]
pub fn simulate(config: &AutoLayoutConfig, content: Rect, children: &[LayoutChild]) -> Vec<Rect> {
    if children.is_empty() {
        return Vec::new();
    }
    let axis = Axis(config.direction);
    let (main_start, main_extent) = axis.main(&content);
    let (cross_start, cross_extent) = axis.cross(&content);

    let occupied: f32 = children
        .iter()
        .map(|c| {
            let ((before, after), _) = axis.margins(c);
            axis.main(&c.rect).1 + before + after
        })
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let gaps = (children.len() - 1) as f32;
    let total = occupied + config.spacing * gaps;
    let free = main_extent - total;

    let (mut cursor, spacing) = match config.primary_align {
        Alignment::Center => (main_start + free / 2.0, config.spacing),
        Alignment::Max => (main_start + free, config.spacing),
        Alignment::SpaceBetween if gaps > 0.0 && free > 0.0 => (main_start, config.spacing + free / gaps),
        _ => (main_start, config.spacing),
    };

    children
        .iter()
        .map(|child| {
            let ((before, after), (cross_before, cross_after)) = axis.margins(child);
            let main_size = axis.main(&child.rect).1;
            let main_pos = cursor + before;
            cursor = main_pos + main_size + after + spacing;

            let measured_cross = axis.cross(&child.rect).1;
            let (cross_pos, cross_size) = if config.stretch_children {
                (
                    cross_start + cross_before,
                    (cross_extent - cross_before - cross_after).max(0.0),
                )
            } else {
                let pos = match config.counter_align {
                    Alignment::Center => {
                        cross_start + (cross_extent - measured_cross - cross_before - cross_after) / 2.0 + cross_before
                    }
                    Alignment::Max => cross_start + cross_extent - measured_cross - cross_after,
                    _ => cross_start + cross_before,
                };
                (pos, measured_cross)
            };
            axis.rect((main_pos, main_size), (cross_pos, cross_size))
        })
        .collect()
}

fn delta(a: &Rect, b: &Rect) -> f32 {
    (a.x - b.x)
        .abs()
        .max((a.y - b.y).abs())
        .max((a.width - b.width).abs())
        .max((a.height - b.height).abs())
}

/// Validate a detected configuration against the measured children.
#[must_use]
pub fn validate(
    container: &LayoutContainer<'_>,
    children: &[LayoutChild],
    detected: &Detected,
    config: &LayoutInferenceConfig,
) -> AutoLayoutVerdict {
    let layout = &detected.config;
    let simulated = simulate(layout, container.content_box(), children);

    let deltas: Vec<f32> = simulated
        .iter()
        .zip(children)
        .map(|(sim, child)| delta(sim, &child.rect))
        .collect();
    let max_delta = deltas.iter().copied().fold(0.0_f32, f32::max);
    #[allow(clippy::cast_precision_loss)]
    let avg_delta = if deltas.is_empty() {
        0.0
    } else {
        deltas.iter().sum::<f32>() / deltas.len() as f32
    };

    let mut reasons: Vec<RejectionReason> = Vec::new();
    if layout.wrap {
        reasons.push(RejectionReason::WrapUnsupported);
    }
    if detected.unsupported_justify {
        reasons.push(RejectionReason::JustifyUnsupported);
    }
    if max_delta > config.tolerance_px {
        reasons.push(RejectionReason::DeltaExceedsTolerance);
    }
    if simulated
        .windows(2)
        .any(|pair| pair[0].overlaps(&pair[1], 0.5))
    {
        reasons.push(RejectionReason::SimulatedOverlap);
    }
    if children.len() >= 3 {
        let gaps = measured_gaps(children, layout.direction);
        let (lo, hi) = gaps
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), g| (lo.min(*g), hi.max(*g)));
        if hi - lo > config.gap_tolerance_px && layout.primary_align != Alignment::SpaceBetween {
            reasons.push(RejectionReason::NonUniformGaps);
        }
    }

    AutoLayoutVerdict {
        safe: reasons.is_empty(),
        tolerance_px: config.tolerance_px,
        max_child_delta_px: max_delta,
        avg_child_delta_px: avg_delta,
        reasons: reasons.iter().map(|r| r.code().to_string()).collect(),
    }
}
