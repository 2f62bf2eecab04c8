//! Phase 1: decide whether a container is worth analyzing at all.

use std::fmt;

use super::{LayoutChild, LayoutContainer, LayoutDirection, LayoutInferenceConfig};
use crate::style::split_top_level_whitespace;

/// Why a container is not an auto-layout candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeclineReason {
    /// Fewer than two children.
    TooFewChildren,
    /// More children than the analysis cap.
    TooManyChildren,
    /// At least one child is absolutely or fixed positioned.
    PositionedChildren,
    /// A grid with tracks on both axes.
    TwoDimensionalGrid,
    /// Neither flex/grid display nor a recognizable stacking pattern.
    NoLayoutEvidence,
}

impl DeclineReason {
    /// Stable code used in metrics histograms.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::TooFewChildren => "too-few-children",
            Self::TooManyChildren => "too-many-children",
            Self::PositionedChildren => "positioned-children",
            Self::TwoDimensionalGrid => "two-dimensional-grid",
            Self::NoLayoutEvidence => "no-layout-evidence",
        }
    }
}

impl fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::TooFewChildren => "Fewer than two children",
            Self::TooManyChildren => "Too many children to analyze",
            Self::PositionedChildren => "Contains absolutely positioned children",
            Self::TwoDimensionalGrid => "Two-dimensional grids are not supported",
            Self::NoLayoutEvidence => "No flex, grid or stacking evidence",
        };
        f.write_str(message)
    }
}

/// What made a container a candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evidence {
    /// `display: flex` / `inline-flex`.
    Flex,
    /// Single-axis `display: grid`.
    Grid(LayoutDirection),
    /// Children stacked along one axis with small, non-negative gaps.
    Inferred {
        /// Stacking axis.
        direction: LayoutDirection,
        /// Mean measured gap.
        average_gap: f32,
    },
}

/// Run the candidacy checks in order, stopping at the first decline.
///
/// # Errors
///
/// Returns the [`DeclineReason`] when the container is not a candidate.
pub fn assess(
    container: &LayoutContainer<'_>,
    children: &[LayoutChild],
    config: &LayoutInferenceConfig,
) -> Result<Evidence, DeclineReason> {
    if children.len() < 2 {
        return Err(DeclineReason::TooFewChildren);
    }
    if children.len() > config.max_candidate_children {
        return Err(DeclineReason::TooManyChildren);
    }
    if children.iter().any(|c| c.position.is_out_of_flow()) {
        return Err(DeclineReason::PositionedChildren);
    }

    match container.style.display() {
        "flex" | "inline-flex" => return Ok(Evidence::Flex),
        "grid" | "inline-grid" => return grid_axis(container, children.len()).map(Evidence::Grid),
        _ => {}
    }

    for direction in [LayoutDirection::Vertical, LayoutDirection::Horizontal] {
        if let Some(average_gap) = stacked_gaps(children, direction, config) {
            return Ok(Evidence::Inferred {
                direction,
                average_gap,
            });
        }
    }
    Err(DeclineReason::NoLayoutEvidence)
}

fn track_count(value: &str) -> usize {
    let value = value.trim();
    if value.is_empty() || value == "none" {
        return 0;
    }
    split_top_level_whitespace(value)
        .into_iter()
        .filter(|t| !t.starts_with('['))
        .count()
}

/// A grid is single-axis when it has at most one column (items stack
/// vertically) or one row holding every item.
///
/// Track lists are counted rather than compared against `none`: resolved
/// `grid-template-rows` lists implicit tracks too, so a one-column grid
/// reports a row per item and still stacks vertically. The same holds for
/// columns of a one-row grid.
fn grid_axis(container: &LayoutContainer<'_>, children: usize) -> Result<LayoutDirection, DeclineReason> {
    let columns = track_count(container.style.value("grid-template-columns"));
    let rows = track_count(container.style.value("grid-template-rows"));
    let column_flow = container.style.value("grid-auto-flow").starts_with("column");
    if column_flow && rows <= 1 {
        return Ok(LayoutDirection::Horizontal);
    }
    if columns <= 1 {
        Ok(LayoutDirection::Vertical)
    } else if rows <= 1 && columns >= children {
        Ok(LayoutDirection::Horizontal)
    } else {
        Err(DeclineReason::TwoDimensionalGrid)
    }
}

/// Gaps between consecutive children along `direction`; negative values
/// mean overlap.
pub(crate) fn measured_gaps(children: &[LayoutChild], direction: LayoutDirection) -> Vec<f32> {
    children
        .windows(2)
        .map(|pair| match direction {
            LayoutDirection::Vertical => pair[1].rect.y - pair[0].rect.bottom(),
            LayoutDirection::Horizontal => pair[1].rect.x - pair[0].rect.right(),
        })
        .collect()
}

fn stacked_gaps(
    children: &[LayoutChild],
    direction: LayoutDirection,
    config: &LayoutInferenceConfig,
) -> Option<f32> {
    let gaps = measured_gaps(children, direction);
    // Tolerance absorbs rounding but never admits overlap.
    let low = (config.inferred_gap_range.start() - config.tolerance_px).max(0.0);
    let high = *config.inferred_gap_range.end();
    let in_range = gaps.iter().all(|gap| (low..=high).contains(gap));
    if !in_range {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let average = gaps.iter().sum::<f32>() / gaps.len() as f32;
    Some(average.max(0.0))
}
