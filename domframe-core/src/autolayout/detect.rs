//! Phase 2: derive an auto-layout configuration from the evidence.

use super::candidacy::Evidence;
use super::{Alignment, AutoLayoutConfig, LayoutChild, LayoutContainer, LayoutDirection, LayoutSource};
use crate::style::{parse_px, StyleSnapshot};

/// Detected configuration plus facts validation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Detected {
    /// The configuration to validate.
    pub config: AutoLayoutConfig,
    /// `justify-content` had no equivalent alignment.
    pub unsupported_justify: bool,
}

/// Build the configuration for a candidate container.
#[must_use]
pub fn detect(container: &LayoutContainer<'_>, children: &[LayoutChild], evidence: Evidence) -> Detected {
    let style = container.style;
    let padding = container.border.add(&container.padding);
    match evidence {
        Evidence::Flex => {
            let flex_direction = style.value("flex-direction");
            let direction = if flex_direction.is_empty() || flex_direction.starts_with("row") {
                LayoutDirection::Horizontal
            } else {
                LayoutDirection::Vertical
            };
            let (primary_align, unsupported_justify) = justify(style.value("justify-content"));
            let (counter_align, stretch_children) = align_items(style.value("align-items"));
            Detected {
                config: AutoLayoutConfig {
                    source: LayoutSource::Flex,
                    direction,
                    spacing: gap(style, direction),
                    padding,
                    primary_align,
                    counter_align,
                    stretch_children,
                    wrap: style.value("flex-wrap").starts_with("wrap"),
                },
                unsupported_justify,
            }
        }
        Evidence::Grid(direction) => {
            // The counter axis of a vertical grid is the inline axis.
            let counter = match direction {
                LayoutDirection::Vertical => style.value("justify-items"),
                LayoutDirection::Horizontal => style.value("align-items"),
            };
            let (counter_align, stretch_children) = align_items(counter);
            let (primary_align, unsupported_justify) = justify(match direction {
                LayoutDirection::Vertical => style.value("align-content"),
                LayoutDirection::Horizontal => style.value("justify-content"),
            });
            Detected {
                config: AutoLayoutConfig {
                    source: LayoutSource::Grid,
                    direction,
                    spacing: gap(style, direction),
                    padding,
                    primary_align,
                    counter_align,
                    stretch_children,
                    wrap: false,
                },
                unsupported_justify,
            }
        }
        Evidence::Inferred {
            direction,
            average_gap,
        } => {
            let (counter_align, stretch_children) = measured_counter_alignment(container, children, direction);
            Detected {
                config: AutoLayoutConfig {
                    source: LayoutSource::Inferred,
                    direction,
                    spacing: (average_gap * 10.0).round() / 10.0,
                    padding,
                    primary_align: Alignment::Min,
                    counter_align,
                    stretch_children,
                    wrap: false,
                },
                unsupported_justify: false,
            }
        }
    }
}

fn gap(style: &StyleSnapshot, direction: LayoutDirection) -> f32 {
    let (axis_property, shorthand_index) = match direction {
        LayoutDirection::Horizontal => ("column-gap", 1),
        LayoutDirection::Vertical => ("row-gap", 0),
    };
    if let Some(px) = style.get(axis_property).and_then(parse_px) {
        return px.max(0.0);
    }
    // `gap: <row> <column>`, a single value applies to both.
    let tokens: Vec<&str> = style.value("gap").split_whitespace().collect();
    tokens
        .get(shorthand_index)
        .or_else(|| tokens.first())
        .and_then(|t| parse_px(t))
        .unwrap_or(0.0)
        .max(0.0)
}

/// Map `justify-content`; the flag is set when no alignment matches.
fn justify(value: &str) -> (Alignment, bool) {
    match value.trim() {
        "" | "normal" | "flex-start" | "start" | "left" | "stretch" => (Alignment::Min, false),
        "center" => (Alignment::Center, false),
        "flex-end" | "end" | "right" => (Alignment::Max, false),
        "space-between" => (Alignment::SpaceBetween, false),
        _ => (Alignment::Min, true),
    }
}

/// Map `align-items` (or `justify-items`) to an alignment and stretch flag.
fn align_items(value: &str) -> (Alignment, bool) {
    match value.trim() {
        "flex-start" | "start" | "self-start" | "left" => (Alignment::Min, false),
        "center" => (Alignment::Center, false),
        "flex-end" | "end" | "self-end" | "right" => (Alignment::Max, false),
        "baseline" | "first baseline" | "last baseline" => (Alignment::Baseline, false),
        _ => (Alignment::Min, true),
    }
}

/// Counter-axis alignment read off the measured children.
fn measured_counter_alignment(
    container: &LayoutContainer<'_>,
    children: &[LayoutChild],
    direction: LayoutDirection,
) -> (Alignment, bool) {
    let content = container.content_box();
    let (start, extent) = match direction {
        LayoutDirection::Vertical => (content.x, content.width),
        LayoutDirection::Horizontal => (content.y, content.height),
    };
    let spans: Vec<(f32, f32)> = children
        .iter()
        .map(|c| match direction {
            LayoutDirection::Vertical => (c.rect.x - c.margin.left, c.rect.width + c.margin.horizontal()),
            LayoutDirection::Horizontal => (c.rect.y - c.margin.top, c.rect.height + c.margin.vertical()),
        })
        .collect();

    let near = |a: f32, b: f32| (a - b).abs() <= 1.0;
    if spans.iter().all(|(s, size)| near(*s, start) && near(*size, extent)) {
        (Alignment::Min, true)
    } else if spans.iter().all(|(s, _)| near(*s, start)) {
        (Alignment::Min, false)
    } else if spans.iter().all(|(s, size)| near(s + size / 2.0, start + extent / 2.0)) {
        (Alignment::Center, false)
    } else if spans.iter().all(|(s, size)| near(s + size, start + extent)) {
        (Alignment::Max, false)
    } else {
        (Alignment::Min, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Rect, Sides};

    fn container(style: &StyleSnapshot) -> LayoutContainer<'_> {
        LayoutContainer {
            style,
            border_box: Rect::new(0.0, 0.0, 200.0, 100.0),
            border: Sides::uniform(1.0),
            padding: Sides::uniform(4.0),
        }
    }

    #[test]
    fn test_flex_column_mapping() {
        let style = StyleSnapshot::from_pairs([
            ("display", "flex"),
            ("flex-direction", "column"),
            ("row-gap", "12px"),
            ("justify-content", "space-between"),
            ("align-items", "center"),
            ("flex-wrap", "nowrap"),
        ]);
        let detected = detect(&container(&style), &[], Evidence::Flex);
        let config = detected.config;
        assert_eq!(config.direction, LayoutDirection::Vertical);
        assert_eq!(config.spacing, 12.0);
        assert_eq!(config.primary_align, Alignment::SpaceBetween);
        assert_eq!(config.counter_align, Alignment::Center);
        assert!(!config.stretch_children);
        assert!(!config.wrap);
        assert_eq!(config.padding, Sides::uniform(5.0));
    }

    #[test]
    fn test_gap_shorthand_and_unsupported_justify() {
        let style = StyleSnapshot::from_pairs([
            ("display", "flex"),
            ("gap", "4px 10px"),
            ("justify-content", "space-evenly"),
            ("flex-wrap", "wrap"),
        ]);
        let detected = detect(&container(&style), &[], Evidence::Flex);
        assert_eq!(detected.config.direction, LayoutDirection::Horizontal);
        assert_eq!(detected.config.spacing, 10.0);
        assert!(detected.config.stretch_children);
        assert!(detected.config.wrap);
        assert!(detected.unsupported_justify);
    }

    #[test]
    fn test_inferred_list_reads_counter_alignment() {
        let style = StyleSnapshot::default();
        let children = [
            LayoutChild::new(Rect::new(5.0, 5.0, 190.0, 20.0)),
            LayoutChild::new(Rect::new(5.0, 25.0, 190.0, 20.0)),
        ];
        let detected = detect(
            &container(&style),
            &children,
            Evidence::Inferred {
                direction: LayoutDirection::Vertical,
                average_gap: 0.0,
            },
        );
        assert_eq!(detected.config.source, LayoutSource::Inferred);
        assert!(detected.config.stretch_children);
        assert_eq!(detected.config.counter_align, Alignment::Min);
    }
}
