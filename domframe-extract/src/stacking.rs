//! Sibling paint order.
//!
//! One stable sort keyed by `(effective z, source order)`. Flow elements
//! have effective z 0, so they keep source order and interleave with
//! positioned siblings according to their z-index.

use domframe_core::StyleSnapshot;

/// Effective z-index of an element inside its parent's stacking context.
///
/// `z-index` applies to positioned elements and to flex/grid items; every
/// other element paints at 0.
#[must_use]
pub fn effective_z(style: &StyleSnapshot, parent_display: &str) -> i32 {
    let applies = style.position().is_positioned() || is_flex_or_grid(parent_display);
    if applies {
        style.z_index().unwrap_or(0)
    } else {
        0
    }
}

fn is_flex_or_grid(display: &str) -> bool {
    matches!(display.trim(), "flex" | "inline-flex" | "grid" | "inline-grid")
}

/// Stable sort by `(z, source order)`.
///
/// `key` returns the effective z and the source position of each item.
pub fn sort_by_stacking<T>(items: &mut [T], key: impl Fn(&T) -> (i32, usize)) {
    items.sort_by_key(key);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(pairs: &[(&str, &str)]) -> StyleSnapshot {
        StyleSnapshot::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_z_ignored_for_static_blocks() {
        assert_eq!(effective_z(&style(&[("z-index", "5")]), "block"), 0);
        assert_eq!(
            effective_z(&style(&[("z-index", "5"), ("position", "relative")]), "block"),
            5
        );
    }

    #[test]
    fn test_z_applies_to_flex_items() {
        assert_eq!(effective_z(&style(&[("z-index", "3")]), "flex"), 3);
        assert_eq!(effective_z(&style(&[("z-index", "auto")]), "grid"), 0);
    }

    #[test]
    fn test_unified_sort_interleaves_positioning_contexts() {
        // (name, z, source order)
        let mut items = vec![
            ("flow-a", 0, 0),
            ("abs-top", 10, 1),
            ("flow-b", 0, 2),
            ("abs-below", -1, 3),
            ("rel-same", 0, 4),
        ];
        sort_by_stacking(&mut items, |(_, z, order)| (*z, *order));
        let names: Vec<&str> = items.iter().map(|(n, _, _)| *n).collect();
        assert_eq!(names, ["abs-below", "flow-a", "flow-b", "rel-same", "abs-top"]);
    }
}
