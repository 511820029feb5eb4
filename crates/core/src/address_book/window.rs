//! Error-aware virtualized window over the address list.
//!
//! Rendering stays decoupled from any UI technology: the window answers
//! "which indices are near the viewport" from per-entry height estimates
//! and tracks which entries have been materialized so far. An entry that
//! currently fails postal validation renders its inline error and is
//! estimated taller.

use std::collections::BTreeSet;
use std::ops::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeightEstimate {
    /// Estimated pixel height of a clean entry row.
    pub base: u32,
    /// Extra pixels when the entry shows a postal-code error.
    pub error_extra: u32,
}

impl Default for HeightEstimate {
    fn default() -> Self {
        Self { base: 72, error_extra: 28 }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AddressWindow {
    estimate: HeightEstimate,
    overscan: usize,
    heights: Vec<u32>,
    offsets: Vec<u64>,
    materialized: BTreeSet<usize>,
}

impl AddressWindow {
    pub fn new(estimate: HeightEstimate, overscan: usize) -> Self {
        Self { estimate, overscan, ..Self::default() }
    }

    /// Rebuilds height estimates from the book's current error flags
    /// (one flag per entry, in order). Indices past the new length lose
    /// their materialized state.
    pub fn sync(&mut self, postal_error_flags: &[bool]) {
        self.heights = postal_error_flags
            .iter()
            .map(|has_error| {
                if *has_error {
                    self.estimate.base + self.estimate.error_extra
                } else {
                    self.estimate.base
                }
            })
            .collect();

        self.offsets.clear();
        self.offsets.reserve(self.heights.len() + 1);
        let mut running = 0u64;
        self.offsets.push(0);
        for height in &self.heights {
            running += u64::from(*height);
            self.offsets.push(running);
        }

        let len = self.heights.len();
        self.materialized.retain(|index| *index < len);
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    pub fn total_height(&self) -> u64 {
        self.offsets.last().copied().unwrap_or(0)
    }

    pub fn offset_of(&self, index: usize) -> Option<u64> {
        (index < self.heights.len()).then(|| self.offsets[index])
    }

    /// Indices whose rows intersect the viewport, widened by the overscan
    /// on both sides.
    pub fn visible_range(&self, scroll_top: u64, viewport_height: u64) -> Range<usize> {
        if self.heights.is_empty() {
            return 0..0;
        }

        // First row whose bottom edge is below the top of the viewport.
        let first = self.offsets[1..].partition_point(|bottom| *bottom <= scroll_top);
        // First row starting at or below the bottom of the viewport.
        let viewport_bottom = scroll_top.saturating_add(viewport_height);
        let last = self.offsets[..self.heights.len()]
            .partition_point(|top| *top < viewport_bottom);

        let start = first.saturating_sub(self.overscan);
        let end = (last + self.overscan).min(self.heights.len());
        start..end.max(start)
    }

    /// Marks a range materialized, returning only the indices that were
    /// not already built. Scrolling therefore materializes incrementally.
    pub fn materialize(&mut self, range: Range<usize>) -> Vec<usize> {
        let mut fresh = Vec::new();
        for index in range {
            if index < self.heights.len() && self.materialized.insert(index) {
                fresh.push(index);
            }
        }
        fresh
    }

    pub fn is_materialized(&self, index: usize) -> bool {
        self.materialized.contains(&index)
    }

    pub fn materialized_count(&self) -> usize {
        self.materialized.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{AddressWindow, HeightEstimate};

    fn window_with(flags: &[bool]) -> AddressWindow {
        let mut window = AddressWindow::new(HeightEstimate { base: 100, error_extra: 50 }, 1);
        window.sync(flags);
        window
    }

    #[test]
    fn entries_with_errors_are_estimated_taller() {
        let window = window_with(&[false, true, false]);
        assert_eq!(window.total_height(), 350);
        assert_eq!(window.offset_of(1), Some(100));
        assert_eq!(window.offset_of(2), Some(250));
    }

    #[test]
    fn visible_range_only_covers_rows_near_the_viewport() {
        let flags = vec![false; 100];
        let window = window_with(&flags);

        // Viewport shows rows 5..=7; overscan of 1 widens to 4..=8.
        let range = window.visible_range(500, 250);
        assert_eq!(range, 4..9);
    }

    #[test]
    fn error_rows_shift_what_is_visible() {
        let mut flags = vec![false; 10];
        flags[0] = true;

        let plain = window_with(&[false; 10]);
        let with_error = window_with(&flags);

        // Row 0 grew, so the same scroll offset lands on earlier rows.
        assert_eq!(plain.visible_range(300, 100), 2..5);
        assert_eq!(with_error.visible_range(300, 100), 1..5);
    }

    #[test]
    fn materialization_is_incremental_across_scrolls() {
        let mut window = window_with(&[false; 20]);

        let first = window.materialize(0..5);
        assert_eq!(first, vec![0, 1, 2, 3, 4]);

        let second = window.materialize(3..8);
        assert_eq!(second, vec![5, 6, 7]);
        assert_eq!(window.materialized_count(), 8);
        assert!(window.is_materialized(4));
        assert!(!window.is_materialized(9));
    }

    #[test]
    fn sync_drops_materialized_state_past_the_new_length() {
        let mut window = window_with(&[false; 6]);
        window.materialize(0..6);

        window.sync(&[false; 3]);
        assert_eq!(window.materialized_count(), 3);
        assert_eq!(window.total_height(), 300);
    }

    #[test]
    fn empty_window_has_an_empty_range() {
        let window = window_with(&[]);
        assert_eq!(window.visible_range(0, 500), 0..0);
        assert_eq!(window.total_height(), 0);
    }
}
