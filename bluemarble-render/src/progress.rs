use std::collections::HashMap;

use bluemarble_core::TileCoords;

use crate::stats::TileStats;

/// Latest statistics for every remote tile processed so far, with running
/// totals kept in step on every insert or overwrite.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    tiles: HashMap<TileCoords, TileStats>,
    totals: TileStats,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `stats` for `tile`, replacing (not merging) any earlier entry.
    /// Returns the replaced entry.
    pub fn record(&mut self, tile: TileCoords, stats: TileStats) -> Option<TileStats> {
        let previous = self.tiles.insert(tile, stats);
        if let Some(old) = previous {
            self.totals.painted -= old.painted;
            self.totals.required -= old.required;
            self.totals.wrong -= old.wrong;
        }
        self.totals += stats;
        previous
    }

    pub fn get(&self, tile: TileCoords) -> Option<TileStats> {
        self.tiles.get(&tile).copied()
    }

    /// Sum over all recorded tiles.
    pub fn totals(&self) -> TileStats {
        self.totals
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Totals as reported to the user.
    ///
    /// `template_required` is the sum of the templates' precomputed required
    /// counts; when it is zero the per-tile required sum is used instead. The
    /// reported wrong count is `required − painted`, not the summed wrong
    /// counter, so unpainted pixels on tiles not yet seen are included.
    pub fn report(&self, template_required: u64) -> ProgressReport {
        let required = if template_required > 0 {
            template_required
        } else {
            self.totals.required
        };
        ProgressReport {
            painted: self.totals.painted,
            required,
            wrong: required.saturating_sub(self.totals.painted),
            tiles_seen: self.tiles.len(),
        }
    }
}

/// Aggregate progress across all tiles seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressReport {
    pub painted: u64,
    pub required: u64,
    pub wrong: u64,
    pub tiles_seen: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(painted: u64, required: u64, wrong: u64) -> TileStats {
        TileStats { painted, required, wrong }
    }

    #[test]
    fn totals_sum_distinct_tiles() {
        let mut tracker = ProgressTracker::new();
        tracker.record(TileCoords::new(0, 0), stats(1, 4, 2));
        tracker.record(TileCoords::new(0, 1), stats(3, 5, 1));
        assert_eq!(tracker.totals(), stats(4, 9, 3));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn reprocessing_a_tile_overwrites() {
        let mut tracker = ProgressTracker::new();
        let tile = TileCoords::new(7, 7);
        tracker.record(tile, stats(1, 4, 2));
        let previous = tracker.record(tile, stats(4, 4, 0));
        assert_eq!(previous, Some(stats(1, 4, 2)));
        assert_eq!(tracker.totals(), stats(4, 4, 0));
        assert_eq!(tracker.get(tile), Some(stats(4, 4, 0)));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn report_prefers_template_required() {
        let mut tracker = ProgressTracker::new();
        tracker.record(TileCoords::new(0, 0), stats(3, 5, 1));
        let report = tracker.report(100);
        assert_eq!(report.required, 100);
        assert_eq!(report.painted, 3);
        assert_eq!(report.wrong, 97);
    }

    #[test]
    fn report_falls_back_to_tile_required() {
        let mut tracker = ProgressTracker::new();
        tracker.record(TileCoords::new(0, 0), stats(3, 5, 1));
        let report = tracker.report(0);
        assert_eq!(report.required, 5);
        assert_eq!(report.wrong, 2);
        assert_eq!(report.tiles_seen, 1);
    }

    #[test]
    fn empty_tracker_reports_zero() {
        let tracker = ProgressTracker::new();
        assert!(tracker.is_empty());
        assert_eq!(tracker.report(0), ProgressReport::default());
    }
}
