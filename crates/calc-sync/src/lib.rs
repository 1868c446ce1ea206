#![deny(warnings)]

//! Y synchronization across the slot grid.
//!
//! Every Y write goes through [`SyncController::write`], which stores the
//! value and then fans it out to the dependent cells in a single flat loop.
//! Fan-out writes go straight to the grid and never fan out again, so a write
//! is non-reentrant without any guard flag.
//!
//! Two modes exist:
//! - pair sync mirrors a cell to the same slot index and day in the other
//!   category;
//! - global sync mirrors a cell to every slot of both categories on the same
//!   day, and takes priority over pair sync when both are on.

use calc_core::{Category, CellKey, Grid};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which synchronization modes are enabled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncModes {
    /// Military slot `i` <-> Economy slot `i`, same day.
    pub pair: bool,
    /// Every slot of both categories, same day.
    pub global: bool,
}

impl SyncModes {
    pub fn any(self) -> bool {
        self.pair || self.global
    }
}

/// Result of a Y write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    /// The addressed cell exists and its value changed.
    pub changed: bool,
    /// Number of other cells whose value changed through fan-out.
    pub propagated: usize,
}

/// Owns the sync mode flags and routes all Y writes.
#[derive(Clone, Debug, Default)]
pub struct SyncController {
    modes: SyncModes,
}

impl SyncController {
    pub fn new(modes: SyncModes) -> Self {
        Self { modes }
    }

    pub fn modes(&self) -> SyncModes {
        self.modes
    }

    /// Toggle pair sync. Turning the mode on or off re-applies
    /// synchronization to the whole grid. Returns whether the flag changed.
    pub fn set_pair(&mut self, grid: &mut Grid, on: bool) -> bool {
        if self.modes.pair == on {
            return false;
        }
        self.modes.pair = on;
        debug!(on, "pair sync toggled");
        self.apply_initial(grid);
        true
    }

    /// Toggle global sync; see [`SyncController::set_pair`].
    pub fn set_global(&mut self, grid: &mut Grid, on: bool) -> bool {
        if self.modes.global == on {
            return false;
        }
        self.modes.global = on;
        debug!(on, "global sync toggled");
        self.apply_initial(grid);
        true
    }

    /// Cells that a change at `origin` fans out to, excluding `origin`.
    pub fn targets(&self, grid: &Grid, origin: CellKey) -> Vec<CellKey> {
        if self.modes.global {
            return grid
                .keys_on_day(origin.day)
                .into_iter()
                .filter(|&k| k != origin)
                .collect();
        }
        if self.modes.pair {
            let other = origin.category.opposite();
            if origin.slot < grid.slot_count(other) && origin.day < grid.days() {
                return vec![CellKey::new(other, origin.slot, origin.day)];
            }
        }
        Vec::new()
    }

    /// Write `value` at `key` and fan it out under the active mode.
    ///
    /// Nothing propagates when `key` does not exist or the stored value is
    /// already equal to `value`.
    pub fn write(&self, grid: &mut Grid, key: CellKey, value: f64) -> WriteOutcome {
        if !grid.set(key, value) {
            return WriteOutcome::default();
        }
        let mut propagated = 0;
        for target in self.targets(grid, key) {
            if grid.set(target, value) {
                propagated += 1;
            }
        }
        debug!(?key, value, propagated, "y written");
        WriteOutcome {
            changed: true,
            propagated,
        }
    }

    /// Bring the whole grid in line with the active mode.
    ///
    /// Global sync copies Military slot 0's value for each day (0.0 when
    /// there are no Military slots) to every cell on that day. Pair sync
    /// copies Military slot `i` onto Economy slot `i` for every index both
    /// categories have. With neither mode on this does nothing. Returns the
    /// number of cells that changed.
    pub fn apply_initial(&self, grid: &mut Grid) -> usize {
        if !self.modes.any() {
            return 0;
        }
        let mut changed = 0;
        for day in 0..grid.days() {
            if self.modes.global {
                let base = grid
                    .get(CellKey::new(Category::Military, 0, day))
                    .unwrap_or(0.0);
                for key in grid.keys_on_day(day) {
                    if grid.set(key, base) {
                        changed += 1;
                    }
                }
            } else {
                let n = grid
                    .slot_count(Category::Military)
                    .min(grid.slot_count(Category::Economy));
                for slot in 0..n {
                    let Some(base) = grid.get(CellKey::new(Category::Military, slot, day)) else {
                        continue;
                    };
                    if grid.set(CellKey::new(Category::Economy, slot, day), base) {
                        changed += 1;
                    }
                }
            }
        }
        debug!(modes = ?self.modes, changed, "sync re-applied");
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calc_core::CalcConfig;
    use proptest::prelude::*;

    fn grid(days: usize, military: usize, economy: usize) -> Grid {
        CalcConfig {
            initial_days: days,
            initial_military: military,
            initial_economy: economy,
            rng_seed: None,
        }
        .build_grid()
    }

    fn key(category: Category, slot: usize, day: usize) -> CellKey {
        CellKey::new(category, slot, day)
    }

    fn snapshot(g: &Grid) -> Vec<f64> {
        g.iter_slots().flat_map(|s| s.cells().to_vec()).collect()
    }

    #[test]
    fn no_modes_touches_only_target() {
        let mut g = grid(2, 2, 2);
        let sync = SyncController::default();
        let out = sync.write(&mut g, key(Category::Military, 1, 1), 40.0);
        assert_eq!(
            out,
            WriteOutcome {
                changed: true,
                propagated: 0
            }
        );
        let expected = vec![0.0, 0.0, 0.0, 40.0, 0.0, 0.0, 0.0, 0.0];
        assert_eq!(snapshot(&g), expected);
    }

    #[test]
    fn pair_sync_mirrors_both_directions() {
        let mut g = grid(2, 2, 2);
        let sync = SyncController::new(SyncModes {
            pair: true,
            global: false,
        });
        sync.write(&mut g, key(Category::Military, 1, 0), 25.0);
        assert_eq!(g.get(key(Category::Economy, 1, 0)), Some(25.0));
        assert_eq!(g.get(key(Category::Economy, 0, 0)), Some(0.0));
        assert_eq!(g.get(key(Category::Military, 1, 1)), Some(0.0));

        sync.write(&mut g, key(Category::Economy, 0, 1), -10.0);
        assert_eq!(g.get(key(Category::Military, 0, 1)), Some(-10.0));
        assert_eq!(g.get(key(Category::Military, 1, 1)), Some(0.0));
    }

    #[test]
    fn pair_sync_skips_missing_partner() {
        let mut g = grid(1, 3, 1);
        let sync = SyncController::new(SyncModes {
            pair: true,
            global: false,
        });
        let out = sync.write(&mut g, key(Category::Military, 2, 0), 5.0);
        assert!(out.changed);
        assert_eq!(out.propagated, 0);
        assert_eq!(g.get(key(Category::Economy, 0, 0)), Some(0.0));
    }

    #[test]
    fn global_supersedes_pair() {
        let mut g = grid(3, 2, 3);
        let sync = SyncController::new(SyncModes {
            pair: true,
            global: true,
        });
        let out = sync.write(&mut g, key(Category::Economy, 2, 1), 12.5);
        assert_eq!(out.propagated, 4);
        for s in g.iter_slots() {
            assert_eq!(s.cells(), &[0.0, 12.5, 0.0]);
        }
    }

    #[test]
    fn unchanged_and_missing_writes_do_not_propagate() {
        let mut g = grid(1, 1, 1);
        let sync = SyncController::new(SyncModes {
            pair: true,
            global: false,
        });
        assert_eq!(
            sync.write(&mut g, key(Category::Military, 0, 0), 0.0),
            WriteOutcome::default()
        );
        assert_eq!(
            sync.write(&mut g, key(Category::Military, 5, 0), 3.0),
            WriteOutcome::default()
        );
        assert_eq!(snapshot(&g), vec![0.0, 0.0]);
    }

    #[test]
    fn writes_keep_propagating_after_many_edits() {
        let mut g = grid(2, 2, 2);
        let mut sync = SyncController::default();
        sync.set_pair(&mut g, true);
        sync.set_global(&mut g, true);
        sync.write(&mut g, key(Category::Military, 0, 0), 1.0);
        sync.set_global(&mut g, false);
        sync.write(&mut g, key(Category::Military, 1, 1), 2.0);
        assert_eq!(g.get(key(Category::Economy, 1, 1)), Some(2.0));
        assert_eq!(g.get(key(Category::Economy, 0, 1)), Some(0.0));
    }

    #[test]
    fn enabling_global_uses_first_military_slot() {
        let mut g = grid(2, 2, 2);
        g.set(key(Category::Military, 0, 0), 10.0);
        g.set(key(Category::Military, 1, 0), 99.0);
        g.set(key(Category::Economy, 1, 1), 7.0);
        let mut sync = SyncController::default();
        assert!(sync.set_global(&mut g, true));
        assert!(!sync.set_global(&mut g, true));
        for s in g.iter_slots() {
            assert_eq!(s.cells(), &[10.0, 0.0]);
        }
    }

    #[test]
    fn enabling_global_without_military_zeroes_day() {
        let mut g = grid(1, 0, 2);
        g.set(key(Category::Economy, 0, 0), 4.0);
        g.set(key(Category::Economy, 1, 0), 8.0);
        let mut sync = SyncController::default();
        sync.set_global(&mut g, true);
        assert_eq!(snapshot(&g), vec![0.0, 0.0]);
    }

    #[test]
    fn enabling_pair_copies_military_onto_economy() {
        let mut g = grid(2, 3, 2);
        g.set(key(Category::Military, 0, 1), 3.0);
        g.set(key(Category::Military, 2, 0), 9.0);
        g.set(key(Category::Economy, 1, 0), 6.0);
        let mut sync = SyncController::default();
        sync.set_pair(&mut g, true);
        assert_eq!(g.get(key(Category::Economy, 0, 1)), Some(3.0));
        assert_eq!(g.get(key(Category::Economy, 1, 0)), Some(0.0));
        // Military slot 2 has no partner and keeps its own value.
        assert_eq!(g.get(key(Category::Military, 2, 0)), Some(9.0));
    }

    #[test]
    fn apply_initial_without_modes_is_noop() {
        let mut g = grid(2, 1, 1);
        g.set(key(Category::Economy, 0, 0), 5.0);
        assert_eq!(SyncController::default().apply_initial(&mut g), 0);
        assert_eq!(g.get(key(Category::Economy, 0, 0)), Some(5.0));
    }

    proptest! {
        #[test]
        fn global_write_only_touches_its_day(
            m in 1usize..6, e in 0usize..6, days in 1usize..6,
            pick in 0usize..100, day_pick in 0usize..100, v in 1.0f64..200.0,
        ) {
            let mut g = grid(days, m, e);
            let sync = SyncController::new(SyncModes { pair: true, global: true });
            let total = m + e;
            let slot = pick % total;
            let (cat, idx) = if slot < m { (Category::Military, slot) } else { (Category::Economy, slot - m) };
            let day = day_pick % days;
            sync.write(&mut g, key(cat, idx, day), v);
            for s in g.iter_slots() {
                for (d, &c) in s.cells().iter().enumerate() {
                    if d == day {
                        prop_assert_eq!(c, v);
                    } else {
                        prop_assert_eq!(c, 0.0);
                    }
                }
            }
        }

        #[test]
        fn pair_write_touches_at_most_two_cells(
            m in 0usize..5, e in 0usize..5, slot in 0usize..5, v in 1.0f64..100.0,
        ) {
            let mut g = grid(2, m, e);
            let sync = SyncController::new(SyncModes { pair: true, global: false });
            sync.write(&mut g, key(Category::Economy, slot, 1), v);
            let touched = snapshot(&g).into_iter().filter(|&c| c != 0.0).count();
            let expected = usize::from(slot < e) + usize::from(slot < e && slot < m);
            prop_assert_eq!(touched, expected);
        }
    }
}
