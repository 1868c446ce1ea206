#![deny(warnings)]

//! Calculator facade: the operations a presentation layer drives.
//!
//! [`Calculator`] owns the slot grid, the sync controller, the shared RNG and
//! the last generated results. All operations take `&mut self`, so a caller
//! that shares one calculator across threads must wrap the whole value in a
//! lock; no entity is ever observed mid-update.

use calc_core::{CalcConfig, Category, CellKey, DayResult, Grid, Slot, SlotField};
use calc_gen::{generate, tally, Roller, SumReport};
use calc_sync::{SyncController, SyncModes, WriteOutcome};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Status of the generate/sum cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Summary {
    /// Nothing generated yet, or reset since.
    NotGenerated,
    /// Results exist; sum not requested yet.
    Generated,
    /// Sum was requested with no results.
    GenerateFirst,
    /// Sum of the current results.
    Totals(SumReport),
}

impl Summary {
    pub fn report(&self) -> Option<&SumReport> {
        match self {
            Summary::Totals(r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Summary::NotGenerated => f.write_str("not generated"),
            Summary::Generated => f.write_str("generated (sum to finalize)"),
            Summary::GenerateFirst => f.write_str("generate first"),
            Summary::Totals(r) => write!(f, "{r}"),
        }
    }
}

/// The reactive calculator engine.
#[derive(Clone, Debug)]
pub struct Calculator {
    grid: Grid,
    sync: SyncController,
    roller: Roller,
    results: Vec<DayResult>,
    init_military: i64,
    init_economy: i64,
    summary: Summary,
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}

impl Calculator {
    /// Three days, one Military slot, one Economy slot, sync off.
    pub fn new() -> Self {
        Self::with_config(&CalcConfig::default())
    }

    pub fn with_config(cfg: &CalcConfig) -> Self {
        let roller = match cfg.rng_seed {
            Some(seed) => Roller::from_seed(seed),
            None => Roller::from_entropy(),
        };
        info!(
            days = cfg.initial_days,
            military = cfg.initial_military,
            economy = cfg.initial_economy,
            seed = roller.seed(),
            "calculator initialized"
        );
        Self {
            grid: cfg.build_grid(),
            sync: SyncController::default(),
            roller,
            results: Vec::new(),
            init_military: 0,
            init_economy: 0,
            summary: Summary::NotGenerated,
        }
    }

    // ---- structure ----

    /// Append a default slot and re-apply synchronization.
    pub fn add_slot(&mut self, category: Category) -> usize {
        let index = self.grid.add_slot(category);
        self.sync.apply_initial(&mut self.grid);
        index
    }

    /// Drop the last slot of `category`. No-op when the category is empty.
    pub fn remove_slot(&mut self, category: Category) -> bool {
        if !self.grid.remove_slot(category) {
            return false;
        }
        self.sync.apply_initial(&mut self.grid);
        true
    }

    /// Set the day count, clamped to at least 1. No-op when unchanged.
    pub fn set_day_count(&mut self, days: usize) -> bool {
        if !self.grid.set_days(days) {
            return false;
        }
        self.sync.apply_initial(&mut self.grid);
        true
    }

    pub fn days(&self) -> usize {
        self.grid.days()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn slots(&self, category: Category) -> &[Slot] {
        self.grid.slots(category)
    }

    // ---- sync ----

    pub fn set_sync_pair_mode(&mut self, on: bool) -> bool {
        self.sync.set_pair(&mut self.grid, on)
    }

    pub fn set_sync_global_mode(&mut self, on: bool) -> bool {
        self.sync.set_global(&mut self.grid, on)
    }

    pub fn sync_modes(&self) -> SyncModes {
        self.sync.modes()
    }

    // ---- edits ----

    /// Store a slot parameter as given. Returns `false` for an unknown slot
    /// or an unchanged value.
    pub fn set_slot_param(&mut self, category: Category, index: usize, field: SlotField) -> bool {
        let Some(slot) = self.grid.slot_mut(category, index) else {
            debug!(%category, index, "parameter for missing slot ignored");
            return false;
        };
        field.apply(&mut slot.params)
    }

    /// Edit one Y value; synchronization fans it out like any other change.
    pub fn set_cell_value(
        &mut self,
        category: Category,
        slot: usize,
        day: usize,
        value: f64,
    ) -> WriteOutcome {
        self.sync
            .write(&mut self.grid, CellKey::new(category, slot, day), value)
    }

    pub fn cell(&self, category: Category, slot: usize, day: usize) -> Option<f64> {
        self.grid.get(CellKey::new(category, slot, day))
    }

    pub fn set_initial_total(&mut self, category: Category, value: i64) {
        match category {
            Category::Military => self.init_military = value,
            Category::Economy => self.init_economy = value,
        }
    }

    pub fn initial_total(&self, category: Category) -> i64 {
        match category {
            Category::Military => self.init_military,
            Category::Economy => self.init_economy,
        }
    }

    // ---- generate / sum ----

    /// Replace the results with a fresh draw for every slot and day.
    pub fn generate(&mut self) {
        self.results = generate(&mut self.grid, &mut self.roller);
        self.summary = Summary::Generated;
    }

    pub fn results(&self) -> &[DayResult] {
        &self.results
    }

    /// Sum the current results into the summary.
    pub fn sum_all(&mut self) -> &Summary {
        self.summary = match tally(&self.results, self.init_military, self.init_economy) {
            Some(report) => Summary::Totals(report),
            None => Summary::GenerateFirst,
        };
        &self.summary
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    /// Clear results and summary. Slots, days and sync modes stay.
    pub fn reset(&mut self) {
        self.results.clear();
        self.summary = Summary::NotGenerated;
        debug!("results reset");
    }

    /// Seed of the shared RNG.
    pub fn seed(&self) -> u64 {
        self.roller.seed()
    }
}
