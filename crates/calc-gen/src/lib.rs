#![deny(warnings)]

//! Value generation and aggregation.
//!
//! This crate provides:
//! - A shared seeded RNG ([`Roller`]) with the signed and unsigned draws
//! - Increase scaling by a Y percentage, rounded half away from zero
//! - Per-day generation over the whole slot grid
//! - Summation of generated days against initial totals

use calc_core::{signed, Category, DayResult, Grid, SlotParams};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, trace};

/// The one RNG used for every draw. Seeded once, never reseeded.
#[derive(Clone, Debug)]
pub struct Roller {
    seed: u64,
    rng: ChaCha8Rng,
}

impl Roller {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Seed from the thread RNG; the chosen seed is kept for reporting.
    pub fn from_entropy() -> Self {
        Self::from_seed(rand::thread_rng().next_u64())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform integer in `[1, max]`. `max` below 1 is treated as 1.
    pub fn draw_plus(&mut self, max: i64) -> i64 {
        self.rng.gen_range(1..=max.max(1))
    }

    /// Like [`Roller::draw_plus`], then negated when a `[1, 3]` draw lands on 1.
    pub fn draw_signed(&mut self, max: i64) -> i64 {
        let v = self.draw_plus(max);
        if self.rng.gen_range(1..=3) == 1 {
            -v
        } else {
            v
        }
    }

    /// Raw draw for a slot's parameters.
    pub fn draw(&mut self, params: &SlotParams) -> i64 {
        if params.use_sign {
            self.draw_signed(params.max_value)
        } else {
            self.draw_plus(params.max_value)
        }
    }
}

/// Scale `raw` by `y_percent`: `raw + |raw| * y / 100`, rounded to the nearest
/// integer with ties away from zero.
///
/// The increase is taken from `|raw|`, so a positive Y moves a negative raw
/// value toward zero: `-10` at 25% is `-7.5`, which rounds to `-8`, not `-13`.
///
/// Example:
/// assert_eq!(apply_increase(10, 25.0), 13);
/// assert_eq!(apply_increase(-10, 25.0), -8);
pub fn apply_increase(raw: i64, y_percent: f64) -> i64 {
    let x = raw as f64;
    let scaled = x + x.abs() * (y_percent / 100.0);
    // f64::round is half-away-from-zero; NaN maps to 0 in the cast.
    scaled.round().clamp(i64::MIN as f64, i64::MAX as f64) as i64
}

/// Generate one [`DayResult`] per day over the whole grid.
///
/// Slots with `max_value < 1` are clamped to 1 in place first. Within a day,
/// Military slots are drawn before Economy slots, each in index order.
pub fn generate(grid: &mut Grid, roller: &mut Roller) -> Vec<DayResult> {
    let clamped = grid.clamp_max_values();
    let mut results = Vec::with_capacity(grid.days());
    for day in 0..grid.days() {
        let mut result = DayResult::new(day + 1);
        for category in Category::ALL {
            for slot in grid.slots(category) {
                let raw = roller.draw(&slot.params);
                let value = if slot.params.use_increase {
                    let y = slot.cell(day).unwrap_or(0.0);
                    apply_increase(raw, y)
                } else {
                    raw
                };
                trace!(day = day + 1, slot = %slot.title(), raw, value, "drawn");
                result.push(category, value);
            }
        }
        results.push(result);
    }
    info!(
        days = grid.days(),
        military = grid.slot_count(Category::Military),
        economy = grid.slot_count(Category::Economy),
        clamped,
        "generated"
    );
    results
}

/// Initial, generated and final amounts for one category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub initial: i64,
    pub delta: i64,
    pub final_total: i64,
}

impl CategoryTotal {
    pub fn new(initial: i64, delta: i64) -> Self {
        Self {
            initial,
            delta,
            final_total: initial.saturating_add(delta),
        }
    }
}

impl fmt::Display for CategoryTotal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} + {} = {}",
            signed(self.initial),
            signed(self.delta),
            signed(self.final_total)
        )
    }
}

/// Final totals for both categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SumReport {
    pub military: CategoryTotal,
    pub economy: CategoryTotal,
}

impl SumReport {
    pub fn total(&self, category: Category) -> &CategoryTotal {
        match category {
            Category::Military => &self.military,
            Category::Economy => &self.economy,
        }
    }
}

impl fmt::Display for SumReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Military total = {}    /    Economy total = {}",
            self.military, self.economy
        )
    }
}

/// Sum generated values per category on top of the initial totals.
/// Returns `None` when nothing has been generated. Sums saturate at the
/// `i64` bounds.
pub fn tally(results: &[DayResult], init_military: i64, init_economy: i64) -> Option<SumReport> {
    if results.is_empty() {
        return None;
    }
    let add_m = results
        .iter()
        .map(DayResult::military_sum)
        .fold(0i64, i64::saturating_add);
    let add_e = results
        .iter()
        .map(DayResult::economy_sum)
        .fold(0i64, i64::saturating_add);
    let report = SumReport {
        military: CategoryTotal::new(init_military, add_m),
        economy: CategoryTotal::new(init_economy, add_e),
    };
    info!(
        military = report.military.final_total,
        economy = report.economy.final_total,
        "summed"
    );
    Some(report)
}
