#![deny(warnings)]

//! Core data model for the war calculator.
//!
//! This crate defines the slot grid (two per-category slot sequences sharing a
//! day count), the per-day generation output, and the configuration types used
//! by the rest of the workspace. Every grid operation is permissive: invalid
//! input is clamped or ignored rather than rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Default upper bound for a freshly added slot's draw.
pub const DEFAULT_MAX_VALUE: i64 = 100;

/// Two Y values closer than this are considered equal; writing one over the
/// other is not a change.
pub const CELL_EPSILON: f64 = 1e-12;

/// Day count used when no configuration is given.
pub const DEFAULT_DAYS: usize = 3;

/// Slot category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Military strength slots.
    Military,
    /// Economic strength slots.
    Economy,
}

impl Category {
    /// Both categories in processing order.
    pub const ALL: [Category; 2] = [Category::Military, Category::Economy];

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            Category::Military => "Military",
            Category::Economy => "Economy",
        }
    }

    /// The other category.
    pub fn opposite(self) -> Category {
        match self {
            Category::Military => Category::Economy,
            Category::Economy => Category::Military,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "mil" | "military" => Ok(Category::Military),
            "e" | "eco" | "economy" => Ok(Category::Economy),
            other => Err(ParseError::UnknownCategory(other.to_string())),
        }
    }
}

/// Errors raised when turning user text into engine inputs.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    /// Category name is neither military nor economy.
    #[error("unknown category: {0}")]
    UnknownCategory(String),
    /// Slot field name is not one of max_value, use_sign, use_increase.
    #[error("unknown slot field: {0}")]
    UnknownField(String),
    /// Field value could not be parsed for the named field.
    #[error("invalid value {value:?} for {field}")]
    InvalidValue { field: String, value: String },
    /// Y value must be a finite number.
    #[error("non-finite Y value: {0}")]
    NonFinite(String),
}

/// Generator parameters of a single slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotParams {
    /// Upper bound of the draw. Values below 1 are clamped at generation time.
    pub max_value: i64,
    /// When set, one draw in three is negated.
    pub use_sign: bool,
    /// When set, the draw is scaled by the slot's Y percentage for that day.
    pub use_increase: bool,
}

impl Default for SlotParams {
    fn default() -> Self {
        Self {
            max_value: DEFAULT_MAX_VALUE,
            use_sign: true,
            use_increase: true,
        }
    }
}

/// A single slot parameter assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotField {
    MaxValue(i64),
    UseSign(bool),
    UseIncrease(bool),
}

impl SlotField {
    /// Parse a `field=value` pair, e.g. `("max_value", "50")`.
    pub fn parse(name: &str, value: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidValue {
            field: name.to_string(),
            value: value.to_string(),
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "max" | "max_value" => value
                .trim()
                .parse()
                .map(SlotField::MaxValue)
                .map_err(|_| invalid()),
            "sign" | "use_sign" => parse_flag(value)
                .map(SlotField::UseSign)
                .ok_or_else(invalid),
            "increase" | "use_increase" => {
                parse_flag(value).map(SlotField::UseIncrease).ok_or_else(invalid)
            }
            other => Err(ParseError::UnknownField(other.to_string())),
        }
    }

    /// Store the value into `params`. Returns whether anything changed.
    pub fn apply(self, params: &mut SlotParams) -> bool {
        match self {
            SlotField::MaxValue(v) => replace(&mut params.max_value, v),
            SlotField::UseSign(v) => replace(&mut params.use_sign, v),
            SlotField::UseIncrease(v) => replace(&mut params.use_increase, v),
        }
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// A generator line: parameters plus one Y percentage per day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    category: Category,
    index: usize,
    /// Generator parameters, editable in place.
    pub params: SlotParams,
    cells: Vec<f64>,
}

impl Slot {
    fn new(category: Category, index: usize, days: usize) -> Self {
        Self {
            category,
            index,
            params: SlotParams::default(),
            cells: vec![0.0; days.max(1)],
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// 0-based position within the category.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Display label, e.g. `Military 1`.
    pub fn title(&self) -> String {
        format!("{} {}", self.category.label(), self.index + 1)
    }

    /// Y percentages, one per day.
    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    pub fn cell(&self, day: usize) -> Option<f64> {
        self.cells.get(day).copied()
    }

    /// Grow with zeroes or truncate from the tail.
    fn ensure_days(&mut self, days: usize) {
        self.cells.resize(days.max(1), 0.0);
    }
}

/// Address of one Y value in the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellKey {
    pub category: Category,
    pub slot: usize,
    pub day: usize,
}

impl CellKey {
    pub fn new(category: Category, slot: usize, day: usize) -> Self {
        Self {
            category,
            slot,
            day,
        }
    }
}

/// The slot grid: Military and Economy slot sequences sharing one day count.
///
/// Invariants:
/// - `days >= 1`
/// - every slot holds exactly `days` cells
/// - slot indices within a category are `0..len` in order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    days: usize,
    military: Vec<Slot>,
    economy: Vec<Slot>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(DEFAULT_DAYS)
    }
}

impl Grid {
    /// Empty grid with `days` clamped to at least 1.
    pub fn new(days: usize) -> Self {
        Self {
            days: days.max(1),
            military: Vec::new(),
            economy: Vec::new(),
        }
    }

    pub fn days(&self) -> usize {
        self.days
    }

    pub fn slots(&self, category: Category) -> &[Slot] {
        match category {
            Category::Military => &self.military,
            Category::Economy => &self.economy,
        }
    }

    fn slots_vec_mut(&mut self, category: Category) -> &mut Vec<Slot> {
        match category {
            Category::Military => &mut self.military,
            Category::Economy => &mut self.economy,
        }
    }

    pub fn slot_count(&self, category: Category) -> usize {
        self.slots(category).len()
    }

    pub fn slot(&self, category: Category, index: usize) -> Option<&Slot> {
        self.slots(category).get(index)
    }

    pub fn slot_mut(&mut self, category: Category, index: usize) -> Option<&mut Slot> {
        self.slots_vec_mut(category).get_mut(index)
    }

    /// Iterate over every slot, Military first.
    pub fn iter_slots(&self) -> impl Iterator<Item = &Slot> {
        self.military.iter().chain(self.economy.iter())
    }

    /// Append a default slot to `category`; returns its index.
    pub fn add_slot(&mut self, category: Category) -> usize {
        let days = self.days;
        let index = self.slot_count(category);
        self.slots_vec_mut(category)
            .push(Slot::new(category, index, days));
        self.reindex(category);
        debug!(%category, index, "slot added");
        index
    }

    /// Drop the most recently added slot of `category`. No-op when empty.
    pub fn remove_slot(&mut self, category: Category) -> bool {
        if self.slots_vec_mut(category).pop().is_none() {
            return false;
        }
        self.reindex(category);
        debug!(%category, remaining = self.slot_count(category), "slot removed");
        true
    }

    fn reindex(&mut self, category: Category) {
        for (i, slot) in self.slots_vec_mut(category).iter_mut().enumerate() {
            slot.index = i;
        }
    }

    /// Resize every slot to `days` (clamped to at least 1). Returns whether the
    /// day count changed.
    pub fn set_days(&mut self, days: usize) -> bool {
        let days = days.max(1);
        if days == self.days {
            return false;
        }
        let from = self.days;
        self.days = days;
        for slot in self.military.iter_mut().chain(self.economy.iter_mut()) {
            slot.ensure_days(days);
        }
        debug!(from, to = days, "day count changed");
        true
    }

    pub fn get(&self, key: CellKey) -> Option<f64> {
        self.slot(key.category, key.slot)?.cell(key.day)
    }

    /// Raw write without any synchronization. Returns `false` when the key
    /// does not exist or the value is unchanged within [`CELL_EPSILON`].
    pub fn set(&mut self, key: CellKey, value: f64) -> bool {
        let Some(cell) = self
            .slot_mut(key.category, key.slot)
            .and_then(|s| s.cells.get_mut(key.day))
        else {
            return false;
        };
        if (*cell - value).abs() < CELL_EPSILON {
            return false;
        }
        *cell = value;
        true
    }

    /// Keys of every cell on `day`, Military slots first. Empty when `day`
    /// is out of range.
    pub fn keys_on_day(&self, day: usize) -> Vec<CellKey> {
        if day >= self.days {
            return Vec::new();
        }
        Category::ALL
            .iter()
            .flat_map(|&c| (0..self.slot_count(c)).map(move |s| CellKey::new(c, s, day)))
            .collect()
    }

    /// Raise every `max_value` below 1 to 1. Returns how many slots changed.
    pub fn clamp_max_values(&mut self) -> usize {
        let mut clamped = 0;
        for slot in self.military.iter_mut().chain(self.economy.iter_mut()) {
            if slot.params.max_value < 1 {
                slot.params.max_value = 1;
                clamped += 1;
            }
        }
        clamped
    }
}

/// Render with an explicit sign, e.g. `+5`, `-3`, `+0`.
pub fn signed(v: i64) -> String {
    format!("{v:+}")
}

/// Generated values for one day.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayResult {
    /// 1-based day number.
    pub day: usize,
    pub military_values: Vec<i64>,
    pub economy_values: Vec<i64>,
}

impl DayResult {
    pub fn new(day: usize) -> Self {
        Self {
            day,
            ..Self::default()
        }
    }

    pub fn values(&self, category: Category) -> &[i64] {
        match category {
            Category::Military => &self.military_values,
            Category::Economy => &self.economy_values,
        }
    }

    pub fn push(&mut self, category: Category, value: i64) {
        match category {
            Category::Military => self.military_values.push(value),
            Category::Economy => self.economy_values.push(value),
        }
    }

    /// Saturates at the `i64` bounds instead of overflowing.
    pub fn sum(&self, category: Category) -> i64 {
        self.values(category)
            .iter()
            .fold(0i64, |acc, &v| acc.saturating_add(v))
    }

    pub fn military_sum(&self) -> i64 {
        self.sum(Category::Military)
    }

    pub fn economy_sum(&self) -> i64 {
        self.sum(Category::Economy)
    }

    /// Signed values joined by two spaces; `—` when there are none.
    pub fn text(&self, category: Category) -> String {
        let values = self.values(category);
        if values.is_empty() {
            return "—".to_string();
        }
        values.iter().map(|&v| signed(v)).collect::<Vec<_>>().join("  ")
    }

    pub fn military_text(&self) -> String {
        self.text(Category::Military)
    }

    pub fn economy_text(&self) -> String {
        self.text(Category::Economy)
    }
}

/// Start-up configuration for a calculator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalcConfig {
    /// Initial day count (clamped to at least 1).
    pub initial_days: usize,
    /// Military slots created at start-up.
    pub initial_military: usize,
    /// Economy slots created at start-up.
    pub initial_economy: usize,
    /// Seed for the shared RNG; drawn from entropy when absent.
    pub rng_seed: Option<u64>,
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            initial_days: DEFAULT_DAYS,
            initial_military: 1,
            initial_economy: 1,
            rng_seed: None,
        }
    }
}

impl CalcConfig {
    /// Build the initial grid described by this config.
    pub fn build_grid(&self) -> Grid {
        let mut grid = Grid::new(self.initial_days);
        for _ in 0..self.initial_military {
            grid.add_slot(Category::Military);
        }
        for _ in 0..self.initial_economy {
            grid.add_slot(Category::Economy);
        }
        grid
    }
}

/// Parse a Y percentage, rejecting NaN and infinities.
pub fn parse_y(s: &str) -> Result<f64, ParseError> {
    let v: f64 = s.trim().parse().map_err(|_| ParseError::InvalidValue {
        field: "y".to_string(),
        value: s.to_string(),
    })?;
    if !v.is_finite() {
        return Err(ParseError::NonFinite(s.to_string()));
    }
    Ok(v)
}
