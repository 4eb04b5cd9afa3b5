//! Stat system.
//!
//! This module provides:
//! - Stat kinds (append-only, ordinal stable)
//! - Timed modifiers attributed to a source
//! - Effective value computation (Flat → PercentAdd → PercentMultiply)
//! - Per-actor stat tables

use ahash::AHashMap;
use emberfall_common::SourceId;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Decimal places kept by [`Stat::effective_value`].
pub const STAT_PRECISION: i32 = 4;

// ============================================================================
// Stat Kinds
// ============================================================================

/// Identity of a numeric attribute.
///
/// Persisted content refers to these by ordinal, so new kinds are only ever
/// appended at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum StatKind {
    /// Hit points.
    Health = 0,
    /// Flat reduction applied to physical damage.
    Armor = 1,
    /// Critical hit chance in percent (0-100).
    CritChance = 2,
    /// Extra damage on critical hits in percent.
    CritDamage = 3,
    /// Fire damage multiplier bonus (0.5 = +50%).
    FireDamageBonus = 4,
    /// Movement speed.
    MoveSpeed = 5,
    /// Damage dealt by body contact and melee strikes.
    ContactDamage = 6,
}

impl StatKind {
    /// Every kind in ordinal order.
    pub const ALL: [Self; 7] = [
        Self::Health,
        Self::Armor,
        Self::CritChance,
        Self::CritDamage,
        Self::FireDamageBonus,
        Self::MoveSpeed,
        Self::ContactDamage,
    ];

    /// Raw persisted value.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Resolves a raw persisted value.
    #[must_use]
    pub fn from_ordinal(raw: u8) -> Option<Self> {
        Self::ALL.get(raw as usize).copied()
    }
}

// ============================================================================
// Modifiers
// ============================================================================

/// How a modifier combines with a stat's base value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierKind {
    /// Added to the base value.
    Flat,
    /// Summed with other PercentAdd modifiers, applied once.
    PercentAdd,
    /// Applied individually as a running product.
    PercentMultiply,
}

/// A timed adjustment to a stat, e.g. "+5 Armor for 10s".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    /// Magnitude of the adjustment.
    pub value: f32,
    /// How the value combines.
    pub kind: ModifierKind,
    /// Seconds left; zero or negative means permanent.
    pub remaining: f32,
    /// Who applied it.
    pub source: SourceId,
}

impl Modifier {
    /// Creates a modifier.
    #[must_use]
    pub fn new(value: f32, kind: ModifierKind, duration: f32, source: SourceId) -> Self {
        Self {
            value,
            kind,
            remaining: duration,
            source,
        }
    }

    /// Creates a permanent flat modifier.
    #[must_use]
    pub fn flat(value: f32, source: SourceId) -> Self {
        Self::new(value, ModifierKind::Flat, 0.0, source)
    }

    /// Creates a permanent percent-additive modifier.
    #[must_use]
    pub fn percent_add(value: f32, source: SourceId) -> Self {
        Self::new(value, ModifierKind::PercentAdd, 0.0, source)
    }

    /// Creates a permanent percent-multiplicative modifier.
    #[must_use]
    pub fn percent_multiply(value: f32, source: SourceId) -> Self {
        Self::new(value, ModifierKind::PercentMultiply, 0.0, source)
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration(mut self, seconds: f32) -> Self {
        self.remaining = seconds;
        self
    }

    /// Whether the modifier never expires on its own.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.remaining <= 0.0
    }
}

// ============================================================================
// Stat
// ============================================================================

/// A single attribute: a base value plus an ordered list of modifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    /// Value before modifiers.
    pub base: f32,
    modifiers: Vec<Modifier>,
}

impl Stat {
    /// Creates a stat with no modifiers.
    #[must_use]
    pub fn new(base: f32) -> Self {
        Self {
            base,
            modifiers: Vec::new(),
        }
    }

    /// Computes the value after all modifiers, rounded to [`STAT_PRECISION`] places.
    ///
    /// Flat modifiers are added first, PercentAdd modifiers are summed and applied
    /// once as `(1 + sum)`, then each PercentMultiply applies `*= (1 + value)` in
    /// list order.
    #[must_use]
    pub fn effective_value(&self) -> f32 {
        let mut flat = 0.0_f64;
        let mut percent_add = 0.0_f64;
        for modifier in &self.modifiers {
            match modifier.kind {
                ModifierKind::Flat => flat += f64::from(modifier.value),
                ModifierKind::PercentAdd => percent_add += f64::from(modifier.value),
                ModifierKind::PercentMultiply => {},
            }
        }

        let mut value = (f64::from(self.base) + flat) * (1.0 + percent_add);
        for modifier in &self.modifiers {
            if modifier.kind == ModifierKind::PercentMultiply {
                value *= 1.0 + f64::from(modifier.value);
            }
        }

        round_to_precision(value) as f32
    }

    /// Appends a modifier.
    pub fn add_modifier(&mut self, modifier: Modifier) {
        self.modifiers.push(modifier);
    }

    /// Removes every modifier applied by `source`, keeping the rest in order.
    ///
    /// Returns how many were removed.
    pub fn remove_modifiers_from(&mut self, source: SourceId) -> usize {
        let before = self.modifiers.len();
        self.modifiers.retain(|m| m.source != source);
        before - self.modifiers.len()
    }

    /// Adds `delta` to the permanent flat modifier owned by `source`, creating it
    /// at the end of the list if there is none.
    pub fn adjust_flat(&mut self, delta: f32, source: SourceId) {
        if let Some(existing) = self
            .modifiers
            .iter_mut()
            .find(|m| m.source == source && m.kind == ModifierKind::Flat && m.is_permanent())
        {
            existing.value += delta;
        } else {
            self.modifiers.push(Modifier::flat(delta, source));
        }
    }

    /// Counts down timed modifiers and drops the ones that ran out.
    pub fn tick(&mut self, dt: f32) {
        self.modifiers.retain_mut(|m| {
            if m.remaining > 0.0 {
                m.remaining -= dt;
                m.remaining > 0.0
            } else {
                true
            }
        });
    }

    /// Active modifiers in application order.
    #[must_use]
    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }
}

fn round_to_precision(value: f64) -> f64 {
    let scale = 10_f64.powi(STAT_PRECISION);
    (value * scale).round() / scale
}

// ============================================================================
// Stat Sheet (static configuration)
// ============================================================================

/// One configured starting value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatEntry {
    /// Which stat.
    pub kind: StatKind,
    /// Base value.
    pub base: f32,
}

/// Starting values for an actor, loaded before the simulation starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatSheet {
    /// Configured entries; a later entry for the same kind wins.
    pub entries: Vec<StatEntry>,
}

impl StatSheet {
    /// Creates an empty sheet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry (builder pattern).
    #[must_use]
    pub fn with(mut self, kind: StatKind, base: f32) -> Self {
        self.entries.push(StatEntry { kind, base });
        self
    }
}

// ============================================================================
// Stat Table
// ============================================================================

/// All stats of one actor. Never shared between actors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatTable {
    /// Name used in log messages.
    label: String,
    stats: AHashMap<StatKind, Stat>,
}

impl StatTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            stats: AHashMap::new(),
        }
    }

    /// Creates a table from a sheet.
    #[must_use]
    pub fn from_sheet(label: impl Into<String>, sheet: &StatSheet) -> Self {
        let mut table = Self::new(label);
        for entry in &sheet.entries {
            table.insert(entry.kind, Stat::new(entry.base));
        }
        table
    }

    /// Adds a stat with the given base value (builder pattern).
    #[must_use]
    pub fn with_stat(mut self, kind: StatKind, base: f32) -> Self {
        self.insert(kind, Stat::new(base));
        self
    }

    /// Inserts or replaces a stat.
    pub fn insert(&mut self, kind: StatKind, stat: Stat) {
        self.stats.insert(kind, stat);
    }

    /// Name used in log messages.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the table holds `kind`.
    #[must_use]
    pub fn has(&self, kind: StatKind) -> bool {
        self.stats.contains_key(&kind)
    }

    /// Borrows a stat.
    #[must_use]
    pub fn stat(&self, kind: StatKind) -> Option<&Stat> {
        self.stats.get(&kind)
    }

    /// Effective value of `kind`, or 0 with a warning when the table lacks it.
    #[must_use]
    pub fn get(&self, kind: StatKind) -> f32 {
        match self.stats.get(&kind) {
            Some(stat) => stat.effective_value(),
            None => {
                warn!(stat = ?kind, table = %self.label, "Stat not found, reading 0");
                0.0
            },
        }
    }

    /// Changes the current value of `kind` by `delta` on behalf of `source`.
    ///
    /// The change is stored as a permanent flat modifier; repeated changes from
    /// the same source accumulate into one modifier.
    pub fn modify(&mut self, kind: StatKind, delta: f32, source: SourceId) {
        match self.stats.get_mut(&kind) {
            Some(stat) => stat.adjust_flat(delta, source),
            None => warn!(stat = ?kind, table = %self.label, "Cannot modify missing stat"),
        }
    }

    /// Lowers the current value of `kind` (damage, mana spent).
    pub fn subtract_current(&mut self, kind: StatKind, amount: f32, source: SourceId) {
        self.modify(kind, -amount, source);
    }

    /// Raises the current value of `kind` (healing).
    pub fn add_current(&mut self, kind: StatKind, amount: f32, source: SourceId) {
        self.modify(kind, amount, source);
    }

    /// Attaches a modifier to `kind`.
    pub fn add_modifier(&mut self, kind: StatKind, modifier: Modifier) {
        match self.stats.get_mut(&kind) {
            Some(stat) => stat.add_modifier(modifier),
            None => warn!(stat = ?kind, table = %self.label, "Cannot add modifier to missing stat"),
        }
    }

    /// Revokes everything `source` applied, across all stats.
    pub fn remove_modifiers_from(&mut self, source: SourceId) -> usize {
        self.stats
            .values_mut()
            .map(|stat| stat.remove_modifiers_from(source))
            .sum()
    }

    /// Advances modifier timers.
    pub fn tick(&mut self, dt: f32) {
        for stat in self.stats.values_mut() {
            stat.tick(dt);
        }
    }

    /// Iterates stats in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = (StatKind, &Stat)> {
        StatKind::ALL
            .into_iter()
            .filter_map(|kind| self.stats.get(&kind).map(|stat| (kind, stat)))
    }
}

// ============================================================================
// Tests
// ============================================================================
