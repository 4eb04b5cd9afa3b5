//! Damage calculation.
//!
//! This module provides:
//! - Damage kinds (append-only, ordinal stable)
//! - Raw damage instances and the per-hit context they travel in
//! - The hit formula: crit roll, fire scaling, armor reduction, crit bonus

use emberfall_common::EntityId;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::stats::{StatKind, StatTable};
use crate::status::StatusEffect;

// ============================================================================
// Damage Kinds
// ============================================================================

/// Kind of raw damage. New kinds are only appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DamageKind {
    /// Reduced by the target's armor.
    Physical = 0,
    /// Scaled by the attacker's fire bonus, ignores armor.
    Fire = 1,
}

impl DamageKind {
    /// Check if this damage kind is reduced by armor.
    #[must_use]
    pub fn reduced_by_armor(self) -> bool {
        matches!(self, Self::Physical)
    }
}

/// One raw portion of a hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageInstance {
    /// Kind of damage.
    pub kind: DamageKind,
    /// Raw amount before any reduction.
    pub amount: f32,
}

impl DamageInstance {
    /// Creates a damage instance.
    #[must_use]
    pub const fn new(kind: DamageKind, amount: f32) -> Self {
        Self { kind, amount }
    }

    /// Physical damage shorthand.
    #[must_use]
    pub const fn physical(amount: f32) -> Self {
        Self::new(DamageKind::Physical, amount)
    }

    /// Fire damage shorthand.
    #[must_use]
    pub const fn fire(amount: f32) -> Self {
        Self::new(DamageKind::Fire, amount)
    }
}

/// A status effect riding on a hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusApplication {
    /// Effect to apply.
    pub effect: StatusEffect,
    /// Duration override in seconds.
    pub duration: f32,
}

// ============================================================================
// Hit Context
// ============================================================================

/// Everything a target needs to resolve one hit.
///
/// Built by whatever deals the hit, mutated by the spell effect pipeline, then
/// consumed once by the target.
#[derive(Debug, Clone, PartialEq)]
pub struct HitContext {
    /// Who is being hit.
    pub target: EntityId,
    /// Who is hitting.
    pub attacker: EntityId,
    /// Snapshot of the attacker's stats at the moment of the hit.
    pub attacker_stats: StatTable,
    /// Raw damage, resolved in list order.
    pub damages: Vec<DamageInstance>,
    /// Status effects applied after damage.
    pub status_effects: Vec<StatusApplication>,
}

impl HitContext {
    /// Creates an empty hit.
    #[must_use]
    pub fn new(target: EntityId, attacker: EntityId, attacker_stats: StatTable) -> Self {
        Self {
            target,
            attacker,
            attacker_stats,
            damages: Vec::new(),
            status_effects: Vec::new(),
        }
    }

    /// Adds a damage instance (builder pattern).
    #[must_use]
    pub fn with_damage(mut self, damage: DamageInstance) -> Self {
        self.damages.push(damage);
        self
    }

    /// Sum of raw amounts, before any stat is consulted.
    #[must_use]
    pub fn raw_total(&self) -> f32 {
        self.damages.iter().map(|d| d.amount).sum()
    }

    /// Copy of this hit with every damage amount scaled and no status effects.
    #[must_use]
    pub fn scaled_follow_up(&self, multiplier: f32) -> Self {
        Self {
            target: self.target,
            attacker: self.attacker,
            attacker_stats: self.attacker_stats.clone(),
            damages: self
                .damages
                .iter()
                .map(|d| DamageInstance::new(d.kind, d.amount * multiplier))
                .collect(),
            status_effects: Vec::new(),
        }
    }
}

// ============================================================================
// Calculation
// ============================================================================

/// Result of resolving a hit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HitOutcome {
    /// Final damage to subtract from health.
    pub total: f32,
    /// Whether the crit roll succeeded.
    pub critical: bool,
}

/// Computes final damage for `context` against `target_stats`.
///
/// Has no side effects besides consuming one random value; applying the result to
/// health is the caller's job. A missing target table yields a zero outcome.
pub fn calculate_hit(
    context: &HitContext,
    target_stats: Option<&StatTable>,
    rng: &mut fastrand::Rng,
) -> HitOutcome {
    let Some(target_stats) = target_stats else {
        warn!(target = %context.target, "Hit target has no stats, ignoring hit");
        return HitOutcome::default();
    };

    let attacker = &context.attacker_stats;
    let crit_chance = attacker.get(StatKind::CritChance);
    let critical = rng.f32() < crit_chance / 100.0;

    let mut total = 0.0;
    for damage in &context.damages {
        let amount = match damage.kind {
            DamageKind::Fire => damage.amount * (1.0 + attacker.get(StatKind::FireDamageBonus)),
            DamageKind::Physical => damage.amount - target_stats.get(StatKind::Armor),
        };
        total += amount.max(0.0);
    }

    if critical {
        total += total * attacker.get(StatKind::CritDamage) / 100.0;
    }

    debug!(
        target = %context.target,
        attacker = %context.attacker,
        total,
        critical,
        "Hit resolved"
    );
    HitOutcome { total, critical }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn attacker() -> StatTable {
        StatTable::new("attacker")
            .with_stat(StatKind::CritChance, 0.0)
            .with_stat(StatKind::CritDamage, 50.0)
            .with_stat(StatKind::FireDamageBonus, 0.0)
    }

    fn target(armor: f32) -> StatTable {
        StatTable::new("target")
            .with_stat(StatKind::Health, 100.0)
            .with_stat(StatKind::Armor, armor)
    }

    fn hit(stats: StatTable, damages: &[DamageInstance]) -> HitContext {
        let mut ctx = HitContext::new(EntityId::new(), EntityId::new(), stats);
        ctx.damages.extend_from_slice(damages);
        ctx
    }

    #[test]
    fn test_physical_floored_by_armor() {
        let mut rng = fastrand::Rng::with_seed(1);
        let ctx = hit(attacker(), &[DamageInstance::physical(10.0)]);
        let outcome = calculate_hit(&ctx, Some(&target(50.0)), &mut rng);
        assert_eq!(outcome.total, 0.0);
    }

    #[test]
    fn test_fire_scales_and_ignores_armor() {
        let mut rng = fastrand::Rng::with_seed(1);
        let stats = attacker().with_stat(StatKind::FireDamageBonus, 0.5);
        let ctx = hit(stats, &[DamageInstance::fire(10.0)]);
        let outcome = calculate_hit(&ctx, Some(&target(50.0)), &mut rng);
        assert!((outcome.total - 15.0).abs() < 1e-4);
    }

    #[test]
    fn test_armor_applies_per_instance() {
        let mut rng = fastrand::Rng::with_seed(1);
        let ctx = hit(
            attacker(),
            &[
                DamageInstance::physical(10.0),
                DamageInstance::physical(3.0),
                DamageInstance::fire(4.0),
            ],
        );
        let outcome = calculate_hit(&ctx, Some(&target(5.0)), &mut rng);
        // 5 + 0 + 4
        assert!((outcome.total - 9.0).abs() < 1e-4);
    }

    #[test]
    fn test_crit_bonus() {
        let mut rng = fastrand::Rng::with_seed(3);
        let stats = attacker().with_stat(StatKind::CritChance, 100.0);
        let ctx = hit(stats, &[DamageInstance::physical(20.0)]);
        let outcome = calculate_hit(&ctx, Some(&target(0.0)), &mut rng);
        assert!(outcome.critical);
        assert!((outcome.total - 30.0).abs() < 1e-4);
    }

    #[test]
    fn test_missing_target_stats() {
        let mut rng = fastrand::Rng::with_seed(1);
        let ctx = hit(attacker(), &[DamageInstance::physical(10.0)]);
        assert_eq!(calculate_hit(&ctx, None, &mut rng), HitOutcome::default());
    }

    #[test]
    fn test_attacker_without_stats_deals_raw_damage() {
        let mut rng = fastrand::Rng::with_seed(1);
        let ctx = hit(StatTable::new("bare"), &[DamageInstance::fire(7.0)]);
        let outcome = calculate_hit(&ctx, Some(&target(0.0)), &mut rng);
        assert!(!outcome.critical);
        assert!((outcome.total - 7.0).abs() < 1e-4);
    }

    #[test]
    fn test_scaled_follow_up_drops_statuses() {
        let mut ctx = hit(attacker(), &[DamageInstance::physical(10.0), DamageInstance::fire(5.0)]);
        ctx.status_effects.push(StatusApplication {
            effect: StatusEffect::new(emberfall_common::StatusId::new(1), "Burn", 3.0),
            duration: 3.0,
        });
        let follow = ctx.scaled_follow_up(0.1);
        assert!(follow.status_effects.is_empty());
        assert!((follow.raw_total() - 1.5).abs() < 1e-5);
        assert_eq!(follow.target, ctx.target);
    }

    proptest! {
        #[test]
        fn prop_zero_crit_chance_never_crits(seed in any::<u64>()) {
            let mut rng = fastrand::Rng::with_seed(seed);
            let ctx = hit(attacker(), &[DamageInstance::physical(10.0)]);
            let outcome = calculate_hit(&ctx, Some(&target(0.0)), &mut rng);
            prop_assert!(!outcome.critical);
        }

        #[test]
        fn prop_full_crit_chance_always_crits(seed in any::<u64>()) {
            let mut rng = fastrand::Rng::with_seed(seed);
            let stats = attacker().with_stat(StatKind::CritChance, 100.0);
            let ctx = hit(stats, &[DamageInstance::physical(10.0)]);
            let outcome = calculate_hit(&ctx, Some(&target(0.0)), &mut rng);
            prop_assert!(outcome.critical);
        }
    }
}
