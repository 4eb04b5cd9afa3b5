//! Damageable actors.
//!
//! A [`Combatant`] owns one stat table and turns incoming hits into health loss,
//! status effects and events.

use emberfall_common::{EntityId, SourceId, Tag};
use tracing::{debug, info};

use crate::damage::{calculate_hit, HitContext, HitOutcome};
use crate::events::{CombatEvent, EventHub};
use crate::stats::{StatKind, StatSheet, StatTable};

/// Anything that can be hit.
#[derive(Debug, Clone)]
pub struct Combatant {
    id: EntityId,
    tag: Tag,
    stats: StatTable,
    dead: bool,
}

impl Combatant {
    /// Creates a combatant with its stats built from `sheet`.
    #[must_use]
    pub fn new(id: EntityId, tag: Tag, name: &str, sheet: &StatSheet) -> Self {
        Self {
            id,
            tag,
            stats: StatTable::from_sheet(name, sheet),
            dead: false,
        }
    }

    /// Creates a combatant around an existing table.
    #[must_use]
    pub fn with_stats(id: EntityId, tag: Tag, stats: StatTable) -> Self {
        Self {
            id,
            tag,
            stats,
            dead: false,
        }
    }

    /// Identity.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Collision tag.
    #[must_use]
    pub const fn tag(&self) -> Tag {
        self.tag
    }

    /// Read access to stats.
    #[must_use]
    pub fn stats(&self) -> &StatTable {
        &self.stats
    }

    /// Write access to stats.
    pub fn stats_mut(&mut self) -> &mut StatTable {
        &mut self.stats
    }

    /// Current health.
    #[must_use]
    pub fn health(&self) -> f32 {
        self.stats.get(StatKind::Health)
    }

    /// Whether health reached zero.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.dead
    }

    /// Resolves a hit against this combatant.
    ///
    /// Subtracts the final damage from health (attributed to the attacker), applies
    /// the hit's status effects, publishes `DamageTaken`, and publishes `Died` the
    /// first time health drops to zero. Hits on a dead combatant are ignored.
    pub fn take_hit(
        &mut self,
        context: &HitContext,
        rng: &mut fastrand::Rng,
        events: &mut EventHub,
    ) -> Option<HitOutcome> {
        if self.dead {
            return None;
        }

        let outcome = calculate_hit(context, Some(&self.stats), rng);
        self.stats.subtract_current(
            StatKind::Health,
            outcome.total,
            SourceId::from(context.attacker),
        );
        for status in &context.status_effects {
            status.effect.apply_for(&mut self.stats, status.duration);
        }

        events.publish(CombatEvent::DamageTaken {
            target: self.id,
            attacker: context.attacker,
            amount: outcome.total,
            critical: outcome.critical,
        });
        debug!(
            entity = %self.id,
            amount = outcome.total,
            health = self.health(),
            "Damage taken"
        );

        if self.health() <= 0.0 {
            self.dead = true;
            info!(entity = %self.id, name = self.stats.label(), "Combatant died");
            events.publish(CombatEvent::Died { entity: self.id });
        }

        Some(outcome)
    }

    /// Restores health on behalf of `source`. Dead combatants stay dead.
    pub fn heal(&mut self, amount: f32, source: SourceId) {
        if self.dead {
            return;
        }
        self.stats.add_current(StatKind::Health, amount, source);
    }

    /// Advances modifier timers.
    pub fn tick(&mut self, dt: f32) {
        self.stats.tick(dt);
    }
}
