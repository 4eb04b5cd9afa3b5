//! Spell definitions and loadouts.
//!
//! A spell is a named, ordered list of effect definitions. A loadout pairs a base
//! spell with equipment modifier effects, appended after the spell's own.

use emberfall_common::{EntityId, LayerMask};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::effects::{EffectDef, SpellEffect, StatusRegistry};
use crate::projectile::{Projectile, ProjectileBody};
use crate::stats::StatTable;

/// Immutable recipe for a spell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellDefinition {
    /// Lookup key.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Effect stages in pipeline order.
    #[serde(default)]
    pub effects: Vec<EffectDef>,
}

impl SpellDefinition {
    /// Creates an empty spell.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            effects: Vec::new(),
        }
    }

    /// Appends an effect (builder pattern).
    #[must_use]
    pub fn with_effect(mut self, effect: EffectDef) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Who is casting, from where, and at what.
#[derive(Debug, Clone)]
pub struct CastRequest {
    /// Caster.
    pub owner: EntityId,
    /// Caster stats at the moment of casting.
    pub owner_stats: StatTable,
    /// Spawn point.
    pub origin: Vec3,
    /// Aim direction.
    pub direction: Vec3,
    /// Tags the projectile may damage.
    pub damageable: LayerMask,
}

/// A base spell plus equipment modifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Loadout {
    /// Base spell.
    pub spell: Option<SpellDefinition>,
    /// Support effects appended after the spell's own.
    #[serde(default)]
    pub modifiers: Vec<EffectDef>,
}

impl Loadout {
    /// Creates a loadout around `spell`.
    #[must_use]
    pub fn new(spell: SpellDefinition) -> Self {
        Self {
            spell: Some(spell),
            modifiers: Vec::new(),
        }
    }

    /// Appends a modifier effect (builder pattern).
    #[must_use]
    pub fn with_modifier(mut self, effect: EffectDef) -> Self {
        self.modifiers.push(effect);
        self
    }

    /// Effect definitions in final pipeline order.
    pub fn effect_chain(&self) -> impl Iterator<Item = &EffectDef> {
        self.spell
            .iter()
            .flat_map(|spell| spell.effects.iter())
            .chain(self.modifiers.iter())
    }

    /// Fresh runtime effects for one projectile.
    #[must_use]
    pub fn instantiate(&self, statuses: &StatusRegistry) -> Vec<Box<dyn SpellEffect>> {
        self.effect_chain()
            .map(|def| def.instantiate(statuses))
            .collect()
    }

    /// Builds a projectile for `request`; `None` when no spell is equipped.
    #[must_use]
    pub fn cast(&self, request: CastRequest, statuses: &StatusRegistry) -> Option<Projectile> {
        let Some(spell) = &self.spell else {
            warn!(owner = %request.owner, "Cast with no spell equipped");
            return None;
        };
        debug!(owner = %request.owner, spell = %spell.id, "Casting");

        let body = ProjectileBody::new(
            request.owner,
            request.owner_stats,
            request.origin,
            request.direction,
        )
        .with_damageable(request.damageable);
        Some(Projectile::launch(body, self.instantiate(statuses)))
    }
}
