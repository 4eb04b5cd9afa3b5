//! Read-only diagnostics.
//!
//! Components expose a typed report through [`Inspect`]; overlays and logs turn
//! it into JSON. Reports are snapshots and never borrow the component.

use emberfall_common::geometry::forward;
use emberfall_common::EntityId;
use glam::Vec3;
use serde::Serialize;
use serde_json::Value;

use crate::ai::{AiState, EnemyAi};
use crate::combatant::Combatant;
use crate::projectile::Projectile;
use crate::spell::SpellDefinition;
use crate::stats::{StatKind, StatTable};

/// Something that can describe its own state.
pub trait Inspect {
    /// Report type.
    type Report: Serialize;

    /// Snapshot of the current state.
    fn report(&self) -> Self::Report;

    /// Report as JSON (`Null` if it cannot be represented).
    fn to_json(&self) -> Value {
        serde_json::to_value(self.report()).unwrap_or(Value::Null)
    }
}

/// One stat in a [`StatTableReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatLine {
    /// Stat.
    pub kind: StatKind,
    /// Base value.
    pub base: f32,
    /// Value after modifiers.
    pub effective: f32,
    /// Live modifier count.
    pub modifiers: usize,
}

/// Snapshot of a stat table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatTableReport {
    /// Table label.
    pub label: String,
    /// Stats in ordinal order.
    pub stats: Vec<StatLine>,
}

impl Inspect for StatTable {
    type Report = StatTableReport;

    fn report(&self) -> StatTableReport {
        StatTableReport {
            label: self.label().to_string(),
            stats: self
                .iter()
                .map(|(kind, stat)| StatLine {
                    kind,
                    base: stat.base,
                    effective: stat.effective_value(),
                    modifiers: stat.modifiers().len(),
                })
                .collect(),
        }
    }
}

/// Snapshot of a combatant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombatantReport {
    /// Entity.
    pub entity: EntityId,
    /// Current health.
    pub health: f32,
    /// Death flag.
    pub dead: bool,
    /// Stats.
    pub stats: StatTableReport,
}

impl Inspect for Combatant {
    type Report = CombatantReport;

    fn report(&self) -> CombatantReport {
        CombatantReport {
            entity: self.id(),
            health: self.health(),
            dead: self.is_dead(),
            stats: self.stats().report(),
        }
    }
}

/// Snapshot of an enemy controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiReport {
    /// Entity.
    pub entity: EntityId,
    /// Archetype name.
    pub name: String,
    /// Behavior state.
    pub state: AiState,
    /// Attack behavior name.
    pub attack: &'static str,
    /// Feet position.
    pub position: Vec3,
    /// Yaw in degrees, 0 facing +Z.
    pub yaw_degrees: f32,
    /// Latest perception result.
    pub can_perceive: bool,
    /// Remembered player position.
    pub last_known_position: Option<Vec3>,
    /// Leash timer.
    pub lose_sight_timer: f32,
    /// Current patrol point.
    pub patrol_index: Option<usize>,
    /// Airborne.
    pub leaping: bool,
    /// Death flag.
    pub dead: bool,
}

impl Inspect for EnemyAi {
    type Report = AiReport;

    fn report(&self) -> AiReport {
        let facing = forward(self.body().rotation);
        AiReport {
            entity: self.id(),
            name: self.config().name.clone(),
            state: self.state(),
            attack: self.attack().kind_name(),
            position: self.body().position,
            yaw_degrees: facing.x.atan2(facing.z).to_degrees(),
            can_perceive: self.can_perceive(),
            last_known_position: self.last_known_position(),
            lose_sight_timer: self.lose_sight_timer(),
            patrol_index: self.patrol_index(),
            leaping: self.attack().is_leaping(),
            dead: self.is_dead(),
        }
    }
}

/// Snapshot of a projectile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectileReport {
    /// Caster.
    pub owner: EntityId,
    /// Position.
    pub position: Vec3,
    /// Flight direction.
    pub direction: Vec3,
    /// Speed.
    pub speed: f32,
    /// Seconds flown.
    pub age: f32,
    /// Seconds left.
    pub remaining_lifetime: f32,
    /// Runtime effects in pipeline order.
    pub effects: Vec<&'static str>,
    /// Destroyed flag.
    pub destroyed: bool,
}

impl Inspect for Projectile {
    type Report = ProjectileReport;

    fn report(&self) -> ProjectileReport {
        let body = self.body();
        ProjectileReport {
            owner: body.owner,
            position: body.position,
            direction: body.direction,
            speed: body.speed,
            age: body.age,
            remaining_lifetime: body.remaining_lifetime(),
            effects: self.effect_names().collect(),
            destroyed: self.is_destroyed(),
        }
    }
}

/// Snapshot of a spell definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpellReport {
    /// Lookup key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Effect names in pipeline order.
    pub effects: Vec<&'static str>,
}

impl Inspect for SpellDefinition {
    type Report = SpellReport;

    fn report(&self) -> SpellReport {
        SpellReport {
            id: self.id.clone(),
            name: self.name.clone(),
            effects: self.effects.iter().map(|e| e.name()).collect(),
        }
    }
}
