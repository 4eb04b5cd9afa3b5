//! Spell effect pipeline.
//!
//! This module provides:
//! - The [`SpellEffect`] hook trait run by projectiles
//! - Serializable effect definitions ([`EffectDef`]) authored in content files
//! - One runtime effect per definition, instantiated fresh for every cast
//!
//! Definitions are immutable; anything an effect mutates during flight (e.g. a
//! homing lock) lives in the runtime instance so concurrent casts never share it.

use std::fmt;

use ahash::AHashMap;
use emberfall_common::geometry::rotate_towards;
use emberfall_common::{EntityId, LayerMask, StatusId, Tag};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::damage::{DamageInstance, DamageKind, HitContext, StatusApplication};
use crate::projectile::ProjectileBody;
use crate::scheduler::ScheduledHit;
use crate::status::StatusEffect;
use crate::world::WorldQuery;

// ============================================================================
// Hook trait
// ============================================================================

/// One stage of a spell's behavior. Every hook defaults to a no-op.
pub trait SpellEffect: fmt::Debug + Send {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Runs once when the projectile is spawned.
    fn on_initialize(&mut self, _body: &mut ProjectileBody) {}

    /// Runs every step while flying.
    fn on_update(&mut self, _body: &mut ProjectileBody, _dt: f32, _world: &dyn WorldQuery) {}

    /// Runs on the projectile's fixed tick period.
    fn on_tick(&mut self, _body: &mut ProjectileBody) {}

    /// Shapes the hit before the target sees it.
    fn on_compile_hit(&mut self, _body: &ProjectileBody, _context: &mut HitContext) {}

    /// Runs after the target processed the hit.
    fn on_hit(&mut self, _body: &mut ProjectileBody, _context: &HitContext) {}

    /// Runs when the projectile expires without hitting anything.
    fn on_lifetime_end(&mut self, _body: &mut ProjectileBody) {}
}

// ============================================================================
// Definitions
// ============================================================================

fn default_speed() -> f32 {
    50.0
}
fn default_lifetime() -> f32 {
    5.0
}
fn default_size() -> f32 {
    0.1
}
fn default_tick_rate() -> f32 {
    0.5
}
fn default_percent() -> f32 {
    5.0
}
fn default_rotation_speed() -> f32 {
    5.0
}
fn default_homing_radius() -> f32 {
    1.0
}
fn default_homing_mask() -> LayerMask {
    LayerMask::of(&[Tag::Enemy, Tag::Player])
}
fn default_second_hit_multiplier() -> f32 {
    0.1
}
fn default_hit_delay() -> f32 {
    0.2
}

/// Serializable description of an effect stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EffectDef {
    /// Sets flight parameters on spawn.
    BaseProjectileStats {
        /// Units per second.
        #[serde(default = "default_speed")]
        speed: f32,
        /// Seconds before expiry.
        #[serde(default = "default_lifetime")]
        lifetime: f32,
        /// Visual and collision scale.
        #[serde(default = "default_size")]
        size: f32,
        /// Seconds between ticks.
        #[serde(default = "default_tick_rate")]
        tick_rate: f32,
    },
    /// Appends a damage instance to the hit.
    AddDamage {
        /// Damage kind.
        kind: DamageKind,
        /// Raw amount.
        amount: f32,
    },
    /// Raises every instance of one kind by a percentage.
    AddDamagePercent {
        /// Kind to boost.
        kind: DamageKind,
        /// Bonus in percent.
        #[serde(default = "default_percent")]
        percent: f32,
    },
    /// Merges every instance of `from` into a single instance of `to`.
    ConvertDamage {
        /// Source kind.
        from: DamageKind,
        /// Resulting kind.
        to: DamageKind,
    },
    /// Steers toward the nearest target in a radius.
    Homing {
        /// Maximum turn rate in radians per second.
        #[serde(default = "default_rotation_speed")]
        rotation_speed: f32,
        /// Search radius.
        #[serde(default = "default_homing_radius")]
        radius: f32,
        /// Tags considered targets.
        #[serde(default = "default_homing_mask")]
        mask: LayerMask,
    },
    /// Schedules a weaker copy of the hit after a delay.
    HitTwice {
        /// Damage scale of the second hit.
        #[serde(default = "default_second_hit_multiplier")]
        multiplier: f32,
        /// Seconds between hits.
        #[serde(default = "default_hit_delay")]
        delay: f32,
    },
    /// Attaches a status effect to the hit.
    ApplyStatus {
        /// Status to apply.
        status: StatusId,
        /// Duration override; the status' own duration when absent.
        #[serde(default)]
        duration: Option<f32>,
    },
}

/// Status definitions effects can refer to.
pub type StatusRegistry = AHashMap<StatusId, StatusEffect>;

impl EffectDef {
    /// Short name for diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::BaseProjectileStats { .. } => "BaseProjectileStats",
            Self::AddDamage { .. } => "AddDamage",
            Self::AddDamagePercent { .. } => "AddDamagePercent",
            Self::ConvertDamage { .. } => "ConvertDamage",
            Self::Homing { .. } => "Homing",
            Self::HitTwice { .. } => "HitTwice",
            Self::ApplyStatus { .. } => "ApplyStatus",
        }
    }

    /// Builds a fresh runtime instance.
    #[must_use]
    pub fn instantiate(&self, statuses: &StatusRegistry) -> Box<dyn SpellEffect> {
        match *self {
            Self::BaseProjectileStats {
                speed,
                lifetime,
                size,
                tick_rate,
            } => Box::new(BaseProjectileStats {
                speed,
                lifetime,
                size,
                tick_rate,
            }),
            Self::AddDamage { kind, amount } => Box::new(AddDamage { kind, amount }),
            Self::AddDamagePercent { kind, percent } => Box::new(AddDamagePercent { kind, percent }),
            Self::ConvertDamage { from, to } => Box::new(ConvertDamage { from, to }),
            Self::Homing {
                rotation_speed,
                radius,
                mask,
            } => Box::new(Homing::new(rotation_speed, radius, mask)),
            Self::HitTwice { multiplier, delay } => Box::new(HitTwice { multiplier, delay }),
            Self::ApplyStatus { status, duration } => {
                let effect = statuses.get(&status).cloned();
                if effect.is_none() {
                    warn!(status = status.raw(), "Unknown status in spell, effect disabled");
                }
                Box::new(ApplyStatus { effect, duration })
            },
        }
    }
}

// ============================================================================
// Runtime effects
// ============================================================================

/// Sets speed, lifetime, size and tick period on spawn.
#[derive(Debug, Clone)]
pub struct BaseProjectileStats {
    /// Units per second.
    pub speed: f32,
    /// Seconds before expiry.
    pub lifetime: f32,
    /// Scale.
    pub size: f32,
    /// Seconds between ticks.
    pub tick_rate: f32,
}

impl SpellEffect for BaseProjectileStats {
    fn name(&self) -> &'static str {
        "BaseProjectileStats"
    }

    fn on_initialize(&mut self, body: &mut ProjectileBody) {
        body.set_stats(self.speed, self.lifetime, self.size, self.tick_rate);
    }
}

/// Appends one damage instance.
#[derive(Debug, Clone)]
pub struct AddDamage {
    /// Kind.
    pub kind: DamageKind,
    /// Amount.
    pub amount: f32,
}

impl SpellEffect for AddDamage {
    fn name(&self) -> &'static str {
        "AddDamage"
    }

    fn on_compile_hit(&mut self, _body: &ProjectileBody, context: &mut HitContext) {
        context.damages.push(DamageInstance::new(self.kind, self.amount));
    }
}

/// Boosts matching damage by a percentage.
#[derive(Debug, Clone)]
pub struct AddDamagePercent {
    /// Kind to boost.
    pub kind: DamageKind,
    /// Bonus in percent.
    pub percent: f32,
}

impl SpellEffect for AddDamagePercent {
    fn name(&self) -> &'static str {
        "AddDamagePercent"
    }

    fn on_compile_hit(&mut self, _body: &ProjectileBody, context: &mut HitContext) {
        for damage in context.damages.iter_mut().filter(|d| d.kind == self.kind) {
            damage.amount += damage.amount * self.percent / 100.0;
        }
    }
}

/// Converts one damage kind into another.
///
/// Untouched instances keep their order; the converted lump goes last.
#[derive(Debug, Clone)]
pub struct ConvertDamage {
    /// Source kind.
    pub from: DamageKind,
    /// Resulting kind.
    pub to: DamageKind,
}

impl SpellEffect for ConvertDamage {
    fn name(&self) -> &'static str {
        "ConvertDamage"
    }

    fn on_compile_hit(&mut self, _body: &ProjectileBody, context: &mut HitContext) {
        let mut converted = 0.0;
        context.damages.retain(|d| {
            if d.kind == self.from {
                converted += d.amount;
                false
            } else {
                true
            }
        });
        if converted > 0.0 {
            context.damages.push(DamageInstance::new(self.to, converted));
        }
    }
}

/// Turns the projectile toward the nearest target in range.
#[derive(Debug, Clone)]
pub struct Homing {
    /// Radians per second.
    pub rotation_speed: f32,
    /// Search radius.
    pub radius: f32,
    /// Target tags.
    pub mask: LayerMask,
    locked: Option<EntityId>,
}

impl Homing {
    /// Creates an unlocked homing stage.
    #[must_use]
    pub fn new(rotation_speed: f32, radius: f32, mask: LayerMask) -> Self {
        Self {
            rotation_speed,
            radius,
            mask,
            locked: None,
        }
    }

    /// Entity currently steered toward.
    #[must_use]
    pub fn locked_target(&self) -> Option<EntityId> {
        self.locked
    }
}

impl SpellEffect for Homing {
    fn name(&self) -> &'static str {
        "Homing"
    }

    fn on_update(&mut self, body: &mut ProjectileBody, dt: f32, world: &dyn WorldQuery) {
        let candidates = world.overlap_sphere(body.position, self.radius, self.mask);

        // Keep the current lock while it stays in range, otherwise take the nearest.
        let keep = self
            .locked
            .filter(|id| candidates.iter().any(|c| c.entity == *id));
        let target = keep.or_else(|| {
            candidates
                .iter()
                .filter(|c| !world.is_part_of(c, body.owner))
                .filter_map(|c| {
                    world
                        .position_of(c.entity)
                        .map(|p| (c.entity, p.distance_squared(body.position)))
                })
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(id, _)| id)
        });
        self.locked = target;

        let Some(position) = target.and_then(|id| world.position_of(id)) else {
            return;
        };
        let to_target = position - body.position;
        let direction = rotate_towards(body.direction, to_target, self.rotation_speed * dt);
        body.set_direction(direction);
    }
}

/// Delivers a scaled copy of the hit after a delay, without statuses.
#[derive(Debug, Clone)]
pub struct HitTwice {
    /// Damage scale.
    pub multiplier: f32,
    /// Seconds.
    pub delay: f32,
}

impl SpellEffect for HitTwice {
    fn name(&self) -> &'static str {
        "HitTwice"
    }

    fn on_hit(&mut self, body: &mut ProjectileBody, context: &HitContext) {
        body.schedule_follow_up(ScheduledHit::new(
            context.scaled_follow_up(self.multiplier),
            self.delay,
        ));
    }
}

/// Attaches a status to every hit.
#[derive(Debug, Clone)]
pub struct ApplyStatus {
    effect: Option<StatusEffect>,
    duration: Option<f32>,
}

impl ApplyStatus {
    /// Creates a stage applying `effect`.
    #[must_use]
    pub fn new(effect: StatusEffect, duration: Option<f32>) -> Self {
        Self {
            effect: Some(effect),
            duration,
        }
    }
}

impl SpellEffect for ApplyStatus {
    fn name(&self) -> &'static str {
        "ApplyStatus"
    }

    fn on_compile_hit(&mut self, _body: &ProjectileBody, context: &mut HitContext) {
        if let Some(effect) = &self.effect {
            context.status_effects.push(StatusApplication {
                duration: self.duration.unwrap_or(effect.duration),
                effect: effect.clone(),
            });
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{ModifierKind, StatKind, StatTable};
    use crate::world::mock::MockWorld;
    use glam::Vec3;

    fn body() -> ProjectileBody {
        ProjectileBody::new(EntityId::new(), StatTable::new("owner"), Vec3::ZERO, Vec3::Z)
    }

    fn context() -> HitContext {
        HitContext::new(EntityId::new(), EntityId::new(), StatTable::new("owner"))
    }

    fn compile(effects: &[EffectDef], mut ctx: HitContext) -> HitContext {
        let registry = StatusRegistry::default();
        let body = body();
        for def in effects {
            def.instantiate(&registry).on_compile_hit(&body, &mut ctx);
        }
        ctx
    }

    #[test]
    fn test_convert_keeps_survivors_first() {
        let ctx = context()
            .with_damage(DamageInstance::physical(10.0))
            .with_damage(DamageInstance::fire(5.0));
        let ctx = compile(
            &[EffectDef::ConvertDamage {
                from: DamageKind::Physical,
                to: DamageKind::Fire,
            }],
            ctx,
        );
        assert_eq!(
            ctx.damages,
            vec![DamageInstance::fire(5.0), DamageInstance::fire(10.0)]
        );
        assert!((ctx.raw_total() - 15.0).abs() < 1e-5);
    }

    #[test]
    fn test_convert_with_nothing_to_convert() {
        let ctx = compile(
            &[EffectDef::ConvertDamage {
                from: DamageKind::Physical,
                to: DamageKind::Fire,
            }],
            context().with_damage(DamageInstance::fire(5.0)),
        );
        assert_eq!(ctx.damages, vec![DamageInstance::fire(5.0)]);
    }

    #[test]
    fn test_effect_order_matters() {
        let add = EffectDef::AddDamage {
            kind: DamageKind::Physical,
            amount: 10.0,
        };
        let convert = EffectDef::ConvertDamage {
            from: DamageKind::Physical,
            to: DamageKind::Fire,
        };

        let add_then_convert = compile(&[add.clone(), convert.clone()], context());
        assert_eq!(add_then_convert.damages, vec![DamageInstance::fire(10.0)]);

        let convert_then_add = compile(&[convert, add], context());
        assert_eq!(convert_then_add.damages, vec![DamageInstance::physical(10.0)]);
    }

    #[test]
    fn test_percent_only_touches_matching_kind() {
        let ctx = compile(
            &[EffectDef::AddDamagePercent {
                kind: DamageKind::Fire,
                percent: 50.0,
            }],
            context()
                .with_damage(DamageInstance::fire(10.0))
                .with_damage(DamageInstance::physical(10.0)),
        );
        assert_eq!(
            ctx.damages,
            vec![DamageInstance::fire(15.0), DamageInstance::physical(10.0)]
        );
    }

    #[test]
    fn test_base_stats_on_initialize() {
        let mut b = body();
        let def = EffectDef::BaseProjectileStats {
            speed: 20.0,
            lifetime: 2.0,
            size: 0.5,
            tick_rate: 0.25,
        };
        def.instantiate(&StatusRegistry::default()).on_initialize(&mut b);
        assert_eq!(b.speed, 20.0);
        assert_eq!(b.lifetime, 2.0);
        assert_eq!(b.tick_rate, 0.25);
    }

    #[test]
    fn test_hit_twice_schedules_scaled_copy() {
        let mut b = body();
        let ctx = context().with_damage(DamageInstance::physical(20.0));
        let mut effect = EffectDef::HitTwice {
            multiplier: 0.5,
            delay: 0.2,
        }
        .instantiate(&StatusRegistry::default());
        effect.on_hit(&mut b, &ctx);

        let follow_ups = b.take_follow_ups();
        assert_eq!(follow_ups.len(), 1);
        assert_eq!(follow_ups[0].remaining, 0.2);
        assert_eq!(follow_ups[0].context.damages, vec![DamageInstance::physical(10.0)]);
    }

    #[test]
    fn test_apply_status_resolves_registry() {
        let burn = StatusEffect::new(StatusId::new(1), "Burning", 3.0).with_modifier(
            StatKind::Armor,
            -5.0,
            ModifierKind::Flat,
        );
        let mut registry = StatusRegistry::default();
        registry.insert(burn.id, burn.clone());

        let mut ctx = context();
        let b = body();
        EffectDef::ApplyStatus {
            status: burn.id,
            duration: None,
        }
        .instantiate(&registry)
        .on_compile_hit(&b, &mut ctx);
        assert_eq!(ctx.status_effects.len(), 1);
        assert_eq!(ctx.status_effects[0].duration, 3.0);

        // Unknown ids degrade to a no-op.
        let mut ctx = context();
        EffectDef::ApplyStatus {
            status: StatusId::new(99),
            duration: Some(1.0),
        }
        .instantiate(&registry)
        .on_compile_hit(&b, &mut ctx);
        assert!(ctx.status_effects.is_empty());
    }

    #[test]
    fn test_homing_turns_toward_nearest() {
        let mut world = MockWorld::new();
        let near = EntityId::new();
        let far = EntityId::new();
        world.add_body(near, Tag::Enemy, Vec3::new(1.0, 0.0, 0.5), 0.3);
        world.add_body(far, Tag::Enemy, Vec3::new(-1.0, 0.0, 1.5), 0.3);

        let mut b = body();
        let mut homing = Homing::new(1.0, 3.0, LayerMask::of(&[Tag::Enemy]));
        homing.on_update(&mut b, 0.1, &world);

        assert_eq!(homing.locked_target(), Some(near));
        assert!(b.direction.x > 0.0);
        let turned = b.direction.angle_between(Vec3::Z);
        assert!((turned - 0.1).abs() < 1e-3);
    }

    #[test]
    fn test_homing_ignores_owner() {
        let mut world = MockWorld::new();
        let mut b = body();
        world.add_body(b.owner, Tag::Enemy, Vec3::new(0.5, 0.0, 0.0), 0.3);

        let mut homing = Homing::new(1.0, 3.0, LayerMask::ALL);
        homing.on_update(&mut b, 0.1, &world);
        assert_eq!(homing.locked_target(), None);
        assert_eq!(b.direction, Vec3::Z);
    }

    #[test]
    fn test_definitions_parse_from_ron() {
        let text = r"[
            BaseProjectileStats(speed: 30.0),
            AddDamage(kind: Physical, amount: 10.0),
            ConvertDamage(from: Physical, to: Fire),
            HitTwice(delay: 0.3),
            Homing(radius: 4.0, mask: [Player]),
        ]";
        let defs: Vec<EffectDef> = ron::from_str(text).expect("valid RON");
        assert_eq!(defs.len(), 5);
        assert_eq!(
            defs[0],
            EffectDef::BaseProjectileStats {
                speed: 30.0,
                lifetime: 5.0,
                size: 0.1,
                tick_rate: 0.5,
            }
        );
        assert_eq!(
            defs[3],
            EffectDef::HitTwice {
                multiplier: 0.1,
                delay: 0.3,
            }
        );
        assert_eq!(
            defs[4],
            EffectDef::Homing {
                rotation_speed: 5.0,
                radius: 4.0,
                mask: LayerMask::of(&[Tag::Player]),
            }
        );
    }
}
