//! Attack behaviors plugged into the enemy controller.
//!
//! This module provides:
//! - Melee: walk up, face, strike after a wind-up
//! - Ranged: keep distance, face, cast a spell with inaccuracy
//! - Leap: parabolic jump with landing damage and a melee fallback
//!
//! Wind-ups and leaps are explicit timers advanced by the controller's step, so
//! death cancels them by simply not advancing them any more.

use emberfall_common::geometry::{deviate, look_rotation_flat, parabolic_arc};
use emberfall_common::{EntityId, LayerMask, Tag};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{face_towards, move_towards, ActorBody};
use crate::config::{AggroConfig, AttackConfig, LeapConfig, MeleeConfig, RangedConfig};
use crate::damage::{DamageInstance, DamageKind, HitContext, HitOutcome};
use crate::effects::StatusRegistry;
use crate::spell::{CastRequest, Loadout};
use crate::stats::{StatKind, StatTable};
use crate::world::{CombatWorld, PlayerSnapshot};

/// Per-step inputs shared by every attack behavior.
pub struct AttackInput<'a> {
    /// Attacking actor.
    pub id: EntityId,
    /// Its body.
    pub body: &'a mut ActorBody,
    /// Its pursuit tunables.
    pub aggro: &'a AggroConfig,
    /// The player being attacked.
    pub player: &'a PlayerSnapshot,
    /// Step length.
    pub dt: f32,
}

/// Hits the first player collider inside a sphere with the attacker's contact damage.
fn contact_strike<W: CombatWorld>(
    world: &mut W,
    attacker: EntityId,
    center: Vec3,
    radius: f32,
    kind: DamageKind,
    rng: &mut fastrand::Rng,
) -> Option<HitOutcome> {
    let victim = world
        .overlap_sphere(center, radius, LayerMask::of(&[Tag::Player]))
        .into_iter()
        .find(|c| c.tag == Tag::Player && !world.is_part_of(c, attacker))?;

    let stats = world.stats_of(attacker).cloned().unwrap_or_default();
    let amount = stats.get(StatKind::ContactDamage);
    let context = HitContext::new(victim.entity, attacker, stats)
        .with_damage(DamageInstance::new(kind, amount));
    let outcome = world.deliver_hit(&context, rng);
    debug!(attacker = %attacker, target = %victim.entity, amount, "Contact strike landed");
    outcome
}

// ============================================================================
// Melee
// ============================================================================

/// Close-range strike.
#[derive(Debug, Clone)]
pub struct MeleeAttack {
    config: MeleeConfig,
    cooldown_timer: f32,
    pending_strike: Option<f32>,
}

impl MeleeAttack {
    /// Creates a ready-to-fight melee behavior.
    #[must_use]
    pub fn new(config: MeleeConfig) -> Self {
        Self {
            config,
            cooldown_timer: 0.0,
            pending_strike: None,
        }
    }

    /// Tunables.
    #[must_use]
    pub fn config(&self) -> &MeleeConfig {
        &self.config
    }

    /// Whether a strike is winding up.
    #[must_use]
    pub fn has_pending_strike(&self) -> bool {
        self.pending_strike.is_some()
    }

    fn aggro<W: CombatWorld>(&mut self, input: AttackInput<'_>, world: &mut W) {
        let distance = input.body.position.distance(input.player.position);
        self.cooldown_timer += input.dt;

        if distance <= self.config.range {
            world.set_walking(input.id, false);
            face_towards(input.body, input.player.position, input.aggro.facing_rate, input.dt);
            if self.cooldown_timer >= self.config.cooldown {
                world.trigger_attack(input.id);
                self.pending_strike = Some(self.config.damage_delay);
                self.cooldown_timer = 0.0;
            }
        } else {
            world.set_walking(input.id, true);
            move_towards(
                world,
                input.id,
                input.body,
                input.player.position,
                input.aggro.aggro_speed,
                input.aggro.facing_rate,
                input.dt,
            );
        }
    }

    /// Counts down the wind-up; strikes when it elapses unless `suppressed`.
    fn advance_strike<W: CombatWorld>(
        &mut self,
        dt: f32,
        id: EntityId,
        body: &ActorBody,
        suppressed: bool,
        world: &mut W,
        rng: &mut fastrand::Rng,
    ) {
        let Some(remaining) = self.pending_strike else {
            return;
        };
        let remaining = remaining - dt;
        if remaining > 0.0 {
            self.pending_strike = Some(remaining);
            return;
        }
        self.pending_strike = None;
        if suppressed {
            return;
        }
        let center = body.position + body.rotation * self.config.strike_offset;
        contact_strike(
            world,
            id,
            center,
            self.config.strike_radius,
            self.config.damage_kind,
            rng,
        );
    }

    fn cancel(&mut self) {
        self.pending_strike = None;
    }
}

// ============================================================================
// Ranged
// ============================================================================

/// Spell-casting from a distance.
#[derive(Debug, Clone)]
pub struct RangedAttack {
    config: RangedConfig,
    loadout: Loadout,
    statuses: StatusRegistry,
    cooldown_timer: f32,
}

impl RangedAttack {
    /// Creates a behavior with nothing equipped.
    #[must_use]
    pub fn new(config: RangedConfig) -> Self {
        Self {
            config,
            loadout: Loadout::default(),
            statuses: StatusRegistry::default(),
            cooldown_timer: 0.0,
        }
    }

    /// Equips a loadout and the statuses its effects may reference.
    pub fn equip(&mut self, loadout: Loadout, statuses: StatusRegistry) {
        self.loadout = loadout;
        self.statuses = statuses;
    }

    /// Tunables.
    #[must_use]
    pub fn config(&self) -> &RangedConfig {
        &self.config
    }

    /// Equipped loadout.
    #[must_use]
    pub fn loadout(&self) -> &Loadout {
        &self.loadout
    }

    fn aggro<W: CombatWorld>(&mut self, input: AttackInput<'_>, world: &mut W, rng: &mut fastrand::Rng) {
        let distance = input.body.position.distance(input.player.position);
        self.cooldown_timer += input.dt;

        if distance <= self.config.range {
            world.set_walking(input.id, false);
            face_towards(input.body, input.player.position, input.aggro.facing_rate, input.dt);
            if self.cooldown_timer >= self.config.cooldown {
                self.shoot(input.id, input.body, input.player, world, rng);
                self.cooldown_timer = 0.0;
            }
        } else {
            world.set_walking(input.id, true);
            move_towards(
                world,
                input.id,
                input.body,
                input.player.position,
                input.aggro.aggro_speed,
                input.aggro.facing_rate,
                input.dt,
            );
        }
    }

    fn shoot<W: CombatWorld>(
        &self,
        id: EntityId,
        body: &ActorBody,
        player: &PlayerSnapshot,
        world: &mut W,
        rng: &mut fastrand::Rng,
    ) {
        world.trigger_attack(id);
        if self.loadout.spell.is_none() {
            warn!(entity = %id, "Shooter has no spell equipped");
            return;
        }

        let origin = body.position + body.rotation * self.config.muzzle_offset;
        let target = player.position + Vec3::Y * self.config.aim_height;
        let aim = (target - origin).normalize_or_zero();
        if aim == Vec3::ZERO {
            return;
        }
        let spread = self.config.accuracy;
        let yaw = (rng.f32() * 2.0 - 1.0) * spread;
        let pitch = (rng.f32() * 2.0 - 1.0) * spread;
        let direction = deviate(aim, yaw, pitch);

        let owner_stats = world
            .stats_of(id)
            .cloned()
            .unwrap_or_else(|| StatTable::new(id.to_string()));
        let request = CastRequest {
            owner: id,
            owner_stats,
            origin,
            direction,
            damageable: LayerMask::of(&[Tag::Player]),
        };
        if let Some(projectile) = self.loadout.cast(request, &self.statuses) {
            world.spawn_projectile(projectile);
        }
    }
}

// ============================================================================
// Leap
// ============================================================================

/// A leap in progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeapFlight {
    /// Take-off point.
    pub start: Vec3,
    /// Landing point.
    pub target: Vec3,
    /// Seconds in the air so far.
    pub elapsed: f32,
}

/// Parabolic leap with landing damage; melee when already adjacent.
#[derive(Debug, Clone)]
pub struct LeapAttack {
    config: LeapConfig,
    melee: MeleeAttack,
    leap_timer: f32,
    flight: Option<LeapFlight>,
}

impl LeapAttack {
    /// Creates a ready-to-fight leap behavior.
    #[must_use]
    pub fn new(config: LeapConfig) -> Self {
        Self {
            melee: MeleeAttack::new(config.melee.clone()),
            config,
            leap_timer: 0.0,
            flight: None,
        }
    }

    /// Tunables.
    #[must_use]
    pub fn config(&self) -> &LeapConfig {
        &self.config
    }

    /// Current leap, if airborne.
    #[must_use]
    pub fn flight(&self) -> Option<&LeapFlight> {
        self.flight.as_ref()
    }

    fn aggro<W: CombatWorld>(&mut self, input: AttackInput<'_>, world: &mut W) {
        if self.flight.is_some() {
            return;
        }
        let distance = input.body.position.distance(input.player.position);
        self.melee.cooldown_timer += input.dt;
        self.leap_timer += input.dt;

        if distance <= self.melee.config.range {
            world.set_walking(input.id, false);
            face_towards(input.body, input.player.position, input.aggro.facing_rate, input.dt);
            if self.melee.cooldown_timer >= self.melee.config.cooldown {
                world.trigger_attack(input.id);
                self.melee.pending_strike = Some(self.melee.config.damage_delay);
                self.melee.cooldown_timer = 0.0;
            }
            return;
        }

        if distance > self.config.min_range
            && distance <= self.config.max_range
            && self.leap_timer >= self.config.cooldown
        {
            self.take_off(input.id, input.body, input.player, input.aggro, world);
            return;
        }

        world.set_walking(input.id, true);
        move_towards(
            world,
            input.id,
            input.body,
            input.player.position,
            self.config.chase_speed,
            input.aggro.facing_rate,
            input.dt,
        );
    }

    fn take_off<W: CombatWorld>(
        &mut self,
        id: EntityId,
        body: &mut ActorBody,
        player: &PlayerSnapshot,
        aggro: &AggroConfig,
        world: &mut W,
    ) {
        self.leap_timer = 0.0;
        let target = world
            .sample_navigable(player.position, aggro.snap_tolerance)
            .unwrap_or(player.position);
        world.trigger_attack(id);
        if let Some(rotation) = look_rotation_flat(target - body.position) {
            body.rotation = rotation;
        }
        debug!(entity = %id, from = ?body.position, to = ?target, "Leap started");
        self.flight = Some(LeapFlight {
            start: body.position,
            target,
            elapsed: 0.0,
        });
    }

    /// Moves along the arc; lands and deals damage when the leap time is up.
    fn advance_flight<W: CombatWorld>(
        &mut self,
        dt: f32,
        id: EntityId,
        body: &mut ActorBody,
        world: &mut W,
        rng: &mut fastrand::Rng,
    ) {
        let Some(flight) = self.flight.as_mut() else {
            return;
        };
        flight.elapsed += dt;
        let t = (flight.elapsed / self.config.duration).min(1.0);
        let mut position = flight.start.lerp(flight.target, t);
        position.y += parabolic_arc(self.config.height, t);
        body.position = position;

        if flight.elapsed >= self.config.duration {
            body.position = flight.target;
            self.flight = None;
            debug!(entity = %id, at = ?body.position, "Leap landed");
            contact_strike(
                world,
                id,
                body.position,
                self.config.landing_radius,
                self.config.damage_kind,
                rng,
            );
        }
    }
}

// ============================================================================
// Behavior selector
// ============================================================================

/// Attack behavior chosen per actor at construction.
#[derive(Debug, Clone)]
pub enum AttackBehavior {
    /// Close-range strikes.
    Melee(MeleeAttack),
    /// Spell-casting.
    Ranged(RangedAttack),
    /// Leaping.
    Leap(LeapAttack),
}

impl AttackBehavior {
    /// Builds the behavior described by `config`.
    #[must_use]
    pub fn from_config(config: &AttackConfig) -> Self {
        match config {
            AttackConfig::Melee(melee) => Self::Melee(MeleeAttack::new(melee.clone())),
            AttackConfig::Ranged(ranged) => Self::Ranged(RangedAttack::new(ranged.clone())),
            AttackConfig::Leap(leap) => Self::Leap(LeapAttack::new(leap.clone())),
        }
    }

    /// Short name for diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Melee(_) => "Melee",
            Self::Ranged(_) => "Ranged",
            Self::Leap(_) => "Leap",
        }
    }

    /// Speed used when pursuing a remembered position.
    #[must_use]
    pub fn chase_speed(&self, aggro: &AggroConfig) -> f32 {
        match self {
            Self::Leap(leap) => leap.config.chase_speed,
            Self::Melee(_) | Self::Ranged(_) => aggro.aggro_speed,
        }
    }

    /// Whether the actor is airborne.
    #[must_use]
    pub fn is_leaping(&self) -> bool {
        matches!(self, Self::Leap(leap) if leap.flight.is_some())
    }

    /// Runs one step of attack logic while the player is perceived.
    pub(crate) fn aggro<W: CombatWorld>(
        &mut self,
        input: AttackInput<'_>,
        world: &mut W,
        rng: &mut fastrand::Rng,
    ) {
        match self {
            Self::Melee(melee) => melee.aggro(input, world),
            Self::Ranged(ranged) => ranged.aggro(input, world, rng),
            Self::Leap(leap) => leap.aggro(input, world),
        }
    }

    /// Advances wind-ups and leaps. Called every step before perception.
    pub(crate) fn advance_timers<W: CombatWorld>(
        &mut self,
        dt: f32,
        id: EntityId,
        body: &mut ActorBody,
        world: &mut W,
        rng: &mut fastrand::Rng,
    ) {
        match self {
            Self::Melee(melee) => melee.advance_strike(dt, id, body, false, world, rng),
            Self::Ranged(_) => {},
            Self::Leap(leap) => {
                // A strike that comes due mid-leap is dropped.
                let airborne = leap.flight.is_some();
                leap.melee.advance_strike(dt, id, body, airborne, world, rng);
                leap.advance_flight(dt, id, body, world, rng);
            },
        }
    }

    /// Drops every in-flight action.
    pub(crate) fn cancel(&mut self) {
        match self {
            Self::Melee(melee) => melee.cancel(),
            Self::Ranged(_) => {},
            Self::Leap(leap) => {
                leap.melee.cancel();
                leap.flight = None;
            },
        }
    }
}
