//! Projectile simulation.
//!
//! This module provides:
//! - [`ProjectileBody`]: flight state the effect pipeline reads and writes
//! - [`Projectile`]: the body plus its runtime effects, stepped by the host
//!
//! Hit detection sweeps a ray from the previous position over the step's travel
//! plus a small contact skin, so fast projectiles never tunnel through thin targets.

use emberfall_common::{Collider, EntityId, LayerMask, Tag};
use glam::Vec3;
use tracing::{debug, trace};

use crate::damage::{HitContext, HitOutcome};
use crate::effects::SpellEffect;
use crate::scheduler::ScheduledHit;
use crate::stats::StatTable;
use crate::world::{HitReceiver, WorldQuery};

/// Extra ray length beyond the step's travel.
pub const CONTACT_SKIN: f32 = 0.5;

/// Travel below this is not swept for hits.
pub const MIN_TRAVEL: f32 = 0.001;

/// Speed before any effect sets one.
pub const DEFAULT_SPEED: f32 = 10.0;

/// Lifetime before any effect sets one.
pub const DEFAULT_LIFETIME: f32 = 5.0;

// ============================================================================
// Body
// ============================================================================

/// Flight state of one projectile.
#[derive(Debug, Clone)]
pub struct ProjectileBody {
    /// Who fired it.
    pub owner: EntityId,
    /// Owner stats captured at cast time.
    pub owner_stats: StatTable,
    /// Current position.
    pub position: Vec3,
    /// Unit flight direction.
    pub direction: Vec3,
    /// Units per second.
    pub speed: f32,
    /// Seconds of flight before expiry.
    pub lifetime: f32,
    /// Scale.
    pub size: f32,
    /// Seconds between ticks.
    pub tick_rate: f32,
    /// Seconds flown.
    pub age: f32,
    /// Tags the hit sweep collides with.
    pub collision_mask: LayerMask,
    /// Tags that take damage on impact.
    pub damageable: LayerMask,
    follow_ups: Vec<ScheduledHit>,
}

impl ProjectileBody {
    /// Creates a body with default flight stats that damages players.
    #[must_use]
    pub fn new(owner: EntityId, owner_stats: StatTable, position: Vec3, direction: Vec3) -> Self {
        Self {
            owner,
            owner_stats,
            position,
            direction: direction.normalize_or_zero(),
            speed: DEFAULT_SPEED,
            lifetime: DEFAULT_LIFETIME,
            size: 1.0,
            tick_rate: f32::MAX,
            age: 0.0,
            collision_mask: LayerMask::ALL,
            damageable: LayerMask::of(&[Tag::Player]),
            follow_ups: Vec::new(),
        }
    }

    /// Sets which tags take damage (builder pattern).
    #[must_use]
    pub fn with_damageable(mut self, damageable: LayerMask) -> Self {
        self.damageable = damageable;
        self
    }

    /// Sets which tags stop the projectile (builder pattern).
    #[must_use]
    pub fn with_collision_mask(mut self, mask: LayerMask) -> Self {
        self.collision_mask = mask;
        self
    }

    /// Overwrites flight parameters. Size scales the current size.
    pub fn set_stats(&mut self, speed: f32, lifetime: f32, size: f32, tick_rate: f32) {
        self.speed = speed;
        self.lifetime = lifetime;
        self.size *= size;
        self.tick_rate = tick_rate;
    }

    /// Changes direction; degenerate directions are ignored.
    pub fn set_direction(&mut self, direction: Vec3) {
        let direction = direction.normalize_or_zero();
        if direction != Vec3::ZERO {
            self.direction = direction;
        }
    }

    /// Seconds until expiry.
    #[must_use]
    pub fn remaining_lifetime(&self) -> f32 {
        (self.lifetime - self.age).max(0.0)
    }

    /// Queues a delayed hit for the host's scheduler.
    pub fn schedule_follow_up(&mut self, hit: ScheduledHit) {
        self.follow_ups.push(hit);
    }

    /// Hands queued follow-up hits to the caller.
    pub fn take_follow_ups(&mut self) -> Vec<ScheduledHit> {
        std::mem::take(&mut self.follow_ups)
    }
}

// ============================================================================
// Projectile
// ============================================================================

/// What happened during one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// Still in flight.
    Flying,
    /// Struck something and was destroyed.
    Impact {
        /// What was struck.
        struck: Collider,
        /// Damage dealt, if the struck collider was damageable.
        outcome: Option<HitOutcome>,
    },
    /// Ran out of lifetime and was destroyed.
    Expired,
    /// Was already destroyed; nothing ran.
    Destroyed,
}

/// A projectile in flight with its runtime effect instances.
#[derive(Debug)]
pub struct Projectile {
    body: ProjectileBody,
    effects: Vec<Box<dyn SpellEffect>>,
    next_tick: f32,
    destroyed: bool,
}

impl Projectile {
    /// Creates a projectile and runs every effect's initialize hook.
    ///
    /// The first tick is scheduled after the hooks so a tick rate set by an effect
    /// takes effect immediately.
    #[must_use]
    pub fn launch(body: ProjectileBody, effects: Vec<Box<dyn SpellEffect>>) -> Self {
        let mut projectile = Self {
            body,
            effects,
            next_tick: 0.0,
            destroyed: false,
        };
        for effect in &mut projectile.effects {
            effect.on_initialize(&mut projectile.body);
        }
        projectile.next_tick = projectile.body.age + projectile.body.tick_rate;
        projectile
    }

    /// Flight state.
    #[must_use]
    pub fn body(&self) -> &ProjectileBody {
        &self.body
    }

    /// Runtime effect names in pipeline order.
    pub fn effect_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.effects.iter().map(|e| e.name())
    }

    /// Whether the projectile has been destroyed.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Hands queued follow-up hits to the caller.
    pub fn take_follow_ups(&mut self) -> Vec<ScheduledHit> {
        self.body.take_follow_ups()
    }

    /// Advances the projectile by `dt` seconds.
    pub fn step<W>(&mut self, dt: f32, world: &mut W, rng: &mut fastrand::Rng) -> StepOutcome
    where
        W: WorldQuery + HitReceiver,
    {
        if self.destroyed {
            return StepOutcome::Destroyed;
        }

        let travel = self.body.direction * self.body.speed * dt;
        let distance = travel.length();
        if distance > MIN_TRAVEL {
            let query: &W = world;
            let owner = self.body.owner;
            // The owner never stops its own projectile, nor hides what lies behind it.
            let hit = query.raycast_filtered(
                self.body.position,
                self.body.direction,
                distance + CONTACT_SKIN,
                self.body.collision_mask,
                &|collider| !query.is_part_of(collider, owner),
            );
            if let Some(hit) = hit {
                self.body.position = hit.point;
                let outcome = self.resolve_impact(hit.collider, world, rng);
                self.destroy(false);
                return StepOutcome::Impact {
                    struck: hit.collider,
                    outcome,
                };
            }
        }

        self.body.position += travel;
        self.body.age += dt;

        if self.body.age > self.body.lifetime {
            self.destroy(true);
            return StepOutcome::Expired;
        }

        for effect in &mut self.effects {
            effect.on_update(&mut self.body, dt, &*world);
        }

        if self.body.age > self.next_tick {
            for effect in &mut self.effects {
                effect.on_tick(&mut self.body);
            }
            self.next_tick += self.body.tick_rate;
        }

        StepOutcome::Flying
    }

    fn resolve_impact<W>(
        &mut self,
        struck: Collider,
        world: &mut W,
        rng: &mut fastrand::Rng,
    ) -> Option<HitOutcome>
    where
        W: WorldQuery + HitReceiver,
    {
        if !self.body.damageable.contains(struck.tag) {
            trace!(entity = %struck.entity, "Projectile hit non-damageable collider");
            return None;
        }

        let mut context =
            HitContext::new(struck.entity, self.body.owner, self.body.owner_stats.clone());
        for effect in &mut self.effects {
            effect.on_compile_hit(&self.body, &mut context);
        }

        let outcome = world.deliver_hit(&context, rng)?;
        debug!(target = %struck.entity, damage = outcome.total, "Projectile hit");

        for effect in &mut self.effects {
            effect.on_hit(&mut self.body, &context);
        }
        Some(outcome)
    }

    /// Destroys the projectile; only the first call has any effect.
    ///
    /// Lifetime-end hooks run only when `lifetime_end` is set.
    pub fn destroy(&mut self, lifetime_end: bool) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if lifetime_end {
            for effect in &mut self.effects {
                effect.on_lifetime_end(&mut self.body);
            }
        }
    }
}
