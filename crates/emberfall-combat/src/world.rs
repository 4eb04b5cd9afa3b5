//! Capabilities the combat core consumes from its host.
//!
//! This module provides:
//! - World queries (raycast, sphere overlap, navigable sampling)
//! - Navigation and presentation sinks
//! - Projectile spawning and hit delivery
//!
//! The core never owns physics, navmeshes or animation; a host implements these
//! traits and drives the core with explicit `step` calls.

use emberfall_common::{Collider, EntityId, LayerMask, RayHit};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::damage::{HitContext, HitOutcome};
use crate::projectile::Projectile;
use crate::stats::StatTable;

/// Read-only view of the player committed at the end of the previous step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Player entity.
    pub entity: EntityId,
    /// Feet position.
    pub position: Vec3,
}

/// Result of one navigation advance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavStep {
    /// Agent position after moving.
    pub position: Vec3,
    /// Whether the agent reached its destination.
    pub arrived: bool,
}

/// Opaque handle to a spawned projectile. The core never retains it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectileHandle(pub u64);

/// Physics and navmesh queries.
pub trait WorldQuery {
    /// Casts a ray and returns the nearest hit whose collider passes `keep`.
    ///
    /// Colliders rejected by `keep` never block the ray; `direction` is unit length.
    fn raycast_filtered(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
        keep: &dyn Fn(&Collider) -> bool,
    ) -> Option<RayHit>;

    /// Casts a ray; `direction` is unit length.
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit> {
        self.raycast_filtered(origin, direction, max_distance, mask, &|_| true)
    }

    /// Colliders touching a sphere.
    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: LayerMask) -> Vec<Collider>;

    /// Nearest navigable point within `tolerance` of `point`.
    fn sample_navigable(&self, point: Vec3, tolerance: f32) -> Option<Vec3>;

    /// Current position of an entity, `None` once it is gone.
    fn position_of(&self, entity: EntityId) -> Option<Vec3>;

    /// Whether `collider` belongs to `root` or one of its children.
    fn is_part_of(&self, collider: &Collider, root: EntityId) -> bool {
        collider.entity == root
    }
}

/// Moves agents along navigable paths.
pub trait Navigation {
    /// Advances `agent` from `from` toward `destination` by at most `speed * dt`.
    fn advance(
        &mut self,
        agent: EntityId,
        from: Vec3,
        destination: Vec3,
        speed: f32,
        dt: f32,
    ) -> NavStep;
}

/// Fire-and-forget animation cues.
pub trait Presentation {
    /// Toggles the walking animation.
    fn set_walking(&mut self, _agent: EntityId, _walking: bool) {}

    /// Plays the attack animation once.
    fn trigger_attack(&mut self, _agent: EntityId) {}

    /// Switches to the death pose.
    fn set_dead(&mut self, _agent: EntityId) {}
}

/// Instantiates projectiles.
pub trait ProjectileSpawner {
    /// Hands a fully built projectile to the host.
    fn spawn_projectile(&mut self, projectile: Projectile) -> ProjectileHandle;
}

/// Routes hits to whatever owns the target's stats.
pub trait HitReceiver {
    /// Resolves `context` against its target; `None` if the target cannot be hit.
    fn deliver_hit(&mut self, context: &HitContext, rng: &mut fastrand::Rng)
        -> Option<HitOutcome>;

    /// Stats of a damageable entity.
    fn stats_of(&self, entity: EntityId) -> Option<&StatTable>;
}

/// Everything an enemy controller needs from its host.
pub trait CombatWorld: WorldQuery + Navigation + Presentation + ProjectileSpawner + HitReceiver {}

impl<T> CombatWorld for T where
    T: WorldQuery + Navigation + Presentation + ProjectileSpawner + HitReceiver
{
}

// ============================================================================
// Mock world
// ============================================================================

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use crate::combatant::Combatant;
    use crate::events::EventHub;
    use ahash::AHashMap;
    use emberfall_common::geometry::{ray_aabb, ray_sphere};
    use emberfall_common::Tag;

    #[derive(Debug, Clone, Copy)]
    pub struct MockBody {
        pub collider: Collider,
        pub center: Vec3,
        pub radius: f32,
    }

    /// Minimal host for unit tests: spheres, boxes and straight-line navigation.
    #[derive(Debug, Default)]
    pub struct MockWorld {
        pub bodies: Vec<MockBody>,
        pub walls: Vec<(Collider, Vec3, Vec3)>,
        pub off_navmesh: bool,
        pub combatants: AHashMap<EntityId, Combatant>,
        pub events: EventHub,
        pub delivered: Vec<HitContext>,
        pub spawned: Vec<Projectile>,
        pub walking: AHashMap<EntityId, bool>,
        pub attacks: Vec<EntityId>,
        pub dead: Vec<EntityId>,
    }

    impl MockWorld {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_body(&mut self, entity: EntityId, tag: Tag, center: Vec3, radius: f32) {
            self.bodies.push(MockBody {
                collider: Collider::new(entity, tag),
                center,
                radius,
            });
        }

        pub fn add_wall(&mut self, min: Vec3, max: Vec3) -> EntityId {
            let id = EntityId::new();
            self.walls.push((Collider::new(id, Tag::World), min, max));
            id
        }

        pub fn add_combatant(&mut self, combatant: Combatant, center: Vec3, radius: f32) {
            self.add_body(combatant.id(), combatant.tag(), center, radius);
            self.combatants.insert(combatant.id(), combatant);
        }

        pub fn move_body(&mut self, entity: EntityId, center: Vec3) {
            for body in &mut self.bodies {
                if body.collider.entity == entity {
                    body.center = center;
                }
            }
        }

        pub fn remove(&mut self, entity: EntityId) {
            self.bodies.retain(|b| b.collider.entity != entity);
            self.combatants.remove(&entity);
        }

        pub fn health_of(&self, entity: EntityId) -> f32 {
            self.combatants.get(&entity).map_or(0.0, Combatant::health)
        }
    }

    impl WorldQuery for MockWorld {
        fn raycast_filtered(
            &self,
            origin: Vec3,
            direction: Vec3,
            max_distance: f32,
            mask: LayerMask,
            keep: &dyn Fn(&Collider) -> bool,
        ) -> Option<RayHit> {
            let spheres = self
                .bodies
                .iter()
                .filter(|b| mask.contains(b.collider.tag) && keep(&b.collider))
                .filter_map(|b| {
                    ray_sphere(origin, direction, b.center, b.radius).map(|t| (t, b.collider))
                });
            let boxes = self
                .walls
                .iter()
                .filter(|(c, _, _)| mask.contains(c.tag) && keep(c))
                .filter_map(|(c, min, max)| {
                    ray_aabb(origin, direction, *min, *max).map(|t| (t, *c))
                });
            spheres
                .chain(boxes)
                .filter(|(t, _)| *t <= max_distance)
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .map(|(distance, collider)| RayHit {
                    point: origin + direction * distance,
                    distance,
                    collider,
                })
        }

        fn overlap_sphere(&self, center: Vec3, radius: f32, mask: LayerMask) -> Vec<Collider> {
            self.bodies
                .iter()
                .filter(|b| mask.contains(b.collider.tag))
                .filter(|b| b.center.distance(center) <= radius + b.radius)
                .map(|b| b.collider)
                .collect()
        }

        fn sample_navigable(&self, point: Vec3, _tolerance: f32) -> Option<Vec3> {
            if self.off_navmesh {
                None
            } else {
                Some(Vec3::new(point.x, 0.0, point.z))
            }
        }

        fn position_of(&self, entity: EntityId) -> Option<Vec3> {
            self.bodies
                .iter()
                .find(|b| b.collider.entity == entity)
                .map(|b| b.center)
        }
    }

    impl Navigation for MockWorld {
        fn advance(
            &mut self,
            _agent: EntityId,
            from: Vec3,
            destination: Vec3,
            speed: f32,
            dt: f32,
        ) -> NavStep {
            let to = destination - from;
            let step = speed * dt;
            if to.length() <= step.max(0.05) {
                NavStep {
                    position: destination,
                    arrived: true,
                }
            } else {
                NavStep {
                    position: from + to.normalize() * step,
                    arrived: false,
                }
            }
        }
    }

    impl Presentation for MockWorld {
        fn set_walking(&mut self, agent: EntityId, walking: bool) {
            self.walking.insert(agent, walking);
        }

        fn trigger_attack(&mut self, agent: EntityId) {
            self.attacks.push(agent);
        }

        fn set_dead(&mut self, agent: EntityId) {
            self.dead.push(agent);
        }
    }

    impl ProjectileSpawner for MockWorld {
        fn spawn_projectile(&mut self, projectile: Projectile) -> ProjectileHandle {
            self.spawned.push(projectile);
            ProjectileHandle(self.spawned.len() as u64)
        }
    }

    impl HitReceiver for MockWorld {
        fn deliver_hit(
            &mut self,
            context: &HitContext,
            rng: &mut fastrand::Rng,
        ) -> Option<HitOutcome> {
            self.delivered.push(context.clone());
            let target = self.combatants.get_mut(&context.target)?;
            target.take_hit(context, rng, &mut self.events)
        }

        fn stats_of(&self, entity: EntityId) -> Option<&StatTable> {
            self.combatants.get(&entity).map(Combatant::stats)
        }
    }
}
