//! The arena world: the host side of every combat capability trait.
//!
//! This module provides:
//! - Sphere bodies for actors and box walls for cover
//! - Straight-line navigation clamped to the floor
//! - Hit delivery into host-owned combatants
//! - A record of presentation cues for the run summary
//!
//! Navigation moves agents in straight lines and does not route around walls.

use ahash::AHashMap;
use emberfall_combat::combatant::Combatant;
use emberfall_combat::damage::{HitContext, HitOutcome};
use emberfall_combat::events::EventHub;
use emberfall_combat::projectile::Projectile;
use emberfall_combat::stats::StatTable;
use emberfall_combat::world::{
    HitReceiver, NavStep, Navigation, Presentation, ProjectileHandle, ProjectileSpawner,
    WorldQuery,
};
use emberfall_common::geometry::{flat_distance, ray_aabb, ray_sphere, sphere_intersects_aabb};
use emberfall_common::{Collider, EntityId, LayerMask, RayHit, Tag};
use glam::Vec3;
use serde::Serialize;
use tracing::trace;

use crate::config::{ArenaConfig, WallConfig};

/// Radius of every actor's body sphere.
pub const ACTOR_RADIUS: f32 = 0.5;

/// Height of an actor's body center above its feet.
pub const BODY_HEIGHT: f32 = 1.0;

/// Distance under which a navigating agent counts as arrived.
const ARRIVAL_EPSILON: f32 = 0.05;

#[derive(Debug, Clone, Copy)]
struct Body {
    collider: Collider,
    center: Vec3,
}

#[derive(Debug, Clone, Copy)]
struct Wall {
    collider: Collider,
    min: Vec3,
    max: Vec3,
}

/// Presentation cues an actor received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CueCounts {
    /// Attack animations triggered.
    pub attacks: u32,
    /// Whether the walking animation is on.
    pub walking: bool,
    /// Whether the death pose was shown.
    pub dead: bool,
}

/// Square floor with walls, actor bodies and combatants.
#[derive(Debug)]
pub struct ArenaWorld {
    half_extent: f32,
    bodies: Vec<Body>,
    walls: Vec<Wall>,
    combatants: AHashMap<EntityId, Combatant>,
    events: EventHub,
    spawned: Vec<Projectile>,
    next_projectile: u64,
    cues: AHashMap<EntityId, CueCounts>,
}

impl ArenaWorld {
    /// Creates the floor and its walls.
    #[must_use]
    pub fn new(config: &ArenaConfig) -> Self {
        let mut world = Self {
            half_extent: config.half_extent,
            bodies: Vec::new(),
            walls: Vec::new(),
            combatants: AHashMap::new(),
            events: EventHub::default(),
            spawned: Vec::new(),
            next_projectile: 0,
            cues: AHashMap::new(),
        };
        for wall in &config.walls {
            world.add_wall(wall);
        }
        world
    }

    /// Half the floor's side length.
    #[must_use]
    pub const fn half_extent(&self) -> f32 {
        self.half_extent
    }

    /// Adds a wall; corners are sorted so either order works.
    pub fn add_wall(&mut self, wall: &WallConfig) -> EntityId {
        let id = EntityId::new();
        self.walls.push(Wall {
            collider: Collider::new(id, Tag::World),
            min: wall.min.min(wall.max),
            max: wall.min.max(wall.max),
        });
        id
    }

    /// Places a combatant with its feet at `feet`.
    pub fn add_actor(&mut self, combatant: Combatant, feet: Vec3) -> EntityId {
        let id = combatant.id();
        self.bodies.push(Body {
            collider: Collider::new(id, combatant.tag()),
            center: feet + Vec3::Y * BODY_HEIGHT,
        });
        self.combatants.insert(id, combatant);
        id
    }

    /// Moves an actor's body to follow its feet. Unknown actors are ignored.
    pub fn set_feet(&mut self, entity: EntityId, feet: Vec3) {
        if let Some(body) = self.bodies.iter_mut().find(|b| b.collider.entity == entity) {
            body.center = feet + Vec3::Y * BODY_HEIGHT;
        }
    }

    /// Removes an actor's body; its combatant stays for reporting.
    pub fn remove_body(&mut self, entity: EntityId) {
        self.bodies.retain(|b| b.collider.entity != entity);
    }

    /// Whether an actor still has a body.
    #[must_use]
    pub fn has_body(&self, entity: EntityId) -> bool {
        self.bodies.iter().any(|b| b.collider.entity == entity)
    }

    /// Combatant state of an actor.
    #[must_use]
    pub fn combatant(&self, entity: EntityId) -> Option<&Combatant> {
        self.combatants.get(&entity)
    }

    /// Event hub combatants publish to.
    #[must_use]
    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Mutable access to the event hub.
    pub fn events_mut(&mut self) -> &mut EventHub {
        &mut self.events
    }

    /// Hands over projectiles spawned since the last call.
    pub fn take_spawned(&mut self) -> Vec<Projectile> {
        std::mem::take(&mut self.spawned)
    }

    /// Ticks every combatant's timed modifiers.
    pub fn tick_combatants(&mut self, dt: f32) {
        for combatant in self.combatants.values_mut() {
            combatant.tick(dt);
        }
    }

    /// Cues recorded for an actor.
    #[must_use]
    pub fn cues(&self, entity: EntityId) -> CueCounts {
        self.cues.get(&entity).copied().unwrap_or_default()
    }

    /// Clamps a point onto the floor.
    #[must_use]
    pub fn clamp_to_floor(&self, point: Vec3) -> Vec3 {
        let h = self.half_extent;
        Vec3::new(point.x.clamp(-h, h), 0.0, point.z.clamp(-h, h))
    }
}

impl WorldQuery for ArenaWorld {
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
                ray_sphere(origin, direction, b.center, ACTOR_RADIUS).map(|t| (t, b.collider))
            });
        let boxes = self
            .walls
            .iter()
            .filter(|w| mask.contains(w.collider.tag) && keep(&w.collider))
            .filter_map(|w| ray_aabb(origin, direction, w.min, w.max).map(|t| (t, w.collider)));

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
        let bodies = self
            .bodies
            .iter()
            .filter(|b| mask.contains(b.collider.tag))
            .filter(|b| b.center.distance(center) <= radius + ACTOR_RADIUS)
            .map(|b| b.collider);
        let walls = self
            .walls
            .iter()
            .filter(|w| mask.contains(w.collider.tag))
            .filter(|w| sphere_intersects_aabb(center, radius, w.min, w.max))
            .map(|w| w.collider);
        bodies.chain(walls).collect()
    }

    fn sample_navigable(&self, point: Vec3, tolerance: f32) -> Option<Vec3> {
        let snapped = self.clamp_to_floor(point);
        (flat_distance(point, snapped) <= tolerance).then_some(snapped)
    }

    fn position_of(&self, entity: EntityId) -> Option<Vec3> {
        self.bodies
            .iter()
            .find(|b| b.collider.entity == entity)
            .map(|b| b.center)
    }
}

impl Navigation for ArenaWorld {
    fn advance(
        &mut self,
        agent: EntityId,
        from: Vec3,
        destination: Vec3,
        speed: f32,
        dt: f32,
    ) -> NavStep {
        let destination = self.clamp_to_floor(destination);
        let to = destination - from;
        let step = speed * dt;
        let nav = if to.length() <= step.max(ARRIVAL_EPSILON) {
            NavStep {
                position: destination,
                arrived: true,
            }
        } else {
            NavStep {
                position: self.clamp_to_floor(from + to.normalize() * step),
                arrived: false,
            }
        };
        trace!(entity = %agent, position = ?nav.position, arrived = nav.arrived, "Nav step");
        nav
    }
}

impl Presentation for ArenaWorld {
    fn set_walking(&mut self, agent: EntityId, walking: bool) {
        self.cues.entry(agent).or_default().walking = walking;
    }

    fn trigger_attack(&mut self, agent: EntityId) {
        self.cues.entry(agent).or_default().attacks += 1;
    }

    fn set_dead(&mut self, agent: EntityId) {
        self.cues.entry(agent).or_default().dead = true;
    }
}

impl ProjectileSpawner for ArenaWorld {
    fn spawn_projectile(&mut self, projectile: Projectile) -> ProjectileHandle {
        self.next_projectile += 1;
        self.spawned.push(projectile);
        ProjectileHandle(self.next_projectile)
    }
}

impl HitReceiver for ArenaWorld {
    fn deliver_hit(&mut self, context: &HitContext, rng: &mut fastrand::Rng) -> Option<HitOutcome> {
        let target = self.combatants.get_mut(&context.target)?;
        target.take_hit(context, rng, &mut self.events)
    }

    fn stats_of(&self, entity: EntityId) -> Option<&StatTable> {
        self.combatants.get(&entity).map(Combatant::stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emberfall_combat::damage::DamageInstance;
    use emberfall_combat::stats::{StatKind, StatSheet};

    fn arena() -> ArenaWorld {
        ArenaWorld::new(&ArenaConfig {
            half_extent: 10.0,
            walls: vec![WallConfig {
                min: Vec3::new(-1.0, 0.0, 4.0),
                max: Vec3::new(1.0, 3.0, 5.0),
            }],
        })
    }

    fn dummy(tag: Tag) -> Combatant {
        let sheet = StatSheet::new()
            .with(StatKind::Health, 50.0)
            .with(StatKind::Armor, 0.0);
        Combatant::new(EntityId::new(), tag, "dummy", &sheet)
    }

    #[test]
    fn test_wall_blocks_ray_before_actor() {
        let mut world = arena();
        let enemy = world.add_actor(dummy(Tag::Enemy), Vec3::new(0.0, 0.0, 8.0));

        let blocked = world
            .raycast(Vec3::Y, Vec3::Z, 20.0, LayerMask::of(&[Tag::Enemy, Tag::World]))
            .expect("hit");
        assert_eq!(blocked.collider.tag, Tag::World);
        assert!((blocked.distance - 4.0).abs() < 1e-4);

        let through = world
            .raycast(Vec3::Y, Vec3::Z, 20.0, LayerMask::of(&[Tag::Enemy]))
            .expect("hit");
        assert_eq!(through.collider.entity, enemy);
    }

    #[test]
    fn test_navigation_clamps_to_floor() {
        let mut world = arena();
        let agent = EntityId::new();
        let far = Vec3::new(30.0, 0.0, 0.0);
        let step = world.advance(agent, Vec3::new(2.0, 0.0, 0.0), far, 5.0, 1.0);
        assert_eq!(step.position, Vec3::new(7.0, 0.0, 0.0));
        assert!(!step.arrived);

        let arrived = world.advance(agent, step.position, far, 5.0, 1.0);
        assert!(arrived.arrived);
        assert_eq!(arrived.position, Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_sample_navigable_tolerance() {
        let world = arena();
        assert_eq!(
            world.sample_navigable(Vec3::new(2.0, 1.5, 3.0), 0.5),
            Some(Vec3::new(2.0, 0.0, 3.0))
        );
        assert_eq!(
            world.sample_navigable(Vec3::new(11.0, 0.0, 0.0), 2.0),
            Some(Vec3::new(10.0, 0.0, 0.0))
        );
        assert!(world.sample_navigable(Vec3::new(15.0, 0.0, 0.0), 2.0).is_none());
    }

    #[test]
    fn test_removed_body_is_not_hit() {
        let mut world = arena();
        let enemy = world.add_actor(dummy(Tag::Enemy), Vec3::new(0.0, 0.0, -3.0));
        world.remove_body(enemy);
        assert!(world
            .raycast(Vec3::Y, Vec3::NEG_Z, 10.0, LayerMask::ALL)
            .is_none());
        assert!(world.combatant(enemy).is_some());
        assert!(world.position_of(enemy).is_none());
    }

    #[test]
    fn test_deliver_hit_publishes_events() {
        let mut world = arena();
        let feed = world.events_mut().subscribe();
        let enemy = world.add_actor(dummy(Tag::Enemy), Vec3::ZERO);
        let mut rng = fastrand::Rng::with_seed(3);

        let hit = HitContext::new(enemy, EntityId::new(), StatTable::new("attacker"))
            .with_damage(DamageInstance::physical(20.0));
        let outcome = world.deliver_hit(&hit, &mut rng).expect("delivered");
        assert_eq!(outcome.total, 20.0);
        assert_eq!(world.combatant(enemy).map(Combatant::health), Some(30.0));
        assert_eq!(feed.drain().len(), 1);
    }

    #[test]
    fn test_overlap_includes_walls() {
        let world = arena();
        let hits = world.overlap_sphere(Vec3::new(0.0, 1.0, 3.5), 1.0, LayerMask::ALL);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].tag, Tag::World);
    }

    #[test]
    fn test_presentation_cues() {
        let mut world = arena();
        let agent = EntityId::new();
        world.trigger_attack(agent);
        world.trigger_attack(agent);
        world.set_walking(agent, true);
        assert_eq!(
            world.cues(agent),
            CueCounts {
                attacks: 2,
                walking: true,
                dead: false,
            }
        );
    }
}
