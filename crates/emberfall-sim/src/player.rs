//! A scripted player that walks a loop of waypoints and fires at the nearest
//! visible enemy.

use emberfall_combat::effects::StatusRegistry;
use emberfall_combat::projectile::Projectile;
use emberfall_combat::spell::{CastRequest, Loadout};
use emberfall_combat::world::{HitReceiver, Navigation, PlayerSnapshot, WorldQuery};
use emberfall_common::geometry::flat_distance;
use emberfall_common::{EntityId, LayerMask, Tag};
use glam::Vec3;
use tracing::{debug, trace};

use crate::config::PlayerConfig;
use crate::world::{ArenaWorld, ACTOR_RADIUS, BODY_HEIGHT};

/// Gap between the body surface and a freshly cast projectile.
const MUZZLE_CLEARANCE: f32 = 0.05;

/// The player actor.
#[derive(Debug)]
pub struct PlayerAgent {
    id: EntityId,
    position: Vec3,
    waypoints: Vec<Vec3>,
    waypoint: usize,
    speed: f32,
    vision_range: f32,
    fire_cooldown: f32,
    cooldown_timer: f32,
    loadout: Option<Loadout>,
}

impl PlayerAgent {
    /// Creates the player at its configured start, ready to fire.
    #[must_use]
    pub fn new(id: EntityId, config: &PlayerConfig, loadout: Option<Loadout>) -> Self {
        Self {
            id,
            position: config.start,
            waypoints: config.waypoints.clone(),
            waypoint: 0,
            speed: config.speed,
            vision_range: config.vision_range,
            fire_cooldown: config.fire_cooldown,
            cooldown_timer: config.fire_cooldown,
            loadout,
        }
    }

    /// Player entity.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Feet position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// View handed to enemies; `None` once the player is dead.
    #[must_use]
    pub fn snapshot(&self, world: &ArenaWorld) -> Option<PlayerSnapshot> {
        world
            .combatant(self.id)
            .filter(|c| !c.is_dead())
            .map(|_| PlayerSnapshot {
                entity: self.id,
                position: self.position,
            })
    }

    /// Walks toward the current waypoint, then casts if a target is in sight.
    ///
    /// `targets` are candidate enemy entities. Returns the cast projectile.
    pub fn step(
        &mut self,
        dt: f32,
        world: &mut ArenaWorld,
        targets: &[EntityId],
        statuses: &StatusRegistry,
    ) -> Option<Projectile> {
        if world.combatant(self.id).map_or(true, |c| c.is_dead()) {
            return None;
        }

        self.walk(dt, world);
        self.cooldown_timer += dt;
        if self.cooldown_timer < self.fire_cooldown {
            return None;
        }

        let loadout = self.loadout.as_ref()?;
        let eye = self.position + Vec3::Y * BODY_HEIGHT;
        let (target, aim) = self.pick_target(world, eye, targets)?;
        let direction = (aim - eye).normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }

        let request = CastRequest {
            owner: self.id,
            owner_stats: world.stats_of(self.id)?.clone(),
            origin: eye + direction * (ACTOR_RADIUS + MUZZLE_CLEARANCE),
            direction,
            damageable: LayerMask::of(&[Tag::Enemy]),
        };
        let projectile = loadout.cast(request, statuses)?;
        self.cooldown_timer = 0.0;
        debug!(target = %target, "Player cast");
        Some(projectile)
    }

    fn walk(&mut self, dt: f32, world: &mut ArenaWorld) {
        let Some(&destination) = self.waypoints.get(self.waypoint) else {
            return;
        };
        let nav = world.advance(self.id, self.position, destination, self.speed, dt);
        self.position = nav.position;
        world.set_feet(self.id, self.position);
        if nav.arrived {
            self.waypoint = (self.waypoint + 1) % self.waypoints.len();
            trace!(waypoint = self.waypoint, "Player reached waypoint");
        }
    }

    /// Nearest target within vision range whose body the ray reaches first.
    fn pick_target(&self, world: &ArenaWorld, eye: Vec3, targets: &[EntityId]) -> Option<(EntityId, Vec3)> {
        let mask = LayerMask::of(&[Tag::Enemy, Tag::World]);
        targets
            .iter()
            .filter_map(|&entity| world.position_of(entity).map(|center| (entity, center)))
            .filter(|(_, center)| flat_distance(self.position, *center) <= self.vision_range)
            .filter(|(entity, center)| {
                let to = *center - eye;
                let distance = to.length();
                distance > f32::EPSILON
                    && world
                        .raycast(eye, to / distance, distance + ACTOR_RADIUS, mask)
                        .is_some_and(|hit| hit.collider.entity == *entity)
            })
            .min_by(|a, b| {
                flat_distance(self.position, a.1).total_cmp(&flat_distance(self.position, b.1))
            })
    }
}
