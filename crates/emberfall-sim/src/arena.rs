//! The arena run loop.
//!
//! This module provides:
//! - [`Arena`], which owns the world, the player, the enemies and every projectile
//! - One fixed step in a fixed order, reading the player from the previous step
//! - Delayed spawns released as the clock reaches them
//! - [`RunSummary`] with the outcome and per-actor results
//!
//! Step order: due spawns, enemies, enemy projectiles handed over, player,
//! projectiles, delayed hits, stat timers, event bookkeeping.

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::Path;

use emberfall_combat::ai::EnemyAi;
use emberfall_combat::combatant::Combatant;
use emberfall_combat::content::ContentLibrary;
use emberfall_combat::events::{CombatEvent, Subscription};
use emberfall_combat::inspect::{AiReport, Inspect};
use emberfall_combat::projectile::{Projectile, StepOutcome};
use emberfall_combat::scheduler::HitScheduler;
use emberfall_common::{EntityId, Tag};
use glam::{Quat, Vec3};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, EnemySpawn, ScenarioConfig};
use crate::player::PlayerAgent;
use crate::timing::{FixedStep, SimClock};
use crate::world::ArenaWorld;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// Every enemy died.
    EnemiesCleared,
    /// The player died.
    PlayerDefeated,
    /// Time ran out with both sides standing.
    Unresolved,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    damage_dealt: f32,
    damage_taken: f32,
    crits: u32,
    kills: u32,
    player_casts: u32,
    enemy_casts: u32,
    projectile_hits: u32,
    follow_ups: u32,
}

// ============================================================================
// Arena
// ============================================================================

/// A running scenario.
pub struct Arena {
    seed: u64,
    world: ArenaWorld,
    library: ContentLibrary,
    player: PlayerAgent,
    enemies: Vec<EnemyAi>,
    pending: VecDeque<EnemySpawn>,
    projectiles: Vec<Projectile>,
    scheduler: HitScheduler,
    rng: fastrand::Rng,
    feed: Subscription,
    stepper: FixedStep,
    clock: SimClock,
    tally: Tally,
}

impl Arena {
    /// Loads the scenario's content and places every actor.
    pub fn from_config(config: &ScenarioConfig) -> Result<Self, ConfigError> {
        let library = config.load_content()?;
        Self::new(config, library)
    }

    /// Places every actor using `library`.
    pub fn new(config: &ScenarioConfig, library: ContentLibrary) -> Result<Self, ConfigError> {
        config.check_references(&library)?;

        let mut rng = fastrand::Rng::with_seed(config.seed);
        let mut world = ArenaWorld::new(&config.arena);

        let player_id = world.add_actor(
            Combatant::new(EntityId::new(), Tag::Player, "player", &config.player.stats),
            config.player.start,
        );
        let loadout = config
            .player
            .spell
            .as_deref()
            .and_then(|spell| library.loadout_for(spell));
        let player = PlayerAgent::new(player_id, &config.player, loadout);

        let mut pending: VecDeque<EnemySpawn> = config.spawn_plan().into();
        let mut enemies = Vec::with_capacity(pending.len());
        while let Some(spawn) = pending.pop_front() {
            if spawn.spawn_delay > 0.0 {
                pending.push_front(spawn);
                break;
            }
            enemies.push(place_enemy(&mut world, &library, &spawn, &mut rng)?);
        }

        let feed = world.events_mut().subscribe();
        info!(
            "Arena ready: {} enemies, {} pending, {} walls, seed {}",
            enemies.len(),
            pending.len(),
            config.arena.walls.len(),
            config.seed
        );

        Ok(Self {
            seed: config.seed,
            world,
            library,
            player,
            enemies,
            pending,
            projectiles: Vec::new(),
            scheduler: HitScheduler::new(),
            rng,
            feed,
            stepper: FixedStep::new(config.timestep),
            clock: SimClock::default(),
            tally: Tally::default(),
        })
    }

    /// The world.
    #[must_use]
    pub fn world(&self) -> &ArenaWorld {
        &self.world
    }

    /// The player.
    #[must_use]
    pub fn player(&self) -> &PlayerAgent {
        &self.player
    }

    /// Enemy controllers in spawn order.
    #[must_use]
    pub fn enemies(&self) -> &[EnemyAi] {
        &self.enemies
    }

    /// Spawns still waiting for their time.
    #[must_use]
    pub fn pending_spawns(&self) -> usize {
        self.pending.len()
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Simulated time.
    #[must_use]
    pub fn clock(&self) -> SimClock {
        self.clock
    }

    /// Fixed step length.
    #[must_use]
    pub fn timestep(&self) -> f32 {
        self.stepper.fixed_dt()
    }

    /// Advances everything by one step of `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        self.release_due_spawns();

        // Everyone reads the player as it stood at the end of the last step.
        let snapshot = self.player.snapshot(&self.world);

        for ai in &mut self.enemies {
            ai.step(dt, &mut self.world, snapshot.as_ref(), &mut self.rng);
            self.world.set_feet(ai.id(), ai.body().position);
        }

        let spawned = self.world.take_spawned();
        self.tally.enemy_casts += spawned.len() as u32;
        self.projectiles.extend(spawned);

        let targets: Vec<EntityId> = self
            .enemies
            .iter()
            .filter(|ai| !ai.is_dead())
            .map(EnemyAi::id)
            .collect();
        if let Some(projectile) =
            self.player
                .step(dt, &mut self.world, &targets, self.library.statuses())
        {
            self.tally.player_casts += 1;
            self.projectiles.push(projectile);
        }

        for projectile in &mut self.projectiles {
            if let StepOutcome::Impact {
                outcome: Some(_), ..
            } = projectile.step(dt, &mut self.world, &mut self.rng)
            {
                self.tally.projectile_hits += 1;
            }
            self.scheduler.extend(projectile.take_follow_ups());
        }
        self.projectiles.retain(|p| !p.is_destroyed());

        self.tally.follow_ups += self.scheduler.tick(dt, &mut self.world, &mut self.rng) as u32;
        self.world.tick_combatants(dt);
        self.drain_events();
        self.clock.advance(dt);
    }

    /// Feeds variable frame time; returns how many fixed steps ran.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        let count = self.stepper.accumulate(frame_dt);
        let dt = self.stepper.fixed_dt();
        for _ in 0..count {
            self.step(dt);
        }
        count
    }

    /// Runs fixed steps until one side is defeated or `duration` seconds pass.
    pub fn run(&mut self, duration: f32) -> RunSummary {
        let dt = self.stepper.fixed_dt();
        let steps = (f64::from(duration) / f64::from(dt)).round() as u64;
        info!("Running {} steps of {:.4}s", steps, dt);

        for _ in 0..steps {
            if self.outcome().is_some() {
                break;
            }
            self.step(dt);
        }

        let summary = self.summary();
        summary.log();
        summary
    }

    /// How the run ended, `None` while both sides stand.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        if self.player.snapshot(&self.world).is_none() {
            Some(Outcome::PlayerDefeated)
        } else if self.pending.is_empty()
            && !self.enemies.is_empty()
            && self.enemies.iter().all(EnemyAi::is_dead)
        {
            Some(Outcome::EnemiesCleared)
        } else {
            None
        }
    }

    /// Snapshot of the run so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let health = |id: EntityId| self.world.combatant(id).map_or(0.0, Combatant::health);
        let player_id = self.player.id();

        RunSummary {
            seed: self.seed,
            outcome: self.outcome().unwrap_or(Outcome::Unresolved),
            steps: self.clock.steps(),
            elapsed: self.clock.elapsed(),
            player: PlayerSummary {
                position: self.player.position(),
                health: health(player_id),
                alive: self.player.snapshot(&self.world).is_some(),
                damage_dealt: self.tally.damage_dealt,
                damage_taken: self.tally.damage_taken,
                crits: self.tally.crits,
                casts: self.tally.player_casts,
            },
            kills: self.tally.kills,
            enemy_casts: self.tally.enemy_casts,
            projectile_hits: self.tally.projectile_hits,
            follow_ups: self.tally.follow_ups,
            pending_spawns: self.pending.len(),
            enemies: self
                .enemies
                .iter()
                .map(|ai| EnemySummary {
                    ai: ai.report(),
                    health: health(ai.id()),
                    attacks: self.world.cues(ai.id()).attacks,
                })
                .collect(),
        }
    }

    fn release_due_spawns(&mut self) {
        let now = self.clock.elapsed();
        while self
            .pending
            .front()
            .is_some_and(|spawn| f64::from(spawn.spawn_delay) <= now)
        {
            let Some(spawn) = self.pending.pop_front() else {
                break;
            };
            match place_enemy(&mut self.world, &self.library, &spawn, &mut self.rng) {
                Ok(ai) => {
                    info!("{} {} spawned at {:.2}s", spawn.archetype, ai.id(), now);
                    self.enemies.push(ai);
                },
                Err(err) => warn!("Skipping spawn: {}", err),
            }
        }
    }

    fn drain_events(&mut self) {
        let player_id = self.player.id();
        for event in self.feed.drain() {
            match event {
                CombatEvent::DamageTaken {
                    target,
                    attacker,
                    amount,
                    critical,
                } => {
                    if target == player_id {
                        self.tally.damage_taken += amount;
                    } else if attacker == player_id {
                        self.tally.damage_dealt += amount;
                        if critical {
                            self.tally.crits += 1;
                        }
                    }
                },
                CombatEvent::Died { entity } => {
                    self.world.remove_body(entity);
                    self.scheduler.cancel_from(entity);
                    if entity == player_id {
                        info!("Player died at {:.2}s", self.clock.elapsed());
                    } else if let Some(ai) = self.enemies.iter_mut().find(|ai| ai.id() == entity) {
                        ai.detach(self.world.events_mut());
                        ai.kill(&mut self.world);
                        self.tally.kills += 1;
                        info!(
                            "{} {} died at {:.2}s",
                            ai.config().name,
                            entity,
                            self.clock.elapsed()
                        );
                    }
                },
            }
        }
    }
}

/// Adds one enemy's body and controller to the world.
fn place_enemy(
    world: &mut ArenaWorld,
    library: &ContentLibrary,
    spawn: &EnemySpawn,
    rng: &mut fastrand::Rng,
) -> Result<EnemyAi, ConfigError> {
    let mut enemy = library
        .enemy(&spawn.archetype)
        .cloned()
        .ok_or_else(|| ConfigError::UnknownArchetype(spawn.archetype.clone()))?;
    if !spawn.patrol.is_empty() {
        enemy.patrol.points.clone_from(&spawn.patrol);
    }

    let id = world.add_actor(
        Combatant::new(EntityId::new(), Tag::Enemy, &enemy.name, &enemy.stats),
        spawn.position,
    );
    let mut ai = library
        .build_enemy(enemy, id, spawn.position, rng)
        .with_rotation(Quat::from_rotation_y(spawn.yaw_degrees.to_radians()));
    ai.attach(world.events_mut());
    Ok(ai)
}

// ============================================================================
// Summary
// ============================================================================

/// The player's side of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSummary {
    /// Final feet position.
    pub position: Vec3,
    /// Final health.
    pub health: f32,
    /// Whether the player survived.
    pub alive: bool,
    /// Damage the player dealt.
    pub damage_dealt: f32,
    /// Damage the player took.
    pub damage_taken: f32,
    /// Critical hits the player landed.
    pub crits: u32,
    /// Spells the player cast.
    pub casts: u32,
}

/// One enemy's final state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnemySummary {
    /// Controller state.
    #[serde(flatten)]
    pub ai: AiReport,
    /// Final health.
    pub health: f32,
    /// Attack cues played.
    pub attacks: u32,
}

/// Result of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Seed the run used.
    pub seed: u64,
    /// How the run ended.
    pub outcome: Outcome,
    /// Steps simulated.
    pub steps: u64,
    /// Seconds simulated.
    pub elapsed: f64,
    /// Player results.
    pub player: PlayerSummary,
    /// Enemies killed.
    pub kills: u32,
    /// Projectiles enemies cast.
    pub enemy_casts: u32,
    /// Projectile impacts that dealt damage.
    pub projectile_hits: u32,
    /// Delayed follow-up hits delivered.
    pub follow_ups: u32,
    /// Spawns that never appeared.
    pub pending_spawns: usize,
    /// Enemy results in spawn order.
    pub enemies: Vec<EnemySummary>,
}

impl RunSummary {
    /// Logs the outcome and one line per enemy.
    pub fn log(&self) {
        info!(
            "Run finished after {} steps ({:.2}s): {:?}",
            self.steps, self.elapsed, self.outcome
        );
        info!(
            "Player: health {:.1}, dealt {:.1}, took {:.1}, {} casts, {} crits, {} kills",
            self.player.health,
            self.player.damage_dealt,
            self.player.damage_taken,
            self.player.casts,
            self.player.crits,
            self.kills
        );
        for enemy in &self.enemies {
            info!(
                "  {} {}: {:?}, health {:.1}, {} attacks",
                enemy.ai.name, enemy.ai.entity, enemy.ai.state, enemy.health, enemy.attacks
            );
        }
        debug!("Enemy casts {}, projectile hits {}", self.enemy_casts, self.projectile_hits);
    }

    /// Writes the summary as pretty JSON, creating parent directories.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(io::Error::from)?;
        fs::write(path, json)?;
        info!("Summary written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EnemySpawn, PlayerConfig};
    use emberfall_combat::ai::AiState;

    fn duel(enemy: EnemySpawn, player: PlayerConfig) -> Arena {
        let config = ScenarioConfig {
            enemies: vec![enemy],
            player,
            ..Default::default()
        };
        Arena::from_config(&config).expect("valid scenario")
    }

    fn unarmed() -> PlayerConfig {
        PlayerConfig {
            spell: None,
            waypoints: Vec::new(),
            ..Default::default()
        }
    }

    #[test]
    fn test_grunt_strikes_stationary_player() {
        let mut arena = duel(
            EnemySpawn {
                archetype: "Grunt".to_string(),
                yaw_degrees: 180.0,
                position: Vec3::new(0.0, 0.0, 1.5),
                ..Default::default()
            },
            unarmed(),
        );
        let summary = arena.run(3.0);

        assert_eq!(summary.enemies[0].ai.state, AiState::Aggro);
        assert!(summary.enemies[0].attacks >= 1);
        assert!(summary.player.damage_taken > 0.0);
        assert_eq!(summary.player.casts, 0);
    }

    #[test]
    fn test_unarmed_player_is_ignored_when_far() {
        let mut arena = duel(
            EnemySpawn {
                archetype: "Grunt".to_string(),
                yaw_degrees: 0.0,
                position: Vec3::new(0.0, 0.0, 20.0),
                ..Default::default()
            },
            unarmed(),
        );
        let summary = arena.run(1.0);
        assert_eq!(summary.outcome, Outcome::Unresolved);
        assert_eq!(summary.enemies[0].ai.state, AiState::Patrol);
        assert_eq!(summary.player.damage_taken, 0.0);
        assert_eq!(summary.steps, 30);
    }

    #[test]
    fn test_advance_runs_fixed_steps() {
        let mut arena = Arena::from_config(&ScenarioConfig {
            timestep: 0.25,
            ..Default::default()
        })
        .expect("valid scenario");
        assert_eq!(arena.advance(0.625), 2);
        assert_eq!(arena.clock().steps(), 2);
        assert_eq!(arena.advance(0.125), 1);
        assert_eq!(arena.clock().elapsed(), 0.75);
    }

    #[test]
    fn test_dead_enemy_body_is_removed() {
        let mut arena = duel(
            EnemySpawn {
                archetype: "Archer".to_string(),
                yaw_degrees: 180.0,
                position: Vec3::new(0.0, 0.0, 6.0),
                ..Default::default()
            },
            PlayerConfig {
                waypoints: Vec::new(),
                ..Default::default()
            },
        );
        let summary = arena.run(10.0);
        let archer = arena.enemies()[0].id();

        assert_eq!(summary.outcome, Outcome::EnemiesCleared);
        assert_eq!(summary.kills, 1);
        assert!(summary.enemies[0].ai.dead);
        assert!(!arena.world().has_body(archer));
        assert!(arena.world().cues(archer).dead);
    }

    #[test]
    fn test_dead_enemy_unsubscribes() {
        let mut arena = duel(
            EnemySpawn {
                archetype: "Archer".to_string(),
                yaw_degrees: 180.0,
                position: Vec3::new(0.0, 0.0, 6.0),
                ..Default::default()
            },
            PlayerConfig {
                waypoints: Vec::new(),
                ..Default::default()
            },
        );
        // The archer and the arena's own feed.
        assert_eq!(arena.world().events().subscriber_count(), 2);

        let summary = arena.run(10.0);
        assert_eq!(summary.kills, 1);
        assert_eq!(arena.world().events().subscriber_count(), 1);
    }

    #[test]
    fn test_delayed_spawn_appears_on_time() {
        let mut arena = duel(
            EnemySpawn {
                archetype: "Grunt".to_string(),
                position: Vec3::new(0.0, 0.0, 20.0),
                spawn_delay: 1.0,
                ..Default::default()
            },
            unarmed(),
        );
        assert!(arena.enemies().is_empty());
        assert_eq!(arena.pending_spawns(), 1);

        let summary = arena.run(0.5);
        assert_eq!(summary.outcome, Outcome::Unresolved);
        assert!(summary.enemies.is_empty());
        assert_eq!(summary.pending_spawns, 1);

        arena.run(1.0);
        assert_eq!(arena.pending_spawns(), 0);
        assert_eq!(arena.enemies().len(), 1);
        assert!(arena.world().has_body(arena.enemies()[0].id()));
    }

    #[test]
    fn test_pending_spawns_hold_off_victory() {
        let config = ScenarioConfig {
            enemies: vec![
                EnemySpawn {
                    archetype: "Archer".to_string(),
                    yaw_degrees: 180.0,
                    position: Vec3::new(0.0, 0.0, 6.0),
                    ..Default::default()
                },
                EnemySpawn {
                    archetype: "Grunt".to_string(),
                    position: Vec3::new(0.0, 0.0, 20.0),
                    spawn_delay: 30.0,
                    ..Default::default()
                },
            ],
            player: PlayerConfig {
                waypoints: Vec::new(),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut arena = Arena::from_config(&config).expect("valid scenario");
        let summary = arena.run(10.0);

        assert_eq!(summary.kills, 1);
        assert_eq!(summary.outcome, Outcome::Unresolved);
        assert_eq!(summary.pending_spawns, 1);
    }

    #[test]
    fn test_summary_json_shape() {
        let arena = Arena::from_config(&ScenarioConfig::default()).expect("valid scenario");
        let json = serde_json::to_value(arena.summary()).expect("serializable");
        assert_eq!(json["outcome"], "Unresolved");
        assert_eq!(json["enemies"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["enemies"][0]["name"], "Grunt");
        assert_eq!(json["enemies"][2]["attack"], "Leap");
    }
}
