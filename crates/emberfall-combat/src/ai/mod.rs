//! Enemy AI controller.
//!
//! This module provides:
//! - A three-state machine (Patrol, Aggro, Search) with a death flag on top
//! - Perception-driven transitions with a leash timer after losing sight
//! - Aggro on damage through a combat event subscription
//! - Pluggable attack behaviors (see [`attack`])
//!
//! The controller owns its body transform. Hosts call [`EnemyAi::step`] once per
//! frame with the player snapshot committed at the end of the previous frame and
//! copy [`EnemyAi::body`] back to their own collider afterwards.

pub mod attack;

use emberfall_common::geometry::{forward, look_rotation_flat};
use emberfall_common::EntityId;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::EnemyConfig;
use crate::effects::StatusRegistry;
use crate::events::{CombatEvent, EventHub, Subscription};
use crate::perception;
use crate::spell::Loadout;
use crate::world::{CombatWorld, Navigation, PlayerSnapshot};

pub use attack::{AttackBehavior, AttackInput, LeapAttack, LeapFlight, MeleeAttack, RangedAttack};

/// Position and orientation of an actor. Y is up, forward is `rotation * Z`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActorBody {
    /// Feet position.
    pub position: Vec3,
    /// Orientation.
    pub rotation: Quat,
}

impl ActorBody {
    /// Creates a body facing +Z.
    #[must_use]
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Facing direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        forward(self.rotation)
    }
}

/// Top-level behavior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiState {
    /// Walking the route.
    Patrol,
    /// Fighting or chasing the player.
    Aggro,
    /// Looking around the last known player position.
    Search,
}

/// Sub-state of [`AiState::Patrol`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PatrolPhase {
    /// Heading to the current point.
    Moving,
    /// Standing at the point.
    Waiting {
        /// Seconds waited.
        elapsed: f32,
    },
    /// Turning in place.
    Scanning {
        /// Seconds scanned.
        elapsed: f32,
    },
}

/// Sub-state of [`AiState::Search`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SearchPhase {
    /// Heading to the last known position.
    Travel,
    /// Turning in place there.
    Scanning {
        /// Seconds scanned.
        elapsed: f32,
    },
}

/// Picks the next patrol point, never the previous one when there is a choice.
#[must_use]
pub fn next_patrol_index(previous: Option<usize>, count: usize, rng: &mut fastrand::Rng) -> Option<usize> {
    match (count, previous) {
        (0, _) => None,
        (1, _) => Some(0),
        (_, None) => Some(rng.usize(0..count)),
        (_, Some(prev)) => {
            let pick = rng.usize(0..count - 1);
            Some(if pick >= prev { pick + 1 } else { pick })
        },
    }
}

/// Turns `body` toward `target` on the ground plane, at most `rate * dt` of the way.
pub(crate) fn face_towards(body: &mut ActorBody, target: Vec3, rate: f32, dt: f32) {
    if let Some(goal) = look_rotation_flat(target - body.position) {
        body.rotation = body.rotation.slerp(goal, (rate * dt).min(1.0)).normalize();
    }
}

/// Moves `body` through the host's navigation and turns it toward the motion.
/// Returns whether the destination was reached.
pub(crate) fn move_towards<W: Navigation + ?Sized>(
    world: &mut W,
    agent: EntityId,
    body: &mut ActorBody,
    destination: Vec3,
    speed: f32,
    facing_rate: f32,
    dt: f32,
) -> bool {
    let step = world.advance(agent, body.position, destination, speed, dt);
    let motion = step.position - body.position;
    body.position = step.position;
    if let Some(goal) = look_rotation_flat(motion) {
        body.rotation = body.rotation.slerp(goal, (facing_rate * dt).min(1.0)).normalize();
    }
    step.arrived
}

fn scan(body: &mut ActorBody, degrees_per_second: f32, dt: f32) {
    let turn = Quat::from_rotation_y((degrees_per_second * dt).to_radians());
    body.rotation = (turn * body.rotation).normalize();
}

// ============================================================================
// Controller
// ============================================================================

/// One enemy's brain.
#[derive(Debug)]
pub struct EnemyAi {
    id: EntityId,
    config: EnemyConfig,
    body: ActorBody,
    state: AiState,
    patrol_index: Option<usize>,
    patrol_phase: PatrolPhase,
    search_phase: SearchPhase,
    last_known: Option<Vec3>,
    lose_sight_timer: f32,
    can_perceive: bool,
    dead: bool,
    attack: AttackBehavior,
    subscription: Option<Subscription>,
}

impl EnemyAi {
    /// Creates a controller in Patrol with a random first point.
    pub fn new(id: EntityId, mut config: EnemyConfig, position: Vec3, rng: &mut fastrand::Rng) -> Self {
        config.validate();
        let patrol_index = next_patrol_index(None, config.patrol.points.len(), rng);
        let attack = AttackBehavior::from_config(&config.attack);
        debug!(entity = %id, name = %config.name, attack = attack.kind_name(), "Enemy created");
        Self {
            id,
            config,
            body: ActorBody::new(position),
            state: AiState::Patrol,
            patrol_index,
            patrol_phase: PatrolPhase::Moving,
            search_phase: SearchPhase::Travel,
            last_known: None,
            lose_sight_timer: 0.0,
            can_perceive: false,
            dead: false,
            attack,
            subscription: None,
        }
    }

    /// Equips a ranged attacker; ignored for other behaviors.
    #[must_use]
    pub fn with_loadout(mut self, loadout: Loadout, statuses: StatusRegistry) -> Self {
        if let AttackBehavior::Ranged(ranged) = &mut self.attack {
            ranged.equip(loadout, statuses);
        }
        self
    }

    /// Sets the initial facing (builder pattern).
    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.body.rotation = rotation;
        self
    }

    /// Subscribes to combat events so damage and death reach the controller.
    pub fn attach(&mut self, hub: &mut EventHub) {
        self.detach(hub);
        self.subscription = Some(hub.subscribe());
    }

    /// Drops the event subscription.
    pub fn detach(&mut self, hub: &mut EventHub) {
        if let Some(subscription) = self.subscription.take() {
            hub.unsubscribe(subscription.id());
        }
    }

    /// Entity id.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Tunables.
    #[must_use]
    pub fn config(&self) -> &EnemyConfig {
        &self.config
    }

    /// Current transform.
    #[must_use]
    pub fn body(&self) -> &ActorBody {
        &self.body
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> AiState {
        self.state
    }

    /// Patrol sub-state.
    #[must_use]
    pub const fn patrol_phase(&self) -> PatrolPhase {
        self.patrol_phase
    }

    /// Search sub-state.
    #[must_use]
    pub const fn search_phase(&self) -> SearchPhase {
        self.search_phase
    }

    /// Index of the current patrol point.
    #[must_use]
    pub const fn patrol_index(&self) -> Option<usize> {
        self.patrol_index
    }

    /// Remembered player position.
    #[must_use]
    pub const fn last_known_position(&self) -> Option<Vec3> {
        self.last_known
    }

    /// Seconds since the player was last perceived while aggroed.
    #[must_use]
    pub const fn lose_sight_timer(&self) -> f32 {
        self.lose_sight_timer
    }

    /// Perception result of the latest step.
    #[must_use]
    pub const fn can_perceive(&self) -> bool {
        self.can_perceive
    }

    /// Whether the actor is dead.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.dead
    }

    /// Attack behavior.
    #[must_use]
    pub fn attack(&self) -> &AttackBehavior {
        &self.attack
    }

    /// Marks the actor dead and drops every in-flight action.
    ///
    /// The event subscription is released too; the hub prunes it on its next
    /// publish. Hosts holding the hub can call [`EnemyAi::detach`] first to
    /// unsubscribe immediately.
    pub fn kill<W: CombatWorld>(&mut self, world: &mut W) {
        if self.dead {
            return;
        }
        self.dead = true;
        self.subscription = None;
        self.attack.cancel();
        world.set_walking(self.id, false);
        world.set_dead(self.id);
        debug!(entity = %self.id, "Enemy died");
    }

    /// Switches to Aggro after being hit, even without perceiving the attacker.
    pub fn on_damaged<W: CombatWorld>(&mut self, world: &W) {
        if self.dead || self.state == AiState::Aggro {
            return;
        }
        debug!(entity = %self.id, from = ?self.state, "Damage forced aggro");
        self.state = AiState::Aggro;
        self.lose_sight_timer = 0.0;
        self.patrol_phase = PatrolPhase::Moving;
        if !self.can_perceive {
            let here = self.body.position;
            self.last_known = Some(
                world
                    .sample_navigable(here, self.config.aggro.snap_tolerance)
                    .unwrap_or(here),
            );
        }
    }

    /// Advances the controller by `dt` seconds.
    pub fn step<W: CombatWorld>(
        &mut self,
        dt: f32,
        world: &mut W,
        player: Option<&PlayerSnapshot>,
        rng: &mut fastrand::Rng,
    ) {
        self.process_events(world);
        if self.dead {
            return;
        }

        self.attack
            .advance_timers(dt, self.id, &mut self.body, world, rng);
        if self.attack.is_leaping() {
            return;
        }

        self.can_perceive = perception::can_perceive(
            &*world,
            self.body.position,
            self.body.forward(),
            player,
            &self.config.perception,
        );
        trace!(entity = %self.id, state = ?self.state, perceives = self.can_perceive, "AI step");

        match (self.state, player.filter(|_| self.can_perceive)) {
            (AiState::Patrol, Some(player)) => {
                debug!(entity = %self.id, "Patrol -> Aggro");
                self.patrol_phase = PatrolPhase::Moving;
                self.enter_aggro(world, player);
            },
            (AiState::Patrol, None) => self.patrol(dt, world, rng),
            (AiState::Aggro, Some(player)) => {
                self.remember(world, player);
                self.lose_sight_timer = 0.0;
                let input = AttackInput {
                    id: self.id,
                    body: &mut self.body,
                    aggro: &self.config.aggro,
                    player,
                    dt,
                };
                self.attack.aggro(input, world, rng);
            },
            (AiState::Aggro, None) => self.pursue(dt, world),
            (AiState::Search, Some(player)) => {
                debug!(entity = %self.id, "Search -> Aggro");
                self.enter_aggro(world, player);
            },
            (AiState::Search, None) => self.search(dt, world, rng),
        }
    }

    fn process_events<W: CombatWorld>(&mut self, world: &mut W) {
        let events = match &self.subscription {
            Some(subscription) => subscription.drain(),
            None => return,
        };
        for event in events {
            match event {
                CombatEvent::DamageTaken { target, .. } if target == self.id => self.on_damaged(&*world),
                CombatEvent::Died { entity } if entity == self.id => self.kill(world),
                _ => {},
            }
        }
    }

    fn remember<W: CombatWorld>(&mut self, world: &W, player: &PlayerSnapshot) {
        self.last_known = Some(
            world
                .sample_navigable(player.position, self.config.aggro.snap_tolerance)
                .unwrap_or(player.position),
        );
    }

    fn enter_aggro<W: CombatWorld>(&mut self, world: &W, player: &PlayerSnapshot) {
        self.state = AiState::Aggro;
        self.lose_sight_timer = 0.0;
        self.remember(world, player);
    }

    fn enter_patrol(&mut self, rng: &mut fastrand::Rng) {
        self.state = AiState::Patrol;
        self.patrol_phase = PatrolPhase::Moving;
        self.patrol_index = next_patrol_index(self.patrol_index, self.config.patrol.points.len(), rng);
    }

    fn patrol<W: CombatWorld>(&mut self, dt: f32, world: &mut W, rng: &mut fastrand::Rng) {
        let Some(target) = self
            .patrol_index
            .and_then(|i| self.config.patrol.points.get(i).copied())
        else {
            return;
        };
        let patrol = &self.config.patrol;

        match self.patrol_phase {
            PatrolPhase::Moving => {
                world.set_walking(self.id, true);
                let arrived = move_towards(
                    world,
                    self.id,
                    &mut self.body,
                    target,
                    patrol.speed,
                    self.config.aggro.facing_rate,
                    dt,
                );
                if arrived {
                    world.set_walking(self.id, false);
                    self.patrol_phase = PatrolPhase::Waiting { elapsed: 0.0 };
                }
            },
            PatrolPhase::Waiting { elapsed } => {
                let elapsed = elapsed + dt;
                self.patrol_phase = if elapsed >= patrol.wait_time {
                    PatrolPhase::Scanning { elapsed: 0.0 }
                } else {
                    PatrolPhase::Waiting { elapsed }
                };
            },
            PatrolPhase::Scanning { elapsed } => {
                scan(&mut self.body, patrol.scan_rotation_speed, dt);
                let elapsed = elapsed + dt;
                if elapsed >= patrol.scan_duration {
                    self.enter_patrol(rng);
                } else {
                    self.patrol_phase = PatrolPhase::Scanning { elapsed };
                }
            },
        }
    }

    /// Continues toward the last known position until the leash runs out.
    fn pursue<W: CombatWorld>(&mut self, dt: f32, world: &mut W) {
        if self.lose_sight_timer >= self.config.aggro.post_sight_track_duration {
            debug!(entity = %self.id, "Aggro -> Search");
            self.lose_sight_timer = 0.0;
            self.state = AiState::Search;
            self.search_phase = SearchPhase::Travel;
            return;
        }
        self.lose_sight_timer += dt;

        let Some(target) = self.last_known else {
            return;
        };
        world.set_walking(self.id, true);
        let speed = self.attack.chase_speed(&self.config.aggro);
        if move_towards(
            world,
            self.id,
            &mut self.body,
            target,
            speed,
            self.config.aggro.facing_rate,
            dt,
        ) {
            world.set_walking(self.id, false);
        }
    }

    fn search<W: CombatWorld>(&mut self, dt: f32, world: &mut W, rng: &mut fastrand::Rng) {
        let Some(target) = self.last_known else {
            debug!(entity = %self.id, "Search -> Patrol (nothing remembered)");
            self.enter_patrol(rng);
            return;
        };

        match self.search_phase {
            SearchPhase::Travel => {
                world.set_walking(self.id, true);
                let arrived = move_towards(
                    world,
                    self.id,
                    &mut self.body,
                    target,
                    self.config.aggro.search_speed,
                    self.config.aggro.facing_rate,
                    dt,
                );
                if arrived {
                    world.set_walking(self.id, false);
                    self.search_phase = SearchPhase::Scanning { elapsed: 0.0 };
                }
            },
            SearchPhase::Scanning { elapsed } => {
                scan(&mut self.body, self.config.patrol.scan_rotation_speed, dt);
                let elapsed = elapsed + dt;
                if elapsed >= self.config.patrol.scan_duration {
                    debug!(entity = %self.id, "Search -> Patrol");
                    self.last_known = None;
                    self.enter_patrol(rng);
                } else {
                    self.search_phase = SearchPhase::Scanning { elapsed };
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::Combatant;
    use crate::config::{AttackConfig, LeapConfig, MeleeConfig, RangedConfig};
    use crate::damage::{DamageInstance, HitContext};
    use crate::effects::EffectDef;
    use crate::spell::SpellDefinition;
    use crate::stats::{StatKind, StatSheet, StatTable};
    use crate::world::mock::MockWorld;
    use crate::world::HitReceiver;
    use emberfall_common::Tag;
    use proptest::prelude::*;

    const DT: f32 = 0.25;

    struct Arena {
        world: MockWorld,
        ai: EnemyAi,
        player: PlayerSnapshot,
        rng: fastrand::Rng,
    }

    impl Arena {
        fn new(config: EnemyConfig, player_at: Vec3) -> Self {
            Self::build(config, player_at, None)
        }

        fn build(config: EnemyConfig, player_at: Vec3, loadout: Option<Loadout>) -> Self {
            let mut world = MockWorld::new();
            let mut rng = fastrand::Rng::with_seed(7);
            let enemy = EntityId::new();
            world.add_combatant(
                Combatant::new(enemy, Tag::Enemy, "enemy", &config.stats),
                Vec3::ZERO,
                0.5,
            );
            let player = EntityId::new();
            let sheet = StatSheet::new()
                .with(StatKind::Health, 100.0)
                .with(StatKind::Armor, 0.0);
            world.add_combatant(
                Combatant::new(player, Tag::Player, "player", &sheet),
                player_at + Vec3::Y,
                0.5,
            );
            let mut ai = EnemyAi::new(enemy, config, Vec3::ZERO, &mut rng);
            if let Some(loadout) = loadout {
                ai = ai.with_loadout(loadout, StatusRegistry::default());
            }
            ai.attach(&mut world.events);
            Self {
                world,
                ai,
                player: PlayerSnapshot {
                    entity: player,
                    position: player_at,
                },
                rng,
            }
        }

        fn step(&mut self, visible: bool) {
            let player = visible.then_some(&self.player);
            self.ai.step(DT, &mut self.world, player, &mut self.rng);
            self.world.move_body(self.ai.id(), self.ai.body().position);
        }

        fn player_health(&self) -> f32 {
            self.world.health_of(self.player.entity)
        }

        fn hit_enemy(&mut self, amount: f32) {
            let context = HitContext::new(self.ai.id(), self.player.entity, StatTable::new("player"))
                .with_damage(DamageInstance::physical(amount));
            self.world.deliver_hit(&context, &mut self.rng);
        }
    }

    fn melee_config(cooldown: f32) -> EnemyConfig {
        EnemyConfig {
            attack: AttackConfig::Melee(MeleeConfig {
                cooldown,
                ..MeleeConfig::default()
            }),
            ..EnemyConfig::default()
        }
    }

    #[test]
    fn test_sees_player_ahead_and_aggroes() {
        let mut arena = Arena::new(EnemyConfig::default(), Vec3::new(0.0, 0.0, 5.0));
        arena.step(true);
        assert!(arena.ai.can_perceive());
        assert_eq!(arena.ai.state(), AiState::Aggro);
        assert_eq!(arena.ai.last_known_position(), Some(Vec3::new(0.0, 0.0, 5.0)));
    }

    #[test]
    fn test_distant_player_never_perceived() {
        let mut arena = Arena::new(EnemyConfig::default(), Vec3::new(0.0, 0.0, 20.0));
        for _ in 0..10 {
            arena.step(true);
        }
        assert!(!arena.ai.can_perceive());
        assert_eq!(arena.ai.state(), AiState::Patrol);
    }

    #[test]
    fn test_zero_patrol_points_still_aggro() {
        let mut arena = Arena::new(EnemyConfig::default(), Vec3::new(0.0, 0.0, 5.0));
        assert!(arena.ai.patrol_index().is_none());
        arena.step(false);
        assert_eq!(arena.ai.body().position, Vec3::ZERO);
        arena.step(true);
        assert_eq!(arena.ai.state(), AiState::Aggro);
    }

    #[test]
    fn test_leash_holds_for_track_duration() {
        let mut arena = Arena::new(EnemyConfig::default(), Vec3::new(0.0, 0.0, 5.0));
        arena.step(true);
        assert_eq!(arena.ai.state(), AiState::Aggro);

        // 1.5 s of blindness at 0.25 s per step.
        for _ in 0..6 {
            arena.step(false);
            assert_eq!(arena.ai.state(), AiState::Aggro);
        }
        arena.step(false);
        assert_eq!(arena.ai.state(), AiState::Search);
        assert_eq!(arena.ai.lose_sight_timer(), 0.0);
    }

    #[test]
    fn test_search_scans_then_returns_to_patrol() {
        let mut arena = Arena::new(EnemyConfig::default(), Vec3::new(0.0, 0.0, 5.0));
        arena.step(true);
        let mut saw_scan = false;
        for _ in 0..100 {
            arena.step(false);
            if matches!(arena.ai.search_phase(), SearchPhase::Scanning { .. })
                && arena.ai.state() == AiState::Search
            {
                saw_scan = true;
            }
            if arena.ai.state() == AiState::Patrol {
                break;
            }
        }
        assert!(saw_scan);
        assert_eq!(arena.ai.state(), AiState::Patrol);
        assert!(arena.ai.last_known_position().is_none());
    }

    #[test]
    fn test_search_without_memory_falls_back_to_patrol() {
        let mut arena = Arena::new(EnemyConfig::default(), Vec3::new(0.0, 0.0, 20.0));
        arena.ai.state = AiState::Search;
        arena.ai.last_known = None;
        arena.step(false);
        assert_eq!(arena.ai.state(), AiState::Patrol);
    }

    #[test]
    fn test_search_reacquires_player() {
        let mut arena = Arena::new(EnemyConfig::default(), Vec3::new(0.0, 0.0, 5.0));
        arena.ai.state = AiState::Search;
        arena.ai.last_known = Some(Vec3::new(3.0, 0.0, 0.0));
        arena.step(true);
        assert_eq!(arena.ai.state(), AiState::Aggro);
        assert_eq!(arena.ai.last_known_position(), Some(Vec3::new(0.0, 0.0, 5.0)));
    }

    #[test]
    fn test_patrol_walks_waits_scans_and_moves_on() {
        let mut config = EnemyConfig::default();
        config.patrol.points = vec![Vec3::new(2.0, 0.0, 0.0), Vec3::new(-2.0, 0.0, 0.0)];
        let mut arena = Arena::new(config, Vec3::new(0.0, 0.0, 40.0));
        let first = arena.ai.patrol_index().expect("points configured");

        let mut phases = Vec::new();
        for _ in 0..60 {
            arena.step(false);
            let phase = std::mem::discriminant(&arena.ai.patrol_phase());
            if phases.last() != Some(&phase) {
                phases.push(phase);
            }
            if arena.ai.patrol_index() != Some(first) {
                break;
            }
        }
        assert_eq!(arena.ai.patrol_index(), Some(1 - first));
        assert_eq!(phases.len(), 4);
        assert_eq!(arena.world.walking.get(&arena.ai.id()), Some(&false));
    }

    #[test]
    fn test_patrol_index_frequencies() {
        let mut rng = fastrand::Rng::with_seed(42);
        let mut counts = [0_u32; 4];
        for _ in 0..4000 {
            let next = next_patrol_index(Some(2), 4, &mut rng).expect("non-empty");
            counts[next] += 1;
        }
        assert_eq!(counts[2], 0);
        for (i, count) in counts.iter().enumerate().filter(|(i, _)| *i != 2) {
            assert!((1100..1570).contains(count), "index {i} picked {count} times");
        }
        assert_eq!(next_patrol_index(Some(0), 1, &mut rng), Some(0));
        assert_eq!(next_patrol_index(None, 0, &mut rng), None);
    }

    proptest! {
        #[test]
        fn test_patrol_index_never_repeats(seed in any::<u64>(), count in 2_usize..12, prev in 0_usize..12) {
            let prev = prev % count;
            let mut rng = fastrand::Rng::with_seed(seed);
            for _ in 0..32 {
                let next = next_patrol_index(Some(prev), count, &mut rng).expect("non-empty");
                prop_assert!(next < count);
                prop_assert_ne!(next, prev);
            }
        }
    }

    #[test]
    fn test_damage_forces_aggro_without_perception() {
        let mut arena = Arena::new(EnemyConfig::default(), Vec3::new(0.0, 0.0, -30.0));
        arena.hit_enemy(5.0);
        arena.step(false);
        assert_eq!(arena.ai.state(), AiState::Aggro);
        assert_eq!(arena.ai.last_known_position(), Some(Vec3::ZERO));
    }

    #[test]
    fn test_dead_actor_does_nothing() {
        let mut arena = Arena::new(melee_config(0.0), Vec3::new(0.0, 0.0, 1.5));
        arena.hit_enemy(500.0);
        arena.step(true);
        assert!(arena.ai.is_dead());
        assert_eq!(arena.world.dead, vec![arena.ai.id()]);

        let state = arena.ai.state();
        for _ in 0..10 {
            arena.step(true);
        }
        assert_eq!(arena.ai.state(), state);
        assert_eq!(arena.ai.body().position, Vec3::ZERO);
        assert!(arena.world.attacks.is_empty());
        assert_eq!(arena.player_health(), 100.0);
    }

    #[test]
    fn test_melee_strike_lands_after_wind_up() {
        let mut arena = Arena::new(melee_config(0.5), Vec3::new(0.0, 0.0, 1.5));
        arena.step(true);
        let mut steps = 0;
        while arena.world.attacks.is_empty() && steps < 20 {
            arena.step(true);
            steps += 1;
        }
        assert_eq!(arena.world.attacks.len(), 1);
        assert_eq!(arena.player_health(), 100.0);

        // 0.3 s wind-up.
        arena.step(true);
        assert_eq!(arena.player_health(), 100.0);
        arena.step(true);
        assert_eq!(arena.player_health(), 90.0);
    }

    #[test]
    fn test_death_cancels_pending_strike() {
        let mut arena = Arena::new(melee_config(0.0), Vec3::new(0.0, 0.0, 1.5));
        arena.step(true);
        arena.step(true);
        assert_eq!(arena.world.attacks.len(), 1);
        match arena.ai.attack() {
            AttackBehavior::Melee(melee) => assert!(melee.has_pending_strike()),
            other => panic!("expected melee, got {other:?}"),
        }

        arena.hit_enemy(500.0);
        for _ in 0..4 {
            arena.step(true);
        }
        assert!(arena.ai.is_dead());
        assert_eq!(arena.player_health(), 100.0);
    }

    fn shooter(spell: Option<SpellDefinition>) -> Arena {
        let config = EnemyConfig {
            attack: AttackConfig::Ranged(RangedConfig {
                cooldown: 0.0,
                accuracy: 0.0,
                ..RangedConfig::default()
            }),
            ..EnemyConfig::default()
        };
        Arena::build(config, Vec3::new(0.0, 0.0, 8.0), spell.map(Loadout::new))
    }

    #[test]
    fn test_shooter_spawns_aimed_projectile() {
        let spell = SpellDefinition::new("bolt").with_effect(EffectDef::AddDamage {
            kind: crate::damage::DamageKind::Fire,
            amount: 5.0,
        });
        let mut arena = shooter(Some(spell));
        arena.step(true);
        arena.step(true);

        assert_eq!(arena.world.spawned.len(), 1);
        let body = arena.world.spawned[0].body();
        assert_eq!(body.owner, arena.ai.id());
        assert!(body.damageable.contains(Tag::Player));
        assert!(body.direction.z > 0.99);
    }

    #[test]
    fn test_shooter_without_spell_only_postures() {
        let mut arena = shooter(None);
        arena.step(true);
        arena.step(true);
        assert_eq!(arena.world.attacks.len(), 1);
        assert!(arena.world.spawned.is_empty());
    }

    #[test]
    fn test_leap_arcs_and_lands_with_damage() {
        let config = EnemyConfig {
            attack: AttackConfig::Leap(LeapConfig {
                cooldown: 0.0,
                ..LeapConfig::default()
            }),
            ..EnemyConfig::default()
        };
        let mut arena = Arena::new(config, Vec3::new(0.0, 0.0, 6.0));
        arena.step(true);
        arena.step(true);
        assert!(arena.ai.attack().is_leaping());

        let dt = 0.125;
        let mut apex: f32 = 0.0;
        for _ in 0..4 {
            arena.ai.step(dt, &mut arena.world, Some(&arena.player), &mut arena.rng);
            apex = apex.max(arena.ai.body().position.y);
        }
        assert!(!arena.ai.attack().is_leaping());
        assert!(apex > 1.5);
        assert_eq!(arena.ai.body().position, Vec3::new(0.0, 0.0, 6.0));
        assert_eq!(arena.player_health(), 90.0);
    }

    #[test]
    fn test_death_releases_subscription() {
        let mut arena = Arena::new(melee_config(0.0), Vec3::new(0.0, 0.0, 1.5));
        arena.hit_enemy(500.0);
        arena.step(true);
        assert!(arena.ai.is_dead());

        arena.world.events.publish(CombatEvent::Died { entity: EntityId::new() });
        assert_eq!(arena.world.events.subscriber_count(), 0);
    }

    #[test]
    fn test_detach_unsubscribes() {
        let mut arena = Arena::new(EnemyConfig::default(), Vec3::ZERO);
        assert_eq!(arena.world.events.subscriber_count(), 1);
        arena.ai.detach(&mut arena.world.events);
        assert_eq!(arena.world.events.subscriber_count(), 0);
    }
}
