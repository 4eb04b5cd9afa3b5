//! Scenario configuration.
//!
//! This module provides:
//! - [`ScenarioConfig`], the TOML description of one arena run
//! - Loading with defaults for a missing file and errors for a broken one
//! - Resolution of the content library a scenario runs against
//! - Spawners that release enemies over time on a spiral around a point

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use emberfall_combat::content::{ContentError, ContentLibrary};
use emberfall_combat::stats::{StatKind, StatSheet};
use emberfall_common::{EmberError, SchemaVersion};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Content used when a scenario does not name a file.
pub const BUILTIN_CONTENT: &str = include_str!("../assets/content.ron");

/// Smallest accepted timestep.
pub const MIN_TIMESTEP: f32 = 1.0 / 240.0;

/// Largest accepted timestep.
pub const MAX_TIMESTEP: f32 = 0.25;

/// Largest accepted spawner spacing.
pub const MAX_SPAWN_SPACING: f32 = 10.0;

/// Radians between consecutive spiral positions.
const GOLDEN_ANGLE: f32 = 2.39996;

/// Errors that can occur while loading a scenario.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or write the file.
    #[error("Failed to access scenario file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse scenario TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to write TOML.
    #[error("Failed to serialize scenario: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Written by an incompatible schema.
    #[error("Unsupported scenario version {found}, this build reads {supported}")]
    Version {
        /// Version in the file.
        found: SchemaVersion,
        /// Version this build reads.
        supported: SchemaVersion,
    },

    /// A spawn names an archetype the content does not define.
    #[error("Unknown enemy archetype: {0}")]
    UnknownArchetype(String),

    /// The player is armed with a spell the content does not define.
    #[error("Unknown player spell: {0}")]
    UnknownSpell(String),

    /// The content library could not be loaded.
    #[error(transparent)]
    Content(#[from] ContentError),
}

impl From<ConfigError> for EmberError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(io) => Self::Io(io),
            ConfigError::Version { found, supported } => Self::VersionMismatch {
                expected: supported,
                actual: found,
            },
            ConfigError::Content(content) => content.into(),
            other => Self::Config(other.to_string()),
        }
    }
}

/// An axis-aligned wall.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WallConfig {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

/// Arena geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Half the side length of the square floor, centered on the origin.
    pub half_extent: f32,
    /// Walls on the floor.
    pub walls: Vec<WallConfig>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            half_extent: 25.0,
            walls: vec![WallConfig {
                min: Vec3::new(4.0, 0.0, 5.0),
                max: Vec3::new(6.0, 3.0, 6.0),
            }],
        }
    }
}

/// The scripted player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Seconds between casts.
    pub fire_cooldown: f32,
    /// Walking speed between waypoints.
    pub speed: f32,
    /// How far the player looks for targets.
    pub vision_range: f32,
    /// Spell to cast; `None` keeps the player unarmed.
    pub spell: Option<String>,
    /// Feet position at the start.
    pub start: Vec3,
    /// Points walked in a loop; empty keeps the player still.
    pub waypoints: Vec<Vec3>,
    /// Starting stat values.
    pub stats: StatSheet,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            fire_cooldown: 0.8,
            speed: 3.0,
            vision_range: 20.0,
            spell: Some("ember_bolt".to_string()),
            start: Vec3::ZERO,
            waypoints: vec![Vec3::new(-3.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0)],
            stats: StatSheet::new()
                .with(StatKind::Health, 250.0)
                .with(StatKind::Armor, 2.0)
                .with(StatKind::CritChance, 10.0)
                .with(StatKind::CritDamage, 50.0),
        }
    }
}

/// One enemy to place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemySpawn {
    /// Archetype name in the content library.
    pub archetype: String,
    /// Initial facing, degrees of yaw from +Z.
    pub yaw_degrees: f32,
    /// Feet position.
    pub position: Vec3,
    /// Replaces the archetype's patrol route when not empty.
    pub patrol: Vec<Vec3>,
    /// Seconds into the run before the enemy appears.
    pub spawn_delay: f32,
}

impl Default for EnemySpawn {
    fn default() -> Self {
        Self {
            archetype: "Grunt".to_string(),
            yaw_degrees: 0.0,
            position: Vec3::ZERO,
            patrol: Vec::new(),
            spawn_delay: 0.0,
        }
    }
}

/// Releases enemies one at a time around a point.
///
/// The archetype list is cycled `copies` times. Spawn `i` appears
/// `start_delay + i * cooldown` seconds into the run, `spacing * sqrt(i)` away
/// from `position` on a golden-angle spiral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Archetypes in release order.
    pub archetypes: Vec<String>,
    /// How many times the list is cycled.
    pub copies: u32,
    /// Seconds between consecutive spawns.
    pub cooldown: f32,
    /// Seconds before the first spawn.
    pub start_delay: f32,
    /// Center of the spiral, feet height.
    pub position: Vec3,
    /// Distance scale between spawned enemies.
    pub spacing: f32,
    /// Initial facing of every spawned enemy.
    pub yaw_degrees: f32,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            archetypes: Vec::new(),
            copies: 1,
            cooldown: 0.5,
            start_delay: 0.0,
            position: Vec3::ZERO,
            spacing: 1.5,
            yaw_degrees: 0.0,
        }
    }
}

impl SpawnerConfig {
    /// Every spawn this spawner releases, in release order.
    #[must_use]
    pub fn spawns(&self) -> Vec<EnemySpawn> {
        let total = self.archetypes.len() * self.copies as usize;
        (0..total)
            .map(|i| EnemySpawn {
                archetype: self.archetypes[i % self.archetypes.len()].clone(),
                yaw_degrees: self.yaw_degrees,
                position: self.position + spiral_offset(i, self.spacing),
                patrol: Vec::new(),
                spawn_delay: self.start_delay + i as f32 * self.cooldown,
            })
            .collect()
    }
}

/// Offset of the `index`th point on a golden-angle spiral; the first sits at the center.
#[must_use]
pub fn spiral_offset(index: usize, spacing: f32) -> Vec3 {
    if index == 0 {
        return Vec3::ZERO;
    }
    let radius = spacing * (index as f32).sqrt();
    let angle = index as f32 * GOLDEN_ANGLE;
    Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius)
}

/// One arena run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Random seed; equal seeds give equal runs.
    pub seed: u64,
    /// Fixed simulation step, seconds.
    pub timestep: f32,
    /// Simulated seconds before the run is called.
    pub duration: f32,
    /// RON content file; the built-in content is used when unset.
    pub content: Option<PathBuf>,
    /// Where to write the JSON summary.
    pub output: Option<PathBuf>,
    /// Schema version the file was written for.
    pub version: SchemaVersion,
    /// Floor and walls.
    pub arena: ArenaConfig,
    /// The player.
    pub player: PlayerConfig,
    /// Enemies to place.
    pub enemies: Vec<EnemySpawn>,
    /// Timed spawners.
    pub spawners: Vec<SpawnerConfig>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            timestep: 1.0 / 30.0,
            duration: 60.0,
            content: None,
            output: None,
            version: SchemaVersion::SCENARIO,
            arena: ArenaConfig::default(),
            player: PlayerConfig::default(),
            enemies: vec![
                EnemySpawn {
                    archetype: "Grunt".to_string(),
                    yaw_degrees: 180.0,
                    position: Vec3::new(0.0, 0.0, 12.0),
                    patrol: vec![Vec3::new(-4.0, 0.0, 12.0), Vec3::new(4.0, 0.0, 12.0)],
                    spawn_delay: 0.0,
                },
                EnemySpawn {
                    archetype: "Archer".to_string(),
                    yaw_degrees: 180.0,
                    position: Vec3::new(8.0, 0.0, 14.0),
                    ..Default::default()
                },
                EnemySpawn {
                    archetype: "Stalker".to_string(),
                    yaw_degrees: 135.0,
                    position: Vec3::new(-10.0, 0.0, 10.0),
                    ..Default::default()
                },
            ],
            spawners: Vec::new(),
        }
    }
}

impl ScenarioConfig {
    /// Loads a scenario from `path`.
    ///
    /// A missing file yields the defaults. A relative content path is resolved
    /// against the scenario's directory.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            info!("Scenario file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&contents)?;
        if let (Some(content), Some(dir)) = (config.content.as_mut(), path.parent()) {
            if content.is_relative() {
                *content = dir.join(&*content);
            }
        }
        info!("Loaded scenario from {}", path.display());
        Ok(config)
    }

    /// Parses TOML text, checks the version and clamps values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(text)?;
        if !SchemaVersion::SCENARIO.can_read(&config.version) {
            return Err(ConfigError::Version {
                found: config.version,
                supported: SchemaVersion::SCENARIO,
            });
        }
        config.validate();
        Ok(config)
    }

    /// Writes the scenario as pretty TOML.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved scenario to {}", path.display());
        Ok(())
    }

    /// Validate and clamp values to sensible ranges.
    pub fn validate(&mut self) {
        self.timestep = self.timestep.clamp(MIN_TIMESTEP, MAX_TIMESTEP);
        self.duration = self.duration.max(0.0);

        self.arena.half_extent = self.arena.half_extent.max(1.0);

        let player = &mut self.player;
        player.fire_cooldown = player.fire_cooldown.max(0.0);
        player.speed = player.speed.max(0.0);
        player.vision_range = player.vision_range.max(0.0);

        for spawn in &mut self.enemies {
            spawn.spawn_delay = spawn.spawn_delay.max(0.0);
        }
        for spawner in &mut self.spawners {
            spawner.cooldown = spawner.cooldown.max(0.0);
            spawner.start_delay = spawner.start_delay.max(0.0);
            spawner.spacing = spawner.spacing.clamp(0.0, MAX_SPAWN_SPACING);
        }
    }

    /// Placed enemies followed by spawner releases, ordered by spawn time.
    ///
    /// Spawns due at the same time keep their configured order.
    #[must_use]
    pub fn spawn_plan(&self) -> Vec<EnemySpawn> {
        let mut plan: Vec<EnemySpawn> = self
            .enemies
            .iter()
            .cloned()
            .chain(self.spawners.iter().flat_map(SpawnerConfig::spawns))
            .collect();
        plan.sort_by(|a, b| a.spawn_delay.total_cmp(&b.spawn_delay));
        plan
    }

    /// Loads the content this scenario names and checks every reference into it.
    pub fn load_content(&self) -> Result<ContentLibrary, ConfigError> {
        let library = match &self.content {
            Some(path) => ContentLibrary::load(path)?,
            None => ContentLibrary::from_ron_str(BUILTIN_CONTENT)?,
        };
        self.check_references(&library)?;
        Ok(library)
    }

    /// Fails on the first archetype or spell `library` does not define.
    pub fn check_references(&self, library: &ContentLibrary) -> Result<(), ConfigError> {
        if let Some(spell) = &self.player.spell {
            if library.spell(spell).is_none() {
                return Err(ConfigError::UnknownSpell(spell.clone()));
            }
        }
        let mut archetypes = self
            .enemies
            .iter()
            .map(|spawn| &spawn.archetype)
            .chain(self.spawners.iter().flat_map(|spawner| &spawner.archetypes));
        match archetypes.find(|name| library.enemy(name).is_none()) {
            Some(name) => Err(ConfigError::UnknownArchetype(name.clone())),
            None => Ok(()),
        }
    }
}
