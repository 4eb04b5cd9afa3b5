//! Content loading: spells, status effects and enemy archetypes from RON.
//!
//! This module provides:
//! - The on-disk [`ContentFile`] layout with a schema version
//! - Validation on load (ids, references, projectile parameters)
//! - [`ContentLibrary`] with lookup by id and ready-made loadouts and enemies
//!
//! Everything here runs before a simulation starts, so failures are reported as
//! [`ContentError`] instead of being degraded at runtime.

use std::fs;
use std::path::Path;

use ahash::AHashMap;
use emberfall_common::{EmberError, EntityId, SchemaVersion, StatusId};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::ai::EnemyAi;
use crate::config::{AttackConfig, EnemyConfig};
use crate::effects::{EffectDef, StatusRegistry};
use crate::spell::{Loadout, SpellDefinition};
use crate::status::StatusEffect;

/// Errors that can occur while loading content.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Failed to read the file.
    #[error("Failed to read content file: {0}")]
    Read(#[from] std::io::Error),

    /// Failed to parse RON.
    #[error("Failed to parse content RON: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Written by an incompatible schema.
    #[error("Unsupported content version {found}, this build reads {supported}")]
    Version {
        /// Version in the file.
        found: SchemaVersion,
        /// Version this build reads.
        supported: SchemaVersion,
    },

    /// Two spells share an id.
    #[error("Duplicate spell id: {0}")]
    DuplicateSpell(String),

    /// Two status effects share an id.
    #[error("Duplicate status id: {0}")]
    DuplicateStatus(u32),

    /// Two enemy archetypes share a name.
    #[error("Duplicate enemy name: {0}")]
    DuplicateEnemy(String),

    /// A spell applies a status that is not defined.
    #[error("Spell '{spell}' references unknown status {status}")]
    UnknownStatus {
        /// Referencing spell.
        spell: String,
        /// Missing status id.
        status: u32,
    },

    /// An enemy casts a spell that is not defined.
    #[error("Enemy '{enemy}' references unknown spell '{spell}'")]
    UnknownSpell {
        /// Referencing enemy.
        enemy: String,
        /// Missing spell id.
        spell: String,
    },

    /// A value is out of range.
    #[error("Content validation error: {0}")]
    Validation(String),
}

/// Result type for content loading.
pub type ContentResult<T> = Result<T, ContentError>;

impl From<ContentError> for EmberError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Read(io) => Self::Io(io),
            ContentError::Version { found, supported } => Self::VersionMismatch {
                expected: supported,
                actual: found,
            },
            other => Self::Content(other.to_string()),
        }
    }
}

/// One content file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentFile {
    /// Schema version the file was written for.
    #[serde(default)]
    pub version: SchemaVersion,
    /// Status effect definitions.
    #[serde(default)]
    pub statuses: Vec<StatusEffect>,
    /// Spell definitions.
    #[serde(default)]
    pub spells: Vec<SpellDefinition>,
    /// Enemy archetypes, looked up by name.
    #[serde(default)]
    pub enemies: Vec<EnemyConfig>,
}

fn validate_spell(spell: &SpellDefinition, statuses: &StatusRegistry) -> ContentResult<()> {
    if spell.id.trim().is_empty() {
        return Err(ContentError::Validation("spell with empty id".to_string()));
    }
    for effect in &spell.effects {
        match *effect {
            EffectDef::BaseProjectileStats {
                speed,
                lifetime,
                size,
                tick_rate,
            } => {
                if speed <= 0.0 || lifetime <= 0.0 || size <= 0.0 || tick_rate <= 0.0 {
                    return Err(ContentError::Validation(format!(
                        "spell '{}': projectile speed, lifetime, size and tick rate must be positive",
                        spell.id
                    )));
                }
            },
            EffectDef::AddDamage { amount, .. } if amount < 0.0 => {
                return Err(ContentError::Validation(format!(
                    "spell '{}': negative damage {amount}",
                    spell.id
                )));
            },
            EffectDef::Homing {
                rotation_speed,
                radius,
                ..
            } if rotation_speed < 0.0 || radius < 0.0 => {
                return Err(ContentError::Validation(format!(
                    "spell '{}': homing rate and radius must not be negative",
                    spell.id
                )));
            },
            EffectDef::HitTwice { delay, .. } if delay < 0.0 => {
                return Err(ContentError::Validation(format!(
                    "spell '{}': negative follow-up delay",
                    spell.id
                )));
            },
            EffectDef::ApplyStatus { status, .. } if !statuses.contains_key(&status) => {
                return Err(ContentError::UnknownStatus {
                    spell: spell.id.clone(),
                    status: status.raw(),
                });
            },
            _ => {},
        }
    }
    Ok(())
}

/// Validated spells, statuses and enemy archetypes.
#[derive(Debug, Clone, Default)]
pub struct ContentLibrary {
    spells: AHashMap<String, SpellDefinition>,
    spell_order: Vec<String>,
    statuses: StatusRegistry,
    enemies: AHashMap<String, EnemyConfig>,
}

impl ContentLibrary {
    /// Creates an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates RON text.
    pub fn from_ron_str(text: &str) -> ContentResult<Self> {
        let file: ContentFile = ron::from_str(text)?;
        Self::from_file(file)
    }

    /// Reads and validates a RON file.
    pub fn load(path: impl AsRef<Path>) -> ContentResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let library = Self::from_ron_str(&text)?;
        info!(
            "Loaded content from {:?}: {} spells, {} statuses, {} enemies",
            path,
            library.spells.len(),
            library.statuses.len(),
            library.enemies.len()
        );
        Ok(library)
    }

    /// Validates an already-parsed file.
    pub fn from_file(file: ContentFile) -> ContentResult<Self> {
        if !SchemaVersion::CONTENT.can_read(&file.version) {
            return Err(ContentError::Version {
                found: file.version,
                supported: SchemaVersion::CONTENT,
            });
        }

        let mut library = Self::new();
        // Statuses first: spells reference them.
        for status in file.statuses {
            library.register_status(status)?;
        }
        for spell in file.spells {
            library.register_spell(spell)?;
        }
        for enemy in file.enemies {
            library.register_enemy(enemy)?;
        }
        Ok(library)
    }

    /// Adds a status effect.
    pub fn register_status(&mut self, status: StatusEffect) -> ContentResult<()> {
        if self.statuses.contains_key(&status.id) {
            return Err(ContentError::DuplicateStatus(status.id.raw()));
        }
        debug!(status = %status.name, id = status.id.raw(), "Registered status");
        self.statuses.insert(status.id, status);
        Ok(())
    }

    /// Adds a spell after checking its parameters and status references.
    pub fn register_spell(&mut self, spell: SpellDefinition) -> ContentResult<()> {
        if self.spells.contains_key(&spell.id) {
            return Err(ContentError::DuplicateSpell(spell.id));
        }
        validate_spell(&spell, &self.statuses)?;
        debug!(spell = %spell.id, effects = spell.effects.len(), "Registered spell");
        self.spell_order.push(spell.id.clone());
        self.spells.insert(spell.id.clone(), spell);
        Ok(())
    }

    /// Adds an enemy archetype; a ranged one must cast a known spell.
    pub fn register_enemy(&mut self, mut enemy: EnemyConfig) -> ContentResult<()> {
        if self.enemies.contains_key(&enemy.name) {
            return Err(ContentError::DuplicateEnemy(enemy.name));
        }
        if let AttackConfig::Ranged(ranged) = &enemy.attack {
            if let Some(spell) = ranged.spell.as_ref().filter(|id| !self.spells.contains_key(*id)) {
                return Err(ContentError::UnknownSpell {
                    enemy: enemy.name.clone(),
                    spell: spell.clone(),
                });
            }
        }
        enemy.validate();
        self.enemies.insert(enemy.name.clone(), enemy);
        Ok(())
    }

    /// Spell by id.
    #[must_use]
    pub fn spell(&self, id: &str) -> Option<&SpellDefinition> {
        self.spells.get(id)
    }

    /// Spells in file order.
    pub fn spells(&self) -> impl Iterator<Item = &SpellDefinition> {
        self.spell_order.iter().filter_map(|id| self.spells.get(id))
    }

    /// Status effect by id.
    #[must_use]
    pub fn status(&self, id: StatusId) -> Option<&StatusEffect> {
        self.statuses.get(&id)
    }

    /// Every status effect, keyed by id.
    #[must_use]
    pub fn statuses(&self) -> &StatusRegistry {
        &self.statuses
    }

    /// Enemy archetype by name.
    #[must_use]
    pub fn enemy(&self, name: &str) -> Option<&EnemyConfig> {
        self.enemies.get(name)
    }

    /// Enemy archetype names, sorted.
    #[must_use]
    pub fn enemy_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.enemies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Loadout wrapping a spell, `None` for an unknown id.
    #[must_use]
    pub fn loadout_for(&self, spell_id: &str) -> Option<Loadout> {
        self.spell(spell_id).cloned().map(Loadout::new)
    }

    /// Creates a controller for the named archetype with its spell equipped.
    pub fn spawn_enemy(
        &self,
        name: &str,
        id: EntityId,
        position: Vec3,
        rng: &mut fastrand::Rng,
    ) -> Option<EnemyAi> {
        let config = self.enemy(name)?.clone();
        Some(self.build_enemy(config, id, position, rng))
    }

    /// Creates a controller from `config`, equipping a ranged attacker's spell.
    pub fn build_enemy(
        &self,
        config: EnemyConfig,
        id: EntityId,
        position: Vec3,
        rng: &mut fastrand::Rng,
    ) -> EnemyAi {
        let loadout = match &config.attack {
            AttackConfig::Ranged(ranged) => ranged.spell.as_deref().and_then(|s| self.loadout_for(s)),
            AttackConfig::Melee(_) | AttackConfig::Leap(_) => None,
        };
        let ai = EnemyAi::new(id, config, position, rng);
        match loadout {
            Some(loadout) => ai.with_loadout(loadout, self.statuses.clone()),
            None => ai,
        }
    }

    /// Number of spells.
    #[must_use]
    pub fn spell_count(&self) -> usize {
        self.spells.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AttackBehavior;
    use crate::damage::DamageKind;
    use crate::stats::StatKind;

    const SAMPLE: &str = r#"(
        version: (major: 1, minor: 0, patch: 0),
        statuses: [
            (id: 1, name: "Burning", duration: 3.0, modifiers: [
                (stat: Armor, value: -5.0, kind: Flat),
            ]),
        ],
        spells: [
            (
                id: "fireball",
                name: "Fireball",
                effects: [
                    BaseProjectileStats(speed: 25.0, lifetime: 2.0),
                    AddDamage(kind: Fire, amount: 20.0),
                    ApplyStatus(status: 1),
                ],
            ),
            (id: "spark", effects: [AddDamage(kind: Physical, amount: 4.0)]),
        ],
        enemies: [
            (name: "Archer", attack: Ranged((spell: Some("spark")))),
            (name: "Grunt"),
        ],
    )"#;

    #[test]
    fn test_parse_sample() {
        let library = ContentLibrary::from_ron_str(SAMPLE).expect("valid content");
        assert_eq!(library.spell_count(), 2);
        let ids: Vec<&str> = library.spells().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["fireball", "spark"]);

        let fireball = library.spell("fireball").expect("fireball");
        assert_eq!(
            fireball.effects[1],
            EffectDef::AddDamage {
                kind: DamageKind::Fire,
                amount: 20.0
            }
        );
        let burning = library.status(StatusId::new(1)).expect("burning");
        assert_eq!(burning.modifiers[0].stat, StatKind::Armor);
        assert_eq!(library.enemy_names(), vec!["Archer", "Grunt"]);
    }

    #[test]
    fn test_duplicate_spell_rejected() {
        let text = r#"(spells: [(id: "a"), (id: "a")])"#;
        assert!(matches!(
            ContentLibrary::from_ron_str(text),
            Err(ContentError::DuplicateSpell(id)) if id == "a"
        ));
    }

    #[test]
    fn test_duplicate_status_rejected() {
        let text = r#"(statuses: [
            (id: 4, name: "Slow", duration: 1.0),
            (id: 4, name: "Slower", duration: 1.0),
        ])"#;
        assert!(matches!(
            ContentLibrary::from_ron_str(text),
            Err(ContentError::DuplicateStatus(4))
        ));
    }

    #[test]
    fn test_unknown_status_rejected() {
        let text = r#"(spells: [(id: "hex", effects: [ApplyStatus(status: 9)])])"#;
        assert!(matches!(
            ContentLibrary::from_ron_str(text),
            Err(ContentError::UnknownStatus { status: 9, .. })
        ));
    }

    #[test]
    fn test_non_positive_speed_rejected() {
        let text = r#"(spells: [(id: "dud", effects: [BaseProjectileStats(speed: 0.0)])])"#;
        assert!(matches!(
            ContentLibrary::from_ron_str(text),
            Err(ContentError::Validation(_))
        ));
    }

    #[test]
    fn test_unknown_enemy_spell_rejected() {
        let text = r#"(enemies: [(name: "Mage", attack: Ranged((spell: Some("nope"))))])"#;
        assert!(matches!(
            ContentLibrary::from_ron_str(text),
            Err(ContentError::UnknownSpell { .. })
        ));
    }

    #[test]
    fn test_newer_major_version_rejected() {
        let text = r#"(version: (major: 2, minor: 0, patch: 0))"#;
        let err = ContentLibrary::from_ron_str(text).expect_err("version too new");
        assert!(matches!(err, ContentError::Version { .. }));
        assert!(matches!(
            EmberError::from(err),
            EmberError::VersionMismatch { .. }
        ));
    }

    #[test]
    fn test_parse_error_converts_to_content_error() {
        let err = ContentLibrary::from_ron_str("(spells: [").expect_err("truncated");
        assert!(matches!(EmberError::from(err), EmberError::Content(_)));
    }

    #[test]
    fn test_loadout_and_enemy_spawn() {
        let library = ContentLibrary::from_ron_str(SAMPLE).expect("valid content");
        let loadout = library.loadout_for("fireball").expect("known spell");
        assert_eq!(loadout.effect_chain().count(), 3);
        assert!(library.loadout_for("missing").is_none());

        let mut rng = fastrand::Rng::with_seed(3);
        let archer = library
            .spawn_enemy("Archer", EntityId::new(), Vec3::ZERO, &mut rng)
            .expect("archer");
        match archer.attack() {
            AttackBehavior::Ranged(ranged) => {
                let spell = ranged.loadout().spell.as_ref().expect("equipped");
                assert_eq!(spell.id, "spark");
            },
            other => panic!("expected ranged, got {other:?}"),
        }
        assert!(library
            .spawn_enemy("Nobody", EntityId::new(), Vec3::ZERO, &mut rng)
            .is_none());
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let err = ContentLibrary::load("/definitely/not/here.ron").expect_err("missing");
        assert!(matches!(err, ContentError::Read(_)));
    }
}
