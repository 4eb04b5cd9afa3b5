//! Enemy tunables.
//!
//! Loaded before the simulation starts and immutable for an actor's lifetime.
//! Every struct uses `#[serde(default)]` so content only lists what it changes.

use emberfall_common::{LayerMask, Tag};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::damage::DamageKind;
use crate::stats::{StatKind, StatSheet};

/// Vision cone and hearing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Maximum straight-line sight distance.
    pub vision_range: f32,
    /// Horizontal half-angle of the cone, degrees.
    pub horizontal_fov: f32,
    /// Vertical half-angle of the cone, degrees.
    pub vertical_fov: f32,
    /// Eye height above the feet.
    pub eye_height: f32,
    /// Height above the player's feet the eyes aim at.
    pub target_height: f32,
    /// 360° hearing radius, measured on the ground plane.
    pub proximity_radius: f32,
    /// Tags that block or satisfy the line-of-sight ray.
    pub vision_mask: LayerMask,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            vision_range: 15.0,
            horizontal_fov: 60.0,
            vertical_fov: 30.0,
            eye_height: 1.0,
            target_height: 1.0,
            proximity_radius: 3.0,
            vision_mask: LayerMask::of(&[Tag::Player, Tag::World]),
        }
    }
}

/// Patrol route and idle scanning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatrolConfig {
    /// Seconds spent standing at a point before scanning.
    pub wait_time: f32,
    /// Walking speed while patrolling.
    pub speed: f32,
    /// Scan turn rate, degrees per second.
    pub scan_rotation_speed: f32,
    /// Seconds spent scanning.
    pub scan_duration: f32,
    /// Route points; empty disables patrol movement.
    pub points: Vec<Vec3>,
}

impl Default for PatrolConfig {
    fn default() -> Self {
        Self {
            wait_time: 2.0,
            speed: 1.5,
            scan_rotation_speed: 120.0,
            scan_duration: 2.5,
            points: Vec::new(),
        }
    }
}

/// Pursuit and leash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggroConfig {
    /// Seconds of continued pursuit after losing the player.
    pub post_sight_track_duration: f32,
    /// Speed while searching.
    pub search_speed: f32,
    /// Speed while chasing.
    pub aggro_speed: f32,
    /// Tolerance when snapping remembered positions to navigable ground.
    pub snap_tolerance: f32,
    /// Facing interpolation rate per second.
    pub facing_rate: f32,
}

impl Default for AggroConfig {
    fn default() -> Self {
        Self {
            post_sight_track_duration: 1.5,
            search_speed: 2.0,
            aggro_speed: 3.5,
            snap_tolerance: 2.0,
            facing_rate: 10.0,
        }
    }
}

/// Close-range strike dealing contact damage after a wind-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeleeConfig {
    /// Distance at which the actor stops and strikes.
    pub range: f32,
    /// Seconds between strikes.
    pub cooldown: f32,
    /// Radius of the damage sphere.
    pub strike_radius: f32,
    /// Damage sphere center in the actor's local frame.
    pub strike_offset: Vec3,
    /// Seconds between the attack cue and the damage.
    pub damage_delay: f32,
    /// Kind of damage dealt.
    pub damage_kind: DamageKind,
}

impl Default for MeleeConfig {
    fn default() -> Self {
        Self {
            range: 2.0,
            cooldown: 1.5,
            strike_radius: 1.5,
            strike_offset: Vec3::new(0.0, 0.5, 1.0),
            damage_delay: 0.3,
            damage_kind: DamageKind::Physical,
        }
    }
}

/// Spell-casting from a distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangedConfig {
    /// Distance at which the actor stops and shoots.
    pub range: f32,
    /// Seconds between shots.
    pub cooldown: f32,
    /// Maximum yaw and pitch deviation, degrees.
    pub accuracy: f32,
    /// Height above the player's feet to aim at.
    pub aim_height: f32,
    /// Projectile spawn point in the actor's local frame.
    pub muzzle_offset: Vec3,
    /// Spell to cast; `None` makes the actor posture without firing.
    pub spell: Option<String>,
}

impl Default for RangedConfig {
    fn default() -> Self {
        Self {
            range: 12.0,
            cooldown: 1.5,
            accuracy: 5.0,
            aim_height: 0.5,
            muzzle_offset: Vec3::new(0.0, 1.0, 0.6),
            spell: None,
        }
    }
}

/// Parabolic leap with landing damage, plus a melee fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeapConfig {
    /// No leap below this distance.
    pub min_range: f32,
    /// No leap above this distance.
    pub max_range: f32,
    /// Seconds between leaps.
    pub cooldown: f32,
    /// Seconds in the air.
    pub duration: f32,
    /// Apex height.
    pub height: f32,
    /// Radius of the landing damage check.
    pub landing_radius: f32,
    /// Speed while closing in on foot.
    pub chase_speed: f32,
    /// Kind of landing damage.
    pub damage_kind: DamageKind,
    /// Strike used when already in melee range.
    pub melee: MeleeConfig,
}

impl Default for LeapConfig {
    fn default() -> Self {
        Self {
            min_range: 3.0,
            max_range: 8.0,
            cooldown: 2.5,
            duration: 0.5,
            height: 2.0,
            landing_radius: 2.0,
            chase_speed: 2.5,
            damage_kind: DamageKind::Physical,
            melee: MeleeConfig::default(),
        }
    }
}

/// Which attack an enemy uses while aggroed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttackConfig {
    /// Walks up and strikes.
    Melee(MeleeConfig),
    /// Keeps distance and casts a spell.
    Ranged(RangedConfig),
    /// Leaps in from mid range.
    Leap(LeapConfig),
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self::Melee(MeleeConfig::default())
    }
}

/// Everything needed to spawn one enemy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    /// Display name.
    pub name: String,
    /// Vision and hearing.
    pub perception: PerceptionConfig,
    /// Route and idle behavior.
    pub patrol: PatrolConfig,
    /// Pursuit and leash.
    pub aggro: AggroConfig,
    /// Attack behavior.
    pub attack: AttackConfig,
    /// Starting stat values.
    pub stats: StatSheet,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            name: "Enemy".to_string(),
            perception: PerceptionConfig::default(),
            patrol: PatrolConfig::default(),
            aggro: AggroConfig::default(),
            attack: AttackConfig::default(),
            stats: StatSheet::new()
                .with(StatKind::Health, 100.0)
                .with(StatKind::Armor, 0.0)
                .with(StatKind::ContactDamage, 10.0)
                .with(StatKind::MoveSpeed, 3.5),
        }
    }
}

impl EnemyConfig {
    /// Clamps values into sane ranges.
    pub fn validate(&mut self) {
        let p = &mut self.perception;
        p.vision_range = p.vision_range.max(0.0);
        p.horizontal_fov = p.horizontal_fov.clamp(0.0, 180.0);
        p.vertical_fov = p.vertical_fov.clamp(0.0, 90.0);
        p.proximity_radius = p.proximity_radius.max(0.0);

        let patrol = &mut self.patrol;
        patrol.wait_time = patrol.wait_time.max(0.0);
        patrol.speed = patrol.speed.max(0.0);
        patrol.scan_duration = patrol.scan_duration.max(0.0);

        let aggro = &mut self.aggro;
        aggro.post_sight_track_duration = aggro.post_sight_track_duration.max(0.0);
        aggro.search_speed = aggro.search_speed.max(0.0);
        aggro.aggro_speed = aggro.aggro_speed.max(0.0);
        aggro.snap_tolerance = aggro.snap_tolerance.max(0.0);
        aggro.facing_rate = aggro.facing_rate.max(0.0);

        match &mut self.attack {
            AttackConfig::Melee(melee) => clamp_melee(melee),
            AttackConfig::Ranged(ranged) => {
                ranged.range = ranged.range.max(0.0);
                ranged.cooldown = ranged.cooldown.max(0.0);
                ranged.accuracy = ranged.accuracy.clamp(0.0, 90.0);
            },
            AttackConfig::Leap(leap) => {
                leap.min_range = leap.min_range.max(0.0);
                leap.max_range = leap.max_range.max(leap.min_range);
                leap.cooldown = leap.cooldown.max(0.0);
                // Zero would divide the arc time.
                leap.duration = leap.duration.max(0.01);
                leap.landing_radius = leap.landing_radius.max(0.0);
                leap.chase_speed = leap.chase_speed.max(0.0);
                clamp_melee(&mut leap.melee);
            },
        }
    }
}

fn clamp_melee(melee: &mut MeleeConfig) {
    melee.range = melee.range.max(0.0);
    melee.cooldown = melee.cooldown.max(0.0);
    melee.strike_radius = melee.strike_radius.max(0.0);
    melee.damage_delay = melee.damage_delay.max(0.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EnemyConfig::default();
        assert_eq!(config.perception.vision_range, 15.0);
        assert_eq!(config.patrol.scan_rotation_speed, 120.0);
        assert_eq!(config.aggro.post_sight_track_duration, 1.5);
        assert!(matches!(config.attack, AttackConfig::Melee(ref m) if m.range == 2.0));
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let text = r#"(
            name: "Spider",
            perception: (vision_range: 20.0),
            attack: Leap((max_range: 10.0)),
        )"#;
        let config: EnemyConfig = ron::from_str(text).expect("valid RON");
        assert_eq!(config.name, "Spider");
        assert_eq!(config.perception.vision_range, 20.0);
        assert_eq!(config.perception.horizontal_fov, 60.0);
        match config.attack {
            AttackConfig::Leap(leap) => {
                assert_eq!(leap.max_range, 10.0);
                assert_eq!(leap.min_range, 3.0);
                assert_eq!(leap.melee.damage_delay, 0.3);
            },
            other => panic!("expected leap, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_clamps() {
        let mut config = EnemyConfig {
            attack: AttackConfig::Leap(LeapConfig {
                min_range: 6.0,
                max_range: 2.0,
                duration: 0.0,
                ..LeapConfig::default()
            }),
            ..EnemyConfig::default()
        };
        config.perception.horizontal_fov = 400.0;
        config.validate();

        assert_eq!(config.perception.horizontal_fov, 180.0);
        match config.attack {
            AttackConfig::Leap(leap) => {
                assert_eq!(leap.max_range, 6.0);
                assert!(leap.duration > 0.0);
            },
            other => panic!("expected leap, got {other:?}"),
        }
    }
}
