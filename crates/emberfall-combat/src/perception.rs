//! Perception predicates: vision cone and proximity hearing.
//!
//! Pure functions over host queries. A missing player is simply "not perceived".

use emberfall_common::geometry::{angle_degrees, flat_distance, flatten, EPSILON};
use glam::Vec3;

use crate::config::PerceptionConfig;
use crate::world::{PlayerSnapshot, WorldQuery};

/// Whether an observer at `position` facing `forward` sees the player.
///
/// The eyes sit `eye_height` above the feet and look at a point `target_height`
/// above the player's feet. The range check uses the straight-line distance;
/// the horizontal angle is measured on the ground plane; the vertical angle is
/// the elevation of the sight line. The line-of-sight ray must land on the player.
pub fn vision_cone<W>(
    world: &W,
    position: Vec3,
    forward: Vec3,
    player: Option<&PlayerSnapshot>,
    config: &PerceptionConfig,
) -> bool
where
    W: WorldQuery + ?Sized,
{
    let Some(player) = player else {
        return false;
    };

    let eye = position + Vec3::Y * config.eye_height;
    let target = player.position + Vec3::Y * config.target_height;
    let to_target = target - eye;
    let distance = to_target.length();
    if distance > config.vision_range {
        return false;
    }
    if distance < EPSILON {
        return true;
    }

    let horizontal = angle_degrees(flatten(forward), flatten(to_target));
    if horizontal > config.horizontal_fov {
        return false;
    }

    let direction = to_target / distance;
    let vertical = direction.y.clamp(-1.0, 1.0).asin().to_degrees();
    if vertical.abs() > config.vertical_fov {
        return false;
    }

    world
        .raycast(eye, direction, distance, config.vision_mask)
        .is_some_and(|hit| world.is_part_of(&hit.collider, player.entity))
}

/// Whether the player is within hearing range, ignoring walls and height.
#[must_use]
pub fn proximity(position: Vec3, player: Option<&PlayerSnapshot>, config: &PerceptionConfig) -> bool {
    player.is_some_and(|p| flat_distance(position, p.position) <= config.proximity_radius)
}

/// Vision or hearing.
pub fn can_perceive<W>(
    world: &W,
    position: Vec3,
    forward: Vec3,
    player: Option<&PlayerSnapshot>,
    config: &PerceptionConfig,
) -> bool
where
    W: WorldQuery + ?Sized,
{
    vision_cone(world, position, forward, player, config) || proximity(position, player, config)
}
