//! Geometry helpers for a Y-up world where actors face along local +Z.

use glam::{EulerRot, Quat, Vec3};

/// Distances below this are treated as zero.
pub const EPSILON: f32 = 1e-5;

/// Drops the vertical component.
#[must_use]
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Distance between two points ignoring height.
#[must_use]
pub fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    flatten(b - a).length()
}

/// Forward vector of a rotation.
#[must_use]
pub fn forward(rotation: Quat) -> Vec3 {
    rotation * Vec3::Z
}

/// Yaw-only rotation looking along `direction`.
///
/// Returns `None` when the direction has no horizontal extent.
#[must_use]
pub fn look_rotation_flat(direction: Vec3) -> Option<Quat> {
    let flat = flatten(direction);
    if flat.length_squared() < EPSILON * EPSILON {
        return None;
    }
    Some(Quat::from_rotation_y(flat.x.atan2(flat.z)))
}

/// Unsigned angle in degrees between two vectors (0 if either is degenerate).
#[must_use]
pub fn angle_degrees(a: Vec3, b: Vec3) -> f32 {
    if a.length_squared() < EPSILON * EPSILON || b.length_squared() < EPSILON * EPSILON {
        return 0.0;
    }
    a.angle_between(b).to_degrees()
}

/// Rotates `current` toward `target` by at most `max_radians`.
///
/// Both inputs are treated as directions; the result is unit length.
#[must_use]
pub fn rotate_towards(current: Vec3, target: Vec3, max_radians: f32) -> Vec3 {
    let from = current.normalize_or_zero();
    let to = target.normalize_or_zero();
    if from == Vec3::ZERO {
        return to;
    }
    if to == Vec3::ZERO {
        return from;
    }

    let angle = from.angle_between(to);
    if angle <= max_radians.max(0.0) {
        return to;
    }

    let axis = from.cross(to);
    let axis = if axis.length_squared() < EPSILON * EPSILON {
        // Opposite directions: any perpendicular axis works.
        from.any_orthonormal_vector()
    } else {
        axis.normalize()
    };
    (Quat::from_axis_angle(axis, max_radians) * from).normalize()
}

/// Applies a yaw/pitch deviation in degrees to a direction.
#[must_use]
pub fn deviate(direction: Vec3, yaw_degrees: f32, pitch_degrees: f32) -> Vec3 {
    let rotation = Quat::from_euler(
        EulerRot::YXZ,
        yaw_degrees.to_radians(),
        pitch_degrees.to_radians(),
        0.0,
    );
    (rotation * direction).normalize_or_zero()
}

/// Height of a leap arc at normalized time `t` (0 at both ends, `height` at the apex).
#[must_use]
pub fn parabolic_arc(height: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    4.0 * height * t * (1.0 - t)
}

/// Distance along a ray to the first intersection with a sphere.
///
/// `direction` must be unit length. A ray starting inside the sphere hits at 0.
#[must_use]
pub fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let offset = origin - center;
    let b = offset.dot(direction);
    let c = offset.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    if b > 0.0 {
        return None;
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    Some(-b - discriminant.sqrt())
}

/// Distance along a ray to the first intersection with an axis-aligned box (slab test).
#[must_use]
pub fn ray_aabb(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_near = 0.0_f32;
    let mut t_far = f32::INFINITY;
    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        if d.abs() < EPSILON {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let mut t0 = (min[axis] - o) * inv;
        let mut t1 = (max[axis] - o) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_near = t_near.max(t0);
        t_far = t_far.min(t1);
        if t_near > t_far {
            return None;
        }
    }
    Some(t_near)
}

/// Whether a sphere touches an axis-aligned box.
#[must_use]
pub fn sphere_intersects_aabb(center: Vec3, radius: f32, min: Vec3, max: Vec3) -> bool {
    let closest = center.clamp(min, max);
    closest.distance_squared(center) <= radius * radius
}
