//! Collision tags, layer masks and query results shared by hosts and the core.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::EntityId;

/// Gameplay tag carried by every collider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// The player body and its children.
    Player,
    /// Hostile actors.
    Enemy,
    /// Static level geometry.
    World,
    /// In-flight projectiles.
    Projectile,
}

impl Tag {
    /// Every tag.
    pub const ALL: [Self; 4] = [Self::Player, Self::Enemy, Self::World, Self::Projectile];

    /// Bit used for this tag inside a [`LayerMask`].
    #[must_use]
    pub const fn bit(self) -> u32 {
        match self {
            Self::Player => 1,
            Self::Enemy => 1 << 1,
            Self::World => 1 << 2,
            Self::Projectile => 1 << 3,
        }
    }
}

/// Set of tags a query is allowed to hit.
///
/// Serialized as the list of tags it matches, e.g. `[Player, World]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Tag>", into = "Vec<Tag>")]
pub struct LayerMask(u32);

impl LayerMask {
    /// Matches every tag.
    pub const ALL: Self = Self(u32::MAX);
    /// Matches nothing.
    pub const NONE: Self = Self(0);

    /// Creates a mask from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Creates a mask matching the given tags.
    #[must_use]
    pub fn of(tags: &[Tag]) -> Self {
        Self(tags.iter().fold(0, |bits, tag| bits | tag.bit()))
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns a mask that additionally matches `tag`.
    #[must_use]
    pub const fn with(self, tag: Tag) -> Self {
        Self(self.0 | tag.bit())
    }

    /// Checks whether `tag` passes this mask.
    #[must_use]
    pub const fn contains(self, tag: Tag) -> bool {
        self.0 & tag.bit() != 0
    }
}

impl From<Vec<Tag>> for LayerMask {
    fn from(tags: Vec<Tag>) -> Self {
        Self::of(&tags)
    }
}

impl From<LayerMask> for Vec<Tag> {
    fn from(mask: LayerMask) -> Self {
        Tag::ALL.into_iter().filter(|tag| mask.contains(*tag)).collect()
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// A collider reported by a world query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Collider {
    /// Owning entity.
    pub entity: EntityId,
    /// Tag of the collider.
    pub tag: Tag,
}

impl Collider {
    /// Creates a collider handle.
    #[must_use]
    pub const fn new(entity: EntityId, tag: Tag) -> Self {
        Self { entity, tag }
    }
}

/// Result of a raycast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// World-space impact point.
    pub point: Vec3,
    /// Distance from the ray origin.
    pub distance: f32,
    /// What was struck.
    pub collider: Collider,
}
