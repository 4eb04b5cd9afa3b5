//! ID types for actors, modifier sources and content.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for entity IDs.
static ENTITY_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Global counter for anonymous modifier sources.
static SOURCE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an actor or collider in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new unique entity ID.
    #[must_use]
    pub fn new() -> Self {
        Self(ENTITY_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates an entity ID from a raw value (for deserialization).
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Null/invalid entity ID.
    pub const NULL: Self = Self(0);

    /// Checks if this is a valid (non-null) entity ID.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a status effect definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusId(u32);

impl StatusId {
    /// Creates a status ID from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Opaque identity of whoever applied a stat modifier.
///
/// Modifiers are revoked by source, so a status effect can retract exactly
/// the modifiers it added and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceId {
    /// Applied by an actor (damage and healing bookkeeping).
    Entity(EntityId),
    /// Applied by a status effect definition.
    Status(StatusId),
    /// Applied by a piece of equipment.
    Equipment(u32),
    /// Anonymous source minted at runtime.
    Anonymous(u64),
}

impl SourceId {
    /// Mints a fresh anonymous source that matches nothing else.
    #[must_use]
    pub fn unique() -> Self {
        Self::Anonymous(SOURCE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl From<EntityId> for SourceId {
    fn from(id: EntityId) -> Self {
        Self::Entity(id)
    }
}

impl From<StatusId> for SourceId {
    fn from(id: StatusId) -> Self {
        Self::Status(id)
    }
}
