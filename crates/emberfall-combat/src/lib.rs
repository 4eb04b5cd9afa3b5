//! # Emberfall Combat
//!
//! Combat core for Emberfall.
//!
//! This crate provides the engine-independent gameplay layer:
//! - Stats with timed, source-attributed modifiers
//! - Damage calculation with armor, fire bonus and critical hits
//! - Status effects
//! - Composable spell effects and projectile simulation
//! - Enemy AI (perception, patrol, aggro, search, attack behaviors)
//! - Combat events with independent subscribers
//! - Content loading from RON and read-only diagnostics
//!
//! The host owns physics, navigation and presentation and exposes them through
//! the capability traits in [`world`]. Everything advances through explicit
//! `step` calls.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod ai;
pub mod combatant;
pub mod config;
pub mod content;
pub mod damage;
pub mod effects;
pub mod events;
pub mod inspect;
pub mod perception;
pub mod projectile;
pub mod scheduler;
pub mod spell;
pub mod stats;
pub mod status;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::ai::*;
    pub use crate::combatant::*;
    pub use crate::config::*;
    pub use crate::content::*;
    pub use crate::damage::*;
    pub use crate::effects::*;
    pub use crate::events::*;
    pub use crate::inspect::*;
    pub use crate::perception::*;
    pub use crate::projectile::*;
    pub use crate::scheduler::*;
    pub use crate::spell::*;
    pub use crate::stats::*;
    pub use crate::status::*;
    pub use crate::world::*;
}

pub use prelude::*;
