//! # Emberfall Sim
//!
//! Headless arena host for the Emberfall combat core.
//!
//! This crate provides:
//! - An arena world implementing every capability the combat core consumes
//! - A scripted player and enemy spawning from content archetypes
//! - A fixed-timestep run loop with a JSON run summary
//! - TOML scenario configuration

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod arena;
pub mod config;
pub mod player;
pub mod timing;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::arena::*;
    pub use crate::config::*;
    pub use crate::player::*;
    pub use crate::timing::*;
    pub use crate::world::*;
}

pub use prelude::*;
