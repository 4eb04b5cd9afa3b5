//! # Emberfall Common
//!
//! Common types, utilities, and shared abstractions for Emberfall.
//!
//! This crate provides foundational types used across all Emberfall crates:
//! - ID types (EntityId, SourceId, StatusId)
//! - Collision tags, layer masks and query results
//! - Geometry helpers for a Y-up world
//! - Version information for content schemas
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod collision;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::collision::*;
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;
