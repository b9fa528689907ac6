//! # Siege Core
//!
//! Deterministic combat engine for base-defense sieges.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO beyond parsing catalog text handed to it
//! - No randomness
//! - No floating-point math in combat (uses fixed-point)
//!
//! The same layout, roster and deployment sequence always produce the same
//! tick-by-tick state, which is what replays, batch balancing and
//! determinism tests rely on.
//!
//! ## Crate Structure
//!
//! - [`data`] - Stat catalog and town hall tiers
//! - [`grid`] - Tile occupancy and placement rules
//! - [`layout`] - Pre-encounter base construction
//! - [`roster`] - Deployable units
//! - [`targeting`] - Target selection for units and defenses
//! - [`pathfinding`] - A* routing with wall breaching
//! - [`combat`] - Per-tick combat resolution
//! - [`simulation`] - The encounter clock
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod components;
pub mod data;
pub mod encounter;
pub mod error;
pub mod grid;
pub mod layout;
pub mod math;
pub mod pathfinding;
pub mod registry;
pub mod roster;
pub mod simulation;
pub mod snapshot;
pub mod targeting;

#[cfg(test)]
mod testing;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::combat::{DestroyedStructure, HitEvent, LostUnit, TickEvents};
    pub use crate::components::*;
    pub use crate::data::{
        CatalogFile, DefenseStats, StatCatalog, StructureStats, TownHallTier, UnitStats,
    };
    pub use crate::encounter::{EncounterConfig, EncounterState};
    pub use crate::error::{CatalogError, DeployError, PlacementError, Result, SiegeError};
    pub use crate::grid::{GridWorld, GRID_SIZE};
    pub use crate::layout::{BaseLayout, LayoutEntry};
    pub use crate::math::Fixed;
    pub use crate::registry::{Structure, Unit};
    pub use crate::roster::{Roster, RosterEntry, RosterSlot};
    pub use crate::simulation::{Simulation, TickOutcome};
    pub use crate::snapshot::GridSnapshot;
}
