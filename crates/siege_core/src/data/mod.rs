//! Stat catalog data structures.
//!
//! Pure data: per-(kind, level) stats, town hall tiers and the validated
//! [`StatCatalog`] lookup built from them. Everything deserializes from RON.
//!
//! **Note:** This module contains no IO. Reading catalog files from disk is
//! handled by `siege_headless`.

mod catalog;
mod structure_data;
mod unit_data;

pub use catalog::{CatalogFile, StatCatalog, StructureEntry, TierStructure, TownHallTier, UnitEntry};
pub use structure_data::{DefenseStats, StructureStats};
pub use unit_data::UnitStats;
