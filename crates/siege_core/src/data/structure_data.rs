//! Per-level structure stats.

use serde::{Deserialize, Serialize};

use crate::components::TargetDomain;
use crate::math::{fixed_decimal, Fixed};

/// Offensive stats of a defensive structure.
///
/// # Example RON
///
/// ```ron
/// DefenseStats(
///     min_range: 4.0,
///     max_range: 11.0,
///     cadence_ms: 5000,
///     damage_per_hit: 20,
///     target_domain: Ground,
/// )
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefenseStats {
    /// Inner edge of the firing ring, in tiles from the footprint centre.
    #[serde(with = "fixed_decimal")]
    pub min_range: Fixed,
    /// Outer edge of the firing ring, in tiles from the footprint centre.
    #[serde(with = "fixed_decimal")]
    pub max_range: Fixed,
    /// Milliseconds between shots.
    pub cadence_ms: u32,
    /// Hitpoints removed per shot.
    pub damage_per_hit: u32,
    /// Units this structure can shoot at.
    pub target_domain: TargetDomain,
}

/// Stats of one structure kind at one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructureStats {
    /// Maximum hitpoints.
    pub hitpoints: u32,
    /// Footprint size as (width, height) in tiles.
    pub footprint: (u8, u8),
    /// Present only for defensive structures.
    #[serde(default)]
    pub defense: Option<DefenseStats>,
    /// Gold available to raiders.
    #[serde(default)]
    pub gold: u32,
    /// Elixir available to raiders.
    #[serde(default)]
    pub elixir: u32,
}

impl StructureStats {
    /// Whether this structure fires at units.
    #[must_use]
    pub const fn is_defensive(&self) -> bool {
        self.defense.is_some()
    }

    /// Whether this structure holds any loot.
    #[must_use]
    pub const fn is_resource(&self) -> bool {
        self.gold > 0 || self.elixir > 0
    }
}
