//! Per-level unit stats.

use serde::{Deserialize, Serialize};

use crate::components::TargetPreference;
use crate::math::{fixed_decimal, Fixed};

/// Stats of one unit kind at one level.
///
/// # Example RON
///
/// ```ron
/// UnitStats(
///     hitpoints: 45,
///     damage_per_hit: 8,
///     attack_range: 0.4,
///     cadence_ms: 1000,
///     movement_speed: 2.0,
///     housing_space: 1,
///     is_flying: false,
///     preference: Any,
/// )
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitStats {
    /// Maximum hitpoints.
    pub hitpoints: u32,
    /// Hitpoints removed per hit.
    pub damage_per_hit: u32,
    /// Attack range in tiles.
    #[serde(with = "fixed_decimal")]
    pub attack_range: Fixed,
    /// Milliseconds between hits.
    pub cadence_ms: u32,
    /// Tiles per second.
    #[serde(with = "fixed_decimal")]
    pub movement_speed: Fixed,
    /// Army camp space this unit takes.
    pub housing_space: u32,
    /// Flying units ignore walls and can only be hit by air-capable defenses.
    pub is_flying: bool,
    /// Structure preference class.
    pub preference: TargetPreference,
}
