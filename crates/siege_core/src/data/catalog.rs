//! The validated stat catalog.
//!
//! A [`CatalogFile`] is the on-disk shape: per-kind level lists plus town
//! hall tiers. [`StatCatalog`] flattens it into a table keyed by
//! `(kind, level)` and rejects anything the engine cannot simulate, so a bad
//! catalog fails before any encounter is built.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{StructureStats, UnitStats};
use crate::components::{StructureKind, UnitKind};
use crate::error::CatalogError;
use crate::math::Fixed;

/// Level list for one structure kind. Index 0 is level 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureEntry {
    /// Structure kind.
    pub kind: StructureKind,
    /// Stats per level.
    pub levels: Vec<StructureStats>,
}

/// Level list for one unit kind. Index 0 is level 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitEntry {
    /// Unit kind.
    pub kind: UnitKind,
    /// Stats per level.
    pub levels: Vec<UnitStats>,
}

/// Placement allowance for one structure kind within a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierStructure {
    /// Structure kind.
    pub kind: StructureKind,
    /// Level placed at this tier.
    pub level: u8,
    /// How many may be placed.
    pub max_count: u32,
}

/// What a base at a given command-structure level may contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TownHallTier {
    /// Command structure level.
    pub level: u8,
    /// Total housing space for the attacking roster.
    pub army_capacity: u32,
    /// Placeable structure kinds.
    pub structures: Vec<TierStructure>,
    /// Recruitable unit kinds and their level.
    pub units: Vec<(UnitKind, u8)>,
}

impl TownHallTier {
    /// Count cap for a structure kind. Kinds not listed may not be placed.
    #[must_use]
    pub fn max_count(&self, kind: StructureKind) -> u32 {
        self.structures
            .iter()
            .find(|s| s.kind == kind)
            .map_or(0, |s| s.max_count)
    }

    /// Level at which a structure kind is placed in this tier.
    #[must_use]
    pub fn structure_level(&self, kind: StructureKind) -> Option<u8> {
        self.structures
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.level)
    }

    /// Level at which a unit kind is recruited in this tier.
    #[must_use]
    pub fn unit_level(&self, kind: UnitKind) -> Option<u8> {
        self.units
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, level)| *level)
    }
}

/// On-disk catalog layout.
///
/// # Example RON
///
/// ```ron
/// CatalogFile(
///     structures: [
///         StructureEntry(kind: Wall, levels: [StructureStats(hitpoints: 300, footprint: (1, 1))]),
///     ],
///     units: [],
///     tiers: [],
/// )
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Structure stats.
    pub structures: Vec<StructureEntry>,
    /// Unit stats.
    pub units: Vec<UnitEntry>,
    /// Town hall tiers.
    #[serde(default)]
    pub tiers: Vec<TownHallTier>,
}

/// Immutable `(kind, level)` lookup for structure and unit stats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatCatalog {
    structures: BTreeMap<(StructureKind, u8), StructureStats>,
    units: BTreeMap<(UnitKind, u8), UnitStats>,
    tiers: BTreeMap<u8, TownHallTier>,
}

impl StatCatalog {
    /// Parse catalog RON text and validate it.
    pub fn from_ron_str(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            ron::from_str(text).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::from_file(file)
    }

    /// Flatten and validate an already parsed catalog.
    pub fn from_file(file: CatalogFile) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();

        for entry in file.structures {
            if entry.levels.is_empty() {
                return Err(invalid(format!("{:?}", entry.kind), "no levels"));
            }
            for (index, stats) in entry.levels.into_iter().enumerate() {
                let level = level_number(index)?;
                if catalog
                    .structures
                    .insert((entry.kind, level), stats)
                    .is_some()
                {
                    return Err(invalid(format!("{:?}", entry.kind), "listed twice"));
                }
            }
        }

        for entry in file.units {
            if entry.levels.is_empty() {
                return Err(invalid(format!("{:?}", entry.kind), "no levels"));
            }
            for (index, stats) in entry.levels.into_iter().enumerate() {
                let level = level_number(index)?;
                if catalog.units.insert((entry.kind, level), stats).is_some() {
                    return Err(invalid(format!("{:?}", entry.kind), "listed twice"));
                }
            }
        }

        for tier in file.tiers {
            let level = tier.level;
            if catalog.tiers.insert(level, tier).is_some() {
                return Err(invalid(format!("tier {level}"), "listed twice"));
            }
        }

        catalog.validate()?;
        Ok(catalog)
    }

    /// Check every entry for values the engine cannot simulate.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for (&(kind, level), stats) in &self.structures {
            let name = || format!("{kind:?} level {level}");
            if stats.hitpoints == 0 {
                return Err(invalid(name(), "hitpoints must be positive"));
            }
            let (w, h) = stats.footprint;
            if !(1..=4).contains(&w) || !(1..=4).contains(&h) {
                return Err(invalid(name(), "footprint sides must be 1 to 4 tiles"));
            }
            if let Some(defense) = &stats.defense {
                if defense.cadence_ms == 0 {
                    return Err(invalid(name(), "cadence must be positive"));
                }
                if defense.min_range < Fixed::ZERO || defense.min_range > defense.max_range {
                    return Err(invalid(name(), "range must satisfy 0 <= min <= max"));
                }
            }
        }

        for (&(kind, level), stats) in &self.units {
            let name = || format!("{kind:?} level {level}");
            if stats.hitpoints == 0 {
                return Err(invalid(name(), "hitpoints must be positive"));
            }
            if stats.cadence_ms == 0 {
                return Err(invalid(name(), "cadence must be positive"));
            }
            if stats.attack_range < Fixed::ZERO || stats.movement_speed < Fixed::ZERO {
                return Err(invalid(name(), "range and speed must not be negative"));
            }
            if stats.housing_space == 0 {
                return Err(invalid(name(), "housing space must be positive"));
            }
        }

        for tier in self.tiers.values() {
            for allowance in &tier.structures {
                self.structure_stats(allowance.kind, allowance.level)?;
            }
            for &(kind, level) in &tier.units {
                self.unit_stats(kind, level)?;
            }
        }

        Ok(())
    }

    /// Stats for a structure kind at a level.
    pub fn structure_stats(
        &self,
        kind: StructureKind,
        level: u8,
    ) -> Result<&StructureStats, CatalogError> {
        self.structures
            .get(&(kind, level))
            .ok_or(CatalogError::MissingStructure { kind, level })
    }

    /// Stats for a unit kind at a level.
    pub fn unit_stats(&self, kind: UnitKind, level: u8) -> Result<&UnitStats, CatalogError> {
        self.units
            .get(&(kind, level))
            .ok_or(CatalogError::MissingUnit { kind, level })
    }

    /// Tier for a command-structure level.
    pub fn tier(&self, level: u8) -> Result<&TownHallTier, CatalogError> {
        self.tiers.get(&level).ok_or(CatalogError::MissingTier(level))
    }

    /// All tiers in ascending level order.
    pub fn tiers(&self) -> impl Iterator<Item = &TownHallTier> {
        self.tiers.values()
    }

    /// Highest catalogued level of a structure kind.
    #[must_use]
    pub fn max_structure_level(&self, kind: StructureKind) -> Option<u8> {
        self.structures
            .range((kind, 0)..=(kind, u8::MAX))
            .next_back()
            .map(|(&(_, level), _)| level)
    }

    /// Number of structure and unit entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.structures.len() + self.units.len()
    }

    /// True when nothing is catalogued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.structures.is_empty() && self.units.is_empty()
    }
}

fn level_number(index: usize) -> Result<u8, CatalogError> {
    u8::try_from(index + 1).map_err(|_| invalid("level list".into(), "more than 255 levels"))
}

fn invalid(entry: String, reason: &str) -> CatalogError {
    CatalogError::Invalid {
        entry,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r"
        CatalogFile(
            structures: [
                StructureEntry(kind: Wall, levels: [
                    StructureStats(hitpoints: 300, footprint: (1, 1)),
                    StructureStats(hitpoints: 500, footprint: (1, 1)),
                ]),
                StructureEntry(kind: Cannon, levels: [
                    StructureStats(
                        hitpoints: 420,
                        footprint: (3, 3),
                        defense: Some(DefenseStats(
                            min_range: 0.0,
                            max_range: 9.0,
                            cadence_ms: 800,
                            damage_per_hit: 7,
                            target_domain: Ground,
                        )),
                    ),
                ]),
            ],
            units: [
                UnitEntry(kind: Barbarian, levels: [
                    UnitStats(
                        hitpoints: 45,
                        damage_per_hit: 8,
                        attack_range: 0.4,
                        cadence_ms: 1000,
                        movement_speed: 2.0,
                        housing_space: 1,
                        is_flying: false,
                        preference: Any,
                    ),
                ]),
            ],
            tiers: [
                TownHallTier(
                    level: 1,
                    army_capacity: 20,
                    structures: [TierStructure(kind: Wall, level: 2, max_count: 25)],
                    units: [(Barbarian, 1)],
                ),
            ],
        )
    ";

    #[test]
    fn test_parse_and_lookup() {
        let catalog = StatCatalog::from_ron_str(SMALL).expect("valid catalog");
        assert_eq!(catalog.structure_stats(StructureKind::Wall, 2).unwrap().hitpoints, 500);
        let cannon = catalog.structure_stats(StructureKind::Cannon, 1).unwrap();
        assert!(cannon.is_defensive());
        assert_eq!(cannon.defense.unwrap().max_range, Fixed::from_num(9));
        let barb = catalog.unit_stats(UnitKind::Barbarian, 1).unwrap();
        assert_eq!(barb.attack_range, Fixed::from_num(0.4));
        assert_eq!(catalog.max_structure_level(StructureKind::Wall), Some(2));
        assert_eq!(catalog.tier(1).unwrap().max_count(StructureKind::Wall), 25);
        assert_eq!(catalog.tier(1).unwrap().max_count(StructureKind::Cannon), 0);
    }

    #[test]
    fn test_missing_entry_is_reported() {
        let catalog = StatCatalog::from_ron_str(SMALL).unwrap();
        assert_eq!(
            catalog.structure_stats(StructureKind::Cannon, 3),
            Err(CatalogError::MissingStructure {
                kind: StructureKind::Cannon,
                level: 3
            })
        );
        assert!(matches!(
            catalog.unit_stats(UnitKind::Giant, 1),
            Err(CatalogError::MissingUnit { .. })
        ));
        assert_eq!(catalog.tier(9), Err(CatalogError::MissingTier(9)));
    }

    #[test]
    fn test_tier_with_dangling_reference_is_rejected() {
        let text = SMALL.replace("kind: Wall, level: 2", "kind: Wall, level: 7");
        assert!(matches!(
            StatCatalog::from_ron_str(&text),
            Err(CatalogError::MissingStructure { .. })
        ));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let text = SMALL.replace("min_range: 0.0", "min_range: 12.0");
        assert!(matches!(
            StatCatalog::from_ron_str(&text),
            Err(CatalogError::Invalid { .. })
        ));
    }

    #[test]
    fn test_zero_hitpoints_rejected() {
        let text = SMALL.replace("hitpoints: 300", "hitpoints: 0");
        assert!(matches!(
            StatCatalog::from_ron_str(&text),
            Err(CatalogError::Invalid { .. })
        ));
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        assert!(matches!(
            StatCatalog::from_ron_str("not a catalog"),
            Err(CatalogError::Parse(_))
        ));
    }
}
