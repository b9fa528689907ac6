//! Test fixtures and helpers.
//!
//! A programmatic stat catalog with round numbers, plus a [`Fixture`]
//! builder that turns a list of structures, roster lines and deployments into
//! a ready [`Simulation`].

use std::collections::BTreeMap;
use std::sync::Arc;

use fixed::types::I32F32;
use siege_core::components::{
    StructureKind, TargetDomain, TargetPreference, TilePos, UnitKind,
};
use siege_core::data::{
    CatalogFile, DefenseStats, StatCatalog, StructureEntry, StructureStats, TierStructure,
    TownHallTier, UnitEntry, UnitStats,
};
use siege_core::encounter::EncounterConfig;
use siege_core::layout::{BaseLayout, LayoutEntry};
use siege_core::roster::{Roster, RosterEntry};
use siege_core::simulation::Simulation;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Shorthand for a tile position.
#[must_use]
pub const fn tile(x: i32, y: i32) -> TilePos {
    TilePos::new(x, y)
}

/// Defensive stats with integer ranges.
#[must_use]
pub fn defense(
    min_range: i32,
    max_range: i32,
    cadence_ms: u32,
    damage_per_hit: u32,
    target_domain: TargetDomain,
) -> DefenseStats {
    DefenseStats {
        min_range: fixed(min_range),
        max_range: fixed(max_range),
        cadence_ms,
        damage_per_hit,
        target_domain,
    }
}

/// Level 1 stats used by the fixture catalog.
#[must_use]
pub fn structure_stats(kind: StructureKind) -> StructureStats {
    let plain = |hitpoints: u32, side: u8| StructureStats {
        hitpoints,
        footprint: (side, side),
        defense: None,
        gold: 0,
        elixir: 0,
    };
    match kind {
        StructureKind::TownHall => StructureStats {
            gold: 500,
            elixir: 500,
            ..plain(1500, 4)
        },
        StructureKind::Wall => plain(300, 1),
        StructureKind::GoldMine => StructureStats {
            gold: 1000,
            ..plain(400, 3)
        },
        StructureKind::ElixirPump => StructureStats {
            elixir: 1000,
            ..plain(400, 3)
        },
        StructureKind::GoldStorage => StructureStats {
            gold: 5000,
            ..plain(800, 3)
        },
        StructureKind::ElixirStorage => StructureStats {
            elixir: 5000,
            ..plain(800, 3)
        },
        StructureKind::Cannon => StructureStats {
            defense: Some(defense(0, 9, 800, 7, TargetDomain::Ground)),
            ..plain(420, 3)
        },
        StructureKind::ArcherTower => StructureStats {
            defense: Some(defense(0, 10, 500, 6, TargetDomain::Both)),
            ..plain(380, 3)
        },
        StructureKind::Mortar => StructureStats {
            defense: Some(defense(4, 11, 5000, 20, TargetDomain::Ground)),
            ..plain(400, 3)
        },
        StructureKind::AirDefense => StructureStats {
            defense: Some(defense(0, 10, 1000, 80, TargetDomain::Air)),
            ..plain(800, 3)
        },
        StructureKind::WizardTower => StructureStats {
            defense: Some(defense(0, 7, 1300, 11, TargetDomain::Both)),
            ..plain(620, 3)
        },
        StructureKind::BuilderHut => plain(250, 2),
        StructureKind::ClanCastle
        | StructureKind::ArmyCamp
        | StructureKind::Barrack
        | StructureKind::Laboratory
        | StructureKind::SpellForge => plain(300, 3),
    }
}

/// Level 1 stats used by the fixture catalog.
#[must_use]
pub fn unit_stats(kind: UnitKind) -> UnitStats {
    let base = UnitStats {
        hitpoints: 45,
        damage_per_hit: 8,
        attack_range: fixed_f(0.4),
        cadence_ms: 1000,
        movement_speed: fixed(2),
        housing_space: 1,
        is_flying: false,
        preference: TargetPreference::Any,
    };
    match kind {
        UnitKind::Barbarian => base,
        UnitKind::Archer => UnitStats {
            hitpoints: 20,
            damage_per_hit: 7,
            attack_range: fixed_f(3.5),
            movement_speed: fixed(3),
            ..base
        },
        UnitKind::Giant => UnitStats {
            hitpoints: 300,
            damage_per_hit: 11,
            attack_range: fixed(1),
            cadence_ms: 2000,
            movement_speed: fixed_f(1.5),
            housing_space: 5,
            preference: TargetPreference::Defensive,
            ..base
        },
        UnitKind::Goblin => UnitStats {
            hitpoints: 25,
            damage_per_hit: 11,
            movement_speed: fixed(4),
            preference: TargetPreference::Resources,
            ..base
        },
        UnitKind::WallBreaker => UnitStats {
            hitpoints: 20,
            damage_per_hit: 120,
            attack_range: fixed(1),
            movement_speed: fixed(3),
            housing_space: 2,
            preference: TargetPreference::Walls,
            ..base
        },
        UnitKind::Balloon => UnitStats {
            hitpoints: 150,
            damage_per_hit: 25,
            attack_range: fixed_f(0.5),
            cadence_ms: 4000,
            movement_speed: fixed_f(1.25),
            housing_space: 5,
            is_flying: true,
            preference: TargetPreference::Defensive,
            ..base
        },
        UnitKind::Wizard => UnitStats {
            hitpoints: 75,
            damage_per_hit: 50,
            attack_range: fixed(3),
            cadence_ms: 1500,
            housing_space: 4,
            ..base
        },
    }
}

/// Town hall tier 1 of the fixture catalog.
#[must_use]
pub fn tier_one() -> TownHallTier {
    let allow = |kind, max_count| TierStructure {
        kind,
        level: 1,
        max_count,
    };
    TownHallTier {
        level: 1,
        army_capacity: 20,
        structures: vec![
            allow(StructureKind::TownHall, 1),
            allow(StructureKind::GoldMine, 2),
            allow(StructureKind::ElixirPump, 2),
            allow(StructureKind::GoldStorage, 1),
            allow(StructureKind::ElixirStorage, 1),
            allow(StructureKind::Cannon, 2),
            allow(StructureKind::ArcherTower, 1),
            allow(StructureKind::Wall, 25),
            allow(StructureKind::ArmyCamp, 1),
            allow(StructureKind::Barrack, 1),
            allow(StructureKind::BuilderHut, 2),
        ],
        units: vec![
            (UnitKind::Barbarian, 1),
            (UnitKind::Archer, 1),
            (UnitKind::Goblin, 1),
        ],
    }
}

/// Builds a one-level catalog where any entry can be overridden.
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    structures: BTreeMap<StructureKind, StructureStats>,
    units: BTreeMap<UnitKind, UnitStats>,
    tiers: Vec<TownHallTier>,
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self {
            structures: StructureKind::ALL
                .iter()
                .map(|&kind| (kind, structure_stats(kind)))
                .collect(),
            units: UnitKind::ALL
                .iter()
                .map(|&kind| (kind, unit_stats(kind)))
                .collect(),
            tiers: vec![tier_one()],
        }
    }
}

impl CatalogBuilder {
    /// Fixture stats for every kind plus tier 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the stats of one structure kind.
    #[must_use]
    pub fn structure(mut self, kind: StructureKind, stats: StructureStats) -> Self {
        self.structures.insert(kind, stats);
        self
    }

    /// Override the stats of one unit kind.
    #[must_use]
    pub fn unit(mut self, kind: UnitKind, stats: UnitStats) -> Self {
        self.units.insert(kind, stats);
        self
    }

    /// Add a tier.
    #[must_use]
    pub fn tier(mut self, tier: TownHallTier) -> Self {
        self.tiers.retain(|t| t.level != tier.level);
        self.tiers.push(tier);
        self
    }

    /// Plain catalog file, for writing to disk or serializing.
    #[must_use]
    pub fn file(&self) -> CatalogFile {
        CatalogFile {
            structures: self
                .structures
                .iter()
                .map(|(&kind, &stats)| StructureEntry {
                    kind,
                    levels: vec![stats],
                })
                .collect(),
            units: self
                .units
                .iter()
                .map(|(&kind, &stats)| UnitEntry {
                    kind,
                    levels: vec![stats],
                })
                .collect(),
            tiers: self.tiers.clone(),
        }
    }

    /// Validate and freeze.
    ///
    /// # Panics
    ///
    /// Panics if an override produced an invalid catalog.
    #[must_use]
    pub fn build(&self) -> Arc<StatCatalog> {
        match StatCatalog::from_file(self.file()) {
            Ok(catalog) => Arc::new(catalog),
            Err(e) => panic!("fixture catalog rejected: {e}"),
        }
    }
}

/// The fixture catalog with no overrides.
#[must_use]
pub fn test_catalog() -> Arc<StatCatalog> {
    CatalogBuilder::new().build()
}

/// Declarative encounter setup.
///
/// ```ignore
/// let mut sim = Fixture::new()
///     .structure(StructureKind::TownHall, 20, 20)
///     .units(UnitKind::Barbarian, 5)
///     .deploy(0, 10, 10)
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct Fixture {
    catalog: CatalogBuilder,
    structures: Vec<LayoutEntry>,
    roster: Vec<RosterEntry>,
    deployments: Vec<(usize, TilePos)>,
    config: EncounterConfig,
}

impl Fixture {
    /// Empty base, empty roster, default timing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the stats of one structure kind.
    #[must_use]
    pub fn with_structure_stats(mut self, kind: StructureKind, stats: StructureStats) -> Self {
        self.catalog = self.catalog.structure(kind, stats);
        self
    }

    /// Override the stats of one unit kind.
    #[must_use]
    pub fn with_unit_stats(mut self, kind: UnitKind, stats: UnitStats) -> Self {
        self.catalog = self.catalog.unit(kind, stats);
        self
    }

    /// Encounter timing.
    #[must_use]
    pub fn config(mut self, config: EncounterConfig) -> Self {
        self.config = config;
        self
    }

    /// Place a level 1 structure.
    #[must_use]
    pub fn structure(mut self, kind: StructureKind, x: i32, y: i32) -> Self {
        self.structures.push(LayoutEntry {
            kind,
            level: 1,
            origin: tile(x, y),
        });
        self
    }

    /// Closed square of walls with corners `min` and `max`.
    #[must_use]
    pub fn wall_ring(mut self, min: i32, max: i32) -> Self {
        for i in min..=max {
            for (x, y) in [(i, min), (i, max), (min, i), (max, i)] {
                let origin = tile(x, y);
                if !self.structures.iter().any(|e| e.origin == origin) {
                    self.structures.push(LayoutEntry {
                        kind: StructureKind::Wall,
                        level: 1,
                        origin,
                    });
                }
            }
        }
        self
    }

    /// Add a roster slot of level 1 units. Slots are numbered in call order.
    #[must_use]
    pub fn units(mut self, kind: UnitKind, count: u32) -> Self {
        self.roster.push(RosterEntry {
            kind,
            level: 1,
            count,
        });
        self
    }

    /// Deploy from `slot` onto a tile right after the encounter starts.
    #[must_use]
    pub fn deploy(mut self, slot: usize, x: i32, y: i32) -> Self {
        self.deployments.push((slot, tile(x, y)));
        self
    }

    /// The catalog this fixture builds against.
    #[must_use]
    pub fn catalog(&self) -> Arc<StatCatalog> {
        self.catalog.build()
    }

    /// Build the layout without starting the encounter.
    ///
    /// # Panics
    ///
    /// Panics if a structure cannot be placed.
    #[must_use]
    pub fn layout(&self) -> BaseLayout {
        let mut layout = BaseLayout::new(self.catalog());
        for entry in &self.structures {
            if let Err(e) = layout.place_structure(entry.kind, entry.level, entry.origin) {
                panic!("fixture placement of {:?} failed: {e}", entry.kind);
            }
        }
        layout
    }

    /// Build the simulation and apply the deployments.
    ///
    /// # Panics
    ///
    /// Panics if placement, roster resolution or a deployment fails.
    #[must_use]
    pub fn build(&self) -> Simulation {
        let layout = self.layout();
        let roster = match Roster::new(layout.catalog(), &self.roster) {
            Ok(roster) => roster,
            Err(e) => panic!("fixture roster rejected: {e}"),
        };
        let mut sim = Simulation::new(layout, roster, self.config);
        for &(slot, tile) in &self.deployments {
            if let Err(e) = sim.deploy_unit(slot, tile) {
                panic!("fixture deployment from slot {slot} to {tile:?} failed: {e}");
            }
        }
        tracing::trace!(
            structures = self.structures.len(),
            deployments = self.deployments.len(),
            "Fixture built"
        );
        sim
    }
}
