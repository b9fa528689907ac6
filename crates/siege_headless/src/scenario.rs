//! Scenario loading and configuration.
//!
//! A scenario is a complete, reproducible encounter: the defending base, the
//! attacking roster and a deployment plan keyed by tick.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use siege_core::components::TilePos;
use siege_core::data::StatCatalog;
use siege_core::encounter::EncounterConfig;
use siege_core::error::{CatalogError, PlacementError};
use siege_core::layout::{BaseLayout, LayoutEntry};
use siege_core::roster::{Roster, RosterEntry};
use siege_core::simulation::Simulation;
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Roster or tier lookup failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// A layout entry could not be placed.
    #[error("Layout entry {index} refused: {source}")]
    Placement {
        /// Position in the layout list.
        index: usize,
        /// Why it was refused.
        source: PlacementError,
    },
}

/// One planned deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledDeploy {
    /// Tick at which to deploy, before that tick is stepped.
    pub tick: u64,
    /// Roster slot.
    pub slot: usize,
    /// Landing tile.
    pub tile: TilePos,
}

/// A complete encounter description.
///
/// # Example RON
///
/// ```ron
/// Scenario(
///     name: "Single cannon",
///     town_hall_level: Some(1),
///     layout: [LayoutEntry(kind: Cannon, level: 1, origin: (x: 20, y: 20))],
///     roster: [RosterEntry(kind: Barbarian, level: 1, count: 5)],
///     deployments: [ScheduledDeploy(tick: 0, slot: 0, tile: (x: 1, y: 1))],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Tier for count caps and army capacity. `None` disables both checks.
    #[serde(default)]
    pub town_hall_level: Option<u8>,
    /// Encounter timing.
    #[serde(default)]
    pub config: EncounterConfig,
    /// Defending base.
    pub layout: Vec<LayoutEntry>,
    /// Attacking units.
    pub roster: Vec<RosterEntry>,
    /// Deployment plan. Entries need not be sorted.
    #[serde(default)]
    pub deployments: Vec<ScheduledDeploy>,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        Ok(ron::from_str(ron)?)
    }

    /// Save as pretty RON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ScenarioError> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Build the base this scenario describes.
    pub fn build_layout(&self, catalog: Arc<StatCatalog>) -> Result<BaseLayout, ScenarioError> {
        let mut layout = match self.town_hall_level {
            Some(level) => BaseLayout::for_town_hall(catalog, level)?,
            None => BaseLayout::new(catalog),
        };
        for (index, entry) in self.layout.iter().enumerate() {
            layout
                .place_structure(entry.kind, entry.level, entry.origin)
                .map_err(|source| ScenarioError::Placement { index, source })?;
        }
        Ok(layout)
    }

    /// Resolve the roster, checking army capacity when a tier is set.
    pub fn build_roster(&self, catalog: &StatCatalog) -> Result<Roster, ScenarioError> {
        let roster = match self.town_hall_level {
            Some(level) => Roster::for_town_hall(catalog, level, &self.roster)?,
            None => Roster::new(catalog, &self.roster)?,
        };
        Ok(roster)
    }

    /// Start the encounter. No deployments are applied.
    pub fn build(&self, catalog: Arc<StatCatalog>) -> Result<Simulation, ScenarioError> {
        let roster = self.build_roster(&catalog)?;
        let layout = self.build_layout(catalog)?;
        Ok(Simulation::new(layout, roster, self.config))
    }

    /// Deployments sorted by tick, keeping file order within a tick.
    #[must_use]
    pub fn deployment_plan(&self) -> Vec<ScheduledDeploy> {
        let mut plan = self.deployments.clone();
        plan.sort_by_key(|d| d.tick);
        plan
    }
}

#[cfg(test)]
mod tests {
    use siege_core::components::{StructureKind, UnitKind};
    use siege_test_utils::fixtures::test_catalog;

    use super::*;

    const SCENARIO: &str = r#"
Scenario(
    name: "Two cannons",
    layout: [
        LayoutEntry(kind: TownHall, level: 1, origin: (x: 20, y: 20)),
        LayoutEntry(kind: Cannon, level: 1, origin: (x: 14, y: 14)),
        LayoutEntry(kind: Cannon, level: 1, origin: (x: 26, y: 26)),
    ],
    roster: [RosterEntry(kind: Barbarian, level: 1, count: 4)],
    deployments: [
        ScheduledDeploy(tick: 5, slot: 0, tile: (x: 0, y: 0)),
        ScheduledDeploy(tick: 0, slot: 0, tile: (x: 1, y: 0)),
    ],
)
"#;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::from_ron_str(SCENARIO).unwrap();
        assert_eq!(scenario.name, "Two cannons");
        assert_eq!(scenario.config, EncounterConfig::default());
        assert_eq!(scenario.layout.len(), 3);
        assert_eq!(scenario.town_hall_level, None);
    }

    #[test]
    fn test_plan_is_sorted_by_tick() {
        let scenario = Scenario::from_ron_str(SCENARIO).unwrap();
        let ticks: Vec<u64> = scenario.deployment_plan().iter().map(|d| d.tick).collect();
        assert_eq!(ticks, vec![0, 5]);
    }

    #[test]
    fn test_build_places_every_entry() {
        let scenario = Scenario::from_ron_str(SCENARIO).unwrap();
        let sim = scenario.build(test_catalog()).unwrap();
        assert_eq!(sim.structures().count(), 3);
        assert_eq!(
            sim.structures().filter(|s| s.kind == StructureKind::Cannon).count(),
            2
        );
        assert_eq!(sim.roster().remaining(), 4);
    }

    #[test]
    fn test_overlapping_entry_is_reported() {
        let mut scenario = Scenario::from_ron_str(SCENARIO).unwrap();
        scenario.layout.push(LayoutEntry {
            kind: StructureKind::Wall,
            level: 1,
            origin: TilePos::new(21, 21),
        });
        let err = scenario.build(test_catalog()).unwrap_err();
        assert!(matches!(err, ScenarioError::Placement { index: 3, .. }));
    }

    #[test]
    fn test_army_capacity_is_enforced() {
        let mut scenario = Scenario::from_ron_str(SCENARIO).unwrap();
        scenario.town_hall_level = Some(1);
        scenario.roster = vec![RosterEntry {
            kind: UnitKind::Giant,
            level: 1,
            count: 5,
        }];
        let err = scenario.build_roster(&test_catalog()).unwrap_err();
        assert!(matches!(
            err,
            ScenarioError::Catalog(CatalogError::HousingExceeded { required: 25, capacity: 20 })
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.ron");
        let scenario = Scenario::from_ron_str(SCENARIO).unwrap();
        scenario.save(&path).unwrap();
        assert_eq!(Scenario::load(&path).unwrap(), scenario);
    }

    #[test]
    fn test_missing_file() {
        let err = Scenario::load("/definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }
}
