//! Encounter reports and batch aggregates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use siege_core::components::TilePos;
use siege_core::error::DeployError;
use siege_core::simulation::Simulation;

/// A scheduled deployment the engine refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclinedDeploy {
    /// Tick the deployment was attempted at.
    pub tick: u64,
    /// Roster slot.
    pub slot: usize,
    /// Requested tile.
    pub tile: TilePos,
    /// Stable reason code.
    pub reason: String,
}

impl DeclinedDeploy {
    /// Record a refusal.
    #[must_use]
    pub fn new(tick: u64, slot: usize, tile: TilePos, error: &DeployError) -> Self {
        Self {
            tick,
            slot,
            tile,
            reason: error.reason_code().to_string(),
        }
    }
}

/// Final result of one encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterReport {
    /// Scenario name.
    pub name: String,
    /// Seed the encounter was generated from, if any.
    pub seed: Option<u64>,
    /// Ticks elapsed.
    pub ticks: u64,
    /// Stars earned.
    pub stars: u8,
    /// Destruction percentage.
    pub destruction_percentage: f64,
    /// Non-wall structures destroyed.
    pub destroyed_count: u32,
    /// Non-wall structures at start.
    pub total_structures: u32,
    /// Walls destroyed.
    pub walls_destroyed: u32,
    /// Gold looted.
    pub gold_looted: u64,
    /// Elixir looted.
    pub elixir_looted: u64,
    /// Units deployed.
    pub units_deployed: u32,
    /// Units lost.
    pub units_lost: u32,
    /// Refused deployments.
    pub declined: Vec<DeclinedDeploy>,
    /// Final state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl EncounterReport {
    /// Summarize a simulation.
    #[must_use]
    pub fn from_simulation(
        name: impl Into<String>,
        seed: Option<u64>,
        sim: &Simulation,
        declined: Vec<DeclinedDeploy>,
    ) -> Self {
        let encounter = sim.encounter();
        Self {
            name: name.into(),
            seed,
            ticks: encounter.tick(),
            stars: encounter.stars(),
            destruction_percentage: encounter.destruction_percentage(),
            destroyed_count: encounter.destroyed_count(),
            total_structures: encounter.total_structures(),
            walls_destroyed: encounter.walls_destroyed(),
            gold_looted: encounter.gold_looted(),
            elixir_looted: encounter.elixir_looted(),
            units_deployed: encounter.units_deployed(),
            units_lost: encounter.units_lost(),
            declined,
            final_state_hash: sim.state_hash(),
        }
    }
}

/// Aggregate over a batch of encounters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Encounters summarized.
    pub encounters: u32,
    /// Encounters per star count, keyed 0 to 3.
    pub star_counts: BTreeMap<u8, u32>,
    /// Mean stars.
    pub mean_stars: f64,
    /// Mean destruction percentage.
    pub mean_destruction: f64,
    /// Mean ticks to the end.
    pub mean_ticks: f64,
    /// Mean gold looted.
    pub mean_gold: f64,
    /// Mean elixir looted.
    pub mean_elixir: f64,
    /// Fraction of deployed units lost.
    pub loss_rate: f64,
    /// Refused deployments across the batch.
    pub declined: u32,
}

impl BatchSummary {
    /// Aggregate reports.
    #[must_use]
    pub fn from_reports(reports: &[EncounterReport]) -> Self {
        if reports.is_empty() {
            return Self::default();
        }
        let n = reports.len() as f64;
        let mean = |f: fn(&EncounterReport) -> f64| reports.iter().map(f).sum::<f64>() / n;

        let mut star_counts = BTreeMap::new();
        for report in reports {
            *star_counts.entry(report.stars).or_insert(0) += 1;
        }
        let deployed: u64 = reports.iter().map(|r| u64::from(r.units_deployed)).sum();
        let lost: u64 = reports.iter().map(|r| u64::from(r.units_lost)).sum();

        Self {
            encounters: reports.len() as u32,
            star_counts,
            mean_stars: mean(|r| f64::from(r.stars)),
            mean_destruction: mean(|r| r.destruction_percentage),
            mean_ticks: mean(|r| r.ticks as f64),
            mean_gold: mean(|r| r.gold_looted as f64),
            mean_elixir: mean(|r| r.elixir_looted as f64),
            loss_rate: if deployed == 0 {
                0.0
            } else {
                lost as f64 / deployed as f64
            },
            declined: reports.iter().map(|r| r.declined.len() as u32).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(stars: u8, destruction: f64, deployed: u32, lost: u32) -> EncounterReport {
        EncounterReport {
            name: "test".into(),
            seed: None,
            ticks: 100,
            stars,
            destruction_percentage: destruction,
            destroyed_count: 0,
            total_structures: 10,
            walls_destroyed: 0,
            gold_looted: 200,
            elixir_looted: 0,
            units_deployed: deployed,
            units_lost: lost,
            declined: Vec::new(),
            final_state_hash: 0,
        }
    }

    #[test]
    fn test_empty_summary() {
        let summary = BatchSummary::from_reports(&[]);
        assert_eq!(summary.encounters, 0);
        assert!(summary.star_counts.is_empty());
    }

    #[test]
    fn test_summary_means() {
        let summary = BatchSummary::from_reports(&[report(1, 40.0, 10, 10), report(3, 100.0, 10, 0)]);
        assert_eq!(summary.encounters, 2);
        assert!((summary.mean_stars - 2.0).abs() < f64::EPSILON);
        assert!((summary.mean_destruction - 70.0).abs() < f64::EPSILON);
        assert!((summary.loss_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(summary.star_counts.get(&1), Some(&1));
        assert_eq!(summary.star_counts.get(&3), Some(&1));
    }
}
