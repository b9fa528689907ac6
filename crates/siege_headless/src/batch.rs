//! Batch encounter runner for balance testing.
//!
//! Runs many seeded random encounters in parallel using rayon. Each
//! encounter is an independent [`Simulation`](siege_core::simulation::Simulation)
//! owned by a single worker, so results do not depend on scheduling.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use siege_core::data::StatCatalog;
use tracing::{info, warn};

use crate::metrics::{BatchSummary, EncounterReport};
use crate::random_fill::random_scenario;
use crate::runner::play_plan;
use crate::scenario::ScenarioError;

/// Configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Town hall tier of every generated base and roster.
    pub town_hall_level: u8,
    /// Number of encounters.
    pub count: u32,
    /// Seed of the first encounter; the rest follow consecutively.
    pub seed_start: u64,
    /// Deployments are spread over ticks `0..deploy_window`.
    pub deploy_window: u64,
    /// Worker threads (0 = rayon default).
    pub parallel: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            town_hall_level: 1,
            count: 100,
            seed_start: 0,
            deploy_window: 100,
            parallel: 0,
        }
    }
}

/// Error during one encounter of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used.
    pub config: BatchConfig,
    /// Per-encounter reports in seed order.
    pub reports: Vec<EncounterReport>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Encounters that could not be built.
    pub errors: Vec<BatchError>,
    /// Wall clock runtime.
    pub duration_seconds: f64,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Play one seeded random encounter to the end.
pub fn run_seed(
    catalog: &Arc<StatCatalog>,
    town_hall_level: u8,
    seed: u64,
    deploy_window: u64,
) -> Result<EncounterReport, ScenarioError> {
    let scenario = random_scenario(catalog.clone(), town_hall_level, seed, deploy_window)?;
    let mut sim = scenario.build(catalog.clone())?;
    let declined = play_plan(&mut sim, &scenario.deployments);
    Ok(EncounterReport::from_simulation(
        scenario.name,
        Some(seed),
        &sim,
        declined,
    ))
}

/// Run a batch of encounters.
pub fn run_batch(config: BatchConfig, catalog: &Arc<StatCatalog>) -> BatchResults {
    let start = Instant::now();
    info!(
        count = config.count,
        town_hall_level = config.town_hall_level,
        seed_start = config.seed_start,
        "Starting batch"
    );

    let seeds: Vec<u64> = (0..u64::from(config.count))
        .map(|i| config.seed_start.wrapping_add(i))
        .collect();
    let run = || {
        seeds
            .par_iter()
            .map(|&seed| {
                run_seed(catalog, config.town_hall_level, seed, config.deploy_window)
                    .map_err(|e| BatchError {
                        seed,
                        message: e.to_string(),
                    })
            })
            .collect::<Vec<_>>()
    };
    let outcomes = if config.parallel > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel)
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(e) => {
                warn!(error = %e, "Thread pool unavailable, using the global pool");
                run()
            }
        }
    } else {
        run()
    };

    let mut reports = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(report) => reports.push(report),
            Err(e) => {
                warn!(seed = e.seed, error = %e.message, "Encounter failed");
                errors.push(e);
            }
        }
    }

    let summary = BatchSummary::from_reports(&reports);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        completed = reports.len(),
        failed = errors.len(),
        mean_stars = summary.mean_stars,
        duration_seconds,
        "Batch finished"
    );

    BatchResults {
        config,
        reports,
        summary,
        errors,
        duration_seconds,
    }
}

/// Result of replaying one seed several times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Seed replayed.
    pub seed: u64,
    /// Final state hash of every run.
    pub hashes: Vec<u64>,
    /// Whether every run ended in the same state.
    pub deterministic: bool,
}

/// Replay one seed `runs` times in parallel and compare final state hashes.
pub fn verify_determinism(
    catalog: &Arc<StatCatalog>,
    town_hall_level: u8,
    seed: u64,
    runs: u32,
    deploy_window: u64,
) -> Result<VerifyReport, ScenarioError> {
    let hashes = (0..runs.max(1))
        .into_par_iter()
        .map(|_| {
            run_seed(catalog, town_hall_level, seed, deploy_window).map(|r| r.final_state_hash)
        })
        .collect::<Result<Vec<u64>, ScenarioError>>()?;
    let deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !deterministic {
        warn!(seed, ?hashes, "Determinism check failed");
    }
    Ok(VerifyReport {
        seed,
        hashes,
        deterministic,
    })
}

#[cfg(test)]
mod tests {
    use siege_test_utils::fixtures::test_catalog;

    use super::*;

    fn small(count: u32) -> BatchConfig {
        BatchConfig {
            count,
            seed_start: 11,
            deploy_window: 20,
            ..Default::default()
        }
    }

    #[test]
    fn test_batch_reports_every_seed_in_order() {
        let results = run_batch(small(6), &test_catalog());
        assert!(results.errors.is_empty());
        let seeds: Vec<Option<u64>> = results.reports.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, (11..17).map(Some).collect::<Vec<_>>());
        assert_eq!(results.summary.encounters, 6);
        for report in &results.reports {
            assert!(report.stars <= 3);
            assert!(report.ticks <= 1800);
        }
    }

    #[test]
    fn test_batch_is_independent_of_thread_count() {
        let catalog = test_catalog();
        let serial = run_batch(BatchConfig { parallel: 1, ..small(4) }, &catalog);
        let parallel = run_batch(BatchConfig { parallel: 4, ..small(4) }, &catalog);
        assert_eq!(serial.reports, parallel.reports);
    }

    #[test]
    fn test_unknown_tier_is_reported_per_seed() {
        let config = BatchConfig {
            town_hall_level: 9,
            ..small(2)
        };
        let results = run_batch(config, &test_catalog());
        assert!(results.reports.is_empty());
        assert_eq!(results.errors.len(), 2);
    }

    #[test]
    fn test_verify_determinism() {
        let report = verify_determinism(&test_catalog(), 1, 5, 3, 20).unwrap();
        assert!(report.deterministic);
        assert_eq!(report.hashes.len(), 3);
    }

    #[test]
    fn test_results_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("batch.json");
        let results = run_batch(small(2), &test_catalog());
        results.save(&path).unwrap();
        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.config, results.config);
        let hashes = |r: &BatchResults| -> Vec<u64> {
            r.reports.iter().map(|e| e.final_state_hash).collect()
        };
        assert_eq!(hashes(&loaded), hashes(&results));
    }
}
