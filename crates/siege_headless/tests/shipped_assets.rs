//! The catalog and scenarios under `assets/` load and play.

use std::path::PathBuf;

use siege_headless::catalog_loader::{builtin_catalog, load_catalog};
use siege_headless::random_fill::random_scenario;
use siege_headless::runner::run_scenario;
use siege_headless::scenario::Scenario;

fn assets() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets")
}

fn scenario_files() -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(assets().join("scenarios"))
        .expect("scenario directory")
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|e| e == "ron"))
        .collect();
    files.sort();
    files
}

#[test]
fn test_catalog_file_matches_builtin() {
    let from_disk = load_catalog(assets().join("data/catalog.ron")).unwrap();
    assert_eq!(*from_disk, *builtin_catalog().unwrap());
}

#[test]
fn test_every_scenario_plays_without_refusals() {
    let catalog = builtin_catalog().unwrap();
    let files = scenario_files();
    assert!(!files.is_empty());

    for path in files {
        let scenario = Scenario::load(&path).unwrap();
        let report = run_scenario(&scenario, catalog.clone()).unwrap();
        assert!(
            report.declined.is_empty(),
            "{}: {:?}",
            path.display(),
            report.declined
        );
        assert_eq!(report.units_deployed as usize, scenario.deployments.len());
        assert!(report.ticks <= 1800);
        assert!(report.stars <= 3);
    }
}

#[test]
fn test_every_tier_generates_a_playable_encounter() {
    let catalog = builtin_catalog().unwrap();
    for level in 1..=5 {
        let scenario = random_scenario(catalog.clone(), level, 2024, 50).unwrap();
        let capacity = catalog.tier(level).unwrap().army_capacity;
        let report = run_scenario(&scenario, catalog.clone()).unwrap();
        assert!(report.declined.is_empty(), "tier {level}: {:?}", report.declined);
        assert!(report.units_deployed <= capacity);
        assert!(report.total_structures > 0);
    }
}
