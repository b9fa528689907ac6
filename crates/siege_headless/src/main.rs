//! Headless siege runner.
//!
//! # Usage
//!
//! ```bash
//! # Drive an encounter over stdin/stdout
//! cargo run -p siege_headless -- play --scenario assets/scenarios/walled_core.ron
//!
//! # Play a scenario's deployment plan and print the outcome
//! cargo run -p siege_headless -- run --scenario assets/scenarios/walled_core.ron
//!
//! # Run seeded random encounters for balance testing
//! cargo run -p siege_headless -- batch --count 1000 --town-hall 3 --output results/
//!
//! # Check that a seed replays identically
//! cargo run -p siege_headless -- verify --seed 12345 --runs 5
//!
//! # Validate a catalog file
//! cargo run -p siege_headless -- validate assets/data/catalog.ron
//! ```
//!
//! Logs go to stderr; stdout carries only JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use siege_core::data::StatCatalog;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use siege_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    catalog_loader::{load_catalog, resolve_catalog},
    random_fill::random_scenario,
    runner::{run_scenario, HeadlessRunner},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "siege_headless")]
#[command(about = "Headless siege runner for policy training and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Stat catalog file (defaults to $SIEGE_CATALOG, then assets/data/catalog.ron)
    #[arg(short, long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario's deployment plan and print the outcome
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,
    },

    /// Drive one encounter with JSON commands on stdin
    Play {
        /// Scenario file to load (its deployment plan is ignored)
        #[arg(short, long, conflicts_with = "seed")]
        scenario: Option<PathBuf>,

        /// Generate a random base and roster from this seed instead
        #[arg(long)]
        seed: Option<u64>,

        /// Town hall tier for generated encounters
        #[arg(short, long, default_value = "1")]
        town_hall: u8,
    },

    /// Run seeded random encounters in parallel
    Batch {
        /// Number of encounters to run
        #[arg(short = 'n', long, default_value = "100")]
        count: u32,

        /// Town hall tier of every base and roster
        #[arg(short, long, default_value = "1")]
        town_hall: u8,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Spread deployments over this many ticks
        #[arg(long, default_value = "100")]
        deploy_window: u64,

        /// Worker threads (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: usize,

        /// Write full results here instead of only printing the summary
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Town hall tier
        #[arg(short, long, default_value = "1")]
        town_hall: u8,

        /// Spread deployments over this many ticks
        #[arg(long, default_value = "100")]
        deploy_window: u64,
    },

    /// Load and validate a catalog file
    Validate {
        /// Catalog file to check
        path: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let catalog_path = cli.catalog.as_deref();
    match cli.command {
        Some(Commands::Run { scenario }) => cmd_run(catalog_path, &scenario),
        Some(Commands::Play {
            scenario,
            seed,
            town_hall,
        }) => cmd_play(catalog_path, scenario.as_deref(), seed, town_hall),
        Some(Commands::Batch {
            count,
            town_hall,
            seed,
            deploy_window,
            parallel,
            output,
        }) => {
            let config = BatchConfig {
                town_hall_level: town_hall,
                count,
                seed_start: seed,
                deploy_window,
                parallel,
            };
            cmd_batch(catalog_path, config, output.as_deref());
        }
        Some(Commands::Verify {
            seed,
            runs,
            town_hall,
            deploy_window,
        }) => cmd_verify(catalog_path, seed, runs, town_hall, deploy_window),
        Some(Commands::Validate { path }) => cmd_validate(&path),
        None => {
            // Default: interactive mode on a random tier 1 encounter
            cmd_play(catalog_path, None, None, 1);
        }
    }
}

fn fail(context: &str, error: impl std::fmt::Display) -> ! {
    tracing::error!(error = %error, "{context}");
    eprintln!("FATAL: {context}: {error}");
    std::process::exit(1);
}

fn catalog_or_exit(path: Option<&Path>) -> Arc<StatCatalog> {
    resolve_catalog(path).unwrap_or_else(|e| fail("Failed to load catalog", e))
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => fail("Failed to serialize output", e),
    }
}

/// Play a scenario file to the end
fn cmd_run(catalog_path: Option<&Path>, path: &Path) {
    let catalog = catalog_or_exit(catalog_path);
    let scenario = Scenario::load(path).unwrap_or_else(|e| fail("Failed to load scenario", e));
    tracing::info!(scenario = %scenario.name, "Running scenario");

    let report = run_scenario(&scenario, catalog).unwrap_or_else(|e| fail("Scenario failed", e));
    print_json(&report);
}

/// Interactive JSON-lines session
fn cmd_play(catalog_path: Option<&Path>, scenario: Option<&Path>, seed: Option<u64>, town_hall: u8) {
    let catalog = catalog_or_exit(catalog_path);
    let scenario = match scenario {
        Some(path) => Scenario::load(path).unwrap_or_else(|e| fail("Failed to load scenario", e)),
        None => random_scenario(catalog.clone(), town_hall, seed.unwrap_or(0), 0)
            .unwrap_or_else(|e| fail("Failed to generate encounter", e)),
    };
    tracing::info!(scenario = %scenario.name, "Starting interactive session");

    let mut runner = HeadlessRunner::from_scenario(&scenario, catalog)
        .unwrap_or_else(|e| fail("Failed to build encounter", e));
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    if let Err(e) = runner.run(stdin.lock(), stdout.lock()) {
        fail("Session IO failed", e);
    }
}

/// Run batch of encounters
fn cmd_batch(catalog_path: Option<&Path>, config: BatchConfig, output: Option<&Path>) {
    let catalog = catalog_or_exit(catalog_path);
    let results = run_batch(config, &catalog);

    if let Some(output) = output {
        let path = output.join("batch_results.json");
        if let Err(e) = results.save(&path) {
            fail("Failed to save results", e);
        }
        tracing::info!(path = %path.display(), "Results saved");
    }

    print_json(&results.summary);
    if !results.errors.is_empty() {
        eprintln!("{} encounter(s) failed", results.errors.len());
        std::process::exit(1);
    }
}

/// Verify determinism
fn cmd_verify(catalog_path: Option<&Path>, seed: u64, runs: u32, town_hall: u8, deploy_window: u64) {
    let catalog = catalog_or_exit(catalog_path);
    tracing::info!(seed, runs, "Verifying determinism");

    let report = verify_determinism(&catalog, town_hall, seed, runs, deploy_window)
        .unwrap_or_else(|e| fail("Verification failed", e));
    print_json(&report);
    if !report.deterministic {
        eprintln!("FAIL: runs diverged for seed {seed}");
        std::process::exit(1);
    }
    eprintln!("PASS: {} runs matched", report.hashes.len());
}

/// Validate a catalog file
fn cmd_validate(path: &Path) {
    let catalog = load_catalog(path).unwrap_or_else(|e| fail("Invalid catalog", e));
    let tiers: Vec<u8> = catalog.tiers().map(|t| t.level).collect();
    eprintln!(
        "OK: {} ({} entries, tiers {:?})",
        path.display(),
        catalog.len(),
        tiers
    );
}
