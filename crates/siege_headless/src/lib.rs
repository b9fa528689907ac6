//! Headless siege runner for policy training, balance testing and CI.
//!
//! This crate wraps `siege_core` with everything that touches the outside
//! world: catalog and scenario files, a JSON-lines driver for external
//! policies, a parallel batch runner and seedable random bases.
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from the controller (deploy, step, query, ...)
//! - **stdout**: Responses (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See the [`protocol`] module for the full set of commands and responses.
//!
//! # Example
//!
//! ```bash
//! # Drive an encounter interactively
//! echo '{"cmd":"step","count":10}' | cargo run -p siege_headless -- play -s assets/scenarios/walled_core.ron
//!
//! # Play a scenario's deployment plan to the end
//! cargo run -p siege_headless -- run -s assets/scenarios/walled_core.ron
//!
//! # Verify determinism
//! cargo run -p siege_headless -- verify --seed 12345 --runs 5
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod catalog_loader;
pub mod metrics;
pub mod protocol;
pub mod random_fill;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, VerifyReport};
pub use catalog_loader::{load_catalog, resolve_catalog, CatalogLoadError};
pub use metrics::{BatchSummary, DeclinedDeploy, EncounterReport};
pub use protocol::{Command, Response};
pub use random_fill::{random_deployments, random_layout, random_roster, random_scenario};
pub use runner::{run_scenario, HeadlessRunner};
pub use scenario::{Scenario, ScenarioError, ScheduledDeploy};
