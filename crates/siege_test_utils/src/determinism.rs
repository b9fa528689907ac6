//! Determinism testing utilities.
//!
//! Provides a harness for verifying that an encounter produces identical
//! results given an identical layout, roster and deployment sequence.
//!
//! # Testing Strategy
//!
//! Replays and batch balancing rely on encounters being 100% reproducible.
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`siege_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Entity tables are dense vectors walked in id order and every map in the
//!   engine is a `BTreeMap`.
//!
//! - **Tie-breaks**: Target selection and A* break ties on ids and tile
//!   coordinates, never on insertion accidents.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual system determinism (routing, combat, etc.)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full encounters are reproducible
//! 4. **Parallel tests**: Running N encounters on separate threads all match

use std::thread;

use siege_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run an encounter twice and compare final state hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.step();
        },
        Simulation::state_hash,
    );
    result.is_deterministic
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each simulation.
    pub hashes: Vec<u64>,
    /// Number of ticks each simulation ran.
    pub ticks: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all simulations matched.
    ///
    /// # Panics
    ///
    /// Panics if simulations produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run N encounters on scoped threads and collect final hashes.
///
/// Each thread owns its own [`Simulation`]; nothing is shared.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations_scoped<F>(
    setup_fn: F,
    num_sims: usize,
    num_ticks: u64,
) -> ParallelSimResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.step();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.step();
        sim2.step();

        if sim1.state_hash() != sim2.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that a bincode round-trip mid-encounter preserves the state hash
/// and that the restored copy keeps evolving identically.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut sim = setup_fn();

    for _ in 0..num_ticks {
        sim.step();
    }

    let Ok(bytes) = sim.serialize() else {
        return false;
    };
    let Ok(mut restored) = Simulation::deserialize(&bytes) else {
        return false;
    };

    if restored.state_hash() != sim.state_hash() {
        return false;
    }

    for _ in 0..num_ticks {
        sim.step();
        restored.step();
    }
    restored.state_hash() == sim.state_hash()
}

/// Proptest strategies for encounter testing.
///
/// These strategies generate random but reproducible layouts and
/// deployments for property-based testing.
pub mod strategies {
    use proptest::prelude::*;
    use siege_core::components::{StructureKind, TilePos, UnitKind};
    use siege_core::grid::{BUILD_MARGIN, GRID_SIZE};

    /// Any tile on the grid, including the undeployable border.
    pub fn arb_tile() -> impl Strategy<Value = TilePos> {
        (0..GRID_SIZE, 0..GRID_SIZE).prop_map(|(x, y)| TilePos::new(x, y))
    }

    /// A tile in the outer deployment ring.
    pub fn arb_border_tile() -> impl Strategy<Value = TilePos> {
        (0..GRID_SIZE, 0..BUILD_MARGIN, 0..4u8).prop_map(|(along, depth, side)| match side {
            0 => TilePos::new(along, depth),
            1 => TilePos::new(along, GRID_SIZE - 1 - depth),
            2 => TilePos::new(depth, along),
            _ => TilePos::new(GRID_SIZE - 1 - depth, along),
        })
    }

    /// Origin inside the buildable area.
    pub fn arb_build_origin() -> impl Strategy<Value = TilePos> {
        (BUILD_MARGIN..GRID_SIZE - BUILD_MARGIN, BUILD_MARGIN..GRID_SIZE - BUILD_MARGIN)
            .prop_map(|(x, y)| TilePos::new(x, y))
    }

    /// Any structure kind.
    pub fn arb_structure_kind() -> impl Strategy<Value = StructureKind> {
        proptest::sample::select(StructureKind::ALL.to_vec())
    }

    /// Any unit kind.
    pub fn arb_unit_kind() -> impl Strategy<Value = UnitKind> {
        proptest::sample::select(UnitKind::ALL.to_vec())
    }

    /// A placement attempt. Many will be refused; that is the point.
    pub fn arb_placement() -> impl Strategy<Value = (StructureKind, TilePos)> {
        (arb_structure_kind(), arb_build_origin())
    }

    /// A sequence of placement attempts.
    pub fn arb_placements(max_len: usize) -> impl Strategy<Value = Vec<(StructureKind, TilePos)>> {
        proptest::collection::vec(arb_placement(), 1..max_len)
    }

    /// A deployment onto the border ring.
    pub fn arb_deployment() -> impl Strategy<Value = (UnitKind, TilePos)> {
        (arb_unit_kind(), arb_border_tile())
    }

    /// A list of deployments.
    pub fn arb_deployments(max_len: usize) -> impl Strategy<Value = Vec<(UnitKind, TilePos)>> {
        proptest::collection::vec(arb_deployment(), 1..max_len)
    }
}
