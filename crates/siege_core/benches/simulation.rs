//! Encounter benchmarks for siege_core.
//!
//! Run with: `cargo bench -p siege_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use siege_core::components::{Footprint, StructureKind, UnitKind};
use siege_core::math::Fixed;
use siege_core::pathfinding::route_to_target;
use siege_core::targeting::reach_squared;
use siege_test_utils::fixtures::{tile, Fixture};

fn walled_base() -> Fixture {
    Fixture::new()
        .structure(StructureKind::TownHall, 20, 20)
        .structure(StructureKind::Cannon, 14, 15)
        .structure(StructureKind::Cannon, 27, 26)
        .structure(StructureKind::ArcherTower, 27, 15)
        .structure(StructureKind::GoldMine, 14, 26)
        .structure(StructureKind::ElixirPump, 20, 27)
        .wall_ring(12, 31)
        .units(UnitKind::Barbarian, 10)
        .units(UnitKind::Archer, 10)
        .units(UnitKind::Giant, 2)
}

fn deploy_all(fixture: Fixture) -> Fixture {
    (0..10)
        .fold(fixture, |f, i| f.deploy(0, 2 + i, 2).deploy(1, 42, 2 + i))
        .deploy(2, 2, 40)
        .deploy(2, 3, 40)
}

/// Runs full encounters and the routing hot path.
pub fn simulation_benchmark(c: &mut Criterion) {
    let fixture = deploy_all(walled_base());

    c.bench_function("encounter_full", |b| {
        b.iter(|| {
            let mut sim = fixture.build();
            black_box(sim.run(1800))
        })
    });

    c.bench_function("encounter_100_ticks", |b| {
        let start = fixture.build();
        b.iter(|| {
            let mut sim = start.clone();
            for _ in 0..100 {
                black_box(sim.step());
            }
        })
    });

    let layout = walled_base().layout();
    let goal = Footprint::new(tile(20, 20), 4, 4);
    let reach = reach_squared(Fixed::from_num(0.4));
    c.bench_function("route_breach", |b| {
        b.iter(|| black_box(route_to_target(layout.grid(), tile(2, 2), &goal, reach, false)))
    });
}

criterion_group!(benches, simulation_benchmark);
criterion_main!(benches);
