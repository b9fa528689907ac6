//! Seedable random bases, rosters and deployment plans.
//!
//! Everything here is reproducible: the same catalog, tier and seed always
//! produce the same output.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use siege_core::components::{TilePos, UnitKind};
use siege_core::data::StatCatalog;
use siege_core::encounter::EncounterConfig;
use siege_core::error::CatalogError;
use siege_core::grid::{BUILD_MARGIN, GRID_SIZE};
use siege_core::layout::BaseLayout;
use siege_core::roster::RosterEntry;

use crate::scenario::{Scenario, ScenarioError, ScheduledDeploy};

/// Placement tries per structure copy before giving up on it.
pub const PLACEMENT_ATTEMPTS: u32 = 10;

/// Fill a base with every structure kind its tier allows, up to the cap.
///
/// Copies that do not fit after [`PLACEMENT_ATTEMPTS`] random origins are
/// skipped, so crowded tiers may come out short.
pub fn random_layout(
    catalog: Arc<StatCatalog>,
    town_hall_level: u8,
    seed: u64,
) -> Result<BaseLayout, CatalogError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let tier = catalog.tier(town_hall_level)?.clone();
    let mut layout = BaseLayout::for_town_hall(catalog.clone(), town_hall_level)?;
    let mut skipped = 0;

    for allowance in &tier.structures {
        let (width, height) = catalog
            .structure_stats(allowance.kind, allowance.level)?
            .footprint;
        let max_x = GRID_SIZE - BUILD_MARGIN - i32::from(width);
        let max_y = GRID_SIZE - BUILD_MARGIN - i32::from(height);

        for _ in 0..allowance.max_count {
            let placed = (0..PLACEMENT_ATTEMPTS).any(|_| {
                let origin = TilePos::new(
                    rng.random_range(BUILD_MARGIN..=max_x),
                    rng.random_range(BUILD_MARGIN..=max_y),
                );
                layout
                    .place_structure(allowance.kind, allowance.level, origin)
                    .is_ok()
            });
            if !placed {
                skipped += 1;
            }
        }
    }

    tracing::debug!(
        seed,
        town_hall_level,
        placed = layout.registry().structure_count(),
        skipped,
        "Random layout"
    );
    Ok(layout)
}

/// Recruit random available units until no more fit in the army capacity.
///
/// Entries come out in tier order, one per kind recruited.
pub fn random_roster(
    catalog: &StatCatalog,
    town_hall_level: u8,
    seed: u64,
) -> Result<Vec<RosterEntry>, CatalogError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let tier = catalog.tier(town_hall_level)?;

    let mut options: Vec<(UnitKind, u8, u32)> = Vec::with_capacity(tier.units.len());
    for &(kind, level) in &tier.units {
        let housing = catalog.unit_stats(kind, level)?.housing_space;
        options.push((kind, level, housing));
    }

    let mut counts = vec![0u32; options.len()];
    let mut space = tier.army_capacity;
    loop {
        let fitting: Vec<usize> = (0..options.len())
            .filter(|&i| options[i].2 > 0 && options[i].2 <= space)
            .collect();
        if fitting.is_empty() {
            break;
        }
        let pick = fitting[rng.random_range(0..fitting.len())];
        counts[pick] += 1;
        space -= options[pick].2;
    }

    Ok(options
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(&(kind, level, _), count)| RosterEntry { kind, level, count })
        .collect())
}

/// A tile in the deployment strip around the buildable area.
pub fn random_border_tile<R: Rng>(rng: &mut R) -> TilePos {
    let along = rng.random_range(0..GRID_SIZE);
    let depth = rng.random_range(0..BUILD_MARGIN);
    match rng.random_range(0..4) {
        0 => TilePos::new(along, depth),
        1 => TilePos::new(along, GRID_SIZE - 1 - depth),
        2 => TilePos::new(depth, along),
        _ => TilePos::new(GRID_SIZE - 1 - depth, along),
    }
}

/// Deploy every roster unit on a random border tile at a random tick below
/// `last_tick`. The plan is sorted by tick.
pub fn random_deployments(roster: &[RosterEntry], last_tick: u64, seed: u64) -> Vec<ScheduledDeploy> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut plan: Vec<ScheduledDeploy> = roster
        .iter()
        .enumerate()
        .flat_map(|(slot, entry)| std::iter::repeat(slot).take(entry.count as usize))
        .map(|slot| ScheduledDeploy {
            tick: rng.random_range(0..last_tick.max(1)),
            slot,
            tile: random_border_tile(&mut rng),
        })
        .collect();
    plan.sort_by_key(|d| d.tick);
    plan
}

/// A full random encounter for one seed.
pub fn random_scenario(
    catalog: Arc<StatCatalog>,
    town_hall_level: u8,
    seed: u64,
    deploy_window: u64,
) -> Result<Scenario, ScenarioError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let layout_seed: u64 = rng.random();
    let roster_seed: u64 = rng.random();
    let deploy_seed: u64 = rng.random();

    let roster = random_roster(&catalog, town_hall_level, roster_seed)?;
    let layout = random_layout(catalog, town_hall_level, layout_seed)?;
    let deployments = random_deployments(&roster, deploy_window, deploy_seed);

    Ok(Scenario {
        name: format!("random-th{town_hall_level}-{seed}"),
        description: String::new(),
        town_hall_level: Some(town_hall_level),
        config: EncounterConfig::default(),
        layout: layout.entries(),
        roster,
        deployments,
    })
}
