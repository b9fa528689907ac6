//! The encounter clock.
//!
//! [`Simulation`] owns everything one encounter needs and exposes a single
//! [`step`](Simulation::step) entry point. Ticks are logical: nothing happens
//! between calls, and two simulations built from the same layout, roster and
//! deployment sequence produce identical state hashes on every tick.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::combat::{CombatResolver, TickEvents};
use crate::components::{StructureCategory, StructureId, TilePos, UnitId};
use crate::encounter::{EncounterConfig, EncounterState};
use crate::error::{DeployError, Result, SiegeError};
use crate::grid::GridWorld;
use crate::layout::BaseLayout;
use crate::registry::{EntityRegistry, Structure, Unit};
use crate::roster::Roster;
use crate::snapshot::GridSnapshot;

/// Result of one [`Simulation::step`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickOutcome {
    /// Ticks elapsed after this step.
    pub tick: u64,
    /// Whether the encounter is over.
    pub ended: bool,
    /// Stars earned so far.
    pub stars: u8,
    /// Destroyed non-wall hitpoints as a percentage.
    pub destruction_percentage: f64,
    /// Non-wall structures destroyed.
    pub destroyed_count: u32,
    /// Gold looted so far.
    pub gold_looted: u64,
    /// Elixir looted so far.
    pub elixir_looted: u64,
    /// What happened during this step.
    pub events: TickEvents,
}

/// One deterministic siege encounter.
///
/// # System Execution Order
///
/// Each tick:
/// 1. **Units** - in id order: target, route, then attack or move
/// 2. **Structures** - in id order: validate target, fire or acquire
/// 3. **Scoring** - destruction percentage and stars
/// 4. **Termination** - time budget, exhausted army, or base destroyed
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use siege_core::prelude::*;
///
/// let catalog = Arc::new(StatCatalog::default());
/// let layout = BaseLayout::new(catalog.clone());
/// let roster = Roster::new(&catalog, &[]).unwrap();
/// let mut sim = Simulation::new(layout, roster, EncounterConfig::default());
/// let outcome = sim.step();
/// assert!(outcome.ended);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    config: EncounterConfig,
    grid: GridWorld,
    registry: EntityRegistry,
    roster: Roster,
    encounter: EncounterState,
    ended: bool,
}

impl Simulation {
    /// Start an encounter. The layout is consumed, so no structure can be
    /// placed once the encounter exists.
    #[must_use]
    pub fn new(layout: BaseLayout, roster: Roster, config: EncounterConfig) -> Self {
        let (grid, registry) = layout.into_parts();
        let encounter = EncounterState::new(&registry, &config);
        tracing::debug!(
            structures = registry.structure_count(),
            units = roster.remaining(),
            budget = encounter.tick_budget(),
            "Encounter started"
        );
        Self {
            config,
            grid,
            registry,
            roster,
            encounter,
            ended: false,
        }
    }

    /// Deploy one unit from a roster slot onto a tile.
    ///
    /// Declined deployments leave the simulation untouched.
    pub fn deploy_unit(&mut self, slot: usize, tile: TilePos) -> std::result::Result<UnitId, DeployError> {
        if self.ended {
            return Err(DeployError::EncounterEnded);
        }
        self.roster.check(slot)?;
        if !self.grid.in_bounds(tile) {
            return Err(DeployError::OutOfBounds(tile));
        }
        if let Some(structure) = self.grid.structure_at(tile) {
            return Err(DeployError::TileOccupied {
                tile,
                structure: structure.0,
            });
        }

        let entry = self.roster.take(slot)?;
        let id = self.registry.next_unit_id();
        self.registry
            .insert_unit(Unit::new(id, entry.kind, entry.level, slot, entry.stats, tile));
        self.grid.unit_enter(tile, id);
        self.encounter.record_deploy();
        tracing::debug!(unit = id.0, kind = ?entry.kind, x = tile.x, y = tile.y, "Unit deployed");
        Ok(id)
    }

    /// Advance one tick. Once the encounter has ended this is a no-op that
    /// reports the final outcome.
    pub fn step(&mut self) -> TickOutcome {
        let mut events = TickEvents::default();
        if self.ended {
            return self.outcome(events);
        }

        CombatResolver::new(
            &mut self.grid,
            &mut self.registry,
            &mut self.encounter,
            &mut events,
            self.config.tick_ms,
        )
        .resolve_tick();

        self.encounter.recompute_stars();
        self.encounter.advance_tick();
        self.ended = self.check_ended();

        #[cfg(feature = "debug-validation")]
        if let Err(violation) = self.check_invariants() {
            panic!("invariant violated at tick {}: {violation}", self.encounter.tick());
        }

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.encounter.tick(), state_hash = hash, "Simulation state hash");
        }

        if self.ended {
            tracing::info!(
                tick = self.encounter.tick(),
                stars = self.encounter.stars(),
                destruction = self.encounter.destruction_percentage(),
                "Encounter ended"
            );
        }

        self.outcome(events)
    }

    /// Step until the encounter ends or `max_ticks` more ticks have run.
    pub fn run(&mut self, max_ticks: u64) -> TickOutcome {
        let mut outcome = self.step();
        for _ in 1..max_ticks {
            if outcome.ended {
                break;
            }
            outcome = self.step();
        }
        outcome
    }

    fn check_ended(&self) -> bool {
        let out_of_time = self.encounter.tick() >= self.encounter.tick_budget();
        let army_spent = self.registry.unit_count() == 0 && self.roster.is_exhausted();
        let base_destroyed = self.encounter.all_destroyed();
        out_of_time || army_spent || base_destroyed
    }

    fn outcome(&self, events: TickEvents) -> TickOutcome {
        TickOutcome {
            tick: self.encounter.tick(),
            ended: self.ended,
            stars: self.encounter.stars(),
            destruction_percentage: self.encounter.destruction_percentage(),
            destroyed_count: self.encounter.destroyed_count(),
            gold_looted: self.encounter.gold_looted(),
            elixir_looted: self.encounter.elixir_looted(),
            events,
        }
    }

    /// Whether the encounter is over.
    #[must_use]
    pub const fn is_ended(&self) -> bool {
        self.ended
    }

    /// Ticks elapsed.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.encounter.tick()
    }

    /// Encounter timing.
    #[must_use]
    pub const fn config(&self) -> &EncounterConfig {
        &self.config
    }

    /// Scoring state.
    #[must_use]
    pub const fn encounter(&self) -> &EncounterState {
        &self.encounter
    }

    /// Remaining deployable units.
    #[must_use]
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Tile occupancy.
    #[must_use]
    pub const fn grid(&self) -> &GridWorld {
        &self.grid
    }

    /// Live structure by id.
    #[must_use]
    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.registry.structure(id)
    }

    /// Live unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.registry.unit(id)
    }

    /// Live structures in id order.
    pub fn structures(&self) -> impl Iterator<Item = &Structure> {
        self.registry.structures()
    }

    /// Live units in id order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.registry.units()
    }

    /// Plain-data view of the whole grid.
    #[must_use]
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot::capture(self.encounter.tick(), &self.grid, &self.registry)
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Two simulations with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.encounter.hash(&mut hasher);
        self.ended.hash(&mut hasher);

        for structure in self.registry.structures() {
            structure.id.hash(&mut hasher);
            structure.health.hash(&mut hasher);
            if let Some(defense) = &structure.defense {
                defense.target.hash(&mut hasher);
                defense.clock.hash(&mut hasher);
            }
            if let Some(loot) = &structure.loot {
                loot.hash(&mut hasher);
            }
        }

        for unit in self.registry.units() {
            unit.id.hash(&mut hasher);
            unit.tile.hash(&mut hasher);
            unit.progress.to_bits().hash(&mut hasher);
            unit.health.hash(&mut hasher);
            unit.target.hash(&mut hasher);
            unit.breach.hash(&mut hasher);
            unit.route.hash(&mut hasher);
            unit.clock.hash(&mut hasher);
            unit.stranded.hash(&mut hasher);
        }

        for slot in self.roster.slots() {
            slot.remaining.hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Check grid/registry consistency and value bounds.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let grid_ids: Vec<StructureId> = self.grid.structure_ids().collect();
        let registry_ids = self.registry.structure_ids();
        if grid_ids != registry_ids {
            return Err(format!(
                "grid holds {grid_ids:?} but registry holds {registry_ids:?}"
            ));
        }

        for structure in self.registry.structures() {
            if !self.grid.verify_footprint(structure.id) {
                return Err(format!("footprint of {:?} is inconsistent", structure.id));
            }
            if structure.health.is_dead() || structure.health.current > structure.health.max {
                return Err(format!("{:?} has invalid hitpoints", structure.id));
            }
            let blocks = !self.grid.passable(structure.footprint.origin, false);
            if blocks != (structure.category() == StructureCategory::Wall) {
                return Err(format!("{:?} has the wrong passability", structure.id));
            }
            if let Some(defense) = &structure.defense {
                if let Some(target) = defense.target {
                    if self.registry.unit(target).is_none() {
                        return Err(format!("{:?} targets dead unit {target:?}", structure.id));
                    }
                }
            }
        }

        let mut placed_units = 0;
        for (tile, cell) in self.grid.tiles() {
            for id in cell.units() {
                placed_units += 1;
                if self.registry.unit(*id).map(|u| u.tile) != Some(tile) {
                    return Err(format!("{id:?} listed on {tile:?} but is elsewhere"));
                }
            }
        }
        if placed_units != self.registry.unit_count() {
            return Err("unit occupancy count differs from registry".to_string());
        }

        for unit in self.registry.units() {
            if unit.health.is_dead() {
                return Err(format!("{:?} is dead but present", unit.id));
            }
            for target in [unit.target, unit.breach].into_iter().flatten() {
                if self.registry.structure(target).is_none() {
                    return Err(format!("{:?} targets destroyed {target:?}", unit.id));
                }
            }
        }

        if self.encounter.gold_looted() > self.encounter.total_gold()
            || self.encounter.elixir_looted() > self.encounter.total_elixir()
        {
            return Err("loot exceeds encounter totals".to_string());
        }
        Ok(())
    }

    /// Serialize the simulation state.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| SiegeError::InvalidState(format!("Failed to serialize simulation: {e}")))
    }

    /// Deserialize simulation state from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| {
            SiegeError::InvalidState(format!("Failed to deserialize simulation: {e}"))
        })
    }
}
