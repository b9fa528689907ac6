//! Per-tick combat resolution.
//!
//! The resolver borrows the grid, registry and encounter state of one
//! simulation for the duration of a tick. Units act first, in id order, then
//! every defensive structure, in id order. A structure is processed exactly
//! once per tick no matter how many tiles it covers.

use serde::{Deserialize, Serialize};

use crate::components::{StructureId, StructureKind, TargetPreference, UnitId, UnitKind};
use crate::encounter::EncounterState;
use crate::grid::GridWorld;
use crate::math::{Fixed, Vec2Fixed, SQRT_2};
use crate::pathfinding::{route_to_target, RouteResult};
use crate::registry::EntityRegistry;
use crate::targeting::{
    in_firing_ring, reach_squared, select_structure_target, select_unit_target, within_reach,
};

/// A hit landed this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HitEvent {
    /// A unit hit a structure.
    OnStructure {
        /// Attacking unit.
        attacker: UnitId,
        /// Structure hit.
        target: StructureId,
        /// Hitpoints removed.
        damage: u32,
        /// Gold credited by this hit.
        gold: u32,
        /// Elixir credited by this hit.
        elixir: u32,
    },
    /// A structure hit a unit.
    OnUnit {
        /// Firing structure.
        attacker: StructureId,
        /// Unit hit.
        target: UnitId,
        /// Hitpoints removed.
        damage: u32,
    },
}

/// A structure destroyed this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyedStructure {
    /// Id.
    pub id: StructureId,
    /// Kind.
    pub kind: StructureKind,
}

/// A unit removed this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LostUnit {
    /// Id.
    pub id: UnitId,
    /// Kind.
    pub kind: UnitKind,
    /// True when the unit spent itself on a wall.
    pub detonated: bool,
}

/// Everything that happened during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Hits in resolution order.
    pub hits: Vec<HitEvent>,
    /// Structures destroyed.
    pub destroyed: Vec<DestroyedStructure>,
    /// Units removed.
    pub lost: Vec<LostUnit>,
}

/// Resolves one tick of combat over borrowed simulation state.
pub struct CombatResolver<'a> {
    grid: &'a mut GridWorld,
    registry: &'a mut EntityRegistry,
    encounter: &'a mut EncounterState,
    events: &'a mut TickEvents,
    tick_ms: u32,
}

impl<'a> CombatResolver<'a> {
    /// Borrow simulation state for one tick.
    pub fn new(
        grid: &'a mut GridWorld,
        registry: &'a mut EntityRegistry,
        encounter: &'a mut EncounterState,
        events: &'a mut TickEvents,
        tick_ms: u32,
    ) -> Self {
        Self {
            grid,
            registry,
            encounter,
            events,
            tick_ms,
        }
    }

    /// Run every unit, then every defensive structure.
    pub fn resolve_tick(&mut self) {
        for id in self.registry.unit_ids() {
            self.unit_turn(id);
        }
        let defenders: Vec<StructureId> = self
            .registry
            .structures()
            .filter(|s| s.is_defensive())
            .map(|s| s.id)
            .collect();
        for id in defenders {
            self.structure_turn(id);
        }
    }

    /// One unit's action: retarget if needed, then attack or move.
    pub fn unit_turn(&mut self, id: UnitId) {
        let Some(unit) = self.registry.unit(id) else {
            return;
        };
        if unit.stranded {
            return;
        }

        if unit.target.is_none() {
            let Some(target) = select_structure_target(self.registry, unit) else {
                return;
            };
            if let Some(unit) = self.registry.unit_mut(id) {
                unit.target = Some(target);
                unit.breach = None;
            }
            if !self.plan_route(id) {
                return;
            }
        }

        let Some(unit) = self.registry.unit(id) else {
            return;
        };
        let Some(engaged) = unit.engaged() else {
            return;
        };
        let Some(footprint) = self.registry.structure(engaged).map(|s| s.footprint) else {
            // Cascades clear dangling targets, so this only guards against misuse.
            if let Some(unit) = self.registry.unit_mut(id) {
                unit.reset_target();
            }
            return;
        };

        if within_reach(unit.tile, &footprint, reach_squared(unit.stats.attack_range)) {
            self.unit_attack(id, engaged);
        } else {
            self.unit_move(id, engaged);
        }
    }

    /// Route toward the unit's current target. Returns false when blocked.
    fn plan_route(&mut self, id: UnitId) -> bool {
        let Some(unit) = self.registry.unit(id) else {
            return false;
        };
        let Some(target) = unit.target else {
            return false;
        };
        let Some(footprint) = self.registry.structure(target).map(|s| s.footprint) else {
            return false;
        };
        let result = route_to_target(
            self.grid,
            unit.tile,
            &footprint,
            reach_squared(unit.stats.attack_range),
            unit.is_flying(),
        );

        let Some(unit) = self.registry.unit_mut(id) else {
            return false;
        };
        unit.progress = Fixed::ZERO;
        unit.offset = Vec2Fixed::ZERO;
        match result {
            RouteResult::Reached(path) => {
                unit.breach = None;
                unit.route = path;
                unit.route_goal = Some(target);
                true
            }
            RouteResult::Partial { wall, path } => {
                tracing::debug!(unit = id.0, target = target.0, wall = wall.0, "Breaching wall");
                unit.breach = Some(wall);
                unit.route = path;
                unit.route_goal = Some(wall);
                true
            }
            RouteResult::Blocked => {
                tracing::debug!(unit = id.0, target = target.0, "No route and nothing to breach");
                unit.route.clear();
                unit.route_goal = None;
                unit.stranded = true;
                false
            }
        }
    }

    fn unit_attack(&mut self, id: UnitId, target: StructureId) {
        let tick_ms = self.tick_ms;
        let Some(unit) = self.registry.unit_mut(id) else {
            return;
        };
        unit.offset = Vec2Fixed::ZERO;
        if !unit.clock.advance(tick_ms, unit.stats.cadence_ms) {
            return;
        }
        let damage = unit.stats.damage_per_hit;
        let detonates = unit.stats.preference == TargetPreference::Walls;

        let hit_wall = self
            .registry
            .structure(target)
            .is_some_and(|s| s.is_wall());
        self.hit_structure(id, target, damage);

        if detonates && hit_wall {
            tracing::debug!(unit = id.0, wall = target.0, "Unit detonated on wall");
            self.remove_unit(id, true);
        }
    }

    fn unit_move(&mut self, id: UnitId, engaged: StructureId) {
        let needs_route = self
            .registry
            .unit(id)
            .is_some_and(|u| u.route_goal != Some(engaged) || u.route.is_empty());
        if needs_route && !self.replan(id) {
            return;
        }

        let Some(next) = self.registry.unit(id).and_then(|u| u.route.last().copied()) else {
            return;
        };
        let is_flying = self.registry.unit(id).is_some_and(|u| u.is_flying());
        if !self.grid.passable(next, is_flying) {
            self.replan(id);
            return;
        }

        let tick_ms = self.tick_ms;
        let Some(unit) = self.registry.unit_mut(id) else {
            return;
        };
        let from = unit.tile;
        // Progress is kept in tile-milliseconds so whole-tick speeds stay exact.
        let diagonal = from.x != next.x && from.y != next.y;
        let step_cost = Fixed::from_num(1000) * if diagonal { SQRT_2 } else { Fixed::ONE };
        let advance = unit.stats.movement_speed * Fixed::from_num(tick_ms);
        unit.progress = (unit.progress + advance).min(step_cost);

        if unit.progress >= step_cost {
            unit.route.pop();
            unit.tile = next;
            unit.progress = Fixed::ZERO;
            unit.offset = Vec2Fixed::ZERO;
            self.grid.unit_leave(from, id);
            self.grid.unit_enter(next, id);
        } else {
            let t = unit.progress / step_cost;
            unit.offset = Vec2Fixed::ZERO.lerp(next.to_fixed() - from.to_fixed(), t);
        }
    }

    /// Recompute the route for the unit's intended target. A breach wall is
    /// dropped first so the search can discover a cleared path.
    fn replan(&mut self, id: UnitId) -> bool {
        if let Some(unit) = self.registry.unit_mut(id) {
            unit.breach = None;
        }
        self.plan_route(id)
    }

    fn hit_structure(&mut self, attacker: UnitId, target: StructureId, damage: u32) {
        let Some(structure) = self.registry.structure_mut(target) else {
            return;
        };
        let before = structure.health.current;
        let dealt = structure.health.apply_damage(damage);
        debug_assert!(structure.health.current <= before);
        let (gold, elixir) = match structure.loot.as_mut() {
            Some(store) => store.extract(&structure.health),
            None => (0, 0),
        };
        let category = structure.category();
        let destroyed = structure.health.is_dead();

        self.encounter.record_damage(category, dealt);
        let (gold, elixir) = self.encounter.record_loot(gold, elixir);
        self.events.hits.push(HitEvent::OnStructure {
            attacker,
            target,
            damage: dealt,
            gold,
            elixir,
        });

        if destroyed {
            self.destroy_structure(target);
        }
    }

    /// Remove a dead structure from grid and registry and reset every unit
    /// that was attacking or breaching toward it.
    fn destroy_structure(&mut self, id: StructureId) {
        let Some(structure) = self.registry.remove_structure(id) else {
            return;
        };
        let removed = self.grid.remove(id);
        debug_assert!(removed, "structure {id:?} missing from grid");
        self.encounter
            .record_destroyed(structure.category(), structure.health.max);
        self.events.destroyed.push(DestroyedStructure {
            id,
            kind: structure.kind,
        });
        tracing::debug!(id = id.0, kind = ?structure.kind, "Structure destroyed");

        for unit in self.registry.units_mut() {
            if unit.refers_to(id) {
                unit.reset_target();
            }
        }
    }

    /// One defensive structure's action.
    pub fn structure_turn(&mut self, id: StructureId) {
        let tick_ms = self.tick_ms;
        let Some(structure) = self.registry.structure(id) else {
            return;
        };
        let Some(defense) = structure.defense.as_ref() else {
            return;
        };
        let centre = structure.footprint.centroid();
        let stats = defense.stats;

        if let Some(target) = defense.target {
            let valid = self.registry.unit(target).is_some_and(|u| {
                stats.target_domain.can_hit(u.is_flying()) && in_firing_ring(centre, u.tile, &stats)
            });
            if valid {
                let fires = self
                    .registry
                    .structure_mut(id)
                    .and_then(|s| s.defense.as_mut())
                    .is_some_and(|d| d.clock.advance(tick_ms, stats.cadence_ms));
                if fires {
                    self.hit_unit(id, target, stats.damage_per_hit);
                }
                return;
            }
            if let Some(defense) = self.registry.structure_mut(id).and_then(|s| s.defense.as_mut()) {
                defense.target = None;
            }
        }

        let registry: &EntityRegistry = self.registry;
        let acquired = registry
            .structure(id)
            .and_then(|s| select_unit_target(registry, s));
        if let Some(defense) = self.registry.structure_mut(id).and_then(|s| s.defense.as_mut()) {
            defense.target = acquired;
        }
    }

    fn hit_unit(&mut self, attacker: StructureId, target: UnitId, damage: u32) {
        let Some(unit) = self.registry.unit_mut(target) else {
            return;
        };
        let dealt = unit.health.apply_damage(damage);
        let dead = unit.health.is_dead();
        self.events.hits.push(HitEvent::OnUnit {
            attacker,
            target,
            damage: dealt,
        });
        if dead {
            tracing::debug!(unit = target.0, by = attacker.0, "Unit killed");
            self.remove_unit(target, false);
        }
    }

    /// Remove a unit from grid and registry and clear every structure
    /// aiming at it.
    fn remove_unit(&mut self, id: UnitId, detonated: bool) {
        let Some(unit) = self.registry.remove_unit(id) else {
            return;
        };
        let left = self.grid.unit_leave(unit.tile, id);
        debug_assert!(left, "unit {id:?} missing from its tile");
        self.encounter.record_unit_lost();
        self.events.lost.push(LostUnit {
            id,
            kind: unit.kind,
            detonated,
        });

        for structure in self.registry.structures_mut() {
            if let Some(defense) = structure.defense.as_mut() {
                if defense.target == Some(id) {
                    defense.target = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Footprint, TilePos};
    use crate::encounter::EncounterConfig;
    use crate::registry::{Structure, Unit};
    use crate::testing;

    struct World {
        grid: GridWorld,
        registry: EntityRegistry,
        encounter: Option<EncounterState>,
    }

    impl World {
        fn new() -> Self {
            Self {
                grid: GridWorld::new(),
                registry: EntityRegistry::new(),
                encounter: None,
            }
        }

        fn structure(&mut self, kind: StructureKind, origin: (i32, i32)) -> StructureId {
            let id = self.registry.next_structure_id();
            let stats = testing::structure_stats(kind);
            let origin = TilePos::new(origin.0, origin.1);
            let (w, h) = stats.footprint;
            self.grid.place(id, kind, Footprint::new(origin, w, h)).unwrap();
            self.registry
                .insert_structure(Structure::from_stats(id, kind, 1, origin, &stats))
        }

        fn unit(&mut self, mut unit: Unit) -> UnitId {
            unit.id = self.registry.next_unit_id();
            self.grid.unit_enter(unit.tile, unit.id);
            self.registry.insert_unit(unit)
        }

        fn tick(&mut self) -> TickEvents {
            let encounter = self.encounter.get_or_insert_with(|| {
                EncounterState::new(&self.registry, &EncounterConfig::default())
            });
            let mut events = TickEvents::default();
            CombatResolver::new(&mut self.grid, &mut self.registry, encounter, &mut events, 100)
                .resolve_tick();
            events
        }
    }

    #[test]
    fn test_unit_walks_then_attacks_on_cadence() {
        let mut world = World::new();
        let mine = world.structure(StructureKind::GoldMine, (20, 20));
        let mut barbarian = testing::unit(UnitKind::Barbarian, TargetPreference::Any, false, (10, 21));
        barbarian.stats.movement_speed = Fixed::from_num(10);
        let id = world.unit(barbarian);

        let mut first_hit = None;
        for tick in 0..40 {
            let events = world.tick();
            if first_hit.is_none() && !events.hits.is_empty() {
                first_hit = Some(tick);
            }
        }
        let first_hit = first_hit.expect("unit should reach the mine");
        let unit = world.registry.unit(id).unwrap();
        assert_eq!(unit.target, Some(mine));
        assert_eq!(unit.tile, TilePos::new(19, 21));
        assert!(world.grid.units_at(unit.tile).contains(&id));
        // Cadence 1000ms at 100ms ticks: one hit every 10 ticks.
        let hp = world.registry.structure(mine).unwrap().health.current;
        let hits = (40 - first_hit + 9) / 10;
        assert_eq!(hp, 400 - 10 * hits as u32);
    }

    #[test]
    fn test_destroying_structure_resets_attackers() {
        let mut world = World::new();
        let hall = world.structure(StructureKind::TownHall, (20, 20));
        world.structure(StructureKind::Laboratory, (30, 30));
        let mut unit = testing::unit(UnitKind::Barbarian, TargetPreference::Any, false, (19, 19));
        unit.stats.damage_per_hit = 2000;
        let id = world.unit(unit);

        let events = world.tick();
        assert_eq!(events.destroyed.len(), 1);
        assert_eq!(events.destroyed[0].id, hall);
        assert!(world.registry.structure(hall).is_none());
        assert_eq!(world.grid.structure_at(TilePos::new(21, 21)), None);
        assert_eq!(world.registry.unit(id).unwrap().target, None);
        assert!(world.encounter.as_ref().unwrap().command_destroyed());

        world.tick();
        assert!(world.registry.unit(id).unwrap().target.is_some());
    }

    #[test]
    fn test_targetless_unit_holds_position() {
        let mut world = World::new();
        world.structure(StructureKind::Wall, (12, 12));
        let mut unit = testing::unit(UnitKind::Barbarian, TargetPreference::Any, false, (5, 5));
        unit.stats.movement_speed = Fixed::from_num(10);
        let id = world.unit(unit);

        for _ in 0..50 {
            let events = world.tick();
            assert!(events.hits.is_empty());
        }
        let unit = world.registry.unit(id).unwrap();
        assert_eq!(unit.target, None);
        assert_eq!(unit.tile, TilePos::new(5, 5));
        assert!(world.grid.units_at(TilePos::new(5, 5)).contains(&id));
    }

    #[test]
    fn test_wall_seeker_detonates_on_hit() {
        let mut world = World::new();
        let wall = world.structure(StructureKind::Wall, (10, 10));
        world.structure(StructureKind::Cannon, (30, 30));
        let unit = testing::unit(UnitKind::WallBreaker, TargetPreference::Walls, false, (9, 10));
        let id = world.unit(unit);

        let events = world.tick();
        assert_eq!(events.hits.len(), 1);
        assert_eq!(events.lost.len(), 1);
        assert!(events.lost[0].detonated);
        assert!(world.registry.unit(id).is_none());
        assert!(world.grid.units_at(TilePos::new(9, 10)).is_empty());
        assert_eq!(world.registry.structure(wall).unwrap().health.current, 290);
    }

    #[test]
    fn test_defense_acquires_without_firing() {
        let mut world = World::new();
        let cannon = world.structure(StructureKind::Cannon, (20, 20));
        let mut unit = testing::unit(UnitKind::Barbarian, TargetPreference::Any, false, (26, 21));
        unit.stats.movement_speed = Fixed::ZERO;
        let id = world.unit(unit);

        let events = world.tick();
        assert!(events.hits.iter().all(|h| matches!(h, HitEvent::OnStructure { .. })));
        let defense = world.registry.structure(cannon).unwrap().defense.clone().unwrap();
        assert_eq!(defense.target, Some(id));

        let events = world.tick();
        assert!(events
            .hits
            .iter()
            .any(|h| matches!(h, HitEvent::OnUnit { target, .. } if *target == id)));
    }

    #[test]
    fn test_kill_clears_every_structure_target() {
        let mut world = World::new();
        let first = world.structure(StructureKind::Cannon, (10, 20));
        let second = world.structure(StructureKind::Cannon, (20, 20));
        // Keep the victim clear of both footprints.
        let mut unit = testing::unit(UnitKind::Barbarian, TargetPreference::Any, false, (16, 26));
        unit.stats.hitpoints = 7;
        unit.health = crate::components::Health::new(7);
        unit.stats.movement_speed = Fixed::ZERO;
        let id = world.unit(unit);

        world.tick();
        for cannon in [first, second] {
            let target = world.registry.structure(cannon).unwrap().defense.as_ref().unwrap().target;
            assert_eq!(target, Some(id));
        }

        let events = world.tick();
        assert_eq!(events.lost.len(), 1);
        assert!(world.registry.unit(id).is_none());
        for cannon in [first, second] {
            let target = world.registry.structure(cannon).unwrap().defense.as_ref().unwrap().target;
            assert_eq!(target, None);
        }
        // Only the first cannon fired; the second saw its target gone.
        let shots = events
            .hits
            .iter()
            .filter(|h| matches!(h, HitEvent::OnUnit { .. }))
            .count();
        assert_eq!(shots, 1);
    }

    #[test]
    fn test_loot_follows_damage() {
        let mut world = World::new();
        let mine = world.structure(StructureKind::GoldMine, (20, 20));
        let mut unit = testing::unit(UnitKind::Goblin, TargetPreference::Resources, false, (19, 20));
        unit.stats.damage_per_hit = 100;
        world.unit(unit);

        let events = world.tick();
        let HitEvent::OnStructure { gold, .. } = events.hits[0] else {
            panic!("expected a structure hit");
        };
        assert_eq!(gold, 250);
        for _ in 0..40 {
            world.tick();
        }
        assert!(world.registry.structure(mine).is_none());
        assert_eq!(world.encounter.as_ref().unwrap().gold_looted(), 1000);
    }
}
