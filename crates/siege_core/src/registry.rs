//! Authoritative entity tables.
//!
//! Structures and units live in dense `Vec<Option<_>>` tables indexed by
//! their id. Ids are handed out in increasing order and never reused, so
//! iterating a table walks entities in id order, which is the canonical
//! processing order of the engine.

use serde::{Deserialize, Serialize};

use crate::components::{
    AttackClock, Footprint, Health, StructureCategory, StructureId, StructureKind, TilePos, UnitId,
    UnitKind,
};
use crate::data::{DefenseStats, StructureStats, UnitStats};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Firing state of a defensive structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defense {
    /// Offensive stats.
    pub stats: DefenseStats,
    /// Unit currently being shot at.
    pub target: Option<UnitId>,
    /// Cooldown counter.
    pub clock: AttackClock,
}

/// Loot held by a resource structure.
///
/// Extraction is cumulative: after any hit the total taken equals the stored
/// amount scaled by the fraction of hitpoints lost, so rounding never lets a
/// structure give up more than it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LootStore {
    /// Gold stored at encounter start.
    pub gold: u32,
    /// Elixir stored at encounter start.
    pub elixir: u32,
    /// Gold extracted so far.
    pub gold_taken: u32,
    /// Elixir extracted so far.
    pub elixir_taken: u32,
}

impl LootStore {
    /// Fresh store.
    #[must_use]
    pub const fn new(gold: u32, elixir: u32) -> Self {
        Self {
            gold,
            elixir,
            gold_taken: 0,
            elixir_taken: 0,
        }
    }

    /// Bring extraction up to date with the owner's health. Returns the
    /// newly extracted (gold, elixir).
    pub fn extract(&mut self, health: &Health) -> (u32, u32) {
        let share = |stored: u32| -> u32 {
            if health.max == 0 {
                return stored;
            }
            let scaled = u64::from(stored) * u64::from(health.damage_taken()) / u64::from(health.max);
            scaled as u32
        };
        let gold_total = share(self.gold);
        let elixir_total = share(self.elixir);
        let gold = gold_total.saturating_sub(self.gold_taken);
        let elixir = elixir_total.saturating_sub(self.elixir_taken);
        self.gold_taken = self.gold_taken.max(gold_total);
        self.elixir_taken = self.elixir_taken.max(elixir_total);
        (gold, elixir)
    }
}

/// A placed structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    /// Stable id.
    pub id: StructureId,
    /// Kind.
    pub kind: StructureKind,
    /// Level used for the stat lookup.
    pub level: u8,
    /// Covered tiles.
    pub footprint: Footprint,
    /// Hitpoints.
    pub health: Health,
    /// Present for defensive structures.
    pub defense: Option<Defense>,
    /// Present for resource structures.
    pub loot: Option<LootStore>,
}

impl Structure {
    /// Build a structure from catalog stats.
    #[must_use]
    pub fn from_stats(
        id: StructureId,
        kind: StructureKind,
        level: u8,
        origin: TilePos,
        stats: &StructureStats,
    ) -> Self {
        let (width, height) = stats.footprint;
        let loot = (kind.category() == StructureCategory::Resource && stats.is_resource())
            .then(|| LootStore::new(stats.gold, stats.elixir));
        Self {
            id,
            kind,
            level,
            footprint: Footprint::new(origin, width, height),
            health: Health::new(stats.hitpoints),
            defense: stats.defense.map(|stats| Defense {
                stats,
                target: None,
                clock: AttackClock::default(),
            }),
            loot,
        }
    }

    /// Category of this structure.
    #[must_use]
    pub const fn category(&self) -> StructureCategory {
        self.kind.category()
    }

    /// Whether this structure fires at units.
    #[must_use]
    pub const fn is_defensive(&self) -> bool {
        self.defense.is_some()
    }

    /// Whether this is a wall.
    #[must_use]
    pub fn is_wall(&self) -> bool {
        self.kind == StructureKind::Wall
    }
}

/// A deployed unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Stable id.
    pub id: UnitId,
    /// Kind.
    pub kind: UnitKind,
    /// Level used for the stat lookup.
    pub level: u8,
    /// Roster slot this unit was deployed from.
    pub slot: usize,
    /// Stats resolved at deployment.
    pub stats: UnitStats,
    /// Hitpoints.
    pub health: Health,
    /// Tile the unit occupies.
    pub tile: TilePos,
    /// Interpolated offset toward the next route tile. Presentation only.
    pub offset: Vec2Fixed,
    /// Distance walked toward the next route tile, in thousandths of a tile.
    #[serde(with = "fixed_serde")]
    pub progress: Fixed,
    /// Structure the unit wants to destroy.
    pub target: Option<StructureId>,
    /// Wall being breached on the way to `target`.
    pub breach: Option<StructureId>,
    /// Remaining route, next tile last.
    pub route: Vec<TilePos>,
    /// Structure the stored route leads to.
    pub route_goal: Option<StructureId>,
    /// Cooldown counter.
    pub clock: AttackClock,
    /// No route and no breach candidate. Cleared only by a retarget cascade.
    pub stranded: bool,
}

impl Unit {
    /// New unit standing on `tile`.
    #[must_use]
    pub fn new(
        id: UnitId,
        kind: UnitKind,
        level: u8,
        slot: usize,
        stats: UnitStats,
        tile: TilePos,
    ) -> Self {
        Self {
            id,
            kind,
            level,
            slot,
            stats,
            health: Health::new(stats.hitpoints),
            tile,
            offset: Vec2Fixed::ZERO,
            progress: Fixed::ZERO,
            target: None,
            breach: None,
            route: Vec::new(),
            route_goal: None,
            clock: AttackClock::default(),
            stranded: false,
        }
    }

    /// Structure the unit is actually attacking: the breach wall if any,
    /// otherwise its intended target.
    #[must_use]
    pub fn engaged(&self) -> Option<StructureId> {
        self.breach.or(self.target)
    }

    /// Whether the unit refers to a structure through either target slot.
    #[must_use]
    pub fn refers_to(&self, structure: StructureId) -> bool {
        self.target == Some(structure) || self.breach == Some(structure)
    }

    /// Forget targets and route so the next tick retargets.
    pub fn reset_target(&mut self) {
        self.target = None;
        self.breach = None;
        self.route.clear();
        self.route_goal = None;
        self.progress = Fixed::ZERO;
        self.offset = Vec2Fixed::ZERO;
        self.stranded = false;
    }

    /// Flying units ignore walls and only air-capable defenses hit them.
    #[must_use]
    pub const fn is_flying(&self) -> bool {
        self.stats.is_flying
    }
}

/// Dense entity tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRegistry {
    structures: Vec<Option<Structure>>,
    units: Vec<Option<Unit>>,
}

impl EntityRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next inserted structure will receive.
    #[must_use]
    pub fn next_structure_id(&self) -> StructureId {
        StructureId(self.structures.len() as u32)
    }

    /// Id the next inserted unit will receive.
    #[must_use]
    pub fn next_unit_id(&self) -> UnitId {
        UnitId(self.units.len() as u32)
    }

    /// Insert a structure built with [`next_structure_id`](Self::next_structure_id).
    pub fn insert_structure(&mut self, structure: Structure) -> StructureId {
        let id = structure.id;
        debug_assert_eq!(id, self.next_structure_id());
        self.structures.push(Some(structure));
        id
    }

    /// Insert a unit built with [`next_unit_id`](Self::next_unit_id).
    pub fn insert_unit(&mut self, unit: Unit) -> UnitId {
        let id = unit.id;
        debug_assert_eq!(id, self.next_unit_id());
        self.units.push(Some(unit));
        id
    }

    /// Remove a structure permanently.
    pub fn remove_structure(&mut self, id: StructureId) -> Option<Structure> {
        self.structures.get_mut(id.index()).and_then(Option::take)
    }

    /// Remove a unit permanently.
    pub fn remove_unit(&mut self, id: UnitId) -> Option<Unit> {
        self.units.get_mut(id.index()).and_then(Option::take)
    }

    /// Live structure by id.
    #[must_use]
    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.structures.get(id.index()).and_then(Option::as_ref)
    }

    /// Live structure by id, mutable.
    pub fn structure_mut(&mut self, id: StructureId) -> Option<&mut Structure> {
        self.structures.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Live unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.index()).and_then(Option::as_ref)
    }

    /// Live unit by id, mutable.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Live structures in id order.
    pub fn structures(&self) -> impl Iterator<Item = &Structure> {
        self.structures.iter().flatten()
    }

    /// Live structures in id order, mutable.
    pub fn structures_mut(&mut self) -> impl Iterator<Item = &mut Structure> {
        self.structures.iter_mut().flatten()
    }

    /// Live units in id order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().flatten()
    }

    /// Live units in id order, mutable.
    pub fn units_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.units.iter_mut().flatten()
    }

    /// Snapshot of live structure ids.
    #[must_use]
    pub fn structure_ids(&self) -> Vec<StructureId> {
        self.structures().map(|s| s.id).collect()
    }

    /// Snapshot of live unit ids.
    #[must_use]
    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units().map(|u| u.id).collect()
    }

    /// Number of live units.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units().count()
    }

    /// Number of live structures.
    #[must_use]
    pub fn structure_count(&self) -> usize {
        self.structures().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TargetPreference;

    fn mine_stats() -> StructureStats {
        StructureStats {
            hitpoints: 400,
            footprint: (3, 3),
            defense: None,
            gold: 1000,
            elixir: 0,
        }
    }

    fn barbarian_stats() -> UnitStats {
        UnitStats {
            hitpoints: 45,
            damage_per_hit: 8,
            attack_range: Fixed::from_num(0.4),
            cadence_ms: 1000,
            movement_speed: Fixed::from_num(2),
            housing_space: 1,
            is_flying: false,
            preference: TargetPreference::Any,
        }
    }

    #[test]
    fn test_ids_are_dense_and_never_reused() {
        let mut registry = EntityRegistry::new();
        let stats = mine_stats();
        for x in 0..3 {
            let id = registry.next_structure_id();
            registry.insert_structure(Structure::from_stats(
                id,
                StructureKind::GoldMine,
                1,
                TilePos::new(3 + x * 3, 3),
                &stats,
            ));
        }
        assert!(registry.remove_structure(StructureId(1)).is_some());
        assert!(registry.remove_structure(StructureId(1)).is_none());
        assert_eq!(registry.next_structure_id(), StructureId(3));
        assert_eq!(
            registry.structure_ids(),
            vec![StructureId(0), StructureId(2)]
        );
    }

    #[test]
    fn test_loot_extraction_is_cumulative_and_bounded() {
        let mut mine = Structure::from_stats(
            StructureId(0),
            StructureKind::GoldMine,
            1,
            TilePos::new(5, 5),
            &mine_stats(),
        );
        let mut total = 0;
        for _ in 0..7 {
            mine.health.apply_damage(61);
            let loot = mine.loot.as_mut().unwrap();
            let (gold, elixir) = loot.extract(&mine.health);
            assert_eq!(elixir, 0);
            total += gold;
        }
        assert!(mine.health.is_dead());
        assert_eq!(total, 1000);
    }

    #[test]
    fn test_non_resource_has_no_loot() {
        let mut stats = mine_stats();
        stats.gold = 500;
        let hall = Structure::from_stats(
            StructureId(0),
            StructureKind::TownHall,
            1,
            TilePos::new(5, 5),
            &stats,
        );
        assert!(hall.loot.is_none());
    }

    #[test]
    fn test_unit_reset_clears_route_and_targets() {
        let mut unit = Unit::new(
            UnitId(0),
            UnitKind::Barbarian,
            1,
            0,
            barbarian_stats(),
            TilePos::new(0, 0),
        );
        unit.target = Some(StructureId(4));
        unit.breach = Some(StructureId(2));
        unit.route = vec![TilePos::new(1, 1)];
        unit.stranded = true;
        assert_eq!(unit.engaged(), Some(StructureId(2)));
        assert!(unit.refers_to(StructureId(4)));
        unit.reset_target();
        assert_eq!(unit.engaged(), None);
        assert!(unit.route.is_empty());
        assert!(!unit.stranded);
    }
}
