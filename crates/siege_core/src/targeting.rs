//! Target selection for units and defensive structures.
//!
//! Units pick the nearest structure from their preference set, measured from
//! their tile to the closest footprint tile. Structures pick the first unit,
//! in id order, inside their firing ring measured from the footprint centre.

use crate::components::{Footprint, StructureId, TargetPreference, TilePos, UnitId};
use crate::data::DefenseStats;
use crate::math::{Fixed, Vec2Fixed};
use crate::registry::{EntityRegistry, Structure, Unit};

/// Squared reach used for every "is the unit close enough" test.
///
/// Melee units with a range below one tile still reach diagonally adjacent
/// footprint tiles, so reach never drops below √2.
#[must_use]
pub fn reach_squared(attack_range: Fixed) -> Fixed {
    let two = Fixed::from_num(2);
    let sq = attack_range.saturating_mul(attack_range);
    if sq > two {
        sq
    } else {
        two
    }
}

/// Whether `tile` is within reach of the closest tile of `footprint`.
#[must_use]
pub fn within_reach(tile: TilePos, footprint: &Footprint, reach_sq: Fixed) -> bool {
    Fixed::from_num(footprint.distance_sq_to(tile)) <= reach_sq
}

/// Whether a unit on `tile` sits inside a structure's firing ring.
#[must_use]
pub fn in_firing_ring(centre: Vec2Fixed, tile: TilePos, defense: &DefenseStats) -> bool {
    let d2 = centre.distance_squared(tile.to_fixed());
    let min = defense.min_range.saturating_mul(defense.min_range);
    let max = defense.max_range.saturating_mul(defense.max_range);
    d2 >= min && d2 <= max
}

fn nearest_matching(
    registry: &EntityRegistry,
    tile: TilePos,
    preference: TargetPreference,
) -> Option<StructureId> {
    registry
        .structures()
        .filter(|s| preference.accepts(s.category()))
        .min_by_key(|s| (s.footprint.distance_sq_to(tile), s.id))
        .map(|s| s.id)
}

/// Pick a structure for a unit to attack.
///
/// Falls back to the no-preference set when nothing matches the unit's own
/// preference. Returns `None` only when no non-wall structure is left (or, for
/// wall seekers, no structure at all).
#[must_use]
pub fn select_structure_target(registry: &EntityRegistry, unit: &Unit) -> Option<StructureId> {
    let preference = unit.stats.preference;
    let choice = nearest_matching(registry, unit.tile, preference).or_else(|| {
        if preference == TargetPreference::Any {
            None
        } else {
            nearest_matching(registry, unit.tile, TargetPreference::Any)
        }
    });
    tracing::trace!(unit = unit.id.0, ?preference, target = ?choice, "Unit target selected");
    choice
}

/// Pick a unit for a defensive structure to fire at.
///
/// The first live unit in id order that the structure can hit and that stands
/// inside its firing ring wins.
#[must_use]
pub fn select_unit_target(registry: &EntityRegistry, structure: &Structure) -> Option<UnitId> {
    let defense = structure.defense.as_ref()?;
    let centre = structure.footprint.centroid();
    registry
        .units()
        .find(|u| {
            defense.stats.target_domain.can_hit(u.is_flying())
                && in_firing_ring(centre, u.tile, &defense.stats)
        })
        .map(|u| u.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{StructureKind, TargetDomain, UnitKind};
    use crate::testing;

    #[test]
    fn test_reach_has_melee_floor() {
        assert_eq!(reach_squared(Fixed::from_num(0.4)), Fixed::from_num(2));
        assert_eq!(reach_squared(Fixed::from_num(3)), Fixed::from_num(9));
    }

    #[test]
    fn test_preference_picks_nearest_in_set() {
        let mut registry = EntityRegistry::new();
        let far_cannon = testing::push_structure(&mut registry, StructureKind::Cannon, (30, 30));
        let near_mine = testing::push_structure(&mut registry, StructureKind::GoldMine, (6, 6));
        let giant = testing::unit(UnitKind::Giant, TargetPreference::Defensive, false, (3, 3));
        let barbarian = testing::unit(UnitKind::Barbarian, TargetPreference::Any, false, (3, 3));

        assert_eq!(select_structure_target(&registry, &giant), Some(far_cannon));
        assert_eq!(select_structure_target(&registry, &barbarian), Some(near_mine));
    }

    #[test]
    fn test_empty_preference_falls_back_to_any() {
        let mut registry = EntityRegistry::new();
        testing::push_structure(&mut registry, StructureKind::Wall, (5, 5));
        let hall = testing::push_structure(&mut registry, StructureKind::TownHall, (20, 20));
        let giant = testing::unit(UnitKind::Giant, TargetPreference::Defensive, false, (3, 3));
        assert_eq!(select_structure_target(&registry, &giant), Some(hall));
    }

    #[test]
    fn test_walls_never_chosen_without_wall_preference() {
        let mut registry = EntityRegistry::new();
        testing::push_structure(&mut registry, StructureKind::Wall, (5, 5));
        let barbarian = testing::unit(UnitKind::Barbarian, TargetPreference::Any, false, (4, 4));
        assert_eq!(select_structure_target(&registry, &barbarian), None);

        let breaker = testing::unit(UnitKind::WallBreaker, TargetPreference::Walls, false, (4, 4));
        assert_eq!(
            select_structure_target(&registry, &breaker),
            Some(StructureId(0))
        );
    }

    #[test]
    fn test_distance_ties_break_on_lowest_id() {
        let mut registry = EntityRegistry::new();
        let left = testing::push_structure(&mut registry, StructureKind::GoldMine, (5, 10));
        let _right = testing::push_structure(&mut registry, StructureKind::GoldMine, (13, 10));
        let unit = testing::unit(UnitKind::Barbarian, TargetPreference::Any, false, (10, 11));
        // Both mines are three tiles away from (10, 11).
        assert_eq!(select_structure_target(&registry, &unit), Some(left));
    }

    #[test]
    fn test_unit_target_respects_domain_and_ring() {
        let mut registry = EntityRegistry::new();
        let mortar = testing::push_structure(&mut registry, StructureKind::Mortar, (20, 20));
        // Centre is (21, 21); the ring is [4, 11].
        testing::push_unit(&mut registry, UnitKind::Barbarian, false, (22, 21));
        testing::push_unit(&mut registry, UnitKind::Balloon, true, (27, 21));
        let far = testing::push_unit(&mut registry, UnitKind::Barbarian, false, (28, 21));

        let structure = registry.structure(mortar).unwrap();
        assert_eq!(
            structure.defense.as_ref().unwrap().stats.target_domain,
            TargetDomain::Ground
        );
        assert_eq!(select_unit_target(&registry, structure), Some(far));
    }

    #[test]
    fn test_first_unit_in_id_order_wins() {
        let mut registry = EntityRegistry::new();
        let cannon = testing::push_structure(&mut registry, StructureKind::Cannon, (20, 20));
        let first = testing::push_unit(&mut registry, UnitKind::Barbarian, false, (27, 21));
        testing::push_unit(&mut registry, UnitKind::Barbarian, false, (23, 21));
        let structure = registry.structure(cannon).unwrap();
        assert_eq!(select_unit_target(&registry, structure), Some(first));
    }
}
