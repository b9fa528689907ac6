//! In-crate test helpers. Integration tests use `siege_test_utils` instead.

use crate::components::{StructureId, StructureKind, TargetDomain, TargetPreference, TilePos, UnitId, UnitKind};
use crate::data::{
    CatalogFile, DefenseStats, StatCatalog, StructureEntry, StructureStats, TierStructure, TownHallTier,
    UnitEntry, UnitStats,
};
use crate::math::Fixed;
use crate::registry::{EntityRegistry, Structure, Unit};

fn defense(min: i32, max: i32, cadence_ms: u32, damage_per_hit: u32, domain: TargetDomain) -> Option<DefenseStats> {
    Some(DefenseStats {
        min_range: Fixed::from_num(min),
        max_range: Fixed::from_num(max),
        cadence_ms,
        damage_per_hit,
        target_domain: domain,
    })
}

pub fn structure_stats(kind: StructureKind) -> StructureStats {
    let base = StructureStats {
        hitpoints: 300,
        footprint: (3, 3),
        defense: None,
        gold: 0,
        elixir: 0,
    };
    match kind {
        StructureKind::Wall => StructureStats {
            footprint: (1, 1),
            ..base
        },
        StructureKind::TownHall => StructureStats {
            hitpoints: 1500,
            footprint: (4, 4),
            ..base
        },
        StructureKind::GoldMine => StructureStats {
            hitpoints: 400,
            gold: 1000,
            ..base
        },
        StructureKind::ElixirPump => StructureStats {
            hitpoints: 400,
            elixir: 1000,
            ..base
        },
        StructureKind::Cannon => StructureStats {
            hitpoints: 420,
            defense: defense(0, 9, 800, 7, TargetDomain::Ground),
            ..base
        },
        StructureKind::Mortar => StructureStats {
            hitpoints: 400,
            defense: defense(4, 11, 5000, 20, TargetDomain::Ground),
            ..base
        },
        StructureKind::ArcherTower => StructureStats {
            hitpoints: 380,
            defense: defense(0, 10, 500, 6, TargetDomain::Both),
            ..base
        },
        StructureKind::AirDefense => StructureStats {
            hitpoints: 800,
            defense: defense(0, 10, 1000, 80, TargetDomain::Air),
            ..base
        },
        _ => base,
    }
}

pub fn unit_stats(kind: UnitKind, preference: TargetPreference, is_flying: bool) -> UnitStats {
    UnitStats {
        hitpoints: 100,
        damage_per_hit: 10,
        attack_range: Fixed::from_num(0.4),
        cadence_ms: 1000,
        movement_speed: Fixed::from_num(2),
        housing_space: if kind == UnitKind::Giant { 5 } else { 1 },
        is_flying,
        preference,
    }
}

pub fn catalog() -> StatCatalog {
    catalog_with_tiers(Vec::new())
}

pub fn tier(level: u8, army_capacity: u32, caps: &[(StructureKind, u32)], units: &[UnitKind]) -> TownHallTier {
    TownHallTier {
        level,
        army_capacity,
        structures: caps
            .iter()
            .map(|&(kind, max_count)| TierStructure {
                kind,
                level: 1,
                max_count,
            })
            .collect(),
        units: units.iter().map(|&kind| (kind, 1)).collect(),
    }
}

pub fn catalog_with_tiers(tiers: Vec<TownHallTier>) -> StatCatalog {
    let file = CatalogFile {
        structures: StructureKind::ALL
            .iter()
            .map(|&kind| StructureEntry {
                kind,
                levels: vec![structure_stats(kind)],
            })
            .collect(),
        units: UnitKind::ALL
            .iter()
            .map(|&kind| UnitEntry {
                kind,
                levels: vec![unit_stats(
                    kind,
                    TargetPreference::Any,
                    kind == UnitKind::Balloon,
                )],
            })
            .collect(),
        tiers,
    };
    StatCatalog::from_file(file).expect("test catalog is valid")
}

pub fn push_structure(registry: &mut EntityRegistry, kind: StructureKind, origin: (i32, i32)) -> StructureId {
    let id = registry.next_structure_id();
    let origin = TilePos::new(origin.0, origin.1);
    registry.insert_structure(Structure::from_stats(id, kind, 1, origin, &structure_stats(kind)))
}

pub fn unit(kind: UnitKind, preference: TargetPreference, is_flying: bool, tile: (i32, i32)) -> Unit {
    Unit::new(
        UnitId(0),
        kind,
        1,
        0,
        unit_stats(kind, preference, is_flying),
        TilePos::new(tile.0, tile.1),
    )
}

pub fn push_unit(registry: &mut EntityRegistry, kind: UnitKind, is_flying: bool, tile: (i32, i32)) -> UnitId {
    let mut unit = unit(kind, TargetPreference::Any, is_flying, tile);
    unit.id = registry.next_unit_id();
    registry.insert_unit(unit)
}
