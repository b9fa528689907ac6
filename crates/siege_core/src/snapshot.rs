//! Plain-data views of the battlefield.
//!
//! Snapshots carry no references into the simulation, so they can be written
//! out as JSON or RON by a renderer, a replay tool or a test without holding a
//! borrow on the encounter.

use serde::{Deserialize, Serialize};

use crate::components::{StructureId, StructureKind, TilePos, UnitId, UnitKind};
use crate::grid::GridWorld;
use crate::math::{fixed_decimal, Fixed};
use crate::registry::EntityRegistry;

/// One live structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureView {
    /// Id.
    pub id: StructureId,
    /// Kind.
    pub kind: StructureKind,
    /// Level.
    pub level: u8,
    /// Top-left footprint tile.
    pub origin: TilePos,
    /// Footprint width.
    pub width: u8,
    /// Footprint height.
    pub height: u8,
    /// Current hitpoints.
    pub hitpoints: u32,
    /// Maximum hitpoints.
    pub max_hitpoints: u32,
    /// Unit being fired at, for defenses.
    pub target: Option<UnitId>,
}

/// One live unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitView {
    /// Id.
    pub id: UnitId,
    /// Kind.
    pub kind: UnitKind,
    /// Occupied tile.
    pub tile: TilePos,
    /// Interpolated x position in tiles.
    #[serde(with = "fixed_decimal")]
    pub x: Fixed,
    /// Interpolated y position in tiles.
    #[serde(with = "fixed_decimal")]
    pub y: Fixed,
    /// Current hitpoints.
    pub hitpoints: u32,
    /// Structure being attacked or walked to.
    pub target: Option<StructureId>,
    /// Whether the unit flies.
    pub flying: bool,
}

/// An occupied tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileView {
    /// Position.
    pub pos: TilePos,
    /// Structure covering the tile.
    pub structure: Option<StructureId>,
    /// Units standing on the tile.
    pub units: Vec<UnitId>,
}

/// Everything visible at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    /// Tick the snapshot was taken after.
    pub tick: u64,
    /// Grid side length.
    pub size: i32,
    /// Live structures in id order.
    pub structures: Vec<StructureView>,
    /// Live units in id order.
    pub units: Vec<UnitView>,
    /// Tiles holding a structure or a unit, row-major.
    pub tiles: Vec<TileView>,
}

impl GridSnapshot {
    pub(crate) fn capture(tick: u64, grid: &GridWorld, registry: &EntityRegistry) -> Self {
        let structures = registry
            .structures()
            .map(|s| StructureView {
                id: s.id,
                kind: s.kind,
                level: s.level,
                origin: s.footprint.origin,
                width: s.footprint.width,
                height: s.footprint.height,
                hitpoints: s.health.current,
                max_hitpoints: s.health.max,
                target: s.defense.as_ref().and_then(|d| d.target),
            })
            .collect();

        let units = registry
            .units()
            .map(|u| {
                let position = u.tile.to_fixed() + u.offset;
                UnitView {
                    id: u.id,
                    kind: u.kind,
                    tile: u.tile,
                    x: position.x,
                    y: position.y,
                    hitpoints: u.health.current,
                    target: u.engaged(),
                    flying: u.is_flying(),
                }
            })
            .collect();

        let tiles = grid
            .tiles()
            .filter(|(_, tile)| tile.structure().is_some() || !tile.units().is_empty())
            .map(|(pos, tile)| TileView {
                pos,
                structure: tile.structure(),
                units: tile.units().to_vec(),
            })
            .collect();

        Self {
            tick,
            size: grid.size(),
            structures,
            units,
            tiles,
        }
    }

    /// Live structure by id.
    #[must_use]
    pub fn structure(&self, id: StructureId) -> Option<&StructureView> {
        self.structures.iter().find(|s| s.id == id)
    }

    /// Live unit by id.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&UnitView> {
        self.units.iter().find(|u| u.id == id)
    }
}
