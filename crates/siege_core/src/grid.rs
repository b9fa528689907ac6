//! Tile grid occupancy.
//!
//! The grid answers "what is on this tile" for both structures and units and
//! owns the per-kind placement counts used to enforce count caps. Structures
//! claim every tile of their footprint; units claim exactly one tile and may
//! share it with other units.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{Footprint, StructureId, StructureKind, TilePos, UnitId};
use crate::error::PlacementError;

/// Side length of the square grid.
pub const GRID_SIZE: i32 = 45;

/// Border rows and columns where nothing may be built.
pub const BUILD_MARGIN: i32 = 2;

/// A single grid cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    structure: Option<StructureId>,
    blocks_ground: bool,
    units: Vec<UnitId>,
}

impl Tile {
    /// Structure whose footprint covers this tile.
    #[must_use]
    pub const fn structure(&self) -> Option<StructureId> {
        self.structure
    }

    /// Units standing on this tile, in arrival order.
    #[must_use]
    pub fn units(&self) -> &[UnitId] {
        &self.units
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Placement {
    kind: StructureKind,
    footprint: Footprint,
}

/// Fixed-size tile grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridWorld {
    size: i32,
    margin: i32,
    tiles: Vec<Tile>,
    placements: BTreeMap<StructureId, Placement>,
    placed_counts: BTreeMap<StructureKind, u32>,
    count_caps: Option<BTreeMap<StructureKind, u32>>,
}

impl GridWorld {
    /// Standard 45x45 grid with a 2 tile margin and no count caps.
    #[must_use]
    pub fn new() -> Self {
        Self::with_size(GRID_SIZE, BUILD_MARGIN)
    }

    /// Grid of arbitrary size.
    ///
    /// # Panics
    ///
    /// Panics if the margin leaves no buildable tile.
    #[must_use]
    pub fn with_size(size: i32, margin: i32) -> Self {
        assert!(size > 2 * margin, "grid must have buildable tiles");
        let cells = (size * size) as usize;
        Self {
            size,
            margin,
            tiles: vec![Tile::default(); cells],
            placements: BTreeMap::new(),
            placed_counts: BTreeMap::new(),
            count_caps: None,
        }
    }

    /// Enforce per-kind count caps on future placements. Kinds missing from
    /// the map have a cap of zero.
    pub fn set_count_caps(&mut self, caps: BTreeMap<StructureKind, u32>) {
        self.count_caps = Some(caps);
    }

    /// Side length in tiles.
    #[must_use]
    pub const fn size(&self) -> i32 {
        self.size
    }

    /// Whether the tile is on the grid.
    #[must_use]
    pub const fn in_bounds(&self, tile: TilePos) -> bool {
        tile.x >= 0 && tile.y >= 0 && tile.x < self.size && tile.y < self.size
    }

    /// Whether the tile is inside the buildable area.
    #[must_use]
    pub const fn in_buildable(&self, tile: TilePos) -> bool {
        let hi = self.size - self.margin;
        tile.x >= self.margin && tile.y >= self.margin && tile.x < hi && tile.y < hi
    }

    fn index(&self, tile: TilePos) -> Option<usize> {
        self.in_bounds(tile)
            .then(|| (tile.y * self.size + tile.x) as usize)
    }

    /// Tile at a position, `None` when off the grid.
    #[must_use]
    pub fn tile(&self, tile: TilePos) -> Option<&Tile> {
        self.index(tile).map(|i| &self.tiles[i])
    }

    /// All tiles, row-major, with their positions.
    pub fn tiles(&self) -> impl Iterator<Item = (TilePos, &Tile)> {
        let size = self.size;
        self.tiles
            .iter()
            .enumerate()
            .map(move |(i, t)| (TilePos::new(i as i32 % size, i as i32 / size), t))
    }

    /// True when every footprint tile is buildable and free of structures.
    #[must_use]
    pub fn can_place(&self, origin: TilePos, width: u8, height: u8) -> bool {
        let footprint = Footprint::new(origin, width, height);
        footprint
            .tiles()
            .all(|t| self.in_buildable(t) && self.structure_at(t).is_none())
    }

    /// Check a placement without applying it.
    pub fn check_placement(
        &self,
        kind: StructureKind,
        footprint: Footprint,
    ) -> Result<(), PlacementError> {
        if let Some(caps) = &self.count_caps {
            let max = caps.get(&kind).copied().unwrap_or(0);
            if self.placed_count(kind) >= max {
                return Err(PlacementError::CountExceeded { kind, max });
            }
        }
        if footprint.width == 0
            || footprint.height == 0
            || !footprint.tiles().all(|t| self.in_buildable(t))
        {
            return Err(PlacementError::OutOfBounds {
                origin: footprint.origin,
                width: footprint.width,
                height: footprint.height,
            });
        }
        if let Some(existing) = footprint.tiles().find_map(|t| self.structure_at(t)) {
            return Err(PlacementError::Overlap {
                origin: footprint.origin,
                existing: existing.0,
            });
        }
        Ok(())
    }

    /// Claim a footprint for a structure. Nothing changes on error.
    pub fn place(
        &mut self,
        id: StructureId,
        kind: StructureKind,
        footprint: Footprint,
    ) -> Result<(), PlacementError> {
        self.check_placement(kind, footprint)?;
        debug_assert!(!self.placements.contains_key(&id), "structure id reused");

        let blocks_ground = kind == StructureKind::Wall;
        for tile in footprint.tiles() {
            if let Some(i) = self.index(tile) {
                self.tiles[i].structure = Some(id);
                self.tiles[i].blocks_ground = blocks_ground;
            }
        }
        self.placements.insert(id, Placement { kind, footprint });
        *self.placed_counts.entry(kind).or_insert(0) += 1;
        debug_assert!(self.verify_footprint(id));
        Ok(())
    }

    /// Release a structure's footprint. Returns false if it was not placed.
    pub fn remove(&mut self, id: StructureId) -> bool {
        let Some(placement) = self.placements.remove(&id) else {
            return false;
        };
        for tile in placement.footprint.tiles() {
            if let Some(i) = self.index(tile) {
                debug_assert_eq!(self.tiles[i].structure, Some(id));
                self.tiles[i].structure = None;
                self.tiles[i].blocks_ground = false;
            }
        }
        if let Some(count) = self.placed_counts.get_mut(&placement.kind) {
            *count = count.saturating_sub(1);
        }
        true
    }

    /// Number of structures of a kind currently on the grid.
    #[must_use]
    pub fn placed_count(&self, kind: StructureKind) -> u32 {
        self.placed_counts.get(&kind).copied().unwrap_or(0)
    }

    /// Structure covering a tile.
    #[must_use]
    pub fn structure_at(&self, tile: TilePos) -> Option<StructureId> {
        self.tile(tile).and_then(|t| t.structure)
    }

    /// Units on a tile.
    #[must_use]
    pub fn units_at(&self, tile: TilePos) -> &[UnitId] {
        self.tile(tile).map_or(&[], |t| t.units.as_slice())
    }

    /// Put a unit on a tile.
    pub fn unit_enter(&mut self, tile: TilePos, unit: UnitId) {
        if let Some(i) = self.index(tile) {
            debug_assert!(!self.tiles[i].units.contains(&unit));
            self.tiles[i].units.push(unit);
        }
    }

    /// Take a unit off a tile. Returns false if it was not there.
    pub fn unit_leave(&mut self, tile: TilePos, unit: UnitId) -> bool {
        let Some(i) = self.index(tile) else {
            return false;
        };
        let units = &mut self.tiles[i].units;
        match units.iter().position(|u| *u == unit) {
            Some(pos) => {
                units.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Whether a unit may stand on or route through a tile. Standing walls
    /// block ground units; flying units ignore them.
    #[must_use]
    pub fn passable(&self, tile: TilePos, is_flying: bool) -> bool {
        self.tile(tile)
            .is_some_and(|t| is_flying || !t.blocks_ground)
    }

    /// True when exactly the structure's declared footprint references it.
    #[must_use]
    pub fn verify_footprint(&self, id: StructureId) -> bool {
        let Some(placement) = self.placements.get(&id) else {
            return false;
        };
        let declared = placement
            .footprint
            .tiles()
            .all(|t| self.structure_at(t) == Some(id));
        let claimed = self.tiles.iter().filter(|t| t.structure == Some(id)).count();
        declared && claimed == placement.footprint.tiles().count()
    }

    /// Footprint recorded for a structure.
    #[must_use]
    pub fn footprint_of(&self, id: StructureId) -> Option<Footprint> {
        self.placements.get(&id).map(|p| p.footprint)
    }

    /// Placed structure ids in ascending order.
    pub fn structure_ids(&self) -> impl Iterator<Item = StructureId> + '_ {
        self.placements.keys().copied()
    }
}

impl Default for GridWorld {
    fn default() -> Self {
        Self::new()
    }
}
