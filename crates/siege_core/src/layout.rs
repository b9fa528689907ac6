//! Pre-encounter base construction.
//!
//! A [`BaseLayout`] is the only place structures can be created. Once it is
//! handed to [`Simulation::new`](crate::simulation::Simulation::new) the grid
//! and registry move into the encounter and no further placement is possible.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::components::{Footprint, StructureId, StructureKind, TilePos};
use crate::data::StatCatalog;
use crate::error::PlacementError;
use crate::grid::GridWorld;
use crate::registry::{EntityRegistry, Structure};

/// Persisted form of one placed structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEntry {
    /// Structure kind.
    pub kind: StructureKind,
    /// Level.
    pub level: u8,
    /// Top-left footprint tile.
    pub origin: TilePos,
}

/// A base under construction.
#[derive(Debug, Clone)]
pub struct BaseLayout {
    catalog: Arc<StatCatalog>,
    town_hall_level: Option<u8>,
    grid: GridWorld,
    registry: EntityRegistry,
}

impl BaseLayout {
    /// Empty base without count caps.
    #[must_use]
    pub fn new(catalog: Arc<StatCatalog>) -> Self {
        Self {
            catalog,
            town_hall_level: None,
            grid: GridWorld::new(),
            registry: EntityRegistry::new(),
        }
    }

    /// Empty base whose count caps come from a town hall tier.
    pub fn for_town_hall(
        catalog: Arc<StatCatalog>,
        level: u8,
    ) -> Result<Self, crate::error::CatalogError> {
        let caps: BTreeMap<StructureKind, u32> = catalog
            .tier(level)?
            .structures
            .iter()
            .map(|s| (s.kind, s.max_count))
            .collect();
        let mut layout = Self::new(catalog);
        layout.town_hall_level = Some(level);
        layout.grid.set_count_caps(caps);
        Ok(layout)
    }

    /// Catalog used for stat lookups.
    #[must_use]
    pub fn catalog(&self) -> &Arc<StatCatalog> {
        &self.catalog
    }

    /// Tier the caps come from, if any.
    #[must_use]
    pub const fn town_hall_level(&self) -> Option<u8> {
        self.town_hall_level
    }

    /// Grid as built so far.
    #[must_use]
    pub const fn grid(&self) -> &GridWorld {
        &self.grid
    }

    /// Structures placed so far.
    #[must_use]
    pub const fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Place a structure. The layout is unchanged on error.
    pub fn place_structure(
        &mut self,
        kind: StructureKind,
        level: u8,
        origin: TilePos,
    ) -> Result<StructureId, PlacementError> {
        let stats = self.catalog.structure_stats(kind, level)?;
        let (width, height) = stats.footprint;
        let id = self.registry.next_structure_id();
        self.grid
            .place(id, kind, Footprint::new(origin, width, height))?;
        let structure = Structure::from_stats(id, kind, level, origin, stats);
        tracing::trace!(id = id.0, ?kind, level, x = origin.x, y = origin.y, "Structure placed");
        Ok(self.registry.insert_structure(structure))
    }

    /// Remove a previously placed structure.
    pub fn remove_structure(&mut self, id: StructureId) -> bool {
        self.grid.remove(id) && self.registry.remove_structure(id).is_some()
    }

    /// Place every entry, stopping at the first refusal.
    pub fn place_all(&mut self, entries: &[LayoutEntry]) -> Result<Vec<StructureId>, PlacementError> {
        entries
            .iter()
            .map(|e| self.place_structure(e.kind, e.level, e.origin))
            .collect()
    }

    /// Plain data describing the current layout, in id order.
    #[must_use]
    pub fn entries(&self) -> Vec<LayoutEntry> {
        self.registry
            .structures()
            .map(|s| LayoutEntry {
                kind: s.kind,
                level: s.level,
                origin: s.footprint.origin,
            })
            .collect()
    }

    pub(crate) fn into_parts(self) -> (GridWorld, EntityRegistry) {
        (self.grid, self.registry)
    }
}
