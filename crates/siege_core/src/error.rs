//! Error types for the siege engine.
//!
//! Configuration problems surface as [`CatalogError`] before an encounter
//! exists. Placement and deployment refusals are recoverable and carry a
//! stable reason code so drivers can report a declined action.

use thiserror::Error;

use crate::components::{StructureKind, TilePos, UnitKind};

/// Result type alias using [`SiegeError`].
pub type Result<T> = std::result::Result<T, SiegeError>;

/// Top-level error type for the engine.
#[derive(Debug, Error)]
pub enum SiegeError {
    /// Stat catalog is missing an entry or holds invalid values.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A structure could not be placed.
    #[error(transparent)]
    Placement(#[from] PlacementError),

    /// A unit could not be deployed.
    #[error(transparent)]
    Deploy(#[from] DeployError),

    /// Invalid simulation state (snapshot decode failures and similar).
    #[error("Invalid simulation state: {0}")]
    InvalidState(String),
}

/// Stat catalog errors. Always fatal for the encounter being built.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Catalog text failed to parse.
    #[error("Failed to parse stat catalog: {0}")]
    Parse(String),

    /// No stats for the requested structure kind and level.
    #[error("No stats for structure {kind:?} at level {level}")]
    MissingStructure {
        /// Structure kind looked up.
        kind: StructureKind,
        /// Level looked up.
        level: u8,
    },

    /// No stats for the requested unit kind and level.
    #[error("No stats for unit {kind:?} at level {level}")]
    MissingUnit {
        /// Unit kind looked up.
        kind: UnitKind,
        /// Level looked up.
        level: u8,
    },

    /// No tier entry for the requested command-structure level.
    #[error("No town hall tier {0}")]
    MissingTier(u8),

    /// An entry holds values the engine cannot simulate.
    #[error("Invalid catalog entry {entry}: {reason}")]
    Invalid {
        /// Human readable entry name.
        entry: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The roster needs more housing than the tier allows.
    #[error("Roster needs {required} housing space, capacity is {capacity}")]
    HousingExceeded {
        /// Housing required by the roster.
        required: u64,
        /// Housing capacity available.
        capacity: u32,
    },
}

/// Why a structure placement was declined.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// Footprint overlaps an existing structure.
    #[error("Footprint at {origin:?} overlaps structure {existing}")]
    Overlap {
        /// Requested origin.
        origin: TilePos,
        /// Id of a structure already on one of the tiles.
        existing: u32,
    },

    /// Footprint leaves the buildable area.
    #[error("Footprint {width}x{height} at {origin:?} is outside the buildable area")]
    OutOfBounds {
        /// Requested origin.
        origin: TilePos,
        /// Footprint width.
        width: u8,
        /// Footprint height.
        height: u8,
    },

    /// The per-kind count cap is already reached.
    #[error("Already placed {max} of {kind:?}")]
    CountExceeded {
        /// Structure kind.
        kind: StructureKind,
        /// Cap for this kind.
        max: u32,
    },

    /// The catalog has no stats for this kind and level.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl PlacementError {
    /// Stable reason code reported to drivers.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::Overlap { .. } => "overlap",
            Self::OutOfBounds { .. } => "out_of_bounds",
            Self::CountExceeded { .. } => "count_exceeded",
            Self::Catalog(_) => "unknown_stats",
        }
    }
}

/// Why a unit deployment was declined.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeployError {
    /// Roster slot index does not exist.
    #[error("Unknown roster slot {0}")]
    UnknownSlot(usize),

    /// Roster slot has no units left.
    #[error("Roster slot {0} has no units left")]
    SlotExhausted(usize),

    /// Tile is off the grid.
    #[error("Tile {0:?} is outside the grid")]
    OutOfBounds(TilePos),

    /// Tile is covered by a structure footprint.
    #[error("Tile {tile:?} is occupied by structure {structure}")]
    TileOccupied {
        /// Requested tile.
        tile: TilePos,
        /// Occupying structure id.
        structure: u32,
    },

    /// Encounter is already over.
    #[error("Encounter has ended")]
    EncounterEnded,
}

impl DeployError {
    /// Stable reason code reported to drivers.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::UnknownSlot(_) => "unknown_slot",
            Self::SlotExhausted(_) => "slot_exhausted",
            Self::OutOfBounds(_) => "out_of_bounds",
            Self::TileOccupied { .. } => "tile_occupied",
            Self::EncounterEnded => "encounter_ended",
        }
    }
}
