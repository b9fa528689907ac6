//! Identifiers, kinds and small value types shared by every engine module.

use serde::{Deserialize, Serialize};

use crate::math::{Fixed, Vec2Fixed};

/// Stable identifier of a placed structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StructureId(pub u32);

/// Stable identifier of a deployed unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl StructureId {
    /// Index into dense entity tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl UnitId {
    /// Index into dense entity tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Broad role of a structure. Drives targeting preference sets and scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureCategory {
    /// The command structure (town hall).
    Command,
    /// Resource producers and stores.
    Resource,
    /// Structures that fire at units.
    Defensive,
    /// Walls.
    Wall,
    /// Everything else.
    Other,
}

/// Every structure kind the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StructureKind {
    /// Command structure.
    TownHall,
    /// Gold producer.
    GoldMine,
    /// Elixir producer.
    ElixirPump,
    /// Gold store.
    GoldStorage,
    /// Elixir store.
    ElixirStorage,
    /// Ground-only single target defense.
    Cannon,
    /// Air and ground defense.
    ArcherTower,
    /// Slow long range ground defense with a blind spot.
    Mortar,
    /// Air-only defense.
    AirDefense,
    /// Air and ground short range defense.
    WizardTower,
    /// 1x1 blocker.
    Wall,
    /// Reinforcement castle.
    ClanCastle,
    /// Army camp.
    ArmyCamp,
    /// Barracks.
    Barrack,
    /// Laboratory.
    Laboratory,
    /// Spell factory.
    SpellForge,
    /// Builder's hut.
    BuilderHut,
}

impl StructureKind {
    /// All kinds in declaration order.
    pub const ALL: [Self; 17] = [
        Self::TownHall,
        Self::GoldMine,
        Self::ElixirPump,
        Self::GoldStorage,
        Self::ElixirStorage,
        Self::Cannon,
        Self::ArcherTower,
        Self::Mortar,
        Self::AirDefense,
        Self::WizardTower,
        Self::Wall,
        Self::ClanCastle,
        Self::ArmyCamp,
        Self::Barrack,
        Self::Laboratory,
        Self::SpellForge,
        Self::BuilderHut,
    ];

    /// Category this kind belongs to.
    #[must_use]
    pub const fn category(self) -> StructureCategory {
        match self {
            Self::TownHall => StructureCategory::Command,
            Self::GoldMine | Self::ElixirPump | Self::GoldStorage | Self::ElixirStorage => {
                StructureCategory::Resource
            }
            Self::Cannon
            | Self::ArcherTower
            | Self::Mortar
            | Self::AirDefense
            | Self::WizardTower => StructureCategory::Defensive,
            Self::Wall => StructureCategory::Wall,
            Self::ClanCastle
            | Self::ArmyCamp
            | Self::Barrack
            | Self::Laboratory
            | Self::SpellForge
            | Self::BuilderHut => StructureCategory::Other,
        }
    }
}

/// Every unit kind the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Melee all-rounder.
    Barbarian,
    /// Ranged all-rounder.
    Archer,
    /// Tank that goes for defenses.
    Giant,
    /// Fast raider that goes for resources.
    Goblin,
    /// Suicide unit that goes for walls.
    WallBreaker,
    /// Flying bomber that goes for defenses.
    Balloon,
    /// Ranged glass cannon.
    Wizard,
}

impl UnitKind {
    /// All kinds in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Barbarian,
        Self::Archer,
        Self::Giant,
        Self::Goblin,
        Self::WallBreaker,
        Self::Balloon,
        Self::Wizard,
    ];
}

/// Which units an attacker can hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetDomain {
    /// Only units on the ground.
    Ground,
    /// Only flying units.
    Air,
    /// Everything.
    Both,
}

impl TargetDomain {
    /// Whether a unit with the given flying flag is hittable.
    #[must_use]
    pub const fn can_hit(self, is_flying: bool) -> bool {
        match self {
            Self::Ground => !is_flying,
            Self::Air => is_flying,
            Self::Both => true,
        }
    }
}

/// Structure preference class of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetPreference {
    /// Defensive structures only.
    Defensive,
    /// Resource structures and the command structure.
    Resources,
    /// Walls only. Units with this preference detonate on their first wall hit.
    Walls,
    /// Anything except walls.
    Any,
}

impl TargetPreference {
    /// Whether a structure category belongs to this preference set.
    #[must_use]
    pub const fn accepts(self, category: StructureCategory) -> bool {
        match self {
            Self::Defensive => matches!(category, StructureCategory::Defensive),
            Self::Resources => matches!(
                category,
                StructureCategory::Resource | StructureCategory::Command
            ),
            Self::Walls => matches!(category, StructureCategory::Wall),
            Self::Any => !matches!(category, StructureCategory::Wall),
        }
    }
}

/// Integer tile coordinate. Signed so that off-grid requests can be expressed
/// and rejected instead of wrapping.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct TilePos {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl TilePos {
    /// Create a tile position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offset by a direction.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Squared euclidean distance in whole tiles.
    #[must_use]
    pub const fn distance_sq(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        dx * dx + dy * dy
    }

    /// Tile position as a fixed-point point.
    #[must_use]
    pub fn to_fixed(self) -> Vec2Fixed {
        Vec2Fixed::new(Fixed::from_num(self.x), Fixed::from_num(self.y))
    }
}

/// Rectangular set of tiles a structure covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    /// Top-left tile.
    pub origin: TilePos,
    /// Width in tiles.
    pub width: u8,
    /// Height in tiles.
    pub height: u8,
}

impl Footprint {
    /// Create a footprint.
    #[must_use]
    pub const fn new(origin: TilePos, width: u8, height: u8) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }

    /// All covered tiles, row-major.
    pub fn tiles(self) -> impl Iterator<Item = TilePos> {
        let origin = self.origin;
        let width = i32::from(self.width);
        (0..i32::from(self.height))
            .flat_map(move |dy| (0..width).map(move |dx| origin.offset(dx, dy)))
    }

    /// Whether a tile lies inside the footprint.
    #[must_use]
    pub const fn contains(&self, tile: TilePos) -> bool {
        tile.x >= self.origin.x
            && tile.y >= self.origin.y
            && tile.x < self.origin.x + self.width as i32
            && tile.y < self.origin.y + self.height as i32
    }

    /// Covered tile closest to `tile`.
    #[must_use]
    pub fn nearest_tile(&self, tile: TilePos) -> TilePos {
        let max_x = self.origin.x + i32::from(self.width) - 1;
        let max_y = self.origin.y + i32::from(self.height) - 1;
        TilePos::new(
            tile.x.clamp(self.origin.x, max_x),
            tile.y.clamp(self.origin.y, max_y),
        )
    }

    /// Squared distance from `tile` to the nearest covered tile.
    #[must_use]
    pub fn distance_sq_to(&self, tile: TilePos) -> u32 {
        self.nearest_tile(tile).distance_sq(tile)
    }

    /// Geometric centre in tile coordinates.
    #[must_use]
    pub fn centroid(&self) -> Vec2Fixed {
        let half = Fixed::from_num(2);
        Vec2Fixed::new(
            Fixed::from_num(self.origin.x) + Fixed::from_num(self.width - 1) / half,
            Fixed::from_num(self.origin.y) + Fixed::from_num(self.height - 1) / half,
        )
    }
}

/// Health component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    /// Current hitpoints.
    pub current: u32,
    /// Maximum hitpoints.
    pub max: u32,
}

impl Health {
    /// Full health.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Hitpoints reached zero.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current == 0
    }

    /// Apply damage, returning actual damage dealt.
    /// Uses saturating subtraction to prevent underflow.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current);
        self.current -= actual;
        actual
    }

    /// Damage taken so far.
    #[must_use]
    pub const fn damage_taken(&self) -> u32 {
        self.max - self.current
    }
}

/// Modular attack cooldown.
///
/// A hit lands on the tick where the counter is zero; the counter then
/// advances by the tick length and wraps at the cadence. The counter only
/// advances while its owner is attacking, so a unit that walks out of range
/// mid-cycle resumes where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AttackClock {
    elapsed_ms: u32,
}

impl AttackClock {
    /// Milliseconds since the last hit, modulo cadence.
    #[must_use]
    pub const fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms
    }

    /// Advance one attacking tick. Returns true when a hit lands this tick.
    pub fn advance(&mut self, tick_ms: u32, cadence_ms: u32) -> bool {
        let fires = self.elapsed_ms == 0;
        self.elapsed_ms = (self.elapsed_ms + tick_ms) % cadence_ms.max(1);
        fires
    }
}
