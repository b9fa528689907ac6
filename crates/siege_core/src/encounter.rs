//! Encounter scoring state.

use serde::{Deserialize, Serialize};

use crate::components::StructureCategory;
use crate::registry::EntityRegistry;

/// Timing of an encounter.
///
/// # Example RON
///
/// ```ron
/// EncounterConfig(tick_ms: 100, duration_ms: 180000)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    /// Logical milliseconds per tick.
    pub tick_ms: u32,
    /// Encounter length in logical milliseconds.
    pub duration_ms: u32,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            duration_ms: 180_000,
        }
    }
}

impl EncounterConfig {
    /// Number of ticks before the encounter times out.
    #[must_use]
    pub fn tick_budget(&self) -> u64 {
        u64::from(self.duration_ms / self.tick_ms.max(1)).max(1)
    }
}

/// Running totals for one encounter.
///
/// Every counter only grows, which is what makes the derived star count
/// monotone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncounterState {
    total_hitpoints: u64,
    destroyed_hitpoints: u64,
    total_structures: u32,
    destroyed_count: u32,
    walls_destroyed: u32,
    damage_dealt: u64,
    total_gold: u64,
    total_elixir: u64,
    gold_looted: u64,
    elixir_looted: u64,
    command_destroyed: bool,
    units_deployed: u32,
    units_lost: u32,
    tick: u64,
    tick_budget: u64,
    stars: u8,
}

impl EncounterState {
    /// Totals taken from the structures present at encounter start.
    #[must_use]
    pub fn new(registry: &EntityRegistry, config: &EncounterConfig) -> Self {
        let mut state = Self {
            total_hitpoints: 0,
            destroyed_hitpoints: 0,
            total_structures: 0,
            destroyed_count: 0,
            walls_destroyed: 0,
            damage_dealt: 0,
            total_gold: 0,
            total_elixir: 0,
            gold_looted: 0,
            elixir_looted: 0,
            command_destroyed: false,
            units_deployed: 0,
            units_lost: 0,
            tick: 0,
            tick_budget: config.tick_budget(),
            stars: 0,
        };
        for structure in registry.structures() {
            if structure.category() != StructureCategory::Wall {
                state.total_hitpoints += u64::from(structure.health.max);
                state.total_structures += 1;
            }
            if let Some(loot) = &structure.loot {
                state.total_gold += u64::from(loot.gold);
                state.total_elixir += u64::from(loot.elixir);
            }
        }
        state.recompute_stars();
        state
    }

    pub(crate) fn record_damage(&mut self, category: StructureCategory, amount: u32) {
        if category != StructureCategory::Wall {
            self.damage_dealt += u64::from(amount);
        }
    }

    /// Add loot, clamped to what is left of the encounter totals. Returns the
    /// amounts actually credited.
    pub(crate) fn record_loot(&mut self, gold: u32, elixir: u32) -> (u32, u32) {
        let gold = u64::from(gold).min(self.total_gold - self.gold_looted);
        let elixir = u64::from(elixir).min(self.total_elixir - self.elixir_looted);
        self.gold_looted += gold;
        self.elixir_looted += elixir;
        (gold as u32, elixir as u32)
    }

    pub(crate) fn record_destroyed(&mut self, category: StructureCategory, max_hitpoints: u32) {
        match category {
            StructureCategory::Wall => self.walls_destroyed += 1,
            _ => {
                self.destroyed_hitpoints += u64::from(max_hitpoints);
                self.destroyed_count += 1;
            }
        }
        if category == StructureCategory::Command {
            self.command_destroyed = true;
        }
    }

    pub(crate) fn record_deploy(&mut self) {
        self.units_deployed += 1;
    }

    pub(crate) fn record_unit_lost(&mut self) {
        self.units_lost += 1;
    }

    pub(crate) fn advance_tick(&mut self) {
        self.tick += 1;
    }

    /// Recompute stars from destruction and command status.
    pub(crate) fn recompute_stars(&mut self) {
        let mut stars = 0;
        if self.destroyed_hitpoints * 2 >= self.total_hitpoints {
            stars += 1;
        }
        if self.command_destroyed {
            stars += 1;
        }
        if self.destroyed_hitpoints >= self.total_hitpoints {
            stars += 1;
        }
        debug_assert!(stars >= self.stars, "stars went down");
        self.stars = stars;
    }

    /// Destroyed non-wall hitpoints as a percentage of the starting total.
    /// 100 when nothing destructible was placed.
    #[must_use]
    pub fn destruction_percentage(&self) -> f64 {
        if self.total_hitpoints == 0 {
            100.0
        } else {
            self.destroyed_hitpoints as f64 * 100.0 / self.total_hitpoints as f64
        }
    }

    /// Current star count, 0 to 3.
    #[must_use]
    pub const fn stars(&self) -> u8 {
        self.stars
    }

    /// Ticks elapsed.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Tick at which the encounter times out.
    #[must_use]
    pub const fn tick_budget(&self) -> u64 {
        self.tick_budget
    }

    /// Non-wall structures destroyed.
    #[must_use]
    pub const fn destroyed_count(&self) -> u32 {
        self.destroyed_count
    }

    /// Non-wall structures present at start.
    #[must_use]
    pub const fn total_structures(&self) -> u32 {
        self.total_structures
    }

    /// Whether every non-wall structure is gone.
    #[must_use]
    pub const fn all_destroyed(&self) -> bool {
        self.destroyed_count >= self.total_structures
    }

    /// Walls destroyed.
    #[must_use]
    pub const fn walls_destroyed(&self) -> u32 {
        self.walls_destroyed
    }

    /// Hitpoints removed from non-wall structures, destroyed or not.
    #[must_use]
    pub const fn damage_dealt(&self) -> u64 {
        self.damage_dealt
    }

    /// Starting non-wall hitpoints.
    #[must_use]
    pub const fn total_hitpoints(&self) -> u64 {
        self.total_hitpoints
    }

    /// Max hitpoints of destroyed non-wall structures.
    #[must_use]
    pub const fn destroyed_hitpoints(&self) -> u64 {
        self.destroyed_hitpoints
    }

    /// Gold available at start.
    #[must_use]
    pub const fn total_gold(&self) -> u64 {
        self.total_gold
    }

    /// Elixir available at start.
    #[must_use]
    pub const fn total_elixir(&self) -> u64 {
        self.total_elixir
    }

    /// Gold taken.
    #[must_use]
    pub const fn gold_looted(&self) -> u64 {
        self.gold_looted
    }

    /// Elixir taken.
    #[must_use]
    pub const fn elixir_looted(&self) -> u64 {
        self.elixir_looted
    }

    /// Whether the command structure has fallen.
    #[must_use]
    pub const fn command_destroyed(&self) -> bool {
        self.command_destroyed
    }

    /// Units deployed so far.
    #[must_use]
    pub const fn units_deployed(&self) -> u32 {
        self.units_deployed
    }

    /// Units killed by defenses or detonation.
    #[must_use]
    pub const fn units_lost(&self) -> u32 {
        self.units_lost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::StructureKind;
    use crate::testing;

    fn state_with(kinds: &[StructureKind]) -> EncounterState {
        let mut registry = EntityRegistry::new();
        for (i, kind) in kinds.iter().enumerate() {
            testing::push_structure(&mut registry, *kind, (3 + 5 * i as i32, 3));
        }
        EncounterState::new(&registry, &EncounterConfig::default())
    }

    #[test]
    fn test_default_budget_is_1800_ticks() {
        assert_eq!(EncounterConfig::default().tick_budget(), 1800);
    }

    #[test]
    fn test_walls_excluded_from_totals() {
        let state = state_with(&[StructureKind::Wall, StructureKind::GoldMine]);
        assert_eq!(state.total_hitpoints(), 400);
        assert_eq!(state.total_structures(), 1);
        assert_eq!(state.total_gold(), 1000);
        assert_eq!(state.stars(), 0);
    }

    #[test]
    fn test_empty_base_is_full_destruction() {
        let state = state_with(&[]);
        assert!((state.destruction_percentage() - 100.0).abs() < f64::EPSILON);
        assert_eq!(state.stars(), 2);
        assert!(state.all_destroyed());
    }

    #[test]
    fn test_command_bonus_before_half() {
        let mut state = state_with(&[
            StructureKind::TownHall,
            StructureKind::GoldMine,
            StructureKind::ElixirPump,
            StructureKind::Laboratory,
            StructureKind::Barrack,
            StructureKind::Cannon,
        ]);
        // 1500 of 3320 destroyed.
        state.record_destroyed(StructureCategory::Command, 1500);
        state.recompute_stars();
        assert!(state.destruction_percentage() < 50.0);
        assert_eq!(state.stars(), 1);
    }

    #[test]
    fn test_loot_clamped_to_totals() {
        let mut state = state_with(&[StructureKind::GoldMine]);
        assert_eq!(state.record_loot(700, 5), (700, 0));
        assert_eq!(state.record_loot(700, 0), (300, 0));
        assert_eq!(state.gold_looted(), 1000);
    }
}
