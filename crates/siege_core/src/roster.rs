//! Deployable units.

use serde::{Deserialize, Serialize};

use crate::components::UnitKind;
use crate::data::{StatCatalog, UnitStats};
use crate::error::{CatalogError, DeployError};

/// Persisted form of one roster line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Unit kind.
    pub kind: UnitKind,
    /// Level.
    pub level: u8,
    /// How many can be deployed.
    pub count: u32,
}

/// One roster line with its stats resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSlot {
    /// Unit kind.
    pub kind: UnitKind,
    /// Level.
    pub level: u8,
    /// Stats every unit from this slot is deployed with.
    pub stats: UnitStats,
    /// Units left to deploy.
    pub remaining: u32,
}

/// The attacker's deployable units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    slots: Vec<RosterSlot>,
}

impl Roster {
    /// Resolve entries against the catalog.
    pub fn new(catalog: &StatCatalog, entries: &[RosterEntry]) -> Result<Self, CatalogError> {
        let slots = entries
            .iter()
            .map(|e| {
                Ok(RosterSlot {
                    kind: e.kind,
                    level: e.level,
                    stats: *catalog.unit_stats(e.kind, e.level)?,
                    remaining: e.count,
                })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;
        Ok(Self { slots })
    }

    /// Resolve entries and reject rosters needing more than `capacity` housing.
    pub fn with_capacity(
        catalog: &StatCatalog,
        entries: &[RosterEntry],
        capacity: u32,
    ) -> Result<Self, CatalogError> {
        let roster = Self::new(catalog, entries)?;
        let required = roster.housing_required();
        if required > u64::from(capacity) {
            return Err(CatalogError::HousingExceeded { required, capacity });
        }
        Ok(roster)
    }

    /// Resolve entries against the army capacity of a town hall tier.
    pub fn for_town_hall(
        catalog: &StatCatalog,
        level: u8,
        entries: &[RosterEntry],
    ) -> Result<Self, CatalogError> {
        let capacity = catalog.tier(level)?.army_capacity;
        Self::with_capacity(catalog, entries, capacity)
    }

    /// Housing space of the units still to deploy.
    #[must_use]
    pub fn housing_required(&self) -> u64 {
        self.slots
            .iter()
            .map(|s| u64::from(s.remaining) * u64::from(s.stats.housing_space))
            .fold(0, u64::saturating_add)
    }

    /// All slots, including exhausted ones.
    #[must_use]
    pub fn slots(&self) -> &[RosterSlot] {
        &self.slots
    }

    /// Units left across all slots.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.slots.iter().map(|s| u64::from(s.remaining)).sum()
    }

    /// Nothing left to deploy.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Check that a slot can deploy without consuming it.
    pub fn check(&self, slot: usize) -> Result<&RosterSlot, DeployError> {
        let entry = self.slots.get(slot).ok_or(DeployError::UnknownSlot(slot))?;
        if entry.remaining == 0 {
            return Err(DeployError::SlotExhausted(slot));
        }
        Ok(entry)
    }

    pub(crate) fn take(&mut self, slot: usize) -> Result<RosterSlot, DeployError> {
        let taken = *self.check(slot)?;
        if let Some(entry) = self.slots.get_mut(slot) {
            entry.remaining -= 1;
        }
        Ok(taken)
    }
}
