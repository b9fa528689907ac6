//! JSON-lines protocol for driving an encounter from an external policy.
//!
//! # Commands (stdin)
//!
//! | Command    | Fields            | Effect                               |
//! |------------|-------------------|--------------------------------------|
//! | `deploy`   | `slot`, `x`, `y`  | Deploy one unit from a roster slot   |
//! | `step`     | `count` (def. 1)  | Advance the encounter                |
//! | `query`    |                   | Report the current outcome           |
//! | `snapshot` |                   | Report every structure and unit      |
//! | `hash`     |                   | Report the state hash                |
//! | `quit`     |                   | Close the session                    |
//!
//! # Responses (stdout)
//!
//! Every command gets exactly one response line. A refused deployment is a
//! `declined` response carrying a stable reason code, not an `error`.

use serde::{Deserialize, Serialize};
use siege_core::combat::TickEvents;
use siege_core::roster::RosterSlot;
use siege_core::simulation::TickOutcome;
use siege_core::snapshot::GridSnapshot;

/// Protocol version reported in the `ready` line.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Commands read from stdin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Deploy one unit.
    Deploy {
        /// Roster slot index.
        slot: usize,
        /// Tile column.
        x: i32,
        /// Tile row.
        y: i32,
    },
    /// Advance the encounter.
    Step {
        /// Ticks to advance. Stops early if the encounter ends.
        #[serde(default = "default_step_count")]
        count: u32,
    },
    /// Current outcome without advancing.
    Query,
    /// Full snapshot of the grid.
    Snapshot,
    /// State hash.
    Hash,
    /// End the session.
    Quit,
}

fn default_step_count() -> u32 {
    1
}

/// Responses written to stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Session is ready for commands.
    Ready {
        /// Protocol version.
        version: String,
        /// Scenario name.
        scenario: String,
        /// Tick budget of the encounter.
        tick_budget: u64,
        /// Roster slots available for deployment.
        roster: Vec<SlotState>,
    },
    /// A unit was deployed.
    Deployed {
        /// Id of the new unit.
        unit: u32,
        /// Units left in the slot.
        remaining: u32,
    },
    /// A deployment was refused. The encounter is unchanged.
    Declined {
        /// Stable reason code.
        reason: String,
        /// Human readable detail.
        message: String,
    },
    /// Encounter outcome after a `step` or `query`.
    Outcome(OutcomeState),
    /// Full grid snapshot.
    Snapshot(GridSnapshot),
    /// State hash.
    StateHash {
        /// Current tick.
        tick: u64,
        /// Hash value.
        hash: u64,
    },
    /// The command could not be understood or executed.
    Error {
        /// Error message.
        message: String,
    },
    /// Session closed.
    Bye {
        /// Final tick.
        tick: u64,
    },
}

/// One roster slot as reported to the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotState {
    /// Slot index used by `deploy`.
    pub slot: usize,
    /// Unit kind name.
    pub kind: String,
    /// Unit level.
    pub level: u8,
    /// Units left.
    pub remaining: u32,
}

impl SlotState {
    /// Describe a roster slot.
    #[must_use]
    pub fn from_slot(index: usize, slot: &RosterSlot) -> Self {
        Self {
            slot: index,
            kind: format!("{:?}", slot.kind),
            level: slot.level,
            remaining: slot.remaining,
        }
    }
}

/// Scoring state plus the events of the last step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeState {
    /// Current tick.
    pub tick: u64,
    /// Whether the encounter is over.
    pub ended: bool,
    /// Stars earned.
    pub stars: u8,
    /// Destruction percentage.
    pub destruction_percentage: f64,
    /// Non-wall structures destroyed.
    pub destroyed_count: u32,
    /// Gold looted.
    pub gold_looted: u64,
    /// Elixir looted.
    pub elixir_looted: u64,
    /// Events of every tick advanced by the command, merged in order.
    pub events: TickEvents,
}

impl From<TickOutcome> for OutcomeState {
    fn from(outcome: TickOutcome) -> Self {
        Self {
            tick: outcome.tick,
            ended: outcome.ended,
            stars: outcome.stars,
            destruction_percentage: outcome.destruction_percentage,
            destroyed_count: outcome.destroyed_count,
            gold_looted: outcome.gold_looted,
            elixir_looted: outcome.elixir_looted,
            events: outcome.events,
        }
    }
}

impl Response {
    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Command name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Deploy { .. } => "deploy",
            Self::Step { .. } => "step",
            Self::Query => "query",
            Self::Snapshot => "snapshot",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deploy_command() {
        let cmd = Command::from_json(r#"{"cmd":"deploy","slot":2,"x":0,"y":44}"#).unwrap();
        assert_eq!(cmd, Command::Deploy { slot: 2, x: 0, y: 44 });
    }

    #[test]
    fn test_default_step_count() {
        let cmd = Command::from_json(r#"{"cmd":"step"}"#).unwrap();
        assert_eq!(cmd, Command::Step { count: 1 });
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(Command::from_json(r#"{"cmd":"teleport"}"#).is_err());
    }

    #[test]
    fn test_serialize_declined() {
        let json = Response::Declined {
            reason: "tile_occupied".into(),
            message: "occupied".into(),
        }
        .to_json_line();
        assert!(json.ends_with('\n'));
        assert!(json.contains(r#""type":"declined""#));
        assert!(json.contains(r#""reason":"tile_occupied""#));
    }

    #[test]
    fn test_serialize_outcome_is_flat() {
        let json = Response::Outcome(OutcomeState {
            tick: 10,
            ended: false,
            stars: 1,
            destruction_percentage: 12.5,
            destroyed_count: 2,
            gold_looted: 0,
            elixir_looted: 0,
            events: TickEvents::default(),
        })
        .to_json_line();
        assert!(json.contains(r#""type":"outcome""#));
        assert!(json.contains(r#""tick":10"#));
        assert!(json.contains(r#""stars":1"#));
    }
}
