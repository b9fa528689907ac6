//! Encounter drivers: the interactive JSON-lines session and the scripted
//! scenario runner.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use siege_core::combat::TickEvents;
use siege_core::components::TilePos;
use siege_core::data::StatCatalog;
use siege_core::simulation::Simulation;

use crate::metrics::{DeclinedDeploy, EncounterReport};
use crate::protocol::{Command, OutcomeState, Response, SlotState, PROTOCOL_VERSION};
use crate::scenario::{Scenario, ScenarioError, ScheduledDeploy};

/// Interactive session over one encounter.
///
/// Reads one [`Command`] per line and writes exactly one [`Response`] line
/// for each. Blank lines are skipped.
pub struct HeadlessRunner {
    name: String,
    sim: Simulation,
}

impl HeadlessRunner {
    /// Wrap a freshly built encounter.
    pub fn new(name: impl Into<String>, sim: Simulation) -> Self {
        Self {
            name: name.into(),
            sim,
        }
    }

    /// Build the encounter for a scenario. Its deployment plan is ignored;
    /// the driver deploys.
    pub fn from_scenario(
        scenario: &Scenario,
        catalog: Arc<StatCatalog>,
    ) -> Result<Self, ScenarioError> {
        Ok(Self::new(scenario.name.clone(), scenario.build(catalog)?))
    }

    /// The encounter being driven.
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// The `ready` greeting.
    pub fn ready(&self) -> Response {
        Response::Ready {
            version: PROTOCOL_VERSION.to_string(),
            scenario: self.name.clone(),
            tick_budget: self.sim.encounter().tick_budget(),
            roster: self.roster_state(),
        }
    }

    fn roster_state(&self) -> Vec<SlotState> {
        self.sim
            .roster()
            .slots()
            .iter()
            .enumerate()
            .map(|(i, slot)| SlotState::from_slot(i, slot))
            .collect()
    }

    /// Execute one command. Returns the response and whether to stop.
    pub fn handle(&mut self, command: Command) -> (Response, bool) {
        tracing::trace!(cmd = command.name(), tick = self.sim.get_tick(), "Command");
        match command {
            Command::Deploy { slot, x, y } => {
                let response = match self.sim.deploy_unit(slot, TilePos::new(x, y)) {
                    Ok(unit) => Response::Deployed {
                        unit: unit.0,
                        remaining: self
                            .sim
                            .roster()
                            .slots()
                            .get(slot)
                            .map_or(0, |s| s.remaining),
                    },
                    Err(e) => {
                        tracing::debug!(slot, x, y, reason = e.reason_code(), "Deploy declined");
                        Response::Declined {
                            reason: e.reason_code().to_string(),
                            message: e.to_string(),
                        }
                    }
                };
                (response, false)
            }
            Command::Step { count } => (Response::Outcome(self.advance(count)), false),
            Command::Query => (Response::Outcome(self.current_outcome()), false),
            Command::Snapshot => (Response::Snapshot(self.sim.snapshot()), false),
            Command::Hash => (
                Response::StateHash {
                    tick: self.sim.get_tick(),
                    hash: self.sim.state_hash(),
                },
                false,
            ),
            Command::Quit => (
                Response::Bye {
                    tick: self.sim.get_tick(),
                },
                true,
            ),
        }
    }

    fn current_outcome(&self) -> OutcomeState {
        let encounter = self.sim.encounter();
        OutcomeState {
            tick: encounter.tick(),
            ended: self.sim.is_ended(),
            stars: encounter.stars(),
            destruction_percentage: encounter.destruction_percentage(),
            destroyed_count: encounter.destroyed_count(),
            gold_looted: encounter.gold_looted(),
            elixir_looted: encounter.elixir_looted(),
            events: TickEvents::default(),
        }
    }

    /// Step up to `count` ticks, merging the events of every tick.
    fn advance(&mut self, count: u32) -> OutcomeState {
        let mut events = TickEvents::default();
        for _ in 0..count {
            if self.sim.is_ended() {
                break;
            }
            let outcome = self.sim.step();
            events.hits.extend(outcome.events.hits);
            events.destroyed.extend(outcome.events.destroyed);
            events.lost.extend(outcome.events.lost);
        }
        OutcomeState {
            events,
            ..self.current_outcome()
        }
    }

    /// Run the session until `quit` or end of input.
    ///
    /// Returns the final tick.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<u64> {
        output.write_all(self.ready().to_json_line().as_bytes())?;
        output.flush()?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (response, quit) = match Command::from_json(line) {
                Ok(command) => self.handle(command),
                Err(e) => {
                    tracing::warn!(error = %e, "Unparseable command");
                    (Response::error(format!("Invalid command: {e}")), false)
                }
            };
            output.write_all(response.to_json_line().as_bytes())?;
            output.flush()?;
            if quit {
                break;
            }
        }

        tracing::info!(tick = self.sim.get_tick(), "Session closed");
        Ok(self.sim.get_tick())
    }
}

/// Play a scenario's deployment plan to the end of the encounter.
///
/// Each scheduled deployment is attempted just before its tick is stepped.
/// Refusals are recorded in the report and do not stop the run.
pub fn run_scenario(
    scenario: &Scenario,
    catalog: Arc<StatCatalog>,
) -> Result<EncounterReport, ScenarioError> {
    let mut sim = scenario.build(catalog)?;
    let declined = play_plan(&mut sim, &scenario.deployment_plan());
    Ok(EncounterReport::from_simulation(
        scenario.name.clone(),
        None,
        &sim,
        declined,
    ))
}

/// Step `sim` to the end, deploying from a tick-sorted plan on the way.
pub fn play_plan(sim: &mut Simulation, plan: &[ScheduledDeploy]) -> Vec<DeclinedDeploy> {
    let mut declined = Vec::new();
    let mut pending = plan.iter().peekable();

    while !sim.is_ended() {
        let tick = sim.get_tick();
        while let Some(deploy) = pending.next_if(|d| d.tick <= tick) {
            if let Err(e) = sim.deploy_unit(deploy.slot, deploy.tile) {
                tracing::debug!(tick, slot = deploy.slot, reason = e.reason_code(), "Scheduled deploy declined");
                declined.push(DeclinedDeploy::new(tick, deploy.slot, deploy.tile, &e));
            }
        }
        sim.step();
    }

    // Anything still pending lands after the end.
    let tick = sim.get_tick();
    for deploy in pending {
        if let Err(e) = sim.deploy_unit(deploy.slot, deploy.tile) {
            declined.push(DeclinedDeploy::new(tick, deploy.slot, deploy.tile, &e));
        }
    }
    declined
}

#[cfg(test)]
mod tests {
    use siege_core::components::{StructureKind, UnitKind};
    use siege_core::encounter::EncounterConfig;
    use siege_core::layout::LayoutEntry;
    use siege_core::roster::RosterEntry;
    use siege_test_utils::fixtures::test_catalog;

    use super::*;

    fn scenario() -> Scenario {
        Scenario {
            name: "runner".into(),
            description: String::new(),
            town_hall_level: None,
            config: EncounterConfig::default(),
            layout: vec![
                LayoutEntry {
                    kind: StructureKind::TownHall,
                    level: 1,
                    origin: TilePos::new(20, 20),
                },
                LayoutEntry {
                    kind: StructureKind::Cannon,
                    level: 1,
                    origin: TilePos::new(10, 10),
                },
            ],
            roster: vec![RosterEntry {
                kind: UnitKind::Barbarian,
                level: 1,
                count: 3,
            }],
            deployments: vec![
                ScheduledDeploy {
                    tick: 0,
                    slot: 0,
                    tile: TilePos::new(0, 0),
                },
                ScheduledDeploy {
                    tick: 3,
                    slot: 0,
                    tile: TilePos::new(21, 21),
                },
                ScheduledDeploy {
                    tick: 3,
                    slot: 0,
                    tile: TilePos::new(44, 44),
                },
            ],
        }
    }

    fn session(input: &str) -> (Vec<serde_json::Value>, HeadlessRunner) {
        let mut runner = HeadlessRunner::from_scenario(&scenario(), test_catalog()).unwrap();
        let mut out = Vec::new();
        runner.run(input.as_bytes(), &mut out).unwrap();
        let lines = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (lines, runner)
    }

    #[test]
    fn test_ready_is_first() {
        let (lines, _) = session("");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["type"], "ready");
        assert_eq!(lines[0]["tick_budget"], 1800);
        assert_eq!(lines[0]["roster"][0]["kind"], "Barbarian");
        assert_eq!(lines[0]["roster"][0]["remaining"], 3);
    }

    #[test]
    fn test_one_response_per_command() {
        let input = r#"{"cmd":"deploy","slot":0,"x":0,"y":0}

{"cmd":"step","count":5}
{"cmd":"query"}
{"cmd":"hash"}
{"cmd":"snapshot"}
{"cmd":"quit"}
{"cmd":"step"}
"#;
        let (lines, runner) = session(input);
        let types: Vec<&str> = lines.iter().map(|l| l["type"].as_str().unwrap()).collect();
        assert_eq!(
            types,
            ["ready", "deployed", "outcome", "outcome", "state_hash", "snapshot", "bye"]
        );
        assert_eq!(lines[1]["remaining"], 2);
        assert_eq!(lines[2]["tick"], 5);
        assert_eq!(lines[4]["hash"], runner.simulation().state_hash());
        assert_eq!(runner.simulation().get_tick(), 5);
    }

    #[test]
    fn test_declined_deploy_carries_reason() {
        let input = concat!(
            r#"{"cmd":"deploy","slot":0,"x":21,"y":21}"#,
            "\n",
            r#"{"cmd":"deploy","slot":7,"x":0,"y":0}"#,
            "\n",
            r#"{"cmd":"deploy","slot":0,"x":-1,"y":0}"#,
            "\n",
        );
        let (lines, runner) = session(input);
        let reasons: Vec<&str> = lines[1..]
            .iter()
            .map(|l| l["reason"].as_str().unwrap())
            .collect();
        assert_eq!(reasons, ["tile_occupied", "unknown_slot", "out_of_bounds"]);
        assert_eq!(runner.simulation().units().count(), 0);
    }

    #[test]
    fn test_bad_json_is_an_error_response() {
        let (lines, _) = session("{not json}\n{\"cmd\":\"hash\"}\n");
        assert_eq!(lines[1]["type"], "error");
        assert_eq!(lines[2]["type"], "state_hash");
    }

    #[test]
    fn test_step_stops_at_the_end() {
        let mut scenario = scenario();
        scenario.roster.clear();
        let mut runner = HeadlessRunner::from_scenario(&scenario, test_catalog()).unwrap();
        let (response, _) = runner.handle(Command::Step { count: 50 });
        let Response::Outcome(outcome) = response else {
            panic!("expected outcome, got {response:?}");
        };
        assert!(outcome.ended);
        assert_eq!(outcome.tick, 1);
    }

    #[test]
    fn test_run_scenario_records_declines() {
        let report = run_scenario(&scenario(), test_catalog()).unwrap();
        assert_eq!(report.units_deployed, 2);
        assert_eq!(report.declined.len(), 1);
        assert_eq!(report.declined[0].reason, "tile_occupied");
        assert_eq!(report.declined[0].tick, 3);
        assert!(report.ticks > 3);
    }

    #[test]
    fn test_run_scenario_is_reproducible() {
        let a = run_scenario(&scenario(), test_catalog()).unwrap();
        let b = run_scenario(&scenario(), test_catalog()).unwrap();
        assert_eq!(a, b);
    }
}
