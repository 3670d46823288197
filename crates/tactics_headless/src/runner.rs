//! Headless runner implementation.
//!
//! Owns one [`TacticalSession`] and answers [`Command`]s with
//! [`Response`]s, one JSON line each.

use std::io::{self, BufRead, Write};

use tactics_core::grid::TilePos;
use tactics_core::math::Fixed;
use tactics_core::planner::MovementPlan;
use tactics_core::session::{MoveOutcome, TacticalSession};
use tactics_core::units::UnitId;

use crate::ascii_visualizer::{render_map, AsciiConfig, Overlay};
use crate::protocol::{
    Command, QueueEntryState, RangeTile, Response, SegmentState, UnitState,
};
use crate::scenario::{Scenario, ScenarioError};

/// Headless runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Follow every state-changing command with a `state` line.
    pub auto_state_output: bool,
}

/// Headless runner for scripted encounters.
#[derive(Debug)]
pub struct HeadlessRunner {
    session: TacticalSession,
    scenario: String,
    config: HeadlessConfig,
}

impl HeadlessRunner {
    /// Wrap an existing session.
    pub fn new(session: TacticalSession, scenario: impl Into<String>) -> Self {
        Self {
            session,
            scenario: scenario.into(),
            config: HeadlessConfig::default(),
        }
    }

    /// Build a runner from a scenario, optionally overriding its seed.
    pub fn from_scenario(scenario: &Scenario, seed: Option<u64>) -> Result<Self, ScenarioError> {
        let session = scenario.build_session(seed)?;
        Ok(Self::new(session, scenario.name.clone()))
    }

    /// Replace the runner configuration.
    #[must_use]
    pub fn with_config(mut self, config: HeadlessConfig) -> Self {
        self.config = config;
        self
    }

    /// The session being driven.
    pub fn session(&self) -> &TacticalSession {
        &self.session
    }

    /// The greeting line.
    pub fn ready(&self) -> Response {
        let grid = self.session.grid();
        Response::ready(&self.scenario, grid.width(), grid.height())
    }

    /// Run against stdin and stdout until `quit` or end of input.
    pub fn run(&mut self) -> io::Result<usize> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run_with(stdin.lock(), stdout.lock())
    }

    /// Run against any line source and sink. Returns the number of
    /// commands handled.
    pub fn run_with<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<usize> {
        output.write_all(self.ready().to_json_line().as_bytes())?;
        output.flush()?;

        let mut handled = 0;
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let cmd = match Command::from_json(line) {
                Ok(cmd) => cmd,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse command");
                    let response = Response::error(format!("Invalid command: {e}"), None);
                    output.write_all(response.to_json_line().as_bytes())?;
                    output.flush()?;
                    continue;
                }
            };

            handled += 1;
            if cmd == Command::Quit {
                break;
            }

            let mutates = mutates_state(&cmd);
            let response = self.handle(cmd);
            output.write_all(response.to_json_line().as_bytes())?;
            if self.config.auto_state_output && mutates {
                output.write_all(self.state().to_json_line().as_bytes())?;
            }
            output.flush()?;
        }

        output.write_all(Response::Bye.to_json_line().as_bytes())?;
        output.flush()?;
        tracing::info!(handled, hash = self.session.state_hash(), "Runner finished");
        Ok(handled)
    }

    /// Apply one command and produce its response.
    pub fn handle(&mut self, cmd: Command) -> Response {
        let name = cmd.name();
        tracing::debug!(cmd = name, "Processing command");

        match cmd {
            Command::Query => self.state(),

            Command::FindPath {
                from_x,
                from_y,
                to_x,
                to_y,
            } => {
                let path = self
                    .session
                    .find_path(TilePos::new(from_x, from_y), TilePos::new(to_x, to_y));
                match path {
                    Some(path) => {
                        let cost = path.cost();
                        Response::path(Some(path.into_tiles()), cost)
                    }
                    None => Response::path(None, Fixed::ZERO),
                }
            }

            Command::LineOfSight {
                from_x,
                from_y,
                to_x,
                to_y,
            } => Response::LineOfSight {
                visible: self
                    .session
                    .has_line_of_sight(TilePos::new(from_x, from_y), TilePos::new(to_x, to_y)),
            },

            Command::Range { unit, ap } => {
                let range = match ap {
                    Some(ap) => self.session.movement_range_with(unit, ap),
                    None => self.session.movement_range(unit),
                };
                match range {
                    Ok(range) => Response::Range {
                        unit,
                        ap: ap.unwrap_or_else(|| range.budget().saturating_to_num::<u32>()),
                        tiles: range.tiles().iter().map(RangeTile::from).collect(),
                    },
                    Err(e) => Response::error(e.to_string(), Some(name)),
                }
            }

            Command::BeginEncounter => {
                let unit = self.session.begin_encounter();
                self.turn(unit)
            }

            Command::StartTurn { index } => {
                let unit = self.session.start_turn(index);
                self.turn(unit)
            }

            Command::EndTurn => {
                let unit = self.session.end_turn();
                self.turn(unit)
            }

            Command::EndEncounter => {
                self.session.end_encounter();
                Response::ack(name)
            }

            Command::Queue => {
                let scheduler = self.session.scheduler();
                Response::Queue {
                    round: scheduler.round(),
                    current: scheduler.current_index(),
                    entries: scheduler.queue().iter().map(QueueEntryState::from).collect(),
                }
            }

            Command::Action { action } => match self.session.perform_action(action) {
                Ok(remaining_ap) => Response::ApSpent {
                    action,
                    remaining_ap,
                },
                Err(e) => Response::error(e.to_string(), Some(name)),
            },

            Command::CanAfford { action } => Response::Affordable {
                action,
                affordable: self.session.can_afford(action),
            },

            Command::Plan { unit, x, y } => match self.session.plan_move(unit, TilePos::new(x, y)) {
                Ok(plan) => plan_response(unit, &plan),
                Err(e) => Response::error(e.to_string(), Some(name)),
            },

            Command::Move { unit, x, y } => match self.session.order_move(unit, TilePos::new(x, y)) {
                Ok(outcome) => moved_response(outcome),
                Err(e) => Response::error(e.to_string(), Some(name)),
            },

            Command::ContinueMove => match self.session.continue_move() {
                Ok(Some(outcome)) => moved_response(outcome),
                Ok(None) => Response::error("No pending move for the active unit", Some(name)),
                Err(e) => Response::error(e.to_string(), Some(name)),
            },

            Command::ToggleDoor { x, y } => match self.session.toggle_door(TilePos::new(x, y)) {
                Some(locked) => Response::Door { x, y, locked },
                None => Response::error(format!("No door at ({x}, {y})"), Some(name)),
            },

            Command::Kill { unit } => self.kill(unit),

            Command::Render { range_of } => {
                let range = match range_of.map(|unit| self.session.movement_range(unit)) {
                    Some(Ok(range)) => Some(range),
                    Some(Err(e)) => return Response::error(e.to_string(), Some(name)),
                    None => None,
                };
                let overlay = Overlay {
                    path: None,
                    range: range.as_ref(),
                };
                let config = AsciiConfig {
                    show_legend: false,
                    use_color: false,
                };
                Response::Map {
                    rows: render_map(&self.session, &overlay, &config),
                }
            }

            Command::Hash => Response::StateHash {
                round: self.session.scheduler().round(),
                hash: self.session.state_hash(),
            },

            Command::Quit => Response::Bye,
        }
    }

    fn state(&self) -> Response {
        Response::State {
            round: self.session.scheduler().round(),
            phase: self.session.phase(),
            active_unit: self.session.active_unit(),
            units: self.session.roster().iter().map(UnitState::from).collect(),
            hash: self.session.state_hash(),
        }
    }

    fn turn(&self, unit: Option<UnitId>) -> Response {
        let ap = unit
            .and_then(|id| self.session.roster().get(id))
            .map_or(0, |u| u.current_ap);
        Response::Turn {
            round: self.session.scheduler().round(),
            unit,
            ap,
        }
    }

    fn kill(&mut self, unit: UnitId) -> Response {
        if self.session.kill_unit(unit) {
            Response::Killed {
                unit,
                decided: self.session.roster().is_encounter_decided(),
            }
        } else {
            Response::error(format!("No living unit {unit}"), Some("kill"))
        }
    }
}

fn plan_response(unit: UnitId, plan: &MovementPlan) -> Response {
    Response::Plan {
        unit,
        segments: plan.segments().iter().map(SegmentState::from).collect(),
    }
}

fn moved_response(outcome: MoveOutcome) -> Response {
    Response::Moved {
        unit: outcome.unit,
        tiles: outcome.segment.tiles,
        ap_spent: outcome.ap_spent,
        remaining_ap: outcome.remaining_ap,
        rounds_remaining: outcome.rounds_remaining,
    }
}

fn mutates_state(cmd: &Command) -> bool {
    matches!(
        cmd,
        Command::BeginEncounter
            | Command::StartTurn { .. }
            | Command::EndTurn
            | Command::EndEncounter
            | Command::Action { .. }
            | Command::Move { .. }
            | Command::ContinueMove
            | Command::ToggleDoor { .. }
            | Command::Kill { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactics_core::config::ActionKind;

    fn runner() -> HeadlessRunner {
        HeadlessRunner::from_scenario(&Scenario::open_field(), None).unwrap()
    }

    fn run_script(runner: &mut HeadlessRunner, script: &str) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        runner.run_with(script.as_bytes(), &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_ready_and_bye_frame_the_session() {
        let lines = run_script(&mut runner(), "");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "ready");
        assert_eq!(lines[0]["width"], 10);
        assert_eq!(lines[1]["type"], "bye");
    }

    #[test]
    fn test_bad_json_reports_error_and_continues() {
        let lines = run_script(&mut runner(), "not json\n{\"cmd\":\"hash\"}\n");
        assert_eq!(lines[1]["type"], "error");
        assert_eq!(lines[2]["type"], "state_hash");
    }

    #[test]
    fn test_extreme_numbers_answer_in_place() {
        let lines = run_script(
            &mut runner(),
            concat!(
                r#"{"cmd":"find_path","from_x":0,"from_y":0,"to_x":2147483647,"to_y":0}"#,
                "\n",
                r#"{"cmd":"plan","unit":1,"x":-2147483648,"y":2147483647}"#,
                "\n",
                r#"{"cmd":"range","unit":1,"ap":4294967295}"#,
                "\n",
                r#"{"cmd":"hash"}"#,
                "\n",
            ),
        );

        assert_eq!(lines[1]["type"], "path");
        assert_eq!(lines[1]["found"], false);
        assert_eq!(lines[2]["type"], "error");
        assert_eq!(lines[3]["type"], "range");
        assert_eq!(lines[3]["ap"], 4_294_967_295_u64);
        assert_eq!(lines[3]["tiles"].as_array().unwrap().len(), 100);
        assert_eq!(lines[4]["type"], "state_hash");
        assert_eq!(lines[5]["type"], "bye");
    }

    #[test]
    fn test_quit_stops_reading() {
        let mut r = runner();
        let lines = run_script(
            &mut r,
            "{\"cmd\":\"quit\"}\n{\"cmd\":\"begin_encounter\"}\n",
        );
        assert_eq!(lines.len(), 2);
        assert_eq!(r.session().scheduler().round(), 0);
    }

    #[test]
    fn test_find_path_command() {
        let mut r = runner();
        let resp = r.handle(Command::FindPath {
            from_x: 0,
            from_y: 0,
            to_x: 4,
            to_y: 0,
        });
        match resp {
            Response::Path { found, tiles, cost } => {
                assert!(found);
                assert_eq!(tiles.len(), 5);
                assert!((cost - 4.0).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_turn_flow_and_actions() {
        let mut r = runner();
        // The agent is faster and always opens.
        assert_eq!(
            r.handle(Command::BeginEncounter),
            Response::Turn {
                round: 1,
                unit: Some(1),
                ap: 12
            }
        );

        assert_eq!(
            r.handle(Command::Action {
                action: ActionKind::Overwatch
            }),
            Response::ApSpent {
                action: ActionKind::Overwatch,
                remaining_ap: 9
            }
        );

        // Five diagonal steps cost just over 7 AP, charged as 8.
        let Response::Moved {
            ap_spent,
            remaining_ap,
            rounds_remaining,
            tiles,
            ..
        } = r.handle(Command::Move { unit: 1, x: 5, y: 5 })
        else {
            panic!("expected move");
        };
        assert_eq!((ap_spent, remaining_ap, rounds_remaining), (8, 1, 0));
        assert_eq!(tiles.last(), Some(&TilePos::new(5, 5)));

        assert_eq!(
            r.handle(Command::CanAfford {
                action: ActionKind::Reload
            }),
            Response::Affordable {
                action: ActionKind::Reload,
                affordable: false
            }
        );

        let Response::Turn { unit: next, ap, .. } = r.handle(Command::EndTurn) else {
            panic!("expected turn");
        };
        assert_eq!((next, ap), (Some(2), 8));
    }

    #[test]
    fn test_move_by_inactive_unit_is_rejected() {
        let mut r = runner();
        r.handle(Command::BeginEncounter);
        let idle = if r.session().active_unit() == Some(1) { 2 } else { 1 };
        let resp = r.handle(Command::Move { unit: idle, x: 5, y: 5 });
        assert!(matches!(resp, Response::Error { cmd: Some(c), .. } if c == "move"));
    }

    #[test]
    fn test_kill_decides_encounter() {
        let mut r = runner();
        r.handle(Command::BeginEncounter);
        assert_eq!(
            r.handle(Command::Kill { unit: 2 }),
            Response::Killed {
                unit: 2,
                decided: true
            }
        );
        assert!(matches!(r.handle(Command::Kill { unit: 2 }), Response::Error { .. }));
        assert_eq!(
            r.handle(Command::EndTurn),
            Response::Turn {
                round: 1,
                unit: None,
                ap: 0
            }
        );
    }

    #[test]
    fn test_auto_state_output() {
        let mut r = runner().with_config(HeadlessConfig {
            auto_state_output: true,
        });
        let lines = run_script(&mut r, "{\"cmd\":\"begin_encounter\"}\n{\"cmd\":\"queue\"}\n");
        let types: Vec<&str> = lines.iter().map(|l| l["type"].as_str().unwrap()).collect();
        assert_eq!(types, ["ready", "turn", "state", "queue", "bye"]);
    }

    #[test]
    fn test_render_with_range() {
        let mut r = runner();
        r.handle(Command::BeginEncounter);
        let Response::Map { rows } = r.handle(Command::Render { range_of: Some(1) }) else {
            panic!("expected map");
        };
        assert_eq!(rows.len(), 10);
        assert!(rows[0].starts_with("A+"));
    }
}
