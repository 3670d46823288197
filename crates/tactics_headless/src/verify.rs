//! Scripted playthroughs for determinism checks.
//!
//! Every turn the active unit marches on the first living opponent and then
//! ends its turn. The script touches the pathfinder, the planner and the
//! scheduler, so two runs with the same seed only agree if all three do.

use tactics_core::session::TacticalSession;
use tactics_core::units::Team;

use crate::scenario::{Scenario, ScenarioError};

/// Outcome of one scripted playthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaythroughSummary {
    /// Turns actually played before the encounter ended or the limit hit.
    pub turns: u32,
    /// Round counter at the end.
    pub rounds: u32,
    /// Final state hash.
    pub hash: u64,
}

/// Team a unit on `team` marches toward, if any.
const fn opponent(team: Team) -> Option<Team> {
    match team {
        Team::Player => Some(Team::Enemy),
        Team::Enemy => Some(Team::Player),
        Team::Neutral => None,
    }
}

/// Play one scripted turn: move the active unit, then end its turn.
///
/// Returns `false` once no unit is active.
pub fn play_scripted_turn(session: &mut TacticalSession) -> bool {
    let Some(active) = session.active_unit() else {
        return false;
    };

    let target = session.roster().get(active).and_then(|unit| {
        let team = opponent(unit.team)?;
        session.roster().living_on(team).next().map(|t| t.position)
    });

    if let Some(target) = target {
        // Units may end up sharing a tile; occupancy is not modeled.
        if let Err(e) = session.order_move(active, target) {
            tracing::trace!(unit = active, error = %e, "Scripted move skipped");
        }
    }

    session.end_turn().is_some()
}

/// Build a session from `scenario` with `seed` and play up to `max_turns`.
pub fn play_scripted(
    scenario: &Scenario,
    seed: u64,
    max_turns: u32,
) -> Result<PlaythroughSummary, ScenarioError> {
    let mut session = scenario.build_session(Some(seed))?;
    let mut turns = 0;

    if session.begin_encounter().is_some() {
        while turns < max_turns {
            turns += 1;
            if !play_scripted_turn(&mut session) {
                break;
            }
        }
    }

    Ok(PlaythroughSummary {
        turns,
        rounds: session.scheduler().round(),
        hash: session.state_hash(),
    })
}

/// Play the same seed `runs` times and report whether all runs agree.
pub fn verify_determinism(
    scenario: &Scenario,
    seed: u64,
    runs: u32,
    max_turns: u32,
) -> Result<bool, ScenarioError> {
    let summaries = (0..runs)
        .map(|_| play_scripted(scenario, seed, max_turns))
        .collect::<Result<Vec<_>, _>>()?;

    for (run, summary) in summaries.iter().enumerate() {
        tracing::debug!(
            run,
            turns = summary.turns,
            rounds = summary.rounds,
            hash = %format!("{:016x}", summary.hash),
            "Playthrough finished"
        );
    }

    Ok(summaries.windows(2).all(|w| w[0] == w[1]))
}
