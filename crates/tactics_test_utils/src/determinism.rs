//! Determinism testing utilities.
//!
//! Provides a harness for verifying that an encounter produces identical
//! results given identical inputs and the same initiative seed.
//!
//! # Testing Strategy
//!
//! Turn order is random, but the randomness is injected. Given
//! the same seed, roster and commands, two sessions must agree on every
//! queue, every AP counter and every unit position. Sources of divergence:
//!
//! - **Unseeded RNGs**: every scheduler is built from a seed.
//! - **HashMap iteration order**: rosters iterate in unit id order and
//!   search ties are broken by tile position, never by hash order.
//! - **Floating-point math**: step costs are fixed-point.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: queue order for one seed is stable
//! 2. **Property tests**: random grids still give identical searches
//! 3. **Parallel tests**: sessions advanced on separate threads all match

use std::thread;

use tactics_core::session::TacticalSession;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps taken per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Encounter is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a scenario multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the scenario
/// * `steps` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```ignore
/// use tactics_test_utils::determinism::{session_hash, verify_determinism};
///
/// let result = verify_determinism(
///     5,  // Run 5 times
///     20, // 20 turns each
///     || skirmish_session(42),
///     |s| { s.end_turn(); },
///     session_hash,
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..steps {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Hash everything observable about an encounter.
///
/// Thin adapter over [`TacticalSession::state_hash`] so it fits the `hash`
/// argument of [`verify_determinism`].
#[must_use]
pub fn session_hash(session: &TacticalSession) -> u64 {
    session.state_hash()
}

/// Advance `num_sessions` sessions on separate scoped threads by ending
/// `num_turns` turns each, and collect their final hashes.
///
/// Useful for catching state that leaks between threads or depends on
/// memory layout.
pub fn run_parallel_sessions<F>(setup_fn: F, num_sessions: usize, num_turns: u64) -> DeterminismResult
where
    F: Fn() -> TacticalSession + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sessions)
            .map(|_| {
                s.spawn(|| {
                    let mut session = setup_fn();
                    session.begin_encounter();
                    for _ in 0..num_turns {
                        session.end_turn();
                    }
                    session_hash(&session)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        steps: num_turns,
    }
}

/// Compare two sessions turn by turn, finding the first divergence.
///
/// # Returns
///
/// `None` if the sessions agree throughout, `Some(turn)` at the first
/// turn where they differ (0 means they differ right after setup).
pub fn find_first_divergence<F>(setup_fn: F, num_turns: u64) -> Option<u64>
where
    F: Fn() -> TacticalSession,
{
    let mut a = setup_fn();
    let mut b = setup_fn();
    a.begin_encounter();
    b.begin_encounter();

    if session_hash(&a) != session_hash(&b) {
        return Some(0);
    }

    for turn in 1..=num_turns {
        a.end_turn();
        b.end_turn();

        if session_hash(&a) != session_hash(&b) {
            return Some(turn);
        }
    }

    None
}

/// Proptest strategies for grids, positions and plan budgets.
pub mod strategies {
    use proptest::prelude::*;
    use tactics_core::grid::{Grid, TilePos};
    use tactics_core::planner::PlanBudget;

    /// Grid side length used by the strategies.
    pub const GRID_SIZE: i32 = 12;

    /// A tile inside a `GRID_SIZE` square grid.
    pub fn arb_tile() -> impl Strategy<Value = TilePos> {
        (0..GRID_SIZE, 0..GRID_SIZE).prop_map(|(x, y)| TilePos::new(x, y))
    }

    /// A `GRID_SIZE` square grid with roughly `density` percent walls.
    pub fn arb_grid(density: u32) -> impl Strategy<Value = Grid> {
        let cells = (GRID_SIZE * GRID_SIZE) as usize;
        prop::collection::vec(0u32..100, cells).prop_map(move |rolls| {
            let walls = rolls
                .into_iter()
                .enumerate()
                .filter(|&(_, roll)| roll < density)
                .map(|(i, _)| {
                    let i = i as i32;
                    TilePos::new(i % GRID_SIZE, i / GRID_SIZE)
                });
            Grid::with_walls(GRID_SIZE as u32, GRID_SIZE as u32, walls)
        })
    }

    /// A budget whose later rounds can always afford a diagonal step.
    pub fn arb_budget() -> impl Strategy<Value = PlanBudget> {
        (0u32..16, 2u32..16).prop_map(|(first_round, per_round)| PlanBudget {
            first_round,
            per_round,
        })
    }

    /// Up to 40 king-move offsets, for planner properties that need a
    /// contiguous path but no map.
    pub fn arb_walk() -> impl Strategy<Value = Vec<(i32, i32)>> {
        let step = prop_oneof![
            Just((1, 0)),
            Just((0, 1)),
            Just((-1, 0)),
            Just((0, -1)),
            Just((1, 1)),
            Just((-1, 1)),
            Just((1, -1)),
            Just((-1, -1)),
        ];
        prop::collection::vec(step, 0..40)
    }
}
