//! # Tactics Core
//!
//! Turn scheduling and grid movement for a squad tactics game.
//!
//! This crate contains **only** game-rule logic:
//! - No rendering
//! - No IO
//! - Randomness only through an injected, seedable RNG
//! - Fixed-point movement costs
//!
//! This separation enables:
//! - Headless scenario runs and scripted verification
//! - Reproducible turn orders from a seed
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`grid`] - Tile grid, doors, walkability and line of sight
//! - [`pathfinding`] - A* with goal resolution and a result cache
//! - [`movement`] - AP-bounded movement range
//! - [`turns`] - Initiative queue and AP bookkeeping
//! - [`planner`] - Multi-round movement plans
//! - [`session`] - One encounter wiring everything together
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod error;
pub mod grid;
pub mod math;
pub mod movement;
pub mod path_cache;
pub mod pathfinding;
pub mod planner;
pub mod session;
pub mod turns;
pub mod units;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{
        ActionCostTable, ActionKind, ApProfileTable, InitiativeConfig, MovementConfig,
        PathfindingConfig, TacticsConfig,
    };
    pub use crate::error::{Result, TacticsError};
    pub use crate::grid::{bresenham, CellType, Door, DoorTable, Grid, MapOracle, MapView, TilePos};
    pub use crate::math::{Fixed, Vec2Fixed, SQRT_2};
    pub use crate::movement::{calculate_movement_range, MovementRange, MovementTile, StepCosts};
    pub use crate::path_cache::{CacheStats, PathCache};
    pub use crate::pathfinding::{find_path_uncached, resolve_goal, Path, Pathfinder};
    pub use crate::planner::{
        plan_multi_turn_movement, MovementPlan, MultiTurnPlanner, PathSegment, PendingPlan,
        PlanBudget,
    };
    pub use crate::session::{MoveOutcome, TacticalSession};
    pub use crate::turns::{SchedulerPhase, TurnQueueEntry, TurnScheduler};
    pub use crate::units::{Roster, Team, Unit, UnitId, UnitKind};
}
