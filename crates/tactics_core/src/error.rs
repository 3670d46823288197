//! Error types for the tactics core.
//!
//! Most queries report failure through `Option` or `bool` (an unreachable
//! goal is `None`, an unaffordable action is `false`). The variants here
//! cover commands that mutate state and configuration parsing.

use thiserror::Error;

use crate::units::UnitId;

/// Result type alias using [`TacticsError`].
pub type Result<T> = std::result::Result<T, TacticsError>;

/// Top-level error type for the tactics core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TacticsError {
    /// The active unit cannot pay for an action.
    #[error("Insufficient AP: need {required}, have {available}")]
    InsufficientAp {
        /// AP the action costs.
        required: u32,
        /// AP the unit has left.
        available: u32,
    },

    /// No unit is currently taking its turn.
    #[error("No unit is active")]
    NoActiveUnit,

    /// A command named a unit that is not the active one.
    #[error("Unit {requested} is not the active unit (active: {active})")]
    NotActiveUnit {
        /// Unit named by the command.
        requested: UnitId,
        /// Unit whose turn it is.
        active: UnitId,
    },

    /// Unit id not present in the roster.
    #[error("Unknown unit: {0}")]
    UnknownUnit(UnitId),

    /// A movement plan was requested for a path without tiles.
    #[error("Cannot plan movement along an empty path")]
    EmptyPath,

    /// Two consecutive path tiles are not neighbours under the movement model.
    #[error("Path is not contiguous at tile {index}")]
    NonContiguousPath {
        /// Index of the first tile that does not follow its predecessor.
        index: usize,
    },

    /// A single step costs more than a full round of AP.
    #[error("Step {index} costs {cost} AP but a round only grants {per_round}")]
    StepExceedsBudget {
        /// Index of the step's destination tile within the path.
        index: usize,
        /// Cost of the step, rounded up.
        cost: u32,
        /// AP available per round.
        per_round: u32,
    },

    /// No path exists to the requested destination.
    #[error("No path from ({from_x}, {from_y}) to ({to_x}, {to_y})")]
    NoPath {
        /// Start column.
        from_x: i32,
        /// Start row.
        from_y: i32,
        /// Goal column.
        to_x: i32,
        /// Goal row.
        to_y: i32,
    },

    /// Configuration values are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration text failed to parse.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),
}
