//! JSON protocol for headless encounter control.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Responses, one per command
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0",...}`
//! 2. Controller sends commands as JSON lines
//! 3. Runner answers every command with exactly one response
//! 4. On `quit` (or end of input), outputs `{"type":"bye"}`
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","scenario":"Infiltration","width":20,"height":10}
//! -> {"cmd":"begin_encounter"}
//! <- {"type":"turn","round":1,"unit":1,"ap":12}
//! -> {"cmd":"move","unit":1,"x":4,"y":4}
//! <- {"type":"moved","unit":1,"tiles":[...],"ap_spent":3,"remaining_ap":9,"rounds_remaining":0}
//! -> {"cmd":"end_turn"}
//! <- {"type":"turn","round":1,"unit":3,"ap":8}
//! ```

use serde::{Deserialize, Serialize};

use tactics_core::config::ActionKind;
use tactics_core::grid::TilePos;
use tactics_core::math::Fixed;
use tactics_core::movement::MovementTile;
use tactics_core::planner::PathSegment;
use tactics_core::turns::{SchedulerPhase, TurnQueueEntry};
use tactics_core::units::{Team, Unit, UnitId, UnitKind};

/// Protocol version reported in the ready line.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Query the encounter state.
    Query,

    /// Shortest path between two tiles.
    FindPath {
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
    },

    /// Whether one tile can see another.
    LineOfSight {
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
    },

    /// Tiles a unit can reach. `ap` defaults to the unit's current AP.
    Range {
        unit: UnitId,
        #[serde(default)]
        ap: Option<u32>,
    },

    /// Roll initiative and start the first turn.
    BeginEncounter,

    /// Start the turn at a queue slot.
    StartTurn { index: usize },

    /// End the active unit's turn.
    EndTurn,

    /// Drop back to idle.
    EndEncounter,

    /// Current turn queue.
    Queue,

    /// Spend AP on an action for the active unit.
    Action { action: ActionKind },

    /// Whether the active unit can afford an action.
    CanAfford { action: ActionKind },

    /// Plan a multi-round move without executing it.
    Plan { unit: UnitId, x: i32, y: i32 },

    /// Plan a move and walk its first segment.
    Move { unit: UnitId, x: i32, y: i32 },

    /// Walk the next segment of the active unit's pending move.
    ContinueMove,

    /// Flip a door's lock.
    ToggleDoor { x: i32, y: i32 },

    /// Remove a unit from the encounter.
    Kill { unit: UnitId },

    /// Render the map as text.
    Render {
        #[serde(default)]
        range_of: Option<UnitId>,
    },

    /// Report the state hash (for determinism verification).
    Hash,

    /// Quit the runner.
    Quit,
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        version: String,
        scenario: String,
        width: u32,
        height: u32,
    },

    /// Acknowledgment of a command.
    Ack { cmd: String },

    /// Error processing a command.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// Current encounter state.
    State {
        round: u32,
        phase: SchedulerPhase,
        active_unit: Option<UnitId>,
        units: Vec<UnitState>,
        hash: u64,
    },

    /// Result of a path query.
    Path {
        found: bool,
        tiles: Vec<TilePos>,
        cost: f64,
    },

    /// Result of a line-of-sight query.
    LineOfSight { visible: bool },

    /// Reachable tiles for a unit.
    Range {
        unit: UnitId,
        ap: u32,
        tiles: Vec<RangeTile>,
    },

    /// A turn started (or the encounter is idle when `unit` is `None`).
    Turn {
        round: u32,
        unit: Option<UnitId>,
        ap: u32,
    },

    /// The turn queue.
    Queue {
        round: u32,
        current: Option<usize>,
        entries: Vec<QueueEntryState>,
    },

    /// AP was spent on an action.
    ApSpent {
        action: ActionKind,
        remaining_ap: u32,
    },

    /// Affordability check.
    Affordable {
        action: ActionKind,
        affordable: bool,
    },

    /// A multi-round movement plan.
    Plan {
        unit: UnitId,
        segments: Vec<SegmentState>,
    },

    /// A unit walked one segment.
    Moved {
        unit: UnitId,
        tiles: Vec<TilePos>,
        ap_spent: u32,
        remaining_ap: u32,
        rounds_remaining: usize,
    },

    /// New door state.
    Door { x: i32, y: i32, locked: bool },

    /// A unit was removed.
    Killed { unit: UnitId, decided: bool },

    /// Text rendering of the map.
    Map { rows: Vec<String> },

    /// State hash for determinism verification.
    StateHash { round: u32, hash: u64 },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// State of a single unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitState {
    pub id: UnitId,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub name: String,
    pub team: Team,
    pub kind: UnitKind,
    pub x: i32,
    pub y: i32,
    pub speed: u32,
    pub ap: u32,
    pub alive: bool,
}

impl From<&Unit> for UnitState {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id,
            name: unit.name.clone(),
            team: unit.team,
            kind: unit.kind,
            x: unit.position.x,
            y: unit.position.y,
            speed: unit.speed,
            ap: unit.current_ap,
            alive: unit.alive,
        }
    }
}

/// A reachable tile and what it costs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeTile {
    pub x: i32,
    pub y: i32,
    pub cost: f64,
}

impl From<&MovementTile> for RangeTile {
    fn from(tile: &MovementTile) -> Self {
        Self {
            x: tile.pos.x,
            y: tile.pos.y,
            cost: to_display(tile.cost),
        }
    }
}

/// One slot of the turn queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntryState {
    pub unit: UnitId,
    pub team: Team,
    pub initiative: i32,
    pub max_ap: u32,
}

impl From<&TurnQueueEntry> for QueueEntryState {
    fn from(entry: &TurnQueueEntry) -> Self {
        Self {
            unit: entry.unit,
            team: entry.team,
            initiative: entry.initiative,
            max_ap: entry.max_ap,
        }
    }
}

/// One round's share of a movement plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentState {
    pub round_offset: u32,
    pub tiles: Vec<TilePos>,
    pub cost: f64,
    pub ap: u32,
}

impl From<&PathSegment> for SegmentState {
    fn from(segment: &PathSegment) -> Self {
        Self {
            round_offset: segment.round_offset,
            tiles: segment.tiles.clone(),
            cost: to_display(segment.cost),
            ap: segment.ap_cost(),
        }
    }
}

/// Fixed-point cost as a JSON number. Output only; nothing reads it back
/// into the core.
fn to_display(cost: Fixed) -> f64 {
    cost.to_num::<f64>()
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(scenario: &str, width: u32, height: u32) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            scenario: scenario.to_string(),
            width,
            height,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Path response; an unreachable goal gives `found: false`.
    pub fn path(tiles: Option<Vec<TilePos>>, cost: Fixed) -> Self {
        match tiles {
            Some(tiles) => Self::Path {
                found: true,
                tiles,
                cost: to_display(cost),
            },
            None => Self::Path {
                found: false,
                tiles: Vec::new(),
                cost: 0.0,
            },
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","message":"Serialization failed: {}"}}"#,
                e
            )
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

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::FindPath { .. } => "find_path",
            Self::LineOfSight { .. } => "line_of_sight",
            Self::Range { .. } => "range",
            Self::BeginEncounter => "begin_encounter",
            Self::StartTurn { .. } => "start_turn",
            Self::EndTurn => "end_turn",
            Self::EndEncounter => "end_encounter",
            Self::Queue => "queue",
            Self::Action { .. } => "action",
            Self::CanAfford { .. } => "can_afford",
            Self::Plan { .. } => "plan",
            Self::Move { .. } => "move",
            Self::ContinueMove => "continue_move",
            Self::ToggleDoor { .. } => "toggle_door",
            Self::Kill { .. } => "kill",
            Self::Render { .. } => "render",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}
