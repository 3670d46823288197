//! Tunable tables for pathfinding, initiative and action-point costs.
//!
//! All structs deserialize from RON with every field optional, so a mission
//! file only needs to mention what it overrides.
//!
//! # Example RON
//!
//! ```ron
//! TacticsConfig(
//!     pathfinding: (cache_timeout_ms: 2000, cache_capacity: 64),
//!     initiative: (base: 10, speed_multiplier: 3, roll_max: 3),
//!     ap_profiles: (profiles: {agent: 12, guard: 8}),
//! )
//! ```
//!
//! **Note:** This module contains no IO; callers read the text.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TacticsError};
use crate::units::UnitKind;

/// Largest AP budget or per-tile move cost a configuration may set.
pub const MAX_AP: u32 = 1_000;

/// Largest blocked-goal search radius a configuration may set.
pub const MAX_GOAL_SEARCH_RADIUS: u32 = 64;

/// Pathfinder search and cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfindingConfig {
    /// Age after which a cached result is recomputed.
    pub cache_timeout_ms: u64,
    /// Maximum number of cached (start, goal) results.
    pub cache_capacity: usize,
    /// How far to look for a walkable substitute when the goal is blocked.
    pub goal_search_radius: u32,
}

impl PathfindingConfig {
    /// Cache timeout as a [`Duration`].
    #[must_use]
    pub const fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }
}

impl Default for PathfindingConfig {
    fn default() -> Self {
        Self {
            cache_timeout_ms: 5_000,
            cache_capacity: 128,
            goal_search_radius: 5,
        }
    }
}

/// Grid movement model shared by the pathfinder and the range calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Allow diagonal steps (cost √2 times an orthogonal step).
    pub allow_diagonal: bool,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            allow_diagonal: true,
        }
    }
}

/// Initiative formula: `base + speed * speed_multiplier + roll(0..=roll_max) + buff`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitiativeConfig {
    /// Flat starting value.
    pub base: i32,
    /// Weight of the speed stat.
    pub speed_multiplier: i32,
    /// Upper bound (inclusive) of the uniform roll.
    pub roll_max: u32,
}

impl Default for InitiativeConfig {
    fn default() -> Self {
        Self {
            base: 10,
            speed_multiplier: 3,
            roll_max: 3,
        }
    }
}

/// Max AP granted at the start of a turn, per unit archetype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApProfileTable {
    /// Overrides keyed by kind; kinds left out use the built-in value.
    pub profiles: BTreeMap<UnitKind, u32>,
}

impl ApProfileTable {
    /// Built-in AP budget for a kind.
    #[must_use]
    pub const fn builtin(kind: UnitKind) -> u32 {
        match kind {
            UnitKind::Agent => 12,
            UnitKind::Guard => 8,
            UnitKind::Soldier => 10,
            UnitKind::Heavy => 6,
            UnitKind::Boss => 16,
            UnitKind::Civilian => 4,
        }
    }

    /// Max AP for a kind.
    #[must_use]
    pub fn max_ap(&self, kind: UnitKind) -> u32 {
        self.profiles
            .get(&kind)
            .copied()
            .unwrap_or_else(|| Self::builtin(kind))
    }
}

impl Default for ApProfileTable {
    fn default() -> Self {
        Self {
            profiles: UnitKind::ALL
                .iter()
                .map(|&kind| (kind, Self::builtin(kind)))
                .collect(),
        }
    }
}

/// Every action a unit can spend AP on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// One orthogonal tile of movement.
    Move,
    /// Ranged attack.
    Shoot,
    /// Melee attack.
    Melee,
    /// Special ability.
    Ability,
    /// Hack a terminal or device.
    Hack,
    /// Reload a weapon.
    Reload,
    /// Enter overwatch.
    Overwatch,
    /// Open, loot, or use something adjacent.
    Interact,
}

impl ActionKind {
    /// All actions, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Move,
        Self::Shoot,
        Self::Melee,
        Self::Ability,
        Self::Hack,
        Self::Reload,
        Self::Overwatch,
        Self::Interact,
    ];
}

/// Fixed AP cost per action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionCostTable {
    /// Overrides keyed by action; actions left out use the built-in value.
    pub costs: BTreeMap<ActionKind, u32>,
}

impl ActionCostTable {
    /// Built-in cost of an action.
    #[must_use]
    pub const fn builtin(action: ActionKind) -> u32 {
        match action {
            ActionKind::Move => 1,
            ActionKind::Shoot => 4,
            ActionKind::Melee => 3,
            ActionKind::Ability => 6,
            ActionKind::Hack => 4,
            ActionKind::Reload => 2,
            ActionKind::Overwatch => 3,
            ActionKind::Interact => 2,
        }
    }

    /// AP cost of an action.
    #[must_use]
    pub fn cost(&self, action: ActionKind) -> u32 {
        self.costs
            .get(&action)
            .copied()
            .unwrap_or_else(|| Self::builtin(action))
    }
}

impl Default for ActionCostTable {
    fn default() -> Self {
        Self {
            costs: ActionKind::ALL
                .iter()
                .map(|&action| (action, Self::builtin(action)))
                .collect(),
        }
    }
}

/// Complete configuration of the tactics core.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TacticsConfig {
    /// Pathfinder settings.
    pub pathfinding: PathfindingConfig,
    /// Movement model.
    pub movement: MovementConfig,
    /// Initiative formula.
    pub initiative: InitiativeConfig,
    /// Max AP per unit kind.
    pub ap_profiles: ApProfileTable,
    /// AP cost per action.
    pub action_costs: ActionCostTable,
}

impl TacticsConfig {
    /// Parse a configuration from RON and validate it.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self =
            ron::from_str(ron).map_err(|e| TacticsError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the core misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.pathfinding.cache_capacity == 0 {
            return Err(TacticsError::InvalidConfig(
                "pathfinding.cache_capacity must be positive".into(),
            ));
        }
        if self.pathfinding.goal_search_radius > MAX_GOAL_SEARCH_RADIUS {
            return Err(TacticsError::InvalidConfig(format!(
                "pathfinding.goal_search_radius must be at most {MAX_GOAL_SEARCH_RADIUS}"
            )));
        }
        if !(1..=MAX_AP).contains(&self.action_costs.cost(ActionKind::Move)) {
            return Err(TacticsError::InvalidConfig(format!(
                "action_costs.move must be between 1 and {MAX_AP}"
            )));
        }
        if let Some(kind) = UnitKind::ALL
            .iter()
            .find(|&&kind| !(1..=MAX_AP).contains(&self.ap_profiles.max_ap(kind)))
        {
            return Err(TacticsError::InvalidConfig(format!(
                "ap_profiles.{kind:?} must be between 1 and {MAX_AP}"
            )));
        }
        Ok(())
    }

    /// AP cost of a single orthogonal tile of movement.
    #[must_use]
    pub fn tile_ap_cost(&self) -> u32 {
        self.action_costs.cost(ActionKind::Move)
    }
}
