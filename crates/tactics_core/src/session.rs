//! One tactical encounter: the map, the roster and every service acting on
//! them, wired together once and handed to the input and rendering layers.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::config::{ActionKind, TacticsConfig};
use crate::error::{Result, TacticsError};
use crate::grid::{DoorTable, Grid, MapOracle, MapView, TilePos};
use crate::movement::{calculate_movement_range, MovementRange, StepCosts};
use crate::pathfinding::{Path, Pathfinder};
use crate::planner::{MovementPlan, MultiTurnPlanner, PathSegment, PlanBudget};
use crate::turns::{SchedulerPhase, TurnScheduler};
use crate::units::{Roster, Unit, UnitId};

/// What one executed movement order did this round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    /// Unit that moved.
    pub unit: UnitId,
    /// Tiles walked this round.
    pub segment: PathSegment,
    /// AP charged for the segment.
    pub ap_spent: u32,
    /// AP left afterwards.
    pub remaining_ap: u32,
    /// Rounds still needed to reach the destination (0 once arrived).
    pub rounds_remaining: usize,
}

impl MoveOutcome {
    /// Whether the unit reached the end of its path.
    #[must_use]
    pub const fn arrived(&self) -> bool {
        self.rounds_remaining == 0
    }
}

/// Composition root for the tactics core.
#[derive(Debug)]
pub struct TacticalSession {
    config: TacticsConfig,
    grid: Grid,
    doors: DoorTable,
    roster: Roster,
    step_costs: StepCosts,
    pathfinder: Pathfinder,
    scheduler: TurnScheduler,
    planner: MultiTurnPlanner,
}

impl TacticalSession {
    /// Build a session. `seed` drives initiative rolls.
    pub fn new(
        config: TacticsConfig,
        grid: Grid,
        doors: DoorTable,
        roster: Roster,
        seed: u64,
    ) -> Result<Self> {
        config.validate()?;
        let pathfinder = Pathfinder::new(&config.pathfinding, &config.movement);
        let scheduler = TurnScheduler::with_seed(&config, seed);
        Ok(Self {
            step_costs: StepCosts::from_config(&config),
            config,
            grid,
            doors,
            roster,
            pathfinder,
            scheduler,
            planner: MultiTurnPlanner::new(),
        })
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &TacticsConfig {
        &self.config
    }

    /// Terrain and doors as one walkability oracle.
    #[must_use]
    pub fn map(&self) -> MapView<'_> {
        MapView::new(&self.grid, &self.doors)
    }

    /// Terrain grid.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Door table.
    #[must_use]
    pub fn doors(&self) -> &DoorTable {
        &self.doors
    }

    /// All units.
    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Turn scheduler state.
    #[must_use]
    pub fn scheduler(&self) -> &TurnScheduler {
        &self.scheduler
    }

    /// Pending multi-round movement.
    #[must_use]
    pub fn planner(&self) -> &MultiTurnPlanner {
        &self.planner
    }

    /// Pathfinder (for cache statistics).
    #[must_use]
    pub fn pathfinder(&self) -> &Pathfinder {
        &self.pathfinder
    }

    /// Step cost model shared by ranges and plans.
    #[must_use]
    pub const fn step_costs(&self) -> StepCosts {
        self.step_costs
    }

    /// Whether a unit may stand on `pos`.
    #[must_use]
    pub fn is_walkable(&self, pos: TilePos) -> bool {
        self.map().is_walkable(pos)
    }

    /// Line of sight between two tiles.
    #[must_use]
    pub fn has_line_of_sight(&self, a: TilePos, b: TilePos) -> bool {
        self.map().has_line_of_sight(a, b)
    }

    /// Shortest path between two tiles, `None` if unreachable.
    pub fn find_path(&mut self, start: TilePos, goal: TilePos) -> Option<Path> {
        let map = MapView::new(&self.grid, &self.doors);
        self.pathfinder.find_path(&map, start, goal)
    }

    /// Tiles `unit` can reach with its current AP.
    pub fn movement_range(&self, unit: UnitId) -> Result<MovementRange> {
        let ap = self.unit_ref(unit)?.current_ap;
        self.movement_range_with(unit, ap)
    }

    /// Tiles `unit` could reach with `available_ap`.
    pub fn movement_range_with(&self, unit: UnitId, available_ap: u32) -> Result<MovementRange> {
        let origin = self.unit_ref(unit)?.position;
        Ok(calculate_movement_range(
            &self.map(),
            origin,
            available_ap,
            self.step_costs,
        ))
    }

    /// Start turn-based mode; returns the first unit to act.
    pub fn begin_encounter(&mut self) -> Option<UnitId> {
        self.planner.cancel();
        self.scheduler.begin_encounter(&mut self.roster)
    }

    /// Leave turn-based mode.
    pub fn end_encounter(&mut self) {
        self.planner.cancel();
        self.scheduler.end_encounter();
    }

    /// Give the turn to a queue slot (see [`TurnScheduler::start_turn`]).
    pub fn start_turn(&mut self, index: usize) -> Option<UnitId> {
        self.scheduler.start_turn(&mut self.roster, index)
    }

    /// Finish the active turn; returns the next unit to act, `None` once
    /// the encounter is over.
    pub fn end_turn(&mut self) -> Option<UnitId> {
        self.scheduler.end_turn(&mut self.roster)
    }

    /// Unit taking its turn.
    #[must_use]
    pub fn active_unit(&self) -> Option<UnitId> {
        self.scheduler.active_unit()
    }

    /// Current scheduler state.
    #[must_use]
    pub fn phase(&self) -> SchedulerPhase {
        self.scheduler.phase()
    }

    /// Whether the active unit can pay for `action`.
    #[must_use]
    pub fn can_afford(&self, action: ActionKind) -> bool {
        self.scheduler.can_afford(&self.roster, action)
    }

    /// Pay for a non-movement action with the active unit.
    ///
    /// Spending AP invalidates the active unit's pending plan, which was
    /// sliced for the old budget.
    pub fn perform_action(&mut self, action: ActionKind) -> Result<u32> {
        let remaining = self.scheduler.spend_action(&mut self.roster, action)?;
        if let Some(unit) = self.scheduler.active_unit() {
            self.planner.cancel_for(unit);
        }
        tracing::debug!(?action, remaining, "Action performed");
        Ok(remaining)
    }

    /// Plan `unit`'s route to `goal` across rounds without moving it.
    ///
    /// The first round uses the unit's remaining AP, later rounds its max AP.
    /// The result always replaces the pending plan.
    pub fn plan_move(&mut self, unit: UnitId, goal: TilePos) -> Result<MovementPlan> {
        let (start, budget) = {
            let u = self.unit_ref(unit)?;
            let budget = PlanBudget {
                first_round: u.current_ap,
                per_round: self.scheduler.max_ap(u.kind),
            };
            (u.position, budget)
        };

        let path = self.find_path(start, goal).ok_or(TacticsError::NoPath {
            from_x: start.x,
            from_y: start.y,
            to_x: goal.x,
            to_y: goal.y,
        })?;
        let step_costs = self.step_costs;
        self.planner
            .plan(unit, goal, &path, budget, step_costs)
            .cloned()
    }

    /// Order the active unit toward `goal` and walk this round's segment.
    ///
    /// Always replans from the unit's current tile and AP. The rest of the
    /// route stays pending for later rounds.
    pub fn order_move(&mut self, unit: UnitId, goal: TilePos) -> Result<MoveOutcome> {
        let active = self.scheduler.active_unit().ok_or(TacticsError::NoActiveUnit)?;
        if active != unit {
            return Err(TacticsError::NotActiveUnit {
                requested: unit,
                active,
            });
        }

        self.planner.cancel();
        self.plan_move(unit, goal)?;
        let segment = self
            .planner
            .advance_round()
            .ok_or(TacticsError::EmptyPath)?;
        let ap_spent = segment.ap_cost();
        let remaining_ap = self.scheduler.spend_ap(&mut self.roster, ap_spent)?;

        if let (Some(end), Some(u)) = (segment.end(), self.roster.get_mut(unit)) {
            u.position = end;
        }
        let rounds_remaining = self.planner.pending().map_or(0, |p| p.plan.rounds());

        tracing::debug!(
            unit,
            to = ?segment.end(),
            ap_spent,
            remaining_ap,
            rounds_remaining,
            "Unit moved"
        );

        Ok(MoveOutcome {
            unit,
            segment,
            ap_spent,
            remaining_ap,
            rounds_remaining,
        })
    }

    /// Resume the active unit's pending plan, if it has one.
    pub fn continue_move(&mut self) -> Result<Option<MoveOutcome>> {
        let Some(active) = self.scheduler.active_unit() else {
            return Ok(None);
        };
        let destination = match self.planner.pending() {
            Some(p) if p.unit == active => p.destination,
            _ => return Ok(None),
        };
        self.order_move(active, destination).map(Some)
    }

    /// Flip a door's lock. Returns the new state, `None` if no door there.
    pub fn toggle_door(&mut self, pos: TilePos) -> Option<bool> {
        let locked = !self.doors.get(pos)?.locked;
        self.set_door_locked(pos, locked).then_some(locked)
    }

    /// Set a door's lock. Returns `false` if no door there.
    pub fn set_door_locked(&mut self, pos: TilePos, locked: bool) -> bool {
        let changed = self.doors.set_locked(pos, locked);
        if changed {
            tracing::debug!(%pos, locked, revision = self.doors.revision(), "Door state set");
        }
        changed
    }

    /// Kill a unit; it drops out of the next round's queue and loses any
    /// pending plan.
    pub fn kill_unit(&mut self, unit: UnitId) -> bool {
        if !self.roster.kill(unit) {
            return false;
        }
        self.planner.cancel_for(unit);
        tracing::debug!(unit, "Unit killed");
        true
    }

    /// Hash of everything observable about the encounter: round, phase,
    /// queue order with initiatives, door states and each unit's position,
    /// AP and status. Equal seeds and commands give equal hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.scheduler.round().hash(&mut hasher);
        self.scheduler.phase().hash(&mut hasher);
        self.scheduler.active_unit().hash(&mut hasher);

        self.scheduler.queue().len().hash(&mut hasher);
        for entry in self.scheduler.queue() {
            (entry.unit, entry.initiative, entry.max_ap).hash(&mut hasher);
        }

        for door in self.doors.iter() {
            (door.pos, door.locked).hash(&mut hasher);
        }

        self.roster.len().hash(&mut hasher);
        for unit in self.roster.iter() {
            (unit.id, unit.position, unit.current_ap, unit.alive).hash(&mut hasher);
        }

        hasher.finish()
    }

    fn unit_ref(&self, unit: UnitId) -> Result<&Unit> {
        self.roster
            .get(unit)
            .filter(|u| u.alive)
            .ok_or(TacticsError::UnknownUnit(unit))
    }
}
