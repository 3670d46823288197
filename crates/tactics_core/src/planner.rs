//! Slicing long paths into per-round movement segments.
//!
//! A path that costs more than one turn's AP is cut greedily: walk it step
//! by step and close the segment as soon as the next step would overflow the
//! round's budget. Adjacent segments share their boundary tile, so the unit
//! ends round N exactly where round N+1 starts.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TacticsError};
use crate::grid::TilePos;
use crate::math::{ceil_to_ap, fixed_serde, Fixed};
use crate::movement::StepCosts;
use crate::pathfinding::Path;
use crate::units::UnitId;

/// AP available for movement in each round of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanBudget {
    /// AP the unit has left this round.
    pub first_round: u32,
    /// AP granted on every later round (the unit's max AP).
    pub per_round: u32,
}

impl PlanBudget {
    /// Same budget every round, including this one.
    #[must_use]
    pub const fn uniform(ap: u32) -> Self {
        Self {
            first_round: ap,
            per_round: ap,
        }
    }

    fn for_round(self, offset: u32) -> u32 {
        if offset == 0 {
            self.first_round
        } else {
            self.per_round
        }
    }
}

/// Tiles walked during one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSegment {
    /// Rounds from now; 0 is the current round.
    pub round_offset: u32,
    /// Tiles including the starting tile.
    pub tiles: Vec<TilePos>,
    /// Movement AP this segment consumes.
    #[serde(with = "fixed_serde")]
    pub cost: Fixed,
}

impl PathSegment {
    /// Whole AP the segment charges.
    #[must_use]
    pub fn ap_cost(&self) -> u32 {
        ceil_to_ap(self.cost)
    }

    /// Where the unit stands at the end of the round.
    #[must_use]
    pub fn end(&self) -> Option<TilePos> {
        self.tiles.last().copied()
    }
}

/// A full movement order broken into rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementPlan {
    segments: Vec<PathSegment>,
}

impl MovementPlan {
    /// Segments in round order.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of rounds the plan spans.
    #[must_use]
    pub fn rounds(&self) -> usize {
        self.segments.len()
    }

    /// Segment executed this round.
    #[must_use]
    pub fn current_segment(&self) -> Option<&PathSegment> {
        self.segments.first()
    }

    /// Final tile of the plan.
    #[must_use]
    pub fn destination(&self) -> Option<TilePos> {
        self.segments.last().and_then(PathSegment::end)
    }

    /// Summed movement cost of every segment.
    #[must_use]
    pub fn total_cost(&self) -> Fixed {
        self.segments
            .iter()
            .fold(Fixed::ZERO, |total, s| total.saturating_add(s.cost))
    }

    /// Join the segments back into one tile list, dropping the shared
    /// boundary tile at each seam.
    #[must_use]
    pub fn concatenated_tiles(&self) -> Vec<TilePos> {
        let mut tiles = Vec::new();
        for (i, segment) in self.segments.iter().enumerate() {
            let skip = usize::from(i > 0);
            tiles.extend(segment.tiles.iter().skip(skip).copied());
        }
        tiles
    }
}

/// Cut `path` into per-round segments.
///
/// A single-tile path yields one empty-cost segment. When the current round
/// cannot afford even the first step, segment 0 holds only the start tile.
///
/// # Errors
///
/// [`TacticsError::EmptyPath`] for a path with no tiles,
/// [`TacticsError::NonContiguousPath`] if two tiles are not neighbours, and
/// [`TacticsError::StepExceedsBudget`] if one step costs more than a full
/// round grants (the plan would never finish).
pub fn plan_multi_turn_movement(
    path: &Path,
    budget: PlanBudget,
    step_costs: StepCosts,
) -> Result<MovementPlan> {
    let tiles = path.tiles();
    let first = *tiles.first().ok_or(TacticsError::EmptyPath)?;
    let per_round = Fixed::saturating_from_num(budget.per_round);

    let mut segments = Vec::new();
    let mut offset = 0u32;
    let mut current = vec![first];
    let mut spent = Fixed::ZERO;

    for (i, pair) in tiles.windows(2).enumerate() {
        let index = i + 1;
        let step = step_costs
            .between(pair[0], pair[1])
            .ok_or(TacticsError::NonContiguousPath { index })?;
        if step > per_round {
            return Err(TacticsError::StepExceedsBudget {
                index,
                cost: ceil_to_ap(step),
                per_round: budget.per_round,
            });
        }

        if spent.saturating_add(step) > Fixed::saturating_from_num(budget.for_round(offset)) {
            segments.push(PathSegment {
                round_offset: offset,
                tiles: std::mem::replace(&mut current, vec![pair[0]]),
                cost: spent,
            });
            offset += 1;
            spent = Fixed::ZERO;
        }

        current.push(pair[1]);
        spent = spent.saturating_add(step);
    }

    segments.push(PathSegment {
        round_offset: offset,
        tiles: current,
        cost: spent,
    });

    tracing::trace!(
        tiles = tiles.len(),
        rounds = segments.len(),
        first_round = budget.first_round,
        per_round = budget.per_round,
        "Multi-turn plan built"
    );

    Ok(MovementPlan { segments })
}

/// The one movement order a unit is carrying out across rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPlan {
    /// Unit executing the plan.
    pub unit: UnitId,
    /// Requested destination (before goal resolution).
    pub destination: TilePos,
    /// Budget the plan was sliced for.
    pub budget: PlanBudget,
    /// The sliced plan.
    pub plan: MovementPlan,
}

/// Holds at most one pending plan. Any new order replaces it wholesale.
#[derive(Debug, Clone, Default)]
pub struct MultiTurnPlanner {
    pending: Option<PendingPlan>,
}

impl MultiTurnPlanner {
    /// Planner with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The pending plan, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&PendingPlan> {
        self.pending.as_ref()
    }

    /// Whether the pending plan already answers this exact order.
    #[must_use]
    pub fn is_current(&self, unit: UnitId, destination: TilePos, budget: PlanBudget) -> bool {
        self.pending.as_ref().is_some_and(|p| {
            p.unit == unit && p.destination == destination && p.budget == budget
        })
    }

    /// Slice `path` and make it the pending plan, discarding any previous
    /// one. On error the previous plan is discarded too.
    pub fn plan(
        &mut self,
        unit: UnitId,
        destination: TilePos,
        path: &Path,
        budget: PlanBudget,
        step_costs: StepCosts,
    ) -> Result<&MovementPlan> {
        if let Some(old) = self.pending.take() {
            tracing::debug!(
                unit = old.unit,
                old_destination = %old.destination,
                new_destination = %destination,
                "Discarding pending movement plan"
            );
        }

        let plan = plan_multi_turn_movement(path, budget, step_costs)?;
        let pending = self.pending.insert(PendingPlan {
            unit,
            destination,
            budget,
            plan,
        });
        Ok(&pending.plan)
    }

    /// Drop the pending plan.
    pub fn cancel(&mut self) -> Option<PendingPlan> {
        self.pending.take()
    }

    /// Drop the pending plan if it belongs to `unit`.
    pub fn cancel_for(&mut self, unit: UnitId) -> Option<PendingPlan> {
        if self.pending.as_ref().is_some_and(|p| p.unit == unit) {
            self.pending.take()
        } else {
            None
        }
    }

    /// Pop this round's segment and shift the rest one round closer.
    /// The plan is cleared once its last segment is taken.
    pub fn advance_round(&mut self) -> Option<PathSegment> {
        let pending = self.pending.as_mut()?;
        if pending.plan.segments.is_empty() {
            self.pending = None;
            return None;
        }

        let executed = pending.plan.segments.remove(0);
        for segment in &mut pending.plan.segments {
            segment.round_offset = segment.round_offset.saturating_sub(1);
        }
        if pending.plan.segments.is_empty() {
            self.pending = None;
        }
        Some(executed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(len: i32) -> Path {
        Path::from_tiles((0..=len).map(|x| TilePos::new(x, 0)).collect())
    }

    #[test]
    fn test_short_path_single_segment() {
        let plan = plan_multi_turn_movement(&line(5), PlanBudget::uniform(12), StepCosts::default())
            .unwrap();
        assert_eq!(plan.rounds(), 1);
        assert_eq!(plan.segments()[0].cost, Fixed::from_num(5));
        assert_eq!(plan.concatenated_tiles(), line(5).tiles());
    }

    #[test]
    fn test_long_path_splits_on_budget() {
        let plan = plan_multi_turn_movement(&line(20), PlanBudget::uniform(12), StepCosts::default())
            .unwrap();

        assert_eq!(plan.rounds(), 2);
        let [first, second] = plan.segments() else {
            panic!("expected two segments");
        };
        assert_eq!(first.round_offset, 0);
        assert_eq!(first.ap_cost(), 12);
        assert_eq!(second.round_offset, 1);
        assert_eq!(second.ap_cost(), 8);
        assert_eq!(first.end(), second.tiles.first().copied());
        assert_eq!(plan.concatenated_tiles(), line(20).tiles());
    }

    #[test]
    fn test_exact_multiple_of_budget() {
        let plan = plan_multi_turn_movement(&line(8), PlanBudget::uniform(4), StepCosts::default())
            .unwrap();
        assert_eq!(plan.rounds(), 2);
        assert!(plan.segments().iter().all(|s| s.ap_cost() == 4));
    }

    #[test]
    fn test_first_round_uses_remaining_ap() {
        let budget = PlanBudget {
            first_round: 3,
            per_round: 10,
        };
        let plan = plan_multi_turn_movement(&line(8), budget, StepCosts::default()).unwrap();
        assert_eq!(plan.segments()[0].ap_cost(), 3);
        assert_eq!(plan.segments()[1].ap_cost(), 5);
    }

    #[test]
    fn test_no_ap_left_this_round() {
        let budget = PlanBudget {
            first_round: 0,
            per_round: 10,
        };
        let plan = plan_multi_turn_movement(&line(3), budget, StepCosts::default()).unwrap();
        assert_eq!(plan.segments()[0].tiles, vec![TilePos::new(0, 0)]);
        assert_eq!(plan.segments()[0].cost, Fixed::ZERO);
        assert_eq!(plan.concatenated_tiles(), line(3).tiles());
    }

    #[test]
    fn test_diagonal_steps_respect_budget() {
        let path = Path::from_tiles((0..=4).map(|i| TilePos::new(i, i)).collect());
        let plan = plan_multi_turn_movement(&path, PlanBudget::uniform(3), StepCosts::default())
            .unwrap();
        // Two diagonals cost 2.83; a third would overflow 3 AP.
        assert_eq!(plan.rounds(), 2);
        assert!(plan
            .segments()
            .iter()
            .all(|s| s.cost <= Fixed::from_num(3)));
    }

    #[test]
    fn test_budget_beyond_fixed_range() {
        let costs = StepCosts::default();
        let plan = plan_multi_turn_movement(&line(20), PlanBudget::uniform(3_000_000_000), costs)
            .unwrap();
        assert_eq!(plan.rounds(), 1);
        assert_eq!(plan.segments()[0].ap_cost(), 20);

        let budget = PlanBudget {
            first_round: 2,
            per_round: u32::MAX,
        };
        let plan = plan_multi_turn_movement(&line(5), budget, costs).unwrap();
        assert_eq!(plan.rounds(), 2);
        assert_eq!(plan.concatenated_tiles(), line(5).tiles());
    }

    #[test]
    fn test_single_tile_path() {
        let path = Path::from_tiles(vec![TilePos::new(2, 2)]);
        let plan = plan_multi_turn_movement(&path, PlanBudget::uniform(5), StepCosts::default())
            .unwrap();
        assert_eq!(plan.rounds(), 1);
        assert_eq!(plan.total_cost(), Fixed::ZERO);
    }

    #[test]
    fn test_errors() {
        let costs = StepCosts::default();
        assert_eq!(
            plan_multi_turn_movement(&Path::default(), PlanBudget::uniform(5), costs),
            Err(TacticsError::EmptyPath)
        );

        let gap = Path::from_tiles(vec![TilePos::new(0, 0), TilePos::new(2, 0)]);
        assert_eq!(
            plan_multi_turn_movement(&gap, PlanBudget::uniform(5), costs),
            Err(TacticsError::NonContiguousPath { index: 1 })
        );

        let expensive = StepCosts::new(3, true);
        assert!(matches!(
            plan_multi_turn_movement(&line(2), PlanBudget::uniform(2), expensive),
            Err(TacticsError::StepExceedsBudget { index: 1, cost: 3, per_round: 2 })
        ));
    }

    #[test]
    fn test_planner_replaces_wholesale() {
        let mut planner = MultiTurnPlanner::new();
        let costs = StepCosts::default();
        planner
            .plan(1, TilePos::new(20, 0), &line(20), PlanBudget::uniform(12), costs)
            .unwrap();
        assert!(planner.is_current(1, TilePos::new(20, 0), PlanBudget::uniform(12)));
        assert!(!planner.is_current(1, TilePos::new(20, 0), PlanBudget::uniform(8)));

        planner
            .plan(1, TilePos::new(5, 0), &line(5), PlanBudget::uniform(12), costs)
            .unwrap();
        let pending = planner.pending().unwrap();
        assert_eq!(pending.destination, TilePos::new(5, 0));
        assert_eq!(pending.plan.rounds(), 1);
    }

    #[test]
    fn test_failed_plan_clears_pending() {
        let mut planner = MultiTurnPlanner::new();
        let costs = StepCosts::default();
        planner
            .plan(1, TilePos::new(5, 0), &line(5), PlanBudget::uniform(12), costs)
            .unwrap();
        assert!(planner
            .plan(1, TilePos::new(9, 9), &Path::default(), PlanBudget::uniform(12), costs)
            .is_err());
        assert!(planner.pending().is_none());
    }

    #[test]
    fn test_advance_round_shifts_offsets() {
        let mut planner = MultiTurnPlanner::new();
        planner
            .plan(
                1,
                TilePos::new(20, 0),
                &line(20),
                PlanBudget::uniform(8),
                StepCosts::default(),
            )
            .unwrap();
        assert_eq!(planner.pending().unwrap().plan.rounds(), 3);

        let executed = planner.advance_round().unwrap();
        assert_eq!(executed.round_offset, 0);
        let rest = &planner.pending().unwrap().plan;
        assert_eq!(rest.segments()[0].round_offset, 0);
        assert_eq!(rest.segments()[1].round_offset, 1);

        planner.advance_round();
        planner.advance_round();
        assert!(planner.pending().is_none());
        assert!(planner.advance_round().is_none());
    }
}
