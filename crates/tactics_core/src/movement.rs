//! Movement range: every tile a unit can reach with its remaining AP.
//!
//! A uniform-cost search from the unit's tile, cut off at the AP budget.
//! It uses the pathfinder's step rules (same neighbours, same corner check,
//! diagonal steps √2 times an orthogonal one) scaled by the per-tile AP cost,
//! so "can I reach it" and "what does the path cost" always agree.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::TacticsConfig;
use crate::grid::{MapOracle, TilePos};
use crate::math::{fixed_serde, Fixed, SQRT_2};
use crate::pathfinding::{directions, is_diagonal_valid, Path};

/// AP cost of single steps under the configured movement model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepCosts {
    /// Cost of an orthogonal step.
    pub orthogonal: Fixed,
    /// Cost of a diagonal step, `None` when diagonals are disabled.
    pub diagonal: Option<Fixed>,
}

impl StepCosts {
    /// Step costs for a per-tile AP cost.
    #[must_use]
    pub fn new(tile_ap_cost: u32, allow_diagonal: bool) -> Self {
        let orthogonal = Fixed::saturating_from_num(tile_ap_cost);
        Self {
            orthogonal,
            diagonal: allow_diagonal.then(|| orthogonal.saturating_mul(SQRT_2)),
        }
    }

    /// Step costs described by a configuration.
    #[must_use]
    pub fn from_config(config: &TacticsConfig) -> Self {
        Self::new(config.tile_ap_cost(), config.movement.allow_diagonal)
    }

    /// Cost of moving between two adjacent tiles, `None` if the move is not
    /// a legal single step under this model.
    #[must_use]
    pub fn between(&self, from: TilePos, to: TilePos) -> Option<Fixed> {
        match (from.x.abs_diff(to.x), from.y.abs_diff(to.y)) {
            (0, 0) => Some(Fixed::ZERO),
            (1, 0) | (0, 1) => Some(self.orthogonal),
            (1, 1) => self.diagonal,
            _ => None,
        }
    }

    /// Cost of walking a whole path, `None` if it contains an illegal step.
    #[must_use]
    pub fn path_cost(&self, path: &Path) -> Option<Fixed> {
        path.tiles()
            .windows(2)
            .map(|pair| self.between(pair[0], pair[1]))
            .sum()
    }
}

impl Default for StepCosts {
    fn default() -> Self {
        Self::new(1, true)
    }
}

/// One reachable tile and the cheapest AP cost to get there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementTile {
    /// Tile position.
    pub pos: TilePos,
    /// Minimum cumulative AP cost from the origin.
    #[serde(with = "fixed_serde")]
    pub cost: Fixed,
}

/// Result of [`calculate_movement_range`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementRange {
    origin: TilePos,
    budget: Fixed,
    costs: HashMap<TilePos, Fixed>,
    came_from: HashMap<TilePos, TilePos>,
}

impl MovementRange {
    /// Tile the search started from.
    #[must_use]
    pub const fn origin(&self) -> TilePos {
        self.origin
    }

    /// AP budget the range was computed for.
    #[must_use]
    pub const fn budget(&self) -> Fixed {
        self.budget
    }

    /// Whether `pos` is reachable within budget.
    #[must_use]
    pub fn contains(&self, pos: TilePos) -> bool {
        self.costs.contains_key(&pos)
    }

    /// Minimum cost to reach `pos`, if reachable.
    #[must_use]
    pub fn cost_to(&self, pos: TilePos) -> Option<Fixed> {
        self.costs.get(&pos).copied()
    }

    /// Number of reachable tiles, origin included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.costs.len()
    }

    /// Never true: the origin is always in range.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// Reachable tiles in row-major order.
    #[must_use]
    pub fn tiles(&self) -> Vec<MovementTile> {
        let mut tiles: Vec<_> = self
            .costs
            .iter()
            .map(|(&pos, &cost)| MovementTile { pos, cost })
            .collect();
        tiles.sort_unstable_by_key(|t| t.pos.row_major());
        tiles
    }

    /// Cheapest in-budget path from the origin to `pos`.
    #[must_use]
    pub fn path_to(&self, pos: TilePos) -> Option<Path> {
        if !self.contains(pos) {
            return None;
        }
        let mut tiles = vec![pos];
        let mut current = pos;
        while let Some(&prev) = self.came_from.get(&current) {
            tiles.push(prev);
            current = prev;
        }
        tiles.reverse();
        Some(Path::from_tiles(tiles))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frontier {
    cost: Fixed,
    pos: TilePos,
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .cmp(&other.cost)
            .then_with(|| self.pos.row_major().cmp(&other.pos.row_major()))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Enumerate every tile reachable from `origin` for at most `available_ap`.
///
/// The origin is always included at cost 0, even if the map reports it as
/// not walkable. Every other tile in the result is walkable.
pub fn calculate_movement_range<M: MapOracle + ?Sized>(
    map: &M,
    origin: TilePos,
    available_ap: u32,
    step_costs: StepCosts,
) -> MovementRange {
    let budget = Fixed::saturating_from_num(available_ap);
    let mut costs: HashMap<TilePos, Fixed> = HashMap::new();
    let mut came_from: HashMap<TilePos, TilePos> = HashMap::new();
    let mut queue: BinaryHeap<Reverse<Frontier>> = BinaryHeap::new();

    costs.insert(origin, Fixed::ZERO);
    queue.push(Reverse(Frontier {
        cost: Fixed::ZERO,
        pos: origin,
    }));

    while let Some(Reverse(current)) = queue.pop() {
        if costs.get(&current.pos).is_some_and(|&c| current.cost > c) {
            continue;
        }

        for &(dx, dy) in directions(step_costs.diagonal.is_some()) {
            let Some(next) = current.pos.checked_offset(dx, dy) else {
                continue;
            };
            if !map.is_walkable(next) || !is_diagonal_valid(map, current.pos, dx, dy) {
                continue;
            }
            let Some(step) = step_costs.between(current.pos, next) else {
                continue;
            };

            let next_cost = current.cost.saturating_add(step);
            if next_cost > budget {
                continue;
            }
            if costs.get(&next).map_or(true, |&known| next_cost < known) {
                costs.insert(next, next_cost);
                came_from.insert(next, current.pos);
                queue.push(Reverse(Frontier {
                    cost: next_cost,
                    pos: next,
                }));
            }
        }
    }

    tracing::trace!(%origin, available_ap, reachable = costs.len(), "Movement range computed");

    MovementRange {
        origin,
        budget,
        costs,
        came_from,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    fn pos(x: i32, y: i32) -> TilePos {
        TilePos::new(x, y)
    }

    #[test]
    fn test_zero_budget_is_origin_only() {
        let grid = Grid::new(5, 5);
        let range = calculate_movement_range(&grid, pos(2, 2), 0, StepCosts::default());
        assert_eq!(range.len(), 1);
        assert_eq!(range.cost_to(pos(2, 2)), Some(Fixed::ZERO));
    }

    #[test]
    fn test_one_ap_reaches_orthogonal_neighbours_only() {
        let grid = Grid::new(5, 5);
        let range = calculate_movement_range(&grid, pos(2, 2), 1, StepCosts::default());

        assert_eq!(range.len(), 5);
        assert!(range.contains(pos(2, 1)));
        assert!(!range.contains(pos(3, 3)), "diagonal costs √2 > 1");
    }

    #[test]
    fn test_two_ap_includes_diagonals() {
        let grid = Grid::new(7, 7);
        let range = calculate_movement_range(&grid, pos(3, 3), 2, StepCosts::default());

        assert_eq!(range.cost_to(pos(4, 4)), Some(SQRT_2));
        assert_eq!(range.cost_to(pos(5, 3)), Some(Fixed::from_num(2)));
        assert!(!range.contains(pos(5, 4)), "1 + √2 > 2");
    }

    #[test]
    fn test_walls_excluded_and_block_expansion() {
        let grid = Grid::with_walls(5, 1, [pos(2, 0)]);
        let range = calculate_movement_range(&grid, pos(0, 0), 10, StepCosts::default());

        assert!(!range.contains(pos(2, 0)));
        assert!(!range.contains(pos(3, 0)));
        assert_eq!(range.len(), 2);
    }

    #[test]
    fn test_origin_included_even_if_blocked() {
        let grid = Grid::with_walls(3, 3, [pos(1, 1)]);
        let range = calculate_movement_range(&grid, pos(1, 1), 1, StepCosts::default());
        assert!(range.contains(pos(1, 1)));
        assert_eq!(range.cost_to(pos(1, 1)), Some(Fixed::ZERO));
    }

    #[test]
    fn test_tile_cost_scales_range() {
        let grid = Grid::new(9, 1);
        let range = calculate_movement_range(&grid, pos(0, 0), 6, StepCosts::new(2, true));
        assert!(range.contains(pos(3, 0)));
        assert!(!range.contains(pos(4, 0)));
    }

    #[test]
    fn test_path_to_matches_cost() {
        let grid = Grid::with_walls(6, 6, (0..5).map(|y| pos(2, y)));
        let costs = StepCosts::default();
        let range = calculate_movement_range(&grid, pos(0, 0), 20, costs);

        let path = range.path_to(pos(4, 0)).unwrap();
        assert!(path.is_contiguous());
        assert_eq!(path.start(), Some(pos(0, 0)));
        assert_eq!(costs.path_cost(&path), range.cost_to(pos(4, 0)));
    }

    #[test]
    fn test_orthogonal_only_model() {
        let grid = Grid::new(5, 5);
        let range = calculate_movement_range(&grid, pos(2, 2), 2, StepCosts::new(1, false));
        assert_eq!(range.cost_to(pos(3, 3)), Some(Fixed::from_num(2)));
        assert_eq!(range.len(), 13);
    }

    #[test]
    fn test_budget_beyond_fixed_range() {
        let grid = Grid::new(4, 4);
        let range = calculate_movement_range(&grid, pos(0, 0), u32::MAX, StepCosts::default());
        assert_eq!(range.len(), 16);

        // A per-tile cost past the fixed-point range saturates instead of wrapping.
        let costs = StepCosts::new(u32::MAX, true);
        assert_eq!(costs.orthogonal, Fixed::MAX);
        let range = calculate_movement_range(&grid, pos(0, 0), u32::MAX, costs);
        assert!(range.contains(pos(1, 0)));
    }

    #[test]
    fn test_tiles_are_row_major() {
        let grid = Grid::new(3, 3);
        let range = calculate_movement_range(&grid, pos(1, 1), 5, StepCosts::default());
        let tiles = range.tiles();
        assert_eq!(tiles.len(), 9);
        assert_eq!(tiles[0].pos, pos(0, 0));
        assert_eq!(tiles[8].pos, pos(2, 2));
    }
}
