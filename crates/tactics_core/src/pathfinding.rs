//! Grid-based pathfinding using the A* algorithm.
//!
//! Costs are 1 for an orthogonal step and √2 for a diagonal one, with a
//! Euclidean heuristic. Accumulation uses fixed-point math so that the open
//! set ordering is exact and identical across platforms.
//!
//! Paths include the start tile: `find_path(s, s)` is `Some([s])`, while
//! `None` always means "unreachable".

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::{MovementConfig, PathfindingConfig};
use crate::grid::{MapOracle, TilePos};
use crate::math::{euclidean, Fixed, SQRT_2};
use crate::path_cache::{CacheStats, PathCache};

/// Ordered, contiguous sequence of walkable tiles from start to goal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path {
    tiles: Vec<TilePos>,
}

impl Path {
    /// Wrap a tile sequence. The caller guarantees contiguity.
    #[must_use]
    pub fn from_tiles(tiles: Vec<TilePos>) -> Self {
        Self { tiles }
    }

    /// Tiles in travel order, start first.
    #[must_use]
    pub fn tiles(&self) -> &[TilePos] {
        &self.tiles
    }

    /// Consume into the tile vector.
    #[must_use]
    pub fn into_tiles(self) -> Vec<TilePos> {
        self.tiles
    }

    /// First tile.
    #[must_use]
    pub fn start(&self) -> Option<TilePos> {
        self.tiles.first().copied()
    }

    /// Last tile.
    #[must_use]
    pub fn goal(&self) -> Option<TilePos> {
        self.tiles.last().copied()
    }

    /// Number of tiles, start included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the path has no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Number of steps (tiles after the start).
    #[must_use]
    pub fn steps(&self) -> usize {
        self.tiles.len().saturating_sub(1)
    }

    /// Geometric cost: 1 per orthogonal step, √2 per diagonal step.
    #[must_use]
    pub fn cost(&self) -> Fixed {
        self.tiles
            .windows(2)
            .map(|pair| step_cost(pair[0], pair[1]))
            .sum()
    }

    /// Every consecutive pair is one king move apart.
    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        self.tiles.windows(2).all(|pair| pair[0].is_adjacent(pair[1]))
    }
}

/// Unit cost of one step between adjacent tiles.
#[inline]
#[must_use]
pub fn step_cost(from: TilePos, to: TilePos) -> Fixed {
    if from.x != to.x && from.y != to.y {
        SQRT_2
    } else {
        Fixed::ONE
    }
}

/// Direction offsets for 8-directional movement; orthogonals first.
pub(crate) const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),   // East
    (0, 1),   // South
    (-1, 0),  // West
    (0, -1),  // North
    (1, 1),   // Southeast
    (-1, 1),  // Southwest
    (-1, -1), // Northwest
    (1, -1),  // Northeast
];

/// Neighbour offsets allowed by the movement model.
pub(crate) fn directions(allow_diagonal: bool) -> &'static [(i32, i32)] {
    if allow_diagonal {
        &DIRECTIONS
    } else {
        &DIRECTIONS[..4]
    }
}

/// A diagonal step is legal only if both orthogonal corner tiles are
/// walkable; orthogonal steps always pass.
#[inline]
pub(crate) fn is_diagonal_valid<M: MapOracle + ?Sized>(
    map: &M,
    from: TilePos,
    dx: i32,
    dy: i32,
) -> bool {
    if dx != 0 && dy != 0 {
        map.is_walkable(from.offset(dx, 0)) && map.is_walkable(from.offset(0, dy))
    } else {
        true
    }
}

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    pos: TilePos,
    g_score: Fixed,
    f_score: Fixed,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: lower f wins, then higher g (closer to
        // the goal), then row-major position for determinism.
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| self.g_score.cmp(&other.g_score))
            .then_with(|| other.pos.row_major().cmp(&self.pos.row_major()))
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Subtracted from the Euclidean estimate. `fixed_sqrt` squares each candidate
/// with a truncating multiply and can land one raw bit above the true root,
/// while a pure diagonal run costs only a fraction of a bit more than it.
const HEURISTIC_SLACK: Fixed = Fixed::from_bits(1 << 12);

fn heuristic(from: TilePos, to: TilePos, allow_diagonal: bool) -> Fixed {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if allow_diagonal {
        euclidean(dx, dy).saturating_sub(HEURISTIC_SLACK).max(Fixed::ZERO)
    } else {
        Fixed::saturating_from_num(u64::from(dx.unsigned_abs()) + u64::from(dy.unsigned_abs()))
    }
}

/// Nearest walkable tile to `goal` within a Chebyshev `radius`.
///
/// Returns `goal` itself when it is walkable. Among substitutes, the one
/// with the smallest Euclidean distance wins; ties go to the lower row, then
/// the lower column.
pub fn resolve_goal<M: MapOracle + ?Sized>(map: &M, goal: TilePos, radius: u32) -> Option<TilePos> {
    if map.is_walkable(goal) {
        return Some(goal);
    }
    // Only the part of the search square that overlaps the map can match.
    let (width, height) = map.size();
    let clip = |centre: i32, extent: u32| {
        let r = i64::from(radius);
        let low = (i64::from(centre) - r).max(0);
        let high = (i64::from(centre) + r).min(i64::from(extent) - 1);
        let to_i32 = |v: i64| i32::try_from(v).unwrap_or(i32::MAX);
        (low <= high).then(|| to_i32(low)..=to_i32(high))
    };
    let xs = clip(goal.x, width)?;
    let ys = clip(goal.y, height)?;

    ys.flat_map(|y| xs.clone().map(move |x| TilePos::new(x, y)))
        .filter(|&pos| map.is_walkable(pos))
        .min_by_key(|&pos| (pos.distance_squared(goal), pos.row_major()))
}

/// Run A* without caching.
///
/// Returns `None` if the start is not walkable, the goal cannot be resolved
/// to a walkable tile within `goal_search_radius`, or the open set runs dry.
pub fn find_path_uncached<M: MapOracle + ?Sized>(
    map: &M,
    start: TilePos,
    goal: TilePos,
    allow_diagonal: bool,
    goal_search_radius: u32,
) -> Option<Path> {
    if !map.is_walkable(start) {
        return None;
    }
    let goal = resolve_goal(map, goal, goal_search_radius)?;

    if start == goal {
        return Some(Path::from_tiles(vec![start]));
    }

    let mut open_set: BinaryHeap<AStarNode> = BinaryHeap::new();
    let mut came_from: HashMap<TilePos, TilePos> = HashMap::new();
    let mut g_score: HashMap<TilePos, Fixed> = HashMap::new();

    g_score.insert(start, Fixed::ZERO);
    open_set.push(AStarNode {
        pos: start,
        g_score: Fixed::ZERO,
        f_score: heuristic(start, goal, allow_diagonal),
    });

    while let Some(current) = open_set.pop() {
        if current.pos == goal {
            return Some(reconstruct_path(&came_from, goal));
        }

        // Skip stale queue entries superseded by a cheaper route.
        let best_g = g_score.get(&current.pos).copied().unwrap_or(Fixed::MAX);
        if current.g_score > best_g {
            continue;
        }

        for &(dx, dy) in directions(allow_diagonal) {
            let Some(next) = current.pos.checked_offset(dx, dy) else {
                continue;
            };

            if !map.is_walkable(next) {
                continue;
            }
            if !is_diagonal_valid(map, current.pos, dx, dy) {
                continue;
            }

            let tentative_g = current.g_score.saturating_add(step_cost(current.pos, next));
            let neighbor_g = g_score.get(&next).copied().unwrap_or(Fixed::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(next, current.pos);
                g_score.insert(next, tentative_g);
                open_set.push(AStarNode {
                    pos: next,
                    g_score: tentative_g,
                    f_score: tentative_g.saturating_add(heuristic(next, goal, allow_diagonal)),
                });
            }
        }
    }

    None
}

/// Reconstruct path from came_from map.
fn reconstruct_path(came_from: &HashMap<TilePos, TilePos>, goal: TilePos) -> Path {
    let mut tiles = vec![goal];
    let mut current = goal;

    while let Some(&prev) = came_from.get(&current) {
        tiles.push(prev);
        current = prev;
    }

    tiles.reverse();
    Path::from_tiles(tiles)
}

/// A* pathfinder with a per-mission result cache.
///
/// The cache is flushed whenever the map's [`MapOracle::revision`] changes,
/// so unlocking a door is never answered with a stale "no path".
#[derive(Debug, Clone)]
pub struct Pathfinder {
    allow_diagonal: bool,
    goal_search_radius: u32,
    cache: PathCache,
    map_revision: Option<u64>,
}

impl Pathfinder {
    /// Create a pathfinder from configuration.
    #[must_use]
    pub fn new(config: &PathfindingConfig, movement: &MovementConfig) -> Self {
        Self {
            allow_diagonal: movement.allow_diagonal,
            goal_search_radius: config.goal_search_radius,
            cache: PathCache::new(config.cache_capacity, config.cache_timeout()),
            map_revision: None,
        }
    }

    /// Find a path, timestamping cache entries with the wall clock.
    pub fn find_path<M: MapOracle + ?Sized>(
        &mut self,
        map: &M,
        start: TilePos,
        goal: TilePos,
    ) -> Option<Path> {
        self.find_path_at(map, start, goal, Instant::now())
    }

    /// Find a path with an explicit "now" for cache expiry.
    pub fn find_path_at<M: MapOracle + ?Sized>(
        &mut self,
        map: &M,
        start: TilePos,
        goal: TilePos,
        now: Instant,
    ) -> Option<Path> {
        let revision = map.revision();
        if self.map_revision != Some(revision) {
            if !self.cache.is_empty() {
                tracing::debug!(revision, "Map changed, flushing path cache");
            }
            self.cache.clear();
            self.map_revision = Some(revision);
        }

        let key = (start, goal);
        if let Some(cached) = self.cache.get(key, now) {
            tracing::trace!(%start, %goal, found = cached.is_some(), "Path cache hit");
            return cached;
        }

        let path = find_path_uncached(
            map,
            start,
            goal,
            self.allow_diagonal,
            self.goal_search_radius,
        );
        tracing::debug!(
            %start,
            %goal,
            steps = path.as_ref().map(Path::steps),
            "Computed path"
        );
        self.cache.insert(key, path.clone(), now);
        path
    }

    /// Whether diagonal steps are allowed.
    #[must_use]
    pub const fn allows_diagonal(&self) -> bool {
        self.allow_diagonal
    }

    /// Number of cached results.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Cache counters.
    #[must_use]
    pub const fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop all cached results.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

impl Default for Pathfinder {
    fn default() -> Self {
        Self::new(&PathfindingConfig::default(), &MovementConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::grid::{Door, DoorTable, Grid, MapView};

    fn pos(x: i32, y: i32) -> TilePos {
        TilePos::new(x, y)
    }

    fn close_to(a: Fixed, b: f64) -> bool {
        (a.to_num::<f64>() - b).abs() < 1e-6
    }

    #[test]
    fn test_simple_diagonal_path() {
        let grid = Grid::new(10, 10);
        let path = find_path_uncached(&grid, pos(0, 0), pos(5, 5), true, 5).unwrap();

        assert_eq!(path.start(), Some(pos(0, 0)));
        assert_eq!(path.goal(), Some(pos(5, 5)));
        assert_eq!(path.len(), 6);
        assert!(close_to(path.cost(), 5.0 * std::f64::consts::SQRT_2));
    }

    #[test]
    fn test_path_around_obstacle() {
        let grid = Grid::with_walls(10, 10, (2..8).map(|y| pos(5, y)));
        let path = find_path_uncached(&grid, pos(2, 5), pos(8, 5), true, 5).unwrap();

        assert!(path.is_contiguous());
        for &tile in path.tiles() {
            assert!(grid.is_walkable(tile), "Path goes through blocked cell {tile}");
        }
    }

    #[test]
    fn test_no_path_exists() {
        let grid = Grid::with_walls(10, 10, (0..10).map(|y| pos(5, y)));
        assert!(find_path_uncached(&grid, pos(2, 5), pos(8, 5), true, 5).is_none());
    }

    #[test]
    fn test_path_to_same_cell() {
        let grid = Grid::new(10, 10);
        let path = find_path_uncached(&grid, pos(5, 5), pos(5, 5), true, 5).unwrap();
        assert_eq!(path.tiles(), &[pos(5, 5)]);
        assert_eq!(path.cost(), Fixed::ZERO);
    }

    #[test]
    fn test_blocked_start() {
        let grid = Grid::with_walls(10, 10, [pos(0, 0)]);
        assert!(find_path_uncached(&grid, pos(0, 0), pos(5, 5), true, 5).is_none());
    }

    #[test]
    fn test_blocked_goal_resolves_to_nearest_walkable() {
        let grid = Grid::with_walls(10, 10, [pos(5, 5)]);
        let path = find_path_uncached(&grid, pos(0, 5), pos(5, 5), true, 2).unwrap();
        // Four tiles tie at distance 1; the lowest row wins.
        assert_eq!(path.goal(), Some(pos(5, 4)));
    }

    #[test]
    fn test_blocked_goal_outside_radius_is_none() {
        // 5x5 block of walls centred on (5, 5); radius 1 finds nothing.
        let walls = (3..8).flat_map(|y| (3..8).map(move |x| pos(x, y)));
        let grid = Grid::with_walls(10, 10, walls);
        assert!(find_path_uncached(&grid, pos(0, 0), pos(5, 5), true, 1).is_none());
        assert!(find_path_uncached(&grid, pos(0, 0), pos(5, 5), true, 3).is_some());
    }

    #[test]
    fn test_goal_out_of_bounds_resolves_inside() {
        let grid = Grid::new(5, 5);
        let path = find_path_uncached(&grid, pos(0, 0), pos(6, 4), true, 2).unwrap();
        assert_eq!(path.goal(), Some(pos(4, 4)));
    }

    #[test]
    fn test_goal_at_coordinate_limits() {
        let grid = Grid::new(10, 10);
        assert!(find_path_uncached(&grid, pos(0, 0), pos(i32::MAX, 0), true, 5).is_none());
        assert!(find_path_uncached(&grid, pos(0, 0), pos(i32::MIN, i32::MIN), true, 5).is_none());
        assert!(find_path_uncached(&grid, pos(i32::MAX, i32::MAX), pos(0, 0), true, 5).is_none());

        // A huge radius only scans the tiles that overlap the map.
        let path = find_path_uncached(&grid, pos(0, 0), pos(i32::MAX, 0), true, u32::MAX).unwrap();
        assert_eq!(path.goal(), Some(pos(9, 0)));
    }

    #[test]
    fn test_huge_radius_around_enclosed_goal() {
        let walls = (3..8).flat_map(|y| (3..8).map(move |x| pos(x, y)));
        let grid = Grid::with_walls(10, 10, walls);
        assert_eq!(resolve_goal(&grid, pos(5, 5), u32::MAX), Some(pos(5, 2)));
    }

    #[test]
    fn test_heuristic_never_exceeds_diagonal_cost() {
        assert!(SQRT_2.to_num::<f64>() > std::f64::consts::SQRT_2);
        for d in 1..500 {
            let cost = SQRT_2 * Fixed::from_num(d);
            assert!(heuristic(pos(0, 0), pos(d, d), true) <= cost, "diagonal of {d}");
        }
    }

    #[test]
    fn test_no_corner_cutting() {
        // Wall at (1, 0) blocks the diagonal (0, 0) -> (1, 1).
        let grid = Grid::with_walls(3, 3, [pos(1, 0)]);
        let path = find_path_uncached(&grid, pos(0, 0), pos(1, 1), true, 0).unwrap();
        assert_eq!(path.tiles(), &[pos(0, 0), pos(0, 1), pos(1, 1)]);
    }

    #[test]
    fn test_orthogonal_only_movement() {
        let grid = Grid::new(6, 6);
        let path = find_path_uncached(&grid, pos(0, 0), pos(3, 3), false, 0).unwrap();
        assert_eq!(path.steps(), 6);
        for pair in path.tiles().windows(2) {
            assert!(pair[0].x == pair[1].x || pair[0].y == pair[1].y);
        }
    }

    #[test]
    fn test_determinism() {
        let grid = Grid::with_walls(20, 20, (5..15).map(|y| pos(10, y)));
        let path1 = find_path_uncached(&grid, pos(5, 10), pos(15, 10), true, 5);
        let path2 = find_path_uncached(&grid, pos(5, 10), pos(15, 10), true, 5);
        assert_eq!(path1, path2);
    }

    #[test]
    fn test_cache_idempotent() {
        let grid = Grid::new(10, 10);
        let mut finder = Pathfinder::default();
        let now = Instant::now();

        let first = finder.find_path_at(&grid, pos(0, 0), pos(9, 3), now);
        let size = finder.cache_len();
        let second = finder.find_path_at(&grid, pos(0, 0), pos(9, 3), now + Duration::from_millis(10));

        assert_eq!(first, second);
        assert_eq!(finder.cache_len(), size);
        assert_eq!(finder.cache_stats().hits, 1);
    }

    #[test]
    fn test_cache_flushed_when_door_unlocks() {
        let door = pos(5, 5);
        let walls = (0..10).map(|y| pos(5, y));
        let grid = Grid::with_walls(10, 10, walls);
        let mut doors: DoorTable = [Door { pos: door, locked: true }].into_iter().collect();
        let mut finder = Pathfinder::default();
        let now = Instant::now();

        let blocked = finder.find_path_at(&MapView::new(&grid, &doors), pos(3, 5), pos(7, 5), now);
        assert!(blocked.is_none());

        doors.set_locked(door, false);
        let open = finder
            .find_path_at(&MapView::new(&grid, &doors), pos(3, 5), pos(7, 5), now)
            .unwrap();
        assert!(open.tiles().contains(&door));
    }
}
