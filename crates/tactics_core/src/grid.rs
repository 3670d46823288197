//! Tile grid, door overlay, and the map oracle queries built on them.
//!
//! The terrain [`Grid`] is an immutable snapshot for the duration of a
//! mission. Doors live in a separately owned [`DoorTable`] that is read at
//! query time, so toggling a lock is observed by the next query without any
//! cached copy of the grid going stale.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::Vec2Fixed;

/// Integer tile coordinate. Origin is top-left, x grows right, y grows down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TilePos {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl TilePos {
    /// Create a tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Tile containing a fractional world position (floors both axes).
    #[must_use]
    pub fn containing(pos: Vec2Fixed) -> Self {
        Self {
            x: pos.x.floor().saturating_to_num::<i32>(),
            y: pos.y.floor().saturating_to_num::<i32>(),
        }
    }

    /// Offset this position by (dx, dy), saturating at the `i32` range.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Offset this position by (dx, dy), or `None` if either axis overflows.
    #[must_use]
    pub const fn checked_offset(self, dx: i32, dy: i32) -> Option<Self> {
        match (self.x.checked_add(dx), self.y.checked_add(dy)) {
            (Some(x), Some(y)) => Some(Self { x, y }),
            _ => None,
        }
    }

    /// Chebyshev distance (number of king moves).
    #[must_use]
    pub fn chebyshev(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Squared Euclidean distance.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Whether `other` is one king move away (and not the same tile).
    #[must_use]
    pub fn is_adjacent(self, other: Self) -> bool {
        self.chebyshev(other) == 1
    }

    /// Ordering key that sorts row-major (y first, then x).
    #[must_use]
    pub const fn row_major(self) -> (i32, i32) {
        (self.y, self.x)
    }
}

impl std::fmt::Display for TilePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Terrain type of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellType {
    /// Open ground.
    #[default]
    Floor,
    /// Never walkable.
    Wall,
}

/// Rectangular terrain snapshot in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<CellType>,
}

impl Grid {
    /// Create a grid with every cell set to floor.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        assert!(width > 0, "Grid width must be positive");
        assert!(height > 0, "Grid height must be positive");

        Self {
            width,
            height,
            cells: vec![CellType::Floor; (width as usize) * (height as usize)],
        }
    }

    /// Create a floor grid with the listed tiles turned into walls.
    /// Out-of-bounds entries are ignored.
    #[must_use]
    pub fn with_walls(width: u32, height: u32, walls: impl IntoIterator<Item = TilePos>) -> Self {
        let mut grid = Self::new(width, height);
        for pos in walls {
            grid.set_cell(pos, CellType::Wall);
        }
        grid
    }

    /// Grid width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Check if a tile lies inside the grid.
    #[must_use]
    pub fn in_bounds(&self, pos: TilePos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    #[inline]
    fn index(&self, pos: TilePos) -> usize {
        (pos.y as usize) * (self.width as usize) + (pos.x as usize)
    }

    /// Cell type at `pos`, or `None` if out of bounds.
    #[must_use]
    pub fn cell(&self, pos: TilePos) -> Option<CellType> {
        self.in_bounds(pos).then(|| self.cells[self.index(pos)])
    }

    /// Set the cell type at `pos`. Returns `false` if out of bounds.
    ///
    /// Intended for mission setup; the grid is treated as fixed once a
    /// mission is running.
    pub fn set_cell(&mut self, pos: TilePos, cell: CellType) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        let index = self.index(pos);
        self.cells[index] = cell;
        true
    }

    /// Iterate every tile position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = TilePos> + '_ {
        let width = self.width as i32;
        let height = self.height as i32;
        (0..height).flat_map(move |y| (0..width).map(move |x| TilePos::new(x, y)))
    }
}

/// A door overlay on a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Door {
    /// Tile the door occupies.
    pub pos: TilePos,
    /// Locked doors block movement and sight.
    pub locked: bool,
}

/// Door states for a mission, owned apart from the terrain grid.
///
/// Every lock change bumps [`DoorTable::revision`], which lets caches keyed
/// on walkability notice that the map changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorTable {
    doors: BTreeMap<TilePos, Door>,
    revision: u64,
}

impl DoorTable {
    /// Create an empty door table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a door.
    pub fn insert(&mut self, door: Door) {
        self.doors.insert(door.pos, door);
        self.revision += 1;
    }

    /// Door at `pos`, if any.
    #[must_use]
    pub fn get(&self, pos: TilePos) -> Option<&Door> {
        self.doors.get(&pos)
    }

    /// Set a door's lock. Returns `false` if there is no door at `pos`.
    pub fn set_locked(&mut self, pos: TilePos, locked: bool) -> bool {
        let Some(door) = self.doors.get_mut(&pos) else {
            return false;
        };
        if door.locked != locked {
            door.locked = locked;
            self.revision += 1;
        }
        true
    }

    /// Monotonic counter of lock-state changes.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Iterate all doors in row-major order of position.
    pub fn iter(&self) -> impl Iterator<Item = &Door> {
        self.doors.values()
    }

    /// Number of doors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.doors.len()
    }

    /// Whether the table has no doors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.doors.is_empty()
    }
}

impl FromIterator<Door> for DoorTable {
    fn from_iter<I: IntoIterator<Item = Door>>(iter: I) -> Self {
        let mut table = Self::new();
        for door in iter {
            table.insert(door);
        }
        table
    }
}

/// Walkability and sight queries consumed by the pathfinder, the movement
/// range calculator and the rendering layer.
pub trait MapOracle {
    /// Whether `pos` lies inside the map.
    fn in_bounds(&self, pos: TilePos) -> bool;

    /// Map extent as (width, height) in tiles.
    fn size(&self) -> (u32, u32);

    /// Whether a unit may stand on `pos`.
    fn is_walkable(&self, pos: TilePos) -> bool;

    /// Changes whenever walkability of any tile may have changed.
    fn revision(&self) -> u64 {
        0
    }

    /// Walkability of the tile containing a fractional position.
    fn is_walkable_at(&self, pos: Vec2Fixed) -> bool {
        self.is_walkable(TilePos::containing(pos))
    }

    /// Bresenham line of sight between two tiles.
    ///
    /// Only tiles strictly between the endpoints are tested, and the line is
    /// always rasterized from the smaller endpoint, so swapping the
    /// arguments never changes the answer.
    fn has_line_of_sight(&self, a: TilePos, b: TilePos) -> bool {
        if !self.in_bounds(a) || !self.in_bounds(b) {
            return false;
        }
        let (from, to) = if a.row_major() <= b.row_major() {
            (a, b)
        } else {
            (b, a)
        };
        bresenham(from, to)
            .filter(|&pos| pos != from && pos != to)
            .all(|pos| self.is_walkable(pos))
    }
}

/// Iterate the tiles of a Bresenham line from `from` to `to`, inclusive.
pub fn bresenham(from: TilePos, to: TilePos) -> impl Iterator<Item = TilePos> {
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    let mut current = Some(from);

    std::iter::from_fn(move || {
        let pos = current?;
        if pos == to {
            current = None;
            return Some(pos);
        }
        let mut next = pos;
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            next.x += sx;
        }
        if e2 <= dx {
            err += dx;
            next.y += sy;
        }
        current = Some(next);
        Some(pos)
    })
}

/// The live map: terrain snapshot plus the door overlay.
#[derive(Debug, Clone, Copy)]
pub struct MapView<'a> {
    grid: &'a Grid,
    doors: &'a DoorTable,
}

impl<'a> MapView<'a> {
    /// Borrow a grid and its doors as a single oracle.
    #[must_use]
    pub const fn new(grid: &'a Grid, doors: &'a DoorTable) -> Self {
        Self { grid, doors }
    }

    /// Terrain snapshot.
    #[must_use]
    pub const fn grid(&self) -> &'a Grid {
        self.grid
    }

    /// Door overlay.
    #[must_use]
    pub const fn doors(&self) -> &'a DoorTable {
        self.doors
    }
}

impl MapOracle for MapView<'_> {
    fn in_bounds(&self, pos: TilePos) -> bool {
        self.grid.in_bounds(pos)
    }

    fn size(&self) -> (u32, u32) {
        (self.grid.width, self.grid.height)
    }

    fn is_walkable(&self, pos: TilePos) -> bool {
        if !self.grid.in_bounds(pos) {
            return false;
        }
        if let Some(door) = self.doors.get(pos) {
            return !door.locked;
        }
        self.grid.cell(pos) == Some(CellType::Floor)
    }

    fn revision(&self) -> u64 {
        self.doors.revision()
    }
}

/// A bare grid answers queries as if it had no doors.
impl MapOracle for Grid {
    fn in_bounds(&self, pos: TilePos) -> bool {
        Grid::in_bounds(self, pos)
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_walkable(&self, pos: TilePos) -> bool {
        self.cell(pos) == Some(CellType::Floor)
    }
}
