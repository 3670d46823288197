//! Test fixtures and helpers.
//!
//! Pre-built maps, rosters and sessions for consistent testing.

use fixed::types::I32F32;
use tactics_core::config::TacticsConfig;
use tactics_core::grid::{Door, DoorTable, Grid, TilePos};
use tactics_core::pathfinding::Path;
use tactics_core::session::TacticalSession;
use tactics_core::units::{Roster, Team, Unit, UnitId, UnitKind};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: Core code never uses floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Shorthand for a tile coordinate.
#[must_use]
pub const fn pos(x: i32, y: i32) -> TilePos {
    TilePos::new(x, y)
}

/// Obstacle-free square grid.
#[must_use]
pub fn open_grid(size: u32) -> Grid {
    Grid::new(size, size)
}

/// Square grid with a solid wall column at `x`, open only at row `gap_y`.
#[must_use]
pub fn wall_column_with_gap(size: u32, x: i32, gap_y: i32) -> Grid {
    let walls = (0..size as i32)
        .filter(|&y| y != gap_y)
        .map(|y| pos(x, y));
    Grid::with_walls(size, size, walls)
}

/// `target` surrounded on all eight sides by walls.
#[must_use]
pub fn enclosed_target(size: u32, target: TilePos) -> Grid {
    let walls = (-1..=1)
        .flat_map(|dy| (-1..=1).map(move |dx| (dx, dy)))
        .filter(|&d| d != (0, 0))
        .map(|(dx, dy)| target.offset(dx, dy));
    Grid::with_walls(size, size, walls)
}

/// Parse a map drawn in ASCII.
///
/// `#` is a wall, `D` a locked door, `d` an unlocked door, anything else
/// floor. Rows are separated by newlines; leading and trailing blank lines
/// and indentation are ignored.
///
/// # Panics
///
/// Panics on an empty drawing or ragged rows.
#[must_use]
pub fn grid_from_ascii(drawing: &str) -> (Grid, DoorTable) {
    let rows: Vec<&str> = drawing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    assert!(!rows.is_empty(), "empty map drawing");
    let width = rows[0].chars().count();
    assert!(
        rows.iter().all(|r| r.chars().count() == width),
        "ragged map drawing"
    );

    let mut walls = Vec::new();
    let mut doors = DoorTable::new();
    for (y, row) in rows.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let p = pos(x as i32, y as i32);
            match ch {
                '#' => walls.push(p),
                'D' => doors.insert(Door { pos: p, locked: true }),
                'd' => doors.insert(Door { pos: p, locked: false }),
                _ => {}
            }
        }
    }

    (Grid::with_walls(width as u32, rows.len() as u32, walls), doors)
}

/// Straight horizontal path of `steps` steps from `start`.
#[must_use]
pub fn straight_path(start: TilePos, steps: i32) -> Path {
    Path::from_tiles((0..=steps).map(|i| start.offset(i, 0)).collect())
}

/// Player agent.
#[must_use]
pub fn agent(id: UnitId, at: TilePos, speed: u32) -> Unit {
    Unit::new(id, Team::Player, UnitKind::Agent, at, speed).named(format!("Agent {id}"))
}

/// Enemy guard.
#[must_use]
pub fn guard(id: UnitId, at: TilePos, speed: u32) -> Unit {
    Unit::new(id, Team::Enemy, UnitKind::Guard, at, speed).named(format!("Guard {id}"))
}

/// One agent (speed 5) and one guard (speed 4).
#[must_use]
pub fn agent_and_guard() -> Roster {
    [agent(1, pos(1, 1), 5), guard(2, pos(8, 8), 4)]
        .into_iter()
        .collect()
}

/// Two agents against three mixed enemies plus a civilian.
#[must_use]
pub fn skirmish_roster() -> Roster {
    [
        agent(1, pos(1, 1), 5),
        agent(2, pos(1, 3), 4),
        guard(3, pos(12, 2), 4),
        Unit::new(4, Team::Enemy, UnitKind::Heavy, pos(13, 8), 2),
        Unit::new(5, Team::Enemy, UnitKind::Soldier, pos(10, 12), 3),
        Unit::new(6, Team::Neutral, UnitKind::Civilian, pos(7, 7), 3),
    ]
    .into_iter()
    .collect()
}

/// A 16x16 map with a wall column and a locked door, populated with
/// [`skirmish_roster`].
///
/// # Panics
///
/// Panics if the default configuration is rejected.
#[must_use]
pub fn skirmish_session(seed: u64) -> TacticalSession {
    let mut grid = wall_column_with_gap(16, 6, 4);
    grid.set_cell(pos(6, 10), tactics_core::grid::CellType::Floor);
    let doors: DoorTable = [Door {
        pos: pos(6, 10),
        locked: true,
    }]
    .into_iter()
    .collect();

    TacticalSession::new(TacticsConfig::default(), grid, doors, skirmish_roster(), seed)
        .expect("default config is valid")
}
