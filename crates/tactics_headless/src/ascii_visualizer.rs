//! ASCII map renderer for terminal review.
//!
//! Draws the terrain, doors and living units of a session, optionally with
//! a path or a movement range laid over the floor tiles.

use tactics_core::grid::{CellType, TilePos};
use tactics_core::movement::MovementRange;
use tactics_core::pathfinding::Path;
use tactics_core::session::TacticalSession;
use tactics_core::units::{Team, UnitKind};

/// ASCII rendering configuration.
#[derive(Debug, Clone)]
pub struct AsciiConfig {
    /// Append a legend below the map.
    pub show_legend: bool,
    /// Use colored output (ANSI).
    pub use_color: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            show_legend: true,
            use_color: false,
        }
    }
}

/// Extra layers drawn over the floor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overlay<'a> {
    /// Tiles of a path, drawn as `*`.
    pub path: Option<&'a Path>,
    /// Reachable tiles, drawn as `+`.
    pub range: Option<&'a MovementRange>,
}

/// ANSI color codes.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";

    pub const BLUE: &str = "\x1b[34m";
    pub const RED: &str = "\x1b[31m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const GREEN: &str = "\x1b[32m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

/// Character for a unit archetype.
fn unit_char(kind: UnitKind) -> char {
    match kind {
        UnitKind::Agent => 'A',
        UnitKind::Guard => 'G',
        UnitKind::Soldier => 'S',
        UnitKind::Heavy => 'H',
        UnitKind::Boss => 'B',
        UnitKind::Civilian => 'c',
    }
}

fn team_color(team: Team) -> &'static str {
    match team {
        Team::Player => colors::BLUE,
        Team::Enemy => colors::RED,
        Team::Neutral => colors::YELLOW,
    }
}

/// One rendered tile: glyph plus optional color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Glyph {
    ch: char,
    color: Option<&'static str>,
}

impl Glyph {
    const fn plain(ch: char) -> Self {
        Self { ch, color: None }
    }

    const fn colored(ch: char, color: &'static str) -> Self {
        Self {
            ch,
            color: Some(color),
        }
    }
}

/// Render a session's map as rows of text, top row first.
#[must_use]
pub fn render_map(session: &TacticalSession, overlay: &Overlay<'_>, config: &AsciiConfig) -> Vec<String> {
    let grid = session.grid();
    let width = grid.width() as usize;
    let height = grid.height() as usize;
    let mut canvas = vec![vec![Glyph::plain('.'); width]; height];

    for pos in grid.positions() {
        let glyph = match grid.cell(pos) {
            Some(CellType::Wall) => Glyph::colored('#', colors::GRAY),
            _ => Glyph::plain('.'),
        };
        set(&mut canvas, pos, glyph);
    }

    if let Some(range) = overlay.range {
        for tile in range.tiles() {
            set(&mut canvas, tile.pos, Glyph::colored('+', colors::GREEN));
        }
    }

    if let Some(path) = overlay.path {
        for &pos in path.tiles() {
            set(&mut canvas, pos, Glyph::colored('*', colors::CYAN));
        }
    }

    // Doors sit above overlays so a locked door in a range is still visible.
    for door in session.doors().iter() {
        let ch = if door.locked { 'D' } else { '/' };
        set(&mut canvas, door.pos, Glyph::colored(ch, colors::YELLOW));
    }

    let active = session.active_unit();
    for unit in session.roster().living() {
        let mut glyph = Glyph::colored(unit_char(unit.kind), team_color(unit.team));
        if active == Some(unit.id) {
            glyph.color = Some(colors::BOLD);
        }
        set(&mut canvas, unit.position, glyph);
    }

    let mut rows: Vec<String> = canvas
        .iter()
        .map(|row| row.iter().map(|g| paint(*g, config.use_color)).collect())
        .collect();

    if config.show_legend {
        rows.push(String::new());
        rows.push("# wall  D locked door  / open door  * path  + in range".to_string());
        rows.push(format!(
            "round {}  phase {:?}  active {}",
            session.scheduler().round(),
            session.phase(),
            active.map_or_else(|| "-".to_string(), |id| id.to_string())
        ));
        for unit in session.roster().iter() {
            let status = if unit.alive { "" } else { " (dead)" };
            rows.push(format!(
                "  {} #{} {:?} {:?} at {} ap {}{}",
                unit_char(unit.kind),
                unit.id,
                unit.team,
                unit.kind,
                unit.position,
                unit.current_ap,
                status
            ));
        }
    }

    rows
}

/// Render a session's map as a single string.
#[must_use]
pub fn render_ascii(session: &TacticalSession, overlay: &Overlay<'_>, config: &AsciiConfig) -> String {
    let mut output = render_map(session, overlay, config).join("\n");
    output.push('\n');
    output
}

fn set(canvas: &mut [Vec<Glyph>], pos: TilePos, glyph: Glyph) {
    let (Ok(x), Ok(y)) = (usize::try_from(pos.x), usize::try_from(pos.y)) else {
        return;
    };
    if let Some(cell) = canvas.get_mut(y).and_then(|row| row.get_mut(x)) {
        *cell = glyph;
    }
}

fn paint(glyph: Glyph, use_color: bool) -> String {
    match glyph.color {
        Some(color) if use_color => format!("{color}{}{}", glyph.ch, colors::RESET),
        _ => glyph.ch.to_string(),
    }
}
