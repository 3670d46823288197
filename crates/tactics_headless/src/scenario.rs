//! Scenario loading and configuration.
//!
//! Scenarios define a mission map (size, walls, doors), the units on it and
//! optional overrides of the core configuration. They load from RON:
//!
//! ```ron
//! Scenario(
//!     name: "Vault",
//!     width: 12,
//!     height: 8,
//!     layout: [
//!         "............",
//!         ".....#......",
//!         ".....D......",
//!     ],
//!     units: [
//!         (id: 1, team: player, kind: agent, x: 0, y: 0, speed: 5),
//!         (id: 2, team: enemy, kind: guard, x: 11, y: 7, speed: 4),
//!     ],
//!     config: (pathfinding: (cache_capacity: 64)),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tactics_core::config::TacticsConfig;
use tactics_core::error::TacticsError;
use tactics_core::grid::{Door, DoorTable, Grid, MapOracle, MapView, TilePos};
use tactics_core::session::TacticalSession;
use tactics_core::units::{Roster, Team, Unit, UnitId, UnitKind};

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The map description is inconsistent.
    #[error("Invalid map: {0}")]
    InvalidMap(String),
    /// The core rejected the scenario (bad config).
    #[error(transparent)]
    Core(#[from] TacticsError),
}

/// A unit's starting state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Unit id, unique within the scenario.
    pub id: UnitId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Team.
    pub team: Team,
    /// Archetype (selects the AP profile).
    pub kind: UnitKind,
    /// Starting column.
    pub x: i32,
    /// Starting row.
    pub y: i32,
    /// Speed stat.
    pub speed: u32,
    /// Initiative modifier.
    #[serde(default)]
    pub initiative_buff: i32,
}

impl UnitPlacement {
    /// Create a placement with no name or buff.
    #[must_use]
    pub fn new(id: UnitId, team: Team, kind: UnitKind, x: i32, y: i32, speed: u32) -> Self {
        Self {
            id,
            name: String::new(),
            team,
            kind,
            x,
            y,
            speed,
            initiative_buff: 0,
        }
    }

    fn to_unit(&self) -> Unit {
        Unit::new(self.id, self.team, self.kind, TilePos::new(self.x, self.y), self.speed)
            .named(self.name.clone())
            .with_initiative_buff(self.initiative_buff)
    }
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Map width in tiles.
    pub width: u32,
    /// Map height in tiles.
    pub height: u32,
    /// Drawn rows: `#` wall, `D` locked door, `d` open door, anything else
    /// floor. Rows may be shorter than `width`; missing tiles are floor.
    #[serde(default)]
    pub layout: Vec<String>,
    /// Extra wall tiles.
    #[serde(default)]
    pub walls: Vec<(i32, i32)>,
    /// Extra doors.
    #[serde(default)]
    pub doors: Vec<Door>,
    /// Units on the map.
    pub units: Vec<UnitPlacement>,
    /// Core configuration overrides.
    #[serde(default)]
    pub config: TacticsConfig,
    /// Initiative seed.
    #[serde(default)]
    pub seed: u64,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::infiltration()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.config.validate()?;
        Ok(scenario)
    }

    /// Look up a built-in scenario by name.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "infiltration" => Some(Self::infiltration()),
            "open_field" => Some(Self::open_field()),
            _ => None,
        }
    }

    /// Names accepted by [`Self::builtin`].
    pub const BUILTIN_NAMES: [&'static str; 2] = ["infiltration", "open_field"];

    /// A built-in name or a path to a RON file.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        match Self::builtin(name_or_path) {
            Some(scenario) => Ok(scenario),
            None => Self::load(name_or_path),
        }
    }

    /// Two agents breaching a guarded compound through a locked door.
    #[must_use]
    pub fn infiltration() -> Self {
        let layout = [
            "....................",
            "....................",
            "......#######.......",
            "......#.....#.......",
            "......#.....#.......",
            "......D.....#.......",
            "......#.....#.......",
            "......###d###.......",
            "....................",
            "....................",
        ];
        Self {
            name: "Infiltration".to_string(),
            description: "Two agents against a guarded compound with one locked door".to_string(),
            width: 20,
            height: 10,
            layout: layout.iter().map(|row| (*row).to_string()).collect(),
            walls: Vec::new(),
            doors: Vec::new(),
            units: vec![
                UnitPlacement::new(1, Team::Player, UnitKind::Agent, 1, 4, 5),
                UnitPlacement::new(2, Team::Player, UnitKind::Agent, 1, 6, 4),
                UnitPlacement::new(3, Team::Enemy, UnitKind::Guard, 9, 4, 4),
                UnitPlacement::new(4, Team::Enemy, UnitKind::Heavy, 15, 8, 2),
                UnitPlacement::new(5, Team::Neutral, UnitKind::Civilian, 8, 5, 3),
            ],
            config: TacticsConfig::default(),
            seed: 1,
        }
    }

    /// Open ground, one agent against one guard.
    #[must_use]
    pub fn open_field() -> Self {
        Self {
            name: "Open Field".to_string(),
            description: "Obstacle-free 10x10 map".to_string(),
            width: 10,
            height: 10,
            layout: Vec::new(),
            walls: Vec::new(),
            doors: Vec::new(),
            units: vec![
                UnitPlacement::new(1, Team::Player, UnitKind::Agent, 0, 0, 5),
                UnitPlacement::new(2, Team::Enemy, UnitKind::Guard, 9, 9, 4),
            ],
            config: TacticsConfig::default(),
            seed: 0,
        }
    }

    /// Build the terrain grid and door table.
    pub fn build_map(&self) -> Result<(Grid, DoorTable), ScenarioError> {
        if self.width == 0 || self.height == 0 {
            return Err(ScenarioError::InvalidMap(format!(
                "map size {}x{} must be positive",
                self.width, self.height
            )));
        }
        if self.layout.len() > self.height as usize {
            return Err(ScenarioError::InvalidMap(format!(
                "layout has {} rows but height is {}",
                self.layout.len(),
                self.height
            )));
        }

        let mut walls: Vec<TilePos> = self.walls.iter().map(|&(x, y)| TilePos::new(x, y)).collect();
        let mut doors: DoorTable = self.doors.iter().copied().collect();

        for (y, row) in self.layout.iter().enumerate() {
            if row.chars().count() > self.width as usize {
                return Err(ScenarioError::InvalidMap(format!(
                    "layout row {y} is wider than {}",
                    self.width
                )));
            }
            for (x, ch) in row.chars().enumerate() {
                let pos = TilePos::new(x as i32, y as i32);
                match ch {
                    '#' => walls.push(pos),
                    'D' => doors.insert(Door { pos, locked: true }),
                    'd' => doors.insert(Door { pos, locked: false }),
                    _ => {}
                }
            }
        }

        let grid = Grid::with_walls(self.width, self.height, walls);
        Ok((grid, doors))
    }

    /// Build the roster, checking every placement against `map`.
    pub fn build_roster<M: MapOracle>(&self, map: &M) -> Result<Roster, ScenarioError> {
        let mut roster = Roster::new();
        for placement in &self.units {
            let pos = TilePos::new(placement.x, placement.y);
            if !map.in_bounds(pos) {
                return Err(ScenarioError::InvalidMap(format!(
                    "unit {} at {pos} is outside the {}x{} map",
                    placement.id, self.width, self.height
                )));
            }
            if !map.is_walkable(pos) {
                return Err(ScenarioError::InvalidMap(format!(
                    "unit {} at {pos} stands on a blocked tile",
                    placement.id
                )));
            }
            if roster.insert(placement.to_unit()).is_some() {
                return Err(ScenarioError::InvalidMap(format!(
                    "duplicate unit id {}",
                    placement.id
                )));
            }
        }
        Ok(roster)
    }

    /// Build a ready-to-run session, optionally overriding the seed.
    pub fn build_session(&self, seed: Option<u64>) -> Result<TacticalSession, ScenarioError> {
        let (grid, doors) = self.build_map()?;
        let roster = self.build_roster(&MapView::new(&grid, &doors))?;
        let session = TacticalSession::new(
            self.config.clone(),
            grid,
            doors,
            roster,
            seed.unwrap_or(self.seed),
        )?;
        tracing::debug!(
            scenario = %self.name,
            width = self.width,
            height = self.height,
            units = self.units.len(),
            "Scenario loaded"
        );
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_scenarios_build() {
        for name in Scenario::BUILTIN_NAMES {
            let scenario = Scenario::builtin(name).unwrap();
            let session = scenario.build_session(None).unwrap();
            assert_eq!(session.roster().len(), scenario.units.len());
        }
    }

    #[test]
    fn test_layout_parsing() {
        let (grid, doors) = Scenario::infiltration().build_map().unwrap();
        assert!(!grid.is_walkable(TilePos::new(6, 2)));
        assert!(doors.get(TilePos::new(6, 5)).unwrap().locked);
        assert!(!doors.get(TilePos::new(9, 7)).unwrap().locked);
    }

    #[test]
    fn test_parse_minimal_ron() {
        let ron = r#"
            Scenario(
                name: "Tiny",
                width: 4,
                height: 3,
                walls: [(1, 1)],
                units: [
                    (id: 1, team: player, kind: agent, x: 0, y: 0, speed: 5),
                    (id: 2, team: enemy, kind: guard, x: 3, y: 2, speed: 4),
                ],
                config: (ap_profiles: (profiles: {guard: 6})),
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.units.len(), 2);
        assert_eq!(scenario.config.ap_profiles.max_ap(UnitKind::Guard), 6);

        let (grid, _) = scenario.build_map().unwrap();
        assert!(!grid.is_walkable(TilePos::new(1, 1)));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut scenario = Scenario::open_field();
        scenario.units.push(UnitPlacement::new(1, Team::Enemy, UnitKind::Guard, 5, 5, 3));
        let (grid, _) = scenario.build_map().unwrap();
        assert!(matches!(
            scenario.build_roster(&grid),
            Err(ScenarioError::InvalidMap(_))
        ));
    }

    #[test]
    fn test_units_off_map_or_on_walls_rejected() {
        let mut off_map = Scenario::open_field();
        off_map.units[1].x = 10;
        assert!(matches!(
            off_map.build_session(None),
            Err(ScenarioError::InvalidMap(_))
        ));

        let mut on_wall = Scenario::infiltration();
        on_wall.units[2].x = 6;
        assert!(matches!(
            on_wall.build_session(None),
            Err(ScenarioError::InvalidMap(_))
        ));

        // The locked door at (6, 5) blocks placement too.
        let mut on_door = Scenario::infiltration();
        on_door.units[4].x = 6;
        assert!(matches!(
            on_door.build_session(None),
            Err(ScenarioError::InvalidMap(_))
        ));
    }

    #[test]
    fn test_oversized_layout_rejected() {
        let mut scenario = Scenario::open_field();
        scenario.layout = vec!["...........".to_string()];
        assert!(matches!(
            scenario.build_map(),
            Err(ScenarioError::InvalidMap(_))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let ron = r#"
            Scenario(
                name: "Bad",
                width: 2,
                height: 2,
                units: [],
                config: (pathfinding: (cache_capacity: 0)),
            )
        "#;
        assert!(matches!(
            Scenario::from_ron_str(ron),
            Err(ScenarioError::Core(TacticsError::InvalidConfig(_)))
        ));
    }
}
