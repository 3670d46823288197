//! Unit records and the mission roster.
//!
//! The roster is the input side of the turn scheduler: it holds every unit
//! on the map (player squad, enemies and neutrals) with the few fields the
//! core reads (team, kind, speed, initiative buff, position) and the one it
//! writes back (current AP).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grid::TilePos;

/// Unique identifier for a unit.
pub type UnitId = u32;

/// Team affiliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// Squad controlled by the player.
    Player,
    /// Hostile units.
    Enemy,
    /// Civilians and other bystanders.
    Neutral,
}

/// Unit archetype; selects the AP profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Player squad member.
    Agent,
    /// Standard enemy guard.
    Guard,
    /// Regular enemy trooper.
    Soldier,
    /// Slow heavily armoured enemy.
    Heavy,
    /// Mission boss.
    Boss,
    /// Non-combatant.
    Civilian,
}

impl UnitKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Agent,
        Self::Guard,
        Self::Soldier,
        Self::Heavy,
        Self::Boss,
        Self::Civilian,
    ];
}

/// A unit on the tactical map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Identifier, unique within a roster.
    pub id: UnitId,
    /// Display name (not interpreted by the core).
    #[serde(default)]
    pub name: String,
    /// Team affiliation.
    pub team: Team,
    /// Archetype.
    pub kind: UnitKind,
    /// Current tile.
    pub position: TilePos,
    /// Speed stat feeding initiative.
    pub speed: u32,
    /// Additive initiative modifier from buffs (may be negative).
    #[serde(default)]
    pub initiative_buff: i32,
    /// Remaining action points this turn.
    #[serde(default)]
    pub current_ap: u32,
    /// Dead units stay in the roster but never act.
    #[serde(default = "default_alive")]
    pub alive: bool,
}

const fn default_alive() -> bool {
    true
}

impl Unit {
    /// Create a living unit with no AP and no buffs.
    #[must_use]
    pub fn new(id: UnitId, team: Team, kind: UnitKind, position: TilePos, speed: u32) -> Self {
        Self {
            id,
            name: String::new(),
            team,
            kind,
            position,
            speed,
            initiative_buff: 0,
            current_ap: 0,
            alive: true,
        }
    }

    /// Builder-style display name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder-style initiative buff.
    #[must_use]
    pub fn with_initiative_buff(mut self, buff: i32) -> Self {
        self.initiative_buff = buff;
        self
    }
}

/// All units of a mission, iterated in id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    units: BTreeMap<UnitId, Unit>,
}

impl Roster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit, replacing any unit with the same id.
    pub fn insert(&mut self, unit: Unit) -> Option<Unit> {
        self.units.insert(unit.id, unit)
    }

    /// Look up a unit.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Look up a unit mutably.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Mark a unit dead. Returns `false` if the id is unknown.
    pub fn kill(&mut self, id: UnitId) -> bool {
        match self.units.get_mut(&id) {
            Some(unit) => {
                unit.alive = false;
                unit.current_ap = 0;
                true
            }
            None => false,
        }
    }

    /// Whether `id` names a living unit.
    #[must_use]
    pub fn is_alive(&self, id: UnitId) -> bool {
        self.units.get(&id).is_some_and(|u| u.alive)
    }

    /// All units in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Living units in id order.
    pub fn living(&self) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(|u| u.alive)
    }

    /// Living units of one team.
    pub fn living_on(&self, team: Team) -> impl Iterator<Item = &Unit> {
        self.living().filter(move |u| u.team == team)
    }

    /// The encounter is decided once either the player squad or the enemy
    /// side has no living units. Neutrals do not count.
    #[must_use]
    pub fn is_encounter_decided(&self) -> bool {
        self.living_on(Team::Player).next().is_none() || self.living_on(Team::Enemy).next().is_none()
    }

    /// Number of units (living or dead).
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl FromIterator<Unit> for Roster {
    fn from_iter<I: IntoIterator<Item = Unit>>(iter: I) -> Self {
        let mut roster = Self::new();
        for unit in iter {
            roster.insert(unit);
        }
        roster
    }
}
