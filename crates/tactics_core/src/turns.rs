//! Round-based turn scheduling with randomized initiative.
//!
//! Each round the scheduler snapshots the living roster into a queue sorted
//! by initiative, then hands control to one unit at a time. The queue is
//! rebuilt from scratch every round, so units that die mid-round simply do
//! not appear in the next one.
//!
//! ```text
//! Idle ──begin_encounter──▶ RoundStart ──start_turn──▶ UnitActive
//!                              ▲                          │
//!                              └──── queue exhausted ◀── end_turn
//! UnitActive ──encounter decided / end_encounter──▶ Idle
//! ```
//!
//! The roster owns the AP counters; the scheduler only reads max AP from
//! the profile table and writes `current_ap` on the active unit.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{ActionCostTable, ActionKind, ApProfileTable, InitiativeConfig, TacticsConfig};
use crate::error::{Result, TacticsError};
use crate::units::{Roster, Team, Unit, UnitId, UnitKind};

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerPhase {
    /// No encounter in progress.
    #[default]
    Idle,
    /// A queue has been built and no unit is acting yet.
    RoundStart,
    /// One unit is taking its turn.
    UnitActive,
}

/// One slot in the round's turn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnQueueEntry {
    /// Unit taking this slot.
    pub unit: UnitId,
    /// Its team, for HUD ordering displays.
    pub team: Team,
    /// Its archetype.
    pub kind: UnitKind,
    /// Speed at the time the queue was built.
    pub speed: u32,
    /// AP granted when the turn starts.
    pub max_ap: u32,
    /// Rolled initiative for this round.
    pub initiative: i32,
}

/// Turn scheduler with an injected random source.
///
/// The RNG only feeds initiative rolls. Two schedulers seeded alike and fed
/// the same roster produce the same turn order.
#[derive(Debug, Clone)]
pub struct TurnScheduler<R = ChaCha8Rng> {
    initiative: InitiativeConfig,
    ap_profiles: ApProfileTable,
    action_costs: ActionCostTable,
    rng: R,
    phase: SchedulerPhase,
    queue: Vec<TurnQueueEntry>,
    current: Option<usize>,
    round: u32,
}

impl TurnScheduler<ChaCha8Rng> {
    /// Scheduler with a seeded ChaCha RNG.
    #[must_use]
    pub fn with_seed(config: &TacticsConfig, seed: u64) -> Self {
        Self::new(config, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> TurnScheduler<R> {
    /// Create an idle scheduler.
    pub fn new(config: &TacticsConfig, rng: R) -> Self {
        Self {
            initiative: config.initiative.clone(),
            ap_profiles: config.ap_profiles.clone(),
            action_costs: config.action_costs.clone(),
            rng,
            phase: SchedulerPhase::Idle,
            queue: Vec::new(),
            current: None,
            round: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    /// Rounds started since construction.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// This round's turn order.
    #[must_use]
    pub fn queue(&self) -> &[TurnQueueEntry] {
        &self.queue
    }

    /// Index of the active slot in [`Self::queue`].
    #[must_use]
    pub const fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Queue slot of the unit taking its turn.
    #[must_use]
    pub fn active_entry(&self) -> Option<&TurnQueueEntry> {
        self.current.and_then(|i| self.queue.get(i))
    }

    /// Unit taking its turn.
    #[must_use]
    pub fn active_unit(&self) -> Option<UnitId> {
        self.active_entry().map(|entry| entry.unit)
    }

    /// Max AP granted to a kind at turn start.
    #[must_use]
    pub fn max_ap(&self, kind: UnitKind) -> u32 {
        self.ap_profiles.max_ap(kind)
    }

    /// AP cost of an action.
    #[must_use]
    pub fn action_cost(&self, action: ActionKind) -> u32 {
        self.action_costs.cost(action)
    }

    /// Roll initiative for one unit.
    ///
    /// `base + speed * speed_multiplier + roll + buff`, where the roll is
    /// uniform over `0..=roll_max`. Repeated calls draw fresh rolls.
    pub fn calculate_initiative(&mut self, unit: &Unit) -> i32 {
        let roll_max = i32::try_from(self.initiative.roll_max).unwrap_or(i32::MAX);
        let roll = self.rng.gen_range(0..=roll_max);
        let speed = i32::try_from(unit.speed).unwrap_or(i32::MAX);

        self.initiative
            .base
            .saturating_add(speed.saturating_mul(self.initiative.speed_multiplier))
            .saturating_add(roll)
            .saturating_add(unit.initiative_buff)
    }

    /// Start a new round: snapshot every living unit, roll initiative and
    /// sort the queue.
    ///
    /// Order is descending initiative, then higher speed, then roster order.
    /// Leaves the scheduler in [`SchedulerPhase::RoundStart`] with no active
    /// unit.
    pub fn build_turn_queue(&mut self, roster: &Roster) -> &[TurnQueueEntry] {
        let mut queue: Vec<TurnQueueEntry> = Vec::with_capacity(roster.len());
        for unit in roster.living() {
            let initiative = self.calculate_initiative(unit);
            queue.push(TurnQueueEntry {
                unit: unit.id,
                team: unit.team,
                kind: unit.kind,
                speed: unit.speed,
                max_ap: self.ap_profiles.max_ap(unit.kind),
                initiative,
            });
        }
        // Stable sort keeps roster (id) order for full ties.
        queue.sort_by(|a, b| {
            b.initiative
                .cmp(&a.initiative)
                .then_with(|| b.speed.cmp(&a.speed))
        });

        self.queue = queue;
        self.current = None;
        self.round += 1;
        self.phase = SchedulerPhase::RoundStart;

        tracing::debug!(
            round = self.round,
            units = self.queue.len(),
            first = ?self.queue.first().map(|e| e.unit),
            "Turn queue built"
        );

        &self.queue
    }

    /// Give the turn to the unit at `index`.
    ///
    /// An out-of-bounds index rebuilds the queue and starts at slot 0, since
    /// deaths can shorten the order between rounds. An empty queue is a
    /// no-op. Dead units are skipped forward. The chosen unit's AP is reset
    /// to its max.
    pub fn start_turn(&mut self, roster: &mut Roster, index: usize) -> Option<UnitId> {
        if self.queue.is_empty() {
            tracing::debug!(index, "start_turn on empty queue ignored");
            return None;
        }

        let mut index = index;
        if index >= self.queue.len() {
            tracing::debug!(
                index,
                len = self.queue.len(),
                "Turn index out of bounds, rebuilding queue"
            );
            self.build_turn_queue(roster);
            index = 0;
        }

        let slot = match self.next_living_slot(roster, index) {
            Some(slot) => slot,
            None => {
                // Everyone left in this round is dead; roll a fresh round.
                self.build_turn_queue(roster);
                self.next_living_slot(roster, 0)?
            }
        };

        let entry = self.queue[slot];
        let unit = roster.get_mut(entry.unit)?;
        unit.current_ap = entry.max_ap;

        self.current = Some(slot);
        self.phase = SchedulerPhase::UnitActive;

        tracing::debug!(
            round = self.round,
            slot,
            unit = entry.unit,
            ap = entry.max_ap,
            initiative = entry.initiative,
            "Turn started"
        );

        Some(entry.unit)
    }

    fn next_living_slot(&self, roster: &Roster, from: usize) -> Option<usize> {
        (from..self.queue.len()).find(|&i| roster.is_alive(self.queue[i].unit))
    }

    /// Enter the encounter: build the first round's queue and start slot 0.
    pub fn begin_encounter(&mut self, roster: &mut Roster) -> Option<UnitId> {
        self.round = 0;
        self.build_turn_queue(roster);
        tracing::info!(units = self.queue.len(), "Encounter started");
        self.start_turn(roster, 0)
    }

    /// Leave turn-based mode.
    pub fn end_encounter(&mut self) {
        if self.phase != SchedulerPhase::Idle {
            tracing::info!(rounds = self.round, "Encounter ended");
        }
        self.queue.clear();
        self.current = None;
        self.phase = SchedulerPhase::Idle;
    }

    /// Finish the active turn and hand over to the next unit.
    ///
    /// When the queue is exhausted a new round begins. Once one side has no
    /// living units the encounter ends and `None` is returned.
    pub fn end_turn(&mut self, roster: &mut Roster) -> Option<UnitId> {
        if self.phase == SchedulerPhase::Idle {
            return None;
        }
        if roster.is_encounter_decided() {
            self.end_encounter();
            return None;
        }

        let next = self.current.map_or(0, |i| i + 1);
        if next >= self.queue.len() {
            self.build_turn_queue(roster);
            return self.start_turn(roster, 0);
        }
        self.start_turn(roster, next)
    }

    /// Whether the active unit has enough AP for `cost`.
    #[must_use]
    pub fn can_afford_cost(&self, roster: &Roster, cost: u32) -> bool {
        self.active_unit()
            .and_then(|id| roster.get(id))
            .is_some_and(|unit| unit.alive && unit.current_ap >= cost)
    }

    /// Whether the active unit may perform `action`.
    #[must_use]
    pub fn can_afford(&self, roster: &Roster, action: ActionKind) -> bool {
        self.can_afford_cost(roster, self.action_cost(action))
    }

    /// Deduct `cost` AP from the active unit, returning what is left.
    ///
    /// On failure nothing changes.
    pub fn spend_ap(&self, roster: &mut Roster, cost: u32) -> Result<u32> {
        let id = self.active_unit().ok_or(TacticsError::NoActiveUnit)?;
        let unit = roster.get_mut(id).ok_or(TacticsError::UnknownUnit(id))?;

        let remaining = unit
            .current_ap
            .checked_sub(cost)
            .ok_or(TacticsError::InsufficientAp {
                required: cost,
                available: unit.current_ap,
            })?;
        unit.current_ap = remaining;

        tracing::trace!(unit = id, cost, remaining, "AP spent");
        Ok(remaining)
    }

    /// Pay for one `action` with the active unit.
    pub fn spend_action(&self, roster: &mut Roster, action: ActionKind) -> Result<u32> {
        self.spend_ap(roster, self.action_cost(action))
    }
}
