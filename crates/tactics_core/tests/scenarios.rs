//! End-to-end encounter scenarios.
//!
//! These drive the public API the way the input layer would: build a map
//! and roster, ask for paths and ranges, run turns and move units.

use tactics_core::prelude::*;
use tactics_test_utils::fixtures::{
    agent, agent_and_guard, enclosed_target, grid_from_ascii, guard, open_grid, pos,
    skirmish_session, straight_path, wall_column_with_gap,
};

// =============================================================================
// Pathfinding
// =============================================================================

#[test]
fn open_grid_diagonal_path() {
    let grid = open_grid(10);
    let mut pathfinder = Pathfinder::default();

    let path = pathfinder.find_path(&grid, pos(0, 0), pos(5, 5)).unwrap();

    assert_eq!(path.goal(), Some(pos(5, 5)));
    assert!(path.len() <= 6, "expected diagonal-dominant path, got {path:?}");
}

#[test]
fn path_through_wall_gap() {
    let grid = wall_column_with_gap(10, 5, 5);
    let mut pathfinder = Pathfinder::default();

    let path = pathfinder.find_path(&grid, pos(3, 5), pos(7, 5)).unwrap();

    assert!(path.tiles().contains(&pos(5, 5)));
    assert!(path.is_contiguous());
}

#[test]
fn enclosed_target_is_unreachable() {
    let grid = enclosed_target(10, pos(5, 5));
    let mut pathfinder = Pathfinder::default();

    assert!(pathfinder.find_path(&grid, pos(0, 0), pos(5, 5)).is_none());
    // The failure is cached like a success.
    assert!(pathfinder.find_path(&grid, pos(0, 0), pos(5, 5)).is_none());
    assert_eq!(pathfinder.cache_stats().hits, 1);
}

#[test]
fn doors_change_reachability() {
    let (grid, doors) = grid_from_ascii(
        "
        ....#....
        ....D....
        ....#....
        ",
    );
    let roster: Roster = [agent(1, pos(0, 1), 5), guard(2, pos(8, 1), 4)]
        .into_iter()
        .collect();
    let mut session = TacticalSession::new(TacticsConfig::default(), grid, doors, roster, 9).unwrap();

    assert!(session.find_path(pos(0, 1), pos(8, 1)).is_none());
    assert!(!session.has_line_of_sight(pos(0, 1), pos(8, 1)));

    session.toggle_door(pos(4, 1));
    let path = session.find_path(pos(0, 1), pos(8, 1)).unwrap();
    assert_eq!(path.steps(), 8);
    assert!(session.has_line_of_sight(pos(0, 1), pos(8, 1)));
}

// =============================================================================
// Turn scheduling
// =============================================================================

#[test]
fn queue_assigns_profile_ap() {
    let mut roster = agent_and_guard();
    let mut scheduler = TurnScheduler::with_seed(&TacticsConfig::default(), 11);

    let queue = scheduler.build_turn_queue(&roster).to_vec();
    assert_eq!(queue.len(), 2);

    let ap_of = |id| queue.iter().find(|e| e.unit == id).map(|e| e.max_ap);
    assert_eq!(ap_of(1), Some(12));
    assert_eq!(ap_of(2), Some(8));

    // Both turns hand out the profile AP.
    let first = scheduler.start_turn(&mut roster, 0).unwrap();
    let second = scheduler.end_turn(&mut roster).unwrap();
    assert_ne!(first, second);
    assert_eq!(roster.get(1).unwrap().current_ap, 12);
    assert_eq!(roster.get(2).unwrap().current_ap, 8);
}

#[test]
fn faster_unit_acts_first() {
    // Agent speed 5 vs guard speed 4: 3 points of speed initiative against
    // a roll spread of 3, and ties go to the faster unit.
    let roster = agent_and_guard();
    for seed in 0..100 {
        let mut scheduler = TurnScheduler::with_seed(&TacticsConfig::default(), seed);
        assert_eq!(scheduler.build_turn_queue(&roster)[0].unit, 1, "seed {seed}");
    }
}

#[test]
fn encounter_runs_until_one_side_is_gone() {
    let mut session = skirmish_session(5);
    let first = session.begin_encounter();
    assert!(first.is_some());
    assert_eq!(session.scheduler().queue().len(), 6);

    // Play two full rounds.
    for _ in 0..12 {
        assert!(session.end_turn().is_some());
    }
    assert_eq!(session.scheduler().round(), 3);

    for enemy in [3, 4, 5] {
        session.kill_unit(enemy);
    }
    assert_eq!(session.end_turn(), None);
    assert_eq!(session.phase(), SchedulerPhase::Idle);
}

#[test]
fn dead_units_drop_out_of_next_round() {
    let mut session = skirmish_session(8);
    session.begin_encounter();
    session.kill_unit(6);

    while session.scheduler().round() == 1 {
        session.end_turn();
    }
    assert_eq!(session.scheduler().queue().len(), 5);
    assert!(session.scheduler().queue().iter().all(|e| e.unit != 6));
}

#[test]
fn actions_are_gated_by_ap() {
    let mut session = skirmish_session(2);
    session.begin_encounter();
    let active = session.active_unit().unwrap();
    let max = session.roster().get(active).unwrap().current_ap;

    let mut spent = 0;
    while session.can_afford(ActionKind::Reload) {
        session.perform_action(ActionKind::Reload).unwrap();
        spent += 2;
    }
    assert_eq!(session.roster().get(active).unwrap().current_ap, max - spent);
    assert!(matches!(
        session.perform_action(ActionKind::Reload),
        Err(TacticsError::InsufficientAp { required: 2, .. })
    ));
}

// =============================================================================
// Movement
// =============================================================================

#[test]
fn twenty_tile_path_takes_two_rounds() {
    let path = straight_path(pos(0, 0), 20);
    assert_eq!(path.cost(), Fixed::from_num(20));

    let plan = plan_multi_turn_movement(&path, PlanBudget::uniform(12), StepCosts::new(1, true))
        .unwrap();

    assert_eq!(plan.rounds(), 2);
    assert!(plan.segments()[0].cost <= Fixed::from_num(12));
    assert_eq!(
        plan.segments()[0].cost + plan.segments()[1].cost,
        Fixed::from_num(20)
    );
    assert_eq!(plan.concatenated_tiles(), path.tiles());
}

#[test]
fn movement_range_matches_spent_ap() {
    let mut session = skirmish_session(4);
    session.begin_encounter();
    let active = session.active_unit().unwrap();

    let range = session.movement_range(active).unwrap();
    let origin = range.origin();
    assert_eq!(range.cost_to(origin), Some(Fixed::ZERO));

    // Walk to the farthest tile in range; the AP charged is the ceiling of
    // its range cost.
    let target = range
        .tiles()
        .into_iter()
        .max_by_key(|t| (t.cost, std::cmp::Reverse(t.pos.row_major())))
        .unwrap();
    let before = session.roster().get(active).unwrap().current_ap;
    let outcome = session.order_move(active, target.pos).unwrap();

    assert!(outcome.arrived());
    assert_eq!(outcome.ap_spent, target.cost.ceil().to_num::<u32>());
    assert_eq!(outcome.remaining_ap, before - outcome.ap_spent);
    assert_eq!(session.roster().get(active).unwrap().position, target.pos);
}

#[test]
fn order_beyond_range_continues_next_round() {
    let grid = open_grid(40);
    let roster: Roster = [agent(1, pos(0, 0), 9), guard(2, pos(39, 39), 1)]
        .into_iter()
        .collect();
    let mut session =
        TacticalSession::new(TacticsConfig::default(), grid, DoorTable::new(), roster, 1).unwrap();
    assert_eq!(session.begin_encounter(), Some(1));

    let outcome = session.order_move(1, pos(30, 0)).unwrap();
    assert_eq!(outcome.segment.end(), Some(pos(12, 0)));
    assert_eq!(outcome.rounds_remaining, 2);

    let mut arrived = false;
    for _ in 0..8 {
        if session.end_turn() == Some(1) {
            let outcome = session.continue_move().unwrap().unwrap();
            if outcome.arrived() {
                arrived = true;
                break;
            }
        }
    }
    assert!(arrived);
    assert_eq!(session.roster().get(1).unwrap().position, pos(30, 0));
}
