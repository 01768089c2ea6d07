//! End-to-end engine scenarios against the scripted server.

use prison_core::engine::{BotState, Directive, Engine, TimerKind};
use prison_core::event::SessionEvent;
use prison_core::filters::FilterLists;
use prison_core::participant::ParticipantId;
use prison_core::settings::Settings;
use prison_core::timing::{AFTER_ACTION_MS, JOIN_GRACE_MS, RECONNECT_CYCLE_MS};
use prison_test_utils::fixtures::{
    evil_allies_filters, filtered_settings, pid, steady_settings,
};
use prison_test_utils::harness::{EngineHarness, Step, MODEL_LATENCY_MS};

// ============================================================================
// Targeting
// ============================================================================

#[test]
fn test_rotation_moves_to_next_target_after_settlement() {
    let mut engine = Engine::with_seed(steady_settings(), FilterLists::default(), 11);
    engine.handle_event(SessionEvent::Authenticated, 0);
    engine.start(0);
    engine.add_target(pid("A"), 2, 0);
    engine.add_target(pid("B"), 1, 0);
    assert_eq!(engine.current_target(), Some(&pid("A")));

    engine.poll(JOIN_GRACE_MS);
    let (kind, due) = engine.pending_timer().map(|(k, d)| (k.clone(), d)).unwrap();
    assert_eq!(kind, TimerKind::Attack(pid("A")));
    let out = engine.poll(due);
    assert!(out.contains(&Directive::Prison(pid("A"))));

    engine.handle_event(SessionEvent::AfterAction, due + AFTER_ACTION_MS);
    assert_eq!(engine.current_target(), Some(&pid("B")));
}

#[test]
fn test_whitelist_wins_over_blacklist() {
    let engine = Engine::with_seed(filtered_settings(), evil_allies_filters(), 1);
    assert!(!engine.should_target_user("Evil", "Allies"));
    assert!(engine.should_target_user("Evil", "Reds"));
    assert!(!engine.should_target_user("Bob", ""));
}

#[test]
fn test_filtered_roster_only_targets_listed() {
    let mut harness = EngineHarness::online(filtered_settings(), evil_allies_filters(), 4);
    harness.start();
    harness.join("1", "Evil", "Allies");
    harness.join("2", "Evil", "");
    harness.join("3", "Bob", "");
    assert_eq!(harness.engine.targets(), &[pid("2")]);

    harness.advance(20_000);
    assert!(harness.prisons().iter().all(|(_, id)| *id == pid("2")));
}

#[test]
fn test_filter_update_drops_targets_but_keeps_hostiles() {
    let mut harness = EngineHarness::online(
        filtered_settings(),
        FilterLists::from_blocks("", "Evil\nBob", "", ""),
        4,
    );
    harness.start();
    harness.join("1", "Evil", "");
    harness.join("2", "Bob", "");
    harness.enemy("2");
    assert_eq!(harness.engine.targets().len(), 2);

    harness.engine.update_filters(FilterLists::default());
    // Staged until the next loop tick.
    assert_eq!(harness.engine.targets().len(), 2);
    harness.advance(600);

    assert_eq!(harness.engine.targets(), &[pid("2")]);
}

#[test]
fn test_settings_update_waits_for_in_flight_action() {
    let mut harness = EngineHarness::online(steady_settings(), FilterLists::default(), 8);
    harness.start();
    harness.join("7", "Bob", "");
    harness.advance(JOIN_GRACE_MS);
    assert!(harness.engine.is_in_flight());

    let mut calmer = steady_settings();
    calmer.prison_all = false;
    harness.engine.update_settings(calmer);
    // The armed attack is not interrupted.
    assert!(matches!(
        harness.engine.pending_timer(),
        Some((TimerKind::Attack(_), _))
    ));
    harness.advance(3000);
    assert_eq!(harness.prisons().len(), 1);
    assert!(!harness.engine.settings().prison_all);
    assert!(harness.engine.targets().is_empty());
}

// ============================================================================
// Enemies
// ============================================================================

#[test]
fn test_repeated_enemy_rises_to_high_priority() {
    let mut harness = EngineHarness::online(steady_settings(), FilterLists::default(), 4);
    harness.start();
    for _ in 0..4 {
        harness.enemy("66");
        harness.advance(100);
    }
    let profile = harness.engine.enemies().profile(&pid("66")).copied().unwrap();
    assert_eq!(profile.hits, 4);
    assert_eq!(profile.danger, 60);
    assert_eq!(profile.priority(), 3);
    assert_eq!(harness.engine.enemies().hostiles(harness.now()), vec![pid("66")]);
}

#[test]
fn test_defense_preempts_attack_scheduling() {
    let mut settings = steady_settings();
    settings.stand_on_enemy = true;
    let mut harness = EngineHarness::online(settings, FilterLists::default(), 4);
    harness.start();
    harness.join("7", "Bob", "");
    harness.advance(JOIN_GRACE_MS - 1);
    harness.advance(1);
    harness.enemy("66");

    // The attack armed at the grace deadline keeps the slot.
    assert!(matches!(
        harness.engine.pending_timer(),
        Some((TimerKind::Attack(id), _)) if *id == pid("7")
    ));
}

// ============================================================================
// Disconnect and reconnect
// ============================================================================

#[test]
fn test_disconnect_cancels_stale_attack() {
    let mut harness = EngineHarness::online(steady_settings(), FilterLists::default(), 21);
    harness.start();
    harness.join("7", "Bob", "");
    harness.advance(JOIN_GRACE_MS);
    let (_, due) = harness.engine.pending_timer().map(|(k, d)| (k.clone(), d)).unwrap();

    harness.apply(Step::Drop);
    assert_eq!(harness.engine.state(), BotState::Idle);
    assert!(harness.engine.pending_timer().is_none());

    harness.deliver(SessionEvent::Authenticated);
    harness.start();
    harness.advance_to(due + 1);
    assert!(harness.prisons().is_empty());
}

#[test]
fn test_reconnect_cycle_rejoins_planet() {
    let settings = Settings {
        disconnect_action: true,
        ..steady_settings()
    };
    let mut harness = EngineHarness::online(settings, FilterLists::default(), 5);
    harness.apply(Step::Travel("mars".to_string()));
    assert!(harness.saw(&Directive::JoinPlanet("mars".to_string())));
    harness.start();
    harness.join("7", "Bob", "");
    harness.advance(JOIN_GRACE_MS + 5000);

    let (first_at, _) = harness.prisons()[0].clone();
    let settled = first_at + AFTER_ACTION_MS;
    assert!(harness.saw(&Directive::Disconnect));

    let connect_at = harness
        .trace()
        .iter()
        .find(|(_, d)| *d == Directive::Connect)
        .map(|(at, _)| *at)
        .unwrap();
    assert_eq!(connect_at, settled + RECONNECT_CYCLE_MS);

    let rejoins = harness
        .trace()
        .iter()
        .filter(|(at, d)| *at > settled && *d == Directive::JoinPlanet("mars".to_string()))
        .count();
    assert_eq!(rejoins, 1);
    assert_eq!(harness.engine.state(), BotState::ActiveWaiting);
    // Grace re-armed by the reconnect, then again by the planet join.
    assert_eq!(
        harness.engine.join_ready_at(),
        connect_at + 2 * MODEL_LATENCY_MS + JOIN_GRACE_MS
    );
}

#[test]
fn test_reconnect_disabled_stays_idle() {
    let settings = Settings {
        disconnect_action: true,
        reconnect: false,
        ..steady_settings()
    };
    let mut harness = EngineHarness::online(settings, FilterLists::default(), 5);
    harness.start();
    harness.join("7", "Bob", "");
    harness.advance(30_000);

    assert_eq!(harness.prisons().len(), 1);
    assert!(!harness.saw(&Directive::Connect));
    assert_eq!(harness.engine.state(), BotState::Idle);
}

#[test]
fn test_prison_and_off_acts_once() {
    let settings = Settings {
        prison_and_off: true,
        ..steady_settings()
    };
    let mut harness = EngineHarness::online(settings, FilterLists::default(), 5);
    harness.start();
    harness.join("7", "Bob", "");
    harness.join("8", "Eve", "");
    harness.advance(60_000);

    assert_eq!(harness.prisons().len(), 1);
    assert!(harness.saw(&Directive::Disconnect));
    assert!(harness.saw(&Directive::Armed(false)));
}

#[test]
fn test_last_target_leaving_reconnects_when_enabled() {
    let settings = Settings {
        user_part: true,
        ..steady_settings()
    };
    let mut harness = EngineHarness::online(settings, FilterLists::default(), 5);
    harness.start();
    harness.join("7", "Bob", "");
    harness.join("8", "Eve", "");
    harness.part("7");
    assert!(!harness.saw(&Directive::Disconnect));
    harness.part("8");
    assert!(harness.saw(&Directive::Disconnect));
    assert_eq!(harness.engine.state(), BotState::Reconnecting);

    harness.advance(RECONNECT_CYCLE_MS);
    assert!(harness.saw(&Directive::Connect));
    assert_eq!(harness.engine.state(), BotState::ActiveWaiting);
}

#[test]
fn test_target_leaving_before_timer_drops_action() {
    let mut harness = EngineHarness::online(steady_settings(), FilterLists::default(), 5);
    harness.start();
    harness.join("7", "Bob", "");
    harness.join("8", "Eve", "");
    harness.advance(JOIN_GRACE_MS);
    let target = match harness.engine.pending_timer() {
        Some((TimerKind::Attack(id), _)) => id.clone(),
        other => panic!("expected an armed attack, got {other:?}"),
    };

    harness.apply(Step::Part(target.clone()));
    assert!(!harness.engine.is_in_flight());
    harness.advance(20_000);
    assert!(harness.prisons().iter().all(|(_, id)| *id != target));
    assert!(!harness.prisons().is_empty());
}

#[test]
fn test_offline_prison_is_dropped_not_stalled() {
    let mut engine = Engine::with_seed(steady_settings(), FilterLists::default(), 5);
    engine.handle_event(SessionEvent::Authenticated, 0);
    engine.start(0);
    engine.add_target(ParticipantId::new("7"), 1, 0);
    engine.poll(JOIN_GRACE_MS);
    let (_, due) = engine.pending_timer().map(|(k, d)| (k.clone(), d)).unwrap();
    let out = engine.poll(due);
    assert!(out.contains(&Directive::Prison(pid("7"))));

    // The client refused it.
    engine.action_dropped();
    assert_eq!(engine.state(), BotState::ActiveWaiting);
    engine.poll(due + 300);
    assert!(matches!(
        engine.pending_timer(),
        Some((TimerKind::Attack(_), _))
    ));
}
