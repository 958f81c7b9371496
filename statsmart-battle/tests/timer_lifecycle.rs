use statsmart_battle::{
    BattleConfig, BattleEvent, EmittedEvent, EncounterSession, Outcome, QuizItem, ScriptedSource,
    TimerKind, UniformClock,
};

/// Two stages: a one-hit opener and the boss.
fn short_config() -> BattleConfig {
    BattleConfig {
        stage_health: vec![1, 2],
        ..BattleConfig::default()
    }
}

fn open(config: BattleConfig) -> EncounterSession {
    let sequence: Vec<QuizItem> = (0..config.total_health())
        .map(|idx| QuizItem::new(&format!("q{idx}"), &["right", "wrong", "also wrong"], 0, ""))
        .collect();
    EncounterSession::from_sequence(
        sequence,
        config,
        Box::new(ScriptedSource::default()),
        Box::new(UniformClock::default()),
    )
    .into_session()
    .unwrap()
}

/// Clear the opener and stop at the first millisecond of the boss intro.
fn reach_boss(session: &mut EncounterSession) -> u64 {
    assert!(session.select_choice(0));
    // 2_600ms resolution plus the 1_500ms banner.
    session.advance(4_100);
    assert!(session.state().boss_intro_active());
    session.now_ms()
}

fn countdowns(events: &[EmittedEvent]) -> Vec<(u64, u8)> {
    events
        .iter()
        .filter_map(|emitted| match emitted.event {
            BattleEvent::BossIntroCountdown { remaining } => Some((emitted.at_ms, remaining)),
            _ => None,
        })
        .collect()
}

#[test]
fn boss_intro_counts_down_then_starts_rage() {
    let mut session = open(short_config());
    let entered = reach_boss(&mut session);
    assert!(session.snapshot().input_locked);
    assert_eq!(session.active_timers(), vec![TimerKind::BossIntro]);

    session.drain_events();
    session.advance(5_000);
    let events = session.drain_events();

    assert_eq!(
        countdowns(&events),
        (1..=5)
            .map(|tick| (entered + tick * 1_000, 5 - u8::try_from(tick).unwrap()))
            .collect::<Vec<_>>()
    );
    assert!(events.iter().any(|emitted| emitted.at_ms == entered + 5_000
        && emitted.event == BattleEvent::RageStarted { window_ms: 15_000 }));

    let snap = session.snapshot();
    assert!(!snap.boss_intro_active);
    assert!(snap.rage_timer_visible);
    assert!(!snap.input_locked);
    assert!((snap.rage_progress - 1.0).abs() < f32::EPSILON);
    assert!(!session.active_timers().contains(&TimerKind::BossIntro));
}

#[test]
fn rage_progress_decays_linearly() {
    let mut session = open(short_config());
    reach_boss(&mut session);
    session.advance(5_000 + 7_500);
    let snap = session.snapshot();
    assert!((snap.rage_progress - 0.5).abs() < 1e-3);
    assert!(!snap.rage_performed);
}

#[test]
fn answering_cancels_rage_for_good() {
    let mut session = open(short_config());
    reach_boss(&mut session);
    session.advance(5_000 + 3_000);
    assert!(session.select_choice(0));
    let timers = session.active_timers();
    assert!(!timers.contains(&TimerKind::RageTick));
    assert!(!timers.contains(&TimerKind::RageExpiry));

    session.advance(60_000);
    let events = session.drain_events();
    assert!(events.iter().any(|e| e.event == BattleEvent::RageCancelled));
    assert!(!events
        .iter()
        .any(|e| matches!(e.event, BattleEvent::RageUnleashed { .. })));
    assert_eq!(session.state().player_lives, 5);
    assert_eq!(session.state().stage_health, 1);
    assert!(!session.state().rage_performed);
}

#[test]
fn restarting_the_boss_stage_discards_stale_rage() {
    let config = BattleConfig {
        starting_lives: 4,
        ..short_config()
    };
    let mut session = open(config);
    let entered = reach_boss(&mut session);

    // Intro, then the rage window, then the lethal 4-damage strike settles.
    session.advance(5_000 + 15_000 + 5_000);
    assert_eq!(session.state().outcome(), Some(Outcome::Defeat));
    assert!(session.active_timers().is_empty());

    let restarted_at = session.now_ms();
    assert!(restarted_at > entered + 20_000);
    assert!(session.restart_stage());
    assert_eq!(session.state().player_lives, 1);
    assert_eq!(session.state().question_index, 1);
    assert!(session.state().boss_intro_active());
    assert!(!session.state().rage_performed);
    assert_eq!(session.active_timers(), vec![TimerKind::BossIntro]);
    session.drain_events();

    session.advance(5_000 + 14_999);
    assert!(!session.state().rage_performed, "no stale expiry fired");
    session.advance(1);
    assert!(session.state().rage_performed);
    let unleashed: Vec<u64> = session
        .drain_events()
        .iter()
        .filter(|e| matches!(e.event, BattleEvent::RageUnleashed { .. }))
        .map(|e| e.at_ms)
        .collect();
    assert_eq!(unleashed, vec![restarted_at + 20_000]);
}

#[test]
fn terminal_outcome_cancels_every_timer() {
    let mut session = open(short_config());
    reach_boss(&mut session);
    session.advance(5_000);
    assert!(session.select_choice(0));
    session.advance(1_000);
    assert!(session.select_choice(0));
    session.advance(3_000);
    assert_eq!(session.state().outcome(), Some(Outcome::Victory));
    assert!(session.active_timers().is_empty());
    assert_eq!(session.next_deadline(), None);

    let frozen = session.state().clone();
    session.advance(100_000);
    assert_eq!(session.state(), &frozen);
}

#[test]
fn teardown_mid_intro_silences_the_session() {
    let mut session = open(short_config());
    reach_boss(&mut session);
    session.advance(2_000);
    session.teardown();
    session.drain_events();

    session.advance(60_000);
    assert!(session.drain_events().is_empty());
    assert_eq!(session.state().boss_intro_countdown(), Some(3));
    assert!(!session.restart_quiz());
    assert!(session.snapshot().input_locked);
}

#[test]
fn damage_bubble_clears_after_its_lifetime() {
    let mut session = open(short_config());
    assert!(session.select_choice(1));
    session.advance(800);
    assert!(session.active_timers().contains(&TimerKind::DamageBubble));
    session.advance(419);
    assert!(session.snapshot().damage_bubble.is_some());
    session.advance(1);
    assert!(session.snapshot().damage_bubble.is_none());
    assert!(!session.active_timers().contains(&TimerKind::DamageBubble));
}
