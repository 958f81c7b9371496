use serde_json::Value;
use statsmart_battle::constants::{ANALYSIS_KEY, RECENT_KEY};
use statsmart_battle::{
    AnalysisPayload, AnalysisStore, BattleConfig, BattleEngine, EncounterSession, MemoryStore,
    RecentAnalysis, SpriteCatalog, SpriteKey,
};

const SAMPLE: &str = include_str!("../assets/sample_analysis.json");
const BATTLE: &str = include_str!("../assets/battle.json");

#[test]
fn bundled_battle_config_validates() {
    let cfg = BattleConfig::from_json(BATTLE).unwrap();
    assert_eq!(cfg.stage_health, vec![1, 1, 3, 2, 2, 3, 5]);
    assert_eq!(cfg.total_health(), 17);
    assert_eq!(cfg.boss_special_damage, 4);
    assert_eq!(cfg.timing.damage_bubble_ms, 420);
    assert!(cfg.validate().is_ok());
}

#[test]
fn sample_analysis_quiz_is_well_formed() {
    let payload = AnalysisPayload::from_json(SAMPLE).unwrap();
    let quiz = payload.quiz_items();
    assert_eq!(quiz.len(), payload.analysis.quiz.len());
    for item in &quiz {
        let answer = item.answer_index().unwrap();
        assert!(answer < item.choices.len());
        assert!(!item.question.is_empty());
    }
}

#[test]
fn payload_round_trips_with_camel_case_keys() {
    let payload = AnalysisPayload::from_json(SAMPLE).unwrap();
    let json: Value = serde_json::to_value(&payload).unwrap();
    assert!(json.get("sessionId").is_some());
    assert!(json["analysis"].get("recommendedTest").is_some());
    assert!(json["analysis"].get("quiz").is_some());
    let reparsed: AnalysisPayload = serde_json::from_value(json).unwrap();
    assert_eq!(reparsed, payload);
}

#[test]
fn recent_history_is_stored_newest_first_and_capped() {
    let store = MemoryStore::new();
    let engine = BattleEngine::new(store.clone());
    let base = AnalysisPayload::from_json(SAMPLE).unwrap();
    for idx in 0..5 {
        let payload = AnalysisPayload {
            session_id: format!("upload-{idx}"),
            ..base.clone()
        };
        engine.record(&payload, 1_000 + idx).unwrap();
    }

    let raw: Value = serde_json::from_str(&store.raw(RECENT_KEY).unwrap()).unwrap();
    let rows = raw.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["id"], "upload-4");
    assert_eq!(rows[0]["at"], 1_004);
    assert_eq!(rows[0]["recommendedTest"], "Welch's t-test");
    assert_eq!(rows[0]["variablesCount"], 3);

    let recent: Vec<RecentAnalysis> = engine.recent().unwrap();
    let ids: Vec<&str> = recent.iter().map(|row| row.id.as_str()).collect();
    assert_eq!(ids, vec!["upload-4", "upload-3", "upload-2"]);
    assert_eq!(
        store.load_analysis().unwrap().unwrap().session_id,
        "upload-4"
    );
    assert!(store.raw(ANALYSIS_KEY).is_some());
}

#[test]
fn snapshot_serialises_render_contract() {
    let payload = AnalysisPayload::from_json(SAMPLE).unwrap();
    let session = EncounterSession::seeded(&payload.quiz_items(), BattleConfig::default(), 11)
        .into_session()
        .unwrap();
    let json = serde_json::to_value(session.snapshot()).unwrap();

    assert_eq!(json["phase"]["phase"], "in_progress");
    assert_eq!(json["stage_health"], 1);
    assert_eq!(json["player_lives"], 5);
    assert_eq!(json["enemy"], "orc");
    assert_eq!(json["enemy_name"], "Orc");
    assert_eq!(json["input_locked"], false);
    assert_eq!(json["rage_timer_visible"], false);
    assert_eq!(json["question"]["choices"].as_array().unwrap().len(), 4);
    assert_eq!(json["outcome"], Value::Null);
}

#[test]
fn single_stage_encounter_opens_on_the_boss_intro() {
    let config = BattleConfig {
        stage_health: vec![2],
        ..BattleConfig::default()
    };
    let payload = AnalysisPayload::from_json(SAMPLE).unwrap();
    let session = EncounterSession::seeded(&payload.quiz_items(), config, 11)
        .into_session()
        .unwrap();
    let snap = session.snapshot();
    assert!(snap.boss_intro_active);
    assert_eq!(snap.boss_intro_countdown, Some(5));
    assert!(snap.input_locked);
    assert_eq!(snap.question_count, 2);
}

#[test]
fn badges_serialise_as_display_labels() {
    let json = serde_json::to_value(SpriteKey::OrcRider.badges()).unwrap();
    assert_eq!(json, serde_json::json!(["Boss", "Rage"]));
    let json = serde_json::to_value(SpriteKey::EliteOrc.badges()).unwrap();
    assert_eq!(json, serde_json::json!(["Boss", "Special Attack"]));
}

#[test]
fn sprite_catalog_covers_every_roster_entry() {
    use statsmart_battle::{AnimationClock, AnimationKind};
    let kinds = [
        AnimationKind::Idle,
        AnimationKind::Attack1,
        AnimationKind::Attack2,
        AnimationKind::Hurt,
        AnimationKind::Death,
    ];
    for stage in 0..7 {
        let sprite = SpriteKey::for_stage(stage);
        for kind in kinds {
            assert!(SpriteCatalog.duration_ms(sprite, kind) > 0, "{sprite:?} {kind}");
        }
    }
}
