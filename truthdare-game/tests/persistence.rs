use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::collections::BTreeSet;
use truthdare_game::constants::{COMPLETED_TASKS_STORAGE_KEY, STATE_STORAGE_KEY};
use truthdare_game::{
    BundledLoader, GameEngine, GameState, GameStorage, KeyValueStorage, KeyValueStore,
    MemoryStore, PlayerStats, TaskType,
};

const NOW: i64 = 1_760_000_000_000;

fn engine(store: &MemoryStore) -> GameEngine<BundledLoader, KeyValueStorage<MemoryStore>> {
    GameEngine::new(BundledLoader, KeyValueStorage::new(store.clone()))
}

#[test]
fn player_stats_roundtrip_through_json() {
    let mut stats = PlayerStats::default().with_experience(420);
    stats.points = 1_234;
    stats.skip_tokens = 2;
    stats.achievements.insert("beginner".to_string());
    stats.completed_quests.push("daily-truths-1".to_string());
    stats.xp_boost_end_time = Some(NOW);

    let json = serde_json::to_string(&stats).unwrap();
    let back: PlayerStats = serde_json::from_str(&json).unwrap();
    assert_eq!(back, stats);
}

#[test]
fn committed_session_survives_a_restart() {
    let store = MemoryStore::default();
    let mut rng = SmallRng::seed_from_u64(17);

    let first = engine(&store);
    let mut session = first.create_session(NOW).unwrap();
    session.select_category("friends").unwrap();
    session.draw(&mut rng, TaskType::Truth, NOW).unwrap();
    let resolved = session.resolve_pending(true, NOW + 1_000).unwrap();
    first.commit(&session).unwrap();

    let second = engine(&store);
    let resumed = second.resume_session(NOW + 2_000).unwrap();
    assert_eq!(resumed.state().selected_category, "friends");
    assert_eq!(resumed.stats(), session.stats());
    assert!(resumed.completed_tasks().contains(&resolved.task.id));
    assert_eq!(resumed.state().last_task_timestamp, Some(NOW + 1_000));
}

#[test]
fn malformed_save_falls_back_to_fresh_game() {
    let store = MemoryStore::default();
    store.set_item(STATE_STORAGE_KEY, "{\"playerStats\": 12").unwrap();
    store.set_item(COMPLETED_TASKS_STORAGE_KEY, "oops").unwrap();

    let session = engine(&store).resume_session(NOW).unwrap();
    let category = session.pool().default_category_id().unwrap().to_string();
    assert_eq!(session.state(), &GameState::initial(category, NOW));
    assert!(session.completed_tasks().is_empty());
}

#[test]
fn partial_save_merges_with_defaults() {
    let store = MemoryStore::default();
    store
        .set_item(
            STATE_STORAGE_KEY,
            r#"{"difficulty": "hard", "playerStats": {"points": 90, "xp": 130, "currentStreak": 4}}"#,
        )
        .unwrap();

    let session = engine(&store).resume_session(NOW).unwrap();
    let stats = session.stats();
    assert_eq!(stats.points, 90);
    assert_eq!(stats.level(), 2);
    assert_eq!(stats.max_streak, 4);
    assert_eq!(
        session.state().difficulty,
        truthdare_game::Difficulty::Hard
    );
    assert!(!session.state().available_quests.is_empty());
    assert!(!session.state().community_quests.is_empty());
    assert!(!stats.active_quests.is_empty());
}

#[test]
fn null_category_keeps_the_rest_of_the_save() {
    let store = MemoryStore::default();
    store
        .set_item(
            STATE_STORAGE_KEY,
            r#"{"selectedCategory": null, "playerStats": {"points": 900, "xp": 400, "skipTokens": 3}}"#,
        )
        .unwrap();

    let session = engine(&store).resume_session(NOW).unwrap();
    assert_eq!(session.stats().points, 900);
    assert_eq!(session.stats().experience, 400);
    assert_eq!(session.stats().skip_tokens, 3);
    assert_eq!(
        Some(session.state().selected_category.as_str()),
        session.pool().default_category_id()
    );
}

#[test]
fn one_broken_quest_does_not_discard_progress() {
    let store = MemoryStore::default();
    store
        .set_item(
            STATE_STORAGE_KEY,
            r#"{
                "playerStats": {"points": 900, "xp": 250, "currentStreak": 2},
                "availableQuests": [
                    {"id": "broken", "title": "Missing goal", "type": "DAILY_PERSONAL", "targetValue": 5}
                ]
            }"#,
        )
        .unwrap();

    let session = engine(&store).resume_session(NOW).unwrap();
    assert_eq!(session.stats().points, 900);
    assert_eq!(session.stats().level(), 2);
    assert_eq!(session.stats().current_streak, 2);
    assert!(
        session
            .state()
            .available_quests
            .iter()
            .all(|quest| quest.id != "broken")
    );
    assert!(!session.state().available_quests.is_empty());
}

#[test]
fn reset_wipes_storage() {
    let store = MemoryStore::default();
    let engine = engine(&store);
    let mut rng = SmallRng::seed_from_u64(23);
    let mut session = engine.create_session(NOW).unwrap();
    session.draw(&mut rng, TaskType::Dare, NOW).unwrap();
    session.resolve_pending(true, NOW).unwrap();
    engine.commit(&session).unwrap();

    engine.reset(&mut session, NOW + 5).unwrap();
    assert_eq!(session.stats().points, 0);
    assert_eq!(
        engine.storage().load_completed_tasks().unwrap(),
        Some(BTreeSet::new())
    );
    let stored = engine.storage().load_state().unwrap().unwrap();
    assert_eq!(&stored, session.state());
}
