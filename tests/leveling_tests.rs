//! Integration tests for XP accumulation and level resolution.
//!
//! Drives the leveling engine through the store the way the CLI and daemon do.

mod common;

use common::TestEnv;
use questlog::leveling::{self, BASE_XP, MAX_LEVEL};
use questlog::{LevelConfig, LevelUpNotifier, QuestPatch, QuestlogConfig, Store};

// =============================================================================
// Curve Properties
// =============================================================================

#[test]
fn test_thresholds_start_at_zero_and_never_decrease() {
    assert_eq!(leveling::xp_for_level(1), 0);
    assert_eq!(leveling::xp_for_level(2), BASE_XP);

    let mut previous = 0;
    for level in 1..=MAX_LEVEL {
        let threshold = leveling::xp_for_level(level);
        assert!(threshold >= previous, "threshold dropped at level {}", level);
        previous = threshold;
    }
}

#[test]
fn test_zero_and_negative_xp_resolve_identically() {
    let zero = leveling::calculate_level(0);
    assert_eq!(zero.level, 1);
    assert_eq!(zero.xp_for_current_level, 0);
    assert_eq!(zero.xp_for_next_level, 100);
    assert_eq!(zero.progress_percentage, 0.0);

    assert_eq!(leveling::calculate_level(-50), zero);
}

#[test]
fn test_level_two_reached_exactly_at_threshold() {
    assert_eq!(leveling::calculate_level(99).level, 1);
    assert_eq!(leveling::calculate_level(100).level, 2);
}

#[test]
fn test_huge_totals_stop_at_max_level() {
    let ceiling = leveling::xp_for_level(MAX_LEVEL) as i64;
    for total in [ceiling, ceiling + 1, ceiling * 10, i64::MAX] {
        let snapshot = leveling::calculate_level(total);
        assert_eq!(snapshot.level, MAX_LEVEL);
        assert!(snapshot.is_max_level);
        assert_eq!(snapshot.progress_percentage, 100.0);
    }
}

#[test]
fn test_titles_step_at_decade_boundaries() {
    assert_eq!(leveling::level_title(5), leveling::level_title(10));
    assert_ne!(leveling::level_title(10), leveling::level_title(11));
    assert_eq!(leveling::level_color(1), "gray");
    assert_eq!(leveling::level_color(MAX_LEVEL), "amber");
}

#[test]
fn test_snapshot_is_repeatable() {
    for total in [0, 105, 5_000, 1_000_000] {
        assert_eq!(leveling::calculate_level(total), leveling::calculate_level(total));
    }
}

// =============================================================================
// Store-Driven Leveling
// =============================================================================

#[test]
fn test_only_completed_quests_earn_xp() {
    let mut env = TestEnv::new();

    env.complete_quest("Stretch", 60);
    env.complete_quest("Read a chapter", 45);
    env.create_quest("Climb a mountain", 500);

    let level = env.level();
    assert_eq!(level.total_xp, 105);
    assert_eq!(level.level, 2);
    assert_eq!(level.xp_for_current_level, 100);
    assert_eq!(level.xp_for_next_level, 220);
    assert_eq!(level.xp_in_current_level, 5);
    assert_eq!(level.xp_needed_for_next, 120);
    assert!((level.progress_percentage - 4.1666).abs() < 0.01);
}

#[test]
fn test_reopening_quest_removes_its_xp() {
    let mut env = TestEnv::new();

    let quest = env.complete_quest("Clean garage", 250);
    env.assert_level(3);

    env.store.set_complete(&quest.id, false).unwrap();
    env.assert_level(1);
    assert_eq!(env.store.total_xp().unwrap(), 0);
}

#[test]
fn test_deleting_completed_quest_removes_its_xp() {
    let mut env = TestEnv::new();

    let quest = env.complete_quest("File taxes", 400);
    env.assert_level(4);

    env.store.delete(&quest.id).unwrap();
    env.assert_level(1);
}

#[test]
fn test_reward_edit_on_completed_quest_moves_level() {
    let mut env = TestEnv::new();

    let quest = env.complete_quest("Learn a song", 100);
    env.assert_level(2);

    env.store
        .update(&quest.id, QuestPatch::new().reward_xp(1000))
        .unwrap();
    // Level 7 starts at 991 XP, level 8 at 1289.
    assert_eq!(env.level().level, 7);
}

#[test]
fn test_level_survives_reopen() {
    let mut env = TestEnv::new();

    env.complete_quest("Bake bread", 300);
    let before = env.level();

    env.reopen();
    assert_eq!(env.level(), before);
}

#[test]
fn test_stats_count_quests_and_xp() {
    let mut env = TestEnv::new();

    env.complete_quest("One", 10);
    env.complete_quest("Two", 20);
    env.create_quest("Three", 30);

    let stats = env.store.stats().unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.total_xp, 30);
}

#[test]
fn test_custom_curve_from_config() {
    let env = TestEnv::new();

    let config = QuestlogConfig {
        leveling: LevelConfig {
            base_xp: 10,
            growth_rate: 2.0,
            max_level: 5,
        },
    };
    config.save(env.temp_dir.path()).unwrap();

    let mut store = Store::open(env.temp_dir.path()).unwrap();
    let quest = store
        .create(questlog::NewQuest::new("Tiny", "Tiny", questlog::Difficulty::Easy, 35))
        .unwrap();
    store.set_complete(&quest.id, true).unwrap();

    // Thresholds: 0, 10, 30, 70, 150.
    let level = store.level().unwrap();
    assert_eq!(level.level, 3);
    assert_eq!(level.xp_for_next_level, 70);
}

#[test]
fn test_invalid_curve_config_fails_open() {
    let env = TestEnv::new();

    let config = QuestlogConfig {
        leveling: LevelConfig {
            growth_rate: -1.0,
            ..LevelConfig::default()
        },
    };
    config.save(env.temp_dir.path()).unwrap();

    assert!(Store::open(env.temp_dir.path()).is_err());
}

#[test]
fn test_oversized_max_level_config_fails_open() {
    let env = TestEnv::new();

    let path = QuestlogConfig::path(env.temp_dir.path());
    std::fs::write(&path, "leveling:\n  max_level: 4000000000\n").unwrap();

    let err = Store::open(env.temp_dir.path()).err().expect("open should fail");
    assert!(format!("{:#}", err).contains("max_level"));
}

// =============================================================================
// Level-Up Notifications
// =============================================================================

#[test]
fn test_notifier_first_observation_is_silent() {
    let env = TestEnv::new();
    let mut notifier = LevelUpNotifier::new();

    assert!(notifier.observe(&env.level()).is_none());
    assert_eq!(notifier.previous_level(), Some(1));
}

#[test]
fn test_notifier_fires_once_per_rise() {
    let mut env = TestEnv::new();
    let mut notifier = LevelUpNotifier::new();
    notifier.observe(&env.level());

    env.complete_quest("Small win", 50);
    assert!(notifier.observe(&env.level()).is_none());

    env.complete_quest("Big win", 400);
    let level_up = notifier.observe(&env.level()).expect("expected a level up");
    assert_eq!(level_up.from, 1);
    assert_eq!(level_up.to, 4);
    assert_eq!(level_up.levels_gained(), 3);
    assert!(level_up.is_multi_level());

    assert!(notifier.observe(&env.level()).is_none());
}

#[test]
fn test_notifier_silent_on_level_loss_then_fires_on_regain() {
    let mut env = TestEnv::new();
    let quest = env.complete_quest("Marathon", 250);

    let mut notifier = LevelUpNotifier::new();
    notifier.observe(&env.level());

    env.store.set_complete(&quest.id, false).unwrap();
    assert!(notifier.observe(&env.level()).is_none());
    assert_eq!(notifier.previous_level(), Some(1));

    env.store.set_complete(&quest.id, true).unwrap();
    let level_up = notifier.observe(&env.level()).expect("expected a level up");
    assert_eq!((level_up.from, level_up.to), (1, 3));
}

#[test]
fn test_notifier_baseline_three_to_five() {
    let mut notifier = LevelUpNotifier::with_baseline(3);
    let level_up = notifier
        .observe(&leveling::calculate_level(leveling::xp_for_level(5) as i64))
        .expect("expected a level up");

    assert_eq!(level_up.levels_gained(), 2);
    assert_eq!(level_up.message(), "LEVEL UP! You reached Level 5!");
}
