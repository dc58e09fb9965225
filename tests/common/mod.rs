//! Shared test infrastructure for questlog integration tests.
//!
//! Provides TestEnv helper for consistent test setup/teardown.

#![allow(dead_code)]

use questlog::{Difficulty, LevelSnapshot, NewQuest, Quest, Store};
use tempfile::TempDir;

/// Test environment with automatic cleanup.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub store: Store,
}

impl TestEnv {
    /// Create a new test environment with an initialized store.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Store::init(temp_dir.path()).expect("Failed to init store");
        Self { temp_dir, store }
    }

    /// Create an easy, incomplete quest with the given reward.
    pub fn create_quest(&mut self, title: &str, reward_xp: i64) -> Quest {
        self.store
            .create(NewQuest::new(title, title, Difficulty::Easy, reward_xp))
            .expect("Failed to create quest")
    }

    /// Create a quest with a specific difficulty.
    pub fn create_quest_with_difficulty(&mut self, title: &str, difficulty: Difficulty) -> Quest {
        self.store
            .create(NewQuest::new(title, title, difficulty, 50))
            .expect("Failed to create quest")
    }

    /// Create a quest and immediately complete it.
    pub fn complete_quest(&mut self, title: &str, reward_xp: i64) -> Quest {
        let quest = self.create_quest(title, reward_xp);
        self.store
            .set_complete(&quest.id, true)
            .expect("Failed to complete quest")
    }

    /// Reopen a store on the same directory, forcing a fresh connection.
    pub fn reopen(&mut self) {
        self.store = Store::open(self.temp_dir.path()).expect("Failed to reopen store");
    }

    pub fn level(&self) -> LevelSnapshot {
        self.store.level().expect("Failed to compute level")
    }

    pub fn total_count(&self) -> usize {
        self.store.list(None).expect("Failed to list quests").len()
    }

    pub fn completed_count(&self) -> usize {
        self.store.list(Some(true)).expect("Failed to list quests").len()
    }

    /// Assert the store is at the given level.
    pub fn assert_level(&self, expected: u32) {
        let level = self.level();
        assert_eq!(
            level.level, expected,
            "Expected level {} but got {} at {} XP",
            expected, level.level, level.total_xp
        );
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
