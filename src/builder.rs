//! Builder pattern API for creating quests.

use crate::store::Store;
use crate::types::{Difficulty, NewQuest, Quest};
use eyre::{Context, Result};

/// Reward used when none is given.
pub const DEFAULT_REWARD_XP: i64 = 50;

/// Builder for creating quests with a fluent API.
///
/// # Example
///
/// ```ignore
/// let quest = store.build("Run 5k")
///     .content("Around the park, no walking")
///     .difficulty(Difficulty::Hard)
///     .reward(150)
///     .create()?;
/// ```
pub struct QuestBuilder<'a> {
    store: &'a mut Store,
    quest: NewQuest,
}

impl<'a> QuestBuilder<'a> {
    /// Create a new builder with the given title.
    ///
    /// Content defaults to the title itself.
    pub fn new(store: &'a mut Store, title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            store,
            quest: NewQuest::new(title.clone(), title, Difficulty::default(), DEFAULT_REWARD_XP),
        }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.quest.content = content.into();
        self
    }

    pub fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.quest.difficulty = difficulty;
        self
    }

    /// Set the XP reward.
    pub fn reward(mut self, reward_xp: i64) -> Self {
        self.quest.reward_xp = reward_xp;
        self
    }

    /// Create the quest already completed.
    pub fn completed(mut self) -> Self {
        self.quest.complete = true;
        self
    }

    /// Create the quest.
    pub fn create(self) -> Result<Quest> {
        self.store.create(self.quest).context("Failed to create quest")
    }
}

/// Extension trait to add builder method to Store.
pub trait StoreBuilderExt {
    /// Start building a new quest with the given title.
    fn build(&mut self, title: impl Into<String>) -> QuestBuilder<'_>;
}

impl StoreBuilderExt for Store {
    fn build(&mut self, title: impl Into<String>) -> QuestBuilder<'_> {
        QuestBuilder::new(self, title)
    }
}
