//! Core data types for the quest log.

use crate::leveling::XpSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Smallest reward a quest may carry.
pub const MIN_REWARD_XP: i64 = 1;

/// Largest reward a quest may carry.
pub const MAX_REWARD_XP: i64 = 1000;

/// Longest allowed title, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// A to-do item with a reward attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quest {
    /// Unique identifier: "qst-" + 10 hex chars
    pub id: String,

    /// Short name of the quest
    pub title: String,

    /// What needs doing
    pub content: String,

    /// Display-only categorization
    pub difficulty: Difficulty,

    /// XP granted once complete
    pub reward_xp: i64,

    pub complete: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Quest difficulty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
    Expert,
    Legendary,
}

impl Difficulty {
    pub const ALL: [Difficulty; 5] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
        Difficulty::Legendary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Expert => "Expert",
            Difficulty::Legendary => "Legendary",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::InvalidDifficulty(s.to_string()))
    }
}

/// Input for creating a quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQuest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub reward_xp: i64,
    #[serde(default)]
    pub complete: bool,
}

impl NewQuest {
    pub fn new(title: impl Into<String>, content: impl Into<String>, difficulty: Difficulty, reward_xp: i64) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            difficulty,
            reward_xp,
            complete: false,
        }
    }
}

/// Partial update: only fields that are `Some` are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_xp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete: Option<bool>,
}

impl QuestPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn reward_xp(mut self, reward_xp: i64) -> Self {
        self.reward_xp = Some(reward_xp);
        self
    }

    pub fn complete(mut self, complete: bool) -> Self {
        self.complete = Some(complete);
        self
    }

    /// True if no field would change.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.difficulty.is_none()
            && self.reward_xp.is_none()
            && self.complete.is_none()
    }

    /// Apply the supplied fields onto a quest.
    pub fn apply(self, quest: Quest, now: DateTime<Utc>) -> Quest {
        Quest {
            title: self.title.unwrap_or(quest.title),
            content: self.content.unwrap_or(quest.content),
            difficulty: self.difficulty.unwrap_or(quest.difficulty),
            reward_xp: self.reward_xp.unwrap_or(quest.reward_xp),
            complete: self.complete.unwrap_or(quest.complete),
            updated_at: now,
            ..quest
        }
    }
}

/// Filter for listing quests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestFilter {
    pub complete: Option<bool>,
    pub difficulty: Option<Difficulty>,
    pub title_contains: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl QuestFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn complete(mut self, complete: bool) -> Self {
        self.complete = Some(complete);
        self
    }

    pub fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn title_contains(mut self, substring: impl Into<String>) -> Self {
        self.title_contains = Some(substring.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Counters shown next to the level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestStats {
    pub total: usize,
    pub completed: usize,
    pub total_xp: i64,
}

/// Deletion marker appended to the quest log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tombstone {
    pub id: String,
    pub deleted_at: DateTime<Utc>,
}

/// Validation errors for quests.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyTitle,
    TitleTooLong,
    InvalidCharacters,
    EmptyContent,
    RewardOutOfRange(i64),
    InvalidDifficulty(String),
    InvalidTimestamp,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyTitle => write!(f, "title cannot be empty"),
            ValidationError::TitleTooLong => write!(f, "title exceeds {} characters", MAX_TITLE_LEN),
            ValidationError::InvalidCharacters => write!(f, "title contains control characters"),
            ValidationError::EmptyContent => write!(f, "content cannot be empty"),
            ValidationError::RewardOutOfRange(xp) => {
                write!(
                    f,
                    "reward XP must be between {} and {}, got {}",
                    MIN_REWARD_XP, MAX_REWARD_XP, xp
                )
            }
            ValidationError::InvalidDifficulty(d) => {
                write!(
                    f,
                    "invalid difficulty '{}': expected one of Easy, Medium, Hard, Expert, Legendary",
                    d
                )
            }
            ValidationError::InvalidTimestamp => write!(f, "updated_at cannot be before created_at"),
        }
    }
}

impl std::error::Error for ValidationError {}

impl Quest {
    /// Validate the quest's fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.title.chars().count() > MAX_TITLE_LEN {
            return Err(ValidationError::TitleTooLong);
        }
        if self.title.chars().any(|c| c.is_control()) {
            return Err(ValidationError::InvalidCharacters);
        }

        if self.content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }

        if !(MIN_REWARD_XP..=MAX_REWARD_XP).contains(&self.reward_xp) {
            return Err(ValidationError::RewardOutOfRange(self.reward_xp));
        }

        if self.updated_at < self.created_at {
            return Err(ValidationError::InvalidTimestamp);
        }

        Ok(())
    }
}

impl XpSource for Quest {
    fn is_complete(&self) -> bool {
        self.complete
    }

    fn reward_xp(&self) -> Option<i64> {
        Some(self.reward_xp)
    }
}
