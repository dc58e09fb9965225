//! High-level store API for the quest log.

use crate::config::QuestlogConfig;
use crate::id::generate_id;
use crate::leveling::{self, LevelCurve, LevelSnapshot};
use crate::storage::Storage;
use crate::types::{NewQuest, Quest, QuestFilter, QuestPatch, QuestStats, Tombstone, ValidationError};
use chrono::Utc;
use eyre::{Context, Result};
use std::path::Path;

/// Errors that can occur during store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Quest not found.
    QuestNotFound(String),
    /// Validation error.
    Validation(ValidationError),
}

impl StoreError {
    /// Find a `StoreError` inside a report, if one is there.
    pub fn from_report(report: &eyre::Report) -> Option<&StoreError> {
        report.downcast_ref::<StoreError>()
    }

    /// True if the report was caused by a missing quest.
    pub fn is_not_found(report: &eyre::Report) -> bool {
        matches!(Self::from_report(report), Some(StoreError::QuestNotFound(_)))
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::QuestNotFound(id) => write!(f, "quest not found: {}", id),
            StoreError::Validation(e) => write!(f, "validation error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

/// The quest store.
pub struct Store {
    storage: Storage,
    curve: LevelCurve,
}

impl Store {
    /// Initialize a new store in the given directory.
    pub fn init(root: &Path) -> Result<Self> {
        let storage = Storage::init(root)?;
        let config = QuestlogConfig::load(root)?;
        Ok(Self {
            storage,
            curve: LevelCurve::new(config.leveling),
        })
    }

    /// Open an existing store.
    pub fn open(root: &Path) -> Result<Self> {
        let storage = Storage::open(root)?;
        let config = QuestlogConfig::load(root)?;
        Ok(Self {
            storage,
            curve: LevelCurve::new(config.leveling),
        })
    }

    pub(crate) fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn root(&self) -> &Path {
        self.storage.root()
    }

    /// The XP curve this store levels on.
    pub fn curve(&self) -> &LevelCurve {
        &self.curve
    }

    /// Create a new quest.
    pub fn create(&mut self, new: NewQuest) -> Result<Quest> {
        let now = Utc::now();
        let id = generate_id(&new.title, now);

        let quest = Quest {
            id,
            title: new.title,
            content: new.content,
            difficulty: new.difficulty,
            reward_xp: new.reward_xp,
            complete: new.complete,
            created_at: now,
            updated_at: now,
        };

        quest.validate().map_err(|e| eyre::eyre!(StoreError::Validation(e)))?;

        self.storage.append_quest(&quest).context("Failed to persist quest")?;
        log::info!("Created quest {} ({} XP)", quest.id, quest.reward_xp);

        Ok(quest)
    }

    /// Get a quest by ID.
    pub fn get(&self, id: &str) -> Result<Option<Quest>> {
        self.storage.get_quest(id)
    }

    fn require(&self, id: &str) -> Result<Quest> {
        self.storage
            .get_quest(id)?
            .ok_or_else(|| eyre::eyre!(StoreError::QuestNotFound(id.to_string())))
    }

    /// Apply a partial update. Fields absent from the patch keep their values.
    pub fn update(&mut self, id: &str, patch: QuestPatch) -> Result<Quest> {
        let existing = self.require(id)?;
        let updated = patch.apply(existing, Utc::now());

        updated.validate().map_err(|e| eyre::eyre!(StoreError::Validation(e)))?;

        self.storage
            .append_quest(&updated)
            .context("Failed to persist updated quest")?;

        Ok(updated)
    }

    /// Mark a quest complete or incomplete.
    pub fn set_complete(&mut self, id: &str, complete: bool) -> Result<Quest> {
        let existing = self.require(id)?;
        if existing.complete == complete {
            return Ok(existing);
        }

        let updated = Quest {
            complete,
            updated_at: Utc::now(),
            ..existing
        };

        self.storage
            .append_quest(&updated)
            .context("Failed to persist completion change")?;
        log::info!(
            "Quest {} marked {}",
            updated.id,
            if complete { "complete" } else { "incomplete" }
        );

        Ok(updated)
    }

    /// Flip a quest's completion flag.
    pub fn toggle(&mut self, id: &str) -> Result<Quest> {
        let existing = self.require(id)?;
        self.set_complete(id, !existing.complete)
    }

    /// Delete a quest, returning its last state.
    pub fn delete(&mut self, id: &str) -> Result<Quest> {
        let existing = self.require(id)?;

        let tombstone = Tombstone {
            id: existing.id.clone(),
            deleted_at: Utc::now(),
        };
        self.storage
            .append_tombstone(&tombstone)
            .context("Failed to persist deletion")?;
        log::info!("Deleted quest {}", existing.id);

        Ok(existing)
    }

    /// List quests newest first, optionally only complete or incomplete ones.
    pub fn list(&self, complete: Option<bool>) -> Result<Vec<Quest>> {
        let filter = QuestFilter {
            complete,
            ..QuestFilter::default()
        };
        self.storage.query_quests(&filter)
    }

    /// XP earned from completed quests.
    pub fn total_xp(&self) -> Result<i64> {
        let completed = self.list(Some(true))?;
        Ok(leveling::total_xp(&completed))
    }

    /// Current level derived from completed quests.
    pub fn level(&self) -> Result<LevelSnapshot> {
        Ok(self.curve.snapshot(self.total_xp()?))
    }

    /// Quest counters plus earned XP.
    pub fn stats(&self) -> Result<QuestStats> {
        let quests = self.list(None)?;
        Ok(QuestStats {
            total: quests.len(),
            completed: quests.iter().filter(|q| q.complete).count(),
            total_xp: leveling::total_xp(&quests),
        })
    }
}
