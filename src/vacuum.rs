//! Vacuum operations for store maintenance.
//!
//! Vacuum rebuilds the SQLite cache from the quest log, rewrites the log so
//! edit history and deleted quests are dropped, and runs SQLite's built-in
//! vacuum to reclaim space.

use crate::storage::{DB_FILE, QUESTLOG_DIR, Storage};
use eyre::{Context, Result};
use std::path::Path;

/// Result of a vacuum operation.
#[derive(Debug)]
pub struct VacuumResult {
    /// Size of database before vacuum (bytes).
    pub size_before: u64,
    /// Size of database after vacuum (bytes).
    pub size_after: u64,
    /// Number of quests in the store.
    pub quest_count: usize,
}

/// Vacuum the quest store at the given path.
pub fn vacuum(root: &Path) -> Result<VacuumResult> {
    let db_path = root.join(QUESTLOG_DIR).join(DB_FILE);
    let size_before = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let mut storage = Storage::open(root).context("Failed to open storage for vacuum")?;
    storage.rebuild_from_jsonl().context("Failed to rebuild cache")?;
    let quest_count = storage.compact_log().context("Failed to compact quest log")?;
    storage.vacuum().context("Failed to run SQLite vacuum")?;

    let size_after = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
    log::info!(
        "Vacuumed {}: {} quests, {} -> {} bytes",
        root.display(),
        quest_count,
        size_before,
        size_after
    );

    Ok(VacuumResult {
        size_before,
        size_after,
        quest_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;
    use crate::types::{Difficulty, NewQuest};
    use tempfile::TempDir;

    #[test]
    fn test_vacuum_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        Store::init(temp_dir.path()).unwrap();

        let result = vacuum(temp_dir.path()).unwrap();
        assert_eq!(result.quest_count, 0);
    }

    #[test]
    fn test_vacuum_keeps_live_quests() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::init(temp_dir.path()).unwrap();

        let keep = store
            .create(NewQuest::new("Keep", "Stays", Difficulty::Easy, 10))
            .unwrap();
        store.set_complete(&keep.id, true).unwrap();
        let gone = store
            .create(NewQuest::new("Gone", "Deleted", Difficulty::Easy, 10))
            .unwrap();
        store.delete(&gone.id).unwrap();

        drop(store);

        let result = vacuum(temp_dir.path()).unwrap();
        assert_eq!(result.quest_count, 1);

        let store = Store::open(temp_dir.path()).unwrap();
        assert!(store.get(&keep.id).unwrap().unwrap().complete);
        assert!(store.get(&gone.id).unwrap().is_none());
    }
}
