//! Query API with flexible filtering.

use crate::storage::Storage;
use crate::store::Store;
use crate::types::{Difficulty, Quest, QuestFilter};
use eyre::Result;

/// Query builder for fluent queries.
pub struct Query<'a> {
    storage: &'a Storage,
    filter: QuestFilter,
}

impl<'a> Query<'a> {
    pub(crate) fn new(storage: &'a Storage) -> Self {
        Self {
            storage,
            filter: QuestFilter::new(),
        }
    }

    /// Only complete (`true`) or incomplete (`false`) quests.
    pub fn complete(mut self, complete: bool) -> Self {
        self.filter = self.filter.complete(complete);
        self
    }

    pub fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.filter = self.filter.difficulty(difficulty);
        self
    }

    /// Case-insensitive title substring match.
    pub fn title_contains(mut self, substring: impl Into<String>) -> Self {
        self.filter = self.filter.title_contains(substring);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.filter = self.filter.limit(limit);
        self
    }

    /// Skip first N results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.filter = self.filter.offset(offset);
        self
    }

    /// Execute the query and return matching quests, newest first.
    pub fn execute(self) -> Result<Vec<Quest>> {
        self.storage.query_quests(&self.filter)
    }

    /// Count matching quests without fetching them.
    pub fn count(self) -> Result<usize> {
        self.storage.count_quests(&self.filter)
    }
}

/// Extension trait to add query method to Store.
pub trait StoreQueryExt {
    /// Start building a query.
    fn query(&self) -> Query<'_>;

    /// Query with a pre-built filter.
    fn query_with_filter(&self, filter: &QuestFilter) -> Result<Vec<Quest>>;
}

impl StoreQueryExt for Store {
    fn query(&self) -> Query<'_> {
        Query::new(self.storage())
    }

    fn query_with_filter(&self, filter: &QuestFilter) -> Result<Vec<Quest>> {
        self.storage().query_quests(filter)
    }
}
