//! Questlog: a gamified to-do list with XP leveling.
//!
//! Quests carry an XP reward; completing them accumulates experience, and the
//! [`leveling`] engine turns the total into a level on a geometric curve.
//! Quests are persisted as an append-only JSONL log with a SQLite cache.
//!
//! # Example
//!
//! ```no_run
//! use questlog::{Difficulty, LevelUpNotifier, NewQuest, Store};
//! use std::path::Path;
//!
//! let mut store = Store::init(Path::new(".")).unwrap();
//! let mut notifier = LevelUpNotifier::new();
//! notifier.observe(&store.level().unwrap());
//!
//! let quest = store
//!     .create(NewQuest::new("Run 5k", "Around the park", Difficulty::Hard, 120))
//!     .unwrap();
//! store.set_complete(&quest.id, true).unwrap();
//!
//! let level = store.level().unwrap();
//! assert_eq!(level.level, 2);
//! if let Some(level_up) = notifier.observe(&level) {
//!     println!("{}", level_up.message());
//! }
//! ```

mod builder;
mod config;
mod id;
mod query;
mod storage;
mod store;
mod types;

pub mod client;
pub mod daemon;
pub mod leveling;
pub mod notifier;
pub mod protocol;
pub mod vacuum;

// Re-export public API
pub use builder::{QuestBuilder, StoreBuilderExt};
pub use client::Client;
pub use config::QuestlogConfig;
pub use daemon::{Daemon, DaemonConfig, is_daemon_running, start_daemon};
pub use leveling::{LevelConfig, LevelCurve, LevelSnapshot, Tier, XpSource};
pub use notifier::{LevelUp, LevelUpNotifier};
pub use protocol::{Request, Response};
pub use query::{Query, StoreQueryExt};
pub use store::{Store, StoreError};
pub use types::{Difficulty, NewQuest, Quest, QuestFilter, QuestPatch, QuestStats, ValidationError};
