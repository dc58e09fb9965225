//! IPC protocol types for daemon communication.

use crate::leveling::LevelSnapshot;
use crate::notifier::LevelUp;
use crate::types::{NewQuest, Quest, QuestPatch, QuestStats};
use serde::{Deserialize, Serialize};

/// Request sent from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Create a new quest.
    Create { quest: NewQuest },

    /// Partially update an existing quest.
    Update { id: String, patch: QuestPatch },

    /// Mark a quest complete or incomplete.
    SetComplete { id: String, complete: bool },

    /// Delete a quest.
    Delete { id: String },

    /// Get a quest by ID.
    Get { id: String },

    /// List quests, newest first.
    List { complete: Option<bool> },

    /// Current level and quest counters.
    Level,

    /// Shutdown the daemon.
    Shutdown,

    /// Ping to check if daemon is alive.
    Ping,
}

/// Response sent from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Single quest, with the level-up the change caused (if any).
    Quest {
        quest: Quest,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        level_up: Option<LevelUp>,
    },

    /// Multiple quests response.
    Quests { quests: Vec<Quest> },

    /// Quest removed.
    Deleted { quest: Quest },

    /// Level snapshot and counters.
    Level { level: LevelSnapshot, stats: QuestStats },

    /// Quest not found.
    NotFound { id: String },

    /// Operation succeeded.
    Ok,

    /// Pong response to ping.
    Pong,

    /// Error response.
    Error { message: String },
}

impl Response {
    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
