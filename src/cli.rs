//! CLI argument parsing for questlog.

use clap::{Parser, Subcommand};
use questlog::Difficulty;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ql",
    about = "A gamified quest log: finish quests, earn XP, level up",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/questlog/logs/questlog.log"
)]
pub struct Cli {
    /// Path to the questlog store directory (default: current directory)
    #[arg(short = 'd', long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a new quest log in the current directory
    Init,

    /// Add a new quest
    Add {
        /// Quest title
        title: String,

        /// What the quest involves (defaults to the title)
        #[arg(short, long)]
        content: Option<String>,

        /// Difficulty (easy, medium, hard, expert, legendary)
        #[arg(short = 'D', long, default_value = "easy")]
        difficulty: Difficulty,

        /// XP reward (1-1000)
        #[arg(short = 'x', long = "xp", default_value_t = 50)]
        reward_xp: i64,

        /// Record the quest as already completed
        #[arg(long)]
        done: bool,
    },

    /// List quests, newest first
    List {
        /// Only completed quests
        #[arg(long, conflicts_with = "pending")]
        done: bool,

        /// Only quests still in progress
        #[arg(long)]
        pending: bool,

        /// Filter by difficulty
        #[arg(short = 'D', long)]
        difficulty: Option<Difficulty>,

        /// Filter by title substring
        #[arg(short, long)]
        search: Option<String>,

        /// Maximum number of quests to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show a quest by ID
    Get {
        /// Quest ID
        id: String,
    },

    /// Change some fields of a quest; omitted fields stay as they are
    Edit {
        /// Quest ID
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        content: Option<String>,

        #[arg(short = 'D', long)]
        difficulty: Option<Difficulty>,

        #[arg(short = 'x', long = "xp")]
        reward_xp: Option<i64>,

        /// Completion flag (true/false)
        #[arg(long)]
        complete: Option<bool>,
    },

    /// Mark a quest complete
    Done {
        /// Quest ID
        id: String,
    },

    /// Mark a quest incomplete again
    Undo {
        /// Quest ID
        id: String,
    },

    /// Flip a quest between complete and incomplete
    Toggle {
        /// Quest ID
        id: String,
    },

    /// Delete a quest
    Delete {
        /// Quest ID
        id: String,
    },

    /// Show current level and progress
    Level,

    /// Compact the quest log and reclaim database space
    Vacuum,

    /// Run the daemon in foreground
    Daemon,

    /// Stop the running daemon
    DaemonStop,

    /// Check daemon status
    DaemonStatus,
}
