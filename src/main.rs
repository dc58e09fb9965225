//! Questlog CLI - a gamified quest log with XP leveling.

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use questlog::{
    Client, Daemon, DaemonConfig, Difficulty, LevelSnapshot, LevelUp, LevelUpNotifier, NewQuest, Quest, QuestPatch,
    QuestStats, Store, StoreQueryExt, Tier, is_daemon_running, vacuum,
};
use std::fs;
use std::path::PathBuf;

mod cli;

use cli::{Cli, Command};

/// Width of the level progress bar in characters.
const PROGRESS_BAR_WIDTH: usize = 30;

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("questlog")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("questlog.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn get_store_dir(cli: &Cli) -> PathBuf {
    cli.dir
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn tier_color(tier: Tier) -> Color {
    match tier {
        Tier::Novice => Color::BrightBlack,
        Tier::Apprentice => Color::Green,
        Tier::Adventurer => Color::Blue,
        Tier::Explorer => Color::Magenta,
        Tier::Warrior => Color::Yellow,
        Tier::Guardian => Color::TrueColor { r: 251, g: 146, b: 60 },
        Tier::Champion => Color::Red,
        Tier::Hero => Color::BrightMagenta,
        Tier::Legend => Color::TrueColor { r: 129, g: 140, b: 248 },
        Tier::Mythic => Color::TrueColor { r: 251, g: 191, b: 36 },
    }
}

fn format_difficulty(difficulty: Difficulty) -> ColoredString {
    let label = difficulty.as_str();
    match difficulty {
        Difficulty::Easy => label.green(),
        Difficulty::Medium => label.yellow(),
        Difficulty::Hard => label.truecolor(251, 146, 60),
        Difficulty::Expert => label.red(),
        Difficulty::Legendary => label.magenta(),
    }
}

fn format_status(complete: bool) -> ColoredString {
    if complete { "done".green() } else { "todo".yellow() }
}

/// Group digits in thousands: 12345 -> "12,345".
fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn progress_bar(percentage: f64) -> String {
    let filled = ((percentage / 100.0) * PROGRESS_BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(PROGRESS_BAR_WIDTH);
    format!(
        "[{}{}]",
        "#".repeat(filled).cyan(),
        "-".repeat(PROGRESS_BAR_WIDTH - filled).dimmed()
    )
}

fn print_quest_line(quest: &Quest) {
    println!(
        "{} {} {} {} {}",
        format_status(quest.complete),
        quest.id.cyan(),
        format_difficulty(quest.difficulty),
        format!("{} XP", quest.reward_xp).bold(),
        quest.title
    );
}

fn print_level(level: &LevelSnapshot, stats: &QuestStats) {
    let tier = level.tier();
    let color = tier_color(tier);

    println!(
        "{} {}  {}",
        format!("Level {}", level.level).bold(),
        tier.title().color(color).bold(),
        format!("{} XP", group_digits(level.total_xp)).dimmed()
    );

    if level.is_max_level {
        println!("{}", "MAX LEVEL ACHIEVED!".truecolor(251, 191, 36).bold());
    } else {
        println!(
            "Progress to Level {}: {} / {} XP",
            level.level + 1,
            group_digits(level.xp_in_current_level),
            group_digits(level.xp_needed_for_next)
        );
        println!(
            "{} {}% complete",
            progress_bar(level.progress_percentage),
            level.progress_percentage.round()
        );
    }

    println!(
        "Completed quests: {}  Total quests: {}",
        stats.completed.to_string().cyan(),
        stats.total
    );
}

fn print_level_up(level_up: &LevelUp) {
    println!("{} {}", "★".yellow(), level_up.message().bold().magenta());
    if let Some(extra) = level_up.multi_level_message() {
        println!("{} {}", "🔥".red(), extra.bold());
    }
}

/// Run a mutation and announce any level gained by it.
fn with_level_watch<F>(store: &mut Store, mutate: F) -> Result<Quest>
where
    F: FnOnce(&mut Store) -> Result<Quest>,
{
    let mut notifier = LevelUpNotifier::with_curve(store.curve().clone());
    notifier.observe(&store.level().context("Failed to compute level")?);

    let quest = mutate(store)?;

    if let Some(level_up) = notifier.observe(&store.level().context("Failed to compute level")?) {
        print_level_up(&level_up);
    }
    Ok(quest)
}

fn run(cli: Cli) -> Result<()> {
    let store_dir = get_store_dir(&cli);

    match cli.command {
        Command::Init => {
            Store::init(&store_dir).context("Failed to initialize quest log")?;
            println!("{} Initialized quest log in {}", "✓".green(), store_dir.display());
        }

        Command::Add {
            title,
            content,
            difficulty,
            reward_xp,
            done,
        } => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let content = content.unwrap_or_else(|| title.clone());
            let new = NewQuest {
                complete: done,
                ..NewQuest::new(title, content, difficulty, reward_xp)
            };

            let quest = with_level_watch(&mut store, |s| s.create(new)).context("Failed to create quest")?;

            println!(
                "{} Created: {} {} ({} XP)",
                "✓".green(),
                quest.id.cyan(),
                quest.title,
                quest.reward_xp
            );
        }

        Command::List {
            done,
            pending,
            difficulty,
            search,
            limit,
        } => {
            let store = Store::open(&store_dir).context("Failed to open store")?;

            let mut query = store.query();
            if done {
                query = query.complete(true);
            } else if pending {
                query = query.complete(false);
            }
            if let Some(difficulty) = difficulty {
                query = query.difficulty(difficulty);
            }
            if let Some(search) = search {
                query = query.title_contains(search);
            }
            if let Some(limit) = limit {
                query = query.limit(limit);
            }

            let quests = query.execute().context("Failed to list quests")?;

            if quests.is_empty() {
                println!("{}", "No quests found".dimmed());
            } else {
                for quest in &quests {
                    print_quest_line(quest);
                }
            }
        }

        Command::Get { id } => {
            let store = Store::open(&store_dir).context("Failed to open store")?;
            let quest = store.get(&id).context("Failed to get quest")?;

            match quest {
                Some(quest) => {
                    println!("{}: {}", "ID".bold(), quest.id.cyan());
                    println!("{}: {}", "Title".bold(), quest.title);
                    println!("{}: {}", "Status".bold(), format_status(quest.complete));
                    println!("{}: {}", "Difficulty".bold(), format_difficulty(quest.difficulty));
                    println!("{}: {} XP", "Reward".bold(), quest.reward_xp);
                    println!("{}: {}", "Content".bold(), quest.content);
                    println!("{}: {}", "Created".bold(), quest.created_at);
                    println!("{}: {}", "Updated".bold(), quest.updated_at);
                }
                None => {
                    eprintln!("{} Quest not found: {}", "✗".red(), id);
                    std::process::exit(1);
                }
            }
        }

        Command::Edit {
            id,
            title,
            content,
            difficulty,
            reward_xp,
            complete,
        } => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let patch = QuestPatch {
                title,
                content,
                difficulty,
                reward_xp,
                complete,
            };
            if patch.is_empty() {
                println!("{}", "Nothing to change".dimmed());
                return Ok(());
            }

            let quest =
                with_level_watch(&mut store, |s| s.update(&id, patch)).context("Failed to update quest")?;
            println!("{} Updated: {} {}", "✓".green(), quest.id.cyan(), quest.title);
        }

        Command::Done { id } => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let quest = with_level_watch(&mut store, |s| s.set_complete(&id, true))
                .context("Failed to complete quest")?;
            println!(
                "{} Completed: {} {} (+{} XP)",
                "✓".green(),
                quest.id.cyan(),
                quest.title,
                quest.reward_xp
            );
        }

        Command::Undo { id } => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let quest = store.set_complete(&id, false).context("Failed to reopen quest")?;
            println!("{} Reopened: {} {}", "→".blue(), quest.id.cyan(), quest.title);
        }

        Command::Toggle { id } => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let quest = with_level_watch(&mut store, |s| s.toggle(&id)).context("Failed to toggle quest")?;
            println!(
                "{} {}: {} {}",
                "✓".green(),
                if quest.complete { "Completed" } else { "Reopened" },
                quest.id.cyan(),
                quest.title
            );
        }

        Command::Delete { id } => {
            let mut store = Store::open(&store_dir).context("Failed to open store")?;
            let quest = store.delete(&id).context("Failed to delete quest")?;
            println!("{} Deleted: {} {}", "✓".green(), quest.id.cyan(), quest.title);
        }

        Command::Level => {
            let store = Store::open(&store_dir).context("Failed to open store")?;
            let level = store.level().context("Failed to compute level")?;
            let stats = store.stats().context("Failed to count quests")?;
            print_level(&level, &stats);
        }

        Command::Vacuum => {
            let result = vacuum::vacuum(&store_dir).context("Failed to vacuum store")?;
            println!(
                "{} Vacuumed: {} quests, database {} -> {} bytes",
                "✓".green(),
                result.quest_count,
                group_digits(result.size_before),
                group_digits(result.size_after)
            );
        }

        Command::Daemon => {
            println!("{} Starting daemon for {}", "→".blue(), store_dir.display());

            let config = DaemonConfig::new(&store_dir);
            let mut daemon = Daemon::new(config).context("Failed to create daemon")?;

            let rt = tokio::runtime::Runtime::new().context("Failed to create runtime")?;
            rt.block_on(async { daemon.run().await }).context("Daemon error")?;
        }

        Command::DaemonStop => {
            if !is_daemon_running(&store_dir) {
                println!("{} Daemon is not running", "✗".red());
                std::process::exit(1);
            }

            let mut client = Client::connect(&store_dir, false).context("Failed to connect to daemon")?;
            client.shutdown().context("Failed to shutdown daemon")?;
            println!("{} Daemon stopped", "✓".green());
        }

        Command::DaemonStatus => {
            if is_daemon_running(&store_dir) {
                println!("{} Daemon is running", "✓".green());

                if let Ok(mut client) = Client::connect(&store_dir, false)
                    && client.ping().is_ok()
                {
                    println!("  {} Responding to requests", "✓".green());
                }
            } else {
                println!("{} Daemon is not running", "✗".red());
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    info!("Command: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1000), "1,000");
        assert_eq!(group_digits(1234567), "1,234,567");
    }

    #[test]
    fn test_progress_bar_width() {
        colored::control::set_override(false);
        assert_eq!(progress_bar(0.0), format!("[{}]", "-".repeat(PROGRESS_BAR_WIDTH)));
        assert_eq!(progress_bar(100.0), format!("[{}]", "#".repeat(PROGRESS_BAR_WIDTH)));
        assert_eq!(progress_bar(50.0).matches('#').count(), PROGRESS_BAR_WIDTH / 2);
    }

    #[test]
    fn test_tier_colors_follow_tags() {
        let expected = [
            (1, Color::BrightBlack),
            (11, Color::Green),
            (21, Color::Blue),
            (31, Color::Magenta),
            (41, Color::Yellow),
            (51, Color::TrueColor { r: 251, g: 146, b: 60 }),
            (61, Color::Red),
            (71, Color::BrightMagenta),
            (81, Color::TrueColor { r: 129, g: 140, b: 248 }),
            (91, Color::TrueColor { r: 251, g: 191, b: 36 }),
        ];
        for (level, color) in expected {
            assert_eq!(tier_color(Tier::from_level(level)), color, "level {}", level);
        }
    }
}
