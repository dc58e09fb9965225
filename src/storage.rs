//! Storage layer for the quest log: JSONL file + SQLite cache.

use crate::types::{Difficulty, Quest, QuestFilter, Tombstone};
use chrono::{DateTime, SecondsFormat, Utc};
use eyre::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Storage directory name.
pub const QUESTLOG_DIR: &str = ".questlog";

/// JSONL file for quests.
const QUESTS_FILE: &str = "quests.jsonl";

/// SQLite database file.
pub const DB_FILE: &str = "questlog.db";

const QUEST_COLUMNS: &str = "id, title, content, difficulty, reward_xp, complete, created_at, updated_at";

/// One line of the quest log.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum LogEntry {
    Quest(Quest),
    Tombstone(Tombstone),
}

/// Storage handle for reading/writing quest data.
pub struct Storage {
    root: PathBuf,
    db: Connection,
}

impl Storage {
    /// Initialize storage in the given directory.
    pub fn init(root: &Path) -> Result<Self> {
        let questlog_dir = root.join(QUESTLOG_DIR);
        fs::create_dir_all(&questlog_dir).context("Failed to create .questlog directory")?;

        let quests_path = questlog_dir.join(QUESTS_FILE);
        if !quests_path.exists() {
            File::create(&quests_path).context("Failed to create quests.jsonl")?;
        }

        let db_path = questlog_dir.join(DB_FILE);
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;

        let mut storage = Self {
            root: root.to_path_buf(),
            db,
        };

        storage.init_schema()?;
        storage.rebuild_from_jsonl()?;

        Ok(storage)
    }

    /// Open existing storage.
    pub fn open(root: &Path) -> Result<Self> {
        let questlog_dir = root.join(QUESTLOG_DIR);
        if !questlog_dir.exists() {
            eyre::bail!("No .questlog directory found. Run 'ql init' first.");
        }

        let db_path = questlog_dir.join(DB_FILE);
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;

        let mut storage = Self {
            root: root.to_path_buf(),
            db,
        };

        storage.init_schema()?;

        if storage.needs_rebuild()? {
            log::info!("Quest cache out of date, rebuilding from {}", QUESTS_FILE);
            storage.rebuild_from_jsonl()?;
        }

        Ok(storage)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn quests_path(&self) -> PathBuf {
        self.root.join(QUESTLOG_DIR).join(QUESTS_FILE)
    }

    /// Initialize SQLite schema.
    fn init_schema(&self) -> Result<()> {
        self.db
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS quests (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    content TEXT NOT NULL,
                    difficulty TEXT NOT NULL CHECK (difficulty IN ('Easy', 'Medium', 'Hard', 'Expert', 'Legendary')),
                    reward_xp INTEGER NOT NULL,
                    complete INTEGER NOT NULL CHECK (complete IN (0, 1)),
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_quests_created ON quests(created_at);
                CREATE INDEX IF NOT EXISTS idx_quests_complete ON quests(complete);

                CREATE TABLE IF NOT EXISTS meta (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );
            "#,
            )
            .context("Failed to initialize schema")?;

        Ok(())
    }

    /// Check if SQLite needs to be rebuilt from JSONL.
    fn needs_rebuild(&self) -> Result<bool> {
        let quests_lines = count_lines(&self.quests_path())?;

        let stored_lines: i64 = self
            .db
            .query_row(
                "SELECT COALESCE((SELECT value FROM meta WHERE key = 'jsonl_quests_lines'), '0')",
                [],
                |row| row.get::<_, String>(0),
            )
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        Ok(quests_lines as i64 != stored_lines)
    }

    /// Read the quest log, returning live quests (last line per id wins) and the line count.
    fn read_log(&self) -> Result<(HashMap<String, Quest>, usize)> {
        let quests_path = self.quests_path();
        let mut quests: HashMap<String, Quest> = HashMap::new();
        let mut line_count = 0;

        if !quests_path.exists() {
            return Ok((quests, line_count));
        }

        let file = File::open(&quests_path).context("Failed to open quests.jsonl")?;
        let reader = BufReader::new(file);

        for line in reader.lines() {
            line_count += 1;
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    log::warn!("Failed to read line {}: {}", line_count, e);
                    continue;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<LogEntry>(&line) {
                Ok(LogEntry::Quest(quest)) => {
                    quests.insert(quest.id.clone(), quest);
                }
                Ok(LogEntry::Tombstone(tombstone)) => {
                    quests.remove(&tombstone.id);
                }
                Err(e) => {
                    log::warn!("Failed to parse quest at line {}: {}", line_count, e);
                }
            }
        }

        Ok((quests, line_count))
    }

    /// Rebuild SQLite cache from the JSONL file.
    pub fn rebuild_from_jsonl(&mut self) -> Result<()> {
        self.db
            .execute_batch("DELETE FROM quests;")
            .context("Failed to clear tables")?;

        let (quests, line_count) = self.read_log()?;

        for quest in quests.values() {
            self.insert_quest_to_db(quest)?;
        }

        self.set_line_count(line_count)?;
        log::debug!("Rebuilt cache with {} quests from {} lines", quests.len(), line_count);

        Ok(())
    }

    fn set_line_count(&self, lines: usize) -> Result<()> {
        self.db.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('jsonl_quests_lines', ?)",
            params![lines.to_string()],
        )?;
        Ok(())
    }

    fn bump_line_count(&self) -> Result<()> {
        self.db.execute(
            "UPDATE meta SET value = CAST(CAST(value AS INTEGER) + 1 AS TEXT) WHERE key = 'jsonl_quests_lines'",
            [],
        )?;
        Ok(())
    }

    /// Insert a quest into SQLite.
    fn insert_quest_to_db(&self, quest: &Quest) -> Result<()> {
        self.db.execute(
            r#"
            INSERT OR REPLACE INTO quests (id, title, content, difficulty, reward_xp, complete, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                quest.id,
                quest.title,
                quest.content,
                quest.difficulty.as_str(),
                quest.reward_xp,
                quest.complete,
                format_timestamp(&quest.created_at),
                format_timestamp(&quest.updated_at),
            ],
        )?;

        Ok(())
    }

    /// Append a line to the JSONL file.
    fn append_line(&self, entry: &LogEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.quests_path())
            .context("Failed to open quests.jsonl for append")?;

        let json = serde_json::to_string(entry).context("Failed to serialize quest")?;
        writeln!(file, "{}", json).context("Failed to write to quests.jsonl")?;
        file.sync_all().context("Failed to sync quests.jsonl")?;

        Ok(())
    }

    /// Append a quest version to the JSONL file.
    pub fn append_quest(&mut self, quest: &Quest) -> Result<()> {
        self.append_line(&LogEntry::Quest(quest.clone()))?;
        self.insert_quest_to_db(quest)?;
        self.bump_line_count()?;
        Ok(())
    }

    /// Append a deletion marker and drop the quest from the cache.
    pub fn append_tombstone(&mut self, tombstone: &Tombstone) -> Result<()> {
        self.append_line(&LogEntry::Tombstone(tombstone.clone()))?;
        self.db
            .execute("DELETE FROM quests WHERE id = ?", params![tombstone.id])?;
        self.bump_line_count()?;
        Ok(())
    }

    /// Get a quest by ID.
    pub fn get_quest(&self, id: &str) -> Result<Option<Quest>> {
        let sql = format!("SELECT {} FROM quests WHERE id = ?", QUEST_COLUMNS);
        let mut stmt = self.db.prepare(&sql)?;
        let quest = stmt.query_row(params![id], Self::row_to_quest).optional()?;
        Ok(quest)
    }

    /// List quests matching a filter, newest first.
    pub fn query_quests(&self, filter: &QuestFilter) -> Result<Vec<Quest>> {
        let (where_sql, mut args) = where_clause(filter);
        let mut sql = format!(
            "SELECT {} FROM quests{} ORDER BY created_at DESC, id DESC",
            QUEST_COLUMNS, where_sql
        );

        // Title matching happens in Rust, so paging has to wait until after it
        let page_in_sql = filter.title_contains.is_none();
        if page_in_sql && (filter.limit.is_some() || filter.offset.is_some()) {
            sql.push_str(" LIMIT ? OFFSET ?");
            args.push(Value::Integer(filter.limit.map(|l| l as i64).unwrap_or(-1)));
            args.push(Value::Integer(filter.offset.unwrap_or(0) as i64));
        }

        let mut stmt = self.db.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args), Self::row_to_quest)?
            .filter_map(|r| r.ok());

        let quests: Vec<Quest> = match &filter.title_contains {
            Some(needle) => {
                let needle = needle.to_lowercase();
                rows.filter(|q| q.title.to_lowercase().contains(&needle))
                    .skip(filter.offset.unwrap_or(0))
                    .take(filter.limit.unwrap_or(usize::MAX))
                    .collect()
            }
            None => rows.collect(),
        };

        Ok(quests)
    }

    /// Count quests matching a filter (limit/offset ignored).
    pub fn count_quests(&self, filter: &QuestFilter) -> Result<usize> {
        if filter.title_contains.is_some() {
            let unpaged = QuestFilter {
                limit: None,
                offset: None,
                ..filter.clone()
            };
            return Ok(self.query_quests(&unpaged)?.len());
        }

        let (where_sql, args) = where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM quests{}", where_sql);
        let count: i64 = self.db.query_row(&sql, params_from_iter(args), |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Rewrite the JSONL file so it holds exactly one line per live quest.
    pub fn compact_log(&mut self) -> Result<usize> {
        let mut quests = self.query_quests(&QuestFilter::new())?;
        quests.reverse();

        let quests_path = self.quests_path();
        let tmp_path = quests_path.with_extension("jsonl.tmp");
        {
            let file = File::create(&tmp_path).context("Failed to create compacted quest log")?;
            let mut writer = BufWriter::new(file);
            for quest in &quests {
                let json = serde_json::to_string(quest).context("Failed to serialize quest")?;
                writeln!(writer, "{}", json).context("Failed to write compacted quest log")?;
            }
            writer.flush().context("Failed to flush compacted quest log")?;
            writer
                .get_ref()
                .sync_all()
                .context("Failed to sync compacted quest log")?;
        }
        fs::rename(&tmp_path, &quests_path).context("Failed to replace quests.jsonl")?;

        self.set_line_count(quests.len())?;
        Ok(quests.len())
    }

    /// Run SQLite VACUUM.
    pub fn vacuum(&self) -> Result<()> {
        self.db.execute_batch("VACUUM;").context("Failed to vacuum database")?;
        Ok(())
    }

    /// Convert a database row to a Quest.
    fn row_to_quest(row: &rusqlite::Row) -> rusqlite::Result<Quest> {
        let difficulty_str: String = row.get(3)?;
        let created_at_str: String = row.get(6)?;
        let updated_at_str: String = row.get(7)?;

        Ok(Quest {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            difficulty: difficulty_str.parse::<Difficulty>().unwrap_or_default(),
            reward_xp: row.get(4)?,
            complete: row.get(5)?,
            created_at: parse_timestamp(&created_at_str),
            updated_at: parse_timestamp(&updated_at_str),
        })
    }
}

/// Build the WHERE clause and its bound values for a filter.
fn where_clause(filter: &QuestFilter) -> (String, Vec<Value>) {
    let mut conditions: Vec<&str> = Vec::new();
    let mut args: Vec<Value> = Vec::new();

    if let Some(complete) = filter.complete {
        conditions.push("complete = ?");
        args.push(Value::Integer(complete as i64));
    }
    if let Some(difficulty) = filter.difficulty {
        conditions.push("difficulty = ?");
        args.push(Value::Text(difficulty.as_str().to_string()));
    }

    if conditions.is_empty() {
        (String::new(), args)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), args)
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Count lines in a file.
fn count_lines(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Ok(0);
    }
    let file = File::open(path).context("Failed to open file for line count")?;
    let reader = BufReader::new(file);
    Ok(reader.lines().count())
}
