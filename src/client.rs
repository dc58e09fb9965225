//! Client for connecting to the questlog daemon.

use crate::daemon::{DaemonConfig, is_daemon_running, start_daemon};
use crate::leveling::LevelSnapshot;
use crate::notifier::LevelUp;
use crate::protocol::{Request, Response};
use crate::store::StoreError;
use crate::types::{NewQuest, Quest, QuestPatch, QuestStats};
use eyre::{Context, Result, bail};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Connection attempts after spawning a daemon, 50ms apart.
const STARTUP_ATTEMPTS: u32 = 20;

/// How long to wait for any single response.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for communicating with the questlog daemon.
pub struct Client {
    root: PathBuf,
    stream: UnixStream,
}

/// Turn a response the caller did not ask for into an error.
fn unexpected(response: Response) -> eyre::Report {
    match response {
        Response::NotFound { id } => eyre::eyre!(StoreError::QuestNotFound(id)),
        Response::Error { message } => eyre::eyre!(message),
        other => eyre::eyre!("Unexpected daemon response: {:?}", other),
    }
}

/// Spawn a daemon and wait for its socket to accept connections.
fn spawn_and_connect(root: &Path, socket_path: &Path) -> Result<UnixStream> {
    start_daemon(root).context("Failed to auto-start daemon")?;

    for _ in 0..STARTUP_ATTEMPTS {
        std::thread::sleep(Duration::from_millis(50));
        if let Ok(stream) = UnixStream::connect(socket_path) {
            return Ok(stream);
        }
    }
    bail!("Daemon failed to start in time")
}

impl Client {
    /// Connect to the daemon, optionally auto-starting it if not running.
    pub fn connect(root: &Path, auto_start: bool) -> Result<Self> {
        let socket_path = DaemonConfig::new(root).socket_path();

        let stream = match UnixStream::connect(&socket_path) {
            Ok(stream) => stream,
            Err(_) if auto_start && !is_daemon_running(root) => spawn_and_connect(root, &socket_path)?,
            Err(_) if auto_start => UnixStream::connect(&socket_path).context("Failed to connect to daemon")?,
            Err(e) => bail!("Failed to connect to daemon: {}. Is it running?", e),
        };

        stream
            .set_read_timeout(Some(READ_TIMEOUT))
            .context("Failed to set read timeout")?;
        log::debug!("Connected to daemon at {}", socket_path.display());

        Ok(Self {
            root: root.to_path_buf(),
            stream,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write one request line and read one response line.
    fn request(&mut self, request: Request) -> Result<Response> {
        let line = serde_json::to_string(&request).context("Failed to encode request")?;
        writeln!(self.stream, "{}", line).context("Failed to send request")?;
        self.stream.flush()?;

        let mut reply = String::new();
        BufReader::new(&self.stream)
            .read_line(&mut reply)
            .context("Failed to read daemon response")?;
        if reply.is_empty() {
            bail!("Daemon closed the connection");
        }

        serde_json::from_str(&reply).context("Malformed daemon response")
    }

    /// Send a mutation expecting a quest back.
    fn quest_request(&mut self, request: Request) -> Result<(Quest, Option<LevelUp>)> {
        match self.request(request)? {
            Response::Quest { quest, level_up } => Ok((quest, level_up)),
            other => Err(unexpected(other)),
        }
    }

    /// Create a new quest.
    pub fn create(&mut self, quest: NewQuest) -> Result<(Quest, Option<LevelUp>)> {
        self.quest_request(Request::Create { quest })
    }

    /// Partially update a quest.
    pub fn update(&mut self, id: &str, patch: QuestPatch) -> Result<(Quest, Option<LevelUp>)> {
        self.quest_request(Request::Update {
            id: id.to_string(),
            patch,
        })
    }

    /// Mark a quest complete or incomplete.
    pub fn set_complete(&mut self, id: &str, complete: bool) -> Result<(Quest, Option<LevelUp>)> {
        self.quest_request(Request::SetComplete {
            id: id.to_string(),
            complete,
        })
    }

    pub fn delete(&mut self, id: &str) -> Result<Quest> {
        match self.request(Request::Delete { id: id.to_string() })? {
            Response::Deleted { quest } => Ok(quest),
            other => Err(unexpected(other)),
        }
    }

    /// Get a quest by ID; a missing quest is `Ok(None)`.
    pub fn get(&mut self, id: &str) -> Result<Option<Quest>> {
        match self.request(Request::Get { id: id.to_string() })? {
            Response::Quest { quest, .. } => Ok(Some(quest)),
            Response::NotFound { .. } => Ok(None),
            other => Err(unexpected(other)),
        }
    }

    /// List quests, newest first.
    pub fn list(&mut self, complete: Option<bool>) -> Result<Vec<Quest>> {
        match self.request(Request::List { complete })? {
            Response::Quests { quests } => Ok(quests),
            other => Err(unexpected(other)),
        }
    }

    /// Current level and quest counters.
    pub fn level(&mut self) -> Result<(LevelSnapshot, QuestStats)> {
        match self.request(Request::Level)? {
            Response::Level { level, stats } => Ok((level, stats)),
            other => Err(unexpected(other)),
        }
    }

    pub fn shutdown(&mut self) -> Result<()> {
        match self.request(Request::Shutdown)? {
            Response::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub fn ping(&mut self) -> Result<()> {
        match self.request(Request::Ping)? {
            Response::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_not_found_is_store_error() {
        let report = unexpected(Response::NotFound {
            id: "qst-0000000000".to_string(),
        });
        assert!(StoreError::is_not_found(&report));
    }

    #[test]
    fn test_unexpected_error_keeps_message() {
        let report = unexpected(Response::error("disk full"));
        assert_eq!(report.to_string(), "disk full");
        assert!(!StoreError::is_not_found(&report));
    }

    #[test]
    fn test_connect_without_daemon_fails() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        assert!(Client::connect(temp_dir.path(), false).is_err());
    }
}
