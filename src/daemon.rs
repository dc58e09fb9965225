//! Background daemon serving the quest store over a Unix socket.
//!
//! The daemon provides:
//! - One request loop, so socket clients are served strictly one at a time
//! - One level-up observation session spanning all clients
//! - Periodic shutdown polling
//!
//! It is not the only writer: `ql` commands open the store directly whether
//! or not a daemon is running. The daemon's cache only picks up those writes
//! when it is restarted.

use crate::notifier::{LevelUp, LevelUpNotifier};
use crate::protocol::{Request, Response};
use crate::storage::QUESTLOG_DIR;
use crate::store::{Store, StoreError};
use crate::types::Quest;
use eyre::{Context, Result};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Socket file name within the .questlog directory.
const SOCKET_FILE: &str = "daemon.sock";

/// PID file name within the .questlog directory.
const PID_FILE: &str = "daemon.pid";

/// A request paired with the channel its response goes back on.
type Envelope = (Request, mpsc::Sender<Response>);

/// Default interval between shutdown checks in milliseconds.
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Configuration for the daemon.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Root directory containing .questlog
    pub root: PathBuf,

    /// How often the event loop wakes up without traffic
    pub poll_interval: Duration,
}

impl DaemonConfig {
    /// Create config with default settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Get the socket path.
    pub fn socket_path(&self) -> PathBuf {
        self.root.join(QUESTLOG_DIR).join(SOCKET_FILE)
    }

    /// Get the PID file path.
    pub fn pid_path(&self) -> PathBuf {
        self.root.join(QUESTLOG_DIR).join(PID_FILE)
    }
}

/// The questlog daemon.
pub struct Daemon {
    config: DaemonConfig,
    store: Store,
    notifier: LevelUpNotifier,
    shutdown: Arc<AtomicBool>,
}

impl Daemon {
    /// Create a new daemon instance.
    ///
    /// The level at startup becomes the notifier's baseline.
    pub fn new(config: DaemonConfig) -> Result<Self> {
        let store = Store::open(&config.root).context("Failed to open store")?;

        let mut notifier = LevelUpNotifier::with_curve(store.curve().clone());
        let baseline = store.level().context("Failed to compute starting level")?;
        notifier.observe(&baseline);

        Ok(Self {
            config,
            store,
            notifier,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get a shutdown handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Remove any stale socket, record our pid, and bind a non-blocking listener.
    fn bind(&self) -> Result<UnixListener> {
        let socket_path = self.config.socket_path();
        if socket_path.exists() {
            fs::remove_file(&socket_path).ok();
        }

        fs::write(self.config.pid_path(), std::process::id().to_string()).context("Failed to write PID file")?;

        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("Failed to bind {}", socket_path.display()))?;
        listener
            .set_nonblocking(true)
            .context("Failed to set socket to non-blocking")?;

        log::info!("Daemon listening on {}", socket_path.display());
        Ok(listener)
    }

    /// Serve requests until a `Shutdown` request arrives.
    ///
    /// Requests from every connection are funnelled through one channel, so
    /// the store and the notifier only ever see one request at a time.
    pub async fn run(&mut self) -> Result<()> {
        let listener = self.bind()?;

        let (tx, mut rx) = mpsc::channel::<Envelope>(100);
        tokio::spawn(Self::accept_connections(listener, tx, self.shutdown_handle()));

        let mut poll = interval(self.config.poll_interval);

        while !self.shutdown.load(Ordering::Relaxed) {
            tokio::select! {
                Some((request, reply)) = rx.recv() => {
                    log::debug!("Request: {:?}", request);
                    let response = self.handle_request(request);
                    if reply.send(response).await.is_err() {
                        log::debug!("Client went away before the response was sent");
                    }
                }
                _ = poll.tick() => {}
            }
        }

        log::info!("Daemon shutting down");
        fs::remove_file(self.config.socket_path()).ok();
        fs::remove_file(self.config.pid_path()).ok();
        Ok(())
    }

    /// Accept clients until shutdown, one task per connection.
    async fn accept_connections(listener: UnixListener, tx: mpsc::Sender<Envelope>, shutdown: Arc<AtomicBool>) {
        while !shutdown.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, _)) => {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = Self::handle_connection(stream, tx).await {
                            log::warn!("Connection error: {:#}", e);
                        }
                    });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
                Err(e) => {
                    log::error!("Accept error: {}", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    /// Read JSON-lines requests from one client, answering each in turn.
    async fn handle_connection(stream: UnixStream, tx: mpsc::Sender<Envelope>) -> Result<()> {
        stream.set_nonblocking(false)?;
        let reader = BufReader::new(stream.try_clone()?);
        let mut writer = stream;

        for line in reader.lines() {
            let line = line.context("Failed to read request line")?;
            if line.trim().is_empty() {
                continue;
            }

            let request: Request = serde_json::from_str(&line).context("Failed to parse request")?;
            let closing = matches!(request, Request::Shutdown);

            let (reply_tx, mut reply_rx) = mpsc::channel(1);
            tx.send((request, reply_tx))
                .await
                .context("Daemon loop is no longer accepting requests")?;

            if let Some(response) = reply_rx.recv().await {
                writeln!(writer, "{}", serde_json::to_string(&response)?)?;
                writer.flush()?;
            }

            if closing {
                break;
            }
        }

        Ok(())
    }

    /// Recompute the level and report a level-up since the last observation.
    fn observe_level(&mut self) -> Option<LevelUp> {
        match self.store.level() {
            Ok(snapshot) => self.notifier.observe(&snapshot),
            Err(e) => {
                log::warn!("Failed to compute level: {}", e);
                None
            }
        }
    }

    /// Response for a mutation that produced a quest.
    fn quest_changed(&mut self, result: Result<Quest>, id: Option<&str>) -> Response {
        match result {
            Ok(quest) => {
                let level_up = self.observe_level();
                Response::Quest { quest, level_up }
            }
            Err(e) => error_response(e, id),
        }
    }

    /// Handle a single request.
    fn handle_request(&mut self, request: Request) -> Response {
        match request {
            Request::Create { quest } => {
                let result = self.store.create(quest);
                self.quest_changed(result, None)
            }

            Request::Update { id, patch } => {
                let result = self.store.update(&id, patch);
                self.quest_changed(result, Some(&id))
            }

            Request::SetComplete { id, complete } => {
                let result = self.store.set_complete(&id, complete);
                self.quest_changed(result, Some(&id))
            }

            Request::Delete { id } => match self.store.delete(&id) {
                Ok(quest) => {
                    // Keep the baseline current; a deletion never levels up
                    self.observe_level();
                    Response::Deleted { quest }
                }
                Err(e) => error_response(e, Some(&id)),
            },

            Request::Get { id } => match self.store.get(&id) {
                Ok(Some(quest)) => Response::Quest { quest, level_up: None },
                Ok(None) => Response::NotFound { id },
                Err(e) => Response::error(e.to_string()),
            },

            Request::List { complete } => match self.store.list(complete) {
                Ok(quests) => Response::Quests { quests },
                Err(e) => Response::error(e.to_string()),
            },

            Request::Level => {
                let result = self
                    .store
                    .level()
                    .and_then(|level| self.store.stats().map(|stats| (level, stats)));
                match result {
                    Ok((level, stats)) => Response::Level { level, stats },
                    Err(e) => Response::error(e.to_string()),
                }
            }

            Request::Shutdown => {
                self.shutdown.store(true, Ordering::Relaxed);
                Response::Ok
            }

            Request::Ping => Response::Pong,
        }
    }
}

/// Map a store failure to a response, keeping "not found" distinguishable.
fn error_response(e: eyre::Report, id: Option<&str>) -> Response {
    match (StoreError::from_report(&e), id) {
        (Some(StoreError::QuestNotFound(missing)), _) => Response::NotFound { id: missing.clone() },
        (_, Some(id)) => {
            log::warn!("Request for {} failed: {}", id, e);
            Response::error(e.to_string())
        }
        _ => Response::error(e.to_string()),
    }
}

/// Pid recorded by a running daemon, if the pid file is readable.
fn read_pid(pid_path: &Path) -> Option<i32> {
    fs::read_to_string(pid_path).ok()?.trim().parse().ok()
}

/// Signal 0 probes for the process without delivering anything.
fn process_alive(pid: i32) -> bool {
    unsafe { libc::kill(pid, 0) == 0 }
}

/// Whether a live daemon is serving the store at `root`.
///
/// A socket left behind by a dead daemon is removed along with its pid file.
pub fn is_daemon_running(root: &Path) -> bool {
    let config = DaemonConfig::new(root);
    let socket_path = config.socket_path();
    if !socket_path.exists() {
        return false;
    }

    let pid_path = config.pid_path();
    if read_pid(&pid_path).is_some_and(process_alive) {
        return true;
    }

    log::info!("Removing stale daemon socket {}", socket_path.display());
    fs::remove_file(&socket_path).ok();
    fs::remove_file(&pid_path).ok();
    false
}

/// Spawn `ql --dir <root> daemon` detached from this process.
pub fn start_daemon(root: &Path) -> Result<()> {
    let exe = std::env::current_exe().context("Failed to locate the ql executable")?;

    std::process::Command::new(exe)
        .arg("--dir")
        .arg(root)
        .arg("daemon")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("Failed to spawn daemon process")?;

    log::info!("Spawned daemon for {}", root.display());
    std::thread::sleep(Duration::from_millis(100));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Difficulty, NewQuest};
    use tempfile::TempDir;

    fn setup_test_store() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        Store::init(&root).unwrap();
        (temp_dir, root)
    }

    #[test]
    fn test_daemon_config() {
        let config = DaemonConfig::new("/test/path");
        assert_eq!(config.socket_path(), PathBuf::from("/test/path/.questlog/daemon.sock"));
        assert_eq!(config.pid_path(), PathBuf::from("/test/path/.questlog/daemon.pid"));
    }

    #[test]
    fn test_daemon_creation() {
        let (_temp_dir, root) = setup_test_store();
        let config = DaemonConfig::new(&root);
        let daemon = Daemon::new(config);
        assert!(daemon.is_ok());
    }

    fn new_quest(title: &str, reward_xp: i64, complete: bool) -> NewQuest {
        NewQuest {
            complete,
            ..NewQuest::new(title, "Details", Difficulty::Easy, reward_xp)
        }
    }

    #[test]
    fn test_handle_request_reports_level_up() {
        let (_temp_dir, root) = setup_test_store();
        let mut daemon = Daemon::new(DaemonConfig::new(&root)).unwrap();

        let response = daemon.handle_request(Request::Create {
            quest: new_quest("Warm up", 50, true),
        });
        let Response::Quest { level_up, .. } = response else {
            panic!("Expected quest response");
        };
        assert_eq!(level_up, None);

        let response = daemon.handle_request(Request::Create {
            quest: new_quest("Boss fight", 400, false),
        });
        let Response::Quest { quest, .. } = response else {
            panic!("Expected quest response");
        };

        let response = daemon.handle_request(Request::SetComplete {
            id: quest.id.clone(),
            complete: true,
        });
        let Response::Quest { level_up, .. } = response else {
            panic!("Expected quest response");
        };
        // 450 XP: past level 3 (220) and level 4 (364)
        assert_eq!(level_up, Some(LevelUp { from: 1, to: 4 }));

        match daemon.handle_request(Request::Level) {
            Response::Level { level, stats } => {
                assert_eq!(level.level, 4);
                assert_eq!(stats.completed, 2);
                assert_eq!(stats.total_xp, 450);
            }
            other => panic!("Unexpected response: {:?}", other),
        }
    }

    #[test]
    fn test_handle_request_not_found() {
        let (_temp_dir, root) = setup_test_store();
        let mut daemon = Daemon::new(DaemonConfig::new(&root)).unwrap();

        for request in [
            Request::Get {
                id: "qst-missing000".to_string(),
            },
            Request::Delete {
                id: "qst-missing000".to_string(),
            },
            Request::SetComplete {
                id: "qst-missing000".to_string(),
                complete: true,
            },
        ] {
            match daemon.handle_request(request) {
                Response::NotFound { id } => assert_eq!(id, "qst-missing000"),
                other => panic!("Expected NotFound, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_handle_request_validation_error() {
        let (_temp_dir, root) = setup_test_store();
        let mut daemon = Daemon::new(DaemonConfig::new(&root)).unwrap();

        let response = daemon.handle_request(Request::Create {
            quest: new_quest("", 10, false),
        });
        assert!(matches!(response, Response::Error { .. }));
    }

    #[test]
    fn test_handle_request_shutdown_sets_flag() {
        let (_temp_dir, root) = setup_test_store();
        let mut daemon = Daemon::new(DaemonConfig::new(&root)).unwrap();
        let handle = daemon.shutdown_handle();

        assert!(matches!(daemon.handle_request(Request::Ping), Response::Pong));
        assert!(matches!(daemon.handle_request(Request::Shutdown), Response::Ok));
        assert!(handle.load(Ordering::Relaxed));
    }

    #[test]
    fn test_is_daemon_running_false() {
        let (_temp_dir, root) = setup_test_store();
        assert!(!is_daemon_running(&root));
    }
}
