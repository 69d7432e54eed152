#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use core_telemetry::{GameLayout, LiveStateWatcher, Snapshot, WatcherConfig};
use crossbeam_channel::Receiver;
use serde_json::Value;
use tempfile::TempDir;

pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(3);
/// Long enough for a debounce window plus a full retry cycle to finish.
pub const SETTLE: Duration = Duration::from_millis(400);

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

pub fn fixture_json(name: &str) -> Result<Value> {
    let path = fixtures_dir().join(name);
    let text = fs::read_to_string(&path)
        .with_context(|| format!("missing fixture {}", path.display()))?;
    Ok(serde_json::from_str(&text)?)
}

/// The running fixture with `economy.gold` replaced.
pub fn running_with_gold(gold: u64) -> Result<String> {
    let mut payload = fixture_json("running.json")?;
    payload["economy"]["gold"] = Value::from(gold);
    Ok(payload.to_string())
}

pub fn quick_config() -> WatcherConfig {
    WatcherConfig {
        debounce_ms: 30,
        max_attempts: 3,
        retry_base_delay_ms: 20,
    }
}

/// A throwaway game folder with a watcher on its live state file.
/// Fields drop in order, so the watcher stops before the folder is removed.
pub struct LiveGame {
    pub watcher: LiveStateWatcher,
    pub snapshots: Receiver<Arc<Snapshot>>,
    pub layout: GameLayout,
    pub root: TempDir,
}

impl LiveGame {
    pub fn new(config: WatcherConfig) -> Result<Self> {
        let root = tempfile::tempdir()?;
        let layout = GameLayout::new(root.path());
        fs::create_dir_all(layout.reports_dir())?;
        let watcher = LiveStateWatcher::new(layout.live_state_path(), config);
        let snapshots = watcher.snapshots();
        Ok(Self {
            watcher,
            snapshots,
            layout,
            root,
        })
    }

    pub fn live_state_path(&self) -> PathBuf {
        self.layout.live_state_path()
    }

    pub fn write(&self, contents: &str) -> Result<()> {
        fs::write(self.live_state_path(), contents)?;
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        self.watcher.start()?;
        Ok(())
    }

    pub fn next(&self) -> Option<Arc<Snapshot>> {
        self.snapshots.recv_timeout(RECEIVE_TIMEOUT).ok()
    }

    /// Everything published until the watcher has been quiet for `SETTLE`.
    pub fn settle(&self) -> Vec<Arc<Snapshot>> {
        let mut received = Vec::new();
        let hard_limit = Instant::now() + RECEIVE_TIMEOUT;
        while Instant::now() < hard_limit {
            match self.snapshots.recv_timeout(SETTLE) {
                Ok(snapshot) => received.push(snapshot),
                Err(_) => break,
            }
        }
        received
    }

    /// Wait for a snapshot matching `predicate`, skipping earlier ones.
    pub fn wait_for<F>(&self, predicate: F) -> Option<Arc<Snapshot>>
    where
        F: Fn(&Snapshot) -> bool,
    {
        let deadline = Instant::now() + RECEIVE_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let snapshot = self.snapshots.recv_timeout(remaining).ok()?;
            if predicate(&snapshot) {
                return Some(snapshot);
            }
        }
    }
}

pub fn pause(millis: u64) {
    thread::sleep(Duration::from_millis(millis));
}

pub fn copy_game_data(target: &Path) -> Result<()> {
    let source = fixtures_dir().join("game").join("data");
    for table in ["enemies", "weapons", "upgrades"] {
        let dir = target.join("data").join(table);
        fs::create_dir_all(&dir)?;
        let file = format!("{table}_config.json");
        fs::copy(source.join(table).join(&file), dir.join(&file))?;
    }
    Ok(())
}
