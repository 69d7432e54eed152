use std::path::{Path, PathBuf};

pub const LIVE_STATE_FILE: &str = "live_state.json";

/// Well-known locations inside the game's root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameLayout {
    root: PathBuf,
}

impl GameLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.root.join("reports")
    }

    pub fn live_state_path(&self) -> PathBuf {
        self.reports_dir().join(LIVE_STATE_FILE)
    }

    pub fn weapons_config_path(&self) -> PathBuf {
        self.root
            .join("data")
            .join("weapons")
            .join("weapons_config.json")
    }

    pub fn enemies_config_path(&self) -> PathBuf {
        self.root
            .join("data")
            .join("enemies")
            .join("enemies_config.json")
    }

    pub fn upgrades_config_path(&self) -> PathBuf {
        self.root
            .join("data")
            .join("upgrades")
            .join("upgrades_config.json")
    }
}
