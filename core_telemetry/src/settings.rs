//! Persisted dashboard settings (`{"game_path": "..."}`) under the per-user
//! local data directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

pub const SETTINGS_DIR_NAME: &str = "TelemetryViewer";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub game_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_local_dir>/TelemetryViewer/settings.json`.
    pub fn default_location() -> Result<Self, SettingsError> {
        let base = dirs::data_local_dir().ok_or(SettingsError::NoDataDirectory)?;
        Ok(Self::new(
            base.join(SETTINGS_DIR_NAME).join(SETTINGS_FILE_NAME),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved game path, if it still points at an existing directory.
    ///
    /// A missing, unreadable or stale settings file is not an error; the
    /// caller prompts for a new path instead.
    pub fn load_game_path(&self) -> Option<PathBuf> {
        if !self.path.exists() {
            return None;
        }

        let settings = fs::read_to_string(&self.path)
            .map_err(|err| err.to_string())
            .and_then(|text| {
                serde_json::from_str::<AppSettings>(&text).map_err(|err| err.to_string())
            });
        let settings = match settings {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!(
                    target: "telemetry::settings",
                    path = %self.path.display(),
                    %error,
                    "settings.load_failed"
                );
                return None;
            }
        };

        settings
            .game_path
            .filter(|path| !path.as_os_str().is_empty() && path.is_dir())
    }

    pub fn save_game_path(&self, game_path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let settings = AppSettings {
            game_path: Some(game_path.to_path_buf()),
        };
        let json = serde_json::to_string_pretty(&settings)?;
        fs::write(&self.path, json).map_err(|source| SettingsError::Write {
            path: self.path.clone(),
            source,
        })?;
        tracing::info!(
            target: "telemetry::settings",
            path = %self.path.display(),
            game_path = %game_path.display(),
            "settings.saved"
        );
        Ok(())
    }
}
