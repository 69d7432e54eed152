//! Tuning for the live state watcher.
//!
//! Loaded from `watcher_config.json` with support for an environment variable
//! override.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

pub const BUILTIN_WATCHER_CONFIG: &str = include_str!("data/watcher_config.json");
pub const WATCHER_CONFIG_ENV: &str = "LIVE_STATE_WATCHER_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Quiet period after the last change notification before a read.
    pub debounce_ms: u64,
    /// Reads attempted per cycle before giving up until the next change.
    pub max_attempts: u32,
    /// Backoff before retry `n` is `retry_base_delay_ms * n`.
    pub retry_base_delay_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            max_attempts: 3,
            retry_base_delay_ms: 25,
        }
    }
}

impl WatcherConfig {
    pub fn builtin() -> Self {
        serde_json::from_str(BUILTIN_WATCHER_CONFIG).unwrap_or_default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, WatcherConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| WatcherConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = WatcherConfig::from_json_str(&contents)?;
        Ok(config)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// At least one attempt is always made.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms.saturating_mul(u64::from(attempt)))
    }
}

#[derive(Debug, Error)]
pub enum WatcherConfigError {
    #[error("failed to parse watcher config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read watcher config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Load watcher configuration from the override path, or the builtin defaults.
pub fn load_watcher_config_from_env() -> WatcherConfig {
    let Some(path) = env::var_os(WATCHER_CONFIG_ENV).map(PathBuf::from) else {
        tracing::debug!(target: "telemetry::config", "watcher_config.loaded=builtin");
        return WatcherConfig::builtin();
    };

    match WatcherConfig::from_file(&path) {
        Ok(config) => {
            tracing::info!(
                target: "telemetry::config",
                path = %path.display(),
                debounce_ms = config.debounce_ms,
                max_attempts = config.max_attempts,
                "watcher_config.loaded=file"
            );
            config
        }
        Err(err) => {
            tracing::warn!(
                target: "telemetry::config",
                path = %path.display(),
                error = %err,
                "watcher_config.load_failed"
            );
            WatcherConfig::builtin()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_matches_defaults() {
        assert_eq!(WatcherConfig::builtin(), WatcherConfig::default());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config = WatcherConfig::from_json_str(r#"{"debounce_ms": 10}"#).unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(10));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_base_delay_ms, 25);
    }

    #[test]
    fn retry_delay_grows_linearly() {
        let config = WatcherConfig::default();
        assert_eq!(config.retry_delay(1), Duration::from_millis(25));
        assert_eq!(config.retry_delay(2), Duration::from_millis(50));
        assert_eq!(config.retry_delay(3), Duration::from_millis(75));
    }

    #[test]
    fn zero_attempts_still_reads_once() {
        let config = WatcherConfig {
            max_attempts: 0,
            ..WatcherConfig::default()
        };
        assert_eq!(config.attempts(), 1);
    }

    #[test]
    fn missing_file_reports_read_error() {
        let err = WatcherConfig::from_file(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, WatcherConfigError::Read { .. }));
    }
}
