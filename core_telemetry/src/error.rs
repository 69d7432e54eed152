use std::{io, path::PathBuf};

use thiserror::Error;

use crate::snapshot::Status;

/// Failures raised while watching, reading, or parsing the live state file.
///
/// Only [`LiveStateError::DirectoryUnavailable`] and [`LiveStateError::Watch`]
/// escape [`crate::LiveStateWatcher::start`]; everything else is contained
/// inside a read cycle and logged.
#[derive(Debug, Error)]
pub enum LiveStateError {
    #[error("live state directory {path:?} is unavailable: {source}")]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to install file watcher: {0}")]
    Watch(#[from] notify::Error),
    #[error("failed to read live state from {path:?}: {source}")]
    TransientRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("live state file {path:?} is empty")]
    EmptyContent { path: PathBuf },
    #[error("live state payload is not valid JSON: {0}")]
    MalformedPayload(#[source] serde_json::Error),
    #[error("live state payload rejected: {0}")]
    SchemaInvalid(#[from] SchemaError),
    #[error("live state still unreadable after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<LiveStateError>,
    },
    #[error("read cycle cancelled by shutdown")]
    Cancelled,
}

impl LiveStateError {
    /// Whether another attempt within the same read cycle may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LiveStateError::TransientRead { .. } | LiveStateError::EmptyContent { .. }
        )
    }
}

/// Reasons a syntactically valid payload is not accepted as a snapshot.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("payload does not match the live state schema: {0}")]
    Shape(#[source] serde_json::Error),
    #[error("status `{status}` requires the `{section}` section")]
    MissingSection {
        status: Status,
        section: &'static str,
    },
    #[error("`{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("trial {trial} exceeds total trials {total_trials}")]
    TrialOutOfRange { trial: u32, total_trials: u32 },
}

#[derive(Debug, Error)]
pub enum ReferenceDataError {
    #[error("failed to read reference table from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse reference table {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("no per-user data directory available on this platform")]
    NoDataDirectory,
    #[error("failed to write settings to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),
}
