//! Live telemetry ingestion for the tower-defense simulation dashboard.
//!
//! The simulation periodically rewrites `reports/live_state.json`. A
//! [`LiveStateWatcher`] follows that file and publishes validated
//! [`Snapshot`]s; [`DashboardView`] projects them for display, resolving ids
//! through [`ReferenceData`].

pub mod config;
mod error;
pub mod layout;
pub mod reference;
pub mod settings;
pub mod snapshot;
pub mod view;
mod watcher;

pub use config::{load_watcher_config_from_env, WatcherConfig, WatcherConfigError};
pub use error::{LiveStateError, ReferenceDataError, SchemaError, SettingsError};
pub use layout::GameLayout;
pub use reference::{EnemyConfig, ReferenceData, UpgradeConfig, WeaponConfig};
pub use settings::{AppSettings, SettingsStore};
pub use snapshot::{
    CombatState, EconomyState, EnemiesState, GameEvent, RunSummary, Snapshot, Status, TowerState,
    UpgradeSlot, WeaponSlot,
};
pub use view::{Banner, BannerTone, DashboardView, EventTone, HealthTier};
pub use watcher::{LiveStateWatcher, RefreshHandle, SubscriptionId};
