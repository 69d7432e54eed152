//! Typed schema of one `live_state.json` snapshot.
//!
//! The producer writes snake_case keys with a few abbreviations (`hp_pct`,
//! `elapsed_s`, `t`); those are mapped onto descriptive field names here.
//! [`Snapshot::from_json_str`] is the only way to build a snapshot from wire
//! data, so every snapshot handed to subscribers has passed validation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::error::Category;

use crate::error::{LiveStateError, SchemaError};

/// Lifecycle of the simulation batch as reported by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Idle,
    Starting,
    Running,
    Survived,
    Dead,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::Starting => "starting",
            Status::Running => "running",
            Status::Survived => "survived",
            Status::Dead => "dead",
        }
    }

    /// Trial finished, either way.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Survived | Status::Dead)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TowerState {
    pub hp: f64,
    pub max_hp: f64,
    #[serde(rename = "hp_pct")]
    pub hp_fraction: f64,
    pub armor: f64,
    #[serde(rename = "regen_per_s")]
    pub regen_per_second: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyState {
    pub gold: f64,
    pub total_earned: f64,
    pub total_spent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponSlot {
    pub id: String,
    pub name: String,
    pub stacks: u32,
    pub tier: u32,
    pub dps: f64,
    pub range: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeSlot {
    pub id: String,
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemiesState {
    pub alive: u32,
    pub breakdown: BTreeMap<String, u32>,
    pub total_spawned: u32,
    pub total_killed: u32,
    pub total_leaked: u32,
    pub elites_spawned: u32,
    pub escorts_spawned: u32,
    pub peak_alive: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatState {
    pub total_damage_dealt: f64,
    pub total_hp_spawned: f64,
    pub total_tower_damage_taken: f64,
    pub total_healing: f64,
    #[serde(rename = "cc_uptime_pct")]
    pub cc_uptime_fraction: f64,
    #[serde(rename = "difficulty_mult")]
    pub difficulty_multiplier: f64,
}

/// One entry of the producer's rolling event log. Which optional fields are
/// set depends on `event_type` (`purchase`, `elite_spawn`, `escort_spawn`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameEvent {
    #[serde(rename = "t")]
    pub timestamp: f64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub kind: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub cost: Option<u32>,
    pub enemy: Option<String>,
    pub leader: Option<String>,
    pub count: Option<u32>,
}

/// End-of-batch summary, only reported once the producer goes idle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub trials_completed: u32,
    pub survived: u32,
}

/// The simulation state at one instant.
///
/// Sections and lists the producer left out are `None`, which is distinct
/// from an empty list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub status: Status,
    pub trial: u32,
    pub total_trials: u32,
    pub elapsed_seconds: f64,
    pub duration_seconds: f64,
    pub build_profile: Option<String>,
    pub difficulty_scalar: f64,
    pub seed: i64,
    pub tower: Option<TowerState>,
    pub economy: Option<EconomyState>,
    pub loadout: Option<Vec<WeaponSlot>>,
    pub upgrades: Option<Vec<UpgradeSlot>>,
    pub enemies: Option<EnemiesState>,
    pub combat: Option<CombatState>,
    pub kills_by_type: Option<BTreeMap<String, u32>>,
    pub recent_events: Option<Vec<GameEvent>>,
    pub hp_timeline: Vec<f64>,
    pub summary: Option<RunSummary>,
}

/// Wire layout of the top-level object.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LiveStatePayload {
    status: Status,
    trial: u32,
    total_trials: u32,
    #[serde(rename = "elapsed_s")]
    elapsed_seconds: f64,
    #[serde(rename = "duration_s")]
    duration_seconds: f64,
    build_profile: Option<String>,
    difficulty_scalar: f64,
    seed: i64,
    tower: Option<TowerState>,
    economy: Option<EconomyState>,
    loadout: Option<Vec<WeaponSlot>>,
    upgrades: Option<Vec<UpgradeSlot>>,
    enemies: Option<EnemiesState>,
    combat: Option<CombatState>,
    kills_by_type: Option<BTreeMap<String, u32>>,
    recent_events: Option<Vec<GameEvent>>,
    hp_timeline: Option<Vec<f64>>,
    trials_completed: u32,
    survived: u32,
}

impl Snapshot {
    /// Parse and validate one payload.
    ///
    /// Syntax errors (including a payload cut off mid-write) map to
    /// [`LiveStateError::MalformedPayload`]; well-formed JSON that does not
    /// describe a valid snapshot maps to [`LiveStateError::SchemaInvalid`].
    pub fn from_json_str(json: &str) -> Result<Self, LiveStateError> {
        let payload: LiveStatePayload =
            serde_json::from_str(json).map_err(|err| match err.classify() {
                Category::Data => LiveStateError::SchemaInvalid(SchemaError::Shape(err)),
                Category::Syntax | Category::Eof | Category::Io => {
                    LiveStateError::MalformedPayload(err)
                }
            })?;
        let snapshot = Snapshot::from_payload(payload);
        snapshot.validate()?;
        Ok(snapshot)
    }

    fn from_payload(payload: LiveStatePayload) -> Self {
        let summary = (payload.status == Status::Idle).then_some(RunSummary {
            trials_completed: payload.trials_completed,
            survived: payload.survived,
        });
        Self {
            status: payload.status,
            trial: payload.trial,
            total_trials: payload.total_trials,
            elapsed_seconds: payload.elapsed_seconds,
            duration_seconds: payload.duration_seconds,
            build_profile: payload.build_profile,
            difficulty_scalar: payload.difficulty_scalar,
            seed: payload.seed,
            tower: payload.tower,
            economy: payload.economy,
            loadout: payload.loadout,
            upgrades: payload.upgrades,
            enemies: payload.enemies,
            combat: payload.combat,
            kills_by_type: payload.kills_by_type,
            recent_events: payload.recent_events,
            hp_timeline: payload.hp_timeline.unwrap_or_default(),
            summary,
        }
    }

    /// Check the invariants serde cannot express.
    ///
    /// A `running` snapshot must carry every live section. Terminal states
    /// may omit sections; the presentation keeps the previous values then.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.status == Status::Running {
            let sections = [
                ("tower", self.tower.is_some()),
                ("economy", self.economy.is_some()),
                ("combat", self.combat.is_some()),
                ("enemies", self.enemies.is_some()),
            ];
            if let Some((section, _)) = sections.iter().find(|(_, present)| !present) {
                return Err(SchemaError::MissingSection {
                    status: self.status,
                    section: *section,
                });
            }
        }

        if self.trial > self.total_trials {
            return Err(SchemaError::TrialOutOfRange {
                trial: self.trial,
                total_trials: self.total_trials,
            });
        }

        non_negative("elapsed_s", self.elapsed_seconds)?;
        non_negative("duration_s", self.duration_seconds)?;

        if let Some(tower) = &self.tower {
            non_negative("tower.hp", tower.hp)?;
            non_negative("tower.max_hp", tower.max_hp)?;
            fraction("tower.hp_pct", tower.hp_fraction)?;
            non_negative("tower.armor", tower.armor)?;
            non_negative("tower.regen_per_s", tower.regen_per_second)?;
        }
        if let Some(economy) = &self.economy {
            non_negative("economy.gold", economy.gold)?;
            non_negative("economy.total_earned", economy.total_earned)?;
            non_negative("economy.total_spent", economy.total_spent)?;
        }
        if let Some(combat) = &self.combat {
            non_negative("combat.total_damage_dealt", combat.total_damage_dealt)?;
            non_negative("combat.total_hp_spawned", combat.total_hp_spawned)?;
            non_negative(
                "combat.total_tower_damage_taken",
                combat.total_tower_damage_taken,
            )?;
            non_negative("combat.total_healing", combat.total_healing)?;
            fraction("combat.cc_uptime_pct", combat.cc_uptime_fraction)?;
        }
        Ok(())
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), SchemaError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SchemaError::OutOfRange { field, value })
    }
}

fn fraction(field: &'static str, value: f64) -> Result<(), SchemaError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SchemaError::OutOfRange { field, value })
    }
}
