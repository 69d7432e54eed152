//! Static weapon, enemy and upgrade tables shipped with the game.
//!
//! Each file is a JSON object keyed by id. Keys starting with `_` hold
//! comments or metadata and are skipped. Name lookups never fail: an id the
//! tables do not know resolves to itself, since the game content may be newer
//! than the data on disk.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ReferenceDataError;
use crate::layout::GameLayout;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponVisual {
    pub color: Option<String>,
    pub emission: Option<String>,
    pub shape: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponConfig {
    pub name: String,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub weapon_type: String,
    pub tier: u32,
    pub damage: f64,
    pub fire_rate: f64,
    pub range: f64,
    pub cost: u32,
    pub armor_pierce: f64,
    pub attack_mode: Option<String>,
    pub rarity: Option<String>,
    pub weight: u32,
    pub description: String,
    pub effects: serde_json::Map<String, serde_json::Value>,
    pub visual: Option<WeaponVisual>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub enemy_type: String,
    pub health: f64,
    pub armor: f64,
    pub speed: f64,
    pub bounty: u32,
    pub tower_damage: f64,
    pub send_cost: u32,
    pub attack_range: f64,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeConfig {
    pub name: String,
    pub category: Option<String>,
    pub stat: String,
    pub value: f64,
    pub cost: u32,
    pub rarity: Option<String>,
    pub weight: u32,
    pub stackable: bool,
    pub description: String,
}

/// Something with a display name.
pub trait Named {
    fn display_name(&self) -> &str;
}

impl Named for WeaponConfig {
    fn display_name(&self) -> &str {
        &self.name
    }
}

impl Named for EnemyConfig {
    fn display_name(&self) -> &str {
        &self.name
    }
}

impl Named for UpgradeConfig {
    fn display_name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    weapons: HashMap<String, WeaponConfig>,
    enemies: HashMap<String, EnemyConfig>,
    upgrades: HashMap<String, UpgradeConfig>,
}

impl ReferenceData {
    pub fn new(
        weapons: HashMap<String, WeaponConfig>,
        enemies: HashMap<String, EnemyConfig>,
        upgrades: HashMap<String, UpgradeConfig>,
    ) -> Self {
        Self {
            weapons,
            enemies,
            upgrades,
        }
    }

    pub fn load(layout: &GameLayout) -> Result<Self, ReferenceDataError> {
        let data = Self {
            weapons: load_table(&layout.weapons_config_path())?,
            enemies: load_table(&layout.enemies_config_path())?,
            upgrades: load_table(&layout.upgrades_config_path())?,
        };
        tracing::info!(
            target: "telemetry::reference",
            weapons = data.weapons.len(),
            enemies = data.enemies.len(),
            upgrades = data.upgrades.len(),
            "reference_data.loaded"
        );
        Ok(data)
    }

    pub fn weapon(&self, id: &str) -> Option<&WeaponConfig> {
        self.weapons.get(id)
    }

    pub fn enemy(&self, id: &str) -> Option<&EnemyConfig> {
        self.enemies.get(id)
    }

    pub fn upgrade(&self, id: &str) -> Option<&UpgradeConfig> {
        self.upgrades.get(id)
    }

    pub fn weapon_name<'a>(&'a self, id: &'a str) -> &'a str {
        name_or_id(&self.weapons, id)
    }

    pub fn enemy_name<'a>(&'a self, id: &'a str) -> &'a str {
        name_or_id(&self.enemies, id)
    }

    pub fn upgrade_name<'a>(&'a self, id: &'a str) -> &'a str {
        name_or_id(&self.upgrades, id)
    }
}

fn name_or_id<'a, T: Named>(table: &'a HashMap<String, T>, id: &'a str) -> &'a str {
    table.get(id).map(Named::display_name).unwrap_or(id)
}

/// Load one id-keyed table. A missing file yields an empty table.
pub fn load_table<T: DeserializeOwned>(
    path: &Path,
) -> Result<HashMap<String, T>, ReferenceDataError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!(
                target: "telemetry::reference",
                path = %path.display(),
                "reference_table.missing"
            );
            return Ok(HashMap::new());
        }
        Err(source) => {
            return Err(ReferenceDataError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    table_from_json_str(&contents).map_err(|source| ReferenceDataError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn table_from_json_str<T: DeserializeOwned>(
    json: &str,
) -> Result<HashMap<String, T>, serde_json::Error> {
    let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
    let mut table = HashMap::with_capacity(raw.len());
    for (id, value) in raw {
        if id.starts_with('_') {
            continue;
        }
        match serde_json::from_value::<T>(value) {
            Ok(entry) => {
                table.insert(id, entry);
            }
            Err(error) => {
                tracing::warn!(
                    target: "telemetry::reference",
                    %id,
                    %error,
                    "reference_entry.skipped"
                );
            }
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENEMIES: &str = r#"{
        "_comment": "health is pre-scaling",
        "_version": 3,
        "grunt": {"name": "Grunt", "type": "ground", "health": 60, "bounty": 2},
        "brute": {"name": "Brute", "type": "ground", "health": 300, "armor": 5},
        "broken": {"name": 17}
    }"#;

    fn with_enemies() -> ReferenceData {
        let enemies = table_from_json_str(ENEMIES).unwrap();
        ReferenceData::new(HashMap::new(), enemies, HashMap::new())
    }

    #[test]
    fn metadata_keys_and_invalid_entries_are_skipped() {
        let table: HashMap<String, EnemyConfig> = table_from_json_str(ENEMIES).unwrap();
        assert_eq!(table.len(), 2);
        assert!(!table.contains_key("_comment"));
        assert!(!table.contains_key("broken"));
        assert_eq!(table["brute"].armor, 5.0);
        assert_eq!(table["grunt"].enemy_type, "ground");
    }

    #[test]
    fn unknown_ids_resolve_to_themselves() {
        let data = with_enemies();
        assert_eq!(data.enemy_name("grunt"), "Grunt");
        assert_eq!(data.enemy_name("wraith"), "wraith");
        assert_eq!(data.weapon_name("arc_coil"), "arc_coil");
        assert_eq!(data.upgrade_name(""), "");
    }

    #[test]
    fn missing_files_load_as_empty_tables() {
        let scratch = tempfile::tempdir().unwrap();
        let data = ReferenceData::load(&GameLayout::new(scratch.path())).unwrap();
        assert!(data.weapon("anything").is_none());
        assert_eq!(data.upgrade_name("thorns"), "thorns");
    }

    #[test]
    fn loads_tables_from_game_layout() {
        let scratch = tempfile::tempdir().unwrap();
        let layout = GameLayout::new(scratch.path());
        let upgrades = layout.upgrades_config_path();
        fs::create_dir_all(upgrades.parent().unwrap()).unwrap();
        fs::write(
            &upgrades,
            r#"{"_doc": "x", "thorns": {"name": "Thorns", "stat": "reflect", "value": 0.1, "stackable": true}}"#,
        )
        .unwrap();

        let data = ReferenceData::load(&layout).unwrap();
        assert_eq!(data.upgrade_name("thorns"), "Thorns");
        assert!(data.upgrade("thorns").map(|u| u.stackable).unwrap_or(false));
    }

    #[test]
    fn non_object_table_is_a_parse_error() {
        let scratch = tempfile::tempdir().unwrap();
        let path = scratch.path().join("weapons_config.json");
        fs::write(&path, "[1, 2]").unwrap();
        let err = load_table::<WeaponConfig>(&path).unwrap_err();
        assert!(matches!(err, ReferenceDataError::Parse { .. }));
    }
}
