//! Projection of snapshots onto the state a dashboard displays.
//!
//! [`DashboardView`] is owned by the presentation thread. Each snapshot is
//! applied as a whole according to its status; sections a snapshot omits
//! keep their previous values. Colour choices are reduced to small enums so
//! front ends can map them onto their own palette.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::reference::ReferenceData;
use crate::snapshot::{
    CombatState, EconomyState, EnemiesState, GameEvent, Snapshot, Status, TowerState,
};

pub const SPARKLINE_WIDTH: f64 = 600.0;
pub const SPARKLINE_HEIGHT: f64 = 50.0;
/// Scale used for the health trend when a snapshot carries no tower.
pub const DEFAULT_MAX_HP: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthTier {
    #[default]
    Healthy,
    Warning,
    Critical,
}

impl HealthTier {
    pub fn from_fraction(hp_fraction: f64) -> Self {
        if hp_fraction > 0.6 {
            HealthTier::Healthy
        } else if hp_fraction > 0.3 {
            HealthTier::Warning
        } else {
            HealthTier::Critical
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerTone {
    Info,
    Success,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub text: String,
    pub tone: BannerTone,
}

impl Banner {
    fn new(text: impl Into<String>, tone: BannerTone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTone {
    Purchase,
    Elite,
    Escort,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayEntry {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadoutEntry {
    pub name: String,
    pub stacks: String,
    pub dps: String,
    pub range: String,
    pub tier: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEntry {
    pub time: String,
    pub label: String,
    pub detail: String,
    pub tone: EventTone,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub status: Status,
    pub trial: u32,
    pub total_trials: u32,
    pub trial_display: String,
    pub elapsed_display: String,
    pub duration_display: String,
    /// Percent of the trial duration elapsed, 0 when the duration is unknown.
    pub time_progress: f64,
    pub build_profile: String,
    pub difficulty_scalar: f64,
    pub seed: i64,
    pub tower: TowerState,
    pub health_tier: HealthTier,
    pub economy: EconomyState,
    pub combat: CombatState,
    pub enemies: EnemiesState,
    pub enemy_breakdown: Vec<DisplayEntry>,
    pub kill_log: Vec<DisplayEntry>,
    pub upgrades: Vec<DisplayEntry>,
    pub loadout: Vec<LoadoutEntry>,
    pub events: Vec<EventEntry>,
    pub hp_timeline: Vec<(f64, f64)>,
    pub banner: Banner,
    pub show_banner: bool,
    pub show_main_panels: bool,
}

impl Default for DashboardView {
    fn default() -> Self {
        Self {
            status: Status::Idle,
            trial: 0,
            total_trials: 0,
            trial_display: String::new(),
            elapsed_display: format_clock(0.0),
            duration_display: format_clock(0.0),
            time_progress: 0.0,
            build_profile: String::new(),
            difficulty_scalar: 0.0,
            seed: 0,
            tower: TowerState::default(),
            health_tier: HealthTier::Healthy,
            economy: EconomyState::default(),
            combat: CombatState::default(),
            enemies: EnemiesState::default(),
            enemy_breakdown: Vec::new(),
            kill_log: Vec::new(),
            upgrades: Vec::new(),
            loadout: Vec::new(),
            events: Vec::new(),
            hp_timeline: Vec::new(),
            banner: Banner::new("WAITING FOR SIMULATION…", BannerTone::Info),
            show_banner: true,
            show_main_panels: false,
        }
    }
}

impl DashboardView {
    pub fn apply(&mut self, snapshot: &Snapshot, refs: &ReferenceData) {
        self.status = snapshot.status;
        self.trial = snapshot.trial;
        self.total_trials = snapshot.total_trials;
        self.trial_display = format!("Trial {} / {}", snapshot.trial, snapshot.total_trials);
        self.elapsed_display = format_clock(snapshot.elapsed_seconds);
        self.duration_display = format_clock(snapshot.duration_seconds);
        self.time_progress = if snapshot.duration_seconds > 0.0 {
            snapshot.elapsed_seconds / snapshot.duration_seconds * 100.0
        } else {
            0.0
        };
        self.build_profile = snapshot
            .build_profile
            .as_deref()
            .map(str::to_uppercase)
            .unwrap_or_default();
        self.difficulty_scalar = snapshot.difficulty_scalar;
        self.seed = snapshot.seed;

        match snapshot.status {
            Status::Starting => self.apply_starting(snapshot),
            Status::Running => self.apply_live(snapshot, refs),
            Status::Survived => {
                self.apply_live(snapshot, refs);
                self.banner = Banner::new("SURVIVED", BannerTone::Success);
            }
            Status::Dead => {
                self.apply_live(snapshot, refs);
                self.banner = Banner::new("TOWER DESTROYED", BannerTone::Danger);
            }
            Status::Idle => {
                let summary = snapshot.summary.unwrap_or_default();
                self.banner = Banner::new(
                    format!(
                        "ALL TRIALS COMPLETE — {}/{} SURVIVED",
                        summary.survived, summary.trials_completed
                    ),
                    BannerTone::Info,
                );
            }
        }

        self.show_main_panels = matches!(
            snapshot.status,
            Status::Running | Status::Survived | Status::Dead
        );
        self.show_banner = snapshot.status != Status::Running;
    }

    fn apply_starting(&mut self, snapshot: &Snapshot) {
        self.tower = TowerState::default();
        self.economy = EconomyState::default();
        self.combat = CombatState::default();
        self.enemies = EnemiesState::default();
        self.loadout.clear();
        self.upgrades.clear();
        self.events.clear();
        self.kill_log.clear();
        self.enemy_breakdown.clear();
        self.hp_timeline.clear();
        self.banner = Banner::new(
            format!(
                "STARTING — TRIAL {}/{}",
                snapshot.trial, snapshot.total_trials
            ),
            BannerTone::Info,
        );
    }

    fn apply_live(&mut self, snapshot: &Snapshot, refs: &ReferenceData) {
        if let Some(tower) = &snapshot.tower {
            self.tower = tower.clone();
            self.health_tier = HealthTier::from_fraction(tower.hp_fraction);
        }
        if let Some(economy) = &snapshot.economy {
            self.economy = economy.clone();
        }
        if let Some(combat) = &snapshot.combat {
            self.combat = combat.clone();
        }
        if let Some(enemies) = &snapshot.enemies {
            self.enemies = enemies.clone();
            self.enemy_breakdown = ranked_counts(&enemies.breakdown, |id| refs.enemy_name(id));
        }

        if let Some(loadout) = &snapshot.loadout {
            self.loadout = loadout
                .iter()
                .map(|slot| LoadoutEntry {
                    name: slot.name.clone(),
                    stacks: format!("x{}", slot.stacks),
                    dps: format!("{} DPS", format_thousands(slot.dps)),
                    range: format!("R:{}", format_thousands(slot.range)),
                    tier: format!("T{}", slot.tier),
                })
                .collect();
        }

        if let Some(upgrades) = &snapshot.upgrades {
            let mut upgrades: Vec<_> = upgrades.iter().collect();
            upgrades.sort_by(|a, b| b.count.cmp(&a.count));
            self.upgrades = upgrades
                .into_iter()
                .map(|slot| DisplayEntry {
                    label: refs.upgrade_name(&slot.id).to_string(),
                    value: format!("x{}", slot.count),
                })
                .collect();
        }

        if let Some(kills) = &snapshot.kills_by_type {
            self.kill_log = ranked_counts(kills, |id| refs.enemy_name(id));
        }

        if let Some(events) = &snapshot.recent_events {
            let mut events: Vec<_> = events.iter().collect();
            events.sort_by(|a, b| {
                b.timestamp
                    .partial_cmp(&a.timestamp)
                    .unwrap_or(Ordering::Equal)
            });
            self.events = events
                .into_iter()
                .map(|event| format_event(event, refs))
                .collect();
        }

        if snapshot.hp_timeline.len() > 1 {
            let max_hp = snapshot
                .tower
                .as_ref()
                .map(|tower| tower.max_hp)
                .unwrap_or(DEFAULT_MAX_HP);
            self.hp_timeline = sparkline_points(
                &snapshot.hp_timeline,
                max_hp,
                SPARKLINE_WIDTH,
                SPARKLINE_HEIGHT,
            );
        }
    }
}

/// Entries sorted by descending count; ties keep id order.
fn ranked_counts<'a, F>(counts: &'a BTreeMap<String, u32>, name: F) -> Vec<DisplayEntry>
where
    F: Fn(&'a str) -> &'a str,
{
    let mut ranked: Vec<_> = counts.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1));
    ranked
        .into_iter()
        .map(|(id, count)| DisplayEntry {
            label: name(id).to_string(),
            value: format_thousands(f64::from(*count)),
        })
        .collect()
}

pub fn format_event(event: &GameEvent, refs: &ReferenceData) -> EventEntry {
    let time = format_clock(event.timestamp);
    match event.event_type.as_str() {
        "purchase" => EventEntry {
            time,
            label: "PURCHASE".to_string(),
            detail: format!(
                "{} ({}) — {}g",
                event.name.as_deref().unwrap_or_default(),
                event.kind.as_deref().unwrap_or_default(),
                event
                    .cost
                    .map(|cost| format_thousands(f64::from(cost)))
                    .unwrap_or_default()
            ),
            tone: EventTone::Purchase,
        },
        "elite_spawn" => EventEntry {
            time,
            label: "ELITE".to_string(),
            detail: refs
                .enemy_name(event.enemy.as_deref().unwrap_or_default())
                .to_string(),
            tone: EventTone::Elite,
        },
        "escort_spawn" => EventEntry {
            time,
            label: "ESCORT".to_string(),
            detail: format!(
                "{} (+{} scouts)",
                refs.enemy_name(event.leader.as_deref().unwrap_or_default()),
                event.count.unwrap_or_default()
            ),
            tone: EventTone::Escort,
        },
        other => EventEntry {
            time,
            label: other.to_uppercase(),
            detail: String::new(),
            tone: EventTone::Neutral,
        },
    }
}

/// Points of the health trend line in drawing coordinates (y grows
/// downwards). Fewer than two samples draw nothing.
pub fn sparkline_points(samples: &[f64], max_hp: f64, width: f64, height: f64) -> Vec<(f64, f64)> {
    if samples.len() < 2 {
        return Vec::new();
    }
    let max_hp = if max_hp > 0.0 { max_hp } else { DEFAULT_MAX_HP };
    let x_step = width / (samples.len() - 1) as f64;
    samples
        .iter()
        .enumerate()
        .map(|(index, hp)| {
            let x = index as f64 * x_step;
            let y = height - hp / max_hp * height;
            (x, y.clamp(0.0, height))
        })
        .collect()
}

/// `mm:ss`, truncating fractional seconds.
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Rounded to an integer with `,` separating thousands.
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{}", rounded.abs() as u64);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{table_from_json_str, EnemyConfig};
    use crate::snapshot::{UpgradeSlot, WeaponSlot};
    use std::collections::HashMap;

    fn refs() -> ReferenceData {
        let enemies: HashMap<String, EnemyConfig> = table_from_json_str(
            r#"{
                "grunt": {"name": "Grunt"},
                "brute": {"name": "Brute"},
                "warlord": {"name": "Warlord"}
            }"#,
        )
        .unwrap();
        ReferenceData::new(HashMap::new(), enemies, HashMap::new())
    }

    fn running() -> Snapshot {
        let enemies = EnemiesState {
            alive: 4,
            breakdown: BTreeMap::from([("grunt".into(), 1), ("brute".into(), 3)]),
            ..EnemiesState::default()
        };
        Snapshot {
            status: Status::Running,
            trial: 2,
            total_trials: 5,
            elapsed_seconds: 75.9,
            duration_seconds: 300.0,
            build_profile: Some("glass_cannon".into()),
            tower: Some(TowerState {
                hp: 400.0,
                max_hp: 1000.0,
                hp_fraction: 0.4,
                armor: 2.0,
                regen_per_second: 1.0,
            }),
            economy: Some(EconomyState {
                gold: 1250.0,
                total_earned: 4000.0,
                total_spent: 2750.0,
            }),
            combat: Some(CombatState::default()),
            enemies: Some(enemies),
            loadout: Some(vec![WeaponSlot {
                id: "arc_coil".into(),
                name: "Arc Coil".into(),
                stacks: 2,
                tier: 3,
                dps: 1234.4,
                range: 180.0,
            }]),
            upgrades: Some(vec![
                UpgradeSlot {
                    id: "thorns".into(),
                    count: 1,
                },
                UpgradeSlot {
                    id: "plating".into(),
                    count: 4,
                },
            ]),
            kills_by_type: Some(BTreeMap::from([
                ("grunt".into(), 30),
                ("brute".into(), 3),
            ])),
            recent_events: Some(vec![
                GameEvent {
                    timestamp: 10.0,
                    event_type: "wave_start".into(),
                    ..GameEvent::default()
                },
                GameEvent {
                    timestamp: 65.0,
                    event_type: "elite_spawn".into(),
                    enemy: Some("brute".into()),
                    ..GameEvent::default()
                },
            ]),
            hp_timeline: vec![1000.0, 950.0, 900.0],
            ..Snapshot::default()
        }
    }

    #[test]
    fn starting_resets_accumulators() {
        let mut view = DashboardView::default();
        view.apply(&running(), &refs());
        assert!(!view.kill_log.is_empty());

        let starting = Snapshot {
            status: Status::Starting,
            trial: 3,
            total_trials: 5,
            ..Snapshot::default()
        };
        view.apply(&starting, &refs());
        assert_eq!(view.tower, TowerState::default());
        assert_eq!(view.economy.gold, 0.0);
        assert!(view.kill_log.is_empty());
        assert!(view.events.is_empty());
        assert!(view.hp_timeline.is_empty());
        assert_eq!(view.banner.text, "STARTING — TRIAL 3/5");
        assert!(view.show_banner);
        assert!(!view.show_main_panels);
    }

    #[test]
    fn running_populates_sorted_views() {
        let mut view = DashboardView::default();
        view.apply(&running(), &refs());

        assert!(view.show_main_panels);
        assert!(!view.show_banner);
        assert_eq!(view.trial_display, "Trial 2 / 5");
        assert_eq!(view.elapsed_display, "01:15");
        assert_eq!(view.build_profile, "GLASS_CANNON");
        assert_eq!(view.health_tier, HealthTier::Warning);
        assert_eq!(view.economy.gold, 1250.0);

        let breakdown: Vec<_> = view.enemy_breakdown.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(breakdown, ["Brute", "Grunt"]);
        assert_eq!(view.kill_log[0].label, "Grunt");
        assert_eq!(view.kill_log[0].value, "30");
        assert_eq!(view.upgrades[0].label, "plating");
        assert_eq!(view.upgrades[0].value, "x4");
        assert_eq!(view.loadout[0].dps, "1,234 DPS");
        assert_eq!(view.loadout[0].tier, "T3");

        assert_eq!(view.events[0].label, "ELITE");
        assert_eq!(view.events[0].detail, "Brute");
        assert_eq!(view.events[1].label, "WAVE_START");
    }

    #[test]
    fn absent_sections_keep_previous_values() {
        let mut view = DashboardView::default();
        view.apply(&running(), &refs());

        let partial = Snapshot {
            status: Status::Survived,
            trial: 2,
            total_trials: 5,
            ..Snapshot::default()
        };
        view.apply(&partial, &refs());
        assert_eq!(view.tower.hp, 400.0);
        assert_eq!(view.economy.gold, 1250.0);
        assert_eq!(view.enemies.alive, 4);
        assert_eq!(view.hp_timeline.len(), 3);
        assert_eq!(view.kill_log.len(), 2);
        assert_eq!(view.upgrades.len(), 2);
        assert_eq!(view.loadout.len(), 1);
        assert_eq!(view.events.len(), 2);
        assert_eq!(view.banner.text, "SURVIVED");
        assert_eq!(view.banner.tone, BannerTone::Success);
        assert!(view.show_main_panels && view.show_banner);
    }

    #[test]
    fn present_empty_lists_clear_panels() {
        let mut view = DashboardView::default();
        view.apply(&running(), &refs());

        let cleared = Snapshot {
            status: Status::Dead,
            trial: 2,
            total_trials: 5,
            kills_by_type: Some(BTreeMap::new()),
            recent_events: Some(Vec::new()),
            ..Snapshot::default()
        };
        view.apply(&cleared, &refs());
        assert!(view.kill_log.is_empty());
        assert!(view.events.is_empty());
        assert_eq!(view.loadout.len(), 1);
        assert_eq!(view.upgrades.len(), 2);
    }

    #[test]
    fn dead_overlays_danger_banner() {
        let mut view = DashboardView::default();
        let mut dead = running();
        dead.status = Status::Dead;
        view.apply(&dead, &refs());
        assert_eq!(view.banner.text, "TOWER DESTROYED");
        assert_eq!(view.banner.tone, BannerTone::Danger);
    }

    #[test]
    fn idle_hides_panels_and_summarises() {
        let mut view = DashboardView::default();
        view.apply(&running(), &refs());
        let idle = Snapshot::from_json_str(
            r#"{"status":"idle","trial":5,"total_trials":5,"trials_completed":5,"survived":4}"#,
        )
        .unwrap();
        view.apply(&idle, &refs());
        assert!(!view.show_main_panels);
        assert_eq!(view.banner.text, "ALL TRIALS COMPLETE — 4/5 SURVIVED");
    }

    #[test]
    fn sparkline_scales_to_missing_health() {
        let points = sparkline_points(&[1000.0, 950.0, 900.0], 1000.0, 600.0, 50.0);
        assert_eq!(points, vec![(0.0, 0.0), (300.0, 2.5), (600.0, 5.0)]);
    }

    #[test]
    fn sparkline_clamps_and_requires_two_samples() {
        assert!(sparkline_points(&[500.0], 1000.0, 600.0, 50.0).is_empty());
        let points = sparkline_points(&[1500.0, -100.0], 1000.0, 600.0, 50.0);
        assert_eq!(points, vec![(0.0, 0.0), (600.0, 50.0)]);
    }

    #[test]
    fn single_sample_keeps_previous_sparkline() {
        let mut view = DashboardView::default();
        view.apply(&running(), &refs());
        let mut next = running();
        next.hp_timeline = vec![800.0];
        view.apply(&next, &refs());
        assert_eq!(view.hp_timeline.len(), 3);
    }

    #[test]
    fn health_tier_thresholds() {
        assert_eq!(HealthTier::from_fraction(0.61), HealthTier::Healthy);
        assert_eq!(HealthTier::from_fraction(0.6), HealthTier::Warning);
        assert_eq!(HealthTier::from_fraction(0.31), HealthTier::Warning);
        assert_eq!(HealthTier::from_fraction(0.3), HealthTier::Critical);
    }

    #[test]
    fn events_format_per_type() {
        let refs = refs();
        let purchase = GameEvent {
            timestamp: 125.0,
            event_type: "purchase".into(),
            kind: Some("weapon".into()),
            name: Some("Arc Coil".into()),
            cost: Some(1500),
            ..GameEvent::default()
        };
        let entry = format_event(&purchase, &refs);
        assert_eq!(entry.time, "02:05");
        assert_eq!(entry.detail, "Arc Coil (weapon) — 1,500g");
        assert_eq!(entry.tone, EventTone::Purchase);

        let escort = GameEvent {
            event_type: "escort_spawn".into(),
            leader: Some("warlord".into()),
            count: Some(3),
            ..GameEvent::default()
        };
        assert_eq!(format_event(&escort, &refs).detail, "Warlord (+3 scouts)");

        let unpriced = GameEvent {
            event_type: "purchase".into(),
            kind: Some("upgrade".into()),
            name: Some("Thorns".into()),
            ..GameEvent::default()
        };
        assert_eq!(format_event(&unpriced, &refs).detail, "Thorns (upgrade) — g");

        let unknown_elite = GameEvent {
            event_type: "elite_spawn".into(),
            enemy: Some("lich".into()),
            ..GameEvent::default()
        };
        assert_eq!(format_event(&unknown_elite, &refs).detail, "lich");
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.6), "1,000");
        assert_eq!(format_thousands(1234567.0), "1,234,567");
        assert_eq!(format_clock(3599.9), "59:59");
        assert_eq!(format_clock(-3.0), "00:00");
    }
}
