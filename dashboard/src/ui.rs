use std::collections::VecDeque;

use ratatui::layout::{Constraint, Direction, Layout, Margin};
use ratatui::prelude::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, Gauge, GraphType, Paragraph, Wrap};
use ratatui::Frame;

use core_telemetry::view::{format_thousands, DisplayEntry, SPARKLINE_HEIGHT, SPARKLINE_WIDTH};
use core_telemetry::{BannerTone, DashboardView, EventTone, HealthTier, ReferenceData, Snapshot};

pub struct UiState {
    pub view: DashboardView,
    pub snapshots_received: u64,
    pub logs: VecDeque<String>,
    pub max_logs: usize,
    pub watched_path: String,
}

impl UiState {
    pub fn new(watched_path: impl Into<String>) -> Self {
        Self {
            view: DashboardView::default(),
            snapshots_received: 0,
            logs: VecDeque::new(),
            max_logs: 6,
            watched_path: watched_path.into(),
        }
    }

    pub fn apply_snapshot(&mut self, snapshot: &Snapshot, refs: &ReferenceData) {
        self.view.apply(snapshot, refs);
        self.snapshots_received += 1;
    }

    pub fn push_log<S: Into<String>>(&mut self, line: S) {
        let mut text: String = line.into();
        while text.ends_with('\n') || text.ends_with('\r') {
            text.pop();
        }
        if text.is_empty() {
            return;
        }
        self.logs.push_front(text);
        while self.logs.len() > self.max_logs {
            self.logs.pop_back();
        }
    }
}

pub fn tier_color(tier: HealthTier) -> Color {
    match tier {
        HealthTier::Healthy => Color::Rgb(0, 200, 120),
        HealthTier::Warning => Color::Rgb(230, 180, 30),
        HealthTier::Critical => Color::Rgb(220, 50, 50),
    }
}

pub fn banner_color(tone: BannerTone) -> Color {
    match tone {
        BannerTone::Info => Color::Rgb(100, 160, 255),
        BannerTone::Success => Color::Rgb(0, 200, 120),
        BannerTone::Danger => Color::Rgb(220, 50, 50),
    }
}

pub fn event_color(tone: EventTone) -> Color {
    match tone {
        EventTone::Purchase => Color::Rgb(80, 220, 120),
        EventTone::Elite => Color::Rgb(220, 60, 60),
        EventTone::Escort => Color::Rgb(230, 200, 50),
        EventTone::Neutral => Color::Rgb(180, 180, 180),
    }
}

pub fn draw_ui(frame: &mut Frame, state: &UiState) {
    let view = &state.view;
    let banner_height = if view.show_banner { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(banner_height),
            Constraint::Min(8),
            Constraint::Length(state.max_logs as u16 + 2),
        ])
        .split(frame.size());

    draw_header(frame, chunks[0], state);
    if view.show_banner {
        draw_banner(frame, chunks[1], view);
    }
    if view.show_main_panels {
        draw_panels(frame, chunks[2], view);
    }
    draw_logs(frame, chunks[3], state);
}

fn draw_header(frame: &mut Frame, area: Rect, state: &UiState) {
    let view = &state.view;
    let block = Block::default()
        .borders(Borders::ALL)
        .title("TD Sim Dashboard");
    let mut spans = vec![
        Span::styled(
            view.status.as_str().to_uppercase(),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw(format!(" | {}", view.trial_display)),
        Span::raw(format!(
            " | {} / {}",
            view.elapsed_display, view.duration_display
        )),
    ];
    if !view.build_profile.is_empty() {
        spans.push(Span::styled(
            format!(" | {}", view.build_profile),
            Style::default().fg(Color::Cyan),
        ));
    }
    spans.push(Span::raw(format!(
        " | x{:.2} | seed {} | updates {} | r refresh, q exit",
        view.difficulty_scalar, view.seed, state.snapshots_received
    )));
    let text = Paragraph::new(Line::from(spans)).wrap(Wrap { trim: true });
    frame.render_widget(block, area);
    frame.render_widget(
        text,
        area.inner(&Margin {
            vertical: 1,
            horizontal: 1,
        }),
    );
}

fn draw_banner(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let color = banner_color(view.banner.tone);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));
    let text = Paragraph::new(Line::from(Span::styled(
        view.banner.text.clone(),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )))
    .alignment(ratatui::layout::Alignment::Center)
    .block(block);
    frame.render_widget(text, area);
}

fn draw_panels(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(9),
            Constraint::Min(6),
        ])
        .split(area);

    draw_gauges(frame, rows[0], view);

    let stats = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(rows[1]);
    draw_tower(frame, stats[0], view);
    draw_economy(frame, stats[1], view);
    draw_combat(frame, stats[2], view);
    draw_enemies(frame, stats[3], view);

    let lists = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(22),
            Constraint::Percentage(16),
            Constraint::Percentage(16),
            Constraint::Percentage(22),
            Constraint::Percentage(24),
        ])
        .split(rows[2]);
    draw_loadout(frame, lists[0], view);
    draw_entries(frame, lists[1], "Upgrades", &view.upgrades);
    draw_entries(frame, lists[2], "Kills", &view.kill_log);
    draw_events(frame, lists[3], view);
    draw_hp_timeline(frame, lists[4], view);
}

fn draw_gauges(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let hp = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Tower HP"))
        .gauge_style(Style::default().fg(tier_color(view.health_tier)))
        .ratio(view.tower.hp_fraction.clamp(0.0, 1.0))
        .label(format!(
            "{} / {} ({:.0}%)",
            format_thousands(view.tower.hp),
            format_thousands(view.tower.max_hp),
            view.tower.hp_fraction * 100.0
        ));
    frame.render_widget(hp, halves[0]);

    let time = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Time"))
        .gauge_style(Style::default().fg(Color::Rgb(100, 160, 255)))
        .ratio((view.time_progress / 100.0).clamp(0.0, 1.0))
        .label(format!(
            "{} / {}",
            view.elapsed_display, view.duration_display
        ));
    frame.render_widget(time, halves[1]);
}

fn stat_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<10}"), Style::default().fg(Color::DarkGray)),
        Span::raw(value),
    ])
}

fn draw_tower(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let tower = &view.tower;
    let lines = vec![
        stat_line("HP", format_thousands(tower.hp)),
        stat_line("Max HP", format_thousands(tower.max_hp)),
        stat_line("Armor", format!("{:.1}", tower.armor)),
        stat_line("Regen/s", format!("{:.1}", tower.regen_per_second)),
    ];
    render_panel(frame, area, "Tower", lines);
}

fn draw_economy(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let economy = &view.economy;
    let lines = vec![
        stat_line("Gold", format_thousands(economy.gold)),
        stat_line("Earned", format_thousands(economy.total_earned)),
        stat_line("Spent", format_thousands(economy.total_spent)),
    ];
    render_panel(frame, area, "Economy", lines);
}

fn draw_combat(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let combat = &view.combat;
    let lines = vec![
        stat_line("Dealt", format_thousands(combat.total_damage_dealt)),
        stat_line("HP spawned", format_thousands(combat.total_hp_spawned)),
        stat_line("Taken", format_thousands(combat.total_tower_damage_taken)),
        stat_line("Healing", format_thousands(combat.total_healing)),
        stat_line("CC uptime", format!("{:.1}%", combat.cc_uptime_fraction * 100.0)),
        stat_line("Diff mult", format!("{:.2}", combat.difficulty_multiplier)),
    ];
    render_panel(frame, area, "Combat", lines);
}

fn draw_enemies(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let enemies = &view.enemies;
    let mut lines = vec![
        stat_line(
            "Alive",
            format!("{} (peak {})", enemies.alive, enemies.peak_alive),
        ),
        stat_line("Spawned", enemies.total_spawned.to_string()),
        stat_line("Killed", enemies.total_killed.to_string()),
        stat_line("Leaked", enemies.total_leaked.to_string()),
        stat_line(
            "Elite/Esc",
            format!("{} / {}", enemies.elites_spawned, enemies.escorts_spawned),
        ),
    ];
    lines.extend(
        view.enemy_breakdown
            .iter()
            .map(|entry| stat_line(&entry.label, entry.value.clone())),
    );
    render_panel(frame, area, "Enemies", lines);
}

fn draw_loadout(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let lines: Vec<Line> = view
        .loadout
        .iter()
        .map(|slot| {
            Line::from(vec![
                Span::styled(slot.name.clone(), Style::default().fg(Color::Cyan)),
                Span::raw(format!(
                    " {} {} {} {}",
                    slot.stacks, slot.tier, slot.dps, slot.range
                )),
            ])
        })
        .collect();
    render_panel(frame, area, "Loadout", lines);
}

fn draw_entries(frame: &mut Frame, area: Rect, title: &str, entries: &[DisplayEntry]) {
    let lines: Vec<Line> = entries
        .iter()
        .map(|entry| stat_line(&entry.label, entry.value.clone()))
        .collect();
    render_panel(frame, area, title, lines);
}

fn draw_events(frame: &mut Frame, area: Rect, view: &DashboardView) {
    let lines: Vec<Line> = view
        .events
        .iter()
        .map(|event| {
            Line::from(vec![
                Span::styled(event.time.clone(), Style::default().fg(Color::DarkGray)),
                Span::raw(" "),
                Span::styled(
                    format!("{:<8}", event.label),
                    Style::default().fg(event_color(event.tone)),
                ),
                Span::raw(event.detail.clone()),
            ])
        })
        .collect();
    render_panel(frame, area, "Events", lines);
}

fn draw_hp_timeline(frame: &mut Frame, area: Rect, view: &DashboardView) {
    // Chart y grows upwards, the projected points grow downwards.
    let points: Vec<(f64, f64)> = view
        .hp_timeline
        .iter()
        .map(|(x, y)| (*x, SPARKLINE_HEIGHT - y))
        .collect();
    let dataset = Dataset::default()
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(tier_color(view.health_tier)))
        .data(&points);
    let chart = Chart::new(vec![dataset])
        .block(Block::default().borders(Borders::ALL).title("HP Timeline"))
        .x_axis(Axis::default().bounds([0.0, SPARKLINE_WIDTH]))
        .y_axis(Axis::default().bounds([0.0, SPARKLINE_HEIGHT]));
    frame.render_widget(chart, area);
}

fn draw_logs(frame: &mut Frame, area: Rect, state: &UiState) {
    let lines: Vec<Line> = state
        .logs
        .iter()
        .map(|entry| Line::from(Span::raw(entry)))
        .collect();
    let block = Block::default().borders(Borders::ALL).title(format!(
        "Logs | {}",
        state.watched_path
    ));
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(block, area);
    frame.render_widget(
        paragraph,
        area.inner(&Margin {
            vertical: 1,
            horizontal: 1,
        }),
    );
}

fn render_panel(frame: &mut Frame, area: Rect, title: &str, lines: Vec<Line>) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(block, area);
    frame.render_widget(
        paragraph,
        area.inner(&Margin {
            vertical: 1,
            horizontal: 1,
        }),
    );
}
