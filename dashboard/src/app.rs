use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};

use color_eyre::Result;
use core_telemetry::{RefreshHandle, ReferenceData, Snapshot};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::*;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{info, trace};

use crate::ui::{draw_ui, UiState};

const DRAW_INTERVAL: Duration = Duration::from_millis(100);
const INPUT_POLL: Duration = Duration::from_millis(50);

pub struct DashboardApp {
    terminal: Terminal<CrosstermBackend<std::io::Stdout>>,
    ui_state: UiState,
    receiver: UnboundedReceiver<Arc<Snapshot>>,
    refs: ReferenceData,
    refresh: Option<RefreshHandle>,
    log_receiver: Receiver<String>,
}

impl DashboardApp {
    pub fn new(
        receiver: UnboundedReceiver<Arc<Snapshot>>,
        refs: ReferenceData,
        refresh: Option<RefreshHandle>,
        log_receiver: Receiver<String>,
        watched_path: String,
    ) -> Result<Self> {
        let stdout = std::io::stdout();
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        crossterm::terminal::enable_raw_mode()?;
        terminal.clear()?;
        terminal.hide_cursor()?;
        Ok(Self {
            terminal,
            ui_state: UiState::new(watched_path),
            receiver,
            refs,
            refresh,
            log_receiver,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let mut last_draw: Option<Instant> = None;

        loop {
            while let Ok(snapshot) = self.receiver.try_recv() {
                trace!(status = %snapshot.status, trial = snapshot.trial, "snapshot.applied");
                self.ui_state.apply_snapshot(&snapshot, &self.refs);
            }

            while let Ok(line) = self.log_receiver.try_recv() {
                self.ui_state.push_log(line);
            }

            if last_draw.map_or(true, |drawn| drawn.elapsed() >= DRAW_INTERVAL) {
                self.terminal.draw(|frame| draw_ui(frame, &self.ui_state))?;
                last_draw = Some(Instant::now());
            }

            if event::poll(INPUT_POLL)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => break,
                        KeyCode::Char('r') => match &self.refresh {
                            Some(handle) => {
                                handle.refresh();
                                info!("Refresh requested");
                            }
                            None => self.ui_state.push_log("Watcher is not running"),
                        },
                        _ => {}
                    }
                }
            }
        }

        self.terminal.clear()?;
        self.terminal.show_cursor()?;
        crossterm::terminal::disable_raw_mode()?;
        Ok(())
    }
}

pub fn channel() -> (UnboundedSender<Arc<Snapshot>>, UnboundedReceiver<Arc<Snapshot>>) {
    unbounded_channel()
}
