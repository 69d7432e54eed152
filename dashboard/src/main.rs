use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use core_telemetry::{
    load_watcher_config_from_env, GameLayout, LiveStateWatcher, ReferenceData, SettingsStore,
};
use tracing::{info, warn};

mod app;
mod ui;

use app::{channel, DashboardApp};

#[derive(Clone)]
struct ChannelWriter {
    sender: Sender<String>,
}

impl std::io::Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(text) = String::from_utf8(buf.to_vec()) {
            let _ = self.sender.send(text);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Live dashboard for tower-defense simulation runs",
    long_about = None
)]
struct Cli {
    /// Root of the game folder (the one containing `reports/` and `data/`).
    #[arg(long)]
    game_path: Option<PathBuf>,
    /// Settings file to use instead of the per-user default.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Ignore the saved game path and ask for a new one.
    #[arg(long)]
    reset_path: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let (log_tx, log_rx) = mpsc::channel::<String>();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .with_writer(move || ChannelWriter {
            sender: log_tx.clone(),
        })
        .init();

    let cli = Cli::parse();
    let store = match cli.settings {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::default_location()?,
    };
    let saved = if cli.reset_path {
        None
    } else {
        store.load_game_path()
    };

    let game_path = match cli.game_path.or(saved) {
        Some(path) if path.is_dir() => path,
        Some(path) => return Err(eyre!("game folder {} does not exist", path.display())),
        None => match prompt_for_game_path()? {
            Some(path) => path,
            None => return Ok(()),
        },
    };
    if let Err(err) = store.save_game_path(&game_path) {
        warn!(path = %store.path().display(), "Failed to save settings: {}", err);
    }

    let layout = GameLayout::new(&game_path);
    let refs = ReferenceData::load(&layout).unwrap_or_else(|err| {
        warn!("Reference data unavailable, showing raw ids: {}", err);
        ReferenceData::default()
    });

    let (sender, receiver) = channel();
    let mut watcher =
        LiveStateWatcher::new(layout.live_state_path(), load_watcher_config_from_env());
    watcher.subscribe(move |snapshot| {
        let _ = sender.send(Arc::clone(snapshot));
    });
    watcher
        .start()
        .wrap_err_with(|| format!("cannot watch {}", layout.reports_dir().display()))?;
    info!("Watching {}", watcher.path().display());

    let refresh = watcher.refresh_handle();
    let watched_path = watcher.path().display().to_string();
    let ui = tokio::task::spawn_blocking(move || -> Result<()> {
        let app = DashboardApp::new(receiver, refs, refresh, log_rx, watched_path)?;
        app.run()
    });
    let outcome = ui.await?;

    watcher.stop();
    outcome
}

/// Ask on stdin until an existing directory is entered. Empty input or end
/// of input cancels.
fn prompt_for_game_path() -> Result<Option<PathBuf>> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    writeln!(stdout, "Game folder path")?;
    writeln!(
        stdout,
        "Enter the root of the game folder (contains reports/ and data/). Leave empty to exit."
    )?;

    let mut line = String::new();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        match parse_game_path(&line) {
            PathInput::Cancel => return Ok(None),
            PathInput::Accepted(path) => return Ok(Some(path)),
            PathInput::Missing => {
                writeln!(stdout, "Directory not found. Please enter a valid path.")?;
            }
        }
    }
}

#[derive(Debug, PartialEq)]
enum PathInput {
    Cancel,
    Missing,
    Accepted(PathBuf),
}

fn parse_game_path(input: &str) -> PathInput {
    let candidate = input.trim();
    if candidate.is_empty() {
        return PathInput::Cancel;
    }
    let path = PathBuf::from(candidate);
    if path.is_dir() {
        PathInput::Accepted(path)
    } else {
        PathInput::Missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_input_is_validated() {
        assert_eq!(parse_game_path("   \n"), PathInput::Cancel);

        let dir = std::env::temp_dir();
        let entered = format!("  {}\n", dir.display());
        assert_eq!(parse_game_path(&entered), PathInput::Accepted(dir.clone()));

        let missing = dir.join("no-such-game-folder-7f3a");
        assert_eq!(
            parse_game_path(&missing.display().to_string()),
            PathInput::Missing
        );
    }
}
