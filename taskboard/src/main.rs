//! `Taskboard` — terminal task board with live updates.
//!
//! Mounts a board for an admin's team or a single employee, renders it with
//! ratatui, and forwards key presses to the background view. Configuration
//! via CLI flags, environment variables, or config file
//! (`~/.config/taskboard/config.toml`).
//!
//! ```bash
//! # Team board for admin 1 against a local hub
//! cargo run --bin taskboard -- --api-url http://127.0.0.1:9400 --owner 1
//!
//! # An employee's own board
//! TASKBOARD_API_URL=http://127.0.0.1:9400 TASKBOARD_EMPLOYEE=4 cargo run
//! ```

use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;

use taskboard::app::App;
use taskboard::config::{CliArgs, ClientConfig};
use taskboard::net::{self, BoardConfig};
use taskboard::ui;
use taskboard::view::{BoardCommand, BoardUpdate, Notice, NoticeLevel};

/// How long to wait for a key press before redrawing.
const POLL_TIMEOUT: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Logs go to a file; the terminal belongs to ratatui.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    let board_config = match config.to_board_config() {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Pass --api-url and --owner (or --employee), or set them in the config file.");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(scope = %board_config.scope, "taskboard starting");

    match run(board_config).await {
        Ok(()) => {
            tracing::info!("taskboard exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown so buffered
/// log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskboard.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_env("TASKBOARD_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Mounts the board, then drives the terminal until the user quits.
async fn run(config: BoardConfig) -> io::Result<()> {
    let scope_label = config.scope.to_string();
    let query = config.query.clone();

    let (cmd_tx, mut update_rx) = net::spawn_board(config)
        .await
        .map_err(|e| io::Error::other(format!("could not mount board: {e}")))?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(scope_label, query);
    let result = run_app(&mut terminal, &mut app, &cmd_tx, &mut update_rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Main application loop.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    cmd_tx: &mpsc::Sender<BoardCommand>,
    update_rx: &mut mpsc::Receiver<BoardUpdate>,
) -> io::Result<()> {
    loop {
        while let Ok(update) = update_rx.try_recv() {
            app.apply_update(update);
        }

        terminal.draw(|frame| ui::draw(frame, app))?;

        if event::poll(POLL_TIMEOUT)?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if let Some(command) = app.handle_key_event(key) {
                match cmd_tx.try_send(command) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => app.push_notice(Notice {
                        level: NoticeLevel::Warning,
                        message: "Board busy, action dropped".to_string(),
                    }),
                    Err(mpsc::error::TrySendError::Closed(_)) => app.push_notice(Notice {
                        level: NoticeLevel::Error,
                        message: "Board closed, action not sent".to_string(),
                    }),
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
