// src/main.rs

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use color_eyre::eyre::{eyre, Result};
use ratatui::prelude::*;
use std::io::{stdout, Stdout};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use netspecter_rs::config::ScannerConfig;
use netspecter_rs::core::events::{EventSink, ScanEvent};
use netspecter_rs::core::scanner::Scanner;
use netspecter_rs::logging::initialize_logging;

mod app;
mod ui;

use app::{App, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let log_path = initialize_logging()?;
    info!(path = %log_path.display(), "Logging initialized.");

    let config = ScannerConfig::load()?;
    let scanner = Scanner::new(config);

    match std::env::args().nth(1) {
        Some(target) => run_headless(&scanner, &target).await,
        None => run_tui(scanner).await,
    }
}

/// Scans a single target without a terminal UI.
///
/// Progress lines go to stderr and the report is printed to stdout as JSON. Ctrl-C
/// cancels the scan, which still prints whatever report the pipeline produced.
async fn run_headless(scanner: &Scanner, target: &str) -> Result<()> {
    let (sink, mut rx) = EventSink::channel();
    let cancel = CancellationToken::new();
    let handle = scanner.spawn_scan(target, sink, cancel.clone());

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling scan.");
                cancel.cancel();
            }
        }
    });

    let mut report = None;
    while let Some(event) = rx.recv().await {
        match event {
            ScanEvent::Progress(line) => eprintln!("{line}"),
            ScanEvent::Done(done) => {
                report = Some(done);
                break;
            }
        }
    }
    handle.await?;

    let report = report.ok_or_else(|| eyre!("scan ended without a report"))?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.is_failed() {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_tui(scanner: Scanner) -> Result<()> {
    // --- Setup ---
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let mut app = App::new(scanner);
    let result = run_app(&mut terminal, &mut app);
    app.cancel_scan();

    // --- Restore Terminal ---
    stdout().execute(LeaveAlternateScreen)?;
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key.code);
                }
            }
        }

        app.on_tick();
    }
    Ok(())
}

fn handle_key(app: &mut App, key_code: KeyCode) {
    match app.state {
        AppState::Disclaimer => match key_code {
            KeyCode::Enter => app.acknowledge_disclaimer(),
            KeyCode::Char('q') | KeyCode::Esc => app.quit(),
            _ => {}
        },
        AppState::Idle => handle_idle_input(app, key_code),
        AppState::Scanning => match key_code {
            KeyCode::Char('q') => app.quit(),
            KeyCode::Esc | KeyCode::Char('c') => app.cancel_scan(),
            KeyCode::Char('l') => app.toggle_logs(),
            KeyCode::Left => app.scroll_logs_left(),
            KeyCode::Right => app.scroll_logs_right(),
            _ => {}
        },
        AppState::Finished => handle_finished_input(app, key_code),
    }
}

/// The target box owns every printable key, so quitting from here is on Esc.
fn handle_idle_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Esc => app.quit(),
        KeyCode::Char(c) => app.input.push(c),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Enter => app.start_scan(),
        _ => {}
    }
}

fn handle_finished_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
        KeyCode::Char('n') => app.reset(),
        KeyCode::Char('e') => app.export_report(),
        KeyCode::Char('l') => app.toggle_logs(),
        KeyCode::Up => app.select_previous(),
        KeyCode::Down => app.select_next(),
        KeyCode::Left => app.scroll_logs_left(),
        KeyCode::Right => app.scroll_logs_right(),
        _ => {}
    }
}
