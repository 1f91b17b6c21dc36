// src/app.rs

use std::path::{Path, PathBuf};

use chrono::Utc;
use netspecter_rs::core::events::{EventSink, ScanEvent};
use netspecter_rs::core::metrics::MetricsSnapshot;
use netspecter_rs::core::models::ScanReport;
use netspecter_rs::core::scanner::Scanner;
use netspecter_rs::logging::get_data_dir;
use ratatui::widgets::{ListState, ScrollbarState};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub const SPINNER_CHARS: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// How many score points the gauge advances per tick.
const SCORE_ANIMATION_STEP: f64 = 2.0;

pub enum ExportStatus {
    Idle,
    Success(String),
    Error(String),
}

pub enum AppState {
    Disclaimer,
    Idle,
    Scanning,
    Finished,
}

pub struct App {
    pub should_quit: bool,
    pub state: AppState,
    pub input: String,
    pub scan_report: Option<ScanReport>,
    pub log_content: Vec<String>,
    pub show_logs: bool,
    pub log_horizontal_scroll: usize,
    pub log_horizontal_scroll_state: ScrollbarState,
    pub analysis_list_state: ListState,
    pub spinner_frame: usize,
    pub displayed_score: f64,
    pub export_status: ExportStatus,
    pub metrics: MetricsSnapshot,
    scanner: Scanner,
    events: Option<UnboundedReceiver<ScanEvent>>,
    cancel: Option<CancellationToken>,
}

impl App {
    pub fn new(scanner: Scanner) -> Self {
        let metrics = scanner.metrics().snapshot();
        Self {
            should_quit: false,
            state: AppState::Disclaimer,
            input: String::new(),
            scan_report: None,
            log_content: Vec::new(),
            show_logs: true,
            log_horizontal_scroll: 0,
            log_horizontal_scroll_state: ScrollbarState::default(),
            analysis_list_state: ListState::default(),
            spinner_frame: 0,
            displayed_score: 0.0,
            export_status: ExportStatus::Idle,
            metrics,
            scanner,
            events: None,
            cancel: None,
        }
    }

    pub fn acknowledge_disclaimer(&mut self) {
        self.state = AppState::Idle;
    }

    /// Starts a scan of the current input. Must be called from within the tokio runtime.
    pub fn start_scan(&mut self) {
        if self.input.trim().is_empty() {
            return;
        }

        let (sink, rx) = EventSink::channel();
        let cancel = CancellationToken::new();
        info!(input = %self.input, "Starting scan from TUI.");
        self.scanner.spawn_scan(&self.input, sink, cancel.clone());

        self.log_content.clear();
        self.log_horizontal_scroll = 0;
        self.events = Some(rx);
        self.cancel = Some(cancel);
        self.state = AppState::Scanning;
    }

    /// Cancels the running scan, if any. Its report still arrives through `on_tick`.
    pub fn cancel_scan(&mut self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
    }

    /// Drains pending scan events and advances the animations.
    pub fn on_tick(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_CHARS.len();
        self.drain_events();

        if let Some(report) = &self.scan_report {
            if self.displayed_score < report.threat_score {
                self.displayed_score = (self.displayed_score + SCORE_ANIMATION_STEP).min(report.threat_score);
            }
        }
        self.metrics = self.scanner.metrics().snapshot();
    }

    fn drain_events(&mut self) {
        let Some(rx) = self.events.as_mut() else {
            return;
        };

        while let Ok(event) = rx.try_recv() {
            match event {
                ScanEvent::Progress(line) => self.log_content.push(line),
                ScanEvent::Done(report) => {
                    self.finish_scan(*report);
                    return;
                }
            }
        }
    }

    fn finish_scan(&mut self, report: ScanReport) {
        self.analysis_list_state = ListState::default();
        if !report.vulnerabilities.is_empty() {
            self.analysis_list_state.select(Some(0));
        }
        self.displayed_score = 0.0;
        self.scan_report = Some(report);
        self.events = None;
        self.cancel = None;
        self.state = AppState::Finished;
    }

    pub fn select_next(&mut self) {
        let count = self.finding_count();
        if count == 0 {
            return;
        }
        let next = self.analysis_list_state.selected().map_or(0, |i| (i + 1).min(count - 1));
        self.analysis_list_state.select(Some(next));
    }

    pub fn select_previous(&mut self) {
        if self.finding_count() == 0 {
            return;
        }
        let previous = self.analysis_list_state.selected().map_or(0, |i| i.saturating_sub(1));
        self.analysis_list_state.select(Some(previous));
    }

    fn finding_count(&self) -> usize {
        self.scan_report.as_ref().map_or(0, |r| r.vulnerabilities.len())
    }

    pub fn toggle_logs(&mut self) {
        self.show_logs = !self.show_logs;
    }

    pub fn scroll_logs_left(&mut self) {
        self.log_horizontal_scroll = self.log_horizontal_scroll.saturating_sub(4);
        self.log_horizontal_scroll_state = self.log_horizontal_scroll_state.position(self.log_horizontal_scroll);
    }

    pub fn scroll_logs_right(&mut self) {
        self.log_horizontal_scroll = self.log_horizontal_scroll.saturating_add(4);
        self.log_horizontal_scroll_state = self.log_horizontal_scroll_state.position(self.log_horizontal_scroll);
    }

    /// Writes the finished report as JSON into the data directory.
    pub fn export_report(&mut self) {
        let Some(report) = &self.scan_report else {
            return;
        };
        self.export_status = match write_report(report, &get_data_dir()) {
            Ok(path) => {
                info!(path = %path.display(), "Report exported.");
                ExportStatus::Success(path.display().to_string())
            }
            Err(e) => {
                error!(error = %e, "Report export failed.");
                ExportStatus::Error(e.to_string())
            }
        };
    }

    pub fn quit(&mut self) {
        self.cancel_scan();
        self.should_quit = true;
    }

    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.input = String::new();
        self.scan_report = None;
        self.log_content.clear();
        self.log_horizontal_scroll = 0;
        self.log_horizontal_scroll_state = ScrollbarState::default();
        self.analysis_list_state = ListState::default();
        self.displayed_score = 0.0;
        self.export_status = ExportStatus::Idle;
    }
}

fn write_report(report: &ScanReport, directory: &Path) -> color_eyre::Result<PathBuf> {
    std::fs::create_dir_all(directory)?;
    let path = directory.join(export_file_name(&report.target, &Utc::now().format("%Y%m%d-%H%M%S").to_string()));
    std::fs::write(&path, serde_json::to_string_pretty(report)?)?;
    Ok(path)
}

fn export_file_name(target: &str, stamp: &str) -> String {
    let safe_target: String = target
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    let safe_target = if safe_target.is_empty() { "unknown".to_string() } else { safe_target };
    format!("report_{safe_target}_{stamp}.json")
}
