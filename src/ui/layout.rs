// src/ui/layout.rs

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Screen regions, computed once per frame.
pub struct AppLayout {
    pub input: Rect,
    pub findings: Rect,
    pub summary: Rect,
    /// Only present while the scan log is toggled on.
    pub log_panel: Option<Rect>,
    pub footer: Rect,
}

/// Creates the complete application layout.
///
/// The frame is split vertically into the target input, the content area and a
/// one-line footer. The content area holds the findings and the summary side by
/// side, plus the live scan log when `show_logs` is set.
pub fn create_layout(frame_size: Rect, show_logs: bool) -> AppLayout {
    let [input, content, footer] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
        .areas(frame_size);

    if show_logs {
        let [findings, summary, log_panel] = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(30), Constraint::Percentage(35)])
            .areas(content);
        AppLayout { input, findings, summary, log_panel: Some(log_panel), footer }
    } else {
        let [findings, summary] = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .areas(content);
        AppLayout { input, findings, summary, log_panel: None, footer }
    }
}
