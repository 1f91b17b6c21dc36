// src/ui/widgets/footer.rs

use crate::app::{App, AppState, ExportStatus};
use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
};

fn key(label: &str) -> Span<'_> {
    Span::styled(label, Style::new().bold().fg(Color::Yellow))
}

/// Renders the footer widget, which displays available actions.
pub fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let line = match app.state {
        AppState::Disclaimer => Line::from(vec![key("Enter"), Span::raw(" to acknowledge, "), key("Q"), Span::raw(" to quit.")]),
        AppState::Idle => Line::from(vec![
            Span::raw("Press "),
            key("Enter"),
            Span::raw(" to scan, "),
            key("Esc"),
            Span::raw(" to quit."),
        ]),
        AppState::Scanning => Line::from(vec![
            Span::raw("Scanning... "),
            key("[C]"),
            Span::raw("ancel, "),
            key("[L]"),
            Span::raw("ogs, "),
            key("[Q]"),
            Span::raw("uit"),
        ]),
        AppState::Finished => match &app.export_status {
            ExportStatus::Success(path) => Line::from(vec![Span::styled("Exported to ", Style::new().fg(Color::Green)), Span::raw(path.as_str())]),
            ExportStatus::Error(e) => Line::from(Span::styled(format!("Export failed: {e}"), Style::new().fg(Color::Red))),
            ExportStatus::Idle => Line::from(vec![
                key("[N]"),
                Span::raw("ew Scan, "),
                key("[E]"),
                Span::raw("xport JSON, "),
                key("[L]"),
                Span::raw("ogs, "),
                key("[Q]"),
                Span::raw("uit"),
            ]),
        },
    };

    frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}
