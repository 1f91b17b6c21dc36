// src/ui/widgets/analysis_view.rs

use crate::app::{App, AppState, SPINNER_CHARS};
use netspecter_rs::core::models::Severity;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    text::Line,
};

pub fn severity_style(severity: Severity) -> Style {
    match severity {
        Severity::Critical => Style::default().fg(Color::Red).bold(),
        Severity::High => Style::default().fg(Color::LightRed),
        Severity::Medium => Style::default().fg(Color::Yellow),
        Severity::Low => Style::default().fg(Color::Cyan),
    }
}

pub fn render_analysis_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let main_block = Block::default()
        .borders(Borders::ALL)
        .title("Findings (Navigate with ↑ ↓)");

    let report = match (&app.state, &app.scan_report) {
        (AppState::Finished, Some(report)) => report,
        (AppState::Scanning, _) => {
            let spinner_char = SPINNER_CHARS[app.spinner_frame];
            let content = Paragraph::new(Line::from(vec![
                Span::styled(format!("{spinner_char} "), Style::default().fg(Color::Cyan)),
                Span::raw(format!("Scanning... {} lines received.", app.log_content.len())),
            ]))
            .alignment(Alignment::Center);
            frame.render_widget(content.block(main_block), area);
            return;
        }
        _ => {
            let content = Paragraph::new("Scan results will appear here...").alignment(Alignment::Center);
            frame.render_widget(content.block(main_block), area);
            return;
        }
    };

    let inner_area = main_block.inner(area);
    frame.render_widget(main_block, area);

    let [list_area, detail_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Min(0)])
        .areas(inner_area);

    let items: Vec<ListItem> = report
        .vulnerabilities
        .iter()
        .map(|v| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("[{:<8}] ", v.severity.to_string().to_uppercase()), severity_style(v.severity)),
                Span::raw(v.kind.as_str()),
            ]))
        })
        .collect();

    let findings_list = List::new(items)
        .highlight_style(Style::new().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    frame.render_stateful_widget(findings_list, list_area, &mut app.analysis_list_state);

    let detail_block = Block::default().borders(Borders::TOP).title("Details");
    let selected = app.analysis_list_state.selected().and_then(|i| report.vulnerabilities.get(i));

    let text = match selected {
        Some(finding) => Text::from(vec![
            Line::from(""),
            Line::from("WHAT IT IS:".yellow().bold()),
            Line::from(finding.description.as_str()),
            Line::from(""),
            Line::from("HOW TO FIX:".yellow().bold()),
            Line::from(finding.remediation.as_str()),
        ]),
        None if report.is_failed() => Text::from(vec![
            Line::from(""),
            Line::from("✗ SCAN FAILED".bold().fg(Color::Red)),
            Line::from(""),
            Line::from(report.summary.as_str()),
        ]),
        None => Text::from(vec![
            Line::from(""),
            Line::from("✓ NO FINDINGS".bold().fg(Color::Green)),
            Line::from(""),
            Line::from("Every audited header is present and the host answered over HTTP(S)."),
        ]),
    };

    let alignment = if selected.is_some() { Alignment::Left } else { Alignment::Center };
    let details = Paragraph::new(text).wrap(Wrap { trim: true }).alignment(alignment).block(detail_block);
    frame.render_widget(details, detail_area);
}
