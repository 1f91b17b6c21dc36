// src/ui/widgets/summary.rs

use crate::app::{App, AppState};
use netspecter_rs::core::models::Severity;
use netspecter_rs::core::scoring::ThreatLevel;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    text::Line,
};

use super::analysis_view::severity_style;

fn level_color(level: ThreatLevel) -> Color {
    match level {
        ThreatLevel::Critical => Color::Red,
        ThreatLevel::Elevated => Color::Yellow,
        ThreatLevel::Secure => Color::Green,
    }
}

/// Renders the summary panel: threat score, target intelligence, finding counts,
/// technologies and the process-wide scan counters.
pub fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary_container = Block::default().borders(Borders::ALL).title("Summary");
    frame.render_widget(summary_container, area);

    let [score_area, gauge_area, _, target_area, _, issues_area, _, tech_area, metrics_area] = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Score & tier
            Constraint::Length(1), // Gauge
            Constraint::Length(1),
            Constraint::Length(6), // Target intelligence
            Constraint::Length(1),
            Constraint::Length(5), // Findings by severity
            Constraint::Length(1),
            Constraint::Min(0),    // Technologies
            Constraint::Length(1), // Metrics
        ])
        .areas(area);

    let metrics = &app.metrics;
    let metrics_line = Line::from(format!(
        "Scans: {} total, {} active, {} failed | Up {}",
        metrics.total_scans, metrics.active_scans, metrics.failed_scans, metrics.uptime
    ))
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(Paragraph::new(metrics_line).alignment(Alignment::Center), metrics_area);

    let Some(report) = app.scan_report.as_ref().filter(|_| matches!(app.state, AppState::Finished)) else {
        return;
    };

    // --- Score & tier ---
    let level = ThreatLevel::from_score(report.threat_score);
    let (tier, color) = if report.is_failed() {
        ("FAILED".to_string(), Color::DarkGray)
    } else {
        (level.to_string().to_uppercase(), level_color(level))
    };
    let score_text = Text::from(vec![
        Line::from("Threat Score".bold()),
        Line::from(format!("{}/100 ({tier})", report.threat_score)).style(Style::default().fg(color)),
        Line::from(report.codename.as_str()).style(Style::default().fg(Color::Magenta).italic()),
    ]);
    frame.render_widget(Paragraph::new(score_text).alignment(Alignment::Center), score_area);

    let gauge = Gauge::default()
        .ratio((app.displayed_score / 100.0).clamp(0.0, 1.0))
        .label("")
        .gauge_style(Style::default().fg(color));
    frame.render_widget(gauge, gauge_area);

    // --- Target intelligence ---
    let ports = if report.open_ports.is_empty() {
        "none".to_string()
    } else {
        report.open_ports.iter().map(u16::to_string).collect::<Vec<_>>().join(", ")
    };
    let tls = if report.ssl_info.valid {
        match report.ssl_info.days_until_expiry {
            Some(days) if days < 0 => Span::styled(format!("expired {} days ago", -days), Style::default().fg(Color::Red)),
            Some(days) => Span::styled(format!("valid, expires in {days} days"), Style::default().fg(Color::Green)),
            None => Span::styled("valid", Style::default().fg(Color::Green)),
        }
    } else {
        Span::styled("unavailable", Style::default().fg(Color::Red))
    };
    let target_lines = vec![
        Line::from(vec![Span::raw("IP: "), Span::styled(report.ip_info.address.as_str(), Style::default().fg(Color::Cyan))]),
        Line::from(format!("DNS records: {}", report.dns_info.record_count())),
        Line::from(vec![Span::raw("Open ports: "), Span::styled(ports, Style::default().fg(Color::Yellow))]),
        Line::from(vec![Span::raw("TLS: "), tls]),
        Line::from(report.ssl_info.issuer.as_str()).style(Style::default().fg(Color::DarkGray)),
    ];
    let target_block = Block::default().title("TARGET".bold());
    frame.render_widget(Paragraph::new(target_lines).block(target_block), target_area);

    // --- Findings by severity ---
    let issue_lines: Vec<Line> = [Severity::Critical, Severity::High, Severity::Medium, Severity::Low]
        .into_iter()
        .map(|severity| {
            Line::from(vec![
                Span::raw(format!("{severity}: ")),
                Span::styled(report.count_by_severity(severity).to_string(), severity_style(severity)),
            ])
        })
        .collect();
    let issues_block = Block::default().title("FINDINGS".bold());
    frame.render_widget(Paragraph::new(issue_lines).block(issues_block), issues_area);

    // --- Technologies ---
    let tech_lines: Vec<Line> = if report.tech_stack.is_empty() {
        vec![Line::from("Not identified.")]
    } else {
        report
            .tech_stack
            .iter()
            .map(|tech| Line::from(vec![Span::raw("- "), Span::styled(tech.as_str(), Style::default().fg(Color::Cyan))]))
            .collect()
    };
    let tech_block = Block::default().title("TECHNOLOGIES".bold());
    frame.render_widget(Paragraph::new(tech_lines).wrap(Wrap { trim: true }).block(tech_block), tech_area);
}
