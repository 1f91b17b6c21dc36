// src/ui/widgets/disclaimer_popup.rs

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    text::Line,
};

/// Renders the authorization disclaimer as a modal over the rest of the UI.
///
/// No scan can start until it has been acknowledged.
pub fn render_disclaimer_popup(frame: &mut Frame, area: Rect) {
    let disclaimer_text = Text::from(vec![
        Line::from("AUTHORIZED USE ONLY".bold().yellow()),
        Line::from(""),
        Line::from("NetSpecter RS performs active reconnaissance: it resolves DNS records, opens TCP connections to common service ports, completes TLS handshakes and sends HTTP requests to the target."),
        Line::from(""),
        Line::from("Probing systems you do not own or have explicit, written permission to test may be ILLEGAL in your jurisdiction and can trigger intrusion detection on the target."),
        Line::from(""),
        Line::from("By continuing you confirm that:"),
        Line::from("1. Every target you enter is yours or covered by a written authorization."),
        Line::from("2. You accept full responsibility for the traffic this tool generates."),
        Line::from("3. The authors accept NO liability for misuse or damage caused by this program."),
        Line::from(""),
        Line::from("Press ".bold() + "Enter".bold().yellow() + " to Acknowledge and Continue".bold()),
    ]);

    let block = Block::default()
        .title("Disclaimer")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let popup_area = centered_rect(70, 70, area);
    let popup = Paragraph::new(disclaimer_text)
        .block(block)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    // Clear first so the UI underneath does not bleed through.
    frame.render_widget(Clear, popup_area);
    frame.render_widget(popup, popup_area);
}

/// A rectangle of the given percentages, centered in `r`.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let [_, middle, _] = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .areas(r);

    let [_, center, _] = Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .areas(middle);
    center
}
