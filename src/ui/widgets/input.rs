// src/ui/widgets/input.rs
use ratatui::{prelude::*, widgets::{Block, Borders, Paragraph}};
use crate::app::{App, AppState};

/// Renders the target input box.
pub fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let input_block = Block::default().borders(Borders::ALL).title("Target (domain, IP or URL)");
    let input_paragraph = Paragraph::new(app.input.as_str())
        .block(input_block)
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(input_paragraph, area);

    if let AppState::Idle = app.state {
        let cursor_x = area.x + app.input.chars().count() as u16 + 1;
        frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}
