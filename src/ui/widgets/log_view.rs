// src/ui/widgets/log_view.rs

use crate::app::App;
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation},
};

/// Renders the live scan log.
///
/// Only the newest lines that fit are shown. Stage tags are highlighted and each
/// line is coloured by its status marker. Long lines scroll horizontally.
pub fn render_log_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .title("Scan Log (scroll with ← →)")
        .borders(Borders::ALL);

    let inner_area = block.inner(area);
    frame.render_widget(block, area);

    let max_width = app.log_content.iter().map(|line| line.chars().count()).max().unwrap_or(0);
    app.log_horizontal_scroll_state = app.log_horizontal_scroll_state.content_length(max_width);

    // Leave the bottom row for the scrollbar.
    let visible = inner_area.height.saturating_sub(1) as usize;
    let skip = app.log_content.len().saturating_sub(visible);
    let log_lines: Vec<Line> = app.log_content.iter().skip(skip).map(|line| style_line(line)).collect();

    let log_paragraph = Paragraph::new(log_lines).scroll((0, app.log_horizontal_scroll as u16));
    frame.render_widget(log_paragraph, inner_area);

    let scrollbar = Scrollbar::new(ScrollbarOrientation::HorizontalBottom).thumb_symbol("■");
    let scrollbar_area = Rect {
        x: inner_area.x,
        y: inner_area.y + inner_area.height.saturating_sub(1),
        width: inner_area.width,
        height: 1,
    };
    frame.render_stateful_widget(scrollbar, scrollbar_area, &mut app.log_horizontal_scroll_state);
}

fn style_line(line: &str) -> Line<'_> {
    if line.starts_with("[STAGE:") {
        if let Some((tag, rest)) = line.split_once(']') {
            return Line::from(vec![
                Span::styled(format!("{tag}]"), Style::default().fg(Color::Magenta).bold()),
                Span::styled(rest, Style::default().bold()),
            ]);
        }
    }

    let color = if line.starts_with('✔') {
        Color::Green
    } else if line.starts_with('⚠') {
        Color::Yellow
    } else if line.starts_with('❌') || line.starts_with("CRITICAL FAILURE") {
        Color::Red
    } else if line.starts_with('ℹ') {
        Color::Cyan
    } else if line.starts_with("...") || line.starts_with(' ') {
        Color::DarkGray
    } else {
        Color::Reset
    };
    Line::from(Span::styled(line, Style::default().fg(color)))
}
