// src/ui/mod.rs

use crate::app::{App, AppState};
use ratatui::prelude::*;

mod layout;
mod widgets;

pub fn render(app: &mut App, frame: &mut Frame) {
    let layout = layout::create_layout(frame.area(), app.show_logs);

    widgets::input::render_input(frame, app, layout.input);
    widgets::analysis_view::render_analysis_view(frame, app, layout.findings);
    widgets::summary::render_summary(frame, app, layout.summary);
    if let Some(log_panel) = layout.log_panel {
        widgets::log_view::render_log_view(frame, app, log_panel);
    }
    widgets::footer::render_footer(frame, app, layout.footer);

    if matches!(app.state, AppState::Disclaimer) {
        widgets::disclaimer_popup::render_disclaimer_popup(frame, frame.area());
    }
}
