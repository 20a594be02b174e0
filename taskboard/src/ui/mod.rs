//! Terminal UI rendering.

pub mod board_panel;
pub mod completed_panel;
pub mod search_bar;
pub mod status_bar;
pub mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
};

use crate::app::{App, PanelFocus};

/// Main draw function for the entire UI.
pub fn draw(frame: &mut Frame, app: &App) {
    let notice_rows = u16::try_from(app.notices.len()).unwrap_or(u16::MAX);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(notice_rows),
            Constraint::Length(1),
        ])
        .split(frame.area());

    search_bar::render(frame, chunks[0], app);
    if app.focus == PanelFocus::Completed {
        completed_panel::render(frame, chunks[1], app);
    } else {
        board_panel::render(frame, chunks[1], app);
    }
    status_bar::render_notices(frame, chunks[2], app);
    status_bar::render(frame, chunks[3], app);
}
