//! Search box rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::theme;
use crate::app::{App, PanelFocus};

/// Render the search box with the current query.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let is_focused = app.focus == PanelFocus::Search;

    let line = if app.query.is_empty() && !is_focused {
        Line::from(Span::styled(
            "Search by employee or task title...",
            theme::dimmed(),
        ))
    } else {
        let mut text = app.query.clone();
        if is_focused {
            text.push('\u{2588}');
        }
        Line::from(Span::styled(text, theme::normal()))
    };

    let block = Block::default()
        .title(format!("Search \u{2014} {}", app.scope_label))
        .borders(Borders::ALL)
        .border_style(if is_focused {
            theme::highlighted()
        } else {
            theme::normal()
        });

    frame.render_widget(Paragraph::new(line).block(block), area);
}
