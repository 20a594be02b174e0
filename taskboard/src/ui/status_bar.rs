//! Status bar and notice rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::{App, PanelFocus};

/// Render the status bar at the bottom of the screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let help_text = match app.focus {
        PanelFocus::Search => "Type to filter | Enter/Esc: back to board | Ctrl-C: quit",
        PanelFocus::Board => {
            "\u{2190}\u{2192}\u{2191}\u{2193}/hjkl: move | J/K: reorder | c: complete | s: status | d: delete | a: active | v: roster | x: completed | r: refresh | /: search | q: quit"
        }
        PanelFocus::Completed => {
            "\u{2191}\u{2193}/jk: move | o: reopen | d: delete | f: this day/all days | x/Esc: back to board"
        }
    };

    let (dot_color, status_text) = if app.is_connected {
        (theme::SUCCESS, "Live")
    } else {
        (theme::PRESENCE_OFFLINE, "Offline")
    };

    let status_line = Line::from(vec![
        Span::styled("Taskboard", theme::bold()),
        Span::raw(" | "),
        Span::styled("\u{25cf}", theme::normal().fg(dot_color)),
        Span::raw(format!(" {status_text}")),
        Span::raw(format!(" | {} tasks", app.projection.task_count())),
        Span::raw(format!(" | {} done", app.projection.completed_tasks().count())),
        Span::raw(format!(" | roster: {}", app.roster.label())),
        Span::raw(" | "),
        Span::styled(help_text, theme::dimmed()),
    ]);

    let paragraph = Paragraph::new(status_line).style(theme::status_bar_bg());
    frame.render_widget(paragraph, area);
}

/// Render recent notices, newest last.
pub fn render_notices(frame: &mut Frame, area: Rect, app: &App) {
    let lines: Vec<Line> = app
        .notices
        .iter()
        .map(|n| Line::from(Span::styled(n.message.as_str(), theme::notice(n.level))))
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}
