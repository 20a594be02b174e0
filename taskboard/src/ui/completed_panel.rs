//! Completed-task list grouped by completion day, then by employee.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use super::theme;
use crate::app::{App, PanelFocus};

/// Render the completed list. Day and employee headers are not selectable;
/// `app.selected_completed` counts task rows only.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let title = app.completed_on.map_or_else(
        || "Completed".to_string(),
        |day| format!("Completed on {day}"),
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if app.focus == PanelFocus::Completed {
            theme::highlighted()
        } else {
            theme::normal()
        });

    if app.projection.completed.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled("No completed tasks", theme::dimmed())).block(block),
            area,
        );
        return;
    }

    let mut items = Vec::new();
    let mut row = 0;
    for day in &app.projection.completed {
        let heading = day
            .date
            .map_or_else(|| "No date".to_string(), |d| d.to_string());
        items.push(ListItem::new(Line::from(Span::styled(heading, theme::bold()))));
        for group in &day.groups {
            items.push(ListItem::new(Line::from(Span::styled(
                format!("  {}", group.display_name),
                theme::dimmed(),
            ))));
            for task in &group.tasks {
                let style = if row == app.selected_completed {
                    theme::selected()
                } else {
                    theme::normal()
                };
                items.push(
                    ListItem::new(Line::from(vec![
                        Span::raw("    "),
                        Span::raw(theme::status_symbol(task.status)),
                        Span::raw(" "),
                        Span::raw(task.title.as_str()),
                    ]))
                    .style(style),
                );
                row += 1;
            }
        }
    }

    frame.render_widget(List::new(items).block(block), area);
}
