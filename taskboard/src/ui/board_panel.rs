//! Board rendering: one column per visible employee.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use taskboard_proto::task::Task;

use super::theme;
use crate::app::{App, PanelFocus};
use crate::tasks::GroupView;

/// Render the visible columns, or a placeholder when nothing matches.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let groups = &app.projection.groups;
    if groups.is_empty() {
        let text = if app.projection.query.trim().is_empty() {
            "No employees on this board"
        } else {
            "No employees or tasks match the search"
        };
        let block = Block::default().title("Board").borders(Borders::ALL);
        frame.render_widget(
            Paragraph::new(Span::styled(text, theme::dimmed())).block(block),
            area,
        );
        return;
    }

    let count = u32::try_from(groups.len()).unwrap_or(u32::MAX);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(groups.iter().map(|_| Constraint::Ratio(1, count)))
        .split(area);

    for (idx, (group, column)) in groups.iter().zip(columns.iter()).enumerate() {
        let selected = (idx == app.selected_group).then_some(app.selected_task);
        render_column(frame, *column, group, selected, app.focus == PanelFocus::Board);
    }
}

fn render_column(
    frame: &mut Frame,
    area: Rect,
    group: &GroupView,
    selected: Option<usize>,
    board_focused: bool,
) {
    let items: Vec<ListItem> = group
        .tasks
        .iter()
        .enumerate()
        .map(|(idx, task)| {
            let style = match selected {
                Some(sel) if sel == idx && board_focused => theme::selected(),
                Some(sel) if sel == idx => theme::highlighted(),
                _ => theme::normal(),
            };
            ListItem::new(card(task)).style(style)
        })
        .collect();

    let presence = if group.online {
        theme::PRESENCE_ONLINE
    } else {
        theme::PRESENCE_OFFLINE
    };
    let mut title = vec![
        Span::styled("\u{25cf} ", theme::normal().fg(presence)),
        Span::styled(group.display_name.as_str(), theme::bold()),
        Span::styled(format!(" ({})", group.tasks.len()), theme::dimmed()),
    ];
    if !group.active {
        title.push(Span::styled(" inactive", theme::normal().fg(theme::WARNING)));
    }
    let title = Line::from(title);
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if selected.is_some() && board_focused {
            theme::highlighted()
        } else {
            theme::normal()
        });

    frame.render_widget(List::new(items).block(block), area);
}

fn card(task: &Task) -> Vec<Line<'_>> {
    let mut head = vec![
        Span::raw(theme::status_symbol(task.status)),
        Span::raw(" "),
        Span::raw(task.title.as_str()),
    ];
    if let Some(priority) = task.priority {
        head.push(Span::styled(
            format!(" {priority}"),
            theme::normal().fg(theme::priority_color(Some(priority))),
        ));
    }
    vec![
        Line::from(head),
        Line::from(Span::styled(
            format!("    {} \u{2192} {}", task.start_date, task.due_date),
            theme::dimmed(),
        )),
    ]
}
