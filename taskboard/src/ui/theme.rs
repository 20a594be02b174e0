//! Theme and styling constants for the TUI.

use ratatui::style::{Color, Modifier, Style};
use taskboard_proto::task::{Priority, TaskStatus};

use crate::view::NoticeLevel;

/// Primary foreground color.
pub const FG_PRIMARY: Color = Color::White;

/// Secondary foreground color (dimmed text).
pub const FG_SECONDARY: Color = Color::Gray;

/// Highlight color for focused elements.
pub const HIGHLIGHT: Color = Color::Cyan;

/// Success/online indicator color.
pub const SUCCESS: Color = Color::Green;

/// Warning indicator color.
pub const WARNING: Color = Color::Yellow;

/// Error indicator color.
pub const ERROR: Color = Color::Red;

/// Presence: online indicator color.
pub const PRESENCE_ONLINE: Color = Color::Green;

/// Presence: offline indicator color.
pub const PRESENCE_OFFLINE: Color = Color::DarkGray;

/// Normal text style.
#[must_use]
pub fn normal() -> Style {
    Style::default().fg(FG_PRIMARY)
}

/// Dimmed text style (dates, metadata).
#[must_use]
pub fn dimmed() -> Style {
    Style::default().fg(FG_SECONDARY)
}

/// Bold text style.
#[must_use]
pub fn bold() -> Style {
    Style::default().fg(FG_PRIMARY).add_modifier(Modifier::BOLD)
}

/// Highlighted text style (focused panel borders).
#[must_use]
pub fn highlighted() -> Style {
    Style::default().fg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

/// Selected item style (in lists).
#[must_use]
pub fn selected() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(HIGHLIGHT)
        .add_modifier(Modifier::BOLD)
}

/// Style for the status bar background.
#[must_use]
pub fn status_bar_bg() -> Style {
    Style::default().fg(Color::White).bg(Color::Rgb(30, 30, 50))
}

/// Badge color for a priority.
#[must_use]
pub const fn priority_color(priority: Option<Priority>) -> Color {
    match priority {
        Some(Priority::High) => ERROR,
        Some(Priority::Medium) => WARNING,
        Some(Priority::Low) => SUCCESS,
        None => FG_SECONDARY,
    }
}

/// Marker for a task status.
#[must_use]
pub const fn status_symbol(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "[ ]",
        TaskStatus::InProgress => "[~]",
        TaskStatus::Completed => "[\u{2713}]",
    }
}

/// Style for a notice line.
#[must_use]
pub fn notice(level: NoticeLevel) -> Style {
    let color = match level {
        NoticeLevel::Info => Color::Rgb(100, 140, 180),
        NoticeLevel::Warning => WARNING,
        NoticeLevel::Error => ERROR,
    };
    Style::default().fg(color).add_modifier(Modifier::ITALIC)
}
