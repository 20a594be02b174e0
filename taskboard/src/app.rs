//! Application state and key handling for the terminal board.
//!
//! The app never touches the store directly. It renders the latest
//! [`Projection`] from the running view and turns key presses into
//! [`BoardCommand`]s. The completed-task list is a separate panel where
//! tasks can be reopened or deleted.

use std::collections::VecDeque;

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use taskboard_proto::task::{Task, TaskPatch, TaskStatus};

use crate::tasks::{GroupView, Projection, Roster};
use crate::view::{BoardCommand, BoardUpdate, Notice, NoticeLevel};

/// Most recent notices kept on screen.
const MAX_NOTICES: usize = 5;

/// Which panel is currently focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    /// The board columns (default).
    Board,
    /// The search box.
    Search,
    /// The completed-task list.
    Completed,
}

/// Main application state.
#[derive(Debug)]
pub struct App {
    /// Header label for the mounted scope.
    pub scope_label: String,
    /// Latest projection from the view.
    pub projection: Projection,
    /// Search box contents.
    pub query: String,
    /// Which panel is focused.
    pub focus: PanelFocus,
    /// Selected column.
    pub selected_group: usize,
    /// Selected card within the column.
    pub selected_task: usize,
    /// Selected row in the completed list.
    pub selected_completed: usize,
    /// Which employees the board shows.
    pub roster: Roster,
    /// Day the completed list is limited to, if any.
    pub completed_on: Option<NaiveDate>,
    /// Recent notices, oldest first.
    pub notices: VecDeque<Notice>,
    /// Whether the view is running.
    pub is_connected: bool,
    /// Whether the app should quit.
    pub should_quit: bool,
}

impl App {
    /// Creates an empty board for `scope_label`, seeded with `query`.
    #[must_use]
    pub fn new(scope_label: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            scope_label: scope_label.into(),
            projection: Projection::default(),
            query: query.into(),
            focus: PanelFocus::Board,
            selected_group: 0,
            selected_task: 0,
            selected_completed: 0,
            roster: Roster::default(),
            completed_on: None,
            notices: VecDeque::new(),
            is_connected: false,
            should_quit: false,
        }
    }

    /// Applies one update from the running view.
    pub fn apply_update(&mut self, update: BoardUpdate) {
        match update {
            BoardUpdate::Board(projection) => {
                self.projection = projection;
                self.is_connected = true;
                self.clamp_selection();
            }
            BoardUpdate::Notice(notice) => self.push_notice(notice),
            BoardUpdate::Closed => {
                self.is_connected = false;
                self.push_notice(Notice {
                    level: NoticeLevel::Error,
                    message: "Board closed".to_string(),
                });
            }
        }
    }

    /// Adds a notice, dropping the oldest beyond the on-screen limit.
    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push_back(notice);
        while self.notices.len() > MAX_NOTICES {
            self.notices.pop_front();
        }
    }

    /// The focused column, if any.
    #[must_use]
    pub fn current_group(&self) -> Option<&GroupView> {
        self.projection.groups.get(self.selected_group)
    }

    /// The focused card, if any.
    #[must_use]
    pub fn current_task(&self) -> Option<&Task> {
        self.current_group()?.tasks.get(self.selected_task)
    }

    /// The selected row of the completed list, if any.
    #[must_use]
    pub fn current_completed(&self) -> Option<&Task> {
        self.projection
            .completed_tasks()
            .nth(self.selected_completed)
    }

    /// Handles a key press. Returns the command to send to the view, if any.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<BoardCommand> {
        if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
            self.should_quit = true;
            return Some(BoardCommand::Unmount);
        }
        if matches!(key.code, KeyCode::Tab | KeyCode::BackTab) {
            self.toggle_focus();
            return None;
        }

        match self.focus {
            PanelFocus::Search => self.handle_search_key(key),
            PanelFocus::Board => self.handle_board_key(key),
            PanelFocus::Completed => self.handle_completed_key(key),
        }
    }

    fn handle_completed_key(&mut self, key: KeyEvent) -> Option<BoardCommand> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('x') => {
                self.focus = PanelFocus::Board;
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_completed = self.selected_completed.saturating_sub(1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected_completed + 1 < self.projection.completed_tasks().count() {
                    self.selected_completed += 1;
                }
                None
            }
            KeyCode::Char('o') => self.current_completed().map(|t| BoardCommand::Reopen(t.id)),
            KeyCode::Delete | KeyCode::Char('d') => {
                self.current_completed().map(|t| BoardCommand::Delete(t.id))
            }
            KeyCode::Char('f') => {
                self.completed_on = match self.completed_on {
                    Some(_) => None,
                    None => self.current_completed()?.completion_date,
                };
                self.selected_completed = 0;
                Some(BoardCommand::ShowCompletedOn(self.completed_on))
            }
            KeyCode::Char('r') => Some(BoardCommand::Refresh),
            _ => None,
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Option<BoardCommand> {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => {
                self.focus = PanelFocus::Board;
                None
            }
            KeyCode::Char(c) => {
                self.query.push(c);
                Some(BoardCommand::SetQuery(self.query.clone()))
            }
            KeyCode::Backspace => {
                self.query.pop()?;
                Some(BoardCommand::SetQuery(self.query.clone()))
            }
            _ => None,
        }
    }

    fn handle_board_key(&mut self, key: KeyEvent) -> Option<BoardCommand> {
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.should_quit = true;
                Some(BoardCommand::Unmount)
            }
            KeyCode::Char('/') => {
                self.focus = PanelFocus::Search;
                None
            }
            KeyCode::Up if shift => self.move_selected(-1),
            KeyCode::Down if shift => self.move_selected(1),
            KeyCode::Char('K') => self.move_selected(-1),
            KeyCode::Char('J') => self.move_selected(1),
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_task = self.selected_task.saturating_sub(1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let len = self.current_group().map_or(0, |g| g.tasks.len());
                if self.selected_task + 1 < len {
                    self.selected_task += 1;
                }
                None
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.selected_group = self.selected_group.saturating_sub(1);
                self.clamp_selection();
                None
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if self.selected_group + 1 < self.projection.groups.len() {
                    self.selected_group += 1;
                }
                self.clamp_selection();
                None
            }
            KeyCode::Enter | KeyCode::Char('c') => {
                self.current_task().map(|t| BoardCommand::Complete(t.id))
            }
            KeyCode::Char('s') => self.current_task().map(|t| {
                let status = if t.status == TaskStatus::Todo {
                    TaskStatus::InProgress
                } else {
                    TaskStatus::Todo
                };
                BoardCommand::Update {
                    task_id: t.id,
                    patch: TaskPatch {
                        status: Some(status),
                        ..TaskPatch::default()
                    },
                }
            }),
            KeyCode::Delete | KeyCode::Char('d') => {
                self.current_task().map(|t| BoardCommand::Delete(t.id))
            }
            KeyCode::Char('a') => self.current_group().map(|g| BoardCommand::SetEmployeeActive {
                employee_id: g.employee_id,
                active: !g.active,
            }),
            KeyCode::Char('v') => {
                self.roster = self.roster.next();
                Some(BoardCommand::SetRoster(self.roster))
            }
            KeyCode::Char('x') => {
                self.focus = PanelFocus::Completed;
                None
            }
            KeyCode::Char('r') => Some(BoardCommand::Refresh),
            _ => None,
        }
    }

    /// Moves the selected card up or down within its column.
    ///
    /// Only allowed while the column shows its full list, since indices in
    /// a title-filtered column do not match the stored order.
    fn move_selected(&mut self, delta: isize) -> Option<BoardCommand> {
        let group = self.current_group()?;
        if !(self.projection.query.trim().is_empty() || group.matched_by_name) {
            self.push_notice(Notice {
                level: NoticeLevel::Info,
                message: "Clear the search to reorder".to_string(),
            });
            return None;
        }
        let employee_id = group.employee_id;
        let len = group.tasks.len();
        let from = self.selected_task;
        let to = from.checked_add_signed(delta).filter(|&to| to < len)?;
        self.selected_task = to;
        Some(BoardCommand::Reorder {
            employee_id,
            from,
            to,
        })
    }

    const fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            PanelFocus::Board => PanelFocus::Search,
            PanelFocus::Search | PanelFocus::Completed => PanelFocus::Board,
        };
    }

    fn clamp_selection(&mut self) {
        let groups = self.projection.groups.len();
        if self.selected_group >= groups {
            self.selected_group = groups.saturating_sub(1);
        }
        let tasks = self.current_group().map_or(0, |g| g.tasks.len());
        if self.selected_task >= tasks {
            self.selected_task = tasks.saturating_sub(1);
        }
        let completed = self.projection.completed_tasks().count();
        if self.selected_completed >= completed {
            self.selected_completed = completed.saturating_sub(1);
        }
    }
}
