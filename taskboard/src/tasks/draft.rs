//! Client-side checks for create and edit forms.
//!
//! These run before any request is sent. They mirror what the board's
//! forms enforce so that obviously invalid edits never reach the service.

use chrono::NaiveDate;
use taskboard_proto::task::{MAX_TASK_TITLE_LENGTH, Task, TaskDraft, TaskPatch, TaskStatus};

use super::DraftError;

fn check_title(title: &str) -> Result<(), DraftError> {
    if title.trim().is_empty() {
        return Err(DraftError::TitleEmpty);
    }
    if title.chars().count() > MAX_TASK_TITLE_LENGTH {
        return Err(DraftError::TitleTooLong);
    }
    Ok(())
}

/// Validates a new task before it is submitted.
///
/// # Errors
///
/// Returns the first [`DraftError`] found: empty or overlong title, a
/// missing date, a start date before `today`, a due date before the start
/// date, or no assignees.
pub fn validate_draft(draft: &TaskDraft, today: NaiveDate) -> Result<(), DraftError> {
    check_title(&draft.title)?;
    let start = draft.start_date.ok_or(DraftError::MissingStartDate)?;
    let due = draft.due_date.ok_or(DraftError::MissingDueDate)?;
    if start < today {
        return Err(DraftError::StartInPast { start, today });
    }
    if due < start {
        return Err(DraftError::DueBeforeStart { start, due });
    }
    if draft.employee_ids.is_empty() {
        return Err(DraftError::NoAssignees);
    }
    Ok(())
}

/// Validates an edit against the task it modifies and fills in derived
/// fields.
///
/// Marking a task completed without a completion date stamps `today`.
/// Moving it to any other status clears the completion date. Returns the
/// patch to send.
///
/// # Errors
///
/// Returns [`DraftError`] when the merged task would have an invalid title,
/// a due date before its start date, or a completion date before its start
/// date.
pub fn prepare_edit(
    current: &Task,
    mut patch: TaskPatch,
    today: NaiveDate,
) -> Result<TaskPatch, DraftError> {
    patch.task_id = Some(current.id);
    if let Some(title) = &patch.title {
        check_title(title)?;
    }

    let status = patch.status.unwrap_or(current.status);
    if status == TaskStatus::Completed {
        if patch.completion_date.is_none() && current.completion_date.is_none() {
            patch.completion_date = Some(today);
        }
    } else {
        patch.completion_date = None;
    }

    let mut merged = current.clone();
    merged.apply_patch(&patch);
    if merged.due_date < merged.start_date {
        return Err(DraftError::DueBeforeStart {
            start: merged.start_date,
            due: merged.due_date,
        });
    }
    if let Some(done) = merged
        .completion_date
        .filter(|done| *done < merged.start_date)
    {
        return Err(DraftError::CompletionBeforeStart {
            start: merged.start_date,
            completion: done,
        });
    }
    Ok(patch)
}

/// The patch that marks a task completed as of `today`.
#[must_use]
pub fn completion_patch(current: &Task, today: NaiveDate) -> TaskPatch {
    TaskPatch {
        task_id: Some(current.id),
        status: Some(TaskStatus::Completed),
        completion_date: Some(today),
        ..TaskPatch::default()
    }
}
