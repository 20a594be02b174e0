//! The mounted board: snapshot loading, event handling, and local edits.
//!
//! # Lifecycle
//!
//! [`BoardView::mount`] subscribes to the push channel *before* fetching the
//! snapshot. Events received during the fetch are buffered in the
//! [`EventQueue`] and replayed once the snapshot has loaded, so nothing
//! published in that window is lost. After that, events apply immediately.
//!
//! Local edits are applied to the store first and then persisted. If any
//! persistence request fails the view drops its local state and refetches
//! the snapshot instead of trying to undo the edit piecemeal. The one
//! exception is an employee's active flag, which is a single field and is
//! simply flipped back.

use std::time::Duration;

use chrono::NaiveDate;
use futures_util::future::join_all;
use taskboard_proto::channel::Topic;
use taskboard_proto::employee::EmployeeId;
use taskboard_proto::event::PushEvent;
use taskboard_proto::task::{Task, TaskDraft, TaskId, TaskPatch, TaskRecord, TaskStatus};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::{ApiError, TaskApi};
use crate::tasks::draft::{completion_patch, prepare_edit, validate_draft};
use crate::tasks::{
    Dispatch, DraftError, EventQueue, MutationKind, MutationLedger, Outcome, Projection,
    ReconcileError, Reconciler, Roster, completed_by_date, project,
};
use crate::transport::{ChannelError, PushChannel, Subscription};

/// Errors surfaced by board operations.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// Subscribing to the push channel failed.
    #[error("push channel: {0}")]
    Channel(#[from] ChannelError),
    /// A REST call failed and could not be recovered by refetching.
    #[error("task service: {0}")]
    Api(#[from] ApiError),
    /// A reorder or event could not be applied.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    /// A create or edit failed validation; nothing was sent.
    #[error("invalid task: {0}")]
    Draft(#[from] DraftError),
    /// The task is not on the board.
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),
}

/// Severity of a transient notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Something was ignored.
    Warning,
    /// An operation failed.
    Error,
}

/// A transient message for the user, shown once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Text to show.
    pub message: String,
}

/// How a local edit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// The service accepted the edit.
    Confirmed,
    /// The service rejected it; the board was reloaded from the service.
    Resynced,
    /// The service rejected it; the local change was undone.
    Reverted,
}

/// Tunables for a mounted view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    /// How many times to try resubscribing after the push channel drops.
    pub reconnect_attempts: u32,
    /// Pause before each resubscribe attempt.
    pub reconnect_delay: Duration,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(2),
        }
    }
}

/// Requests sent to a running view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardCommand {
    /// Change the search query.
    SetQuery(String),
    /// Create a task.
    Create(TaskDraft),
    /// Edit a task.
    Update {
        /// Task to edit.
        task_id: TaskId,
        /// Fields to change.
        patch: TaskPatch,
    },
    /// Mark a task completed today.
    Complete(TaskId),
    /// Move a completed task back to the active lists.
    Reopen(TaskId),
    /// Delete a task, active or completed.
    Delete(TaskId),
    /// Move a task within one employee's list.
    Reorder {
        /// List owner.
        employee_id: EmployeeId,
        /// Current index.
        from: usize,
        /// Target index.
        to: usize,
    },
    /// Activate or deactivate an employee.
    SetEmployeeActive {
        /// Employee to change.
        employee_id: EmployeeId,
        /// New value of the active flag.
        active: bool,
    },
    /// Choose which employees' columns are shown.
    SetRoster(Roster),
    /// Limit the completed listing to one day, or show every day.
    ShowCompletedOn(Option<NaiveDate>),
    /// Reload the snapshot.
    Refresh,
    /// Stop the view and release the subscription.
    Unmount,
}

/// Output of a running view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardUpdate {
    /// The current projection.
    Board(Projection),
    /// A transient notice.
    Notice(Notice),
    /// The view stopped.
    Closed,
}

/// A mounted board for one scope (an admin or a single employee).
#[derive(Debug)]
pub struct BoardView<A> {
    api: A,
    scope: Topic,
    reconciler: Reconciler,
    queue: EventQueue,
    ledger: MutationLedger,
    query: String,
    roster: Roster,
    completed_on: Option<NaiveDate>,
    notices: Vec<Notice>,
    options: ViewOptions,
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

impl<A: TaskApi> BoardView<A> {
    /// Creates an unmounted view. Prefer [`mount`](Self::mount).
    #[must_use]
    pub fn new(api: A, scope: Topic) -> Self {
        Self {
            api,
            scope,
            reconciler: Reconciler::new(),
            queue: EventQueue::new(),
            ledger: MutationLedger::new(),
            query: String::new(),
            roster: Roster::default(),
            completed_on: None,
            notices: Vec::new(),
            options: ViewOptions::default(),
        }
    }

    /// Overrides the reconnect behaviour.
    #[must_use]
    pub const fn with_options(mut self, options: ViewOptions) -> Self {
        self.options = options;
        self
    }

    /// Subscribes to `scope`, loads the snapshot, and replays queued events.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Channel`] if subscribing fails, or
    /// [`BoardError::Api`] if the snapshot cannot be fetched. The
    /// subscription is released in both cases.
    pub async fn mount<C: PushChannel>(
        api: A,
        channel: &C,
        scope: Topic,
    ) -> Result<(Self, Subscription), BoardError> {
        let mut subscription = channel.subscribe(scope).await?;
        let mut view = Self::new(api, scope);
        view.initialize(&mut subscription).await?;
        Ok((view, subscription))
    }

    /// Fetches the snapshot while buffering events from `subscription`,
    /// then loads it and drains the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Api`] if the snapshot cannot be fetched.
    pub async fn initialize(&mut self, subscription: &mut Subscription) -> Result<(), BoardError> {
        // Filled only when the queue is already live (re-initialization).
        let mut late = Vec::new();
        let snapshot = {
            let fetch = self.api.fetch_snapshot(self.scope);
            tokio::pin!(fetch);
            loop {
                tokio::select! {
                    biased;
                    result = &mut fetch => break result,
                    Some(event) = subscription.next() => {
                        late.extend(self.queue.enqueue(event));
                    }
                }
            }
        };
        let snapshot = match snapshot {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(scope = %self.scope, error = %e, "initial fetch failed");
                self.notify(NoticeLevel::Error, "Failed to fetch tasks");
                return Err(e.into());
            }
        };
        while let Some(event) = subscription.try_next() {
            late.extend(self.queue.enqueue(event));
        }

        self.reconciler
            .load_snapshot(&snapshot.employees, &snapshot.tasks);
        let queued = self.queue.len();
        for error in self.queue.drain_into(&mut self.reconciler) {
            self.notify(NoticeLevel::Warning, format!("Invalid task data received: {error}"));
        }
        for event in late {
            self.handle_event(event);
        }
        info!(
            scope = %self.scope,
            employees = snapshot.employees.len(),
            tasks = self.reconciler.store().task_count(),
            queued,
            "board mounted"
        );
        Ok(())
    }

    /// The scope this view shows.
    #[must_use]
    pub const fn scope(&self) -> Topic {
        self.scope
    }

    /// Reconciled state.
    #[must_use]
    pub const fn store(&self) -> &crate::tasks::TaskStore {
        self.reconciler.store()
    }

    /// Local edits not yet confirmed by the service.
    #[must_use]
    pub const fn ledger(&self) -> &MutationLedger {
        &self.ledger
    }

    /// One employee's ordered active tasks.
    #[must_use]
    pub fn read(&self, employee_id: EmployeeId) -> Vec<Task> {
        self.reconciler.store().read(employee_id)
    }

    /// Current search query.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Changes the search query. The store is not touched.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Limits the visible columns by the employees' active flag.
    pub const fn set_roster(&mut self, roster: Roster) {
        self.roster = roster;
    }

    /// Limits the completed listing to one completion day.
    pub const fn show_completed_on(&mut self, on: Option<NaiveDate>) {
        self.completed_on = on;
    }

    /// The filtered board for the current query and roster, with the
    /// completed listing for the selected day.
    #[must_use]
    pub fn projection(&self) -> Projection {
        let store = self.reconciler.store();
        let mut projection = project(store, &self.query).with_roster(self.roster);
        projection.completed = completed_by_date(store, self.completed_on);
        projection
    }

    /// Takes pending notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    /// Applies (or, before initialization, queues) one push event.
    ///
    /// Returns the outcome if the event was applied. Rejected events raise a
    /// warning notice and leave the store unchanged.
    pub fn handle_event(&mut self, event: PushEvent) -> Option<Outcome> {
        let kind = event.kind();
        match self.queue.dispatch(event, &mut self.reconciler) {
            Dispatch::Queued { depth } => {
                debug!(kind, depth, "event held until snapshot loads");
                None
            }
            Dispatch::Applied(Ok(outcome)) => Some(outcome),
            Dispatch::Applied(Err(e)) => {
                warn!(kind, error = %e, "push event rejected");
                self.notify(NoticeLevel::Warning, "Invalid task data received");
                None
            }
        }
    }

    /// Reloads the snapshot, discarding unconfirmed local edits.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Api`] if the fetch fails; the store keeps its
    /// previous contents.
    pub async fn refetch(&mut self) -> Result<(), BoardError> {
        match self.api.fetch_snapshot(self.scope).await {
            Ok(snapshot) => {
                self.reconciler
                    .load_snapshot(&snapshot.employees, &snapshot.tasks);
                let dropped = self.ledger.len();
                self.ledger.clear();
                info!(scope = %self.scope, dropped, "board reloaded");
                Ok(())
            }
            Err(e) => {
                warn!(scope = %self.scope, error = %e, "refetch failed");
                self.notify(NoticeLevel::Error, "Failed to fetch tasks");
                Err(e.into())
            }
        }
    }

    /// Creates a task after validating it.
    ///
    /// The per-assignee rows returned by the service are applied
    /// immediately, each to its own list; the matching push events later
    /// are no-ops.
    ///
    /// # Errors
    ///
    /// [`BoardError::Draft`] if validation fails (nothing is sent), or
    /// [`BoardError::Api`] if the service rejects the request.
    pub async fn create_task(&mut self, draft: TaskDraft) -> Result<TaskRecord, BoardError> {
        validate_draft(&draft, today())?;
        let mutation = self.ledger.begin(MutationKind::Create, Vec::new());
        match self.api.create_task(&draft).await {
            Ok(created) => {
                self.ledger.confirm(mutation);
                self.ledger.prune_confirmed();
                let rows = if created.rows.is_empty() {
                    std::slice::from_ref(&created.record)
                } else {
                    created.rows.as_slice()
                };
                for row in rows {
                    if let Err(e) = self.reconciler.apply(&PushEvent::TaskCreated(row.clone())) {
                        warn!(error = %e, "service returned an unusable task record");
                    }
                }
                info!(task_id = ?created.record.task_id, rows = rows.len(), "task created");
                Ok(created.record)
            }
            Err(e) => {
                self.ledger.fail(mutation);
                warn!(error = %e, "create failed");
                self.notify(NoticeLevel::Error, "Failed to add task");
                Err(e.into())
            }
        }
    }

    /// Edits a task: validates, applies locally, then persists.
    ///
    /// # Errors
    ///
    /// [`BoardError::UnknownTask`] or [`BoardError::Draft`] before anything
    /// changes; [`BoardError::Api`] only if the recovery refetch also fails.
    pub async fn update_task(
        &mut self,
        task_id: TaskId,
        patch: TaskPatch,
    ) -> Result<Commit, BoardError> {
        let current = self
            .reconciler
            .store()
            .find(task_id)
            .cloned()
            .ok_or(BoardError::UnknownTask(task_id))?;
        let patch = prepare_edit(&current, patch, today())?;
        self.persist_edit(MutationKind::Update, task_id, patch)
            .await
    }

    /// Marks a task completed today. It leaves every active list and
    /// joins the completed listing.
    ///
    /// Work may finish before the planned start, so the edit-form date
    /// rules do not apply here.
    ///
    /// # Errors
    ///
    /// [`BoardError::UnknownTask`] if the task is not in an active list;
    /// [`BoardError::Api`] only if the recovery refetch also fails.
    pub async fn complete_task(&mut self, task_id: TaskId) -> Result<Commit, BoardError> {
        let current = self
            .reconciler
            .store()
            .find(task_id)
            .cloned()
            .ok_or(BoardError::UnknownTask(task_id))?;
        let patch = completion_patch(&current, today());
        self.persist_edit(MutationKind::Complete, task_id, patch)
            .await
    }

    /// Moves a completed task back to "To Do". It returns to the end of
    /// each assignee's list and its completion date is cleared.
    ///
    /// # Errors
    ///
    /// [`BoardError::UnknownTask`] if the task is not in the completed
    /// listing; otherwise the same as [`update_task`](Self::update_task).
    pub async fn reopen_task(&mut self, task_id: TaskId) -> Result<Commit, BoardError> {
        let current = self
            .reconciler
            .store()
            .archived(task_id)
            .cloned()
            .ok_or(BoardError::UnknownTask(task_id))?;
        let reopen = TaskPatch {
            status: Some(TaskStatus::Todo),
            ..TaskPatch::default()
        };
        let patch = prepare_edit(&current, reopen, today())?;
        self.persist_edit(MutationKind::Reopen, task_id, patch)
            .await
    }

    async fn persist_edit(
        &mut self,
        kind: MutationKind,
        task_id: TaskId,
        patch: TaskPatch,
    ) -> Result<Commit, BoardError> {
        self.reconciler.apply_local(&patch)?;
        let mutation = self.ledger.begin(kind, vec![task_id]);
        match self.api.update_task(task_id, &patch).await {
            Ok(record) => {
                self.ledger.confirm(mutation);
                self.ledger.prune_confirmed();
                if let Err(e) = self
                    .reconciler
                    .apply_local(&TaskPatch::from_record(&record))
                {
                    warn!(error = %e, "service returned an unusable task record");
                }
                debug!(%task_id, %kind, "edit confirmed");
                Ok(Commit::Confirmed)
            }
            Err(e) => {
                self.ledger.fail(mutation);
                self.recover(kind, &e).await
            }
        }
    }

    /// Deletes a task: removes it locally, then persists.
    ///
    /// A 404 from the service means someone else already deleted it; like
    /// any other failure, the board is reloaded.
    ///
    /// # Errors
    ///
    /// [`BoardError::UnknownTask`] if the task is neither listed nor
    /// completed; [`BoardError::Api`] only if the recovery refetch also
    /// fails.
    pub async fn delete_task(&mut self, task_id: TaskId) -> Result<Commit, BoardError> {
        let store = self.reconciler.store();
        if store.find(task_id).is_none() && store.archived(task_id).is_none() {
            return Err(BoardError::UnknownTask(task_id));
        }
        self.reconciler.remove(task_id);
        let mutation = self.ledger.begin(MutationKind::Delete, vec![task_id]);
        match self.api.delete_task(task_id).await {
            Ok(()) => {
                self.ledger.confirm(mutation);
                self.ledger.prune_confirmed();
                info!(%task_id, "task deleted");
                Ok(Commit::Confirmed)
            }
            Err(e) => {
                self.ledger.fail(mutation);
                self.recover(MutationKind::Delete, &e).await
            }
        }
    }

    /// Moves a task within one employee's list and persists the new order.
    ///
    /// The move shows immediately. One update is sent per task whose
    /// position changed, concurrently. Events that arrive meanwhile stay
    /// buffered in the subscription and apply afterwards in receipt order.
    ///
    /// # Errors
    ///
    /// [`BoardError::Reconcile`] for an unknown employee or a bad index
    /// (nothing changes); [`BoardError::Api`] only if the recovery refetch
    /// also fails.
    pub async fn reorder(
        &mut self,
        employee_id: EmployeeId,
        from: usize,
        to: usize,
    ) -> Result<Commit, BoardError> {
        let patches = self.reconciler.reorder(employee_id, from, to)?;
        if patches.is_empty() {
            return Ok(Commit::Confirmed);
        }
        let task_ids: Vec<TaskId> = patches.iter().filter_map(|p| p.task_id).collect();
        let mutation = self.ledger.begin(MutationKind::Reorder, task_ids);

        let api = &self.api;
        let results = join_all(
            patches
                .iter()
                .filter_map(|p| p.task_id.map(|id| api.update_task(id, p))),
        )
        .await;

        if let Some(e) = results.into_iter().find_map(Result::err) {
            self.ledger.fail(mutation);
            return self.recover(MutationKind::Reorder, &e).await;
        }
        self.ledger.confirm(mutation);
        self.ledger.prune_confirmed();
        debug!(%employee_id, moved = patches.len(), "reorder persisted");
        Ok(Commit::Confirmed)
    }

    /// Activates or deactivates an employee.
    ///
    /// The flag flips locally first. If the service rejects the change
    /// the old value is restored and an error notice is raised; a stale
    /// rejection reloads the board instead.
    ///
    /// # Errors
    ///
    /// [`BoardError::Reconcile`] for an employee without a column;
    /// [`BoardError::Api`] only if a recovery refetch also fails.
    pub async fn set_employee_active(
        &mut self,
        employee_id: EmployeeId,
        active: bool,
    ) -> Result<Commit, BoardError> {
        let previous = self
            .reconciler
            .store()
            .group(employee_id)
            .map(|g| g.active)
            .ok_or(ReconcileError::UnknownEmployee(employee_id))?;
        if previous == active {
            return Ok(Commit::Confirmed);
        }
        self.reconciler.set_employee_active(employee_id, active);
        let mutation = self.ledger.begin(MutationKind::EmployeeStatus, Vec::new());
        match self.api.set_employee_status(employee_id, active).await {
            Ok(record) => {
                self.ledger.confirm(mutation);
                self.ledger.prune_confirmed();
                self.reconciler.set_employee_active(employee_id, record.active);
                info!(%employee_id, active = record.active, "employee status changed");
                Ok(Commit::Confirmed)
            }
            Err(e) if e.is_stale() => {
                self.ledger.fail(mutation);
                self.recover(MutationKind::EmployeeStatus, &e).await
            }
            Err(e) => {
                self.ledger.fail(mutation);
                warn!(%employee_id, error = %e, "employee status change rejected");
                self.reconciler.set_employee_active(employee_id, previous);
                self.notify(NoticeLevel::Error, "Failed to update employee status");
                Ok(Commit::Reverted)
            }
        }
    }

    async fn recover(&mut self, kind: MutationKind, error: &ApiError) -> Result<Commit, BoardError> {
        warn!(%kind, %error, "edit rejected, reloading board");
        let message = match (kind, error.is_stale()) {
            (MutationKind::EmployeeStatus, true) => "Employee was changed elsewhere; reloaded".to_string(),
            (MutationKind::EmployeeStatus, false) => "Failed to update employee status".to_string(),
            (_, true) => "Task was changed elsewhere; reloaded".to_string(),
            (_, false) => format!("Failed to {kind} task"),
        };
        self.notify(NoticeLevel::Error, message);
        self.refetch().await?;
        Ok(Commit::Resynced)
    }

    /// Executes one command. Failures become notices.
    pub async fn execute(&mut self, command: BoardCommand) {
        let result = match command {
            BoardCommand::SetQuery(query) => {
                self.set_query(query);
                Ok(())
            }
            BoardCommand::Create(draft) => self.create_task(draft).await.map(drop),
            BoardCommand::Update { task_id, patch } => {
                self.update_task(task_id, patch).await.map(drop)
            }
            BoardCommand::Complete(task_id) => self.complete_task(task_id).await.map(drop),
            BoardCommand::Reopen(task_id) => self.reopen_task(task_id).await.map(drop),
            BoardCommand::Delete(task_id) => self.delete_task(task_id).await.map(drop),
            BoardCommand::Reorder {
                employee_id,
                from,
                to,
            } => self.reorder(employee_id, from, to).await.map(drop),
            BoardCommand::SetEmployeeActive {
                employee_id,
                active,
            } => self
                .set_employee_active(employee_id, active)
                .await
                .map(drop),
            BoardCommand::SetRoster(roster) => {
                self.set_roster(roster);
                Ok(())
            }
            BoardCommand::ShowCompletedOn(on) => {
                self.show_completed_on(on);
                Ok(())
            }
            BoardCommand::Refresh => self.refetch().await,
            BoardCommand::Unmount => Ok(()),
        };
        if let Err(e) = result {
            warn!(error = %e, "board command failed");
            if !matches!(e, BoardError::Api(_)) {
                self.notify(NoticeLevel::Warning, e.to_string());
            }
        }
    }

    async fn publish(&mut self, updates: &mpsc::Sender<BoardUpdate>) -> bool {
        for notice in self.take_notices() {
            if updates.send(BoardUpdate::Notice(notice)).await.is_err() {
                return false;
            }
        }
        updates
            .send(BoardUpdate::Board(self.projection()))
            .await
            .is_ok()
    }

    async fn resubscribe<C: PushChannel>(&self, channel: &C) -> Option<Subscription> {
        for attempt in 1..=self.options.reconnect_attempts {
            tokio::time::sleep(self.options.reconnect_delay).await;
            match channel.subscribe(self.scope).await {
                Ok(subscription) => {
                    info!(scope = %self.scope, attempt, "push channel re-established");
                    return Some(subscription);
                }
                Err(e) => warn!(scope = %self.scope, attempt, error = %e, "resubscribe failed"),
            }
        }
        None
    }

    /// Runs the view until [`BoardCommand::Unmount`], the command channel
    /// closes, or the push channel cannot be re-established.
    ///
    /// Publishes the projection after every event or command. When the push
    /// channel drops, the view resubscribes and refetches, since events may
    /// have been missed while disconnected. The subscription is released
    /// on return.
    pub async fn run<C: PushChannel>(
        mut self,
        channel: &C,
        mut subscription: Subscription,
        mut commands: mpsc::Receiver<BoardCommand>,
        updates: mpsc::Sender<BoardUpdate>,
    ) {
        if !self.publish(&updates).await {
            return;
        }
        loop {
            tokio::select! {
                event = subscription.next() => {
                    if let Some(event) = event {
                        self.handle_event(event);
                    } else {
                        self.notify(NoticeLevel::Warning, "Connection lost; reconnecting");
                        if let Some(fresh) = self.resubscribe(channel).await {
                            subscription = fresh;
                            if let Err(e) = self.refetch().await {
                                warn!(scope = %self.scope, error = %e, "reload after reconnect failed");
                            }
                        } else {
                            self.notify(NoticeLevel::Error, "Connection lost");
                            let _ = self.publish(&updates).await;
                            break;
                        }
                    }
                }
                command = commands.recv() => match command {
                    None | Some(BoardCommand::Unmount) => break,
                    Some(command) => self.execute(command).await,
                },
            }
            if !self.publish(&updates).await {
                break;
            }
        }
        drop(subscription);
        info!(scope = %self.scope, "board unmounted");
        let _ = updates.send(BoardUpdate::Closed).await;
    }
}
