// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::future_not_send,
    clippy::missing_panics_doc
)]

//! Integration tests for live board synchronization.
//!
//! Each test starts an in-process hub, mounts real boards against it
//! (`HttpTaskApi` for REST, `WsPushChannel` for push events), and checks
//! that edits made on one board show up on the others.
//!
//! These tests validate:
//! - A mounted board reflects the hub's snapshot
//! - Creates, completions, and deletes propagate to other boards
//! - A shared task lands at the end of each assignee's list
//! - Completed tasks join the completed listing and can be reopened
//! - Activating or deactivating an employee reaches the employee's board
//! - Reassigning a task moves it between employee boards
//! - A reorder persists the new order and other boards follow it
//! - Deleting a task someone else already deleted resyncs the board

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use taskboard::api::http::HttpTaskApi;
use taskboard::transport::Subscription;
use taskboard::transport::websocket::WsPushChannel;
use taskboard::view::{BoardView, Commit};
use taskboard_hub::server::{self, HubState};
use taskboard_proto::channel::Topic;
use taskboard_proto::employee::{EmployeeDraft, EmployeeId, Gender, OwnerId};
use taskboard_proto::task::{TaskDraft, TaskId, TaskPatch};
use url::Url;

const OWNER: OwnerId = OwnerId::new(1);

type Board = BoardView<HttpTaskApi>;

struct Hub {
    state: Arc<HubState>,
    api_url: Url,
    channel: WsPushChannel,
}

impl Hub {
    async fn start() -> Self {
        let state = Arc::new(HubState::new());
        let (addr, _handle) = server::start_server_with_state("127.0.0.1:0", Arc::clone(&state))
            .await
            .expect("failed to start hub");
        Self {
            state,
            api_url: Url::parse(&format!("http://{addr}")).unwrap(),
            channel: WsPushChannel::new(format!("ws://{addr}/ws"), 64),
        }
    }

    async fn employee(&self, first: &str) -> EmployeeId {
        self.state
            .repo
            .add_employee(EmployeeDraft {
                first_name: first.to_string(),
                last_name: "Tester".to_string(),
                gender: Gender::Other,
                owner_id: OWNER,
            })
            .await
            .unwrap()
            .id
    }

    async fn task(&self, title: &str, assignees: &[EmployeeId]) -> TaskId {
        self.state
            .repo
            .create(draft(title, assignees), today())
            .await
            .unwrap()
            .record
            .task_id
            .unwrap()
    }

    async fn task_starting_later(&self, title: &str, assignees: &[EmployeeId]) -> TaskId {
        let mut later = draft(title, assignees);
        later.start_date = Some(today() + chrono::Days::new(3));
        later.due_date = later.start_date;
        self.state
            .repo
            .create(later, today())
            .await
            .unwrap()
            .record
            .task_id
            .unwrap()
    }

    async fn mount(&self, scope: Topic) -> (Board, Subscription) {
        let api = HttpTaskApi::new(&self.api_url, Duration::from_secs(5)).unwrap();
        BoardView::mount(api, &self.channel, scope)
            .await
            .expect("mount failed")
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn draft(title: &str, assignees: &[EmployeeId]) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        description: String::new(),
        start_date: Some(today()),
        due_date: Some(today()),
        priority: None,
        status: None,
        position: None,
        owner_id: OWNER,
        employee_ids: assignees.to_vec(),
    }
}

fn titles(board: &Board, employee_id: EmployeeId) -> Vec<String> {
    board
        .read(employee_id)
        .into_iter()
        .map(|t| t.title)
        .collect()
}

/// Applies push events to `board` until `done` holds.
async fn pump_until(
    board: &mut Board,
    subscription: &mut Subscription,
    done: impl Fn(&Board) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done(board) {
            let event = subscription.next().await.expect("subscription closed");
            board.handle_event(event);
        }
    })
    .await
    .expect("timed out waiting for board to converge");
}

// =============================================================================
// Mounting
// =============================================================================

#[tokio::test]
async fn owner_board_reflects_snapshot() {
    let hub = Hub::start().await;
    let ada = hub.employee("Ada").await;
    let bo = hub.employee("Bo").await;
    hub.task("Write report", &[ada]).await;
    hub.task("Review report", &[ada, bo]).await;

    let (board, _sub) = hub.mount(Topic::Owner(OWNER)).await;

    assert_eq!(titles(&board, ada), vec!["Write report", "Review report"]);
    assert_eq!(titles(&board, bo), vec!["Review report"]);
    assert_eq!(board.projection().groups.len(), 2);
}

#[tokio::test]
async fn employee_board_shows_only_own_list() {
    let hub = Hub::start().await;
    let ada = hub.employee("Ada").await;
    let bo = hub.employee("Bo").await;
    hub.task("Write report", &[ada]).await;
    hub.task("Fix printer", &[bo]).await;

    let (board, _sub) = hub.mount(Topic::Employee(bo)).await;

    let projection = board.projection();
    assert_eq!(projection.groups.len(), 1);
    assert_eq!(projection.groups[0].employee_id, bo);
    assert_eq!(titles(&board, bo), vec!["Fix printer"]);
}

// =============================================================================
// Propagation
// =============================================================================

#[tokio::test]
async fn created_task_reaches_assignee_board() {
    let hub = Hub::start().await;
    let ada = hub.employee("Ada").await;

    let (mut owner, _owner_sub) = hub.mount(Topic::Owner(OWNER)).await;
    let (mut mine, mut mine_sub) = hub.mount(Topic::Employee(ada)).await;

    owner.create_task(draft("Plan offsite", &[ada])).await.unwrap();
    assert_eq!(titles(&owner, ada), vec!["Plan offsite"]);

    pump_until(&mut mine, &mut mine_sub, |b| !b.read(ada).is_empty()).await;
    assert_eq!(titles(&mine, ada), vec!["Plan offsite"]);
}

#[tokio::test]
async fn shared_task_lands_at_the_end_of_each_list() {
    let hub = Hub::start().await;
    let ada = hub.employee("Ada").await;
    let bo = hub.employee("Bo").await;
    hub.task("Ada's first", &[ada]).await;
    hub.task("Ada's second", &[ada]).await;

    let (mut owner, _owner_sub) = hub.mount(Topic::Owner(OWNER)).await;
    owner.create_task(draft("Shared", &[ada, bo])).await.unwrap();

    assert_eq!(titles(&owner, ada), vec!["Ada's first", "Ada's second", "Shared"]);
    assert_eq!(titles(&owner, bo), vec!["Shared"]);
}

#[tokio::test]
async fn completed_task_is_listed_and_can_be_reopened() {
    let hub = Hub::start().await;
    let ada = hub.employee("Ada").await;
    let id = hub.task_starting_later("Early finish", &[ada]).await;

    let (mut owner, mut owner_sub) = hub.mount(Topic::Owner(OWNER)).await;
    let (mut mine, mut mine_sub) = hub.mount(Topic::Employee(ada)).await;

    assert_eq!(mine.complete_task(id).await.unwrap(), Commit::Confirmed);
    assert!(mine.read(ada).is_empty());
    assert_eq!(mine.projection().completed_tasks().count(), 1);

    pump_until(&mut owner, &mut owner_sub, |b| {
        b.store().archived(id).is_some()
    })
    .await;
    assert!(owner.read(ada).is_empty());

    assert_eq!(owner.reopen_task(id).await.unwrap(), Commit::Confirmed);
    assert_eq!(titles(&owner, ada), vec!["Early finish"]);
    pump_until(&mut mine, &mut mine_sub, |b| !b.read(ada).is_empty()).await;
    assert!(mine.store().archived(id).is_none());
}

#[tokio::test]
async fn employee_status_reaches_employee_board() {
    let hub = Hub::start().await;
    let ada = hub.employee("Ada").await;

    let (mut owner, _owner_sub) = hub.mount(Topic::Owner(OWNER)).await;
    let (mut mine, mut mine_sub) = hub.mount(Topic::Employee(ada)).await;

    assert_eq!(
        owner.set_employee_active(ada, false).await.unwrap(),
        Commit::Confirmed
    );
    assert!(!owner.store().group(ada).unwrap().active);
    pump_until(&mut mine, &mut mine_sub, |b| {
        b.store().group(ada).is_some_and(|g| !g.active)
    })
    .await;
    assert!(!hub.state.repo.employee(ada).await.unwrap().active);
}

#[tokio::test]
async fn completed_task_leaves_every_board() {
    let hub = Hub::start().await;
    let ada = hub.employee("Ada").await;
    let id = hub.task("Write report", &[ada]).await;

    let (mut owner, _owner_sub) = hub.mount(Topic::Owner(OWNER)).await;
    let (mut mine, mut mine_sub) = hub.mount(Topic::Employee(ada)).await;
    assert_eq!(mine.read(ada).len(), 1);

    assert_eq!(owner.complete_task(id).await.unwrap(), Commit::Confirmed);
    assert!(owner.read(ada).is_empty());

    pump_until(&mut mine, &mut mine_sub, |b| b.read(ada).is_empty()).await;
    assert!(owner.ledger().is_empty());
}

#[tokio::test]
async fn deleted_task_leaves_every_board() {
    let hub = Hub::start().await;
    let ada = hub.employee("Ada").await;
    let id = hub.task("Write report", &[ada]).await;

    let (mut mine, _mine_sub) = hub.mount(Topic::Employee(ada)).await;
    let (mut owner, mut owner_sub) = hub.mount(Topic::Owner(OWNER)).await;

    assert_eq!(mine.delete_task(id).await.unwrap(), Commit::Confirmed);
    pump_until(&mut owner, &mut owner_sub, |b| b.read(ada).is_empty()).await;
    assert_eq!(hub.state.repo.task_count().await, 0);
}

#[tokio::test]
async fn reassignment_moves_task_between_employee_boards() {
    let hub = Hub::start().await;
    let ada = hub.employee("Ada").await;
    let bo = hub.employee("Bo").await;
    let id = hub.task("Write report", &[ada]).await;

    let (mut owner, _owner_sub) = hub.mount(Topic::Owner(OWNER)).await;
    let (mut ada_board, mut ada_sub) = hub.mount(Topic::Employee(ada)).await;
    let (mut bo_board, mut bo_sub) = hub.mount(Topic::Employee(bo)).await;

    let patch = TaskPatch {
        employee_ids: Some(vec![bo]),
        ..TaskPatch::default()
    };
    assert_eq!(owner.update_task(id, patch).await.unwrap(), Commit::Confirmed);
    assert!(owner.read(ada).is_empty());
    assert_eq!(titles(&owner, bo), vec!["Write report"]);

    pump_until(&mut ada_board, &mut ada_sub, |b| b.read(ada).is_empty()).await;
    pump_until(&mut bo_board, &mut bo_sub, |b| !b.read(bo).is_empty()).await;
    assert_eq!(titles(&bo_board, bo), vec!["Write report"]);
}

// =============================================================================
// Ordering
// =============================================================================

#[tokio::test]
async fn reorder_persists_and_other_boards_follow() {
    let hub = Hub::start().await;
    let ada = hub.employee("Ada").await;
    for title in ["First", "Second", "Third"] {
        hub.task(title, &[ada]).await;
    }

    let (mut mine, _mine_sub) = hub.mount(Topic::Employee(ada)).await;
    let (mut owner, mut owner_sub) = hub.mount(Topic::Owner(OWNER)).await;

    assert_eq!(mine.reorder(ada, 0, 2).await.unwrap(), Commit::Confirmed);
    assert_eq!(titles(&mine, ada), vec!["Second", "Third", "First"]);

    let stored: Vec<String> = hub
        .state
        .repo
        .tasks_for_employee(ada)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.title)
        .collect();
    assert_eq!(stored, vec!["Second", "Third", "First"]);

    pump_until(&mut owner, &mut owner_sub, |b| {
        titles(b, ada) == ["Second", "Third", "First"]
    })
    .await;
}

// =============================================================================
// Recovery
// =============================================================================

#[tokio::test]
async fn deleting_an_already_deleted_task_resyncs() {
    let hub = Hub::start().await;
    let ada = hub.employee("Ada").await;
    let gone = hub.task("Gone", &[ada]).await;
    hub.task("Kept", &[ada]).await;

    let (mut owner, _owner_sub) = hub.mount(Topic::Owner(OWNER)).await;

    // Removed behind the board's back: no push event is published.
    hub.state.repo.delete(gone).await.unwrap();

    assert_eq!(owner.delete_task(gone).await.unwrap(), Commit::Resynced);
    assert_eq!(titles(&owner, ada), vec!["Kept"]);
    assert!(owner.ledger().is_empty());
    assert!(!owner.take_notices().is_empty());
}

#[tokio::test]
async fn invalid_create_is_rejected_before_sending() {
    let hub = Hub::start().await;
    let ada = hub.employee("Ada").await;
    let (mut owner, _owner_sub) = hub.mount(Topic::Owner(OWNER)).await;

    let result = owner.create_task(draft("   ", &[ada])).await;
    assert!(result.is_err());
    assert_eq!(hub.state.repo.task_count().await, 0);
}
