// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::future_not_send,
    clippy::missing_panics_doc
)]

//! Integration tests for the REST client and push channel against the hub.
//!
//! These tests validate:
//! - `HttpTaskApi` round-trips employees and tasks through the hub
//! - Service errors map to the right `ApiError` variants
//! - `WsPushChannel` subscriptions receive the events REST mutations produce
//! - Presence is announced to the owner topic
//! - Employee activation round-trips and reaches both topics
//! - Joining an unknown employee topic is rejected

use std::time::Duration;

use chrono::NaiveDate;
use taskboard::api::http::HttpTaskApi;
use taskboard::api::{ApiError, TaskApi};
use taskboard::transport::websocket::WsPushChannel;
use taskboard::transport::{ChannelError, PushChannel, Subscription};
use taskboard_hub::server;
use taskboard_proto::channel::Topic;
use taskboard_proto::employee::{EmployeeDraft, EmployeeId, Gender, OwnerId};
use taskboard_proto::event::PushEvent;
use taskboard_proto::task::{TaskDraft, TaskId, TaskPatch, TaskStatus};
use url::Url;

const OWNER: OwnerId = OwnerId::new(7);

/// Start the hub in-process and return its REST client, push channel, and base URL.
async fn start_hub() -> (HttpTaskApi, WsPushChannel, Url) {
    let (addr, _handle) = server::start_server("127.0.0.1:0")
        .await
        .expect("failed to start hub");
    let base = Url::parse(&format!("http://{addr}")).unwrap();
    let api = HttpTaskApi::new(&base, Duration::from_secs(5)).unwrap();
    let channel = WsPushChannel::new(format!("ws://{addr}/ws"), 32);
    (api, channel, base)
}

async fn add(api: &HttpTaskApi, first: &str) -> EmployeeId {
    api.add_employee(&EmployeeDraft {
        first_name: first.to_string(),
        last_name: "Tester".to_string(),
        gender: Gender::Female,
        owner_id: OWNER,
    })
    .await
    .unwrap()
    .id
}

fn draft(title: &str, assignees: &[EmployeeId]) -> TaskDraft {
    let day = NaiveDate::from_ymd_opt(2026, 11, 2).unwrap();
    TaskDraft {
        title: title.to_string(),
        description: "details".to_string(),
        start_date: Some(day),
        due_date: Some(day),
        priority: None,
        status: None,
        position: None,
        owner_id: OWNER,
        employee_ids: assignees.to_vec(),
    }
}

async fn next_event(subscription: &mut Subscription) -> PushEvent {
    tokio::time::timeout(Duration::from_secs(5), subscription.next())
        .await
        .expect("timed out waiting for push event")
        .expect("subscription closed")
}

// =============================================================================
// REST
// =============================================================================

#[tokio::test]
async fn snapshot_contains_created_rows() {
    let (api, _channel, _base) = start_hub().await;
    let ada = add(&api, "Ada").await;
    let bo = add(&api, "Bo").await;

    let created = api.create_task(&draft("Pair on docs", &[ada, bo])).await.unwrap();
    assert!(created.record.task_id.is_some());
    assert_eq!(created.record.employee_id, None);
    assert_eq!(created.record.employee_ids, vec![ada, bo]);
    let scopes: Vec<_> = created.rows.iter().map(|r| r.employee_id).collect();
    assert_eq!(scopes, vec![Some(ada), Some(bo)]);

    let snapshot = api.fetch_snapshot(Topic::Owner(OWNER)).await.unwrap();
    assert_eq!(snapshot.employees.len(), 2);
    // One row per assignment.
    assert_eq!(snapshot.tasks.len(), 2);
    assert!(snapshot.tasks.iter().all(|r| r.employee_id.is_some()));

    let mine = api.fetch_snapshot(Topic::Employee(bo)).await.unwrap();
    assert_eq!(mine.employees.len(), 1);
    assert_eq!(mine.tasks.len(), 1);
    assert_eq!(mine.tasks[0].employee_id, Some(bo));
}

#[tokio::test]
async fn update_of_unknown_task_is_not_found() {
    let (api, _channel, _base) = start_hub().await;
    let patch = TaskPatch {
        title: Some("Nope".to_string()),
        ..TaskPatch::default()
    };
    let err = api.update_task(TaskId::new(404), &patch).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(id) if id == TaskId::new(404)));
    assert!(err.is_stale());

    let err = api.delete_task(TaskId::new(404)).await.unwrap_err();
    assert!(err.is_stale());
}

#[tokio::test]
async fn invalid_create_is_bad_request() {
    let (api, _channel, _base) = start_hub().await;
    let err = api.create_task(&draft("Nobody", &[])).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 400, .. }));
}

#[tokio::test]
async fn create_rows_carry_each_assignee_position() {
    let (api, _channel, _base) = start_hub().await;
    let ada = add(&api, "Ada").await;
    let bo = add(&api, "Bo").await;
    api.create_task(&draft("Ada's first", &[ada])).await.unwrap();

    let created = api.create_task(&draft("Shared", &[ada, bo])).await.unwrap();
    let position = |id| {
        created
            .rows
            .iter()
            .find(|r| r.employee_id == Some(id))
            .map(|r| r.position)
    };
    assert_eq!(position(ada), Some(1));
    assert_eq!(position(bo), Some(0));
}

#[tokio::test]
async fn completing_before_start_date_is_accepted() {
    let (api, _channel, _base) = start_hub().await;
    let ada = add(&api, "Ada").await;
    let mut early = draft("Early bird", &[ada]);
    early.start_date = early.start_date.map(|d| d + chrono::Days::new(5));
    early.due_date = early.start_date;
    let id = api
        .create_task(&early)
        .await
        .unwrap()
        .record
        .task_id
        .unwrap();

    let patch = TaskPatch {
        status: Some(TaskStatus::Completed),
        ..TaskPatch::default()
    };
    let record = api.update_task(id, &patch).await.unwrap();
    assert_eq!(record.status, TaskStatus::Completed);
}

#[tokio::test]
async fn employee_status_round_trips() {
    let (api, _channel, _base) = start_hub().await;
    let ada = add(&api, "Ada").await;

    let record = api.set_employee_status(ada, false).await.unwrap();
    assert!(!record.active);
    let snapshot = api.fetch_snapshot(Topic::Owner(OWNER)).await.unwrap();
    assert!(!snapshot.employees[0].active);

    let err = api
        .set_employee_status(EmployeeId::new(404), true)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 404, .. }));
}

#[tokio::test]
async fn listing_tasks_requires_a_scope() {
    let (_api, _channel, base) = start_hub().await;
    let response = reqwest::get(base.join("tasks").unwrap()).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn completing_stamps_completion_date() {
    let (api, _channel, _base) = start_hub().await;
    let ada = add(&api, "Ada").await;
    let id = api
        .create_task(&draft("Ship it", &[ada]))
        .await
        .unwrap()
        .record
        .task_id
        .unwrap();

    let patch = TaskPatch {
        status: Some(TaskStatus::Completed),
        ..TaskPatch::default()
    };
    let record = api.update_task(id, &patch).await.unwrap();
    assert_eq!(record.status, TaskStatus::Completed);
    assert!(record.completion_date.is_some());
}

// =============================================================================
// Push channel
// =============================================================================

#[tokio::test]
async fn owner_subscription_receives_created_rows() {
    let (api, channel, _base) = start_hub().await;
    let ada = add(&api, "Ada").await;
    let mut owner = channel.subscribe(Topic::Owner(OWNER)).await.unwrap();

    let created = api.create_task(&draft("Plan", &[ada])).await.unwrap();

    let PushEvent::TaskCreated(row) = next_event(&mut owner).await else {
        panic!("expected task-created");
    };
    assert_eq!(row.task_id, created.record.task_id);
    assert_eq!(row.employee_id, Some(ada));
    assert_eq!(row.employees.len(), 1);
}

#[tokio::test]
async fn other_owners_hear_nothing() {
    let (api, channel, _base) = start_hub().await;
    let ada = add(&api, "Ada").await;
    let mut stranger = channel
        .subscribe(Topic::Owner(OwnerId::new(999)))
        .await
        .unwrap();

    api.create_task(&draft("Plan", &[ada])).await.unwrap();

    let waited = tokio::time::timeout(Duration::from_millis(300), stranger.next()).await;
    assert!(waited.is_err(), "unrelated owner should receive no events");
}

#[tokio::test]
async fn employee_presence_is_announced_to_owner() {
    let (api, channel, _base) = start_hub().await;
    let ada = add(&api, "Ada").await;
    let mut owner = channel.subscribe(Topic::Owner(OWNER)).await.unwrap();

    let mine = channel.subscribe(Topic::Employee(ada)).await.unwrap();
    assert_eq!(
        next_event(&mut owner).await,
        PushEvent::EmployeePresence {
            employee_id: ada,
            online: true,
        }
    );

    drop(mine);
    assert_eq!(
        next_event(&mut owner).await,
        PushEvent::EmployeePresence {
            employee_id: ada,
            online: false,
        }
    );
}

#[tokio::test]
async fn employee_status_reaches_owner_and_employee() {
    let (api, channel, _base) = start_hub().await;
    let ada = add(&api, "Ada").await;
    let mut owner = channel.subscribe(Topic::Owner(OWNER)).await.unwrap();
    let mut mine = channel.subscribe(Topic::Employee(ada)).await.unwrap();
    // Presence announcement for the employee subscription.
    next_event(&mut owner).await;

    api.set_employee_status(ada, false).await.unwrap();

    let expected = PushEvent::EmployeeStatus {
        employee_id: ada,
        active: false,
    };
    assert_eq!(next_event(&mut owner).await, expected);
    assert_eq!(next_event(&mut mine).await, expected);
}

#[tokio::test]
async fn unknown_employee_topic_is_rejected() {
    let (_api, channel, _base) = start_hub().await;
    let result = channel.subscribe(Topic::Employee(EmployeeId::new(42))).await;
    assert!(matches!(result, Err(ChannelError::Rejected(_))));
}
