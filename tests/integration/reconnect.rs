// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::future_not_send,
    clippy::missing_panics_doc
)]

//! Integration tests for push-channel loss and recovery.
//!
//! Tests that a board started with `spawn_board` notices when the hub drops
//! its push connection, resubscribes, and reloads the snapshot so changes
//! made while it was disconnected are not lost.
//!
//! ## Disconnect simulation
//!
//! `TopicRegistry::close_all_connections` makes the hub send a Close frame
//! on every push connection, which ends the client's reader just as a
//! network drop would. Aborting the server task as well stops new
//! connections, so resubscribing fails.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use taskboard::net::{self, BoardConfig};
use taskboard::tasks::Projection;
use taskboard::view::{BoardCommand, BoardUpdate, NoticeLevel, ViewOptions};
use taskboard_hub::server::{self, HubState};
use taskboard_proto::channel::Topic;
use taskboard_proto::employee::{EmployeeDraft, EmployeeId, Gender, OwnerId};
use taskboard_proto::task::TaskDraft;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

const OWNER: OwnerId = OwnerId::new(3);

async fn start_hub() -> (Arc<HubState>, BoardConfig, JoinHandle<()>) {
    let state = Arc::new(HubState::new());
    let (addr, handle) = server::start_server_with_state("127.0.0.1:0", Arc::clone(&state))
        .await
        .expect("failed to start hub");
    let config = BoardConfig {
        api_url: Url::parse(&format!("http://{addr}")).unwrap(),
        push_url: Url::parse(&format!("ws://{addr}/ws")).unwrap(),
        scope: Topic::Owner(OWNER),
        request_timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
        channel_capacity: 64,
        max_frame_size: 64 * 1024,
        view: ViewOptions {
            reconnect_attempts: 3,
            reconnect_delay: Duration::from_millis(100),
        },
        query: String::new(),
    };
    (state, config, handle)
}

async fn add(state: &HubState, first: &str) -> EmployeeId {
    state
        .repo
        .add_employee(EmployeeDraft {
            first_name: first.to_string(),
            last_name: "Tester".to_string(),
            gender: Gender::Male,
            owner_id: OWNER,
        })
        .await
        .unwrap()
        .id
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 12, 1).unwrap()
}

fn draft(title: &str, assignee: EmployeeId) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        description: String::new(),
        start_date: Some(day()),
        due_date: Some(day()),
        priority: None,
        status: None,
        position: None,
        owner_id: OWNER,
        employee_ids: vec![assignee],
    }
}

/// Reads updates until one satisfies `pred`, returning every update seen.
async fn collect_until(
    updates: &mut mpsc::Receiver<BoardUpdate>,
    pred: impl Fn(&BoardUpdate) -> bool,
) -> Vec<BoardUpdate> {
    let mut seen = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(update) = updates.recv().await {
            let done = pred(&update);
            seen.push(update);
            if done {
                return;
            }
        }
        panic!("update channel closed early");
    })
    .await
    .expect("timed out waiting for board update");
    seen
}

fn shows(update: &BoardUpdate, title: &str) -> bool {
    matches!(update, BoardUpdate::Board(Projection { groups, .. })
        if groups.iter().any(|g| g.tasks.iter().any(|t| t.title == title)))
}

// =============================================================================
// Recovery after a dropped push connection
// =============================================================================

#[tokio::test]
async fn board_reloads_after_push_connection_drops() {
    let (state, config, _handle) = start_hub().await;
    let ada = add(&state, "Ada").await;

    let (_cmd_tx, mut updates) = net::spawn_board(config).await.unwrap();
    let first = collect_until(&mut updates, |u| matches!(u, BoardUpdate::Board(_))).await;
    assert!(matches!(first.last(), Some(BoardUpdate::Board(p)) if p.groups.len() == 1));

    // Created without publishing, so only a reload can surface it.
    state
        .repo
        .create(draft("Missed while away", ada), day())
        .await
        .unwrap();
    state.topics.close_all_connections().await;

    let seen = collect_until(&mut updates, |u| shows(u, "Missed while away")).await;
    assert!(seen.iter().any(|u| matches!(
        u,
        BoardUpdate::Notice(n) if n.level == NoticeLevel::Warning
    )));
}

#[tokio::test]
async fn live_events_resume_after_reconnect() {
    let (state, config, _handle) = start_hub().await;
    let ada = add(&state, "Ada").await;
    let api = taskboard::api::http::HttpTaskApi::new(&config.api_url, Duration::from_secs(5))
        .unwrap();

    let (_cmd_tx, mut updates) = net::spawn_board(config).await.unwrap();
    collect_until(&mut updates, |u| matches!(u, BoardUpdate::Board(_))).await;

    state.topics.close_all_connections().await;
    collect_until(&mut updates, |u| matches!(u, BoardUpdate::Notice(_))).await;

    // Wait for the new subscription before publishing.
    tokio::time::timeout(Duration::from_secs(5), async {
        while state.topics.subscriber_count(Topic::Owner(OWNER)).await == 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("board never resubscribed");

    taskboard::api::TaskApi::create_task(&api, &draft("After reconnect", ada))
        .await
        .unwrap();
    collect_until(&mut updates, |u| shows(u, "After reconnect")).await;
}

// =============================================================================
// Giving up
// =============================================================================

#[tokio::test]
async fn board_closes_when_hub_is_gone() {
    let (state, config, handle) = start_hub().await;
    add(&state, "Ada").await;

    let (_cmd_tx, mut updates) = net::spawn_board(config).await.unwrap();
    collect_until(&mut updates, |u| matches!(u, BoardUpdate::Board(_))).await;

    handle.abort();
    state.topics.close_all_connections().await;

    let seen = collect_until(&mut updates, |u| matches!(u, BoardUpdate::Closed)).await;
    assert!(seen.iter().any(|u| matches!(
        u,
        BoardUpdate::Notice(n) if n.level == NoticeLevel::Error
    )));
}

#[tokio::test]
async fn unmount_releases_the_subscription() {
    let (state, config, _handle) = start_hub().await;
    add(&state, "Ada").await;

    let (cmd_tx, mut updates) = net::spawn_board(config).await.unwrap();
    collect_until(&mut updates, |u| matches!(u, BoardUpdate::Board(_))).await;
    assert_eq!(state.topics.subscriber_count(Topic::Owner(OWNER)).await, 1);

    cmd_tx.send(BoardCommand::Unmount).await.unwrap();
    collect_until(&mut updates, |u| matches!(u, BoardUpdate::Closed)).await;

    tokio::time::timeout(Duration::from_secs(5), async {
        while state.topics.subscriber_count(Topic::Owner(OWNER)).await > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("hub still holds the connection");
}
