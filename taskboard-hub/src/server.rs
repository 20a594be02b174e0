//! Hub server core: shared state, REST routes, and the push WebSocket.
//!
//! REST mutations go through the [`TaskRepository`] and then fan out push
//! events: each assignee's row goes to the owner's topic and to the
//! assignee's own topic, so both board kinds see the change. Employees who
//! lose a task are told on their own topic.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use taskboard_proto::channel::{ChannelMessage, Topic};
use taskboard_proto::codec;
use taskboard_proto::employee::{
    EmployeeDraft, EmployeeId, EmployeeRecord, EmployeeStatusUpdate, OwnerId,
};
use taskboard_proto::event::PushEvent;
use taskboard_proto::task::{CreatedTask, TaskDraft, TaskId, TaskPatch, TaskRecord};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::repo::{Mutation, RepoError, TaskRepository};
use crate::topics::TopicRegistry;

/// Default maximum accepted client frame (64 KB).
const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Errors surfaced by the hub.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// A repository rule was violated.
    #[error(transparent)]
    Repo(#[from] RepoError),
    /// A list request named neither an owner nor an employee.
    #[error("query must name an owner or an employee")]
    MissingScope,
    /// Binding or serving failed.
    #[error("hub I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Repo(RepoError::TaskNotFound(_) | RepoError::EmployeeNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Repo(RepoError::Invalid(_)) | Self::MissingScope => StatusCode::BAD_REQUEST,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Shared hub state.
#[derive(Debug)]
pub struct HubState {
    /// Employees and tasks.
    pub repo: TaskRepository,
    /// Joined push connections.
    pub topics: TopicRegistry,
    max_frame_size: usize,
    single_session: bool,
}

impl Default for HubState {
    fn default() -> Self {
        Self::new()
    }
}

impl HubState {
    /// Creates an empty hub with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_MAX_FRAME_SIZE, false)
    }

    /// Creates an empty hub.
    ///
    /// With `single_session`, a new owner connection force-disconnects the
    /// previous ones for the same owner.
    #[must_use]
    pub fn with_config(max_frame_size: usize, single_session: bool) -> Self {
        Self {
            repo: TaskRepository::new(),
            topics: TopicRegistry::new(),
            max_frame_size,
            single_session,
        }
    }

    /// Publishes one event to a topic.
    pub async fn publish(&self, topic: Topic, event: PushEvent) -> usize {
        self.topics
            .publish(topic, &ChannelMessage::Event(event))
            .await
    }

    async fn announce_created(&self, mutation: &Mutation) {
        let owner = Topic::Owner(mutation.owner_id);
        for row in &mutation.scoped {
            let Some(employee_id) = row.employee_id else {
                continue;
            };
            let event = PushEvent::TaskCreated(row.clone());
            self.publish(owner, event.clone()).await;
            self.publish(Topic::Employee(employee_id), event).await;
        }
    }

    async fn announce_updated(&self, mutation: &Mutation) {
        let owner = Topic::Owner(mutation.owner_id);
        for row in &mutation.scoped {
            let Some(employee_id) = row.employee_id else {
                continue;
            };
            let event = PushEvent::TaskUpdated(TaskPatch::from_record(row));
            self.publish(owner, event.clone()).await;
            self.publish(Topic::Employee(employee_id), event).await;
        }
        if !mutation.removed.is_empty() {
            let mut patch = TaskPatch::from_record(&mutation.record);
            patch.employees.clear();
            for employee_id in &mutation.removed {
                self.publish(
                    Topic::Employee(*employee_id),
                    PushEvent::TaskUpdated(patch.clone()),
                )
                .await;
            }
        }
    }

    async fn announce_employee_status(&self, record: &EmployeeRecord) {
        let event = PushEvent::EmployeeStatus {
            employee_id: record.id,
            active: record.active,
        };
        self.publish(Topic::Owner(record.owner_id), event.clone())
            .await;
        self.publish(Topic::Employee(record.id), event).await;
    }

    async fn announce_deleted(&self, mutation: &Mutation) {
        let event = PushEvent::TaskDeleted {
            task_id: mutation.record.task_id,
        };
        self.publish(Topic::Owner(mutation.owner_id), event.clone())
            .await;
        for employee_id in &mutation.removed {
            self.publish(Topic::Employee(*employee_id), event.clone())
                .await;
        }
    }
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

// ---------------------------------------------------------------------------
// REST
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ScopeQuery {
    owner: Option<OwnerId>,
    employee: Option<EmployeeId>,
}

async fn list_employees(
    State(state): State<Arc<HubState>>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<Vec<EmployeeRecord>>, HubError> {
    let owner = query.owner.ok_or(HubError::MissingScope)?;
    Ok(Json(state.repo.employees_of(owner).await))
}

async fn get_employee(
    State(state): State<Arc<HubState>>,
    Path(id): Path<EmployeeId>,
) -> Result<Json<EmployeeRecord>, HubError> {
    state
        .repo
        .employee(id)
        .await
        .map(Json)
        .ok_or(HubError::Repo(RepoError::EmployeeNotFound(id)))
}

async fn add_employee(
    State(state): State<Arc<HubState>>,
    Json(draft): Json<EmployeeDraft>,
) -> Result<(StatusCode, Json<EmployeeRecord>), HubError> {
    let record = state.repo.add_employee(draft).await?;
    tracing::info!(employee_id = %record.id, owner_id = %record.owner_id, "employee added");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn set_employee_status(
    State(state): State<Arc<HubState>>,
    Path(id): Path<EmployeeId>,
    Json(update): Json<EmployeeStatusUpdate>,
) -> Result<Json<EmployeeRecord>, HubError> {
    let record = state.repo.set_employee_active(id, update.active).await?;
    tracing::info!(employee_id = %id, active = record.active, "employee status changed");
    state.announce_employee_status(&record).await;
    Ok(Json(record))
}

async fn list_tasks(
    State(state): State<Arc<HubState>>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<Vec<TaskRecord>>, HubError> {
    let rows = match (query.employee, query.owner) {
        (Some(employee), _) => state.repo.tasks_for_employee(employee).await?,
        (None, Some(owner)) => state.repo.tasks_for_owner(owner).await,
        (None, None) => return Err(HubError::MissingScope),
    };
    Ok(Json(rows))
}

async fn create_task(
    State(state): State<Arc<HubState>>,
    Json(draft): Json<TaskDraft>,
) -> Result<(StatusCode, Json<CreatedTask>), HubError> {
    let mutation = state.repo.create(draft, today()).await?;
    tracing::info!(
        task_id = ?mutation.record.task_id,
        assignees = mutation.scoped.len(),
        "task created"
    );
    state.announce_created(&mutation).await;
    Ok((
        StatusCode::CREATED,
        Json(CreatedTask {
            record: mutation.record,
            rows: mutation.scoped,
        }),
    ))
}

async fn update_task(
    State(state): State<Arc<HubState>>,
    Path(id): Path<TaskId>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<TaskRecord>, HubError> {
    let mutation = state.repo.update(id, &patch, today()).await?;
    tracing::debug!(task_id = %id, removed = mutation.removed.len(), "task updated");
    state.announce_updated(&mutation).await;
    // A scoped edit (a reorder) is answered with that employee's row.
    let record = patch
        .employee_id
        .and_then(|e| mutation.scoped_for(e).cloned())
        .unwrap_or(mutation.record);
    Ok(Json(record))
}

async fn delete_task(
    State(state): State<Arc<HubState>>,
    Path(id): Path<TaskId>,
) -> Result<StatusCode, HubError> {
    let mutation = state.repo.delete(id).await?;
    tracing::info!(task_id = %id, "task deleted");
    state.announce_deleted(&mutation).await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Push channel
// ---------------------------------------------------------------------------

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<HubState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handles one push connection.
///
/// The connection lifecycle:
/// 1. Wait for a `Join` frame and check the topic.
/// 2. Add the connection to the topic, then send `Joined`.
/// 3. Forward published frames until either side closes.
/// 4. Leave the topic. Employees going offline are announced to the owner.
pub async fn handle_socket(socket: WebSocket, state: Arc<HubState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let Some(topic) = wait_for_join(&mut ws_receiver, state.max_frame_size).await else {
        tracing::warn!("connection closed before join");
        return;
    };

    let presence_owner = match topic {
        Topic::Owner(_) => None,
        Topic::Employee(employee_id) => {
            if let Some(employee) = state.repo.employee(employee_id).await {
                Some((employee_id, employee.owner_id))
            } else {
                tracing::warn!(%topic, "join for unknown employee");
                let err = ChannelMessage::Error {
                    reason: format!("unknown employee {employee_id}"),
                };
                let _ = send_frame(&mut ws_sender, &err).await;
                return;
            }
        }
    };

    let conn = state.topics.next_connection_id();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let exclusive = state.single_session && matches!(topic, Topic::Owner(_));
    let outcome = state.topics.join(topic, conn, tx, exclusive).await;
    for displaced in outcome.displaced {
        tracing::info!(%topic, "displacing previous session");
        if let Ok(bytes) = codec::encode(&ChannelMessage::ForceDisconnect {
            reason: "signed in elsewhere".to_string(),
        }) {
            let _ = displaced.send(Message::Binary(bytes.into()));
        }
    }

    // Frames published from here on wait in `rx` until the writer starts,
    // so the client always sees `Joined` first.
    if let Err(e) = send_frame(&mut ws_sender, &ChannelMessage::Joined { topic }).await {
        tracing::error!(%topic, %conn, error = %e, "failed to send Joined");
        state.topics.leave(topic, conn).await;
        return;
    }
    tracing::info!(%topic, %conn, "connection joined");

    if let Some((employee_id, owner_id)) = presence_owner
        && outcome.previous == 0
    {
        state
            .publish(
                Topic::Owner(owner_id),
                PushEvent::EmployeePresence {
                    employee_id,
                    online: true,
                },
            )
            .await;
    }

    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if ws_sender.send(msg).await.is_err() {
                tracing::warn!(%conn, "WebSocket write failed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    let max_frame_size = state.max_frame_size;
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Binary(data) => match codec::decode_bounded(&data, max_frame_size) {
                    Ok(ChannelMessage::Join { topic: again }) => {
                        tracing::debug!(%conn, %again, "duplicate join ignored");
                    }
                    Ok(other) => {
                        tracing::debug!(%conn, msg = ?other, "unexpected frame from client");
                    }
                    Err(e) => {
                        tracing::warn!(%conn, error = %e, "failed to decode client frame");
                    }
                },
                Message::Close(_) => {
                    tracing::info!(%conn, "received close frame");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut read_task => write_task.abort(),
        _ = &mut write_task => read_task.abort(),
    }

    let remaining = state.topics.leave(topic, conn).await;
    tracing::info!(%topic, %conn, "connection left");

    if let Some((employee_id, owner_id)) = presence_owner
        && remaining == 0
    {
        state
            .publish(
                Topic::Owner(owner_id),
                PushEvent::EmployeePresence {
                    employee_id,
                    online: false,
                },
            )
            .await;
    }
}

/// Waits for the first binary frame, expecting `Join`.
async fn wait_for_join(
    receiver: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
    max_frame_size: usize,
) -> Option<Topic> {
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Binary(data) => {
                return match codec::decode_bounded(&data, max_frame_size) {
                    Ok(ChannelMessage::Join { topic }) => Some(topic),
                    Ok(other) => {
                        tracing::warn!(msg = ?other, "expected Join, got different frame");
                        None
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to decode join frame");
                        None
                    }
                };
            }
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}

async fn send_frame(
    ws_sender: &mut (impl SinkExt<Message, Error = axum::Error> + Unpin),
    msg: &ChannelMessage,
) -> Result<(), String> {
    let bytes = codec::encode(msg).map_err(|e| e.to_string())?;
    ws_sender
        .send(Message::Binary(bytes.into()))
        .await
        .map_err(|e| format!("WebSocket send error: {e}"))
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

/// Builds the hub's router.
pub fn router(state: Arc<HubState>) -> Router {
    Router::new()
        .route("/employees", get(list_employees).post(add_employee))
        .route("/employees/{id}", get(get_employee))
        .route(
            "/employees/{id}/status",
            axum::routing::put(set_employee_status),
        )
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", axum::routing::put(update_task).delete(delete_task))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Starts a hub with empty state on `addr`.
///
/// Returns the bound address and the server task.
///
/// # Errors
///
/// Returns [`HubError::Io`] if the address cannot be bound.
pub async fn start_server(addr: &str) -> Result<(SocketAddr, JoinHandle<()>), HubError> {
    start_server_with_state(addr, Arc::new(HubState::new())).await
}

/// Starts a hub serving `state` on `addr`.
///
/// # Errors
///
/// Returns [`HubError::Io`] if the address cannot be bound.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<HubState>,
) -> Result<(SocketAddr, JoinHandle<()>), HubError> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "hub server error");
        }
    });

    Ok((bound_addr, handle))
}
