//! HTTP implementation of [`TaskApi`] on top of `reqwest`.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use taskboard_proto::channel::Topic;
use taskboard_proto::employee::{EmployeeDraft, EmployeeId, EmployeeRecord, EmployeeStatusUpdate};
use taskboard_proto::task::{CreatedTask, TaskDraft, TaskId, TaskPatch, TaskRecord};
use tracing::debug;
use url::Url;

use super::{ApiError, Snapshot, TaskApi};

/// REST client for the task service.
#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: Client,
    base: String,
}

impl HttpTaskApi {
    /// Creates a client rooted at `base` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn new(base: &Url, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base: base.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base)
    }

    /// Adds an employee under an admin and returns the stored profile.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails or is rejected.
    pub async fn add_employee(&self, draft: &EmployeeDraft) -> Result<EmployeeRecord, ApiError> {
        let response = self
            .client
            .post(self.url("employees"))
            .json(draft)
            .send()
            .await?;
        read_json(response, None).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await?;
        read_json(response, None).await
    }
}

impl TaskApi for HttpTaskApi {
    async fn fetch_snapshot(&self, scope: Topic) -> Result<Snapshot, ApiError> {
        let (employees, tasks) = match scope {
            Topic::Owner(owner) => {
                let query = [("owner", owner.to_string())];
                let employees: Vec<EmployeeRecord> = self.get_json("employees", &query).await?;
                let tasks: Vec<TaskRecord> = self.get_json("tasks", &query).await?;
                (employees, tasks)
            }
            Topic::Employee(employee) => {
                let profile: EmployeeRecord =
                    self.get_json(&format!("employees/{employee}"), &[]).await?;
                let tasks: Vec<TaskRecord> = self
                    .get_json("tasks", &[("employee", employee.to_string())])
                    .await?;
                (vec![profile], tasks)
            }
        };
        debug!(%scope, employees = employees.len(), tasks = tasks.len(), "snapshot fetched");
        Ok(Snapshot { employees, tasks })
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<CreatedTask, ApiError> {
        let response = self
            .client
            .post(self.url("tasks"))
            .json(draft)
            .send()
            .await?;
        read_json(response, None).await
    }

    async fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> Result<TaskRecord, ApiError> {
        let response = self
            .client
            .put(self.url(&format!("tasks/{task_id}")))
            .json(patch)
            .send()
            .await?;
        read_json(response, Some(task_id)).await
    }

    async fn delete_task(&self, task_id: TaskId) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("tasks/{task_id}")))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify(status, body, Some(task_id)))
    }

    async fn set_employee_status(
        &self,
        employee_id: EmployeeId,
        active: bool,
    ) -> Result<EmployeeRecord, ApiError> {
        let response = self
            .client
            .put(self.url(&format!("employees/{employee_id}/status")))
            .json(&EmployeeStatusUpdate { active })
            .send()
            .await?;
        read_json(response, None).await
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

async fn read_json<T: DeserializeOwned>(
    response: Response,
    task_id: Option<TaskId>,
) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(classify(status, body, task_id));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

/// Maps a non-success status to an [`ApiError`].
fn classify(status: StatusCode, body: String, task_id: Option<TaskId>) -> ApiError {
    match (status, task_id) {
        (StatusCode::NOT_FOUND, Some(id)) => ApiError::NotFound(id),
        (StatusCode::CONFLICT, _) => ApiError::Conflict(body),
        _ => ApiError::Status {
            status: status.as_u16(),
            body,
        },
    }
}
