use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    api::{ApiError, ApiResponse, Backend, HealthStatus},
    models::{
        ProjectId, TaskId, TimeEntryId,
        project::{NewProject, Project, ProjectUpdate, ProjectWithCount},
        task::{NewTask, ReorderTasksRequest, Task, TaskStatus, TaskUpdate},
        time_entry::{NewTimeEntry, StartTimeEntry, TimeEntry, TimeEntryUpdate, TimeStatistics},
    },
};

const BODY_SNIPPET_LIMIT: usize = 300;

/// `Backend` over HTTP. No retries: a failed call is reported once.
pub struct RestBackend {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct StatusChange {
    status: TaskStatus,
}

impl RestBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::ClientSetup)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends the request and returns the body of a 2xx response.
    fn fetch(
        &self,
        request: RequestBuilder,
        method: &'static str,
        url: &str,
    ) -> Result<String, ApiError> {
        log::debug!("{method} {url}");

        let response = request.send().map_err(|source| ApiError::Unreachable {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        let body = response.text().map_err(|source| ApiError::Unreachable {
            url: url.to_string(),
            source,
        })?;
        log::trace!("{method} {url} -> {status}");

        if !status.is_success() {
            return Err(ApiError::Status {
                method,
                url: url.to_string(),
                status: status.as_u16(),
                body: error_message(&body),
            });
        }

        Ok(body)
    }

    fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &'static str,
        url: &str,
    ) -> Result<T, ApiError> {
        let body = self.fetch(request, method, url)?;
        decode_envelope(url, &body)
    }

    fn send_ok(
        &self,
        request: RequestBuilder,
        method: &'static str,
        url: &str,
    ) -> Result<(), ApiError> {
        let body = self.fetch(request, method, url)?;
        if body.trim().is_empty() {
            return Ok(());
        }
        parse_envelope::<serde_json::Value>(url, &body).map(|_| ())
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        self.send_json(self.client.get(&url), "GET", &url)
    }

    /// GET with only the filters that are set as query parameters.
    fn filtered_get(&self, url: &str, filters: &[(&str, Option<u64>)]) -> RequestBuilder {
        let query: Vec<(&str, u64)> = filters
            .iter()
            .filter_map(|(key, value)| value.map(|v| (*key, v)))
            .collect();
        self.client.get(url).query(&query)
    }

    fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        self.send_json(self.client.post(&url).json(body), "POST", &url)
    }

    fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        self.send_json(self.client.put(&url).json(body), "PUT", &url)
    }

    fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let mut request = self.client.patch(&url);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send_json(request, "PATCH", &url)
    }

    fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        self.send_ok(self.client.delete(&url), "DELETE", &url)
    }
}

impl Backend for RestBackend {
    fn health(&self) -> Result<HealthStatus, ApiError> {
        let url = self.url("/api/health");
        let body = self.fetch(self.client.get(&url), "GET", &url)?;
        decode_health(&url, &body)
    }

    fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.get("/api/projects")
    }

    fn list_projects_with_counts(&self) -> Result<Vec<ProjectWithCount>, ApiError> {
        self.get("/api/projects/with-counts")
    }

    fn get_project(&self, id: ProjectId) -> Result<Project, ApiError> {
        self.get(&format!("/api/projects/{id}"))
    }

    fn create_project(&self, project: &NewProject) -> Result<Project, ApiError> {
        self.post("/api/projects", project)
    }

    fn update_project(&self, id: ProjectId, update: &ProjectUpdate) -> Result<Project, ApiError> {
        self.put(&format!("/api/projects/{id}"), update)
    }

    fn delete_project(&self, id: ProjectId) -> Result<(), ApiError> {
        self.delete(&format!("/api/projects/{id}"))
    }

    fn list_tasks(&self, project_id: Option<ProjectId>) -> Result<Vec<Task>, ApiError> {
        let url = self.url("/api/tasks");
        let request = self.filtered_get(&url, &[("project_id", project_id)]);
        self.send_json(request, "GET", &url)
    }

    fn get_task(&self, id: TaskId) -> Result<Task, ApiError> {
        self.get(&format!("/api/tasks/{id}"))
    }

    fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        self.post("/api/tasks", task)
    }

    fn update_task(&self, id: TaskId, update: &TaskUpdate) -> Result<Task, ApiError> {
        self.put(&format!("/api/tasks/{id}"), update)
    }

    fn patch_task(&self, id: TaskId, update: &TaskUpdate) -> Result<Task, ApiError> {
        self.patch(&format!("/api/tasks/{id}"), Some(update))
    }

    fn update_task_status(&self, id: TaskId, status: TaskStatus) -> Result<Task, ApiError> {
        self.patch(
            &format!("/api/tasks/{id}/status"),
            Some(&StatusChange { status }),
        )
    }

    fn delete_task(&self, id: TaskId) -> Result<(), ApiError> {
        self.delete(&format!("/api/tasks/{id}"))
    }

    fn list_subtasks(&self, id: TaskId) -> Result<Vec<Task>, ApiError> {
        self.get(&format!("/api/tasks/{id}/subtasks"))
    }

    fn reorder_tasks(&self, request: &ReorderTasksRequest) -> Result<(), ApiError> {
        let url = self.url("/api/tasks/reorder");
        self.send_ok(self.client.post(&url).json(request), "POST", &url)
    }

    fn task_time_statistics(&self, id: TaskId) -> Result<TimeStatistics, ApiError> {
        self.get(&format!("/api/tasks/{id}/time-stats"))
    }

    fn list_time_entries(
        &self,
        task_id: Option<TaskId>,
        project_id: Option<ProjectId>,
    ) -> Result<Vec<TimeEntry>, ApiError> {
        let url = self.url("/api/time-entries");
        let request =
            self.filtered_get(&url, &[("task_id", task_id), ("project_id", project_id)]);
        self.send_json(request, "GET", &url)
    }

    fn get_time_entry(&self, id: TimeEntryId) -> Result<TimeEntry, ApiError> {
        self.get(&format!("/api/time-entries/{id}"))
    }

    fn create_time_entry(&self, entry: &NewTimeEntry) -> Result<TimeEntry, ApiError> {
        self.post("/api/time-entries", entry)
    }

    fn update_time_entry(
        &self,
        id: TimeEntryId,
        update: &TimeEntryUpdate,
    ) -> Result<TimeEntry, ApiError> {
        self.put(&format!("/api/time-entries/{id}"), update)
    }

    fn delete_time_entry(&self, id: TimeEntryId) -> Result<(), ApiError> {
        self.delete(&format!("/api/time-entries/{id}"))
    }

    fn start_time_entry(&self, request: &StartTimeEntry) -> Result<TimeEntry, ApiError> {
        self.post("/api/time-entries/start", request)
    }

    fn stop_time_entry(&self, id: TimeEntryId) -> Result<TimeEntry, ApiError> {
        self.patch::<_, ()>(&format!("/api/time-entries/{id}/stop"), None)
    }

    fn active_time_entry(&self) -> Result<Option<TimeEntry>, ApiError> {
        let url = self.url("/api/time-entries/active");
        match self.fetch(self.client.get(&url), "GET", &url) {
            Ok(body) => Ok(parse_envelope::<TimeEntry>(&url, &body)?.data),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Parses the envelope and rejects `success: false`.
pub(crate) fn parse_envelope<T: DeserializeOwned>(
    url: &str,
    body: &str,
) -> Result<ApiResponse<T>, ApiError> {
    let envelope: ApiResponse<T> =
        serde_json::from_str(body).map_err(|source| ApiError::InvalidResponse {
            url: url.to_string(),
            source,
        })?;

    if !envelope.success {
        let message = envelope
            .message
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(ApiError::Rejected(message));
    }

    Ok(envelope)
}

pub(crate) fn decode_envelope<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, ApiError> {
    parse_envelope(url, body)?
        .data
        .ok_or_else(|| ApiError::MissingData(url.to_string()))
}

/// The health endpoint answers with a bare status object, older backends wrap it.
pub(crate) fn decode_health(url: &str, body: &str) -> Result<HealthStatus, ApiError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Health {
        Bare(HealthStatus),
        Wrapped(ApiResponse<HealthStatus>),
    }

    let health: Health =
        serde_json::from_str(body).map_err(|source| ApiError::InvalidResponse {
            url: url.to_string(),
            source,
        })?;

    match health {
        Health::Bare(status) => Ok(status),
        Health::Wrapped(envelope) => envelope
            .data
            .ok_or_else(|| ApiError::MissingData(url.to_string())),
    }
}

/// Prefers the backend's `{"error": ...}` message over the raw body.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.error;
    }
    body.trim().chars().take(BODY_SNIPPET_LIMIT).collect()
}
