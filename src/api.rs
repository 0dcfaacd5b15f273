use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    ProjectId, TaskId, TimeEntryId,
    project::{NewProject, Project, ProjectUpdate, ProjectWithCount},
    task::{NewTask, ReorderTasksRequest, Task, TaskStatus, TaskUpdate},
    time_entry::{NewTimeEntry, StartTimeEntry, TimeEntry, TimeEntryUpdate, TimeStatistics},
};

pub mod http;
#[cfg(test)]
pub mod memory;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to set up HTTP client: {0}")]
    ClientSetup(#[source] reqwest::Error),

    #[error("Backend unreachable at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} returned status {status}{}", body_suffix(.body))]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {url}: {source}")]
    InvalidResponse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Backend rejected the request: {0}")]
    Rejected(String),

    #[error("Backend response from {0} is missing its data")]
    MissingData(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Status { status: 404, .. })
    }
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

/// Envelope wrapping every backend response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: i64,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// The Focused To-Do REST API, one method per endpoint.
pub trait Backend {
    fn health(&self) -> Result<HealthStatus, ApiError>;

    fn list_projects(&self) -> Result<Vec<Project>, ApiError>;
    fn list_projects_with_counts(&self) -> Result<Vec<ProjectWithCount>, ApiError>;
    fn get_project(&self, id: ProjectId) -> Result<Project, ApiError>;
    fn create_project(&self, project: &NewProject) -> Result<Project, ApiError>;
    fn update_project(&self, id: ProjectId, update: &ProjectUpdate) -> Result<Project, ApiError>;
    fn delete_project(&self, id: ProjectId) -> Result<(), ApiError>;

    fn list_tasks(&self, project_id: Option<ProjectId>) -> Result<Vec<Task>, ApiError>;
    fn get_task(&self, id: TaskId) -> Result<Task, ApiError>;
    fn create_task(&self, task: &NewTask) -> Result<Task, ApiError>;
    /// Full update (PUT)
    fn update_task(&self, id: TaskId, update: &TaskUpdate) -> Result<Task, ApiError>;
    /// Partial update (PATCH)
    fn patch_task(&self, id: TaskId, update: &TaskUpdate) -> Result<Task, ApiError>;
    fn update_task_status(&self, id: TaskId, status: TaskStatus) -> Result<Task, ApiError>;
    fn delete_task(&self, id: TaskId) -> Result<(), ApiError>;
    fn list_subtasks(&self, id: TaskId) -> Result<Vec<Task>, ApiError>;
    fn reorder_tasks(&self, request: &ReorderTasksRequest) -> Result<(), ApiError>;
    fn task_time_statistics(&self, id: TaskId) -> Result<TimeStatistics, ApiError>;

    fn list_time_entries(
        &self,
        task_id: Option<TaskId>,
        project_id: Option<ProjectId>,
    ) -> Result<Vec<TimeEntry>, ApiError>;
    fn get_time_entry(&self, id: TimeEntryId) -> Result<TimeEntry, ApiError>;
    fn create_time_entry(&self, entry: &NewTimeEntry) -> Result<TimeEntry, ApiError>;
    fn update_time_entry(
        &self,
        id: TimeEntryId,
        update: &TimeEntryUpdate,
    ) -> Result<TimeEntry, ApiError>;
    fn delete_time_entry(&self, id: TimeEntryId) -> Result<(), ApiError>;
    fn start_time_entry(&self, request: &StartTimeEntry) -> Result<TimeEntry, ApiError>;
    fn stop_time_entry(&self, id: TimeEntryId) -> Result<TimeEntry, ApiError>;
    /// `None` when no timer is running.
    fn active_time_entry(&self) -> Result<Option<TimeEntry>, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let error = ApiError::Status {
            method: "GET",
            url: "http://localhost:8080/api/time-entries/active".to_string(),
            status: 404,
            body: String::new(),
        };
        assert!(error.is_not_found());
        assert!(!ApiError::Rejected("nope".to_string()).is_not_found());
    }

    #[test]
    fn test_status_error_message_includes_body() {
        let error = ApiError::Status {
            method: "DELETE",
            url: "http://localhost:8080/api/projects/4".to_string(),
            status: 500,
            body: "database is locked".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "DELETE http://localhost:8080/api/projects/4 returned status 500: database is locked"
        );
    }

    #[test]
    fn test_envelope_without_data() {
        let envelope: ApiResponse<Project> =
            serde_json::from_str(r#"{"success": false, "message": "Project not found"}"#).unwrap();
        assert_eq!(envelope.data, None);
        assert_eq!(envelope.message.as_deref(), Some("Project not found"));
    }
}
