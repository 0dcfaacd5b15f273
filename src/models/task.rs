use std::{fmt, str::FromStr};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::models::{
    ProjectId, TaskId, ValidationError, check_length, empty_as_none, non_empty,
};

pub const MAX_PRIORITY: u32 = 10;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Backend identifier of the task
    pub id: TaskId,
    /// The project owning this task
    pub project_id: ProjectId,
    /// Parent task when this is a sub-task (one level deep)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    /// Title of the task
    pub title: String,
    /// Notes of the task
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    pub status: TaskStatus,
    /// 0 to 10 when set by a form, unbounded after a reorder
    #[serde(default)]
    pub priority: u32,
    /// Deadline for this task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Task {
    pub fn priority_bucket(&self) -> Priority {
        Priority::from_value(self.priority)
    }

    pub fn is_subtask(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Case-insensitive search over title and description.
    pub fn matches_query(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query)
            || self
                .description
                .as_ref()
                .is_some_and(|d| d.to_lowercase().contains(&query))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Cancelled,
    ];

    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Human representation used in messages ("in progress")
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// The quick toggle of the task list: pending -> in progress -> completed -> pending.
    pub fn next(&self) -> TaskStatus {
        match self {
            TaskStatus::Pending => TaskStatus::InProgress,
            TaskStatus::InProgress => TaskStatus::Completed,
            TaskStatus::Completed | TaskStatus::Cancelled => TaskStatus::Pending,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("Unknown task status '{0}' (expected pending, in_progress, completed or cancelled)")]
pub struct ParseTaskStatusError(pub String);

impl FromStr for TaskStatus {
    type Err = ParseTaskStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Completed),
            "cancelled" | "canceled" => Ok(TaskStatus::Cancelled),
            _ => Err(ParseTaskStatusError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    None,
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn from_value(priority: u32) -> Priority {
        match priority {
            p if p >= 8 => Priority::High,
            p if p >= 5 => Priority::Medium,
            p if p >= 1 => Priority::Low,
            _ => Priority::None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::None => "",
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewTask {
    pub project_id: ProjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Timestamp>,
}

impl NewTask {
    pub fn new(project_id: ProjectId, title: impl Into<String>) -> Self {
        Self {
            project_id,
            parent_id: None,
            title: title.into(),
            description: None,
            status: TaskStatus::Pending,
            priority: 0,
            due_date: None,
        }
    }

    pub fn validated(self) -> Result<Self, ValidationError> {
        check_length("Task title", &self.title, 200, true)?;
        if let Some(description) = &self.description {
            check_length("Description", description, 1000, false)?;
        }
        if self.priority > MAX_PRIORITY {
            return Err(ValidationError::PriorityOutOfRange(self.priority));
        }

        Ok(Self {
            title: self.title.trim().to_string(),
            description: non_empty(self.description),
            ..self
        })
    }
}

/// Partial task update; absent fields are left untouched by the backend.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
}

impl TaskUpdate {
    pub fn due_date(due_date: Timestamp) -> Self {
        Self {
            due_date: Some(due_date),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validated(self) -> Result<Self, ValidationError> {
        if let Some(title) = &self.title {
            check_length("Task title", title, 200, true)?;
        }
        if let Some(description) = &self.description {
            check_length("Description", description, 1000, false)?;
        }
        if let Some(priority) = self.priority
            && priority > MAX_PRIORITY
        {
            return Err(ValidationError::PriorityOutOfRange(priority));
        }

        Ok(Self {
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description.map(|d| d.trim().to_string()),
            ..self
        })
    }
}

/// Search text and status selection shared by the list and timeline views.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub query: String,
    /// `None` shows every status
    pub status: Option<TaskStatus>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        task.matches_query(&self.query) && self.status.is_none_or(|s| s == task.status)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOrder {
    pub task_id: TaskId,
    pub priority: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReorderTasksRequest {
    pub tasks: Vec<TaskOrder>,
}
