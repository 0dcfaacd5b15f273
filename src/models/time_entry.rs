use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::models::{TaskId, TimeEntryId, empty_as_none};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimeEntry {
    pub id: TimeEntryId,
    pub task_id: TaskId,
    pub start_time: Timestamp,
    /// Absent while the timer is running
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timestamp>,
    /// Logged duration in seconds, filled in by the backend on stop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    pub created_at: Timestamp,
}

impl TimeEntry {
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Seconds of work recorded by this entry. Running entries count for nothing.
    /// A zero `duration` is treated as unset.
    pub fn logged_seconds(&self) -> i64 {
        if let Some(duration) = self.duration.filter(|d| *d != 0) {
            return duration;
        }
        match self.end_time {
            Some(end) => end.as_second() - self.start_time.as_second(),
            None => 0,
        }
    }

    /// Seconds elapsed so far on a running entry, measured at `now`.
    pub fn elapsed_seconds(&self, now: Timestamp) -> i64 {
        let end = self.end_time.unwrap_or(now);
        (end.as_second() - self.start_time.as_second()).max(0)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewTimeEntry {
    pub task_id: TaskId,
    pub start_time: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StartTimeEntry {
    pub task_id: TaskId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct TimeEntryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Aggregates over the completed entries of a task.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TimeStatistics {
    #[serde(default, alias = "entry_count")]
    pub total_entries: u64,
    /// Seconds
    #[serde(default)]
    pub total_duration: i64,
    /// Seconds
    #[serde(default, alias = "average_duration")]
    pub avg_duration: i64,
    #[serde(default)]
    pub first_entry: Option<Timestamp>,
    #[serde(default)]
    pub last_entry: Option<Timestamp>,
}
