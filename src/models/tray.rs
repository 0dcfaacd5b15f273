use serde::{Deserialize, Serialize};

use crate::models::{
    ProjectId, TaskId, TimeEntryId,
    store::{RECENT_TASKS_LIMIT, Store, TrayMenuCollapsed},
    task::{Task, TaskStatus},
};

pub const TRAY_PROJECTS_LIMIT: usize = 5;

/// Everything the shell needs to rebuild the tray menu.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrayMenuData {
    pub recent_tasks: Vec<TrayTask>,
    pub projects: Vec<TrayProject>,
    pub active_time_entry: Option<TrayTimer>,
    pub collapsed: TrayMenuCollapsed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrayTask {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    pub priority: u32,
    pub project_id: ProjectId,
}

impl TrayTask {
    /// Menu label, e.g. `⏳ 🟡 Write report`.
    pub fn label(&self) -> String {
        format!(
            "{} {} {}",
            status_icon(self.status),
            priority_icon(self.priority),
            self.title
        )
    }
}

impl From<&Task> for TrayTask {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            status: task.status,
            priority: task.priority,
            project_id: task.project_id,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrayProject {
    pub id: ProjectId,
    pub name: String,
    pub icon: String,
    pub task_count: usize,
    pub completed_tasks: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrayTimer {
    pub id: TimeEntryId,
    pub task_id: TaskId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_title: Option<String>,
}

impl TrayMenuData {
    pub fn from_store(store: &Store) -> Self {
        let recent_tasks = store
            .recent_tasks(RECENT_TASKS_LIMIT)
            .into_iter()
            .map(TrayTask::from)
            .collect();

        let projects = store
            .projects
            .iter()
            .take(TRAY_PROJECTS_LIMIT)
            .map(|project| {
                let (task_count, completed_tasks) = store
                    .get_tasks_for_project(project.id)
                    .fold((0, 0), |(total, done), task| {
                        let completed = usize::from(task.status == TaskStatus::Completed);
                        (total + 1, done + completed)
                    });
                TrayProject {
                    id: project.id,
                    name: project.name.clone(),
                    icon: project.icon.clone(),
                    task_count,
                    completed_tasks,
                }
            })
            .collect();

        let active_time_entry = store.active_time_entry().map(|entry| TrayTimer {
            id: entry.id,
            task_id: entry.task_id,
            task_title: store.get_task(entry.task_id).map(|t| t.title.clone()),
        });

        Self {
            recent_tasks,
            projects,
            active_time_entry,
            collapsed: store.tray_menu_collapsed,
        }
    }
}

pub fn status_icon(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Completed => "✓",
        TaskStatus::InProgress => "⏳",
        TaskStatus::Cancelled => "✗",
        TaskStatus::Pending => "⚪",
    }
}

pub fn priority_icon(priority: u32) -> &'static str {
    match priority {
        p if p >= 8 => "🔴",
        p if p >= 5 => "🟡",
        p if p >= 2 => "🟢",
        _ => "⚪",
    }
}
