use std::cell::{Cell, RefCell};

use jiff::Timestamp;

use crate::{
    api::{ApiError, Backend, HealthStatus},
    models::{
        ProjectId, TaskId, TimeEntryId,
        project::{NewProject, Project, ProjectUpdate, ProjectWithCount},
        task::{NewTask, ReorderTasksRequest, Task, TaskStatus, TaskUpdate},
        time_entry::{NewTimeEntry, StartTimeEntry, TimeEntry, TimeEntryUpdate, TimeStatistics},
    },
};

/// In-memory backend recording every call, for service tests.
#[derive(Default)]
pub struct MemoryBackend {
    pub projects: RefCell<Vec<Project>>,
    pub tasks: RefCell<Vec<Task>>,
    pub time_entries: RefCell<Vec<TimeEntry>>,
    pub calls: RefCell<Vec<String>>,
    /// Calls whose name starts with one of these fail with `Rejected`.
    pub failing: RefCell<Vec<&'static str>>,
    next_id: Cell<u64>,
}

fn now() -> Timestamp {
    "2024-06-01T12:00:00Z".parse().unwrap_or(Timestamp::UNIX_EPOCH)
}

fn not_found(what: &str, id: u64) -> ApiError {
    ApiError::Status {
        method: "GET",
        url: format!("memory://{what}/{id}"),
        status: 404,
        body: format!("{what} not found"),
    }
}

impl MemoryBackend {
    pub fn with_data(projects: Vec<Project>, tasks: Vec<Task>) -> Self {
        let backend = Self::default();
        *backend.projects.borrow_mut() = projects;
        *backend.tasks.borrow_mut() = tasks;
        backend.next_id.set(1000);
        backend
    }

    pub fn fail_on(&self, call: &'static str) {
        self.failing.borrow_mut().push(call);
    }

    pub fn calls_to(&self, call: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.split(' ').next() == Some(call))
            .count()
    }

    fn record(&self, call: String) -> Result<(), ApiError> {
        let name = call.split(' ').next().unwrap_or_default().to_string();
        self.calls.borrow_mut().push(call);
        if self.failing.borrow().iter().any(|f| *f == name) {
            return Err(ApiError::Rejected(format!("{name} failed")));
        }
        Ok(())
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get().max(1000) + 1;
        self.next_id.set(id);
        id
    }

    fn modify_task(
        &self,
        id: TaskId,
        apply: impl FnOnce(&mut Task),
    ) -> Result<Task, ApiError> {
        let mut tasks = self.tasks.borrow_mut();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found("tasks", id))?;
        apply(task);
        task.updated_at = now();
        Ok(task.clone())
    }

    fn apply_task_update(task: &mut Task, update: &TaskUpdate) {
        if let Some(title) = &update.title {
            task.title = title.clone();
        }
        if let Some(description) = &update.description {
            task.description = Some(description.clone()).filter(|d| !d.is_empty());
        }
        if let Some(status) = update.status {
            task.status = status;
        }
        if let Some(priority) = update.priority {
            task.priority = priority;
        }
        if update.due_date.is_some() {
            task.due_date = update.due_date;
        }
        if update.parent_id.is_some() {
            task.parent_id = update.parent_id;
        }
    }
}

impl Backend for MemoryBackend {
    fn health(&self) -> Result<HealthStatus, ApiError> {
        self.record("health".to_string())?;
        Ok(HealthStatus {
            status: "ok".to_string(),
            timestamp: now().as_second(),
        })
    }

    fn list_projects(&self) -> Result<Vec<Project>, ApiError> {
        self.record("list_projects".to_string())?;
        Ok(self.projects.borrow().clone())
    }

    fn list_projects_with_counts(&self) -> Result<Vec<ProjectWithCount>, ApiError> {
        self.record("list_projects_with_counts".to_string())?;
        let tasks = self.tasks.borrow();
        Ok(self
            .projects
            .borrow()
            .iter()
            .map(|p| ProjectWithCount {
                project: p.clone(),
                task_count: tasks.iter().filter(|t| t.project_id == p.id).count() as u64,
            })
            .collect())
    }

    fn get_project(&self, id: ProjectId) -> Result<Project, ApiError> {
        self.record(format!("get_project {id}"))?;
        self.projects
            .borrow()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| not_found("projects", id))
    }

    fn create_project(&self, project: &NewProject) -> Result<Project, ApiError> {
        self.record(format!("create_project {}", project.name))?;
        let created = Project {
            id: self.next_id(),
            name: project.name.clone(),
            description: project.description.clone(),
            color: project.color.clone(),
            icon: project.icon.clone(),
            created_at: now(),
            updated_at: now(),
        };
        self.projects.borrow_mut().push(created.clone());
        Ok(created)
    }

    fn update_project(&self, id: ProjectId, update: &ProjectUpdate) -> Result<Project, ApiError> {
        self.record(format!("update_project {id}"))?;
        let mut projects = self.projects.borrow_mut();
        let project = projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found("projects", id))?;
        if let Some(name) = &update.name {
            project.name = name.clone();
        }
        if let Some(color) = &update.color {
            project.color = color.clone();
        }
        if let Some(icon) = &update.icon {
            project.icon = icon.clone();
        }
        if let Some(description) = &update.description {
            project.description = Some(description.clone()).filter(|d| !d.is_empty());
        }
        project.updated_at = now();
        Ok(project.clone())
    }

    fn delete_project(&self, id: ProjectId) -> Result<(), ApiError> {
        self.record(format!("delete_project {id}"))?;
        self.projects.borrow_mut().retain(|p| p.id != id);
        self.tasks.borrow_mut().retain(|t| t.project_id != id);
        Ok(())
    }

    fn list_tasks(&self, project_id: Option<ProjectId>) -> Result<Vec<Task>, ApiError> {
        self.record(format!("list_tasks {project_id:?}"))?;
        let mut tasks: Vec<Task> = self
            .tasks
            .borrow()
            .iter()
            .filter(|t| project_id.is_none_or(|id| t.project_id == id))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(tasks)
    }

    fn get_task(&self, id: TaskId) -> Result<Task, ApiError> {
        self.record(format!("get_task {id}"))?;
        self.tasks
            .borrow()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| not_found("tasks", id))
    }

    fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        self.record(format!("create_task {}", task.title))?;
        let created = Task {
            id: self.next_id(),
            project_id: task.project_id,
            parent_id: task.parent_id,
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            created_at: now(),
            updated_at: now(),
        };
        self.tasks.borrow_mut().push(created.clone());
        Ok(created)
    }

    fn update_task(&self, id: TaskId, update: &TaskUpdate) -> Result<Task, ApiError> {
        self.record(format!("update_task {id}"))?;
        self.modify_task(id, |task| Self::apply_task_update(task, update))
    }

    fn patch_task(&self, id: TaskId, update: &TaskUpdate) -> Result<Task, ApiError> {
        self.record(format!("patch_task {id}"))?;
        self.modify_task(id, |task| Self::apply_task_update(task, update))
    }

    fn update_task_status(&self, id: TaskId, status: TaskStatus) -> Result<Task, ApiError> {
        self.record(format!("update_task_status {id} {status}"))?;
        self.modify_task(id, |task| task.status = status)
    }

    fn delete_task(&self, id: TaskId) -> Result<(), ApiError> {
        self.record(format!("delete_task {id}"))?;
        self.tasks
            .borrow_mut()
            .retain(|t| t.id != id && t.parent_id != Some(id));
        Ok(())
    }

    fn list_subtasks(&self, id: TaskId) -> Result<Vec<Task>, ApiError> {
        self.record(format!("list_subtasks {id}"))?;
        Ok(self
            .tasks
            .borrow()
            .iter()
            .filter(|t| t.parent_id == Some(id))
            .cloned()
            .collect())
    }

    fn reorder_tasks(&self, request: &ReorderTasksRequest) -> Result<(), ApiError> {
        self.record(format!("reorder_tasks {}", request.tasks.len()))?;
        let mut tasks = self.tasks.borrow_mut();
        for order in &request.tasks {
            if let Some(task) = tasks.iter_mut().find(|t| t.id == order.task_id) {
                task.priority = order.priority;
            }
        }
        Ok(())
    }

    fn task_time_statistics(&self, id: TaskId) -> Result<TimeStatistics, ApiError> {
        self.record(format!("task_time_statistics {id}"))?;
        let entries: Vec<TimeEntry> = self
            .time_entries
            .borrow()
            .iter()
            .filter(|e| e.task_id == id && !e.is_active())
            .cloned()
            .collect();
        let total: i64 = entries.iter().map(TimeEntry::logged_seconds).sum();
        let count = entries.len() as u64;
        Ok(TimeStatistics {
            total_entries: count,
            total_duration: total,
            avg_duration: if count == 0 { 0 } else { total / count as i64 },
            first_entry: entries.iter().map(|e| e.start_time).min(),
            last_entry: entries.iter().map(|e| e.start_time).max(),
        })
    }

    fn list_time_entries(
        &self,
        task_id: Option<TaskId>,
        project_id: Option<ProjectId>,
    ) -> Result<Vec<TimeEntry>, ApiError> {
        self.record(format!("list_time_entries {task_id:?} {project_id:?}"))?;
        let tasks = self.tasks.borrow();
        Ok(self
            .time_entries
            .borrow()
            .iter()
            .filter(|e| task_id.is_none_or(|id| e.task_id == id))
            .filter(|e| {
                project_id.is_none_or(|pid| {
                    tasks
                        .iter()
                        .any(|t| t.id == e.task_id && t.project_id == pid)
                })
            })
            .cloned()
            .collect())
    }

    fn get_time_entry(&self, id: TimeEntryId) -> Result<TimeEntry, ApiError> {
        self.record(format!("get_time_entry {id}"))?;
        self.time_entries
            .borrow()
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| not_found("time-entries", id))
    }

    fn create_time_entry(&self, entry: &NewTimeEntry) -> Result<TimeEntry, ApiError> {
        self.record(format!("create_time_entry {}", entry.task_id))?;
        let duration = entry
            .end_time
            .map(|end| end.as_second() - entry.start_time.as_second());
        let created = TimeEntry {
            id: self.next_id(),
            task_id: entry.task_id,
            start_time: entry.start_time,
            end_time: entry.end_time,
            duration,
            description: entry.description.clone(),
            created_at: now(),
        };
        self.time_entries.borrow_mut().push(created.clone());
        Ok(created)
    }

    fn update_time_entry(
        &self,
        id: TimeEntryId,
        update: &TimeEntryUpdate,
    ) -> Result<TimeEntry, ApiError> {
        self.record(format!("update_time_entry {id}"))?;
        let mut entries = self.time_entries.borrow_mut();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| not_found("time-entries", id))?;
        if let Some(start) = update.start_time {
            entry.start_time = start;
        }
        if let Some(end) = update.end_time {
            entry.end_time = Some(end);
            entry.duration = Some(end.as_second() - entry.start_time.as_second());
        }
        if let Some(description) = &update.description {
            entry.description = Some(description.clone());
        }
        Ok(entry.clone())
    }

    fn delete_time_entry(&self, id: TimeEntryId) -> Result<(), ApiError> {
        self.record(format!("delete_time_entry {id}"))?;
        self.time_entries.borrow_mut().retain(|e| e.id != id);
        Ok(())
    }

    fn start_time_entry(&self, request: &StartTimeEntry) -> Result<TimeEntry, ApiError> {
        self.record(format!("start_time_entry {}", request.task_id))?;
        let started = TimeEntry {
            id: self.next_id(),
            task_id: request.task_id,
            start_time: now(),
            end_time: None,
            duration: None,
            description: request.description.clone(),
            created_at: now(),
        };
        self.time_entries.borrow_mut().push(started.clone());
        Ok(started)
    }

    fn stop_time_entry(&self, id: TimeEntryId) -> Result<TimeEntry, ApiError> {
        self.record(format!("stop_time_entry {id}"))?;
        let mut entries = self.time_entries.borrow_mut();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| not_found("time-entries", id))?;
        let end = now();
        entry.end_time = Some(end);
        entry.duration = Some((end.as_second() - entry.start_time.as_second()).max(0));
        Ok(entry.clone())
    }

    fn active_time_entry(&self) -> Result<Option<TimeEntry>, ApiError> {
        self.record("active_time_entry".to_string())?;
        Ok(self
            .time_entries
            .borrow()
            .iter()
            .find(|e| e.is_active())
            .cloned())
    }
}
