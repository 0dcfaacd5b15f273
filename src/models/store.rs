use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::models::{
    ProjectId, TaskId, TimeEntryId,
    project::Project,
    task::{Task, TaskStatus},
    time_entry::TimeEntry,
};

pub const RECENT_TASKS_LIMIT: usize = 5;

/// Client-side application state. Every mutation goes through `dispatch`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub time_entries: Vec<TimeEntry>,
    pub active_project: Option<Project>,
    pub active_task: Option<Task>,
    pub is_loading: bool,
    /// Last user-visible failure message
    pub error: Option<String>,
    pub selected_task_id: Option<TaskId>,
    pub is_tray_menu_open: bool,
    pub quick_task_modal_open: bool,
    pub tray_menu_collapsed: TrayMenuCollapsed,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrayMenuCollapsed {
    pub recent_tasks: bool,
    pub recent_projects: bool,
    pub time_tracking: bool,
}

impl TrayMenuCollapsed {
    pub fn get(&self, section: TraySection) -> bool {
        match section {
            TraySection::RecentTasks => self.recent_tasks,
            TraySection::RecentProjects => self.recent_projects,
            TraySection::TimeTracking => self.time_tracking,
        }
    }

    fn toggle(&mut self, section: TraySection) {
        let flag = match section {
            TraySection::RecentTasks => &mut self.recent_tasks,
            TraySection::RecentProjects => &mut self.recent_projects,
            TraySection::TimeTracking => &mut self.time_tracking,
        };
        *flag = !*flag;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraySection {
    RecentTasks,
    RecentProjects,
    TimeTracking,
}

impl TraySection {
    pub const ALL: [TraySection; 3] = [
        TraySection::RecentTasks,
        TraySection::RecentProjects,
        TraySection::TimeTracking,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetLoading(bool),
    SetError(Option<String>),
    SetProjects(Vec<Project>),
    SetTasks(Vec<Task>),
    SetTimeEntries(Vec<TimeEntry>),
    SetActiveProject(Option<Project>),
    SetActiveTask(Option<Task>),
    SetSelectedTask(Option<TaskId>),
    AddProject(Project),
    UpdateProject(Project),
    DeleteProject(ProjectId),
    AddTask(Task),
    UpdateTask(Task),
    DeleteTask(TaskId),
    UpdateTaskStatus {
        task_id: TaskId,
        status: TaskStatus,
        at: Timestamp,
    },
    AddTimeEntry(TimeEntry),
    UpdateTimeEntry(TimeEntry),
    DeleteTimeEntry(TimeEntryId),
    SetTrayMenuOpen(bool),
    SetQuickTaskModalOpen(bool),
    ToggleTrayMenuSection(TraySection),
    Reset,
}

impl Store {
    pub fn dispatch(&mut self, action: Action) {
        log::trace!("dispatch {:?}", ActionName(&action));
        match action {
            Action::SetLoading(loading) => self.is_loading = loading,
            Action::SetError(error) => {
                self.error = error;
                self.is_loading = false;
            }
            Action::SetProjects(projects) => self.projects = projects,
            Action::SetTasks(tasks) => self.tasks = tasks,
            Action::SetTimeEntries(entries) => self.time_entries = entries,
            Action::SetActiveProject(project) => self.active_project = project,
            Action::SetActiveTask(task) => self.active_task = task,
            Action::SetSelectedTask(task_id) => self.selected_task_id = task_id,
            Action::AddProject(project) => {
                self.projects.push(project);
                self.error = None;
            }
            Action::UpdateProject(project) => {
                if self
                    .active_project
                    .as_ref()
                    .is_some_and(|p| p.id == project.id)
                {
                    self.active_project = Some(project.clone());
                }
                replace_by_id(&mut self.projects, project, |p| p.id);
                self.error = None;
            }
            Action::DeleteProject(project_id) => {
                self.projects.retain(|p| p.id != project_id);
                self.tasks.retain(|t| t.project_id != project_id);
                if self
                    .active_project
                    .as_ref()
                    .is_some_and(|p| p.id == project_id)
                {
                    self.active_project = None;
                }
                self.error = None;
            }
            Action::AddTask(task) => {
                self.tasks.push(task);
                self.error = None;
            }
            Action::UpdateTask(task) => {
                if self.active_task.as_ref().is_some_and(|t| t.id == task.id) {
                    self.active_task = Some(task.clone());
                }
                replace_by_id(&mut self.tasks, task, |t| t.id);
                self.error = None;
            }
            Action::DeleteTask(task_id) => {
                self.tasks.retain(|t| t.id != task_id);
                if self.active_task.as_ref().is_some_and(|t| t.id == task_id) {
                    self.active_task = None;
                }
                if self.selected_task_id == Some(task_id) {
                    self.selected_task_id = None;
                }
                self.error = None;
            }
            Action::UpdateTaskStatus {
                task_id,
                status,
                at,
            } => {
                if let Some(task) = self.get_task_mut(task_id) {
                    task.status = status;
                    task.updated_at = at;
                }
                self.error = None;
            }
            Action::AddTimeEntry(entry) => {
                self.time_entries.push(entry);
                self.error = None;
            }
            Action::UpdateTimeEntry(entry) => {
                replace_by_id(&mut self.time_entries, entry, |e| e.id);
                self.error = None;
            }
            Action::DeleteTimeEntry(entry_id) => {
                self.time_entries.retain(|e| e.id != entry_id);
                self.error = None;
            }
            Action::SetTrayMenuOpen(open) => self.is_tray_menu_open = open,
            Action::SetQuickTaskModalOpen(open) => self.quick_task_modal_open = open,
            Action::ToggleTrayMenuSection(section) => self.tray_menu_collapsed.toggle(section),
            Action::Reset => *self = Store::default(),
        }
    }

    pub fn get_project(&self, project_id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == project_id)
    }

    pub fn get_task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    fn get_task_mut(&mut self, task_id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == task_id)
    }

    pub fn get_tasks_for_project(&self, project_id: ProjectId) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.project_id == project_id)
    }

    pub fn get_tasks_by_status(&self, status: TaskStatus) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |t| t.status == status)
    }

    /// Most recently updated tasks first.
    pub fn recent_tasks(&self, limit: usize) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().collect();
        tasks.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        tasks.truncate(limit);
        tasks
    }

    /// The running timer, if the loaded entries contain one.
    pub fn active_time_entry(&self) -> Option<&TimeEntry> {
        self.time_entries.iter().find(|e| e.is_active())
    }
}

fn replace_by_id<T, K: PartialEq>(items: &mut [T], item: T, key: impl Fn(&T) -> K) {
    let id = key(&item);
    if let Some(slot) = items.iter_mut().find(|existing| key(existing) == id) {
        *slot = item;
    }
}

/// Trace logging prints only the variant, payloads can be large.
struct ActionName<'a>(&'a Action);

impl std::fmt::Debug for ActionName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.0 {
            Action::SetLoading(_) => "SetLoading",
            Action::SetError(_) => "SetError",
            Action::SetProjects(_) => "SetProjects",
            Action::SetTasks(_) => "SetTasks",
            Action::SetTimeEntries(_) => "SetTimeEntries",
            Action::SetActiveProject(_) => "SetActiveProject",
            Action::SetActiveTask(_) => "SetActiveTask",
            Action::SetSelectedTask(_) => "SetSelectedTask",
            Action::AddProject(_) => "AddProject",
            Action::UpdateProject(_) => "UpdateProject",
            Action::DeleteProject(_) => "DeleteProject",
            Action::AddTask(_) => "AddTask",
            Action::UpdateTask(_) => "UpdateTask",
            Action::DeleteTask(_) => "DeleteTask",
            Action::UpdateTaskStatus { .. } => "UpdateTaskStatus",
            Action::AddTimeEntry(_) => "AddTimeEntry",
            Action::UpdateTimeEntry(_) => "UpdateTimeEntry",
            Action::DeleteTimeEntry(_) => "DeleteTimeEntry",
            Action::SetTrayMenuOpen(_) => "SetTrayMenuOpen",
            Action::SetQuickTaskModalOpen(_) => "SetQuickTaskModalOpen",
            Action::ToggleTrayMenuSection(_) => "ToggleTrayMenuSection",
            Action::Reset => "Reset",
        };
        f.write_str(name)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{entry, project, task, ts};
    use super::*;

    fn seeded_store() -> Store {
        let mut store = Store::default();
        store.dispatch(Action::SetProjects(vec![project(1, "Work"), project(2, "Home")]));
        store.dispatch(Action::SetTasks(vec![
            task(10, 1, "Report"),
            task(11, 1, "Slides"),
            task(20, 2, "Laundry"),
        ]));
        store
    }

    #[test]
    fn test_delete_project_cascades_to_tasks_and_active_project() {
        let mut store = seeded_store();
        store.dispatch(Action::SetActiveProject(Some(project(1, "Work"))));

        store.dispatch(Action::DeleteProject(1));

        assert_eq!(store.projects.len(), 1);
        assert!(store.tasks.iter().all(|t| t.project_id != 1));
        assert_eq!(store.tasks.len(), 1);
        assert_eq!(store.active_project, None);
    }

    #[test]
    fn test_delete_other_project_keeps_active_project() {
        let mut store = seeded_store();
        store.dispatch(Action::SetActiveProject(Some(project(1, "Work"))));

        store.dispatch(Action::DeleteProject(2));

        assert_eq!(store.active_project.map(|p| p.id), Some(1));
        assert_eq!(store.tasks.len(), 2);
    }

    #[test]
    fn test_update_project_refreshes_active_project() {
        let mut store = seeded_store();
        store.dispatch(Action::SetActiveProject(Some(project(1, "Work"))));

        store.dispatch(Action::UpdateProject(project(1, "Day job")));

        assert_eq!(store.get_project(1).unwrap().name, "Day job");
        assert_eq!(store.active_project.unwrap().name, "Day job");
    }

    #[test]
    fn test_delete_task_clears_selection_and_active_task() {
        let mut store = seeded_store();
        store.dispatch(Action::SetActiveTask(Some(task(10, 1, "Report"))));
        store.dispatch(Action::SetSelectedTask(Some(10)));

        store.dispatch(Action::DeleteTask(10));

        assert!(store.get_task(10).is_none());
        assert_eq!(store.active_task, None);
        assert_eq!(store.selected_task_id, None);
    }

    #[test]
    fn test_update_task_status_touches_updated_at() {
        let mut store = seeded_store();
        let at = ts("2024-05-01T12:00:00Z");

        store.dispatch(Action::UpdateTaskStatus {
            task_id: 11,
            status: TaskStatus::Completed,
            at,
        });

        let updated = store.get_task(11).unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
        assert_eq!(updated.updated_at, at);
        assert_eq!(store.get_task(10).unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn test_set_error_stops_loading_and_mutations_clear_it() {
        let mut store = seeded_store();
        store.dispatch(Action::SetLoading(true));
        store.dispatch(Action::SetError(Some("Failed to load tasks".to_string())));

        assert!(!store.is_loading);
        assert_eq!(store.error.as_deref(), Some("Failed to load tasks"));

        store.dispatch(Action::AddTask(task(12, 1, "Review")));
        assert_eq!(store.error, None);
    }

    #[test]
    fn test_recent_tasks_sorted_by_update_time() {
        let mut store = seeded_store();
        store.dispatch(Action::UpdateTaskStatus {
            task_id: 20,
            status: TaskStatus::InProgress,
            at: ts("2024-02-01T00:00:00Z"),
        });
        store.dispatch(Action::UpdateTaskStatus {
            task_id: 11,
            status: TaskStatus::InProgress,
            at: ts("2024-03-01T00:00:00Z"),
        });

        let recent: Vec<_> = store.recent_tasks(2).iter().map(|t| t.id).collect();
        assert_eq!(recent, vec![11, 20]);
    }

    #[test]
    fn test_active_time_entry_is_the_one_without_end() {
        let mut store = seeded_store();
        store.dispatch(Action::SetTimeEntries(vec![
            entry(1, 10, "2024-01-01T09:00:00Z", Some("2024-01-01T10:00:00Z")),
            entry(2, 11, "2024-01-01T11:00:00Z", None),
        ]));

        assert_eq!(store.active_time_entry().map(|e| e.id), Some(2));

        let mut stopped = entry(2, 11, "2024-01-01T11:00:00Z", Some("2024-01-01T11:30:00Z"));
        stopped.duration = Some(1800);
        store.dispatch(Action::UpdateTimeEntry(stopped));
        assert!(store.active_time_entry().is_none());
    }

    #[test]
    fn test_toggle_tray_section_and_reset() {
        let mut store = seeded_store();

        store.dispatch(Action::ToggleTrayMenuSection(TraySection::TimeTracking));
        assert!(store.tray_menu_collapsed.time_tracking);
        assert!(!store.tray_menu_collapsed.recent_tasks);

        store.dispatch(Action::ToggleTrayMenuSection(TraySection::TimeTracking));
        assert!(!store.tray_menu_collapsed.time_tracking);

        store.dispatch(Action::SetQuickTaskModalOpen(true));
        store.dispatch(Action::Reset);
        assert_eq!(store, Store::default());
    }

    #[test]
    fn test_selectors_filter_by_project_and_status() {
        let mut store = seeded_store();
        store.dispatch(Action::UpdateTaskStatus {
            task_id: 20,
            status: TaskStatus::Completed,
            at: ts("2024-02-01T00:00:00Z"),
        });

        assert_eq!(store.get_tasks_for_project(1).count(), 2);
        let completed: Vec<_> = store
            .get_tasks_by_status(TaskStatus::Completed)
            .map(|t| t.id)
            .collect();
        assert_eq!(completed, vec![20]);
    }
}
