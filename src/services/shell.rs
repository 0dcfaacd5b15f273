use thiserror::Error;

use crate::{
    api::Backend,
    models::{
        ProjectId,
        store::{Action, Store},
        tray::TrayMenuData,
    },
    services::{
        projects::{ProjectError, load_projects},
        report,
        tasks::{TaskError, load_tasks, update_task_status},
        time_entries::{TimeEntryError, active_timer, start_timer, stop_timer},
    },
    shell::{Shell, ShellError, ShellEvent},
};

#[derive(Debug, Error)]
pub enum EventError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Timer(#[from] TimeEntryError),

    #[error(transparent)]
    Shell(#[from] ShellError),

    #[error("Project {0} is not loaded")]
    UnknownProject(ProjectId),
}

/// Loads projects, tasks and the running timer.
pub fn load_data(store: &mut Store, backend: &impl Backend) -> Result<(), EventError> {
    load_projects(store, backend)?;
    load_tasks(store, backend, None)?;
    // A missing timer endpoint must not keep the rest of the data out
    if let Err(e) = active_timer(store, backend) {
        log::warn!("Could not fetch the running timer: {e}");
    }
    Ok(())
}

/// Pushes the tray payload built from the current store to the shell.
pub fn refresh_tray_menu(store: &Store, shell: &mut impl Shell) -> Result<(), ShellError> {
    shell.update_tray_menu(TrayMenuData::from_store(store))
}

fn task_title(store: &Store, task_id: u64, fallback: &str) -> String {
    store
        .get_task(task_id)
        .map(|t| t.title.clone())
        .unwrap_or_else(|| fallback.to_string())
}

/// Reacts to an event pushed by the shell, usually from the tray menu.
pub fn handle_event(
    store: &mut Store,
    backend: &impl Backend,
    shell: &mut impl Shell,
    event: ShellEvent,
) -> Result<(), EventError> {
    log::debug!("Handling {} event", event.channel());

    match event {
        ShellEvent::ShowPreferences => {
            log::info!("Preferences are read from the configuration file");
        }
        ShellEvent::FocusTaskCreation => {
            store.dispatch(Action::SetQuickTaskModalOpen(true));
        }
        ShellEvent::OpenProject(project_id) => {
            let project = store
                .get_project(project_id)
                .cloned()
                .ok_or(EventError::UnknownProject(project_id))?;
            store.dispatch(Action::SetActiveProject(Some(project)));
        }
        ShellEvent::AddTaskToProject(project_id) => {
            let project = store
                .get_project(project_id)
                .cloned()
                .ok_or(EventError::UnknownProject(project_id))?;
            store.dispatch(Action::SetActiveProject(Some(project)));
            store.dispatch(Action::SetQuickTaskModalOpen(true));
        }
        ShellEvent::UpdateTaskStatus(task_id, status) => {
            update_task_status(store, backend, task_id, status)?;
            let title = task_title(store, task_id, "Task");
            shell.notify(
                "Task Updated",
                &format!("\"{title}\" marked as {}", status.label()),
            )?;
            refresh_tray_menu(store, shell)?;
        }
        ShellEvent::StartTaskTimer(task_id) => {
            start_timer(store, backend, task_id, None)?;
            let title = task_title(store, task_id, "task");
            shell.notify("Timer Started", &format!("Timer started for \"{title}\""))?;
            refresh_tray_menu(store, shell)?;
        }
        ShellEvent::StopTimer(entry_id) => {
            let entry_id = match entry_id {
                Some(id) => id,
                None => {
                    active_timer(store, backend)?
                        .ok_or(TimeEntryError::NoActiveTimer)?
                        .id
                }
            };

            let stopped = stop_timer(store, backend, entry_id)?;
            let title = task_title(store, stopped.task_id, "task");
            shell.notify("Timer Stopped", &format!("Timer stopped for \"{title}\""))?;
            if let Err(e) = load_data(store, backend) {
                report(store, &e);
            }
            refresh_tray_menu(store, shell)?;
        }
        ShellEvent::ViewTaskDetails(task_id) => match store.get_task(task_id) {
            Some(task) => {
                let body = format!(
                    "{} - Status: {}, Priority: {}",
                    task.title, task.status, task.priority
                );
                store.dispatch(Action::SetSelectedTask(Some(task_id)));
                shell.notify("Task Details", &body)?;
            }
            None => log::warn!("Task {task_id} is not loaded, no details to show"),
        },
    }

    Ok(())
}
