use thiserror::Error;

use crate::{
    api::{ApiError, Backend},
    models::{
        ProjectId, TaskId, TimeEntryId,
        store::{Action, Store},
        time_entry::{NewTimeEntry, StartTimeEntry, TimeEntry, TimeEntryUpdate},
    },
    services::report,
};

#[derive(Debug, Error)]
pub enum TimeEntryError {
    #[error("Failed to start timer: {0}")]
    Start(#[source] ApiError),

    #[error("Failed to stop timer: {0}")]
    Stop(#[source] ApiError),

    #[error("Failed to load time entries: {0}")]
    Load(#[source] ApiError),

    #[error("Failed to save time entry: {0}")]
    Save(#[source] ApiError),

    #[error("Failed to delete time entry: {0}")]
    Delete(#[source] ApiError),

    #[error("No timer is running")]
    NoActiveTimer,

    #[error("An entry cannot end before it starts")]
    EndBeforeStart,
}

pub fn start_timer(
    store: &mut Store,
    backend: &impl Backend,
    task_id: TaskId,
    description: Option<String>,
) -> Result<TimeEntry, TimeEntryError> {
    if let Some(running) = store.active_time_entry() {
        log::warn!(
            "Timer {} for task {} is still running",
            running.id,
            running.task_id
        );
    }

    let request = StartTimeEntry {
        task_id,
        description,
    };
    match backend.start_time_entry(&request) {
        Ok(entry) => {
            log::info!("Timer {} started for task {task_id}", entry.id);
            store.dispatch(Action::AddTimeEntry(entry.clone()));
            Ok(entry)
        }
        Err(e) => {
            let error = TimeEntryError::Start(e);
            report(store, &error);
            Err(error)
        }
    }
}

pub fn stop_timer(
    store: &mut Store,
    backend: &impl Backend,
    entry_id: TimeEntryId,
) -> Result<TimeEntry, TimeEntryError> {
    match backend.stop_time_entry(entry_id) {
        Ok(entry) => {
            store.dispatch(Action::UpdateTimeEntry(entry.clone()));
            Ok(entry)
        }
        Err(e) => {
            let error = TimeEntryError::Stop(e);
            report(store, &error);
            Err(error)
        }
    }
}

/// The running timer as the backend sees it; the store is kept in line.
pub fn active_timer(
    store: &mut Store,
    backend: &impl Backend,
) -> Result<Option<TimeEntry>, TimeEntryError> {
    let active = backend.active_time_entry().map_err(TimeEntryError::Load)?;
    if let Some(entry) = &active {
        if store.time_entries.iter().any(|e| e.id == entry.id) {
            store.dispatch(Action::UpdateTimeEntry(entry.clone()));
        } else {
            store.dispatch(Action::AddTimeEntry(entry.clone()));
        }
    }
    Ok(active)
}

/// Stops whatever timer is running.
pub fn stop_active_timer(
    store: &mut Store,
    backend: &impl Backend,
) -> Result<TimeEntry, TimeEntryError> {
    let active = active_timer(store, backend)?.ok_or(TimeEntryError::NoActiveTimer)?;
    stop_timer(store, backend, active.id)
}

pub fn load_time_entries(
    store: &mut Store,
    backend: &impl Backend,
    task_id: Option<TaskId>,
    project_id: Option<ProjectId>,
) -> Result<(), TimeEntryError> {
    match backend.list_time_entries(task_id, project_id) {
        Ok(entries) => {
            store.dispatch(Action::SetTimeEntries(entries));
            Ok(())
        }
        Err(e) => {
            let error = TimeEntryError::Load(e);
            report(store, &error);
            Err(error)
        }
    }
}

/// Logs a finished stretch of work after the fact.
pub fn create_time_entry(
    store: &mut Store,
    backend: &impl Backend,
    entry: NewTimeEntry,
) -> Result<TimeEntry, TimeEntryError> {
    if entry.end_time.is_some_and(|end| end < entry.start_time) {
        return Err(TimeEntryError::EndBeforeStart);
    }

    match backend.create_time_entry(&entry) {
        Ok(created) => {
            store.dispatch(Action::AddTimeEntry(created.clone()));
            Ok(created)
        }
        Err(e) => {
            let error = TimeEntryError::Save(e);
            report(store, &error);
            Err(error)
        }
    }
}

pub fn update_time_entry(
    store: &mut Store,
    backend: &impl Backend,
    entry_id: TimeEntryId,
    update: TimeEntryUpdate,
) -> Result<TimeEntry, TimeEntryError> {
    if let (Some(start), Some(end)) = (update.start_time, update.end_time)
        && end < start
    {
        return Err(TimeEntryError::EndBeforeStart);
    }

    match backend.update_time_entry(entry_id, &update) {
        Ok(updated) => {
            store.dispatch(Action::UpdateTimeEntry(updated.clone()));
            Ok(updated)
        }
        Err(e) => {
            let error = TimeEntryError::Save(e);
            report(store, &error);
            Err(error)
        }
    }
}

pub fn delete_time_entry(
    store: &mut Store,
    backend: &impl Backend,
    entry_id: TimeEntryId,
) -> Result<(), TimeEntryError> {
    match backend.delete_time_entry(entry_id) {
        Ok(()) => {
            store.dispatch(Action::DeleteTimeEntry(entry_id));
            Ok(())
        }
        Err(e) => {
            let error = TimeEntryError::Delete(e);
            report(store, &error);
            Err(error)
        }
    }
}
