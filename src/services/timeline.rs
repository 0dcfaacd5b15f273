use thiserror::Error;

use crate::{
    api::{ApiError, Backend},
    models::{
        ProjectId, TaskId,
        store::{Action, Store},
        task::TaskUpdate,
    },
    services::tasks::{TaskError, load_tasks},
    timeline::{TimelineTask, Week, layout_task},
};

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error(transparent)]
    Tasks(#[from] TaskError),

    #[error("Failed to load time entries: {0}")]
    Entries(#[source] ApiError),

    #[error("Day {0} is outside the week (expected 0 to 6)")]
    DayOutOfRange(usize),

    #[error("Task {0} not found")]
    TaskNotFound(TaskId),

    #[error("Failed to reschedule task: {0}")]
    Reschedule(#[source] ApiError),
}

/// Loads tasks and their time entries and lays every task out.
pub fn load_timeline(
    store: &mut Store,
    backend: &impl Backend,
    project_id: Option<ProjectId>,
) -> Result<Vec<TimelineTask>, TimelineError> {
    load_tasks(store, backend, project_id)?;

    let mut all_entries = Vec::new();
    let mut laid_out = Vec::with_capacity(store.tasks.len());
    for task in &store.tasks {
        let entries = backend
            .list_time_entries(Some(task.id), None)
            .map_err(TimelineError::Entries)?;
        laid_out.push(layout_task(task, &entries));
        all_entries.extend(entries);
    }

    store.dispatch(Action::SetTimeEntries(all_entries));
    Ok(laid_out)
}

pub struct RescheduleParameters {
    pub task_id: TaskId,
    /// Column of the week grid, Sunday is 0
    pub day_index: usize,
    pub project_id: Option<ProjectId>,
}

/// Outcome of dropping a task onto a day column.
#[derive(Debug, PartialEq)]
pub enum Rescheduled {
    Moved(jiff::civil::Date),
    /// The task was already due that day
    Unchanged,
}

/// Sets the due date of a task to the start of a day of `week`.
///
/// Nothing changes locally before the backend accepts the update; the tasks
/// are reloaded afterwards. Failures are logged and returned but do not
/// replace the store error.
pub fn reschedule_task(
    store: &mut Store,
    backend: &impl Backend,
    week: &Week,
    parameters: RescheduleParameters,
) -> Result<Rescheduled, TimelineError> {
    let day = week
        .day(parameters.day_index)
        .ok_or(TimelineError::DayOutOfRange(parameters.day_index))?;
    let task = store
        .get_task(parameters.task_id)
        .ok_or(TimelineError::TaskNotFound(parameters.task_id))?;

    if task.due_date.map(|due| week.date_of(due)) == Some(day) {
        log::debug!("Task {} is already due on {day}", task.id);
        return Ok(Rescheduled::Unchanged);
    }

    let update = TaskUpdate::due_date(week.day_start(day));
    if let Err(e) = backend.patch_task(parameters.task_id, &update) {
        log::error!("Failed to reschedule task {}: {e}", parameters.task_id);
        return Err(TimelineError::Reschedule(e));
    }

    load_tasks(store, backend, parameters.project_id)?;
    Ok(Rescheduled::Moved(day))
}

#[cfg(test)]
mod tests {
    use jiff::tz::TimeZone;

    use super::*;
    use crate::{
        api::memory::MemoryBackend,
        models::store::fixtures::{entry, task, ts},
    };

    fn week() -> Week {
        Week::containing("2024-03-06".parse().unwrap(), TimeZone::UTC)
    }

    fn setup(due: Option<&str>) -> (Store, MemoryBackend) {
        let mut t = task(1, 1, "Plan");
        t.due_date = due.map(ts);
        let backend = MemoryBackend::with_data(vec![], vec![t]);
        let mut store = Store::default();
        load_tasks(&mut store, &backend, None).unwrap();
        (store, backend)
    }

    #[test]
    fn test_reschedule_sets_due_date_to_day_start() {
        let (mut store, backend) = setup(None);

        let outcome = reschedule_task(
            &mut store,
            &backend,
            &week(),
            RescheduleParameters {
                task_id: 1,
                day_index: 2,
                project_id: None,
            },
        )
        .unwrap();

        assert_eq!(outcome, Rescheduled::Moved("2024-03-05".parse().unwrap()));
        assert_eq!(
            store.get_task(1).unwrap().due_date,
            Some(ts("2024-03-05T00:00:00Z"))
        );
        assert_eq!(backend.calls_to("patch_task"), 1);
    }

    #[test]
    fn test_reschedule_same_day_makes_no_call() {
        let (mut store, backend) = setup(Some("2024-03-05T15:00:00Z"));

        let outcome = reschedule_task(
            &mut store,
            &backend,
            &week(),
            RescheduleParameters {
                task_id: 1,
                day_index: 2,
                project_id: None,
            },
        )
        .unwrap();

        assert_eq!(outcome, Rescheduled::Unchanged);
        assert_eq!(backend.calls_to("patch_task"), 0);
    }

    #[test]
    fn test_reschedule_failure_leaves_store_untouched() {
        let (mut store, backend) = setup(Some("2024-03-05T00:00:00Z"));
        backend.fail_on("patch_task");

        let result = reschedule_task(
            &mut store,
            &backend,
            &week(),
            RescheduleParameters {
                task_id: 1,
                day_index: 6,
                project_id: None,
            },
        );

        assert!(matches!(result, Err(TimelineError::Reschedule(_))));
        assert_eq!(
            store.get_task(1).unwrap().due_date,
            Some(ts("2024-03-05T00:00:00Z"))
        );
        assert_eq!(store.error, None);
    }

    #[test]
    fn test_reschedule_rejects_unknown_column() {
        let (mut store, backend) = setup(None);

        let result = reschedule_task(
            &mut store,
            &backend,
            &week(),
            RescheduleParameters {
                task_id: 1,
                day_index: 7,
                project_id: None,
            },
        );

        assert!(matches!(result, Err(TimelineError::DayOutOfRange(7))));
    }

    #[test]
    fn test_load_timeline_lays_out_with_entries() {
        let (mut store, backend) = setup(Some("2023-12-31T00:00:00Z"));
        backend.time_entries.borrow_mut().push(entry(
            1,
            1,
            "2023-12-29T09:00:00Z",
            Some("2023-12-29T13:00:00Z"),
        ));

        let laid_out = load_timeline(&mut store, &backend, None).unwrap();

        assert_eq!(laid_out.len(), 1);
        assert_eq!(laid_out[0].start, ts("2023-12-29T09:00:00Z"));
        assert_eq!(laid_out[0].progress, 50.0);
        assert_eq!(store.time_entries.len(), 1);
    }
}
