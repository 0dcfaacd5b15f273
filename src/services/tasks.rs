use jiff::Timestamp;
use thiserror::Error;

use crate::{
    api::{ApiError, Backend},
    models::{
        ProjectId, TaskId, ValidationError,
        store::{Action, Store},
        task::{
            NewTask, ReorderTasksRequest, Task, TaskFilter, TaskOrder, TaskStatus, TaskUpdate,
        },
        time_entry::TimeStatistics,
    },
    services::{fuzzy_find, report},
};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Failed to load tasks: {0}")]
    Load(#[source] ApiError),

    #[error("Failed to create task: {0}")]
    Create(#[source] ApiError),

    #[error("Failed to update task: {0}")]
    Update(#[source] ApiError),

    #[error("Failed to update task status: {0}")]
    UpdateStatus(#[source] ApiError),

    #[error("Failed to delete task: {0}")]
    Delete(#[source] ApiError),

    #[error("Failed to reorder tasks: {0}")]
    Reorder(#[source] ApiError),

    #[error("Failed to load time statistics: {0}")]
    Statistics(#[source] ApiError),

    #[error("Task '{0}' not found")]
    NotFound(String),

    #[error("Task name is ambiguous. Multiple tasks found: {}", .0.join(", "))]
    Ambiguous(Vec<String>),

    #[error("Deletion of task '{0}' was not confirmed")]
    NotConfirmed(String),

    #[error("Sub-tasks can only be added to top-level tasks")]
    NestedSubtask,

    #[error("Nothing to update")]
    EmptyUpdate,

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Loads the tasks of one project, or of every project.
pub fn load_tasks(
    store: &mut Store,
    backend: &impl Backend,
    project_id: Option<ProjectId>,
) -> Result<(), TaskError> {
    store.dispatch(Action::SetLoading(true));
    match backend.list_tasks(project_id) {
        Ok(tasks) => {
            store.dispatch(Action::SetTasks(tasks));
            store.dispatch(Action::SetLoading(false));
            Ok(())
        }
        Err(e) => {
            let error = TaskError::Load(e);
            report(store, &error);
            Err(error)
        }
    }
}

/// Resolves a task by id or by (partial) title among the loaded tasks.
pub fn resolve_task<'a>(store: &'a Store, task: &str) -> Result<&'a Task, TaskError> {
    if let Ok(id) = task.trim().parse() {
        return store
            .get_task(id)
            .ok_or_else(|| TaskError::NotFound(task.to_string()));
    }

    fuzzy_find(store.tasks.iter(), task, |t| t.title.as_str()).map_err(|titles| {
        if titles.is_empty() {
            TaskError::NotFound(task.to_string())
        } else {
            TaskError::Ambiguous(titles)
        }
    })
}

/// Creates a task; status defaults to pending and priority to 0.
pub fn create_task(
    store: &mut Store,
    backend: &impl Backend,
    parameters: NewTask,
) -> Result<Task, TaskError> {
    let parameters = parameters.validated()?;
    if let Some(parent_id) = parameters.parent_id
        && store.get_task(parent_id).is_some_and(Task::is_subtask)
    {
        return Err(TaskError::NestedSubtask);
    }

    match backend.create_task(&parameters) {
        Ok(task) => {
            log::info!("Created task {} ({})", task.title, task.id);
            store.dispatch(Action::AddTask(task.clone()));
            Ok(task)
        }
        Err(e) => {
            let error = TaskError::Create(e);
            report(store, &error);
            Err(error)
        }
    }
}

pub fn update_task(
    store: &mut Store,
    backend: &impl Backend,
    task_id: TaskId,
    update: TaskUpdate,
) -> Result<Task, TaskError> {
    if update.is_empty() {
        return Err(TaskError::EmptyUpdate);
    }
    let update = update.validated()?;

    match backend.update_task(task_id, &update) {
        Ok(task) => {
            store.dispatch(Action::UpdateTask(task.clone()));
            Ok(task)
        }
        Err(e) => {
            let error = TaskError::Update(e);
            report(store, &error);
            Err(error)
        }
    }
}

pub fn update_task_status(
    store: &mut Store,
    backend: &impl Backend,
    task_id: TaskId,
    status: TaskStatus,
) -> Result<Task, TaskError> {
    match backend.update_task_status(task_id, status) {
        Ok(task) => {
            store.dispatch(Action::UpdateTaskStatus {
                task_id,
                status,
                at: task.updated_at,
            });
            Ok(task)
        }
        Err(e) => {
            let error = TaskError::UpdateStatus(e);
            report(store, &error);
            Err(error)
        }
    }
}

/// Advances a task to its next status in the quick-toggle cycle.
pub fn toggle_task_status(
    store: &mut Store,
    backend: &impl Backend,
    task_id: TaskId,
) -> Result<Task, TaskError> {
    let current = store
        .get_task(task_id)
        .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?
        .status;
    update_task_status(store, backend, task_id, current.next())
}

/// Deletes a task once `confirm` agrees.
pub fn delete_task(
    store: &mut Store,
    backend: &impl Backend,
    task_id: TaskId,
    confirm: impl FnOnce(&Task) -> bool,
) -> Result<Task, TaskError> {
    let task = store
        .get_task(task_id)
        .cloned()
        .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;

    if !confirm(&task) {
        return Err(TaskError::NotConfirmed(task.title));
    }

    if let Err(e) = backend.delete_task(task_id) {
        let error = TaskError::Delete(e);
        report(store, &error);
        return Err(error);
    }

    store.dispatch(Action::DeleteTask(task_id));
    Ok(task)
}

pub fn load_subtasks(backend: &impl Backend, parent_id: TaskId) -> Result<Vec<Task>, TaskError> {
    backend.list_subtasks(parent_id).map_err(TaskError::Load)
}

pub fn task_time_statistics(
    backend: &impl Backend,
    task_id: TaskId,
) -> Result<TimeStatistics, TaskError> {
    backend
        .task_time_statistics(task_id)
        .map_err(TaskError::Statistics)
}

/// A row of the task list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskRow<'a> {
    pub task: &'a Task,
    /// Listed under its parent
    pub nested: bool,
}

/// Applies the filter, then lists every top-level task followed by its
/// sub-tasks. Sub-tasks whose parent was filtered out stay in place.
pub fn visible_tasks<'a>(tasks: &'a [Task], filter: &TaskFilter) -> Vec<TaskRow<'a>> {
    let filtered: Vec<&Task> = tasks.iter().filter(|t| filter.matches(t)).collect();
    let mut rows = Vec::with_capacity(filtered.len());

    for &task in &filtered {
        match task.parent_id {
            None => {
                rows.push(TaskRow { task, nested: false });
                rows.extend(
                    filtered
                        .iter()
                        .filter(|t| t.parent_id == Some(task.id))
                        .map(|&t| TaskRow {
                            task: t,
                            nested: true,
                        }),
                );
            }
            Some(parent_id) if !filtered.iter().any(|t| t.id == parent_id) => {
                rows.push(TaskRow { task, nested: false });
            }
            Some(_) => {}
        }
    }

    rows
}

/// Moves the element at `from` to `to`, shifting the ones in between.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from == to || from >= items.len() || to >= items.len() {
        return;
    }
    let item = items.remove(from);
    items.insert(to, item);
}

/// Priorities that make the backend ordering (priority DESC) match the list:
/// the first of `n` rows gets `n`, the last gets 1.
pub fn reorder_priorities(order: &[TaskId]) -> Vec<TaskOrder> {
    let len = order.len() as u32;
    order
        .iter()
        .enumerate()
        .map(|(index, &task_id)| TaskOrder {
            task_id,
            priority: len - index as u32,
        })
        .collect()
}

pub struct ReorderParameters {
    /// Ids in the order currently shown
    pub visible: Vec<TaskId>,
    pub from: usize,
    pub to: usize,
    /// Scope of the reload that follows
    pub project_id: Option<ProjectId>,
}

/// Drag-and-drop reorder of the visible list.
///
/// The store is updated before the backend call so the list moves immediately;
/// whatever the outcome, tasks are then reloaded from the backend. Returns the
/// priorities sent, empty when the move was a no-op.
pub fn reorder_tasks(
    store: &mut Store,
    backend: &impl Backend,
    parameters: ReorderParameters,
) -> Result<Vec<TaskOrder>, TaskError> {
    let ReorderParameters {
        mut visible,
        from,
        to,
        project_id,
    } = parameters;

    if from == to || from >= visible.len() || to >= visible.len() {
        log::debug!("Reorder from {from} to {to} ignored");
        return Ok(Vec::new());
    }

    move_item(&mut visible, from, to);
    let orders = reorder_priorities(&visible);
    apply_order_locally(store, &orders);

    let request = ReorderTasksRequest {
        tasks: orders.clone(),
    };
    match backend.reorder_tasks(&request) {
        Ok(()) => {
            load_tasks(store, backend, project_id)?;
            Ok(orders)
        }
        Err(e) => {
            log::warn!("Reorder rejected, restoring tasks from the backend");
            let error = TaskError::Reorder(e);
            // The reload error, if any, is secondary to the reorder one
            let _ = load_tasks(store, backend, project_id);
            report(store, &error);
            Err(error)
        }
    }
}

fn apply_order_locally(store: &mut Store, orders: &[TaskOrder]) {
    let mut tasks = store.tasks.clone();
    for order in orders {
        if let Some(task) = tasks.iter_mut().find(|t| t.id == order.task_id) {
            task.priority = order.priority;
        }
    }
    tasks.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(a.created_at.cmp(&b.created_at))
    });
    store.dispatch(Action::SetTasks(tasks));
}

/// Parses a due date given as a day (`2024-03-05`) or a full RFC 3339 timestamp.
pub fn parse_due_date(value: &str, tz: &jiff::tz::TimeZone) -> Result<Timestamp, String> {
    if let Ok(ts) = value.parse::<Timestamp>() {
        return Ok(ts);
    }
    let date: jiff::civil::Date = value
        .parse()
        .map_err(|e| format!("Invalid due date '{value}': {e}"))?;
    date.to_zoned(tz.clone())
        .map(|z| z.timestamp())
        .map_err(|e| format!("Invalid due date '{value}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::memory::MemoryBackend,
        models::store::fixtures::{task, ts},
    };

    fn backend_with(tasks: Vec<Task>) -> (Store, MemoryBackend) {
        let backend = MemoryBackend::with_data(vec![], tasks);
        let mut store = Store::default();
        load_tasks(&mut store, &backend, Some(1)).unwrap();
        (store, backend)
    }

    fn prioritized(id: TaskId, priority: u32) -> Task {
        let mut t = task(id, 1, &format!("Task {id}"));
        t.priority = priority;
        t
    }

    #[test]
    fn test_move_item_array_semantics() {
        let mut items = vec!['a', 'b', 'c', 'd'];
        move_item(&mut items, 0, 2);
        assert_eq!(items, vec!['b', 'c', 'a', 'd']);

        move_item(&mut items, 3, 0);
        assert_eq!(items, vec!['d', 'b', 'c', 'a']);

        move_item(&mut items, 1, 9);
        assert_eq!(items, vec!['d', 'b', 'c', 'a']);
    }

    #[test]
    fn test_reorder_priorities_are_reverse_positions() {
        let orders = reorder_priorities(&[7, 3, 9]);
        let priorities: Vec<_> = orders.iter().map(|o| (o.task_id, o.priority)).collect();
        assert_eq!(priorities, vec![(7, 3), (3, 2), (9, 1)]);
    }

    #[test]
    fn test_reorder_sends_every_visible_task_and_reloads() {
        let (mut store, backend) =
            backend_with(vec![prioritized(1, 3), prioritized(2, 2), prioritized(3, 1)]);

        let orders = reorder_tasks(
            &mut store,
            &backend,
            ReorderParameters {
                visible: vec![1, 2, 3],
                from: 2,
                to: 0,
                project_id: Some(1),
            },
        )
        .unwrap();

        assert_eq!(orders.len(), 3);
        assert_eq!(backend.calls_to("reorder_tasks"), 1);
        assert_eq!(backend.calls_to("list_tasks"), 2);
        let order: Vec<_> = store.tasks.iter().map(|t| t.id).collect();
        assert_eq!(order, vec![3, 1, 2]);
        assert_eq!(store.get_task(3).unwrap().priority, 3);
    }

    #[test]
    fn test_reorder_to_same_index_is_a_no_op() {
        let (mut store, backend) = backend_with(vec![prioritized(1, 2), prioritized(2, 1)]);

        let orders = reorder_tasks(
            &mut store,
            &backend,
            ReorderParameters {
                visible: vec![1, 2],
                from: 1,
                to: 1,
                project_id: Some(1),
            },
        )
        .unwrap();

        assert!(orders.is_empty());
        assert_eq!(backend.calls_to("reorder_tasks"), 0);
    }

    #[test]
    fn test_failed_reorder_restores_backend_state() {
        let (mut store, backend) = backend_with(vec![prioritized(1, 2), prioritized(2, 1)]);
        backend.fail_on("reorder_tasks");

        let result = reorder_tasks(
            &mut store,
            &backend,
            ReorderParameters {
                visible: vec![1, 2],
                from: 0,
                to: 1,
                project_id: Some(1),
            },
        );

        assert!(matches!(result, Err(TaskError::Reorder(_))));
        let order: Vec<_> = store.tasks.iter().map(|t| t.id).collect();
        assert_eq!(order, vec![1, 2]);
        assert!(store.error.unwrap().starts_with("Failed to reorder tasks"));
    }

    #[test]
    fn test_visible_tasks_groups_subtasks_under_parents() {
        let mut child = task(3, 1, "Child of one");
        child.parent_id = Some(1);
        let tasks = vec![task(1, 1, "One"), task(2, 1, "Two"), child];

        let rows: Vec<_> = visible_tasks(&tasks, &TaskFilter::default())
            .iter()
            .map(|r| (r.task.id, r.nested))
            .collect();

        assert_eq!(rows, vec![(1, false), (3, true), (2, false)]);
    }

    #[test]
    fn test_visible_tasks_keeps_orphaned_subtasks() {
        let mut child = task(3, 1, "Buy milk");
        child.parent_id = Some(1);
        let tasks = vec![task(1, 1, "Groceries"), child];
        let filter = TaskFilter {
            query: "milk".to_string(),
            status: None,
        };

        let rows = visible_tasks(&tasks, &filter);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].task.id, 3);
        assert!(!rows[0].nested);
    }

    #[test]
    fn test_toggle_cycles_status_and_touches_updated_at() {
        let (mut store, backend) = backend_with(vec![task(1, 1, "Cycle")]);

        toggle_task_status(&mut store, &backend, 1).unwrap();
        assert_eq!(store.get_task(1).unwrap().status, TaskStatus::InProgress);
        assert_eq!(
            store.get_task(1).unwrap().updated_at,
            ts("2024-06-01T12:00:00Z")
        );

        toggle_task_status(&mut store, &backend, 1).unwrap();
        assert_eq!(store.get_task(1).unwrap().status, TaskStatus::Completed);
    }

    #[test]
    fn test_delete_task_requires_confirmation() {
        let (mut store, backend) = backend_with(vec![task(1, 1, "Keep"), task(2, 1, "Drop")]);
        store.dispatch(Action::SetSelectedTask(Some(2)));

        let declined = delete_task(&mut store, &backend, 1, |_| false);
        assert!(matches!(declined, Err(TaskError::NotConfirmed(_))));
        assert_eq!(backend.calls_to("delete_task"), 0);

        delete_task(&mut store, &backend, 2, |t| t.title == "Drop").unwrap();
        assert!(store.get_task(2).is_none());
        assert_eq!(store.selected_task_id, None);
    }

    #[test]
    fn test_create_task_defaults_and_subtask_depth() {
        let mut child = task(2, 1, "Child");
        child.parent_id = Some(1);
        let (mut store, backend) = backend_with(vec![task(1, 1, "Parent"), child]);

        let created = create_task(&mut store, &backend, NewTask::new(1, "New")).unwrap();
        assert_eq!(created.status, TaskStatus::Pending);
        assert_eq!(created.priority, 0);
        assert!(store.get_task(created.id).is_some());

        let nested = create_task(
            &mut store,
            &backend,
            NewTask {
                parent_id: Some(2),
                ..NewTask::new(1, "Grandchild")
            },
        );
        assert!(matches!(nested, Err(TaskError::NestedSubtask)));
    }

    #[test]
    fn test_update_status_failure_reports_error() {
        let (mut store, backend) = backend_with(vec![task(1, 1, "Stuck")]);
        backend.fail_on("update_task_status");

        let result = update_task_status(&mut store, &backend, 1, TaskStatus::Completed);

        assert!(result.is_err());
        assert_eq!(store.get_task(1).unwrap().status, TaskStatus::Pending);
        assert!(store.error.is_some());
    }

    #[test]
    fn test_parse_due_date() {
        let tz = jiff::tz::TimeZone::UTC;
        assert_eq!(
            parse_due_date("2024-03-05", &tz),
            Ok(ts("2024-03-05T00:00:00Z"))
        );
        assert_eq!(
            parse_due_date("2024-03-05T10:00:00Z", &tz),
            Ok(ts("2024-03-05T10:00:00Z"))
        );
        assert!(parse_due_date("soon", &tz).is_err());
    }
}
