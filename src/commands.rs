use clap::{Args, Subcommand, ValueEnum};
use colored::*;
use jiff::{Timestamp, civil::DateTime, tz::TimeZone};
use thiserror::Error;

use crate::{
    api::{ApiError, Backend},
    config::Config,
    models::{
        ProjectId, TaskId, TimeEntryId,
        project::{NewProject, ProjectUpdate},
        store::{Action, Store, TraySection},
        task::{NewTask, TaskFilter, TaskStatus, TaskUpdate},
        time_entry::{NewTimeEntry, TimeEntryUpdate},
        tray::TrayMenuData,
    },
    services::{
        projects::{
            DeleteProjectParameters, ProjectError, UpdateProjectParameters, create_project,
            delete_project, load_projects, load_projects_with_counts, open_project,
            resolve_project, update_project,
        },
        shell::{EventError, handle_event, load_data, refresh_tray_menu},
        tasks::{
            ReorderParameters, TaskError, TaskRow, create_task, delete_task, load_subtasks, load_tasks,
            parse_due_date, reorder_tasks, resolve_task, task_time_statistics, toggle_task_status,
            update_task, update_task_status, visible_tasks,
        },
        time_entries::{
            TimeEntryError, active_timer, create_time_entry, delete_time_entry, load_time_entries,
            start_timer, stop_active_timer, stop_timer, update_time_entry,
        },
        timeline::{RescheduleParameters, Rescheduled, TimelineError, load_timeline, reschedule_task},
    },
    session::Session,
    shell::{Shell, ShellError, ShellEvent, ShellEventError, ShellRequest, global_shortcut},
    timeline::{DateRange, TimelineFilter, TimelineQuery, Week, visible_timeline},
    ui,
};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Backend is not reachable: {0}")]
    Health(#[source] ApiError),

    #[error("Backend reported status '{0}'")]
    Unhealthy(String),

    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Timer(#[from] TimeEntryError),

    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    InvalidEvent(#[from] ShellEventError),

    #[error(transparent)]
    Shell(#[from] ShellError),

    #[error("{0}")]
    InvalidDate(String),

    #[error("No project given and none is open. Pass --project or run `project open` first")]
    NoProject,

    #[error("Position {position} is outside the list (1 to {len})")]
    PositionOutOfRange { position: usize, len: usize },

    #[error("Task '{0}' is not in the listed tasks")]
    NotListed(String),
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check that the backend is up
    Health,

    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommands),

    /// Show tasks on the week timeline
    Timeline(TimelineArgs),

    /// Move a task to a day of the timeline week
    Reschedule {
        /// Task id or title
        task: String,
        /// Day column, 0 is Sunday
        day: usize,
    },

    /// Track time
    #[command(subcommand)]
    Timer(TimerCommands),

    /// Show the tray menu
    Tray {
        /// Collapse or expand a section
        #[arg(long, value_enum)]
        toggle: Option<SectionArg>,
    },

    /// Deliver a tray or shell event (e.g. `update-task-status 4 completed`)
    Event {
        channel: String,
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Send a request to the shell (e.g. `get-backend-url`)
    Shell { channel: String },
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommands {
    /// List all projects
    List,
    /// Create a new project
    New {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Hex color like #007AFF
        #[arg(short, long)]
        color: Option<String>,
        #[arg(short, long)]
        icon: Option<String>,
    },
    /// Change a project
    Edit {
        /// Project id or name
        project: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        color: Option<String>,
        #[arg(short, long)]
        icon: Option<String>,
    },
    /// Delete a project and all of its tasks
    Delete {
        project: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Make a project the active one
    Open { project: String },
}

#[derive(Debug, Clone, Args)]
pub struct TaskListArgs {
    /// Project id or name, defaults to the open project
    #[arg(short, long)]
    project: Option<String>,
    /// Ignore the open project and list every task
    #[arg(short, long)]
    all: bool,
    /// Only tasks whose title or description contains this
    #[arg(short, long)]
    search: Option<String>,
    #[arg(long)]
    status: Option<TaskStatus>,
}

#[derive(Debug, Subcommand)]
pub enum TaskCommands {
    /// List tasks, sub-tasks under their parent
    List(TaskListArgs),
    /// Show one task
    Show { task: String },
    /// Add a task
    Add {
        title: String,
        #[arg(short, long)]
        project: Option<String>,
        /// Make it a sub-task of this task
        #[arg(long)]
        parent: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// 0 to 10
        #[arg(long)]
        priority: Option<u32>,
        /// Day (2025-03-01) or timestamp
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Change a task
    Edit {
        task: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<u32>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Set the status of a task
    Status { task: String, status: TaskStatus },
    /// Advance a task to its next status
    Toggle { task: String },
    /// Delete a task
    Delete {
        task: String,
        #[arg(short, long)]
        yes: bool,
    },
    /// Move a task to another position of the list
    Move {
        task: String,
        /// New position, 1 is the top
        position: usize,
        #[command(flatten)]
        list: TaskListArgs,
    },
    /// List the sub-tasks of a task
    Subtasks { task: String },
    /// Show time statistics of a task
    Stats { task: String },
}

#[derive(Debug, Args)]
pub struct TimelineArgs {
    /// Weeks from the current one
    #[arg(long, allow_hyphen_values = true)]
    week_offset: Option<i64>,
    /// The week after the last one shown
    #[arg(long, conflicts_with_all = ["previous", "week_offset"])]
    next: bool,
    /// The week before the last one shown
    #[arg(long, conflicts_with = "week_offset")]
    previous: bool,
    /// all, with_due_dates, with_time_logs, overdue, upcoming
    #[arg(short, long, default_value = "all")]
    filter: TimelineFilter,
    /// current_week, this_month, next_month or START..END
    #[arg(short, long, default_value = "current_week")]
    range: DateRange,
    #[arg(short, long)]
    search: Option<String>,
    #[arg(long)]
    status: Option<TaskStatus>,
    #[arg(short, long)]
    project: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum TimerCommands {
    /// Start a timer on a task
    Start {
        task: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Stop a timer, the running one by default
    Stop { entry: Option<TimeEntryId> },
    /// Show the running timer
    Active,
    /// List time entries
    Log {
        #[arg(short, long)]
        task: Option<String>,
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Record time worked after the fact
    Add {
        task: String,
        /// Start, e.g. 2025-03-01T09:00
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Change a time entry
    Edit {
        entry: TimeEntryId,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a time entry
    Delete { entry: TimeEntryId },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SectionArg {
    RecentTasks,
    RecentProjects,
    TimeTracking,
}

impl From<SectionArg> for TraySection {
    fn from(section: SectionArg) -> Self {
        match section {
            SectionArg::RecentTasks => TraySection::RecentTasks,
            SectionArg::RecentProjects => TraySection::RecentProjects,
            SectionArg::TimeTracking => TraySection::TimeTracking,
        }
    }
}

/// Parses a point in time: RFC 3339, a local date-time or a bare day.
fn parse_time(value: &str, tz: &TimeZone) -> Result<Timestamp, CommandError> {
    if let Ok(ts) = value.parse::<Timestamp>() {
        return Ok(ts);
    }
    if value.contains('T') {
        let datetime: DateTime = value
            .parse()
            .map_err(|e| CommandError::InvalidDate(format!("Invalid time '{value}': {e}")))?;
        return datetime
            .to_zoned(tz.clone())
            .map(|z| z.timestamp())
            .map_err(|e| CommandError::InvalidDate(format!("Invalid time '{value}': {e}")));
    }
    parse_due_date(value, tz).map_err(CommandError::InvalidDate)
}

fn task_filter(search: Option<String>, status: Option<TaskStatus>) -> TaskFilter {
    TaskFilter {
        query: search.unwrap_or_default(),
        status,
    }
}

/// Everything a command needs: the backend, the shell and the state they act on.
pub struct App<B, S> {
    pub config: Config,
    pub backend: B,
    pub shell: S,
    pub store: Store,
    pub session: Session,
}

impl<B: Backend, S: Shell> App<B, S> {
    pub fn new(config: Config, backend: B, shell: S, session: Session) -> Self {
        Self {
            config,
            backend,
            shell,
            store: Store::default(),
            session,
        }
    }

    fn tz(&self) -> &TimeZone {
        &self.config.time_zone
    }

    /// Loads projects and puts the saved UI state back on top of them.
    fn restore(&mut self) -> Result<(), CommandError> {
        load_projects(&mut self.store, &self.backend)?;
        self.session.restore(&mut self.store);
        Ok(())
    }

    /// Saves the UI state of the store into the session.
    pub fn capture(&mut self) {
        self.session.capture(&self.store);
    }

    /// Project to scope a listing to: the given one, none with `all`, or the open one.
    fn project_scope(
        &self,
        project: Option<&str>,
        all: bool,
    ) -> Result<Option<ProjectId>, CommandError> {
        match project {
            Some(project) => Ok(Some(resolve_project(&self.store, project)?.id)),
            None if all => Ok(None),
            None => Ok(self.store.active_project.as_ref().map(|p| p.id)),
        }
    }

    fn resolve_task_id(&mut self, task: &str) -> Result<TaskId, CommandError> {
        if self.store.tasks.is_empty() {
            load_tasks(&mut self.store, &self.backend, None)?;
        }
        Ok(resolve_task(&self.store, task)?.id)
    }

    pub fn run(&mut self, command: Commands) -> Result<(), CommandError> {
        match command {
            Commands::Health => self.health(),
            Commands::Project(command) => {
                self.restore()?;
                self.project(command)
            }
            Commands::Task(command) => {
                self.restore()?;
                self.task(command)
            }
            Commands::Timeline(args) => {
                self.restore()?;
                self.timeline(args)
            }
            Commands::Reschedule { task, day } => {
                self.restore()?;
                self.reschedule(&task, day)
            }
            Commands::Timer(command) => {
                self.restore()?;
                self.timer(command)
            }
            Commands::Tray { toggle } => {
                load_data(&mut self.store, &self.backend)?;
                self.session.restore(&mut self.store);
                if let Some(section) = toggle {
                    self.store
                        .dispatch(Action::ToggleTrayMenuSection(section.into()));
                }
                refresh_tray_menu(&self.store, &mut self.shell)?;
                ui::render_tray(&TrayMenuData::from_store(&self.store), global_shortcut());
                Ok(())
            }
            Commands::Event { channel, args } => {
                let event = ShellEvent::parse(&channel, &args)?;
                load_data(&mut self.store, &self.backend)?;
                self.session.restore(&mut self.store);
                handle_event(&mut self.store, &self.backend, &mut self.shell, event)?;
                Ok(())
            }
            Commands::Shell { channel } => {
                let request: ShellRequest = channel.parse()?;
                let response = self.shell.request(request)?;
                println!("{response}");
                Ok(())
            }
        }
    }

    fn health(&mut self) -> Result<(), CommandError> {
        let health = self.backend.health().map_err(CommandError::Health)?;
        if !health.is_ok() {
            return Err(CommandError::Unhealthy(health.status));
        }

        let checked_at = Timestamp::from_second(health.timestamp)
            .map(|ts| ts.to_zoned(self.tz().clone()).strftime("%H:%M:%S").to_string())
            .unwrap_or_default();
        println!("{} Backend is up {}", "✓".green(), checked_at.dimmed());
        Ok(())
    }

    fn project(&mut self, command: ProjectCommands) -> Result<(), CommandError> {
        match command {
            ProjectCommands::List => {
                let projects = load_projects_with_counts(&mut self.store, &self.backend)?;
                if projects.is_empty() {
                    println!("No projects yet");
                    return Ok(());
                }

                let active_id = self.store.active_project.as_ref().map(|p| p.id);
                ui::render_view_header("Projects", projects.len());
                for entry in &projects {
                    ui::render_project_line(
                        &entry.project,
                        Some(entry.task_count),
                        Some(entry.project.id) == active_id,
                    );
                }
                println!();
            }
            ProjectCommands::New {
                name,
                description,
                color,
                icon,
            } => {
                let defaults = NewProject::new(name);
                let project = create_project(
                    &mut self.store,
                    &self.backend,
                    NewProject {
                        description,
                        color: color.unwrap_or(defaults.color.clone()),
                        icon: icon.unwrap_or(defaults.icon.clone()),
                        ..defaults
                    },
                )?;
                println!("✓ Project created: {}", project.name);
                println!("  #{}", project.id);
            }
            ProjectCommands::Edit {
                project,
                name,
                description,
                color,
                icon,
            } => {
                let updated = update_project(
                    &mut self.store,
                    &self.backend,
                    UpdateProjectParameters {
                        project,
                        update: ProjectUpdate {
                            name,
                            description,
                            color,
                            icon,
                        },
                    },
                )?;
                println!("✓ Project updated: {}", updated.name);
            }
            ProjectCommands::Delete { project, yes } => {
                let project_id = resolve_project(&self.store, &project)?.id;
                load_tasks(&mut self.store, &self.backend, Some(project_id))?;

                let deleted = delete_project(
                    &mut self.store,
                    &self.backend,
                    DeleteProjectParameters { project },
                    |project, tasks| {
                        yes || ui::confirm(&format!(
                            "Delete project \"{}\" and its {} task(s)?",
                            project.name, tasks
                        ))
                    },
                )?;
                println!("✓ Project deleted: {}", deleted.project.name);
                if deleted.cascaded_tasks_count > 0 {
                    println!("  {} task(s) deleted with it", deleted.cascaded_tasks_count);
                }
            }
            ProjectCommands::Open { project } => {
                let project = open_project(&mut self.store, &project)?;
                println!("✓ Opened project: {}", project.name);
            }
        }
        Ok(())
    }

    fn list_tasks(&mut self, args: TaskListArgs) -> Result<(), CommandError> {
        let scope = self.project_scope(args.project.as_deref(), args.all)?;
        load_tasks(&mut self.store, &self.backend, scope)?;

        let filter = task_filter(args.search, args.status);
        let rows = visible_tasks(&self.store.tasks, &filter);
        if rows.is_empty() {
            println!("No tasks");
            return Ok(());
        }

        let title = match scope.and_then(|id| self.store.get_project(id)) {
            Some(project) => project.name.clone(),
            None => "All tasks".to_string(),
        };
        ui::render_view_header(&title, rows.len());
        let now = Timestamp::now();
        for row in &rows {
            ui::render_task_row(row, &self.store, now, self.tz());
        }

        let completed = self.store.get_tasks_by_status(TaskStatus::Completed).count();
        println!(
            "\n  {}\n",
            format!("{} of {} completed", completed, self.store.tasks.len()).dimmed()
        );
        Ok(())
    }

    fn task(&mut self, command: TaskCommands) -> Result<(), CommandError> {
        match command {
            TaskCommands::List(args) => self.list_tasks(args)?,
            TaskCommands::Show { task } => {
                let task_id = self.resolve_task_id(&task)?;
                if let Some(task) = self.store.get_task(task_id) {
                    ui::render_task_details(task, &self.store, self.tz());
                }

                let subtasks: Vec<_> = self
                    .store
                    .tasks
                    .iter()
                    .filter(|t| t.parent_id == Some(task_id))
                    .collect();
                if !subtasks.is_empty() {
                    ui::render_section_header("Sub-tasks");
                    let now = Timestamp::now();
                    for subtask in subtasks {
                        let row = TaskRow {
                            task: subtask,
                            nested: true,
                        };
                        ui::render_task_row(&row, &self.store, now, self.tz());
                    }
                    println!();
                }
            }
            TaskCommands::Add {
                title,
                project,
                parent,
                description,
                priority,
                due,
                status,
            } => {
                let parent = match parent {
                    Some(parent) => {
                        let parent_id = self.resolve_task_id(&parent)?;
                        self.store.get_task(parent_id).map(|t| (t.id, t.project_id))
                    }
                    None => None,
                };
                let project_id = match self.project_scope(project.as_deref(), false)? {
                    Some(id) => id,
                    None => parent.map(|(_, project_id)| project_id).ok_or(CommandError::NoProject)?,
                };
                let due_date = due
                    .map(|due| parse_due_date(&due, self.tz()))
                    .transpose()
                    .map_err(CommandError::InvalidDate)?;

                let defaults = NewTask::new(project_id, title);
                let task = create_task(
                    &mut self.store,
                    &self.backend,
                    NewTask {
                        parent_id: parent.map(|(id, _)| id),
                        description,
                        status: status.unwrap_or(defaults.status),
                        priority: priority.unwrap_or(defaults.priority),
                        due_date,
                        ..defaults
                    },
                )?;
                println!("✓ Task added: {}", task.title);
                println!("  #{}", task.id);
                if let Some(project) = self.store.get_project(task.project_id) {
                    println!("  Project: {}", project.name);
                }
            }
            TaskCommands::Edit {
                task,
                title,
                description,
                priority,
                due,
                status,
            } => {
                let task_id = self.resolve_task_id(&task)?;
                let due_date = due
                    .map(|due| parse_due_date(&due, self.tz()))
                    .transpose()
                    .map_err(CommandError::InvalidDate)?;
                let updated = update_task(
                    &mut self.store,
                    &self.backend,
                    task_id,
                    TaskUpdate {
                        title,
                        description,
                        status,
                        priority,
                        due_date,
                        parent_id: None,
                    },
                )?;
                println!("✓ Task updated: {}", updated.title);
            }
            TaskCommands::Status { task, status } => {
                let task_id = self.resolve_task_id(&task)?;
                let updated = update_task_status(&mut self.store, &self.backend, task_id, status)?;
                println!("✓ \"{}\" marked as {}", updated.title, status.label());
            }
            TaskCommands::Toggle { task } => {
                let task_id = self.resolve_task_id(&task)?;
                let updated = toggle_task_status(&mut self.store, &self.backend, task_id)?;
                println!("✓ \"{}\" is now {}", updated.title, updated.status.label());
            }
            TaskCommands::Delete { task, yes } => {
                let task_id = self.resolve_task_id(&task)?;
                let deleted = delete_task(&mut self.store, &self.backend, task_id, |task| {
                    yes || ui::confirm(&format!("Delete task \"{}\"?", task.title))
                })?;
                if self.store.selected_task_id == Some(deleted.id) {
                    self.store.dispatch(Action::SetSelectedTask(None));
                }
                println!("✓ Task deleted: {}", deleted.title);
            }
            TaskCommands::Move {
                task,
                position,
                list,
            } => {
                let scope = self.project_scope(list.project.as_deref(), list.all)?;
                load_tasks(&mut self.store, &self.backend, scope)?;
                let task_id = resolve_task(&self.store, &task)?.id;

                let filter = task_filter(list.search.clone(), list.status);
                let visible: Vec<TaskId> = visible_tasks(&self.store.tasks, &filter)
                    .iter()
                    .map(|row| row.task.id)
                    .collect();
                let from = visible
                    .iter()
                    .position(|&id| id == task_id)
                    .ok_or(CommandError::NotListed(task))?;
                if position == 0 || position > visible.len() {
                    return Err(CommandError::PositionOutOfRange {
                        position,
                        len: visible.len(),
                    });
                }

                reorder_tasks(
                    &mut self.store,
                    &self.backend,
                    ReorderParameters {
                        visible,
                        from,
                        to: position - 1,
                        project_id: scope,
                    },
                )?;
                self.list_tasks(list)?;
            }
            TaskCommands::Subtasks { task } => {
                let task_id = self.resolve_task_id(&task)?;
                let subtasks = load_subtasks(&self.backend, task_id)?;
                let title = self
                    .store
                    .get_task(task_id)
                    .map(|t| t.title.clone())
                    .unwrap_or_default();

                if subtasks.is_empty() {
                    println!("\"{}\" has no sub-tasks", title);
                    return Ok(());
                }
                ui::render_view_header(&format!("Sub-tasks of \"{}\"", title), subtasks.len());
                let now = Timestamp::now();
                for subtask in &subtasks {
                    let row = TaskRow {
                        task: subtask,
                        nested: false,
                    };
                    ui::render_task_row(&row, &self.store, now, self.tz());
                }
                println!();
            }
            TaskCommands::Stats { task } => {
                let task_id = self.resolve_task_id(&task)?;
                let stats = task_time_statistics(&self.backend, task_id)?;
                if let Some(task) = self.store.get_task(task_id) {
                    ui::render_statistics(task, &stats, self.tz());
                }
            }
        }
        Ok(())
    }

    fn timeline(&mut self, args: TimelineArgs) -> Result<(), CommandError> {
        let tz = self.tz().clone();
        let now = Timestamp::now();
        let today = now.to_zoned(tz.clone()).date();

        let shown = self.session.week(tz.clone());
        let week = match args.week_offset {
            Some(offset) => Week::current(tz).offset(offset),
            None if args.next => shown.next(),
            None if args.previous => shown.previous(),
            None => shown,
        };
        let project_id = self.project_scope(args.project.as_deref(), false)?;
        let laid_out = load_timeline(&mut self.store, &self.backend, project_id)?;

        let query = TimelineQuery {
            tasks: task_filter(args.search, args.status),
            filter: args.filter,
            range: args.range,
        };
        let anchor = query.range.anchor_week(&week, today);
        self.session.set_week(&anchor);
        self.session.timeline_project_id = project_id;
        let visible = visible_timeline(&laid_out, &query, &anchor, today);

        let title = match query.range {
            DateRange::CurrentWeek => format!(
                "Week of {}",
                anchor.first_day().strftime("%b %d %Y")
            ),
            range => range.to_string(),
        };
        ui::render_view_header(&title, visible.len());
        if visible.is_empty() {
            println!("  {}\n", "Nothing scheduled".dimmed());
            return Ok(());
        }
        ui::render_timeline(&anchor, &visible, now);
        Ok(())
    }

    /// Moves a task onto a day of the grid the timeline last drew.
    fn reschedule(&mut self, task: &str, day: usize) -> Result<(), CommandError> {
        let project_id = self
            .session
            .timeline_project_id
            .or_else(|| self.store.active_project.as_ref().map(|p| p.id));
        load_tasks(&mut self.store, &self.backend, project_id)?;
        let task_id = resolve_task(&self.store, task)?.id;
        let week = self.session.week(self.tz().clone());

        let outcome = reschedule_task(
            &mut self.store,
            &self.backend,
            &week,
            RescheduleParameters {
                task_id,
                day_index: day,
                project_id,
            },
        )?;
        match outcome {
            Rescheduled::Moved(date) => {
                println!("✓ Task due {}", date.strftime("%A, %b %d"))
            }
            Rescheduled::Unchanged => println!("Task is already due that day"),
        }
        Ok(())
    }

    fn timer(&mut self, command: TimerCommands) -> Result<(), CommandError> {
        match command {
            TimerCommands::Start { task, description } => {
                let task_id = self.resolve_task_id(&task)?;
                active_timer(&mut self.store, &self.backend)?;
                let entry = start_timer(&mut self.store, &self.backend, task_id, description)?;
                let title = self
                    .store
                    .get_task(task_id)
                    .map(|t| t.title.clone())
                    .unwrap_or_default();
                println!("✓ Timer started for \"{}\"", title);
                println!("  entry #{}", entry.id);
            }
            TimerCommands::Stop { entry } => {
                let stopped = match entry {
                    Some(entry_id) => stop_timer(&mut self.store, &self.backend, entry_id)?,
                    None => stop_active_timer(&mut self.store, &self.backend)?,
                };
                println!(
                    "✓ Timer stopped after {}",
                    ui::format_seconds(stopped.logged_seconds())
                );
            }
            TimerCommands::Active => match active_timer(&mut self.store, &self.backend)? {
                Some(entry) => {
                    load_tasks(&mut self.store, &self.backend, None)?;
                    ui::render_time_entry(&entry, &self.store, Timestamp::now(), self.tz());
                }
                None => println!("No timer running"),
            },
            TimerCommands::Log { task, project } => {
                load_tasks(&mut self.store, &self.backend, None)?;
                let task_id = match task {
                    Some(task) => Some(resolve_task(&self.store, &task)?.id),
                    None => None,
                };
                let project_id = self.project_scope(project.as_deref(), task_id.is_some())?;
                load_time_entries(&mut self.store, &self.backend, task_id, project_id)?;

                let entries = &self.store.time_entries;
                if entries.is_empty() {
                    println!("No time logged");
                    return Ok(());
                }
                ui::render_view_header("Time log", entries.len());
                let now = Timestamp::now();
                for entry in entries {
                    ui::render_time_entry(entry, &self.store, now, self.tz());
                }
                let total: i64 = entries.iter().map(|e| e.elapsed_seconds(now)).sum();
                println!("\n  Total: {}\n", ui::format_seconds(total).bold());
            }
            TimerCommands::Add {
                task,
                start,
                end,
                description,
            } => {
                let task_id = self.resolve_task_id(&task)?;
                let start_time = parse_time(&start, self.tz())?;
                let end_time = end.map(|end| parse_time(&end, self.tz())).transpose()?;
                let entry = create_time_entry(
                    &mut self.store,
                    &self.backend,
                    NewTimeEntry {
                        task_id,
                        start_time,
                        end_time,
                        description,
                    },
                )?;
                println!(
                    "✓ Logged {} (entry #{})",
                    ui::format_seconds(entry.logged_seconds()),
                    entry.id
                );
            }
            TimerCommands::Edit {
                entry,
                start,
                end,
                description,
            } => {
                let start_time = start.map(|s| parse_time(&s, self.tz())).transpose()?;
                let end_time = end.map(|e| parse_time(&e, self.tz())).transpose()?;
                let updated = update_time_entry(
                    &mut self.store,
                    &self.backend,
                    entry,
                    TimeEntryUpdate {
                        start_time,
                        end_time,
                        description,
                    },
                )?;
                println!("✓ Entry #{} updated", updated.id);
            }
            TimerCommands::Delete { entry } => {
                delete_time_entry(&mut self.store, &self.backend, entry)?;
                println!("✓ Entry #{} deleted", entry);
            }
        }
        Ok(())
    }
}
