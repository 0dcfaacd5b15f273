use std::{fmt, str::FromStr};

use jiff::{SignedDuration, Span, Timestamp, civil::Date, tz::TimeZone};
use thiserror::Error;

use crate::models::{
    task::{Task, TaskFilter, TaskStatus},
    time_entry::TimeEntry,
};

/// Every task is planned as one work day.
pub const PLANNED_HOURS: f64 = 8.0;
/// Time-based progress never reaches 100 before the task is completed.
pub const PROGRESS_CAP: f64 = 95.0;

const SECONDS_PER_DAY: i64 = 86_400;
const DAY_WIDTH: f64 = 100.0 / 7.0;

/// A task placed on the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineTask {
    pub task: Task,
    pub start: Timestamp,
    pub end: Timestamp,
    /// Planned hours
    pub duration: f64,
    /// Logged hours
    pub actual_duration: f64,
    pub progress: f64,
}

impl TimelineTask {
    pub fn urgency(&self, now: Timestamp) -> Urgency {
        Urgency::of(&self.task, now)
    }
}

fn shift_days(ts: Timestamp, days: i64) -> Timestamp {
    ts.checked_add(SignedDuration::from_hours(24 * days))
        .unwrap_or(ts)
}

fn add_days(date: Date, days: i64) -> Date {
    date.checked_add(Span::new().days(days)).unwrap_or(date)
}

/// Computes the bar of a task from its dates and time entries.
pub fn layout_task(task: &Task, entries: &[TimeEntry]) -> TimelineTask {
    let (mut start, end) = match task.due_date {
        Some(due) => (shift_days(due, -1), due),
        None => (task.created_at, shift_days(task.created_at, 1)),
    };

    if let Some(earliest) = entries.iter().map(|e| e.start_time).min()
        && earliest < start
    {
        start = earliest;
    }

    let actual_duration = actual_hours(entries);
    TimelineTask {
        task: task.clone(),
        start,
        end,
        duration: PLANNED_HOURS,
        actual_duration,
        progress: task_progress(task.status, actual_duration, PLANNED_HOURS),
    }
}

/// Hours logged by finished entries.
pub fn actual_hours(entries: &[TimeEntry]) -> f64 {
    let seconds: i64 = entries.iter().map(TimeEntry::logged_seconds).sum();
    seconds as f64 / 3600.0
}

pub fn status_progress(status: TaskStatus) -> f64 {
    match status {
        TaskStatus::Pending | TaskStatus::Cancelled => 0.0,
        TaskStatus::InProgress => 50.0,
        TaskStatus::Completed => 100.0,
    }
}

/// Percentage of completion. Logged time can raise the status floor, up to the cap.
pub fn task_progress(status: TaskStatus, actual_hours: f64, planned_hours: f64) -> f64 {
    let floor = status_progress(status);
    if actual_hours > 0.0 && planned_hours > 0.0 && status != TaskStatus::Completed {
        let by_time = (actual_hours / planned_hours * 100.0).min(PROGRESS_CAP);
        return floor.max(by_time);
    }
    floor
}

/// Seven consecutive days starting on a Sunday.
#[derive(Debug, Clone)]
pub struct Week {
    start: Date,
    tz: TimeZone,
}

impl Week {
    pub fn containing(date: Date, tz: TimeZone) -> Self {
        let offset = i64::from(date.weekday().to_sunday_zero_offset());
        Self {
            start: add_days(date, -offset),
            tz,
        }
    }

    pub fn current(tz: TimeZone) -> Self {
        let today = Timestamp::now().to_zoned(tz.clone()).date();
        Self::containing(today, tz)
    }

    /// Shifts by whole weeks, negative goes back.
    pub fn offset(&self, weeks: i64) -> Self {
        Self {
            start: add_days(self.start, 7 * weeks),
            tz: self.tz.clone(),
        }
    }

    pub fn next(&self) -> Self {
        self.offset(1)
    }

    pub fn previous(&self) -> Self {
        self.offset(-1)
    }

    pub fn first_day(&self) -> Date {
        self.start
    }

    pub fn last_day(&self) -> Date {
        add_days(self.start, 6)
    }

    pub fn days(&self) -> [Date; 7] {
        std::array::from_fn(|i| add_days(self.start, i as i64))
    }

    pub fn day(&self, index: usize) -> Option<Date> {
        self.days().get(index).copied()
    }

    pub fn time_zone(&self) -> &TimeZone {
        &self.tz
    }

    /// Midnight of the given date in the week's time zone.
    pub fn day_start(&self, date: Date) -> Timestamp {
        date.to_zoned(self.tz.clone())
            .map(|z| z.timestamp())
            .unwrap_or_else(|_| Timestamp::UNIX_EPOCH)
    }

    pub fn start(&self) -> Timestamp {
        self.day_start(self.start)
    }

    /// Half-open: from Sunday midnight up to the next Sunday midnight.
    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start() && ts < self.next().start()
    }

    pub fn date_of(&self, ts: Timestamp) -> Date {
        ts.to_zoned(self.tz.clone()).date()
    }
}

/// Horizontal placement of a bar, in percent of the week width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarPosition {
    pub left: f64,
    pub width: f64,
}

pub fn bar_position(task: &TimelineTask, week: &Week) -> BarPosition {
    let elapsed = task.start.as_second() - week.start().as_second();
    let days_since_start = elapsed.div_euclid(SECONDS_PER_DAY);
    let width = task.duration / PLANNED_HOURS * DAY_WIDTH;

    BarPosition {
        left: days_since_start as f64 * DAY_WIDTH,
        width: width.max(DAY_WIDTH / 4.0),
    }
}

/// Width of the logged-time overlay relative to the planned bar.
pub fn actual_duration_percent(task: &TimelineTask) -> f64 {
    if task.actual_duration == 0.0 || task.duration == 0.0 {
        return 0.0;
    }
    task.actual_duration / task.duration * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn of(task: &Task, now: Timestamp) -> Self {
        let Some(due) = task.due_date else {
            return Urgency::Low;
        };
        if task.status == TaskStatus::Completed {
            return Urgency::Low;
        }

        let seconds = (due.as_second() - now.as_second()) as f64;
        let days_until_due = (seconds / SECONDS_PER_DAY as f64).ceil();
        if days_until_due <= 1.0 {
            Urgency::High
        } else if days_until_due <= 3.0 {
            Urgency::Medium
        } else {
            Urgency::Low
        }
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("Unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseFilterError {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimelineFilter {
    #[default]
    All,
    WithDueDates,
    WithTimeLogs,
    Overdue,
    /// Due between today and three days from now
    Upcoming,
}

impl TimelineFilter {
    pub fn matches(&self, task: &TimelineTask, today: Date, tz: &TimeZone) -> bool {
        let due_day = task
            .task
            .due_date
            .map(|due| due.to_zoned(tz.clone()).date());

        match self {
            TimelineFilter::All => true,
            TimelineFilter::WithDueDates => task.task.due_date.is_some(),
            TimelineFilter::WithTimeLogs => task.actual_duration > 0.0,
            TimelineFilter::Overdue => {
                due_day.is_some_and(|d| d < today && task.task.status != TaskStatus::Completed)
            }
            TimelineFilter::Upcoming => {
                due_day.is_some_and(|d| d >= today && d <= add_days(today, 3))
            }
        }
    }
}

impl FromStr for TimelineFilter {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "all" => Ok(TimelineFilter::All),
            "with_due_dates" => Ok(TimelineFilter::WithDueDates),
            "with_time_logs" => Ok(TimelineFilter::WithTimeLogs),
            "overdue" => Ok(TimelineFilter::Overdue),
            "upcoming" => Ok(TimelineFilter::Upcoming),
            _ => Err(ParseFilterError {
                kind: "timeline filter",
                value: s.to_string(),
                expected: "all, with_due_dates, with_time_logs, overdue, upcoming",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateRange {
    #[default]
    CurrentWeek,
    ThisMonth,
    NextMonth,
    Custom { start: Date, end: Date },
}

impl DateRange {
    /// Inclusive first and last day of the range.
    pub fn bounds(&self, week: &Week, today: Date) -> (Date, Date) {
        match *self {
            DateRange::CurrentWeek => (week.first_day(), week.last_day()),
            DateRange::ThisMonth => (today.first_of_month(), today.last_of_month()),
            DateRange::NextMonth => {
                let next = today
                    .first_of_month()
                    .checked_add(Span::new().months(1))
                    .unwrap_or(today);
                (next.first_of_month(), next.last_of_month())
            }
            DateRange::Custom { start, end } => (start, end),
        }
    }

    /// The week the grid shows when this range is selected.
    pub fn anchor_week(&self, week: &Week, today: Date) -> Week {
        match self {
            DateRange::CurrentWeek => week.clone(),
            _ => Week::containing(self.bounds(week, today).0, week.time_zone().clone()),
        }
    }
}

impl FromStr for DateRange {
    type Err = ParseFilterError;

    /// `current_week`, `this_month`, `next_month` or `YYYY-MM-DD..YYYY-MM-DD`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "current_week" | "week" => return Ok(DateRange::CurrentWeek),
            "this_month" => return Ok(DateRange::ThisMonth),
            "next_month" => return Ok(DateRange::NextMonth),
            _ => {}
        }

        let custom = s.split_once("..").and_then(|(start, end)| {
            let start: Date = start.trim().parse().ok()?;
            let end: Date = end.trim().parse().ok()?;
            (start <= end).then_some(DateRange::Custom { start, end })
        });
        custom.ok_or_else(|| ParseFilterError {
            kind: "date range",
            value: s.to_string(),
            expected: "current_week, this_month, next_month, START..END",
        })
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateRange::CurrentWeek => f.write_str("Current week"),
            DateRange::ThisMonth => f.write_str("This month"),
            DateRange::NextMonth => f.write_str("Next month"),
            DateRange::Custom { start, end } => write!(f, "{start} to {end}"),
        }
    }
}

/// What the timeline view shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineQuery {
    pub tasks: TaskFilter,
    pub filter: TimelineFilter,
    pub range: DateRange,
}

/// Filters laid-out tasks and keeps those falling inside the selected range.
pub fn visible_timeline<'a>(
    tasks: &'a [TimelineTask],
    query: &TimelineQuery,
    week: &Week,
    today: Date,
) -> Vec<&'a TimelineTask> {
    let tz = week.time_zone();
    let (first, last) = query.range.bounds(week, today);

    tasks
        .iter()
        .filter(|t| query.tasks.matches(&t.task))
        .filter(|t| query.filter.matches(t, today, tz))
        .filter(|t| match query.range {
            DateRange::CurrentWeek => week.contains(t.start),
            _ => {
                let day = week.date_of(t.task.due_date.unwrap_or(t.task.created_at));
                day >= first && day <= last
            }
        })
        .collect()
}

/// `45m` under an hour, `1.5h` otherwise.
pub fn format_duration(hours: f64) -> String {
    if hours < 1.0 {
        format!("{}m", (hours * 60.0).round())
    } else {
        format!("{}h", (hours * 10.0).round() / 10.0)
    }
}
