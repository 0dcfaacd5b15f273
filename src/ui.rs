use std::io::{self, BufRead, Write};

use colored::*;
use jiff::{Timestamp, civil::Date, tz::TimeZone};

use crate::{
    models::{
        project::{Project, icon_emoji},
        store::{Store, TraySection},
        task::{Priority, Task, TaskStatus},
        time_entry::{TimeEntry, TimeStatistics},
        tray::TrayMenuData,
    },
    services::tasks::TaskRow,
    timeline::{
        BarPosition, TimelineTask, Urgency, Week, actual_duration_percent, bar_position,
        format_duration,
    },
};

const TITLE_COLUMN: usize = 24;

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Get the appropriate status glyph for a task
pub fn get_status_glyph(task: &Task, is_overdue: bool) -> ColoredString {
    match task.status {
        TaskStatus::Completed => "✓".dimmed(),
        TaskStatus::Cancelled => "✗".dimmed(),
        _ if is_overdue => "●".red(),
        TaskStatus::InProgress => "◐".yellow(),
        TaskStatus::Pending => "○".normal(),
    }
}

pub fn is_overdue(task: &Task, now: Timestamp) -> bool {
    if matches!(task.status, TaskStatus::Completed | TaskStatus::Cancelled) {
        return false;
    }
    task.due_date.is_some_and(|due| due < now)
}

/// Priority, due date and project, joined for the right-hand column.
pub fn get_task_context(task: &Task, store: &Store, tz: &TimeZone) -> Option<String> {
    let mut parts = vec![];

    if task.priority_bucket() != Priority::None {
        parts.push(format!("{} {}", task.priority_bucket().label(), task.priority));
    }
    if let Some(due) = task.due_date {
        parts.push(format!("due {}", format_day(due.to_zoned(tz.clone()).date(), tz)));
    }
    if let Some(project) = store.get_project(task.project_id) {
        parts.push(project.name.clone());
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("  ·  "))
    }
}

/// Print `left` with `right` pushed against the terminal edge when it fits.
fn print_aligned(styled_left: ColoredString, left_visible_len: usize, right: &str) {
    let terminal_width = get_terminal_width();

    if right.is_empty() {
        println!("{}", styled_left);
        return;
    }

    let total_content = left_visible_len + right.chars().count();
    if total_content + 4 < terminal_width {
        let padding = terminal_width - total_content - 2;
        println!("{}{}{}", styled_left, " ".repeat(padding), right.dimmed());
    } else {
        // Not enough space for right alignment, just print normally
        println!("{}", styled_left);
    }
}

/// Render a task row with ID, glyph, title, and right-aligned context
pub fn render_task_row(row: &TaskRow, store: &Store, now: Timestamp, tz: &TimeZone) {
    let task = row.task;
    let indent = if row.nested { "  ↳ " } else { "" };
    let id_str = format!("{:>3}", task.id);
    let glyph = get_status_glyph(task, is_overdue(task, now));

    let left_section = format!("  {}  {}  {}{}", id_str, glyph, indent, task.title);
    let left_visible_len = format!("  {}  {}  {}{}", id_str, " ", indent, task.title)
        .chars()
        .count();

    let styled_left = match task.status {
        TaskStatus::Completed | TaskStatus::Cancelled => left_section.dimmed(),
        _ if row.nested => left_section.normal(),
        _ => left_section.bold(),
    };

    let context = get_task_context(task, store, tz).unwrap_or_default();
    print_aligned(styled_left, left_visible_len, &context);
}

pub fn render_task_details(task: &Task, store: &Store, tz: &TimeZone) {
    println!("\n  {} {}", format!("#{}", task.id).dimmed(), task.title.bold());
    println!("  Status:   {}", task.status.label());
    println!("  Priority: {}", task.priority);
    if let Some(project) = store.get_project(task.project_id) {
        println!("  Project:  {} {}", icon_emoji(&project.icon), project.name);
    }
    if let Some(parent_id) = task.parent_id {
        println!("  Parent:   #{}", parent_id);
    }
    if let Some(due) = task.due_date {
        println!(
            "  Due:      {}",
            due.to_zoned(tz.clone()).strftime("%a %b %d %Y %H:%M")
        );
    }
    if let Some(description) = &task.description {
        println!("\n  {}", description);
    }
    println!();
}

/// Parses `#RRGGBB`.
pub fn hex_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

pub fn render_project_line(project: &Project, task_count: Option<u64>, is_active: bool) {
    let name = match hex_rgb(&project.color) {
        Some((r, g, b)) => project.name.truecolor(r, g, b).bold(),
        None => project.name.bold(),
    };
    let marker = if is_active { "▸".cyan() } else { " ".normal() };
    let left_visible_len = format!(" {} {:>3}  {}  {}", " ", project.id, " ", project.name)
        .chars()
        .count()
        + 1;
    let left = format!(
        " {} {:>3}  {}  {}",
        marker,
        project.id,
        icon_emoji(&project.icon),
        name
    );

    let right = match (task_count, &project.description) {
        (Some(count), _) => {
            let word = if count == 1 { "task" } else { "tasks" };
            format!("{} {}", count, word)
        }
        (None, Some(description)) => truncate(description, 40),
        (None, None) => String::new(),
    };
    print_aligned(left.normal(), left_visible_len, &right);
}

/// Cuts `text` to `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// Converts a bar placed in percent of the week into character columns of a
/// grid `grid_width` wide. `None` when the bar falls outside the grid.
pub fn bar_columns(position: BarPosition, grid_width: usize) -> Option<(usize, usize)> {
    let scale = grid_width as f64 / 100.0;
    let start = (position.left * scale).round();
    let end = ((position.left + position.width) * scale).round().max(start + 1.0);

    let start = start.max(0.0);
    let end = end.min(grid_width as f64);
    if end <= start {
        return None;
    }
    Some((start as usize, (end - start) as usize))
}

fn urgency_color(text: &str, task: &TimelineTask, now: Timestamp) -> ColoredString {
    if task.task.status == TaskStatus::Completed {
        return text.dimmed();
    }
    match task.urgency(now) {
        Urgency::High => text.red(),
        Urgency::Medium => text.yellow(),
        Urgency::Low => text.green(),
    }
}

pub fn render_timeline(week: &Week, tasks: &[&TimelineTask], now: Timestamp) {
    let terminal_width = get_terminal_width();
    let day_width = (terminal_width.saturating_sub(TITLE_COLUMN + 10) / 7).max(4);
    let grid_width = day_width * 7;
    let today = now.to_zoned(week.time_zone().clone()).date();

    let mut header = " ".repeat(TITLE_COLUMN + 2);
    for day in week.days() {
        let label = day.strftime("%a %d").to_string();
        header.push_str(&format!("{:<width$}", truncate(&label, day_width), width = day_width));
    }
    println!("{}", header.dimmed());

    let mut today_marker = " ".repeat(TITLE_COLUMN + 2);
    for day in week.days() {
        let mark = if day == today { "▔" } else { " " };
        today_marker.push_str(&mark.repeat(day_width));
    }
    println!("{}", today_marker.cyan());

    for task in tasks {
        let title = format!("{:<width$}", truncate(&task.task.title, TITLE_COLUMN), width = TITLE_COLUMN);
        let mut line = format!("  {}", title);

        match bar_columns(bar_position(task, week), grid_width) {
            Some((start, len)) => {
                let logged = ((actual_duration_percent(task) / 100.0) * len as f64)
                    .round()
                    .min(len as f64) as usize;
                let bar = format!("{}{}", "█".repeat(logged), "░".repeat(len - logged));
                line.push_str(&" ".repeat(start));
                println!(
                    "{}{}{}",
                    line,
                    urgency_color(&bar, task, now),
                    format!(
                        " {:>3}%  {}",
                        task.progress.round(),
                        format_duration(task.actual_duration)
                    )
                    .dimmed()
                );
            }
            None => println!("{}{}", line, "(outside this week)".dimmed()),
        }
    }
    println!();
}

/// `2h 05m`, or just minutes under an hour.
pub fn format_seconds(seconds: i64) -> String {
    let minutes = seconds.max(0) / 60;
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{m}m"),
        (h, m) => format!("{h}h {m:02}m"),
    }
}

pub fn render_time_entry(entry: &TimeEntry, store: &Store, now: Timestamp, tz: &TimeZone) {
    let start = entry.start_time.to_zoned(tz.clone());
    let span = match entry.end_time {
        Some(end) => format!(
            "{} - {}",
            start.strftime("%b %d %H:%M"),
            end.to_zoned(tz.clone()).strftime("%H:%M")
        ),
        None => format!("{} - now", start.strftime("%b %d %H:%M")),
    };
    let title = store
        .get_task(entry.task_id)
        .map(|t| t.title.as_str())
        .unwrap_or("(unknown task)");

    let duration = if entry.is_active() {
        format_seconds(entry.elapsed_seconds(now)).green().bold()
    } else {
        format_seconds(entry.logged_seconds()).normal()
    };

    let left_visible_len = format!("  {:>4}  {}  {:>7}  {}", entry.id, span, "", title)
        .chars()
        .count();
    let left = format!(
        "  {:>4}  {}  {:>7}  {}",
        format!("{}", entry.id).dimmed(),
        span,
        duration,
        title.bold()
    );
    print_aligned(
        left.normal(),
        left_visible_len,
        entry.description.as_deref().unwrap_or_default(),
    );
}

pub fn render_statistics(task: &Task, stats: &TimeStatistics, tz: &TimeZone) {
    render_view_header(&format!("Time on \"{}\"", task.title), 1);
    println!("  Entries:  {}", stats.total_entries);
    println!("  Total:    {}", format_seconds(stats.total_duration));
    println!("  Average:  {}", format_seconds(stats.avg_duration));
    if let Some(first) = stats.first_entry {
        println!("  First:    {}", format_timestamp(first, tz));
    }
    if let Some(last) = stats.last_entry {
        println!("  Last:     {}", format_timestamp(last, tz));
    }
    println!();
}

fn tray_section_header(title: &str, collapsed: bool) {
    if collapsed {
        println!("\n  {} {}", "▸".dimmed(), title.dimmed());
    } else {
        println!("\n  {} {}", "▾".cyan(), title.bold());
    }
}

pub fn render_tray(data: &TrayMenuData, shortcut: &str) {
    println!("\n  {}", "Focused To-Do".cyan().bold());

    tray_section_header("Recent Tasks", data.collapsed.get(TraySection::RecentTasks));
    if !data.collapsed.recent_tasks {
        if data.recent_tasks.is_empty() {
            println!("    {}", "No tasks yet".dimmed());
        }
        for task in &data.recent_tasks {
            println!("    {}  {}", format!("{:>3}", task.id).dimmed(), task.label());
        }
    }

    tray_section_header("Projects", data.collapsed.get(TraySection::RecentProjects));
    if !data.collapsed.recent_projects {
        for project in &data.projects {
            println!(
                "    {} {}  {}",
                icon_emoji(&project.icon),
                project.name,
                format!("{}/{}", project.completed_tasks, project.task_count).dimmed()
            );
        }
    }

    tray_section_header("Time Tracking", data.collapsed.get(TraySection::TimeTracking));
    if !data.collapsed.time_tracking {
        match &data.active_time_entry {
            Some(timer) => println!(
                "    ⏱  Running: {}",
                timer.task_title.as_deref().unwrap_or("Unknown task").green()
            ),
            None => println!("    {}", "No timer running".dimmed()),
        }
    }

    println!("\n  {}\n", format!("Quick add: {shortcut}").dimmed());
}

fn format_timestamp(ts: Timestamp, tz: &TimeZone) -> String {
    ts.to_zoned(tz.clone()).strftime("%b %d %Y %H:%M").to_string()
}

/// "Today", "Tomorrow", "Yesterday" or e.g. "Mar 05".
fn format_day(date: Date, tz: &TimeZone) -> String {
    let today = Timestamp::now().to_zoned(tz.clone()).date();

    if date == today {
        "today".to_string()
    } else if today.tomorrow().is_ok_and(|d| d == date) {
        "tomorrow".to_string()
    } else if today.yesterday().is_ok_and(|d| d == date) {
        "yesterday".to_string()
    } else {
        date.strftime("%b %d").to_string()
    }
}

/// Render a view header with title and count
pub fn render_view_header(title: &str, count: usize) {
    let task_word = if count == 1 { "item" } else { "items" };
    println!("\n  {} ({} {})\n", title.cyan().bold(), count, task_word);
}

/// Render a section header (e.g., "Sub-tasks")
pub fn render_section_header(title: &str) {
    println!("\n  ─── {} ───\n", title.bold());
}

/// Asks a yes/no question on stdin; anything but yes is a no.
pub fn confirm(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => is_yes(&answer),
        Err(e) => {
            log::warn!("Could not read confirmation: {e}");
            false
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::store::fixtures::{task, ts};

    #[test]
    fn test_bar_columns_scale_and_clip() {
        let full_day = BarPosition {
            left: 100.0 / 7.0,
            width: 100.0 / 7.0,
        };
        assert_eq!(bar_columns(full_day, 70), Some((10, 10)));

        let before_week = BarPosition {
            left: -100.0 / 7.0,
            width: 200.0 / 7.0,
        };
        assert_eq!(bar_columns(before_week, 70), Some((0, 10)));

        let after_week = BarPosition {
            left: 100.0,
            width: 100.0 / 7.0,
        };
        assert_eq!(bar_columns(after_week, 70), None);
    }

    #[test]
    fn test_bar_columns_never_empty_inside_grid() {
        let sliver = BarPosition {
            left: 50.0,
            width: 0.1,
        };
        assert_eq!(bar_columns(sliver, 70), Some((35, 1)));
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 3), "éé…");
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0), "0m");
        assert_eq!(format_seconds(59 * 60), "59m");
        assert_eq!(format_seconds(3600 + 5 * 60), "1h 05m");
        assert_eq!(format_seconds(-30), "0m");
    }

    #[test]
    fn test_hex_rgb() {
        assert_eq!(hex_rgb("#007AFF"), Some((0, 122, 255)));
        assert_eq!(hex_rgb("007AFF"), None);
        assert_eq!(hex_rgb("#12345"), None);
        assert_eq!(hex_rgb("#GG0000"), None);
    }

    #[test]
    fn test_overdue_ignores_finished_tasks() {
        let now = ts("2024-06-01T12:00:00Z");
        let mut late = task(1, 1, "Late");
        late.due_date = Some(ts("2024-05-30T00:00:00Z"));
        assert!(is_overdue(&late, now));

        late.status = TaskStatus::Completed;
        assert!(!is_overdue(&late, now));

        assert!(!is_overdue(&task(2, 1, "Undated"), now));
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("nope"));
    }

    #[test]
    fn test_task_context_lists_priority_and_project() {
        let mut store = Store::default();
        store.dispatch(crate::models::store::Action::SetProjects(vec![
            crate::models::store::fixtures::project(1, "Work"),
        ]));
        let mut urgent = task(1, 1, "Ship");
        urgent.priority = 9;

        assert_eq!(
            get_task_context(&urgent, &store, &TimeZone::UTC),
            Some("High 9  ·  Work".to_string())
        );
        assert_eq!(
            get_task_context(&task(2, 5, "Orphan"), &store, &TimeZone::UTC),
            None
        );
    }
}
