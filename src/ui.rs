use colored::*;
use jiff::Timestamp;
use jiff::civil::Date;
use jiff::tz::TimeZone;

use crate::models::{
    chat::ChatMessage,
    employee::{Employee, EmployeeStatus},
    group::Group,
    store::Store,
    task::{Priority, Task},
};
use crate::services::{dashboard::Dashboard, reports::Report};

/// Get the terminal width, defaulting to 80 if unavailable
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(80)
}

/// Get the appropriate status glyph for a task
pub fn get_status_glyph(task: &Task, is_overdue: bool) -> ColoredString {
    if task.completed {
        "✓".dimmed()
    } else if is_overdue {
        "●".red()
    } else {
        "○".normal()
    }
}

fn priority_marker(priority: Priority) -> ColoredString {
    match priority {
        Priority::High => "!!".red(),
        Priority::Medium => "! ".yellow(),
        Priority::Low => "  ".normal(),
    }
}

pub fn is_overdue(task: &Task, today: Date) -> bool {
    !task.completed && task.due_date.is_some_and(|due| due < today)
}

/// Format a due date relative to today (e.g., "Today", "Tomorrow", "Mar 11")
pub fn format_due_date(date: Date, today: Date) -> String {
    if date == today {
        "Today".to_string()
    } else if today.tomorrow().is_ok_and(|tomorrow| tomorrow == date) {
        "Tomorrow".to_string()
    } else if date.year() == today.year() {
        date.strftime("%b %d").to_string()
    } else {
        date.strftime("%b %d, %Y").to_string()
    }
}

/// Build the context string for a task: group, assignee, due date and
/// recurrence. Returns None if there is nothing to show.
pub fn get_task_context(task: &Task, store: &Store, today: Date) -> Option<String> {
    let mut parts = vec![];
    if let Some(group) = store.get_group(task.group_id) {
        parts.push(group.name.clone());
    }
    if let Some(name) = task.assignee.and_then(|id| store.employee_name(id)) {
        parts.push(format!("@{name}"));
    }
    if let Some(due) = task.due_date {
        parts.push(format_due_date(due, today));
    }
    if let (true, Some(frequency)) = (task.is_recurring, task.recurring_frequency) {
        parts.push(format!("↻ {}", frequency.label()));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("  ·  "))
    }
}

/// Render a single task line with number, glyph, title, and right-aligned
/// context. Subtasks are indented by `depth`.
pub fn render_task_line(task: &Task, store: &Store, today: Date, depth: usize) {
    let terminal_width = get_terminal_width();

    let id_str = format!("{:>3}", task.task_number);
    let overdue = is_overdue(task, today);
    let glyph = get_status_glyph(task, overdue);
    let indent = "    ".repeat(depth);
    let fold = match (task.subtasks.is_empty(), task.is_expanded) {
        (true, _) => "",
        (false, true) => " ▾",
        (false, false) => " ▸",
    };

    let left_section = format!(
        "  {}  {}{}  {}  {}{}",
        id_str,
        indent,
        glyph,
        priority_marker(task.priority),
        task.title,
        fold
    );
    let styled_left = if task.completed {
        left_section.dimmed()
    } else {
        left_section.bold()
    };

    let Some(right_section) = get_task_context(task, store, today) else {
        println!("{styled_left}");
        return;
    };

    let left_visible_len = format!("  {id_str}  {indent}    {}{fold}", task.title)
        .chars()
        .count()
        + 2;
    let right_visible_len = right_section.chars().count();
    let total_content = left_visible_len + right_visible_len;

    if total_content + 4 < terminal_width {
        let padding = terminal_width - total_content - 2;
        let right = if overdue {
            right_section.red()
        } else {
            right_section.dimmed()
        };
        println!("{}{}{}", styled_left, " ".repeat(padding), right);
    } else {
        // Not enough space for right alignment, just print normally
        println!("{styled_left}");
    }
}

/// Render a task and, when expanded, its subtasks below it
pub fn render_task_tree(task: &Task, store: &Store, today: Date, depth: usize) {
    render_task_line(task, store, today, depth);
    if task.is_expanded {
        for subtask in &task.subtasks {
            render_task_tree(subtask, store, today, depth + 1);
        }
    }
}

/// Render a view header with title and count
pub fn render_view_header(title: &str, count: usize, noun: &str) {
    let noun = if count == 1 {
        noun.to_string()
    } else {
        format!("{noun}s")
    };
    println!("\n  {} ({} {})\n", title.cyan().bold(), count, noun);
}

/// Render a section header (e.g., "Due today", "Groups")
pub fn render_section_header(title: &str) {
    println!("\n  ─── {} ───\n", title.bold());
}

pub fn render_group_line(group: &Group, store: &Store) {
    let mut flags = vec![];
    if let Some(day) = group.default_due_day {
        flags.push(format!("due day {day}"));
    }
    if group.is_recurring {
        flags.push("recurring".to_string());
    }
    if group.is_restricted {
        flags.push("restricted".to_string());
    }
    if store
        .current_user()
        .is_some_and(|user| group.is_muted_by(user.id))
    {
        flags.push("muted".to_string());
    }

    let open = store
        .tasks
        .iter()
        .filter(|t| t.group_id == group.id && !t.completed)
        .count();
    println!(
        "  {}  {}  {}",
        group.slug.dimmed(),
        group.name.bold(),
        format!("({open} open, {} members)", group.member_ids.len()).dimmed()
    );
    if let Some(description) = &group.description {
        println!("      {description}");
    }
    if !flags.is_empty() {
        println!("      {}", flags.join(" · ").blue());
    }
}

pub fn render_employee_line(employee: &Employee, is_current: bool) {
    let marker = if is_current { "▶".green() } else { " ".normal() };
    let status = match employee.status {
        EmployeeStatus::Active => "".normal(),
        EmployeeStatus::Pending => "pending".yellow(),
    };
    println!(
        "  {} [{}] {}  {}  {}  {}",
        marker,
        employee.initials.bold(),
        employee.name,
        employee.role.dimmed(),
        employee.email.as_deref().unwrap_or("").dimmed(),
        status
    );
}

fn format_time(timestamp: Timestamp) -> String {
    timestamp
        .to_zoned(TimeZone::system())
        .strftime("%b %d %H:%M")
        .to_string()
}

pub fn render_message(message: &ChatMessage, store: &Store) {
    let sender = store.employee_name(message.sender_id).unwrap_or("Unknown");
    let is_own = store
        .current_user()
        .is_some_and(|user| user.id == message.sender_id);
    let sender = if is_own { sender.green() } else { sender.cyan() };

    println!(
        "  {}  {}  {}",
        message.short_id().dimmed(),
        sender.bold(),
        format_time(message.timestamp).dimmed()
    );
    if message.is_forwarded {
        println!("      {}", "↪ Forwarded".italic().dimmed());
    }
    if let Some(reply) = &message.reply_to {
        println!(
            "      {} {}",
            format!("│ {}:", reply.sender_name).dimmed(),
            reply.text.dimmed()
        );
    }
    if !message.text.is_empty() {
        println!("      {}", message.text);
    }
    if let Some(image) = &message.image {
        println!("      {} {}", "🖼".normal(), image.underline());
    }
}

pub fn render_report(report: &Report) {
    let title = match &report.employee {
        Some(name) => format!("Report {} · {}", report.year, name),
        None => format!("Report {}", report.year),
    };
    render_view_header(&title, report.rows.len(), "completed task");

    for row in &report.rows {
        println!(
            "  {:>3}  {}  {}",
            row.task_number,
            "✓".green(),
            row.title.bold()
        );
        println!(
            "       {}",
            format!(
                "{} · {} · due {} · done {}",
                row.group,
                row.assignee,
                row.due_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "N/A".to_string()),
                row.completed_at.strftime("%Y-%m-%d %H:%M")
            )
            .dimmed()
        );
    }
}

pub fn render_dashboard(dashboard: &Dashboard, store: &Store, today: Date) {
    println!(
        "\n  {}\n",
        format!("{}, {}", dashboard.greeting, dashboard.first_name)
            .cyan()
            .bold()
    );
    println!(
        "  {} assigned to you  ·  {} due today  ·  {} upcoming",
        dashboard.my_tasks.len().to_string().bold(),
        dashboard.due_today.len().to_string().bold(),
        dashboard.upcoming.len().to_string().bold()
    );

    if !dashboard.due_today.is_empty() {
        render_section_header("Due today");
        for task in &dashboard.due_today {
            render_task_line(task, store, today, 0);
        }
    }

    render_section_header("High priority");
    if dashboard.high_priority.is_empty() {
        println!("  No high priority tasks assigned to you.");
    }
    for task in &dashboard.high_priority {
        render_task_line(task, store, today, 0);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::Frequency;

    fn today() -> Date {
        "2025-03-05".parse().unwrap()
    }

    #[test]
    fn test_format_due_date() {
        assert_eq!(format_due_date(today(), today()), "Today");
        assert_eq!(format_due_date("2025-03-06".parse().unwrap(), today()), "Tomorrow");
        assert_eq!(format_due_date("2025-03-11".parse().unwrap(), today()), "Mar 11");
        assert_eq!(
            format_due_date("2026-01-02".parse().unwrap(), today()),
            "Jan 02, 2026"
        );
    }

    #[test]
    fn test_overdue_only_for_open_tasks() {
        let mut task = Task {
            due_date: Some("2025-03-01".parse().unwrap()),
            ..Task::default()
        };
        assert!(is_overdue(&task, today()));
        task.completed = true;
        assert!(!is_overdue(&task, today()));
    }

    #[test]
    fn test_task_context() {
        let mut store = Store::seeded(today());
        store.tasks[1].assignee = Some(store.employees[0].id);

        assert_eq!(
            get_task_context(&store.tasks[1], &store, today()).as_deref(),
            Some("Group 1  ·  @Rahul Sharma  ·  Today  ·  ↻ monthly")
        );

        let loose = Task {
            is_recurring: true,
            recurring_frequency: Some(Frequency::Weekly),
            ..Task::default()
        };
        assert_eq!(
            get_task_context(&loose, &store, today()).as_deref(),
            Some("↻ weekly")
        );
        assert_eq!(get_task_context(&Task::default(), &store, today()), None);
    }
}
