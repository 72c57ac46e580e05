use std::cmp::Ordering;

use jiff::civil::Date;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    models::{
        store::Store,
        task::{self, Frequency, Priority, Task},
    },
    notify::Notice,
    services::lookup::{self, LookupError},
    storage::{Storage, StorageError},
};

#[derive(Debug, Error)]
pub enum AddTaskError {
    #[error("Task title cannot be empty")]
    EmptyTitle,

    #[error("There are no groups to add the task to. Create one with `taskflow group new`")]
    NoGroups,

    #[error("Invalid due date '{0}': {1}")]
    InvalidDueDate(String, String),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Default)]
pub struct AddTaskParameters {
    pub title: String,
    pub description: Option<String>,
    /// Group slug or name; the first visible group when absent
    pub group: Option<String>,
    pub due_date: Option<String>,
    pub priority: Priority,
    pub frequency: Option<Frequency>,
    /// Employee name or email
    pub assignee: Option<String>,
}

pub struct TaskOutcome {
    pub task: Task,
    pub notices: Vec<Notice>,
}

pub fn add_task(
    store: &mut Store,
    storage: &impl Storage,
    parameters: AddTaskParameters,
    today: Date,
) -> Result<TaskOutcome, AddTaskError> {
    let title = parameters.title.trim().to_string();
    if title.is_empty() {
        return Err(AddTaskError::EmptyTitle);
    }

    let group_id = match parameters.group {
        Some(group) => lookup::resolve_group(store, &group)?,
        None => store
            .get_visible_groups()
            .next()
            .map(|g| g.id)
            .ok_or(AddTaskError::NoGroups)?,
    };

    let assignee = parameters
        .assignee
        .map(|assignee| lookup::resolve_employee(store, &assignee))
        .transpose()?;

    let due_date = match parameters.due_date {
        Some(due) => Some(
            due.parse::<Date>()
                .map_err(|e| AddTaskError::InvalidDueDate(due.clone(), e.to_string()))?,
        ),
        None => store.get_group(group_id).and_then(|g| g.auto_due_date(today)),
    };

    let task = Task {
        id: Uuid::new_v4(),
        title,
        description: parameters.description,
        due_date,
        is_recurring: parameters.frequency.is_some(),
        recurring_frequency: parameters.frequency,
        group_id,
        assignee,
        priority: parameters.priority,
        ..Task::default()
    };

    let task_id = store.push_root_task(task);
    storage.save(store)?;

    let task = store
        .get_task(task_id)
        .cloned()
        .ok_or_else(|| LookupError::TaskNotFound(task_id.to_string()))?;
    let notices = if task.assignee.is_some() {
        allotment_notices(store, &task)
    } else {
        vec![]
    };
    log::info!("added task #{} '{}'", task.task_number, task.title);

    Ok(TaskOutcome { task, notices })
}

/// Notices for a task allotted to someone: the allotment itself and the
/// mailbox sync of the group's members.
fn allotment_notices(store: &Store, task: &Task) -> Vec<Notice> {
    let Some(group) = store.get_group(task.group_id) else {
        return vec![];
    };
    let mailboxes = store.member_emails(group).len();
    vec![
        Notice::success(format!("Task Allotted: \"{}\"", task.title)),
        Notice::email(format!("Syncing to {mailboxes} member mailboxes.")),
    ]
}

#[derive(Debug, Error)]
pub enum TaskMutationError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Subtask title cannot be empty")]
    EmptySubtaskTitle,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

fn snapshot(store: &Store, id: Uuid) -> Result<Task, TaskMutationError> {
    store
        .get_task(id)
        .cloned()
        .ok_or_else(|| LookupError::TaskNotFound(id.to_string()).into())
}

pub struct ToggleCompleteOutcome {
    pub task: Task,
    /// Next-period copy scheduled by completing a recurring task
    pub next: Option<Task>,
    pub notices: Vec<Notice>,
}

/// Flips completion of a task. Completing a recurring task schedules a copy
/// for the next period at the top of the list.
pub fn toggle_complete(
    store: &mut Store,
    storage: &impl Storage,
    task_query: &str,
    today: Date,
) -> Result<ToggleCompleteOutcome, TaskMutationError> {
    let id = lookup::resolve_task(store, task_query)?;
    let current = snapshot(store, id)?;
    let completing = !current.completed;
    let mut notices = vec![];

    let mut next = None;
    if completing && current.is_recurring && current.recurring_frequency.is_some() {
        let next_id = store.push_root_task(current.next_occurrence(today));
        next = store.get_task(next_id).cloned();
        notices.push(Notice::info(format!(
            "Recurring task \"{}\" scheduled for next period.",
            current.title
        )));
    }

    let completed_at = completing.then(jiff::Timestamp::now);
    store.update_task(id, |t| {
        t.completed = completing;
        t.completed_at = completed_at;
    });
    storage.save(store)?;

    log::info!(
        "task #{} marked {}",
        current.task_number,
        if completing { "complete" } else { "open" }
    );
    Ok(ToggleCompleteOutcome {
        task: snapshot(store, id)?,
        next,
        notices,
    })
}

pub fn assign_task(
    store: &mut Store,
    storage: &impl Storage,
    task_query: &str,
    assignee_query: Option<&str>,
) -> Result<TaskOutcome, TaskMutationError> {
    let id = lookup::resolve_task(store, task_query)?;
    let assignee = assignee_query
        .map(|query| lookup::resolve_employee(store, query))
        .transpose()?;

    store.update_task(id, |t| t.assignee = assignee);
    storage.save(store)?;

    let task = snapshot(store, id)?;
    let notices = if assignee.is_some() {
        allotment_notices(store, &task)
    } else {
        vec![]
    };
    Ok(TaskOutcome { task, notices })
}

pub struct DeleteTaskOutcome {
    pub title: String,
    /// Tasks removed, subtasks of a deleted root included
    pub removed: usize,
}

pub fn delete_task(
    store: &mut Store,
    storage: &impl Storage,
    task_query: &str,
) -> Result<DeleteTaskOutcome, TaskMutationError> {
    let id = lookup::resolve_task(store, task_query)?;
    let title = snapshot(store, id)?.title;

    let removed = task::remove_task(&mut store.tasks, id);
    storage.save(store)?;

    Ok(DeleteTaskOutcome { title, removed })
}

/// Appends a subtask in the parent's group and expands the parent.
pub fn add_subtask(
    store: &mut Store,
    storage: &impl Storage,
    parent_query: &str,
    title: &str,
) -> Result<Task, TaskMutationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(TaskMutationError::EmptySubtaskTitle);
    }
    let parent_id = lookup::resolve_task(store, parent_query)?;
    let parent = snapshot(store, parent_id)?;

    let subtask = Task {
        id: Uuid::new_v4(),
        title: title.to_string(),
        group_id: parent.group_id,
        priority: Priority::Medium,
        ..Task::default()
    };
    let subtask_id = subtask.id;

    store.push_subtask(parent_id, subtask);
    storage.save(store)?;

    snapshot(store, subtask_id)
}

pub fn toggle_recurring(
    store: &mut Store,
    storage: &impl Storage,
    task_query: &str,
) -> Result<TaskOutcome, TaskMutationError> {
    let id = lookup::resolve_task(store, task_query)?;

    store.update_task(id, |t| {
        t.is_recurring = !t.is_recurring;
        t.recurring_frequency = t.is_recurring.then_some(Frequency::Monthly);
    });
    storage.save(store)?;

    Ok(TaskOutcome {
        task: snapshot(store, id)?,
        notices: vec![Notice::info("Updated recurring preference")],
    })
}

pub fn toggle_expand(
    store: &mut Store,
    storage: &impl Storage,
    task_query: &str,
) -> Result<Task, TaskMutationError> {
    let id = lookup::resolve_task(store, task_query)?;

    store.update_task(id, |t| t.is_expanded = !t.is_expanded);
    storage.save(store)?;

    snapshot(store, id)
}

/// Moves the named root tasks to the top in the given order.
pub fn reorder_tasks(
    store: &mut Store,
    storage: &impl Storage,
    task_queries: &[String],
) -> Result<(), TaskMutationError> {
    let order = task_queries
        .iter()
        .map(|query| lookup::resolve_task(store, query))
        .collect::<Result<Vec<_>, _>>()?;

    task::reorder_roots(&mut store.tasks, &order);
    storage.save(store)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StatusFilter {
    #[default]
    All,
    Todo,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortOption {
    Priority,
    DueDate,
    Alphabetical,
    #[default]
    Manual,
}

#[derive(Default)]
pub struct TaskFilter {
    pub group: Option<Uuid>,
    pub assignee: Option<Uuid>,
    pub status: StatusFilter,
    pub sort: SortOption,
}

/// Root tasks matching `filter`. Tasks of restricted groups are hidden from
/// viewers.
pub fn list_tasks<'a>(store: &'a Store, filter: &TaskFilter) -> Vec<&'a Task> {
    let mut tasks: Vec<&Task> = store
        .tasks
        .iter()
        .filter(|t| store.is_group_visible(t.group_id))
        .filter(|t| filter.group.is_none_or(|group| t.group_id == group))
        .filter(|t| filter.assignee.is_none_or(|assignee| t.assignee == Some(assignee)))
        .filter(|t| match filter.status {
            StatusFilter::All => true,
            StatusFilter::Todo => !t.completed,
            StatusFilter::Completed => t.completed,
        })
        .collect();

    match filter.sort {
        SortOption::Manual => {}
        SortOption::Priority => tasks.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.title.cmp(&b.title))
        }),
        SortOption::DueDate => tasks.sort_by(|a, b| compare_due(a.due_date, b.due_date)),
        SortOption::Alphabetical => tasks.sort_by(|a, b| a.title.cmp(&b.title)),
    }
    tasks
}

/// Dated tasks first, earliest first.
fn compare_due(a: Option<Date>, b: Option<Date>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Open tasks at any depth that carry a due date, earliest first. Tasks of
/// restricted groups are hidden from viewers.
pub fn deadlines(store: &Store) -> Vec<&Task> {
    let mut tasks: Vec<&Task> = store
        .all_tasks()
        .into_iter()
        .filter(|t| t.is_open() && t.due_date.is_some())
        .filter(|t| store.is_group_visible(t.group_id))
        .collect();
    tasks.sort_by(|a, b| compare_due(a.due_date, b.due_date));
    tasks
}
