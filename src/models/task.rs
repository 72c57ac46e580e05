use jiff::civil::Date;
use jiff::{Timestamp, ToSpan};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct Task {
    /// UUID to identify the task
    pub id: Uuid,
    /// User-facing auto-incremental task number, subtasks included
    pub task_number: u64,
    /// Title of the task
    pub title: String,
    /// Longer description of the task
    pub description: Option<String>,
    /// When the task is due
    pub due_date: Option<Date>,
    /// When the task was completed
    pub completed_at: Option<Timestamp>,
    /// Whether completing the task schedules the next period
    pub is_recurring: bool,
    /// How far the next period is from this one
    pub recurring_frequency: Option<Frequency>,
    /// The work group owning this task
    pub group_id: Uuid,
    pub completed: bool,
    /// Employee the task is allotted to
    pub assignee: Option<Uuid>,
    pub priority: Priority,
    /// Sub tasks, same shape as the parent
    #[serde(default)]
    pub subtasks: Vec<Task>,
    /// Whether the subtasks are shown when listing
    #[serde(default)]
    pub is_expanded: bool,
}

#[derive(
    Serialize, Deserialize, Default, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
}

impl Frequency {
    /// Due date of the period following `date`. Month steps clamp to the
    /// last day of the target month (Jan 31 -> Feb 28).
    pub fn advance(self, date: Date) -> Date {
        match self {
            Frequency::Weekly => date.saturating_add(7.days()),
            Frequency::Monthly => date.saturating_add(1.month()),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

impl Task {
    pub fn is_open(&self) -> bool {
        !self.completed
    }

    /// Copy of this task for the next recurrence period: fresh ids, nothing
    /// completed. Task numbers are left at 0 for the store to assign.
    pub fn next_occurrence(&self, today: Date) -> Task {
        let base = self.due_date.unwrap_or(today);
        let due_date = match self.recurring_frequency {
            Some(frequency) => Some(frequency.advance(base)),
            None => self.due_date,
        };

        Task {
            id: Uuid::new_v4(),
            task_number: 0,
            completed: false,
            completed_at: None,
            due_date,
            subtasks: self
                .subtasks
                .iter()
                .map(|subtask| Task {
                    id: Uuid::new_v4(),
                    task_number: 0,
                    completed: false,
                    completed_at: None,
                    ..subtask.clone()
                })
                .collect(),
            ..self.clone()
        }
    }
}

/// Applies `updater` to every task whose id is `id`, at any depth.
///
/// The walk does not stop at the first match: a duplicated id is updated at
/// every position. A matched task's own subtasks are not descended into.
/// Returns the number of tasks updated.
pub fn update_task<F>(tasks: &mut [Task], id: Uuid, updater: &mut F) -> usize
where
    F: FnMut(&mut Task),
{
    let mut updated = 0;
    for task in tasks.iter_mut() {
        if task.id == id {
            updater(task);
            updated += 1;
        } else if !task.subtasks.is_empty() {
            updated += update_task(&mut task.subtasks, id, updater);
        }
    }
    updated
}

/// Depth-first search returning the first task with `id`.
pub fn find_task(tasks: &[Task], id: Uuid) -> Option<&Task> {
    for task in tasks {
        if task.id == id {
            return Some(task);
        }
        if let Some(found) = find_task(&task.subtasks, id) {
            return Some(found);
        }
    }
    None
}

/// Every task in the tree, parents before their subtasks.
pub fn flatten(tasks: &[Task]) -> Vec<&Task> {
    let mut out = Vec::new();
    collect(tasks, &mut out);
    out
}

fn collect<'a>(tasks: &'a [Task], out: &mut Vec<&'a Task>) {
    for task in tasks {
        out.push(task);
        collect(&task.subtasks, out);
    }
}

/// Removes `id` from the root list and from the direct subtasks of each
/// root. Deeper descendants are not visited.
pub fn remove_task(tasks: &mut Vec<Task>, id: Uuid) -> usize {
    let before = count(tasks);
    tasks.retain(|t| t.id != id);
    for task in tasks.iter_mut() {
        task.subtasks.retain(|st| st.id != id);
    }
    before - count(tasks)
}

fn count(tasks: &[Task]) -> usize {
    flatten(tasks).len()
}

/// Moves the root tasks named in `order` to the top, in that order. Ids not
/// present at the root are ignored; the rest keep their relative order.
pub fn reorder_roots(tasks: &mut Vec<Task>, order: &[Uuid]) {
    let mut moved = Vec::with_capacity(order.len());
    for id in order {
        if let Some(pos) = tasks.iter().position(|t| t.id == *id) {
            moved.push(tasks.remove(pos));
        }
    }
    moved.append(tasks);
    *tasks = moved;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            ..Task::default()
        }
    }

    #[test]
    fn test_update_reaches_nested_subtask() {
        let mut parent = task("parent");
        let child = task("child");
        let child_id = child.id;
        parent.subtasks.push(child);
        let mut tasks = vec![task("other"), parent];

        let updated = update_task(&mut tasks, child_id, &mut |t: &mut Task| t.completed = true);

        assert_eq!(updated, 1);
        assert!(tasks[1].subtasks[0].completed);
        assert!(!tasks[0].completed);
        assert!(!tasks[1].completed);
    }

    #[test]
    fn test_update_hits_every_duplicate_but_find_returns_first() {
        let first = task("first");
        let dup_id = first.id;
        let mut parent = task("parent");
        parent.subtasks.push(Task {
            id: dup_id,
            title: "second".into(),
            ..Task::default()
        });
        let mut tasks = vec![first, parent];

        let updated = update_task(&mut tasks, dup_id, &mut |t: &mut Task| t.priority = Priority::High);

        assert_eq!(updated, 2);
        assert_eq!(tasks[0].priority, Priority::High);
        assert_eq!(tasks[1].subtasks[0].priority, Priority::High);
        assert_eq!(find_task(&tasks, dup_id).unwrap().title, "first");
    }

    #[test]
    fn test_update_missing_id_changes_nothing() {
        let mut tasks = vec![task("a")];
        assert_eq!(update_task(&mut tasks, Uuid::new_v4(), &mut |t: &mut Task| t.completed = true), 0);
        assert!(!tasks[0].completed);
    }

    #[test]
    fn test_flatten_is_depth_first() {
        let mut a = task("a");
        let mut a1 = task("a1");
        a1.subtasks.push(task("a1x"));
        a.subtasks.push(a1);
        let tasks = vec![a, task("b")];

        let titles: Vec<_> = flatten(&tasks).iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "a1", "a1x", "b"]);
    }

    #[test]
    fn test_remove_root_and_direct_subtask() {
        let mut parent = task("parent");
        let child = task("child");
        let child_id = child.id;
        parent.subtasks.push(child);
        let root = task("root");
        let root_id = root.id;
        let mut tasks = vec![root, parent];

        assert_eq!(remove_task(&mut tasks, child_id), 1);
        assert!(tasks[1].subtasks.is_empty());

        assert_eq!(remove_task(&mut tasks, root_id), 1);
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn test_remove_root_drops_its_subtree() {
        let mut parent = task("parent");
        parent.subtasks.push(task("child"));
        let parent_id = parent.id;
        let mut tasks = vec![parent];

        assert_eq!(remove_task(&mut tasks, parent_id), 2);
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_reorder_keeps_rest_in_place() {
        let tasks: Vec<Task> = ["a", "b", "c", "d"].iter().map(|t| task(t)).collect();
        let order = vec![tasks[2].id, tasks[0].id, Uuid::new_v4()];
        let mut tasks = tasks;

        reorder_roots(&mut tasks, &order);

        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_monthly_advance_clamps_to_month_end() {
        let date: Date = "2025-01-31".parse().unwrap();
        assert_eq!(
            Frequency::Monthly.advance(date),
            "2025-02-28".parse::<Date>().unwrap()
        );
        assert_eq!(
            Frequency::Weekly.advance(date),
            "2025-02-07".parse::<Date>().unwrap()
        );
    }

    #[test]
    fn test_next_occurrence_refreshes_subtasks() {
        let mut parent = Task {
            is_recurring: true,
            recurring_frequency: Some(Frequency::Monthly),
            due_date: Some("2025-03-11".parse().unwrap()),
            completed: true,
            completed_at: Some(Timestamp::now()),
            ..task("File GSTR-1")
        };
        parent.subtasks.push(Task {
            completed: true,
            completed_at: Some(Timestamp::now()),
            ..task("Generate JSON")
        });

        let today: Date = "2025-03-20".parse().unwrap();
        let next = parent.next_occurrence(today);

        assert_ne!(next.id, parent.id);
        assert!(!next.completed);
        assert!(next.completed_at.is_none());
        assert_eq!(next.due_date, Some("2025-04-11".parse::<Date>().unwrap()));
        assert_ne!(next.subtasks[0].id, parent.subtasks[0].id);
        assert!(!next.subtasks[0].completed);
        assert!(next.subtasks[0].completed_at.is_none());
        assert_eq!(next.title, "File GSTR-1");
    }

    #[test]
    fn test_next_occurrence_without_due_date_starts_from_today() {
        let parent = Task {
            is_recurring: true,
            recurring_frequency: Some(Frequency::Weekly),
            ..task("Weekly sync")
        };
        let today: Date = "2025-03-20".parse().unwrap();
        assert_eq!(
            parent.next_occurrence(today).due_date,
            Some("2025-03-27".parse::<Date>().unwrap())
        );
    }
}
