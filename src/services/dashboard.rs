use jiff::civil::Date;

use crate::models::{
    store::Store,
    task::{Priority, Task},
};

pub struct Dashboard<'a> {
    pub greeting: &'static str,
    pub first_name: String,
    /// Open root tasks assigned to the current user
    pub my_tasks: Vec<&'a Task>,
    pub due_today: Vec<&'a Task>,
    pub upcoming: Vec<&'a Task>,
    /// At most three high priority tasks from `my_tasks`
    pub high_priority: Vec<&'a Task>,
}

pub fn greeting(hour: i8) -> &'static str {
    match hour {
        ..12 => "Good morning",
        12..18 => "Good afternoon",
        _ => "Good evening",
    }
}

/// Personal overview for the current user at local `hour` on `today`.
pub fn dashboard(store: &Store, today: Date, hour: i8) -> Dashboard<'_> {
    let user = store.current_user();
    let first_name = user
        .map(|e| e.first_name().to_string())
        .unwrap_or_else(|| "Team".to_string());

    let my_tasks: Vec<&Task> = match user {
        Some(user) => store
            .tasks
            .iter()
            .filter(|t| !t.completed && t.assignee == Some(user.id))
            .collect(),
        None => vec![],
    };
    let due_today = my_tasks
        .iter()
        .copied()
        .filter(|t| t.due_date == Some(today))
        .collect();
    let upcoming = my_tasks
        .iter()
        .copied()
        .filter(|t| t.due_date.is_some_and(|due| due > today))
        .collect();
    let high_priority = my_tasks
        .iter()
        .copied()
        .filter(|t| t.priority == Priority::High)
        .take(3)
        .collect();

    Dashboard {
        greeting: greeting(hour),
        first_name,
        my_tasks,
        due_today,
        upcoming,
        high_priority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_by_hour() {
        assert_eq!(greeting(0), "Good morning");
        assert_eq!(greeting(11), "Good morning");
        assert_eq!(greeting(12), "Good afternoon");
        assert_eq!(greeting(17), "Good afternoon");
        assert_eq!(greeting(18), "Good evening");
    }

    #[test]
    fn test_dashboard_for_current_user() {
        let today: Date = "2025-03-05".parse().unwrap();
        let mut store = Store::seeded(today);
        let rahul = store.employees[0].id;
        store.session.current_account = Some(rahul);
        store.tasks[0].assignee = Some(rahul);
        store.tasks[1].assignee = Some(rahul);

        let dashboard = dashboard(&store, today, 9);
        assert_eq!(dashboard.greeting, "Good morning");
        assert_eq!(dashboard.first_name, "Rahul");
        assert_eq!(dashboard.my_tasks.len(), 2);
        assert_eq!(dashboard.due_today[0].title, "Pay Advance Tax Installment");
        assert_eq!(dashboard.upcoming[0].title, "File GSTR-1 for Client Alpha");
        assert_eq!(dashboard.high_priority.len(), 2);
    }

    #[test]
    fn test_dashboard_without_user() {
        let today: Date = "2025-03-05".parse().unwrap();
        let store = Store::seeded(today);
        let dashboard = dashboard(&store, today, 20);
        assert_eq!(dashboard.first_name, "Team");
        assert!(dashboard.my_tasks.is_empty());
    }
}
