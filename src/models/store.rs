use jiff::Timestamp;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use slug::slugify;
use uuid::Uuid;

use crate::models::{
    chat::{Channel, ChatGroup, ChatGroupKind, ChatMessage},
    employee::{Employee, EmployeeStatus},
    group::Group,
    session::Session,
    task::{self, Frequency, Priority, Task},
};

/// Current schema version
pub const CURRENT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
pub struct Store {
    pub version: u32,
    pub tasks: Vec<Task>,
    pub groups: Vec<Group>,
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub chat_groups: Vec<ChatGroup>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub session: Session,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            tasks: vec![],
            groups: vec![],
            employees: vec![],
            chat_groups: vec![],
            messages: vec![],
            session: Session::default(),
        }
    }
}

impl Store {
    /// Store for a fresh install: the starter team, its two compliance
    /// groups, the lunch chat and two tasks due this month.
    pub fn seeded(today: Date) -> Self {
        let employee = |name: &str, email: &str, role: &str, initials: &str, color: &str| {
            Employee {
                id: Uuid::new_v4(),
                name: name.to_string(),
                email: Some(email.to_string()),
                role: role.to_string(),
                initials: initials.to_string(),
                color: color.to_string(),
                status: EmployeeStatus::Active,
            }
        };
        let employees = vec![
            employee("Rahul Sharma", "rahul@taskflow.com", "Tax Consultant", "RS", "blue"),
            employee("Priya Patel", "priya@taskflow.com", "Senior Accountant", "PP", "emerald"),
            employee("Amit Singh", "amit@taskflow.com", "Audit Manager", "AS", "purple"),
            employee("Sneha Gupta", "sneha@taskflow.com", "Compliance Officer", "SG", "amber"),
            employee("Vikram Malhotra", "vikram@taskflow.com", "GST Specialist", "VM", "rose"),
        ];
        let [rahul, priya, amit, _, vikram] = [0, 1, 2, 3, 4].map(|i| employees[i].id);

        let group = |name: &str, icon: &str, color: &str, description: &str, members: Vec<Uuid>, day: u8| Group {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slugify(name),
            icon: icon.to_string(),
            color: color.to_string(),
            description: Some(description.to_string()),
            member_ids: members,
            default_due_day: Some(day),
            is_recurring: true,
            is_restricted: false,
            muted_by: vec![],
        };
        let income_tax = group(
            "Group 1",
            "FileText",
            "blue",
            "Income Tax Compliance & Filings",
            vec![rahul, amit],
            15,
        );
        let gst = group(
            "Group 2",
            "Percent",
            "purple",
            "GST Returns & Reconciliations",
            vec![priya, vikram],
            20,
        );

        let subtask = |title: &str, group_id: Uuid| Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            group_id,
            priority: Priority::Medium,
            ..Task::default()
        };
        let gstr = Task {
            id: Uuid::new_v4(),
            title: "File GSTR-1 for Client Alpha".to_string(),
            description: Some("Upload B2B invoices and verify e-invoices.".to_string()),
            due_date: Date::new(today.year(), today.month(), 11).ok(),
            is_recurring: true,
            recurring_frequency: Some(Frequency::Monthly),
            group_id: gst.id,
            priority: Priority::High,
            subtasks: vec![
                subtask("Download sales register", gst.id),
                subtask("Verify e-invoices on portal", gst.id),
                subtask("Generate JSON", gst.id),
            ],
            ..Task::default()
        };
        let advance_tax = Task {
            id: Uuid::new_v4(),
            title: "Pay Advance Tax Installment".to_string(),
            due_date: Some(today),
            is_recurring: true,
            recurring_frequency: Some(Frequency::Monthly),
            group_id: income_tax.id,
            priority: Priority::High,
            ..Task::default()
        };

        let lunch = ChatGroup {
            id: Uuid::new_v4(),
            name: "Office Lunch".to_string(),
            kind: ChatGroupKind::Social,
            color: "orange".to_string(),
            member_ids: employees.iter().map(|e| e.id).collect(),
            muted_by: vec![],
        };
        let welcome = ChatMessage {
            id: Uuid::new_v4(),
            sender_id: rahul,
            text: "Welcome to General Chat".to_string(),
            timestamp: Timestamp::now(),
            channel: Channel::General,
            image: None,
            reply_to: None,
            is_forwarded: false,
            read_by: vec![],
        };

        let mut store = Store {
            employees,
            groups: vec![income_tax, gst],
            chat_groups: vec![lunch],
            messages: vec![welcome],
            ..Store::default()
        };
        store.push_root_task(advance_tax);
        store.push_root_task(gstr);
        store
    }

    pub fn all_tasks(&self) -> Vec<&Task> {
        task::flatten(&self.tasks)
    }

    pub fn get_task(&self, id: Uuid) -> Option<&Task> {
        task::find_task(&self.tasks, id)
    }

    pub fn get_task_by_number(&self, task_number: u64) -> Option<&Task> {
        self.all_tasks()
            .into_iter()
            .find(|t| t.task_number == task_number)
    }

    pub fn next_task_number(&self) -> u64 {
        self.all_tasks()
            .iter()
            .map(|t| t.task_number)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Numbers `task` and its subtasks, then inserts it at the front of the
    /// root list.
    pub fn push_root_task(&mut self, mut task: Task) -> Uuid {
        self.number_tree(&mut task);
        let id = task.id;
        self.tasks.insert(0, task);
        id
    }

    /// Numbers `subtask` and appends it under every task with `parent_id`.
    pub fn push_subtask(&mut self, parent_id: Uuid, mut subtask: Task) -> usize {
        self.number_tree(&mut subtask);
        task::update_task(&mut self.tasks, parent_id, &mut |parent: &mut Task| {
            parent.subtasks.push(subtask.clone());
            parent.is_expanded = true;
        })
    }

    fn number_tree(&self, root: &mut Task) {
        let mut next = self.next_task_number();
        assign_numbers(root, &mut next);
    }

    pub fn update_task<F>(&mut self, id: Uuid, mut updater: F) -> usize
    where
        F: FnMut(&mut Task),
    {
        task::update_task(&mut self.tasks, id, &mut updater)
    }

    pub fn get_group(&self, id: Uuid) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn get_group_mut(&mut self, id: Uuid) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.id == id)
    }

    /// Groups the current session may see: restricted groups are hidden
    /// from viewers.
    pub fn get_visible_groups(&self) -> impl Iterator<Item = &Group> {
        let is_admin = self.session.is_admin;
        self.groups
            .iter()
            .filter(move |g| is_admin || !g.is_restricted)
    }

    /// Whether tasks and chat of group `id` are visible to the current
    /// session. Tasks whose group no longer exists stay visible.
    pub fn is_group_visible(&self, id: Uuid) -> bool {
        self.session.is_admin || self.get_group(id).is_none_or(|g| !g.is_restricted)
    }

    pub fn get_chat_group(&self, id: Uuid) -> Option<&ChatGroup> {
        self.chat_groups.iter().find(|g| g.id == id)
    }

    pub fn get_chat_group_mut(&mut self, id: Uuid) -> Option<&mut ChatGroup> {
        self.chat_groups.iter_mut().find(|g| g.id == id)
    }

    pub fn get_employee(&self, id: Uuid) -> Option<&Employee> {
        self.employees.iter().find(|e| e.id == id)
    }

    pub fn get_employee_mut(&mut self, id: Uuid) -> Option<&mut Employee> {
        self.employees.iter_mut().find(|e| e.id == id)
    }

    pub fn employee_name(&self, id: Uuid) -> Option<&str> {
        self.get_employee(id).map(|e| e.name.as_str())
    }

    pub fn current_user(&self) -> Option<&Employee> {
        self.session
            .current_account
            .and_then(|id| self.get_employee(id))
    }

    /// Member emails of a group, skipping members without one.
    pub fn member_emails(&self, group: &Group) -> Vec<&str> {
        self.employees
            .iter()
            .filter(|e| group.member_ids.contains(&e.id))
            .filter_map(|e| e.email.as_deref())
            .collect()
    }

    pub fn channel_name(&self, channel: Channel) -> String {
        match channel {
            Channel::General => "General Chat".to_string(),
            Channel::Group(id) => self
                .get_group(id)
                .map(|g| g.name.clone())
                .or_else(|| self.get_chat_group(id).map(|g| g.name.clone()))
                .unwrap_or_else(|| "Chat".to_string()),
        }
    }

    /// Whether `employee_id` muted `channel`. The general channel cannot be
    /// muted.
    pub fn is_channel_muted(&self, channel: Channel, employee_id: Uuid) -> bool {
        match channel {
            Channel::General => false,
            Channel::Group(id) => {
                if let Some(group) = self.get_group(id) {
                    group.is_muted_by(employee_id)
                } else if let Some(chat_group) = self.get_chat_group(id) {
                    chat_group.muted_by.contains(&employee_id)
                } else {
                    false
                }
            }
        }
    }
}

fn assign_numbers(task: &mut Task, next: &mut u64) {
    task.task_number = *next;
    *next += 1;
    for subtask in task.subtasks.iter_mut() {
        assign_numbers(subtask, next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> Date {
        "2025-03-05".parse().unwrap()
    }

    #[test]
    fn test_seeded_store_numbers_every_task() {
        let store = Store::seeded(today());
        let numbers: Vec<u64> = store.all_tasks().iter().map(|t| t.task_number).collect();
        assert_eq!(numbers, vec![2, 3, 4, 5, 1]);
        assert_eq!(store.tasks[0].title, "File GSTR-1 for Client Alpha");
        assert_eq!(store.tasks[0].due_date, Some("2025-03-11".parse::<Date>().unwrap()));
        assert_eq!(store.next_task_number(), 6);
    }

    #[test]
    fn test_seeded_store_collections() {
        let store = Store::seeded(today());
        assert_eq!(store.employees.len(), 5);
        assert_eq!(store.groups.len(), 2);
        assert_eq!(store.groups[0].slug, "group-1");
        assert_eq!(store.chat_groups[0].member_ids.len(), 5);
        assert_eq!(store.messages.len(), 1);
        assert!(store.session.is_admin);
        assert!(store.current_user().is_none());
    }

    #[test]
    fn test_push_subtask_expands_parent() {
        let mut store = Store::seeded(today());
        let parent_id = store.tasks[1].id;
        let subtask = Task {
            id: Uuid::new_v4(),
            title: "Challan".into(),
            ..Task::default()
        };

        assert_eq!(store.push_subtask(parent_id, subtask), 1);

        let parent = store.get_task(parent_id).unwrap();
        assert!(parent.is_expanded);
        assert_eq!(parent.subtasks[0].task_number, 6);
        assert_eq!(store.get_task_by_number(6).unwrap().title, "Challan");
    }

    #[test]
    fn test_visible_groups_hide_restricted_from_viewers() {
        let mut store = Store::seeded(today());
        store.groups[0].is_restricted = true;
        assert_eq!(store.get_visible_groups().count(), 2);
        store.session.is_admin = false;
        let visible: Vec<_> = store.get_visible_groups().map(|g| g.name.as_str()).collect();
        assert_eq!(visible, vec!["Group 2"]);
    }

    #[test]
    fn test_group_visibility_for_viewers() {
        let mut store = Store::seeded(today());
        store.groups[1].is_restricted = true;
        let (income_tax, gst) = (store.groups[0].id, store.groups[1].id);
        assert!(store.is_group_visible(gst));

        store.session.is_admin = false;
        assert!(!store.is_group_visible(gst));
        assert!(store.is_group_visible(income_tax));
        assert!(store.is_group_visible(Uuid::new_v4()));
    }

    #[test]
    fn test_general_channel_never_muted() {
        let mut store = Store::seeded(today());
        let member = store.employees[0].id;
        store.groups[0].muted_by.push(member);
        assert!(!store.is_channel_muted(Channel::General, member));
        assert!(store.is_channel_muted(Channel::Group(store.groups[0].id), member));
        assert!(!store.is_channel_muted(Channel::Group(store.groups[1].id), member));
    }
}
