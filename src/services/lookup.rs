//! Resolution of user input (numbers, slugs, fuzzy names) to entity ids.

use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    chat::{Channel, GENERAL_CHANNEL},
    store::Store,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("Task '{0}' not found")]
    TaskNotFound(String),

    #[error("Task name is ambiguous. Multiple tasks found: {}", .0.join(", "))]
    AmbiguousTaskName(Vec<String>),

    #[error("Group '{0}' not found")]
    GroupNotFound(String),

    #[error("Group name is ambiguous. Multiple groups found: {}", .0.join(", "))]
    AmbiguousGroupName(Vec<String>),

    #[error("Employee '{0}' not found")]
    EmployeeNotFound(String),

    #[error("Employee name is ambiguous. Multiple employees found: {}", .0.join(", "))]
    AmbiguousEmployeeName(Vec<String>),

    #[error("Channel '{0}' not found")]
    ChannelNotFound(String),

    #[error("Channel name is ambiguous. Multiple channels found: {}", .0.join(", "))]
    AmbiguousChannelName(Vec<String>),

    #[error("Message '{0}' not found")]
    MessageNotFound(String),
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// A task number, or a unique case-insensitive fragment of an open task's
/// title. Tasks of groups hidden from the session are not found.
pub fn resolve_task(store: &Store, query: &str) -> Result<Uuid, LookupError> {
    if let Ok(task_number) = query.trim_start_matches('#').parse::<u64>() {
        return store
            .get_task_by_number(task_number)
            .filter(|t| store.is_group_visible(t.group_id))
            .map(|t| t.id)
            .ok_or_else(|| LookupError::TaskNotFound(query.to_string()));
    }

    let matching: Vec<_> = store
        .all_tasks()
        .into_iter()
        .filter(|t| t.is_open() && store.is_group_visible(t.group_id))
        .filter(|t| contains_ignore_case(&t.title, query))
        .collect();

    match matching.as_slice() {
        [] => Err(LookupError::TaskNotFound(query.to_string())),
        [task] => Ok(task.id),
        _ => Err(LookupError::AmbiguousTaskName(
            matching.iter().map(|t| t.title.clone()).collect(),
        )),
    }
}

/// An exact slug, or a unique fragment of a visible group's name.
pub fn resolve_group(store: &Store, query: &str) -> Result<Uuid, LookupError> {
    if let Some(group) = store.get_visible_groups().find(|g| g.slug == query) {
        return Ok(group.id);
    }

    let matching: Vec<_> = store
        .get_visible_groups()
        .filter(|g| contains_ignore_case(&g.name, query))
        .collect();

    match matching.as_slice() {
        [] => Err(LookupError::GroupNotFound(query.to_string())),
        [group] => Ok(group.id),
        _ => Err(LookupError::AmbiguousGroupName(
            matching.iter().map(|g| g.name.clone()).collect(),
        )),
    }
}

/// An exact email, or a unique fragment of an employee name.
pub fn resolve_employee(store: &Store, query: &str) -> Result<Uuid, LookupError> {
    if let Some(employee) = store.employees.iter().find(|e| e.has_email(query)) {
        return Ok(employee.id);
    }

    let matching: Vec<_> = store
        .employees
        .iter()
        .filter(|e| contains_ignore_case(&e.name, query))
        .collect();

    match matching.as_slice() {
        [] => Err(LookupError::EmployeeNotFound(query.to_string())),
        [employee] => Ok(employee.id),
        _ => Err(LookupError::AmbiguousEmployeeName(
            matching.iter().map(|e| e.name.clone()).collect(),
        )),
    }
}

/// `general`, a visible work group (slug or name) or a chat group name.
pub fn resolve_channel(store: &Store, query: &str) -> Result<Channel, LookupError> {
    if query.eq_ignore_ascii_case(GENERAL_CHANNEL) {
        return Ok(Channel::General);
    }
    if let Some(group) = store.get_visible_groups().find(|g| g.slug == query) {
        return Ok(Channel::Group(group.id));
    }

    let mut matching: Vec<(Uuid, &str)> = store
        .get_visible_groups()
        .filter(|g| contains_ignore_case(&g.name, query))
        .map(|g| (g.id, g.name.as_str()))
        .collect();
    matching.extend(
        store
            .chat_groups
            .iter()
            .filter(|g| contains_ignore_case(&g.name, query))
            .map(|g| (g.id, g.name.as_str())),
    );

    match matching.as_slice() {
        [] => Err(LookupError::ChannelNotFound(query.to_string())),
        [(id, _)] => Ok(Channel::Group(*id)),
        _ => Err(LookupError::AmbiguousChannelName(
            matching.iter().map(|(_, name)| name.to_string()).collect(),
        )),
    }
}

/// A message by the leading characters of its id.
pub fn resolve_message(store: &Store, query: &str) -> Result<Uuid, LookupError> {
    let prefix = query.trim_start_matches('#').to_lowercase();
    let mut matching = store
        .messages
        .iter()
        .filter(|m| !prefix.is_empty() && m.id.simple().to_string().starts_with(&prefix));

    match (matching.next(), matching.next()) {
        (Some(message), None) => Ok(message.id),
        _ => Err(LookupError::MessageNotFound(query.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::seeded("2025-03-05".parse().unwrap())
    }

    #[test]
    fn test_resolve_task_by_number_and_title() {
        let store = store();
        let gstr = store.tasks[0].id;
        assert_eq!(resolve_task(&store, "2"), Ok(gstr));
        assert_eq!(resolve_task(&store, "#2"), Ok(gstr));
        assert_eq!(resolve_task(&store, "gstr-1"), Ok(gstr));
        assert_eq!(
            resolve_task(&store, "99"),
            Err(LookupError::TaskNotFound("99".into()))
        );
    }

    #[test]
    fn test_resolve_task_ambiguous() {
        let store = store();
        assert!(matches!(
            resolve_task(&store, "e"),
            Err(LookupError::AmbiguousTaskName(_))
        ));
    }

    #[test]
    fn test_resolve_group_by_slug_or_name() {
        let store = store();
        assert_eq!(resolve_group(&store, "group-2"), Ok(store.groups[1].id));
        assert_eq!(resolve_group(&store, "Group 1"), Ok(store.groups[0].id));
        assert!(matches!(
            resolve_group(&store, "group"),
            Err(LookupError::AmbiguousGroupName(_))
        ));
    }

    #[test]
    fn test_resolve_employee_by_email_or_name() {
        let store = store();
        assert_eq!(
            resolve_employee(&store, "PRIYA@taskflow.com"),
            Ok(store.employees[1].id)
        );
        assert_eq!(resolve_employee(&store, "vikram"), Ok(store.employees[4].id));
        assert_eq!(
            resolve_employee(&store, "nobody"),
            Err(LookupError::EmployeeNotFound("nobody".into()))
        );
    }

    #[test]
    fn test_resolve_channel() {
        let store = store();
        assert_eq!(resolve_channel(&store, "general"), Ok(Channel::General));
        assert_eq!(
            resolve_channel(&store, "lunch"),
            Ok(Channel::Group(store.chat_groups[0].id))
        );
        assert_eq!(
            resolve_channel(&store, "group-1"),
            Ok(Channel::Group(store.groups[0].id))
        );
    }

    #[test]
    fn test_restricted_groups_do_not_resolve_for_viewers() {
        let mut store = store();
        store.groups[1].is_restricted = true;
        assert_eq!(resolve_group(&store, "group-2"), Ok(store.groups[1].id));

        store.session.is_admin = false;
        assert_eq!(
            resolve_group(&store, "group-2"),
            Err(LookupError::GroupNotFound("group-2".into()))
        );
        assert_eq!(resolve_group(&store, "group"), Ok(store.groups[0].id));
        assert_eq!(
            resolve_channel(&store, "group-2"),
            Err(LookupError::ChannelNotFound("group-2".into()))
        );
        assert_eq!(
            resolve_task(&store, "2"),
            Err(LookupError::TaskNotFound("2".into()))
        );
        assert_eq!(
            resolve_task(&store, "gstr"),
            Err(LookupError::TaskNotFound("gstr".into()))
        );
        assert_eq!(resolve_task(&store, "1"), Ok(store.tasks[1].id));
    }

    #[test]
    fn test_resolve_message_by_prefix() {
        let store = store();
        let message = &store.messages[0];
        assert_eq!(resolve_message(&store, &message.short_id()), Ok(message.id));
        assert!(resolve_message(&store, "").is_err());
    }
}
