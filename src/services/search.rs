use crate::models::{group::Group, store::Store, task::Task};

pub struct SearchResults<'a> {
    /// Matching tasks at any depth, parents before their subtasks
    pub tasks: Vec<&'a Task>,
    pub groups: Vec<&'a Group>,
}

impl SearchResults<'_> {
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.groups.is_empty()
    }
}

fn matches(text: &str, description: Option<&str>, needle: &str) -> bool {
    text.to_lowercase().contains(needle)
        || description.is_some_and(|d| d.to_lowercase().contains(needle))
}

fn collect_tasks<'a>(
    store: &Store,
    tasks: &'a [Task],
    needle: &str,
    found: &mut Vec<&'a Task>,
) {
    for task in tasks.iter().filter(|t| store.is_group_visible(t.group_id)) {
        if matches(&task.title, task.description.as_deref(), needle) {
            found.push(task);
        }
        collect_tasks(store, &task.subtasks, needle, found);
    }
}

/// Case-insensitive search over task titles/descriptions and group
/// names/descriptions. A blank query finds nothing. Restricted groups and
/// their tasks are left out for viewers.
pub fn search<'a>(store: &'a Store, query: &str) -> SearchResults<'a> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return SearchResults {
            tasks: vec![],
            groups: vec![],
        };
    }

    let mut tasks = vec![];
    collect_tasks(store, &store.tasks, &needle, &mut tasks);

    let groups = store
        .get_visible_groups()
        .filter(|g| matches(&g.name, g.description.as_deref(), &needle))
        .collect();

    SearchResults { tasks, groups }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::seeded("2025-03-05".parse().unwrap())
    }

    #[test]
    fn test_search_descends_into_subtasks() {
        let store = store();
        let results = search(&store, "  GSTR ");
        assert_eq!(results.tasks.len(), 1);

        let results = search(&store, "e");
        let titles: Vec<_> = results.tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "File GSTR-1 for Client Alpha",
                "Download sales register",
                "Verify e-invoices on portal",
                "Generate JSON",
                "Pay Advance Tax Installment",
            ]
        );
    }

    #[test]
    fn test_search_matches_group_descriptions() {
        let store = store();
        let results = search(&store, "reconciliations");
        assert!(results.tasks.is_empty());
        assert_eq!(results.groups.len(), 1);
        assert_eq!(results.groups[0].name, "Group 2");
    }

    #[test]
    fn test_search_hides_restricted_groups_from_viewers() {
        let mut store = store();
        store.groups[1].is_restricted = true;
        assert_eq!(search(&store, "gstr").tasks.len(), 1);

        store.session.is_admin = false;
        assert!(search(&store, "gstr").is_empty());
        assert!(search(&store, "sales register").is_empty());
        assert!(search(&store, "reconciliations").is_empty());
        let results = search(&store, "e");
        let titles: Vec<_> = results.tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Pay Advance Tax Installment"]);
    }

    #[test]
    fn test_blank_query_finds_nothing() {
        assert!(search(&store(), "   ").is_empty());
    }
}
