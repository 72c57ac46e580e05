//! Task suggestions from a generative model.
//!
//! Generation failures never fail the command: they are logged and the
//! plan comes back empty.

use jiff::civil::Date;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    ai::TextGenerator,
    models::{
        store::Store,
        task::{Frequency, Priority, Task},
    },
    services::lookup::{self, LookupError},
    storage::{Storage, StorageError},
};

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlannedTask {
    title: Option<String>,
    description: Option<String>,
    priority: Option<Priority>,
}

fn monthly_plan_prompt(name: &str, description: &str) -> String {
    format!(
        "Generate 5 key monthly tasks for a team group named \"{name}\".\n\
         Context: {description}.\n\
         The tasks should be actionable, specific, and suitable for a professional environment.\n\
         Set them as recurring monthly by default."
    )
}

fn monthly_plan_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING" },
                "description": { "type": "STRING" },
                "isRecurring": { "type": "BOOLEAN" },
                "recurringFrequency": { "type": "STRING", "enum": ["monthly"] },
                "priority": { "type": "STRING", "enum": ["low", "medium", "high"] }
            },
            "required": ["title", "isRecurring", "priority"]
        }
    })
}

fn subtasks_prompt(title: &str) -> String {
    format!(
        "Break down the task \"{title}\" into 3-5 smaller, actionable sub-steps. \
         Return only the steps as a JSON array of strings."
    )
}

fn subtasks_schema() -> Value {
    json!({ "type": "ARRAY", "items": { "type": "STRING" } })
}

/// Array items of a generated document, or nothing when generation failed
/// or the document is not an array.
fn generated_items(generator: &impl TextGenerator, prompt: &str, schema: &Value) -> Vec<Value> {
    match generator.generate_json(prompt, schema) {
        Ok(Value::Array(items)) => items,
        Ok(other) => {
            log::warn!("generated document is not an array: {other}");
            vec![]
        }
        Err(e) => {
            log::warn!("generation failed: {e}");
            vec![]
        }
    }
}

/// Asks for five monthly tasks for a group and adds them at the top of the
/// list, due on the group's default day (or today).
pub fn generate_monthly_plan(
    store: &mut Store,
    storage: &impl Storage,
    generator: &impl TextGenerator,
    group_query: &str,
    today: Date,
) -> Result<Vec<Task>, PlannerError> {
    let group_id = lookup::resolve_group(store, group_query)?;
    let group = store
        .get_group(group_id)
        .cloned()
        .ok_or_else(|| LookupError::GroupNotFound(group_query.to_string()))?;

    let prompt = monthly_plan_prompt(
        &group.name,
        group.description.as_deref().unwrap_or("compliance work"),
    );
    let planned: Vec<PlannedTask> = generated_items(generator, &prompt, &monthly_plan_schema())
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(task) => Some(task),
            Err(e) => {
                log::warn!("skipping malformed planned task: {e}");
                None
            }
        })
        .collect();
    if planned.is_empty() {
        return Ok(vec![]);
    }

    let due_date = group.auto_due_date(today).unwrap_or(today);
    let mut added = vec![];
    for planned in planned {
        let task = Task {
            id: Uuid::new_v4(),
            title: planned.title.unwrap_or_else(|| "New Task".to_string()),
            description: planned.description,
            due_date: Some(due_date),
            is_recurring: group.is_recurring,
            recurring_frequency: Some(Frequency::Monthly),
            group_id,
            priority: planned.priority.unwrap_or_default(),
            ..Task::default()
        };
        store.push_root_task(task.clone());
        added.push(task.id);
    }
    storage.save(store)?;

    log::info!("added {} planned tasks to {}", added.len(), group.name);
    Ok(added
        .into_iter()
        .filter_map(|id| store.get_task(id).cloned())
        .collect())
}

/// Breaks a task down into generated subtasks. A task that already has
/// subtasks is only expanded.
pub fn suggest_subtasks(
    store: &mut Store,
    storage: &impl Storage,
    generator: &impl TextGenerator,
    task_query: &str,
) -> Result<Vec<Task>, PlannerError> {
    let id = lookup::resolve_task(store, task_query)?;
    let task = store
        .get_task(id)
        .cloned()
        .ok_or_else(|| LookupError::TaskNotFound(task_query.to_string()))?;

    if !task.subtasks.is_empty() {
        store.update_task(id, |t| t.is_expanded = true);
        storage.save(store)?;
        return Ok(vec![]);
    }

    let steps: Vec<String> = generated_items(generator, &subtasks_prompt(&task.title), &subtasks_schema())
        .into_iter()
        .filter_map(|item| item.as_str().map(str::trim).map(str::to_string))
        .filter(|step| !step.is_empty())
        .collect();
    if steps.is_empty() {
        return Ok(vec![]);
    }

    let mut added = vec![];
    for step in steps {
        let subtask = Task {
            id: Uuid::new_v4(),
            title: step,
            group_id: task.group_id,
            priority: Priority::Medium,
            ..Task::default()
        };
        added.push(subtask.id);
        store.push_subtask(id, subtask);
    }
    storage.save(store)?;

    Ok(added
        .into_iter()
        .filter_map(|id| store.get_task(id).cloned())
        .collect())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::ai::AiError;
    use crate::storage::testing::InMemoryStorage;

    /// Replays a canned response and records prompts.
    struct FakeGenerator {
        response: Option<Value>,
        prompts: RefCell<Vec<String>>,
    }

    impl FakeGenerator {
        fn new(response: Option<Value>) -> Self {
            Self {
                response,
                prompts: RefCell::new(vec![]),
            }
        }
    }

    impl TextGenerator for FakeGenerator {
        fn generate_json(&self, prompt: &str, _schema: &Value) -> Result<Value, AiError> {
            self.prompts.borrow_mut().push(prompt.to_string());
            self.response.clone().ok_or(AiError::EmptyResponse)
        }
    }

    fn setup() -> (Store, InMemoryStorage, Date) {
        let today: Date = "2025-03-05".parse().unwrap();
        (Store::seeded(today), InMemoryStorage::default(), today)
    }

    #[test]
    fn test_monthly_plan_adds_tasks_to_group() {
        let (mut store, storage, today) = setup();
        let generator = FakeGenerator::new(Some(json!([
            { "title": "Reconcile 26AS", "isRecurring": true, "priority": "high" },
            { "description": "No title given", "isRecurring": true, "priority": "low" },
            "not an object"
        ])));

        let added =
            generate_monthly_plan(&mut store, &storage, &generator, "group-1", today).unwrap();

        assert_eq!(added.len(), 2);
        assert_eq!(added[0].title, "Reconcile 26AS");
        assert_eq!(added[0].priority, Priority::High);
        assert_eq!(added[1].title, "New Task");
        assert!(added.iter().all(|t| t.is_recurring));
        assert!(added.iter().all(|t| t.due_date == Some("2025-03-15".parse::<Date>().unwrap())));
        assert_eq!(store.tasks[0].title, "New Task");
        assert_eq!(store.tasks.len(), 4);
        assert!(generator.prompts.borrow()[0].contains("\"Group 1\""));
        assert!(generator.prompts.borrow()[0].contains("Income Tax Compliance"));
    }

    #[test]
    fn test_monthly_plan_failure_adds_nothing() {
        let (mut store, storage, today) = setup();
        let added = generate_monthly_plan(
            &mut store,
            &storage,
            &FakeGenerator::new(None),
            "group-2",
            today,
        )
        .unwrap();
        assert!(added.is_empty());
        assert_eq!(store.tasks.len(), 2);
        assert_eq!(storage.saves.get(), 0);
    }

    #[test]
    fn test_suggest_subtasks() {
        let (mut store, storage, _) = setup();
        let generator = FakeGenerator::new(Some(json!(["Compute liability", " ", "Pay challan"])));

        let added = suggest_subtasks(&mut store, &storage, &generator, "advance").unwrap();
        let titles: Vec<_> = added.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Compute liability", "Pay challan"]);
        assert_eq!(added[0].task_number, 6);

        let parent = &store.tasks[1];
        assert!(parent.is_expanded);
        assert_eq!(parent.subtasks.len(), 2);
    }

    #[test]
    fn test_suggest_subtasks_skips_tasks_with_subtasks() {
        let (mut store, storage, _) = setup();
        let generator = FakeGenerator::new(Some(json!(["unused"])));

        let added = suggest_subtasks(&mut store, &storage, &generator, "gstr").unwrap();
        assert!(added.is_empty());
        assert!(store.tasks[0].is_expanded);
        assert!(generator.prompts.borrow().is_empty());
    }
}
