use crate::errors::TaskLoomErrors;
use crate::registry::{TaskDefinition, TaskRegistry};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tracing::debug;

/// The in-memory [`TaskRegistry`], a plain concurrent map from task name to
/// definition. Registrations live exactly as long as the registry instance.
#[derive(Default)]
pub struct InMemoryTaskRegistry {
    tasks: DashMap<String, Arc<TaskDefinition>>,
}

impl InMemoryTaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskRegistry for InMemoryTaskRegistry {
    fn register(&self, definition: TaskDefinition) -> Result<(), TaskLoomErrors> {
        if definition.name.is_empty() {
            return Err(TaskLoomErrors::Config(
                "Task names must be non-empty".to_owned(),
            ));
        }
        match self.tasks.entry(definition.name.clone()) {
            Entry::Occupied(_) => Err(TaskLoomErrors::InvalidRegistration(definition.name)),
            Entry::Vacant(slot) => {
                debug!(task_name = %definition.name, "task registered");
                slot.insert(Arc::new(definition));
                Ok(())
            }
        }
    }

    fn get(&self, name: &str) -> Result<Arc<TaskDefinition>, TaskLoomErrors> {
        self.tasks
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TaskLoomErrors::TaskNotRegistered(name.to_owned()))
    }

    fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    fn list_tasks(&self) -> Vec<Arc<TaskDefinition>> {
        self.tasks.iter().map(|entry| entry.value().clone()).collect()
    }

    fn list_names(&self) -> Vec<String> {
        self.tasks.iter().map(|entry| entry.key().clone()).collect()
    }
}
