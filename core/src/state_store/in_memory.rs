use crate::errors::TaskLoomErrors;
use crate::state_store::{TaskStateRecord, TaskStateStore};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// The in-memory [`TaskStateStore`], a concurrent map from invocation id to
/// its lifecycle record.
#[derive(Default)]
pub struct InMemoryTaskStateStore {
    records: DashMap<String, TaskStateRecord>,
}

impl InMemoryTaskStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskStateStore for InMemoryTaskStateStore {
    fn create(&self, record: TaskStateRecord) -> Result<(), TaskLoomErrors> {
        match self.records.entry(record.id.clone()) {
            Entry::Occupied(_) => Err(TaskLoomErrors::Config(format!(
                "State record `{}` already exists",
                record.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    fn update(&self, record: TaskStateRecord) -> Result<(), TaskLoomErrors> {
        match self.records.entry(record.id.clone()) {
            Entry::Occupied(mut slot) => {
                slot.insert(record);
                Ok(())
            }
            Entry::Vacant(_) => Err(TaskLoomErrors::RecordDoesNotExist(record.id)),
        }
    }

    fn get(&self, id: &str) -> Option<TaskStateRecord> {
        self.records.get(id).map(|entry| entry.value().clone())
    }

    fn delete(&self, id: &str) -> Result<(), TaskLoomErrors> {
        self.records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| TaskLoomErrors::RecordDoesNotExist(id.to_owned()))
    }
}
