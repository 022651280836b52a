use chrono::Utc;
use serde_json::json;
use taskloom::errors::TaskLoomErrors;
use taskloom::state_store::{InMemoryTaskStateStore, TaskStateRecord, TaskStateStore, TaskStatus};

fn pending(id: &str) -> TaskStateRecord {
    TaskStateRecord::pending(id, "some_task", Utc::now(), "tests")
}

#[test]
fn create_then_get_round_trips() {
    let store = InMemoryTaskStateStore::new();
    let record = pending("r1");
    store.create(record.clone()).unwrap();

    assert_eq!(store.get("r1"), Some(record));
    assert!(store.get("missing").is_none());
}

#[test]
fn duplicate_create_is_a_config_error() {
    let store = InMemoryTaskStateStore::new();
    store.create(pending("r1")).unwrap();

    let result = store.create(pending("r1"));
    assert!(matches!(result, Err(TaskLoomErrors::Config(_))));
}

#[test]
fn update_replaces_existing_record() {
    let store = InMemoryTaskStateStore::new();
    store.create(pending("r1")).unwrap();

    let mut updated = store.get("r1").unwrap();
    updated.status = TaskStatus::Succeeded;
    updated.result = Some(json!("done"));
    updated.finished_at = Some(Utc::now());
    store.update(updated.clone()).unwrap();

    assert_eq!(store.get("r1"), Some(updated));
}

#[test]
fn update_of_unknown_id_fails() {
    let store = InMemoryTaskStateStore::new();
    let result = store.update(pending("ghost"));
    assert!(matches!(result, Err(TaskLoomErrors::RecordDoesNotExist(_))));
}

#[test]
fn delete_removes_and_then_fails() {
    let store = InMemoryTaskStateStore::new();
    store.create(pending("r1")).unwrap();

    store.delete("r1").unwrap();
    assert!(store.get("r1").is_none());
    assert!(matches!(
        store.delete("r1"),
        Err(TaskLoomErrors::RecordDoesNotExist(_))
    ));
}

#[test]
fn terminal_statuses_are_flagged() {
    assert!(!TaskStatus::Pending.is_terminal());
    assert!(!TaskStatus::Running.is_terminal());
    assert!(TaskStatus::Succeeded.is_terminal());
    assert!(TaskStatus::Failed.is_terminal());
    assert!(TaskStatus::Cancelled.is_terminal());
}
