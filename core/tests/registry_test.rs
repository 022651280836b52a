use serde_json::{Map, json};
use taskloom::errors::TaskLoomErrors;
use taskloom::registry::{InMemoryTaskRegistry, TaskDefinition, TaskRegistry};
use taskloom::schedule::IntervalSchedule;
use taskloom::task::FnTask;

fn noop_definition(name: &str) -> TaskDefinition {
    TaskDefinition::builder()
        .name(name)
        .callable(FnTask::new(|_inv| async { Ok(json!(null)) }))
        .build()
}

#[test]
fn register_then_get_resolves_the_definition() {
    let registry = InMemoryTaskRegistry::new();
    registry.register(noop_definition("task")).unwrap();

    let definition = registry.get("task").unwrap();
    assert_eq!(definition.name, "task");
    assert!(definition.schedule.is_none());
    assert!(registry.contains("task"));
    assert!(!registry.contains("other"));
}

#[test]
fn get_of_unknown_name_fails() {
    let registry = InMemoryTaskRegistry::new();
    let result = registry.get("ghost");
    assert!(matches!(result, Err(TaskLoomErrors::TaskNotRegistered(name)) if name == "ghost"));
}

#[test]
fn duplicate_registration_fails() {
    let registry = InMemoryTaskRegistry::new();
    registry.register(noop_definition("task")).unwrap();

    let result = registry.register(noop_definition("task"));
    assert!(matches!(result, Err(TaskLoomErrors::InvalidRegistration(name)) if name == "task"));
    // The first registration is untouched.
    assert!(registry.get("task").is_ok());
}

#[test]
fn empty_name_is_rejected() {
    let registry = InMemoryTaskRegistry::new();
    let result = registry.register(noop_definition(""));
    assert!(matches!(result, Err(TaskLoomErrors::Config(_))));
}

#[test]
fn listing_returns_every_registration() {
    let registry = InMemoryTaskRegistry::new();
    registry.register(noop_definition("a")).unwrap();
    registry.register(noop_definition("b")).unwrap();

    let mut names = registry.list_names();
    names.sort();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(registry.list_tasks().len(), 2);
}

#[test]
fn definitions_keep_schedule_and_extra_metadata() {
    let registry = InMemoryTaskRegistry::new();
    let mut extra = Map::new();
    extra.insert("owner".to_owned(), json!("billing"));
    registry
        .register(
            TaskDefinition::builder()
                .name("scheduled")
                .schedule(IntervalSchedule::from_secs(60))
                .extra(extra)
                .callable(FnTask::new(|_inv| async { Ok(json!(null)) }))
                .build(),
        )
        .unwrap();

    let definition = registry.get("scheduled").unwrap();
    assert!(definition.schedule.is_some());
    assert_eq!(definition.extra.get("owner"), Some(&json!("billing")));
}

#[test]
fn exclusive_key_expands_from_template() {
    let definition = TaskDefinition::builder()
        .name("sync_entity")
        .exclusive_key_template("entity-{entity_id}-{region}")
        .callable(FnTask::new(|_inv| async { Ok(json!(null)) }))
        .build();

    let mut kwargs = Map::new();
    kwargs.insert("entity_id".to_owned(), json!(42));
    kwargs.insert("region".to_owned(), json!("eu"));

    assert_eq!(definition.exclusive_key_for(&kwargs).unwrap(), "entity-42-eu");
}

#[test]
fn exclusive_key_defaults_to_the_task_name() {
    let definition = TaskDefinition::builder()
        .name("singleton")
        .callable(FnTask::new(|_inv| async { Ok(json!(null)) }))
        .build();

    assert_eq!(definition.exclusive_key_for(&Map::new()).unwrap(), "singleton");
}

#[test]
fn exclusive_key_with_missing_kwarg_fails() {
    let definition = TaskDefinition::builder()
        .name("sync_entity")
        .exclusive_key_template("entity-{entity_id}")
        .callable(FnTask::new(|_inv| async { Ok(json!(null)) }))
        .build();

    let result = definition.exclusive_key_for(&Map::new());
    assert!(matches!(result, Err(TaskLoomErrors::Config(_))));
}
