use chrono::{TimeDelta, Utc};
use serde_json::{Map, json};
use taskloom::errors::TaskLoomErrors;
use taskloom::orchestrator::{TaskLoom, TaskSubmission};
use taskloom::queue::LinearQueue;
use taskloom::registry::TaskDefinition;
use taskloom::settings::{LoomSettings, QueueChoice};
use taskloom::state_store::TaskStatus;
use taskloom::task::FnTask;

fn make_loom() -> TaskLoom {
    TaskLoom::new(LoomSettings::default()).unwrap()
}

fn register_ok(loom: &TaskLoom, name: &str) {
    loom.register(
        TaskDefinition::builder()
            .name(name)
            .callable(FnTask::new(|_inv| async { Ok(json!("ok")) }))
            .build(),
    )
    .unwrap();
}

#[test]
fn submit_creates_a_pending_record_and_enqueues() {
    let loom = make_loom();
    register_ok(&loom, "t");

    let id = loom
        .submit_task(
            TaskSubmission::builder()
                .task_name("t")
                .args(vec![json!(1)])
                .build(),
        )
        .unwrap();

    let record = loom.state_store().get(&id).unwrap();
    assert_eq!(record.status, TaskStatus::Pending);
    assert_eq!(record.name, "t");
    assert_eq!(record.created_by, "TaskLoom");

    let queued = loom.peek(None).unwrap().unwrap();
    assert_eq!(queued.id, id);
    assert_eq!(queued.args, vec![json!(1)]);
}

#[test]
fn submission_of_an_unregistered_name_is_accepted() {
    // Name resolution happens at execution time, not submission time.
    let loom = make_loom();
    let id = loom
        .submit_task(TaskSubmission::builder().task_name("later").build())
        .unwrap();
    assert_eq!(loom.state_store().get(&id).unwrap().status, TaskStatus::Pending);
}

#[test]
fn exclusive_submission_requires_a_registered_task() {
    let loom = make_loom();
    let result = loom.submit_task(
        TaskSubmission::builder()
            .task_name("ghost")
            .exclusive(true)
            .build(),
    );
    assert!(matches!(result, Err(TaskLoomErrors::TaskNotRegistered(_))));
}

#[test]
fn exclusive_submission_expands_the_lock_key() {
    let loom = make_loom();
    loom.register(
        TaskDefinition::builder()
            .name("sync")
            .exclusive_key_template("entity-{entity_id}")
            .callable(FnTask::new(|_inv| async { Ok(json!("ok")) }))
            .build(),
    )
    .unwrap();

    let mut kwargs = Map::new();
    kwargs.insert("entity_id".to_owned(), json!("abc"));
    loom.submit_task(
        TaskSubmission::builder()
            .task_name("sync")
            .kwargs(kwargs)
            .exclusive(true)
            .build(),
    )
    .unwrap();

    let queued = loom.peek(None).unwrap().unwrap();
    assert_eq!(queued.exclusive_key.as_deref(), Some("entity-abc"));
}

#[test]
fn peek_and_move_route_between_queues() {
    let loom = make_loom();
    register_ok(&loom, "t");

    let id = loom
        .submit_task(
            TaskSubmission::builder()
                .task_name("t")
                .queue_name("priority")
                .build(),
        )
        .unwrap();

    assert_eq!(loom.peek(Some("priority")).unwrap().unwrap().id, id);
    assert!(loom.peek(None).unwrap().is_none());

    loom.move_task(&id, "default").unwrap();

    assert_eq!(loom.peek(None).unwrap().unwrap().id, id);
    assert!(loom.peek(Some("priority")).unwrap().is_none());
}

#[test]
fn reschedule_shifts_eligibility() {
    let loom = make_loom();
    register_ok(&loom, "t");

    let id = loom
        .submit_task(TaskSubmission::builder().task_name("t").build())
        .unwrap();
    assert!(loom.peek(None).unwrap().is_some());

    loom.reschedule_task(&id, Some(Utc::now() + TimeDelta::hours(1)))
        .unwrap();
    assert!(loom.peek(None).unwrap().is_none());
    assert_eq!(loom.queue().total_tasks(), 1);

    loom.reschedule_task(&id, None).unwrap();
    assert_eq!(loom.peek(None).unwrap().unwrap().id, id);
}

#[test]
fn bulk_peek_proxies_with_the_default_queue() {
    let loom = make_loom();
    register_ok(&loom, "t");

    for _ in 0..3 {
        loom.submit_task(TaskSubmission::builder().task_name("t").build())
            .unwrap();
    }

    assert_eq!(loom.bulk_peek(None, None).unwrap().len(), 3);
    assert_eq!(loom.bulk_peek(None, Some(2)).unwrap().len(), 2);
    assert!(loom.bulk_peek(Some("elsewhere"), None).unwrap().is_empty());
}

#[test]
fn numeric_eta_is_normalised_on_submission() {
    let loom = make_loom();
    register_ok(&loom, "t");

    let epoch_seconds = (Utc::now() + TimeDelta::hours(1)).timestamp();
    loom.submit_task(
        TaskSubmission::builder()
            .task_name("t")
            .eta(epoch_seconds)
            .build(),
    )
    .unwrap();

    // Not yet eligible, but present with a concrete instant.
    assert!(loom.peek(None).unwrap().is_none());
    let queued = loom.queue().dequeue_any_unsafe("default").unwrap();
    assert_eq!(queued.eta.unwrap().timestamp(), epoch_seconds);
}

#[test]
fn settings_select_the_queue_backing() {
    let mut settings = LoomSettings::default();
    settings.queue = QueueChoice::Sqlite;
    let loom = TaskLoom::new(settings).unwrap();
    register_ok(&loom, "t");

    let id = loom
        .submit_task(TaskSubmission::builder().task_name("t").build())
        .unwrap();
    assert_eq!(loom.peek(None).unwrap().unwrap().id, id);
}

#[test]
fn builder_accepts_prebuilt_components() {
    let loom: TaskLoom = TaskLoom::builder()
        .settings(LoomSettings::default())
        .queue(LinearQueue::new())
        .build()
        .unwrap();
    register_ok(&loom, "t");

    let id = loom
        .submit_task(TaskSubmission::builder().task_name("t").build())
        .unwrap();
    assert_eq!(loom.peek(None).unwrap().unwrap().id, id);
}

#[test]
fn custom_default_queue_is_used_for_submissions() {
    let mut settings = LoomSettings::default();
    settings.default_queue = "primary".to_owned();
    let loom = TaskLoom::new(settings).unwrap();
    register_ok(&loom, "t");

    loom.submit_task(TaskSubmission::builder().task_name("t").build())
        .unwrap();

    assert!(loom.peek(None).unwrap().is_some());
    assert_eq!(loom.queue().total_tasks_by_queue().get("primary"), Some(&1));
}

#[test]
fn is_running_reflects_the_executor() {
    let loom = make_loom();
    assert!(!loom.is_running());
}
