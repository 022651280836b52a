use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskloom::orchestrator::{TaskLoom, TaskSubmission};
use taskloom::registry::TaskDefinition;
use taskloom::schedule::IntervalSchedule;
use taskloom::settings::{ExecutorChoice, LoomSettings};
use taskloom::state_store::TaskStatus;
use taskloom::task::{FnTask, TaskError};

#[tokio::test]
async fn scheduled_and_manual_tasks_flow_through_the_local_executor() {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();

    let mut settings = LoomSettings::default();
    settings.tick_interval = 0.05;
    let loom = Arc::new(TaskLoom::new(settings).unwrap());

    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    loom.register(
        TaskDefinition::builder()
            .name("e2e_task")
            .schedule(IntervalSchedule::from_secs_f64(0.1))
            .callable(FnTask::new(move |inv| {
                let sink = sink.clone();
                async move {
                    let label = inv
                        .args
                        .first()
                        .and_then(|arg| arg.as_str())
                        .unwrap_or("scheduled")
                        .to_owned();
                    sink.lock().unwrap().push(label);
                    Ok(json!("ok"))
                }
            }))
            .build(),
    )
    .unwrap();

    // Run the supervisor loop on its own thread, the way applications do.
    let runner = loom.clone();
    let handle = std::thread::spawn(move || runner.run());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(
        !seen.lock().unwrap().is_empty(),
        "scheduled task never ran: {:?}",
        seen.lock().unwrap()
    );

    // Manual submission joins the same pipeline.
    let id = loom
        .submit_task(
            TaskSubmission::builder()
                .task_name("e2e_task")
                .args(vec![json!("manual")])
                .build(),
        )
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(seen.lock().unwrap().iter().any(|label| label == "manual"));

    let record = loom.state_store().get(&id).unwrap();
    assert_eq!(record.status, TaskStatus::Succeeded);
    assert_eq!(record.result, Some(json!("ok")));

    loom.stop(false).await;
    handle.join().unwrap().unwrap();
    assert!(!loom.is_running());
}

#[tokio::test]
async fn one_failing_task_does_not_poison_the_pipeline() {
    let loom = TaskLoom::new(LoomSettings::default()).unwrap();

    loom.register(
        TaskDefinition::builder()
            .name("boom")
            .callable(FnTask::new(|_inv| async {
                Err(Arc::new("RuntimeError: x".to_owned()) as TaskError)
            }))
            .build(),
    )
    .unwrap();
    loom.register(
        TaskDefinition::builder()
            .name("fine")
            .callable(FnTask::new(|_inv| async { Ok(json!("ok")) }))
            .build(),
    )
    .unwrap();

    let boom_id = loom
        .submit_task(TaskSubmission::builder().task_name("boom").build())
        .unwrap();
    // Drain-on-stop executes everything currently eligible.
    loom.stop(false).await;

    let record = loom.state_store().get(&boom_id).unwrap();
    assert_eq!(record.status, TaskStatus::Failed);
    let rendered = record.result.unwrap().to_string();
    assert!(rendered.contains('x'), "failure text was {rendered}");

    let fine_id = loom
        .submit_task(TaskSubmission::builder().task_name("fine").build())
        .unwrap();
    loom.stop(false).await;

    let record = loom.state_store().get(&fine_id).unwrap();
    assert_eq!(record.status, TaskStatus::Succeeded);
    assert_eq!(record.result, Some(json!("ok")));
}

#[tokio::test]
async fn the_async_executor_runs_the_cooperative_loop() {
    let mut settings = LoomSettings::default();
    settings.tick_interval = 0.05;
    settings.executor = ExecutorChoice::Asynchronous;
    let loom = Arc::new(TaskLoom::new(settings).unwrap());

    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    loom.register(
        TaskDefinition::builder()
            .name("beat")
            .schedule(IntervalSchedule::from_secs_f64(0.1))
            .callable(FnTask::new(move |_inv| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push("beat".to_owned());
                    Ok(json!(null))
                }
            }))
            .build(),
    )
    .unwrap();

    let runner = loom.clone();
    let handle = tokio::spawn(async move { runner.run_async().await });

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(loom.is_running());
    assert!(!seen.lock().unwrap().is_empty());

    loom.stop(false).await;
    handle.await.unwrap().unwrap();
    assert!(!loom.is_running());
}
