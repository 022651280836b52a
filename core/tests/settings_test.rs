use std::str::FromStr;
use taskloom::errors::TaskLoomErrors;
use taskloom::settings::{
    ExecutorChoice, LoomSettings, QueueChoice, RegistryChoice, SchedulerChoice, StateStoreChoice,
    StopBehavior,
};

#[test]
fn defaults_are_canonical() {
    let settings = LoomSettings::default();

    assert_eq!(settings.task_registry, RegistryChoice::InMemory);
    assert_eq!(settings.task_state_store, StateStoreChoice::InMemory);
    assert_eq!(settings.queue, QueueChoice::MapOfDeques);
    assert_eq!(settings.scheduler, SchedulerChoice::Simple);
    assert_eq!(settings.executor, ExecutorChoice::Local);
    assert_eq!(settings.tick_interval, 1.0);
    assert_eq!(settings.default_queue, "default");
    assert_eq!(settings.stop_behavior, StopBehavior::Drain);
    assert!(!settings.panic_mode);
}

#[test]
fn choices_parse_their_display_forms() {
    assert_eq!(QueueChoice::from_str("linear").unwrap(), QueueChoice::Linear);
    assert_eq!(QueueChoice::from_str("map").unwrap(), QueueChoice::MapOfDeques);
    assert_eq!(QueueChoice::from_str("SQLITE").unwrap(), QueueChoice::Sqlite);
    assert_eq!(
        ExecutorChoice::from_str("async").unwrap(),
        ExecutorChoice::Asynchronous
    );
    assert_eq!(StopBehavior::from_str("Cancel").unwrap(), StopBehavior::Cancel);
    assert_eq!(StopBehavior::from_str("ignore").unwrap(), StopBehavior::Ignore);

    assert!(matches!(
        QueueChoice::from_str("postgres"),
        Err(TaskLoomErrors::Config(_))
    ));
    assert!(matches!(
        StopBehavior::from_str("halt"),
        Err(TaskLoomErrors::Config(_))
    ));

    for choice in [QueueChoice::Linear, QueueChoice::MapOfDeques, QueueChoice::Sqlite] {
        assert_eq!(QueueChoice::from_str(&choice.to_string()).unwrap(), choice);
    }
}

#[test]
fn tick_helpers_convert_the_interval() {
    let mut settings = LoomSettings::default();
    settings.tick_interval = 0.25;

    assert_eq!(settings.tick_duration().as_millis(), 250);
    assert_eq!(settings.tick_delta().num_milliseconds(), 250);
}

// All environment manipulation lives in one test: the variables are process
// globals and the test harness runs tests in parallel threads.
#[test]
fn environment_overlays_and_precedence() {
    unsafe {
        std::env::set_var("TASKLOOM_QUEUE", "sqlite");
        std::env::set_var("TASKLOOM_TICK_INTERVAL", "0.5");
        std::env::set_var("TASKLOOM_STOP_BEHAVIOR", "ignore");
        std::env::set_var("TASKLOOM_PANIC_MODE", "yes");
        std::env::set_var("TASKLOOM_DEFAULT_QUEUE", "primary");
    }

    let settings = LoomSettings::from_env().unwrap();
    assert_eq!(settings.queue, QueueChoice::Sqlite);
    assert_eq!(settings.tick_interval, 0.5);
    assert_eq!(settings.stop_behavior, StopBehavior::Ignore);
    assert!(settings.panic_mode);
    assert_eq!(settings.default_queue, "primary");
    // Untouched fields keep their defaults.
    assert_eq!(settings.executor, ExecutorChoice::Local);

    // Explicit assignment wins over the environment.
    let mut explicit = LoomSettings::from_env().unwrap();
    explicit.queue = QueueChoice::Linear;
    assert_eq!(explicit.queue, QueueChoice::Linear);

    // Invalid coercions fail fast.
    unsafe {
        std::env::set_var("TASKLOOM_TICK_INTERVAL", "fast");
    }
    assert!(matches!(LoomSettings::from_env(), Err(TaskLoomErrors::Config(_))));

    unsafe {
        std::env::set_var("TASKLOOM_TICK_INTERVAL", "0.5");
        std::env::set_var("TASKLOOM_PANIC_MODE", "maybe");
    }
    assert!(matches!(LoomSettings::from_env(), Err(TaskLoomErrors::Config(_))));

    unsafe {
        std::env::remove_var("TASKLOOM_QUEUE");
        std::env::remove_var("TASKLOOM_TICK_INTERVAL");
        std::env::remove_var("TASKLOOM_STOP_BEHAVIOR");
        std::env::remove_var("TASKLOOM_PANIC_MODE");
        std::env::remove_var("TASKLOOM_DEFAULT_QUEUE");
    }
}
