use crate::errors::TaskLoomErrors;
use crate::queue::TaskQueue;
use crate::registry::TaskRegistry;
use crate::scheduler::Scheduler;
use crate::settings::LoomSettings;
use crate::state_store::{TaskStateRecord, TaskStateStore};
use crate::task::QueuedTask;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// The reference [`Scheduler`]: a last-run map over the registry, ticked by
/// the executor. Scheduled invocations carry a fresh id, no arguments and
/// the configured default queue.
pub struct SimpleScheduler {
    registry: Arc<dyn TaskRegistry>,
    queue: Arc<dyn TaskQueue>,
    state_store: Arc<dyn TaskStateStore>,
    default_queue: String,
    panic_mode: bool,
    last_runs: DashMap<String, DateTime<Utc>>,
}

impl SimpleScheduler {
    pub fn new(
        registry: Arc<dyn TaskRegistry>,
        queue: Arc<dyn TaskQueue>,
        state_store: Arc<dyn TaskStateStore>,
        settings: &LoomSettings,
    ) -> Self {
        Self {
            registry,
            queue,
            state_store,
            default_queue: settings.default_queue.clone(),
            panic_mode: settings.panic_mode,
            last_runs: DashMap::new(),
        }
    }

    fn enqueue_instance(&self, task_name: &str, now: DateTime<Utc>) -> Result<(), TaskLoomErrors> {
        let task = QueuedTask::builder()
            .task_name(task_name)
            .queue_name(self.default_queue.clone())
            .enqueued_at(now)
            .build();
        let record = TaskStateRecord::pending(
            task.id.clone(),
            task.task_name.clone(),
            task.enqueued_at,
            "SimpleScheduler",
        );
        debug!(task_id = %task.id, task_name, "schedule due; enqueueing instance");
        self.state_store.create(record)?;
        self.queue.enqueue(task)?;
        self.last_runs.insert(task_name.to_owned(), now);
        Ok(())
    }
}

impl Scheduler for SimpleScheduler {
    fn tick(&self) -> Result<(), TaskLoomErrors> {
        for definition in self.registry.list_tasks() {
            let Some(schedule) = definition.schedule.as_ref() else {
                continue;
            };

            let now = Utc::now();
            let due = match self.get_task_last_run(&definition.name) {
                // Never ran before: first instance goes out immediately.
                None => true,
                Some(last_run) => match schedule.next_run_after(last_run) {
                    Ok(next_eligible) => now >= next_eligible,
                    Err(err @ TaskLoomErrors::Config(_)) => return Err(err),
                    Err(err) if self.panic_mode => return Err(err),
                    Err(err) => {
                        warn!(
                            task_name = %definition.name,
                            error = %err,
                            "schedule failed; skipping task this tick"
                        );
                        false
                    }
                },
            };

            if due {
                self.enqueue_instance(&definition.name, now)?;
            }
        }
        Ok(())
    }

    fn set_task_last_run(&self, name: &str, instant: DateTime<Utc>) {
        self.last_runs.insert(name.to_owned(), instant);
    }

    fn get_task_last_run(&self, name: &str) -> Option<DateTime<Utc>> {
        self.last_runs.get(name).map(|entry| *entry.value())
    }
}
