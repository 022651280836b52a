pub mod asynchronous;

pub mod local;

pub use asynchronous::AsyncExecutor;
pub use local::LocalExecutor;

use crate::errors::TaskLoomErrors;
use crate::locking::{LockGuard, Locker};
use crate::queue::TaskQueue;
use crate::registry::TaskRegistry;
use crate::scheduler::Scheduler;
use crate::settings::{LoomSettings, StopBehavior};
use crate::state_store::{TaskStateStore, TaskStatus};
use crate::task::{QueuedTask, TaskInvocation};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

/// [`Executor`] drives the orchestration loop: tick the scheduler, drain the
/// queues, invoke callables, transition state records and honour exclusive
/// keys and the configured stop policy.
///
/// # Variants
/// - [`LocalExecutor`] runs the loop on the calling thread and blocks it;
///   [`Executor::run_async`] on it fails with
///   [`TaskLoomErrors::Unsupported`].
/// - [`AsyncExecutor`] runs the loop cooperatively on the ambient tokio
///   runtime; [`Executor::run`] on it fails likewise.
///
/// # Guarantees
/// A failure inside one invocation never aborts the drain or the loop. The
/// exclusive-key lock taken for an invocation is released on every exit path
/// of [`Executor::execute`]. [`Executor::stop`] takes effect no later than
/// the end of the invocation in flight.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Runs the supervisor loop, blocking the calling thread until stopped.
    fn run(&self) -> Result<(), TaskLoomErrors>;

    /// Runs the supervisor loop cooperatively until stopped.
    async fn run_async(&self) -> Result<(), TaskLoomErrors>;

    /// Executes a single queued task and records its outcome.
    async fn execute(&self, task: QueuedTask);

    /// Stops the loop and applies the effective stop behaviour to the still
    /// queued tasks: the configured one, or `Cancel` when `cancel` is set.
    async fn stop(&self, cancel: bool);

    /// Whether the supervisor loop is currently active.
    fn is_running(&self) -> bool;
}

/// Shared machinery of both executor variants: the dependencies, the running
/// flag and every per-invocation / stop-time behaviour. The variants only
/// differ in how the loop around these methods is driven.
pub(crate) struct ExecutorCore {
    pub(crate) registry: Arc<dyn TaskRegistry>,
    pub(crate) state_store: Arc<dyn TaskStateStore>,
    pub(crate) queue: Arc<dyn TaskQueue>,
    pub(crate) scheduler: Arc<dyn Scheduler>,
    pub(crate) locker: Arc<dyn Locker>,
    pub(crate) settings: LoomSettings,
    running: AtomicBool,
}

impl ExecutorCore {
    pub(crate) fn new(
        registry: Arc<dyn TaskRegistry>,
        state_store: Arc<dyn TaskStateStore>,
        queue: Arc<dyn TaskQueue>,
        scheduler: Arc<dyn Scheduler>,
        locker: Arc<dyn Locker>,
        settings: LoomSettings,
    ) -> Self {
        Self {
            registry,
            state_store,
            queue,
            scheduler,
            locker,
            settings,
            running: AtomicBool::new(false),
        }
    }

    pub(crate) fn start(&self) {
        self.running.store(true, Ordering::Release);
    }

    pub(crate) fn mark_stopped(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Executes one queued task through the full state machine: orphan
    /// check, exclusive-key acquisition, running transition, resolution,
    /// invocation and the terminal transition.
    pub(crate) async fn execute(&self, task: QueuedTask) {
        let Some(mut record) = self.state_store.get(&task.id) else {
            warn!(
                task_id = %task.id,
                task_name = %task.task_name,
                "no state record for invocation; skipping orphan"
            );
            return;
        };

        // Terminal records never transition back.
        if record.status.is_terminal() {
            warn!(
                task_id = %task.id,
                status = ?record.status,
                "invocation already finished; skipping"
            );
            return;
        }

        // Held until the end of this call; Drop releases on every path.
        let _guard = if let Some(key) = task.exclusive_key.clone() {
            match LockGuard::try_acquire(self.locker.clone(), key.clone()) {
                Some(guard) => Some(guard),
                None => {
                    // Leave the record Pending and retry one tick later.
                    self.requeue_contended(task, &key);
                    return;
                }
            }
        } else {
            None
        };

        record.status = TaskStatus::Running;
        record.started_at.get_or_insert(Utc::now());
        if let Err(err) = self.state_store.update(record.clone()) {
            error!(task_id = %task.id, error = %err, "failed to mark invocation running");
            return;
        }

        // If this future is dropped mid-invocation (the cooperative loop was
        // aborted), the record must not stay stuck in Running.
        let roll_forward = RollForwardOnDrop {
            state_store: self.state_store.as_ref(),
            task_id: &task.id,
            armed: true,
        };

        match self.registry.get(&task.task_name) {
            Err(_) => {
                warn!(task_id = %task.id, task_name = %task.task_name, "task is not registered");
                record.result = Some(Value::String(format!(
                    "Task `{}` is not registered",
                    task.task_name
                )));
                record.status = TaskStatus::Failed;
            }
            Ok(definition) => {
                debug!(task_id = %task.id, task_name = %task.task_name, "invoking task");
                let invocation = TaskInvocation::new(task.args.clone(), task.kwargs.clone());
                match definition.callable.call(invocation).await {
                    Ok(value) => {
                        debug!(task_id = %task.id, task_name = %task.task_name, "task succeeded");
                        record.result = Some(value);
                        record.status = TaskStatus::Succeeded;
                    }
                    Err(failure) => {
                        error!(
                            task_id = %task.id,
                            task_name = %task.task_name,
                            error = ?failure,
                            "task failed"
                        );
                        record.result = Some(Value::String(format!("{failure:?}")));
                        record.status = TaskStatus::Failed;
                    }
                }
            }
        }

        record.finished_at = Some(Utc::now());
        if let Err(err) = self.state_store.update(record) {
            error!(task_id = %task.id, error = %err, "failed to record invocation outcome");
        }
        roll_forward.defuse();
    }

    fn requeue_contended(&self, mut task: QueuedTask, key: &str) {
        task.eta = Some(Utc::now() + self.settings.tick_delta());
        debug!(
            task_id = %task.id,
            exclusive_key = %key,
            "exclusive key contended; requeueing"
        );
        if let Err(err) = self.queue.enqueue(task) {
            error!(exclusive_key = %key, error = %err, "failed to requeue contended task");
        }
    }

    /// Dequeues and executes eligible tasks, one per queue per pass, until a
    /// full pass over the known queues yields nothing.
    pub(crate) async fn drain_queue(&self) {
        loop {
            let mut progressed = false;
            for queue_name in self.known_queue_names() {
                match self.queue.dequeue(&queue_name) {
                    Ok(task) => {
                        self.execute(task).await;
                        progressed = true;
                    }
                    Err(TaskLoomErrors::QueueEmpty(_)) => {}
                    Err(err) => {
                        error!(queue_name = %queue_name, error = %err, "dequeue failed");
                    }
                }
            }
            if !progressed {
                return;
            }
        }
    }

    /// Applies the effective stop behaviour to the still-queued tasks.
    pub(crate) async fn handle_stop(&self, cancel: bool) {
        let behavior = if cancel {
            StopBehavior::Cancel
        } else {
            self.settings.stop_behavior
        };
        info!(behavior = %behavior, "applying stop behaviour");
        match behavior {
            StopBehavior::Cancel => self.cancel_pending(),
            StopBehavior::Ignore => {}
            StopBehavior::Drain => {
                self.drain_queue().await;
                self.cancel_pending();
            }
        }
    }

    /// Removes every queued task (eligible or not) and marks it cancelled.
    /// Queues can gain tasks from other threads between passes, so the loop
    /// is progress-bounded: it ends on the first pass that removed nothing.
    fn cancel_pending(&self) {
        loop {
            let mut progressed = false;
            for (queue_name, count) in self.queue.total_tasks_by_queue() {
                if count == 0 {
                    continue;
                }
                match self.queue.dequeue_any_unsafe(&queue_name) {
                    Ok(task) => {
                        debug!(task_id = %task.id, queue_name = %queue_name, "cancelling queued task");
                        if let Some(mut record) = self.state_store.get(&task.id)
                            && !record.status.is_terminal()
                        {
                            record.status = TaskStatus::Cancelled;
                            record.finished_at = Some(Utc::now());
                            if let Err(err) = self.state_store.update(record) {
                                warn!(task_id = %task.id, error = %err, "failed to mark task cancelled");
                            }
                        }
                        progressed = true;
                    }
                    Err(_) => continue,
                }
            }
            if !progressed {
                return;
            }
        }
    }

    fn known_queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.queue.total_tasks_by_queue().into_keys().collect();
        names.sort();
        names
    }
}

/// Rolls a record that is still `Running` forward to `Cancelled` when the
/// surrounding invocation future is dropped before finishing.
struct RollForwardOnDrop<'a> {
    state_store: &'a dyn TaskStateStore,
    task_id: &'a str,
    armed: bool,
}

impl RollForwardOnDrop<'_> {
    fn defuse(mut self) {
        self.armed = false;
    }
}

impl Drop for RollForwardOnDrop<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Some(mut record) = self.state_store.get(self.task_id) else {
            return;
        };
        if record.status != TaskStatus::Running {
            return;
        }
        warn!(task_id = %self.task_id, "invocation aborted mid-flight; rolling forward to cancelled");
        record.status = TaskStatus::Cancelled;
        record.finished_at = Some(Utc::now());
        let _ = self.state_store.update(record);
    }
}
