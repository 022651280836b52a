pub mod linear;

pub mod map;

pub mod sqlite;

pub use linear::LinearQueue;
pub use map::MapQueue;
pub use sqlite::SqliteQueue;

use crate::errors::TaskLoomErrors;
use crate::task::QueuedTask;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[allow(unused_imports)]
use crate::executor::Executor;

/// [`TaskQueue`] stores queued invocations keyed by `(queue_name, id)` and
/// dispatches them in an ETA-respecting order.
///
/// # Dispatch contract
/// All backings honour the same rules:
/// 1. Tasks with no ETA dispatch before tasks with one.
/// 2. Among ETA-bearing tasks, ascending ETA.
/// 3. A task is *eligible* when its ETA is absent or has been reached; a
///    future-ETA task never blocks a later-enqueued ready task in the same
///    queue.
///
/// Ties (equal ETAs, or several no-ETA tasks) dispatch in insertion order
/// within a single backing; [`TaskQueue::peek`] and [`TaskQueue::dequeue`]
/// share one selection path per backing so the tie-break is stable for a
/// given queue state.
///
/// # Concurrency
/// Every operation is internally serialized; callers may use the queue from
/// any thread. There is no cross-operation transactionality.
///
/// # See Also
/// - [`LinearQueue`]
/// - [`MapQueue`]
/// - [`SqliteQueue`]
/// - [`Executor`]
pub trait TaskQueue: Send + Sync {
    /// Adds a task to its queue, replacing any prior task with the same id.
    fn enqueue(&self, task: QueuedTask) -> Result<(), TaskLoomErrors>;

    /// Returns and removes the next eligible task for `queue_name`, failing
    /// with [`TaskLoomErrors::QueueEmpty`] when none is eligible.
    fn dequeue(&self, queue_name: &str) -> Result<QueuedTask, TaskLoomErrors>;

    /// Non-destructive equivalent of [`TaskQueue::dequeue`].
    fn peek(&self, queue_name: &str) -> Result<Option<QueuedTask>, TaskLoomErrors>;

    /// Non-destructive look at up to `limit` eligible tasks in dispatch
    /// order (all of them when `limit` is `None`).
    fn bulk_peek(
        &self,
        queue_name: &str,
        limit: Option<usize>,
    ) -> Result<Vec<QueuedTask>, TaskLoomErrors>;

    /// Removes and returns the next task for `queue_name` *ignoring*
    /// eligibility. Only meant for the executor's shutdown cancellation.
    fn dequeue_any_unsafe(&self, queue_name: &str) -> Result<QueuedTask, TaskLoomErrors>;

    /// Removes a task by id across all queues, failing with
    /// [`TaskLoomErrors::QueueEmpty`] when the id is not queued.
    fn remove(&self, id: &str) -> Result<(), TaskLoomErrors>;

    /// Replaces a queued task's ETA, preserving the dispatch order
    /// invariants.
    fn reschedule(&self, id: &str, eta: Option<DateTime<Utc>>) -> Result<(), TaskLoomErrors>;

    /// Reassigns a queued task to another queue.
    fn move_task(&self, id: &str, queue_name: &str) -> Result<(), TaskLoomErrors>;

    /// Total number of queued tasks across all queues.
    fn total_tasks(&self) -> usize;

    /// Number of queued tasks per queue name.
    fn total_tasks_by_queue(&self) -> HashMap<String, usize>;
}

/// Index at which `eta` slots into an ETA-ordered sequence, or `None` to
/// append. No-ETA tasks land before the first ETA-bearing task; ETA-bearing
/// tasks land before the first strictly later ETA, so ties keep insertion
/// order.
pub(crate) fn insertion_index<'a, I>(existing: I, eta: Option<DateTime<Utc>>) -> Option<usize>
where
    I: Iterator<Item = &'a QueuedTask>,
{
    match eta {
        None => {
            let mut existing = existing;
            existing.position(|task| task.eta.is_some())
        }
        Some(eta) => {
            for (idx, task) in existing.enumerate() {
                if let Some(existing_eta) = task.eta
                    && existing_eta > eta
                {
                    return Some(idx);
                }
            }
            None
        }
    }
}

pub(crate) fn empty_queue_error(queue_name: &str) -> TaskLoomErrors {
    TaskLoomErrors::QueueEmpty(format!("`{queue_name}` queue"))
}

pub(crate) fn unknown_id_error(id: &str) -> TaskLoomErrors {
    TaskLoomErrors::QueueEmpty(format!("any queue for id `{id}`"))
}
