pub mod in_memory;

pub use in_memory::InMemoryTaskStateStore;

use crate::errors::TaskLoomErrors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[allow(unused_imports)]
use crate::executor::Executor;

/// Lifecycle state of one task invocation.
///
/// The lifecycle is monotonic, `Pending → Running → {Succeeded | Failed |
/// Cancelled}`, with a single sanctioned exception: the executor moves
/// `Running` back to `Pending` when it requeues an invocation whose
/// exclusive key is contended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Waiting in a queue for execution.
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Succeeded,
    /// Finished with an error; the record's result holds the error text.
    Failed,
    /// Removed without executing.
    Cancelled,
}

impl TaskStatus {
    /// Whether no further transition may leave this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

/// One invocation's lifecycle record, keyed by the queued task's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStateRecord {
    /// Identifier shared with the queued task.
    pub id: String,
    /// Name of the task that was invoked.
    pub name: String,
    /// Instant the invocation was created (enqueued).
    pub created_at: DateTime<Utc>,
    /// Which component created the record (the façade or a scheduler).
    pub created_by: String,
    /// Instant execution first started; never overwritten by a requeue.
    pub started_at: Option<DateTime<Utc>>,
    /// Instant a terminal status was reached.
    pub finished_at: Option<DateTime<Utc>>,
    /// Current lifecycle state.
    pub status: TaskStatus,
    /// Return value on success, error text on failure.
    pub result: Option<Value>,
}

impl TaskStateRecord {
    /// A fresh `Pending` record for a newly enqueued invocation.
    pub fn pending(
        id: impl Into<String>,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at,
            created_by: created_by.into(),
            started_at: None,
            finished_at: None,
            status: TaskStatus::Pending,
            result: None,
        }
    }
}

/// [`TaskStateStore`] persists the lifecycle record of every invocation.
///
/// `get` is deliberately lenient and returns `None` for unknown ids; the
/// [`Executor`] relies on that to skip orphaned invocations without failing.
/// `update` and `delete` of unknown ids fail loudly instead, since they
/// indicate a bug in the caller.
pub trait TaskStateStore: Send + Sync {
    /// Persists a new record, failing with [`TaskLoomErrors::Config`] when
    /// the id already exists.
    fn create(&self, record: TaskStateRecord) -> Result<(), TaskLoomErrors>;

    /// Replaces an existing record, failing with
    /// [`TaskLoomErrors::RecordDoesNotExist`] when the id is unknown.
    fn update(&self, record: TaskStateRecord) -> Result<(), TaskLoomErrors>;

    /// Retrieves a record by id, `None` when absent.
    fn get(&self, id: &str) -> Option<TaskStateRecord>;

    /// Removes a record, failing with
    /// [`TaskLoomErrors::RecordDoesNotExist`] when the id is unknown.
    fn delete(&self, id: &str) -> Result<(), TaskLoomErrors>;
}
