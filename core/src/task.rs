use crate::errors::TaskLoomErrors;
use crate::settings::DEFAULT_QUEUE_NAME;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::sync::Arc;
use typed_builder::TypedBuilder;
use uuid::Uuid;

#[allow(unused_imports)]
use crate::executor::Executor;

#[allow(unused_imports)]
use crate::registry::TaskDefinition;

/// A task-related error (i.e. a task invocation failure). The executor
/// records its `Debug` rendering on the state record; it never propagates.
pub type TaskError = Arc<dyn Debug + Send + Sync>;

/// Positional arguments handed to a task callable.
pub type TaskArgs = Vec<Value>;

/// Keyword arguments handed to a task callable.
pub type TaskKwargs = Map<String, Value>;

/// The arguments of one queued invocation, handed to [`TaskCallable::call`].
#[derive(Debug, Clone, Default)]
pub struct TaskInvocation {
    /// Positional arguments, in submission order.
    pub args: TaskArgs,
    /// Keyword arguments.
    pub kwargs: TaskKwargs,
}

impl TaskInvocation {
    pub fn new(args: TaskArgs, kwargs: TaskKwargs) -> Self {
        Self { args, kwargs }
    }
}

/// [`TaskCallable`] is the unit of work bound to a task name at registration.
///
/// # Required Method(s)
/// Implementors provide [`TaskCallable::call`], which receives the
/// invocation's arguments and produces either a result value or a
/// [`TaskError`]. The method is asynchronous by construction: a synchronous
/// body is simply a future that resolves without yielding, so one pipeline
/// serves both kinds of callables.
///
/// # Usage Note(s)
/// Arity and argument validation is the callable's own business; a mismatch
/// surfaces as a failed invocation, never as a registration error.
///
/// # See Also
/// - [`FnTask`]
/// - [`TaskDefinition`]
/// - [`Executor`]
#[async_trait]
pub trait TaskCallable: Send + Sync {
    /// Performs one invocation of the task.
    async fn call(&self, invocation: TaskInvocation) -> Result<Value, TaskError>;
}

/// [`FnTask`] adapts a plain closure (or `fn`) returning a future into a
/// [`TaskCallable`], acting as the leaf unit of execution most registrations
/// will use.
///
/// # Example
/// ```ignore
/// use serde_json::json;
/// use taskloom::task::FnTask;
///
/// let callable = FnTask::new(|_invocation| async { Ok(json!("ok")) });
/// ```
pub struct FnTask<F: Send + Sync>(F);

impl<F, Fut> FnTask<F>
where
    Fut: Future<Output = Result<Value, TaskError>> + Send,
    F: Fn(TaskInvocation) -> Fut + Send + Sync,
{
    pub fn new(func: F) -> Self {
        FnTask(func)
    }
}

#[async_trait]
impl<F, Fut> TaskCallable for FnTask<F>
where
    Fut: Future<Output = Result<Value, TaskError>> + Send,
    F: Fn(TaskInvocation) -> Fut + Send + Sync,
{
    async fn call(&self, invocation: TaskInvocation) -> Result<Value, TaskError> {
        self.0(invocation).await
    }
}

/// [`TaskEta`] is the earliest instant a queued task may be dispatched at.
///
/// # Constructor(s)
/// Besides wrapping a concrete [`DateTime<Utc>`], numeric forms are accepted
/// and interpreted as *seconds since the Unix epoch* (UTC), matching the
/// textual round-trip of the durable queue backing:
/// - `From<DateTime<Utc>>`
/// - `From<i64>` / `From<u32>` for whole epoch seconds
/// - [`TaskEta::from_epoch_seconds_f64`] for fractional epoch seconds, which
///   fails with a configuration error on non-finite input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskEta(DateTime<Utc>);

impl TaskEta {
    /// The normalised UTC instant.
    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }

    /// Normalises fractional epoch seconds to a UTC instant.
    pub fn from_epoch_seconds_f64(seconds: f64) -> Result<Self, TaskLoomErrors> {
        if !seconds.is_finite() {
            return Err(TaskLoomErrors::Config(format!(
                "`{seconds}` is not a valid ETA timestamp"
            )));
        }
        let whole = seconds.div_euclid(1.0) as i64;
        let nanos = (seconds.rem_euclid(1.0) * 1_000_000_000.0) as u32;
        DateTime::<Utc>::from_timestamp(whole, nanos)
            .map(Self)
            .ok_or_else(|| {
                TaskLoomErrors::Config(format!("`{seconds}` is not a valid ETA timestamp"))
            })
    }
}

impl From<DateTime<Utc>> for TaskEta {
    fn from(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }
}

impl From<i64> for TaskEta {
    fn from(epoch_seconds: i64) -> Self {
        Self(DateTime::<Utc>::from_timestamp(epoch_seconds, 0).unwrap_or_default())
    }
}

impl From<u32> for TaskEta {
    fn from(epoch_seconds: u32) -> Self {
        Self::from(epoch_seconds as i64)
    }
}

/// [`QueuedTask`] represents one task invocation scheduled for immediate or
/// delayed execution, owned by the queue from enqueue until dequeue/removal.
///
/// # Constructor(s)
/// Constructed through [`QueuedTask::builder`]; only `task_name` is
/// mandatory. The id defaults to a fresh UUID, the queue name to the
/// library-wide default and `enqueued_at` to the construction instant.
///
/// # Invariants
/// The `id` is unique across all queues (re-enqueueing an id replaces the
/// prior record). A task with no `eta` is immediately eligible; otherwise it
/// becomes eligible once the current UTC time reaches `eta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
pub struct QueuedTask {
    /// Unique identifier of this invocation, shared with its state record.
    #[builder(default = Uuid::new_v4().to_string(), setter(into))]
    pub id: String,

    /// Name the task was registered under; resolved at execution time.
    #[builder(setter(into))]
    pub task_name: String,

    /// Positional arguments passed to the callable.
    #[builder(default)]
    pub args: TaskArgs,

    /// Keyword arguments passed to the callable.
    #[builder(default)]
    pub kwargs: TaskKwargs,

    /// Name of the logical queue this task belongs to.
    #[builder(default = DEFAULT_QUEUE_NAME.to_owned(), setter(into))]
    pub queue_name: String,

    /// Instant the task was placed into the queue.
    #[builder(default = Utc::now())]
    pub enqueued_at: DateTime<Utc>,

    /// Earliest dispatch instant; `None` means eligible immediately.
    #[builder(
        default,
        setter(transform = |eta: impl Into<TaskEta>| Some(eta.into().instant()))
    )]
    pub eta: Option<DateTime<Utc>>,

    /// Lock key serializing this invocation against others sharing it.
    #[builder(default, setter(strip_option, into))]
    pub exclusive_key: Option<String>,
}

impl QueuedTask {
    /// Whether the task may be dispatched at `now`.
    pub fn is_eligible_at(&self, now: DateTime<Utc>) -> bool {
        match self.eta {
            None => true,
            Some(eta) => eta <= now,
        }
    }
}

/// Expands an exclusive-key template against keyword arguments.
///
/// Placeholders use the `{name}` form and substitute the kwarg registered
/// under `name`; string values substitute verbatim, anything else renders as
/// its JSON text. A placeholder with no matching kwarg is a configuration
/// error at submission time.
pub(crate) fn expand_key_template(
    template: &str,
    kwargs: &TaskKwargs,
) -> Result<String, TaskLoomErrors> {
    let mut expanded = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        expanded.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            return Err(TaskLoomErrors::Config(format!(
                "Unterminated placeholder in exclusive key template `{template}`"
            )));
        };
        let name = &after[..close];
        let value = kwargs.get(name).ok_or_else(|| {
            TaskLoomErrors::Config(format!(
                "Exclusive key template `{template}` references missing kwarg `{name}`"
            ))
        })?;
        match value {
            Value::String(text) => expanded.push_str(text),
            other => expanded.push_str(&other.to_string()),
        }
        rest = &after[close + 1..];
    }
    expanded.push_str(rest);
    Ok(expanded)
}
