use thiserror::Error;

#[allow(unused_imports)]
use crate::registry::TaskRegistry;

#[allow(unused_imports)]
use crate::state_store::TaskStateStore;

/// [`TaskLoomErrors`] is the main enum that contains all the errors which can
/// be surfaced by TaskLoom, it uses under the hood [`thiserror`] to make it as
/// smooth sailing to add more errors in the future as possible.
///
/// Task *invocation* failures are deliberately not part of this enum: a
/// failing callable is recorded on its state record, never propagated
/// (see [`crate::task::TaskError`]).
#[derive(Error, Debug)]
pub enum TaskLoomErrors {
    /// This error is meant to happen when resolving a task name that was never
    /// registered in the [`TaskRegistry`]
    #[error("Task `{0}` is not registered")]
    TaskNotRegistered(String),

    /// This error is meant to happen when registering a task under a name that
    /// is already bound in the [`TaskRegistry`]
    #[error("Task `{0}` is already registered. Use a unique name or avoid duplicate registration")]
    InvalidRegistration(String),

    /// This error is meant to happen when a queue holds no task matching the
    /// request, it acts as an expected control-flow signal inside the
    /// executor's drain loop
    #[error("No task found in {0}")]
    QueueEmpty(String),

    /// This error is meant to happen when updating or deleting a state record
    /// by an identifier the [`TaskStateStore`] does not know
    #[error("No state record exists for task id `{0}`")]
    RecordDoesNotExist(String),

    /// This error is meant to happen on malformed settings values, malformed
    /// cron expressions and duplicate state-record creation. It always
    /// propagates (fail-fast)
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// This error is meant to happen when a feature is invoked on an
    /// incompatible executor variant, the first field is the operation and
    /// the second is the executor it was attempted on
    #[error("`{0}` is not supported by the {1} executor")]
    Unsupported(&'static str, &'static str),

    /// Internal assertion failure, it should never surface to users of the
    /// library under normal operation
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// A failure bubbling up from the embedded relational queue backing
    #[error(transparent)]
    Storage(#[from] rusqlite::Error),

    /// This error is meant to happen when the local executor cannot bring up
    /// the runtime it drives asynchronous callables on
    #[error("Executor runtime failed to initialize: {0}")]
    Runtime(#[from] std::io::Error),
}
