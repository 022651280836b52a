pub mod simple;

pub use simple::SimpleScheduler;

use crate::errors::TaskLoomErrors;
use chrono::{DateTime, Utc};

#[allow(unused_imports)]
use crate::executor::Executor;

#[allow(unused_imports)]
use crate::schedule::TaskSchedule;

/// [`Scheduler`] advances recurrence state for registered tasks and emits
/// due invocations into the queue and the state store.
///
/// # Tick semantics
/// One [`Scheduler::tick`] considers every registered definition carrying a
/// [`TaskSchedule`]: a task that has never run is enqueued immediately; one
/// whose schedule says it is due again is enqueued and its last-run marker
/// advanced; anything else is left alone. The [`Executor`] calls `tick`
/// once per loop iteration.
///
/// # Error semantics
/// A [`TaskLoomErrors::Config`] from a schedule propagates out of the tick
/// (fail-fast for misconfiguration). Any other schedule error is swallowed
/// per-task in normal mode so one faulty schedule cannot starve the rest,
/// and propagates when panic mode is configured.
pub trait Scheduler: Send + Sync {
    /// Runs one pass over all registered tasks, enqueueing the due ones.
    fn tick(&self) -> Result<(), TaskLoomErrors>;

    /// Overrides the last-run marker of a task. Mostly useful in tests.
    fn set_task_last_run(&self, name: &str, instant: DateTime<Utc>);

    /// The last-run marker of a task, `None` when it never ran.
    fn get_task_last_run(&self, name: &str) -> Option<DateTime<Utc>>;
}
