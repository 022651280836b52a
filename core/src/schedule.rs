pub mod cron;

pub mod interval;

pub use crate::schedule::cron::CronSchedule;
pub use crate::schedule::interval::IntervalSchedule;

use crate::errors::TaskLoomErrors;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::ops::Deref;

#[allow(unused_imports)]
use crate::registry::TaskDefinition;

#[allow(unused_imports)]
use crate::scheduler::Scheduler;

/// The [`TaskSchedule`] trait is used to calculate the next point in time a
/// recurring task becomes due, given the instant it last ran. The
/// [`Scheduler`] calls this on every tick for each [`TaskDefinition`]
/// carrying a schedule.
///
/// # Required Method(s)
/// If one wants to implement this trait, they must provide an implementation
/// for the [`TaskSchedule::next_run_after`] method used to calculate the next
/// due time
///
/// # Trait Implementation(s)
/// Some of the noteworthy implementations of this trait include:
/// - [`IntervalSchedule`] runs a task at a fixed interval after its last run
/// - [`CronSchedule`] runs a task on a five-field cron expression with
///   minute granularity
///
/// This trait is also implemented for any type implementing ``Deref`` where
/// the target itself implements [`TaskSchedule`], making it relatively easy
/// to store both owned and non-owned values
///
/// # Error semantics
/// A [`TaskLoomErrors::Config`] returned here always propagates out of the
/// scheduler tick (fail-fast for misconfiguration); any other error is
/// swallowed per-task in normal mode and propagates in panic mode.
///
/// # See Also
/// - [`Scheduler`]
/// - [`IntervalSchedule`]
/// - [`CronSchedule`]
pub trait TaskSchedule: Send + Sync + Debug {
    /// Calculates the next due instant strictly after `last_run`.
    fn next_run_after(&self, last_run: DateTime<Utc>) -> Result<DateTime<Utc>, TaskLoomErrors>;
}

impl<T> TaskSchedule for T
where
    T: Deref + Send + Sync + Debug,
    T::Target: TaskSchedule,
{
    fn next_run_after(&self, last_run: DateTime<Utc>) -> Result<DateTime<Utc>, TaskLoomErrors> {
        self.deref().next_run_after(last_run)
    }
}
