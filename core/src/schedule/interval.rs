use crate::errors::TaskLoomErrors;
use crate::schedule::TaskSchedule;
use chrono::{DateTime, TimeDelta, Utc};
use std::ops::Add;
use std::time::Duration;

#[allow(unused_imports)]
use crate::registry::TaskDefinition;

/// [`IntervalSchedule`] is a straightforward implementation of the
/// [`TaskSchedule`] trait that makes a task due again at a fixed interval
/// after its last run. Well suited for recurring jobs such as periodic
/// cleanup tasks, heartbeat signals, polling operations... etc.
///
/// # Constructor(s)
/// When one wants to create a new [`IntervalSchedule`] instance, they can use
/// a variety of constructors, those being:
/// - [`IntervalSchedule::new`] from a chrono [`TimeDelta`]
/// - [`IntervalSchedule::duration`] from a std [`Duration`]
/// - [`IntervalSchedule::from_secs`] from a whole number of seconds
/// - [`IntervalSchedule::from_secs_f64`] from a fractional number of seconds
///
/// One can also construct via the ``From`` implementations for ``u8``,
/// ``u16``, ``u32``, ``f32`` and ``f64``, all denoting seconds, so a plain
/// integer handed to a registration means an interval in seconds.
///
/// # Examples
/// ```ignore
/// use std::time::Duration;
/// use taskloom::schedule::IntervalSchedule;
///
/// // Run every 5 seconds
/// let schedule = IntervalSchedule::duration(Duration::from_secs(5));
/// ```
///
/// # See also
/// - [`TaskSchedule`]
/// - [`TaskDefinition`]
#[derive(Debug, Clone, Eq, PartialEq, PartialOrd, Ord, Copy)]
pub struct IntervalSchedule(pub(crate) TimeDelta);

impl IntervalSchedule {
    /// Creates an [`IntervalSchedule`] from a chrono [`TimeDelta`].
    pub fn new(interval: TimeDelta) -> Self {
        Self(interval)
    }

    /// Creates an [`IntervalSchedule`] from a std [`Duration`].
    pub fn duration(interval: Duration) -> Self {
        Self(TimeDelta::from_std(interval).unwrap())
    }

    /// Creates an [`IntervalSchedule`] spanning `interval` whole seconds.
    pub fn from_secs(interval: u32) -> Self {
        Self(TimeDelta::seconds(interval as i64))
    }

    /// Creates an [`IntervalSchedule`] spanning `interval` fractional seconds.
    pub fn from_secs_f64(interval: f64) -> Self {
        Self(TimeDelta::from_std(Duration::from_secs_f64(interval)).unwrap())
    }
}

impl TaskSchedule for IntervalSchedule {
    fn next_run_after(&self, last_run: DateTime<Utc>) -> Result<DateTime<Utc>, TaskLoomErrors> {
        Ok(last_run.add(self.0))
    }
}

macro_rules! integer_from_impl {
    ($val: ty) => {
        impl From<$val> for IntervalSchedule {
            fn from(value: $val) -> Self {
                IntervalSchedule(TimeDelta::seconds(value as i64))
            }
        }
    };
}

integer_from_impl!(u8);
integer_from_impl!(u16);
integer_from_impl!(u32);

impl From<f64> for IntervalSchedule {
    fn from(value: f64) -> Self {
        IntervalSchedule::from_secs_f64(value)
    }
}

impl From<f32> for IntervalSchedule {
    fn from(value: f32) -> Self {
        IntervalSchedule::from_secs_f64(value as f64)
    }
}
