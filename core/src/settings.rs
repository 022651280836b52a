use crate::errors::TaskLoomErrors;
use chrono::TimeDelta;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

/// Name of the queue that tasks land on when no queue name is given.
pub const DEFAULT_QUEUE_NAME: &str = "default";

/// Prefix shared by all environment variables recognised by
/// [`LoomSettings::from_env`].
pub const ENV_PREFIX: &str = "TASKLOOM_";

macro_rules! choice_enum {
    ($(#[$($attrss:tt)*])* $name: ident, $field: literal, $($variant: ident => $repr: literal),+) => {
        $(#[$($attrss)*])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub enum $name {
            #[default]
            $($variant,)+
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($repr),)+
                }
            }
        }

        impl FromStr for $name {
            type Err = TaskLoomErrors;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.to_ascii_lowercase().as_str() {
                    $($repr => Ok(Self::$variant),)+
                    _ => Err(TaskLoomErrors::Config(format!(
                        "`{value}` is not a valid value for `{}`", $field
                    ))),
                }
            }
        }
    };
}

choice_enum!(
    /// Selects the [`crate::registry::TaskRegistry`] implementation.
    RegistryChoice, "task_registry",
    InMemory => "in-memory"
);

choice_enum!(
    /// Selects the [`crate::state_store::TaskStateStore`] implementation.
    StateStoreChoice, "task_state_store",
    InMemory => "in-memory"
);

choice_enum!(
    /// Selects the [`crate::scheduler::Scheduler`] implementation.
    SchedulerChoice, "scheduler",
    Simple => "simple"
);

/// Selects the [`crate::queue::TaskQueue`] backing. All three honour the same
/// dispatch contract, they differ in the data structure carrying the tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueChoice {
    /// One ordered sequence holding every queue, filtered on dispatch.
    Linear,
    /// A map of `queue_name` to an ETA-ordered deque.
    #[default]
    MapOfDeques,
    /// An embedded relational table, able to restore tasks faithfully.
    Sqlite,
}

impl Display for QueueChoice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linear => f.write_str("linear"),
            Self::MapOfDeques => f.write_str("map"),
            Self::Sqlite => f.write_str("sqlite"),
        }
    }
}

impl FromStr for QueueChoice {
    type Err = TaskLoomErrors;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "map" => Ok(Self::MapOfDeques),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(TaskLoomErrors::Config(format!(
                "`{value}` is not a valid value for `queue`"
            ))),
        }
    }
}

/// Selects the [`crate::executor::Executor`] variant driving the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorChoice {
    /// Blocking loop on the calling thread, see
    /// [`crate::executor::LocalExecutor`].
    #[default]
    Local,
    /// Cooperative tokio loop, see [`crate::executor::AsyncExecutor`].
    Asynchronous,
}

impl Display for ExecutorChoice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Asynchronous => f.write_str("async"),
        }
    }
}

impl FromStr for ExecutorChoice {
    type Err = TaskLoomErrors;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "async" => Ok(Self::Asynchronous),
            _ => Err(TaskLoomErrors::Config(format!(
                "`{value}` is not a valid value for `executor`"
            ))),
        }
    }
}

/// What the executor does with still-queued tasks when it is stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBehavior {
    /// Remove every queued task (eligible or not) and mark it `Cancelled`.
    Cancel,
    /// Return immediately and leave the queues intact.
    Ignore,
    /// Execute every currently eligible task, then cancel whatever is left.
    #[default]
    Drain,
}

impl Display for StopBehavior {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancel => f.write_str("cancel"),
            Self::Ignore => f.write_str("ignore"),
            Self::Drain => f.write_str("drain"),
        }
    }
}

impl FromStr for StopBehavior {
    type Err = TaskLoomErrors;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "cancel" => Ok(Self::Cancel),
            "ignore" => Ok(Self::Ignore),
            "drain" => Ok(Self::Drain),
            _ => Err(TaskLoomErrors::Config(format!(
                "`{value}` is not a valid value for `stop_behavior`"
            ))),
        }
    }
}

/// [`LoomSettings`] is the strongly typed configuration holder for the
/// TaskLoom runtime services.
///
/// # Precedence
/// Settings resolve as `explicit > environment > defaults`: start from
/// [`LoomSettings::from_env`] (or [`LoomSettings::default`] to skip the
/// environment) and assign fields for explicit overrides before handing the
/// value to [`crate::orchestrator::TaskLoom::new`].
///
/// # Environment variables
/// Every field is overridable through a `TASKLOOM_`-prefixed upper-case
/// variable (`TASKLOOM_QUEUE`, `TASKLOOM_TICK_INTERVAL`, ...). Numeric,
/// boolean and enum values are coerced; an unparseable value fails with
/// [`TaskLoomErrors::Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoomSettings {
    /// Which task registry implementation to construct.
    pub task_registry: RegistryChoice,
    /// Which task state store implementation to construct.
    pub task_state_store: StateStoreChoice,
    /// Which queue backing to construct.
    pub queue: QueueChoice,
    /// Which scheduler implementation to construct.
    pub scheduler: SchedulerChoice,
    /// Which executor variant drives the loop.
    pub executor: ExecutorChoice,
    /// Seconds slept between supervisor loop iterations.
    pub tick_interval: f64,
    /// Queue name used when a submission or schedule does not name one.
    pub default_queue: String,
    /// What `stop()` does with still-queued tasks, unless cancellation is
    /// forced by the caller.
    pub stop_behavior: StopBehavior,
    /// When enabled, scheduler errors that are normally swallowed per-task
    /// propagate and abort the tick.
    pub panic_mode: bool,
}

impl Default for LoomSettings {
    fn default() -> Self {
        Self {
            task_registry: RegistryChoice::InMemory,
            task_state_store: StateStoreChoice::InMemory,
            queue: QueueChoice::MapOfDeques,
            scheduler: SchedulerChoice::Simple,
            executor: ExecutorChoice::Local,
            tick_interval: 1.0,
            default_queue: DEFAULT_QUEUE_NAME.to_owned(),
            stop_behavior: StopBehavior::Drain,
            panic_mode: false,
        }
    }
}

impl LoomSettings {
    /// Builds settings from the canonical defaults overlaid with any
    /// `TASKLOOM_*` environment variables currently set.
    ///
    /// # Returns
    /// The resolved [`LoomSettings`], or [`TaskLoomErrors::Config`] when an
    /// environment value cannot be coerced to the field's type.
    pub fn from_env() -> Result<Self, TaskLoomErrors> {
        let mut settings = Self::default();
        settings.apply_env()?;
        Ok(settings)
    }

    /// Overlays `TASKLOOM_*` environment variables onto this instance.
    pub fn apply_env(&mut self) -> Result<(), TaskLoomErrors> {
        if let Some(raw) = env_value("TASK_REGISTRY") {
            self.task_registry = raw.parse()?;
        }
        if let Some(raw) = env_value("TASK_STATE_STORE") {
            self.task_state_store = raw.parse()?;
        }
        if let Some(raw) = env_value("QUEUE") {
            self.queue = raw.parse()?;
        }
        if let Some(raw) = env_value("SCHEDULER") {
            self.scheduler = raw.parse()?;
        }
        if let Some(raw) = env_value("EXECUTOR") {
            self.executor = raw.parse()?;
        }
        if let Some(raw) = env_value("TICK_INTERVAL") {
            self.tick_interval = raw.parse::<f64>().map_err(|_| {
                TaskLoomErrors::Config(format!(
                    "`{raw}` is not a valid value for `tick_interval`"
                ))
            })?;
        }
        if let Some(raw) = env_value("DEFAULT_QUEUE") {
            self.default_queue = raw;
        }
        if let Some(raw) = env_value("STOP_BEHAVIOR") {
            self.stop_behavior = raw.parse()?;
        }
        if let Some(raw) = env_value("PANIC_MODE") {
            self.panic_mode = parse_bool(&raw)?;
        }
        Ok(())
    }

    /// The tick interval as a [`Duration`], for thread sleeps.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(self.tick_interval.max(0.0))
    }

    /// The tick interval as a chrono [`TimeDelta`], for ETA arithmetic.
    pub fn tick_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.tick_duration()).unwrap_or(TimeDelta::MAX)
    }
}

fn env_value(suffix: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{suffix}")).ok()
}

fn parse_bool(raw: &str) -> Result<bool, TaskLoomErrors> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(TaskLoomErrors::Config(format!(
            "`{raw}` is not a valid value for `panic_mode`"
        ))),
    }
}
