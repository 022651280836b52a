use crate::errors::TaskLoomErrors;
use crate::executor::{AsyncExecutor, Executor, LocalExecutor};
use crate::locking::{InMemoryLocker, Locker};
use crate::queue::{LinearQueue, MapQueue, SqliteQueue, TaskQueue};
use crate::registry::{InMemoryTaskRegistry, TaskDefinition, TaskRegistry};
use crate::scheduler::{Scheduler, SimpleScheduler};
use crate::settings::{
    ExecutorChoice, LoomSettings, QueueChoice, RegistryChoice, SchedulerChoice, StateStoreChoice,
};
use crate::state_store::{InMemoryTaskStateStore, TaskStateRecord, TaskStateStore};
use crate::task::{QueuedTask, TaskArgs, TaskEta, TaskKwargs};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;
use typed_builder::TypedBuilder;
use uuid::Uuid;

/// One task submission handed to [`TaskLoom::submit_task`].
///
/// # Constructor(s)
/// Constructed through [`TaskSubmission::builder`]; only `task_name` is
/// mandatory. The `eta` setter accepts either a concrete UTC instant or a
/// number of epoch seconds (see [`TaskEta`]); `exclusive` requests that the
/// invocation be serialized on the task's expanded exclusive key.
#[derive(Debug, Clone, TypedBuilder)]
pub struct TaskSubmission {
    /// Name of the registered task to invoke.
    #[builder(setter(into))]
    pub task_name: String,

    /// Positional arguments for the callable.
    #[builder(default)]
    pub args: TaskArgs,

    /// Keyword arguments for the callable.
    #[builder(default)]
    pub kwargs: TaskKwargs,

    /// Target queue; the configured default queue when absent.
    #[builder(default, setter(strip_option, into))]
    pub queue_name: Option<String>,

    /// Earliest dispatch instant; eligible immediately when absent.
    #[builder(default, setter(transform = |eta: impl Into<TaskEta>| Some(eta.into())))]
    pub eta: Option<TaskEta>,

    /// Whether the invocation must hold the task's exclusive key while it
    /// runs.
    #[builder(default)]
    pub exclusive: bool,
}

/// This is the builder config used for constructing a [`TaskLoom`] instance.
/// By itself it should not be used; it resides in [`TaskLoom::builder`].
#[derive(TypedBuilder)]
#[builder(build_method(into = Result<TaskLoom, TaskLoomErrors>))]
pub struct TaskLoomConfig {
    /// The [`LoomSettings`] the remaining components are selected and
    /// parameterized from.
    ///
    /// # Default Value
    /// The canonical defaults of [`LoomSettings::default`]; environment
    /// layering is opt-in via [`LoomSettings::from_env`].
    #[builder(default)]
    settings: LoomSettings,

    /// A pre-built [`TaskRegistry`] overriding the settings selection, for
    /// user-supplied implementations.
    #[builder(
        default,
        setter(transform = |r: impl TaskRegistry + 'static| Some(Arc::new(r) as Arc<dyn TaskRegistry>))
    )]
    task_registry: Option<Arc<dyn TaskRegistry>>,

    /// A pre-built [`TaskStateStore`] overriding the settings selection.
    #[builder(
        default,
        setter(transform = |s: impl TaskStateStore + 'static| Some(Arc::new(s) as Arc<dyn TaskStateStore>))
    )]
    task_state_store: Option<Arc<dyn TaskStateStore>>,

    /// A pre-built [`TaskQueue`] overriding the settings selection.
    #[builder(
        default,
        setter(transform = |q: impl TaskQueue + 'static| Some(Arc::new(q) as Arc<dyn TaskQueue>))
    )]
    queue: Option<Arc<dyn TaskQueue>>,

    /// A pre-built [`Locker`] overriding the default in-memory one.
    #[builder(
        default,
        setter(transform = |l: impl Locker + 'static| Some(Arc::new(l) as Arc<dyn Locker>))
    )]
    locker: Option<Arc<dyn Locker>>,
}

impl From<TaskLoomConfig> for Result<TaskLoom, TaskLoomErrors> {
    fn from(config: TaskLoomConfig) -> Self {
        let settings = config.settings;

        let registry = config.task_registry.unwrap_or_else(|| match settings.task_registry {
            RegistryChoice::InMemory => {
                Arc::new(InMemoryTaskRegistry::new()) as Arc<dyn TaskRegistry>
            }
        });
        let state_store = config
            .task_state_store
            .unwrap_or_else(|| match settings.task_state_store {
                StateStoreChoice::InMemory => {
                    Arc::new(InMemoryTaskStateStore::new()) as Arc<dyn TaskStateStore>
                }
            });
        let queue: Arc<dyn TaskQueue> = match config.queue {
            Some(queue) => queue,
            None => match settings.queue {
                QueueChoice::Linear => Arc::new(LinearQueue::new()),
                QueueChoice::MapOfDeques => Arc::new(MapQueue::new()),
                QueueChoice::Sqlite => Arc::new(SqliteQueue::in_memory()?),
            },
        };
        let locker = config
            .locker
            .unwrap_or_else(|| Arc::new(InMemoryLocker::new()) as Arc<dyn Locker>);

        let scheduler: Arc<dyn Scheduler> = match settings.scheduler {
            SchedulerChoice::Simple => Arc::new(SimpleScheduler::new(
                registry.clone(),
                queue.clone(),
                state_store.clone(),
                &settings,
            )),
        };
        let executor: Arc<dyn Executor> = match settings.executor {
            ExecutorChoice::Local => Arc::new(LocalExecutor::new(
                registry.clone(),
                state_store.clone(),
                queue.clone(),
                scheduler.clone(),
                locker.clone(),
                settings.clone(),
            )?),
            ExecutorChoice::Asynchronous => Arc::new(AsyncExecutor::new(
                registry.clone(),
                state_store.clone(),
                queue.clone(),
                scheduler.clone(),
                locker.clone(),
                settings.clone(),
            )),
        };

        Ok(TaskLoom {
            settings,
            registry,
            state_store,
            queue,
            scheduler,
            locker,
            executor,
        })
    }
}

/// [`TaskLoom`] is the orchestrator façade wiring together all the parts:
/// the task registry, the state store, the queue, the scheduler, the locker
/// and the executor, each selected and parameterized from a
/// [`LoomSettings`] value.
///
/// # Constructor(s)
/// [`TaskLoom::new`] builds everything from settings; [`TaskLoom::builder`]
/// additionally lets callers inject pre-built components (a custom queue
/// backing, a shared locker... etc.) in place of the settings selection.
///
/// # Example
/// ```ignore
/// use serde_json::json;
/// use std::sync::Arc;
/// use taskloom::orchestrator::{TaskLoom, TaskSubmission};
/// use taskloom::registry::TaskDefinition;
/// use taskloom::schedule::IntervalSchedule;
/// use taskloom::settings::LoomSettings;
/// use taskloom::task::FnTask;
///
/// let loom = Arc::new(TaskLoom::new(LoomSettings::default())?);
///
/// loom.register(
///     TaskDefinition::builder()
///         .name("heartbeat")
///         .schedule(IntervalSchedule::from_secs(30))
///         .callable(FnTask::new(|_inv| async { Ok(json!("ok")) }))
///         .build(),
/// )?;
///
/// loom.submit_task(TaskSubmission::builder().task_name("heartbeat").build())?;
///
/// let runner = Arc::clone(&loom);
/// let handle = std::thread::spawn(move || runner.run());
/// ```
///
/// # See Also
/// - [`LoomSettings`]
/// - [`TaskDefinition`]
/// - [`TaskSubmission`]
/// - [`Executor`]
pub struct TaskLoom {
    settings: LoomSettings,
    registry: Arc<dyn TaskRegistry>,
    state_store: Arc<dyn TaskStateStore>,
    queue: Arc<dyn TaskQueue>,
    scheduler: Arc<dyn Scheduler>,
    locker: Arc<dyn Locker>,
    executor: Arc<dyn Executor>,
}

impl TaskLoom {
    /// Builds an orchestrator with every component selected from `settings`.
    pub fn new(settings: LoomSettings) -> Result<Self, TaskLoomErrors> {
        Self::builder().settings(settings).build()
    }

    /// A builder accepting pre-built components besides the settings.
    pub fn builder() -> TaskLoomConfigBuilder {
        TaskLoomConfig::builder()
    }

    /// Registers a task definition. Fails with
    /// [`TaskLoomErrors::InvalidRegistration`] on a duplicate name.
    pub fn register(&self, definition: TaskDefinition) -> Result<(), TaskLoomErrors> {
        self.registry.register(definition)
    }

    /// Creates a `Pending` state record and enqueues one invocation of a
    /// task, returning the generated invocation id.
    ///
    /// An `exclusive` submission expands the definition's exclusive-key
    /// template against the submission's kwargs, so the task must already be
    /// registered; non-exclusive submissions resolve the name at execution
    /// time instead.
    pub fn submit_task(&self, submission: TaskSubmission) -> Result<String, TaskLoomErrors> {
        let TaskSubmission {
            task_name,
            args,
            kwargs,
            queue_name,
            eta,
            exclusive,
        } = submission;

        let exclusive_key = if exclusive {
            let definition = self.registry.get(&task_name)?;
            Some(definition.exclusive_key_for(&kwargs)?)
        } else {
            None
        };

        let task = QueuedTask {
            id: Uuid::new_v4().to_string(),
            task_name,
            args,
            kwargs,
            queue_name: queue_name.unwrap_or_else(|| self.settings.default_queue.clone()),
            enqueued_at: Utc::now(),
            eta: eta.map(|eta| eta.instant()),
            exclusive_key,
        };
        let record = TaskStateRecord::pending(
            task.id.clone(),
            task.task_name.clone(),
            task.enqueued_at,
            "TaskLoom",
        );
        debug!(task_id = %task.id, task_name = %task.task_name, queue_name = %task.queue_name, "task submitted");

        let id = task.id.clone();
        self.state_store.create(record)?;
        self.queue.enqueue(task)?;
        Ok(id)
    }

    /// The next eligible task of a queue (the default queue when `None`),
    /// without removing it.
    pub fn peek(&self, queue_name: Option<&str>) -> Result<Option<QueuedTask>, TaskLoomErrors> {
        self.queue
            .peek(queue_name.unwrap_or(&self.settings.default_queue))
    }

    /// Up to `limit` eligible tasks of a queue in dispatch order, without
    /// removing them.
    pub fn bulk_peek(
        &self,
        queue_name: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<QueuedTask>, TaskLoomErrors> {
        self.queue
            .bulk_peek(queue_name.unwrap_or(&self.settings.default_queue), limit)
    }

    /// Replaces the ETA of a queued task.
    pub fn reschedule_task(
        &self,
        id: &str,
        eta: Option<DateTime<Utc>>,
    ) -> Result<(), TaskLoomErrors> {
        self.queue.reschedule(id, eta)
    }

    /// Moves a queued task to another queue.
    pub fn move_task(&self, id: &str, queue_name: &str) -> Result<(), TaskLoomErrors> {
        self.queue.move_task(id, queue_name)
    }

    /// Runs the supervisor loop, blocking the calling thread until stopped.
    pub fn run(&self) -> Result<(), TaskLoomErrors> {
        self.executor.run()
    }

    /// Runs the supervisor loop cooperatively until stopped.
    pub async fn run_async(&self) -> Result<(), TaskLoomErrors> {
        self.executor.run_async().await
    }

    /// Stops the loop and applies the effective stop behaviour (`Cancel`
    /// when `cancel` is set, the configured behaviour otherwise).
    pub async fn stop(&self, cancel: bool) {
        self.executor.stop(cancel).await;
    }

    /// Whether the supervisor loop is currently active.
    pub fn is_running(&self) -> bool {
        self.executor.is_running()
    }

    /// The resolved settings the orchestrator was built from.
    pub fn settings(&self) -> &LoomSettings {
        &self.settings
    }

    /// The task registry, for direct inspection.
    pub fn registry(&self) -> Arc<dyn TaskRegistry> {
        self.registry.clone()
    }

    /// The state store, for inspecting invocation outcomes.
    pub fn state_store(&self) -> Arc<dyn TaskStateStore> {
        self.state_store.clone()
    }

    /// The queue, for direct inspection.
    pub fn queue(&self) -> Arc<dyn TaskQueue> {
        self.queue.clone()
    }

    /// The scheduler, for adjusting last-run markers.
    pub fn scheduler(&self) -> Arc<dyn Scheduler> {
        self.scheduler.clone()
    }

    /// The locker serializing exclusive invocations.
    pub fn locker(&self) -> Arc<dyn Locker> {
        self.locker.clone()
    }

    /// The executor driving the loop.
    pub fn executor(&self) -> Arc<dyn Executor> {
        self.executor.clone()
    }
}
