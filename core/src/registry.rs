pub mod in_memory;

pub use in_memory::InMemoryTaskRegistry;

use crate::errors::TaskLoomErrors;
use crate::schedule::TaskSchedule;
use crate::task::{TaskCallable, TaskKwargs, expand_key_template};
use serde_json::{Map, Value};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use typed_builder::TypedBuilder;

#[allow(unused_imports)]
use crate::orchestrator::TaskLoom;

/// [`TaskDefinition`] stores everything known about a callable that was
/// registered as a background task: the callable itself, the name it is
/// resolved by, an optional recurrence schedule, an optional exclusive-key
/// template and free-form metadata.
///
/// # Constructor(s)
/// Constructed through [`TaskDefinition::builder`]; `name` and `callable`
/// are mandatory, everything else is optional. The `schedule` and `callable`
/// setters accept any implementation and box it behind an ``Arc`` themselves:
///
/// ```ignore
/// use serde_json::json;
/// use taskloom::registry::TaskDefinition;
/// use taskloom::schedule::IntervalSchedule;
/// use taskloom::task::FnTask;
///
/// let definition = TaskDefinition::builder()
///     .name("heartbeat")
///     .schedule(IntervalSchedule::from_secs(30))
///     .callable(FnTask::new(|_inv| async { Ok(json!("ok")) }))
///     .build();
/// ```
///
/// # See Also
/// - [`TaskRegistry`]
/// - [`TaskLoom::register`]
#[derive(TypedBuilder)]
pub struct TaskDefinition {
    /// Unique name the task is registered and resolved under.
    #[builder(setter(into))]
    pub name: String,

    /// The unit of work executed for every invocation of this task.
    #[builder(setter(transform = |c: impl TaskCallable + 'static| Arc::new(c) as Arc<dyn TaskCallable>))]
    pub callable: Arc<dyn TaskCallable>,

    /// Optional recurrence; tasks without one only run when submitted.
    #[builder(
        default,
        setter(transform = |s: impl TaskSchedule + 'static| Some(Arc::new(s) as Arc<dyn TaskSchedule>))
    )]
    pub schedule: Option<Arc<dyn TaskSchedule>>,

    /// Optional template (``{kwarg}`` placeholders) expanded at submission
    /// into the invocation's exclusive lock key.
    #[builder(default, setter(strip_option, into))]
    pub exclusive_key_template: Option<String>,

    /// Arbitrary metadata preserved on the definition, never interpreted.
    #[builder(default)]
    pub extra: Map<String, Value>,
}

impl Debug for TaskDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("name", &self.name)
            .field("schedule", &self.schedule)
            .field("exclusive_key_template", &self.exclusive_key_template)
            .field("extra", &self.extra)
            .finish_non_exhaustive()
    }
}

impl TaskDefinition {
    /// Expands the exclusive lock key for one submission. Without a template
    /// the task name itself is the key, serializing all exclusive
    /// invocations of the task.
    pub fn exclusive_key_for(&self, kwargs: &TaskKwargs) -> Result<String, TaskLoomErrors> {
        match &self.exclusive_key_template {
            Some(template) => expand_key_template(template, kwargs),
            None => Ok(self.name.clone()),
        }
    }
}

/// [`TaskRegistry`] holds the named task definitions of one orchestrator.
///
/// The registry is passive: it never invokes callables, it only binds each
/// name to exactly one [`TaskDefinition`] for its own lifetime.
pub trait TaskRegistry: Send + Sync {
    /// Binds a definition under its name.
    ///
    /// # Returns
    /// [`TaskLoomErrors::InvalidRegistration`] when the name is already
    /// bound, [`TaskLoomErrors::Config`] when it is empty.
    fn register(&self, definition: TaskDefinition) -> Result<(), TaskLoomErrors>;

    /// Resolves a definition by name, failing with
    /// [`TaskLoomErrors::TaskNotRegistered`] when absent.
    fn get(&self, name: &str) -> Result<Arc<TaskDefinition>, TaskLoomErrors>;

    /// Whether a task is registered under `name`.
    fn contains(&self, name: &str) -> bool;

    /// All registered definitions, in no particular order.
    fn list_tasks(&self) -> Vec<Arc<TaskDefinition>>;

    /// The names of all registered tasks, in no particular order.
    fn list_names(&self) -> Vec<String>;
}
