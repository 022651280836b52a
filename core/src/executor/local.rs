use crate::errors::TaskLoomErrors;
use crate::executor::{Executor, ExecutorCore};
use crate::locking::Locker;
use crate::queue::TaskQueue;
use crate::registry::TaskRegistry;
use crate::scheduler::Scheduler;
use crate::settings::LoomSettings;
use crate::state_store::TaskStateStore;
use crate::task::QueuedTask;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// [`LocalExecutor`] runs the supervisor loop synchronously on the calling
/// thread: tick the scheduler, drain the queues, sleep for the configured
/// tick interval, repeat until stopped.
///
/// Callables are asynchronous by construction, so the executor owns a small
/// current-thread tokio runtime to drive each drain to completion. The loop
/// itself never yields; [`Executor::run_async`] is unsupported on this
/// variant.
///
/// Applications typically launch [`Executor::run`] on a dedicated thread and
/// call [`Executor::stop`] from wherever shutdown is decided.
pub struct LocalExecutor {
    core: ExecutorCore,
    runtime: tokio::runtime::Runtime,
}

impl LocalExecutor {
    pub fn new(
        registry: Arc<dyn TaskRegistry>,
        state_store: Arc<dyn TaskStateStore>,
        queue: Arc<dyn TaskQueue>,
        scheduler: Arc<dyn Scheduler>,
        locker: Arc<dyn Locker>,
        settings: LoomSettings,
    ) -> Result<Self, TaskLoomErrors> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        Ok(Self {
            core: ExecutorCore::new(registry, state_store, queue, scheduler, locker, settings),
            runtime,
        })
    }

    fn run_loop(&self) -> Result<(), TaskLoomErrors> {
        while self.core.is_running() {
            self.core.scheduler.tick()?;
            self.runtime.block_on(self.core.drain_queue());
            std::thread::sleep(self.core.settings.tick_duration());
        }
        Ok(())
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    fn run(&self) -> Result<(), TaskLoomErrors> {
        self.core.start();
        info!("local executor loop started");
        let result = self.run_loop();
        self.core.mark_stopped();
        info!("local executor loop stopped");
        result
    }

    async fn run_async(&self) -> Result<(), TaskLoomErrors> {
        Err(TaskLoomErrors::Unsupported("run_async", "local"))
    }

    async fn execute(&self, task: QueuedTask) {
        self.core.execute(task).await;
    }

    async fn stop(&self, cancel: bool) {
        self.core.mark_stopped();
        self.core.handle_stop(cancel).await;
    }

    fn is_running(&self) -> bool {
        self.core.is_running()
    }
}
