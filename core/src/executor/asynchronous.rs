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

/// [`AsyncExecutor`] runs the supervisor loop cooperatively on the ambient
/// tokio runtime: the scheduler tick, every invocation and the tick sleep
/// are yield points, so the loop shares its runtime fairly with the rest of
/// the application.
///
/// Aborting the loop's future is safe: exclusive keys are held through RAII
/// guards that release on drop, and still-queued work is handed over to
/// [`Executor::stop`]'s behaviour handling. The blocking [`Executor::run`]
/// is unsupported on this variant.
pub struct AsyncExecutor {
    core: ExecutorCore,
}

impl AsyncExecutor {
    pub fn new(
        registry: Arc<dyn TaskRegistry>,
        state_store: Arc<dyn TaskStateStore>,
        queue: Arc<dyn TaskQueue>,
        scheduler: Arc<dyn Scheduler>,
        locker: Arc<dyn Locker>,
        settings: LoomSettings,
    ) -> Self {
        Self {
            core: ExecutorCore::new(registry, state_store, queue, scheduler, locker, settings),
        }
    }

    async fn run_loop(&self) -> Result<(), TaskLoomErrors> {
        while self.core.is_running() {
            self.core.scheduler.tick()?;
            self.core.drain_queue().await;
            tokio::time::sleep(self.core.settings.tick_duration()).await;
        }
        Ok(())
    }
}

#[async_trait]
impl Executor for AsyncExecutor {
    fn run(&self) -> Result<(), TaskLoomErrors> {
        Err(TaskLoomErrors::Unsupported("run", "async"))
    }

    async fn run_async(&self) -> Result<(), TaskLoomErrors> {
        self.core.start();
        info!("async executor loop started");
        let result = self.run_loop().await;
        self.core.mark_stopped();
        info!("async executor loop stopped");
        result
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
