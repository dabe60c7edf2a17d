// modbot-core/src/tasks/cleanup_service.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use modbot_common::traits::{ChatPlatform, CronParser, DefinitionStore};

use crate::resilience::RetryPolicy;
use crate::tasks::cleanup_executor::{CleanupExecutor, ExecutorStats};
use crate::tasks::cleanup_scheduler::CleanupScheduler;
use crate::tasks::work_queue::{DEFAULT_CAPACITY, work_queue};

#[derive(Debug, Clone)]
pub struct CleanupConfig {
    pub tick_interval: Duration,
    pub queue_capacity: usize,
    pub retry: RetryPolicy,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            queue_capacity: DEFAULT_CAPACITY,
            retry: RetryPolicy::default(),
        }
    }
}

/// Running scheduler + executor pair joined by a work queue.
pub struct CleanupService {
    scheduler: Arc<CleanupScheduler>,
    stats: Arc<ExecutorStats>,
    cancel: CancellationToken,
    scheduler_handle: JoinHandle<()>,
    executor_handle: JoinHandle<()>,
}

impl CleanupService {
    /// Spawns both loops. They stop when `stop` is called or `parent` is
    /// cancelled.
    pub fn start(
        store: Arc<dyn DefinitionStore>,
        cron: Arc<dyn CronParser>,
        platform: Arc<dyn ChatPlatform>,
        config: CleanupConfig,
        parent: &CancellationToken,
    ) -> Self {
        let cancel = parent.child_token();
        let (writer, reader) = work_queue(config.queue_capacity);

        let scheduler = Arc::new(CleanupScheduler::new(store, cron));
        let scheduler_handle = tokio::spawn(Arc::clone(&scheduler).run(
            writer,
            config.tick_interval,
            cancel.clone(),
        ));

        let executor = CleanupExecutor::new(platform, config.retry);
        let stats = executor.stats();
        let executor_handle = tokio::spawn(executor.run(reader, cancel.clone()));

        info!(
            "Channel cleanup service started (tick {:?}, queue capacity {})",
            config.tick_interval, config.queue_capacity
        );
        Self {
            scheduler,
            stats,
            cancel,
            scheduler_handle,
            executor_handle,
        }
    }

    pub fn scheduler(&self) -> &Arc<CleanupScheduler> {
        &self.scheduler
    }

    pub fn stats(&self) -> Arc<ExecutorStats> {
        Arc::clone(&self.stats)
    }

    /// Signals both loops and waits for them: the producer first, so the
    /// queue is closed before the consumer finishes draining it.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.scheduler_handle.await {
            error!("Cleanup scheduler task panicked: {e}");
        }
        if let Err(e) = self.executor_handle.await {
            error!("Cleanup executor task panicked: {e}");
        }
        info!("Channel cleanup service stopped");
    }
}
