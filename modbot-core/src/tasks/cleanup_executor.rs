// modbot-core/src/tasks/cleanup_executor.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use modbot_common::models::WorkItem;
use modbot_common::traits::ChatPlatform;

use crate::resilience::{RetryOutcome, RetryPolicy};
use crate::tasks::work_queue::WorkQueueReader;

/// Counters for work items leaving the queue.
#[derive(Debug, Default)]
pub struct ExecutorStats {
    processed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    messages_deleted: AtomicU64,
}

impl ExecutorStats {
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Items abandoned after retries ran out or the timeout hit.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Items discarded because of shutdown.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn messages_deleted(&self) -> u64 {
        self.messages_deleted.load(Ordering::Relaxed)
    }
}

/// Consumer side of the cleanup pipeline.
pub struct CleanupExecutor {
    platform: Arc<dyn ChatPlatform>,
    policy: RetryPolicy,
    stats: Arc<ExecutorStats>,
}

impl CleanupExecutor {
    pub fn new(platform: Arc<dyn ChatPlatform>, policy: RetryPolicy) -> Self {
        Self {
            platform,
            policy,
            stats: Arc::new(ExecutorStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<ExecutorStats> {
        Arc::clone(&self.stats)
    }

    /// Deletes the aged messages for one item under the retry policy.
    pub async fn process(&self, item: &WorkItem, cancel: &CancellationToken) -> RetryOutcome<usize> {
        let definition = &item.definition;
        let outcome = self
            .policy
            .execute(cancel, |token| {
                self.platform
                    .delete_old_messages(definition.channel_id, definition.age_threshold, token)
            })
            .await;

        match &outcome {
            RetryOutcome::Completed { value, attempts } => {
                self.stats.processed.fetch_add(1, Ordering::Relaxed);
                self.stats.messages_deleted.fetch_add(*value as u64, Ordering::Relaxed);
                info!(
                    "Deleted {value} message(s) from channel {} after {attempts} attempt(s)",
                    definition.channel_id
                );
            }
            RetryOutcome::Exhausted { attempts, last_error } => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                error!("Cleanup {definition} failed after {attempts} attempt(s): {last_error}");
            }
            RetryOutcome::TimedOut { attempts } => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    "Cleanup {definition} timed out after {:?} ({attempts} attempt(s))",
                    self.policy.timeout
                );
            }
            RetryOutcome::Cancelled { .. } => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Cleanup {definition} interrupted by shutdown");
            }
        }
        outcome
    }

    /// Processes items one at a time until the queue closes or `cancel` fires.
    /// On cancellation, whatever is still buffered is counted as dropped.
    pub async fn run(self, mut reader: WorkQueueReader, cancel: CancellationToken) {
        info!("Cleanup executor started");
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = reader.recv() => next,
            };
            let Some(item) = next else {
                info!("Work queue closed");
                break;
            };
            self.process(&item, &cancel).await;
        }

        reader.close();
        while let Some(item) = reader.recv().await {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("Dropping queued cleanup {} on shutdown", item.definition);
        }
        info!(
            processed = self.stats.processed(),
            failed = self.stats.failed(),
            dropped = self.stats.dropped(),
            "Cleanup executor stopped"
        );
    }
}
