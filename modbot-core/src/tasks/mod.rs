pub mod cleanup_executor;
pub mod cleanup_scheduler;
pub mod cleanup_service;
pub mod pattern_cache_maintenance;
pub mod task_queue;
pub mod work_queue;

pub use cleanup_executor::{CleanupExecutor, ExecutorStats};
pub use cleanup_scheduler::CleanupScheduler;
pub use cleanup_service::{CleanupConfig, CleanupService};
pub use pattern_cache_maintenance::spawn_pattern_cache_prune_task;
pub use task_queue::{TaskQueue, TaskSummary};
pub use work_queue::{WorkQueueReader, WorkQueueWriter, work_queue};
