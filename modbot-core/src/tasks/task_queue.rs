//! modbot-core/src/tasks/task_queue.rs
//!
//! Fire-and-forget side effects (moderator notifications and the like).
//! Callers hand off a future and move on; a reaper task runs the futures with
//! bounded concurrency, logs failures and, on shutdown, drains and awaits
//! everything that was accepted.

use std::future::Future;
use std::pin::Pin;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use modbot_common::error::Error;

type BoxedJob = Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'static>>;

struct Job {
    label: String,
    future: BoxedJob,
}

/// Outcome counts of the jobs a queue has run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskSummary {
    pub completed: usize,
    pub failed: usize,
}

pub struct TaskQueue {
    tx: mpsc::Sender<Job>,
    closed: CancellationToken,
    reaper: Mutex<Option<JoinHandle<TaskSummary>>>,
}

impl TaskQueue {
    /// Must be called from within a tokio runtime.
    pub fn new(capacity: usize, max_in_flight: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let closed = CancellationToken::new();
        let reaper = tokio::spawn(reap(rx, closed.clone(), max_in_flight.max(1)));
        Self {
            tx,
            closed,
            reaper: Mutex::new(Some(reaper)),
        }
    }

    /// Hands `future` off to the background. Waits while the queue is full;
    /// fails once [`TaskQueue::shutdown`] has begun.
    pub async fn enqueue<F>(&self, label: impl Into<String>, future: F) -> Result<(), Error>
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let label = label.into();
        if self.closed.is_cancelled() {
            return Err(Error::TaskQueue(format!("cannot enqueue `{label}`: task queue is shut down")));
        }
        let job = Job {
            label,
            future: Box::pin(future),
        };
        self.tx
            .send(job)
            .await
            .map_err(|e| Error::TaskQueue(format!("cannot enqueue `{}`: task queue is shut down", e.0.label)))
    }

    /// Stops accepting work, then waits for every accepted job. Calling it
    /// again returns an empty summary.
    pub async fn shutdown(&self) -> TaskSummary {
        self.closed.cancel();
        let handle = self.reaper.lock().take();
        let Some(handle) = handle else {
            return TaskSummary::default();
        };
        match handle.await {
            Ok(summary) => {
                info!(
                    completed = summary.completed,
                    failed = summary.failed,
                    "Background task queue drained"
                );
                summary
            }
            Err(e) => {
                error!("Background task reaper panicked: {e}");
                TaskSummary::default()
            }
        }
    }
}

async fn reap(mut rx: mpsc::Receiver<Job>, closed: CancellationToken, max_in_flight: usize) -> TaskSummary {
    let mut running = JoinSet::new();
    let mut summary = TaskSummary::default();

    loop {
        tokio::select! {
            biased;
            Some(result) = running.join_next(), if !running.is_empty() => record(&mut summary, result),
            _ = closed.cancelled() => break,
            job = rx.recv(), if running.len() < max_in_flight => match job {
                Some(job) => spawn_job(&mut running, job),
                None => break,
            },
        }
    }

    rx.close();
    while let Some(job) = rx.recv().await {
        while running.len() >= max_in_flight {
            match running.join_next().await {
                Some(result) => record(&mut summary, result),
                None => break,
            }
        }
        spawn_job(&mut running, job);
    }
    while let Some(result) = running.join_next().await {
        record(&mut summary, result);
    }
    summary
}

fn spawn_job(running: &mut JoinSet<(String, Result<(), Error>)>, job: Job) {
    let Job { label, future } = job;
    debug!("Starting background task `{label}`");
    running.spawn(async move { (label, future.await) });
}

fn record(summary: &mut TaskSummary, result: Result<(String, Result<(), Error>), JoinError>) {
    match result {
        Ok((label, Ok(()))) => {
            summary.completed += 1;
            debug!("Background task `{label}` finished");
        }
        Ok((label, Err(e))) => {
            summary.failed += 1;
            warn!("Background task `{label}` failed: {e}");
        }
        Err(e) => {
            summary.failed += 1;
            error!("Background task panicked: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_awaits_every_accepted_job() {
        let queue = TaskQueue::new(8, 2);
        let done = Arc::new(AtomicUsize::new(0));
        for i in 0..4 {
            let done = done.clone();
            queue
                .enqueue(format!("job-{i}"), async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
                .unwrap();
        }
        queue
            .enqueue("broken", async { Err(Error::Platform("dm closed".into())) })
            .await
            .unwrap();

        let summary = queue.shutdown().await;
        assert_eq!(done.load(Ordering::SeqCst), 4);
        assert_eq!(summary, TaskSummary { completed: 4, failed: 1 });
    }

    #[tokio::test]
    async fn rejects_work_after_shutdown() {
        let queue = TaskQueue::new(1, 1);
        queue.shutdown().await;
        let err = queue.enqueue("late", async { Ok(()) }).await.unwrap_err();
        assert!(matches!(err, Error::TaskQueue(_)));
        assert_eq!(queue.shutdown().await, TaskSummary::default());
    }

    #[tokio::test]
    async fn respects_concurrency_limit() {
        let queue = TaskQueue::new(16, 2);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        for i in 0..6 {
            let (current, peak) = (current.clone(), peak.clone());
            queue
                .enqueue(format!("job-{i}"), async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
                .unwrap();
        }
        let summary = queue.shutdown().await;
        assert_eq!(summary.completed, 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
