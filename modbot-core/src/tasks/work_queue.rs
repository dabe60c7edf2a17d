//! modbot-core/src/tasks/work_queue.rs
//!
//! Bounded FIFO between the cleanup scheduler and the cleanup executor.
//! The writer has exactly one owner; dropping it closes the queue, after which
//! the reader still drains whatever was buffered before it sees `None`.

use tokio::sync::mpsc;
use tracing::trace;

use modbot_common::error::Error;
use modbot_common::models::WorkItem;

pub const DEFAULT_CAPACITY: usize = 64;

/// Producer half. Deliberately not `Clone`.
#[derive(Debug)]
pub struct WorkQueueWriter {
    tx: mpsc::Sender<WorkItem>,
}

#[derive(Debug)]
pub struct WorkQueueReader {
    rx: mpsc::Receiver<WorkItem>,
}

/// Creates a queue holding at most `capacity` items (minimum 1).
pub fn work_queue(capacity: usize) -> (WorkQueueWriter, WorkQueueReader) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (WorkQueueWriter { tx }, WorkQueueReader { rx })
}

impl WorkQueueWriter {
    /// Waits while the queue is full. Fails only if the reader is gone.
    pub async fn send(&self, item: WorkItem) -> Result<(), Error> {
        trace!(definition = %item.definition, "Queueing cleanup work item");
        self.tx
            .send(item)
            .await
            .map_err(|e| Error::TaskQueue(format!("work queue reader dropped, lost {}", e.0.definition)))
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    /// Consumes the writer, closing the queue.
    pub fn close(self) {}
}

impl WorkQueueReader {
    /// Next item in FIFO order, or `None` once the writer is gone and the
    /// buffer is empty.
    pub async fn recv(&mut self) -> Option<WorkItem> {
        self.rx.recv().await
    }

    /// Refuses further sends; buffered items can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }

    pub fn try_recv(&mut self) -> Option<WorkItem> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
