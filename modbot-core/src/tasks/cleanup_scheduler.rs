// modbot-core/src/tasks/cleanup_scheduler.rs

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use modbot_common::error::Error;
use modbot_common::models::{CleanupDefinition, WorkItem};
use modbot_common::traits::{CronParser, DefinitionStore};

use crate::tasks::work_queue::WorkQueueWriter;

/// Producer side of the cleanup pipeline. Tracks the next due instant of every
/// cleanup definition and pushes a [`WorkItem`] whenever one comes due.
pub struct CleanupScheduler {
    store: Arc<dyn DefinitionStore>,
    cron: Arc<dyn CronParser>,
    occurrences: DashMap<CleanupDefinition, DateTime<Utc>>,
    /// Definitions that can never fire again; skipped until the set changes.
    halted: DashSet<CleanupDefinition>,
    known: Mutex<Vec<CleanupDefinition>>,
}

impl CleanupScheduler {
    pub fn new(store: Arc<dyn DefinitionStore>, cron: Arc<dyn CronParser>) -> Self {
        Self {
            store,
            cron,
            occurrences: DashMap::new(),
            halted: DashSet::new(),
            known: Mutex::new(Vec::new()),
        }
    }

    /// One scheduling pass at `now`. Returns how many items were queued.
    ///
    /// Sent items are rescheduled after `now` plus however long the pass has
    /// been running, so time spent waiting on a full queue is not fired
    /// again. Fails only when the queue's reader is gone.
    pub async fn tick(
        &self,
        now: DateTime<Utc>,
        writer: &WorkQueueWriter,
        cancel: &CancellationToken,
    ) -> Result<usize, Error> {
        let started = Instant::now();
        let mut definitions = match self.store.cleanup_definitions().await {
            Ok(defs) => defs,
            Err(e) => {
                warn!("Could not load cleanup definitions, keeping the last known set: {e}");
                self.known.lock().clone()
            }
        };
        let mut seen = HashSet::new();
        definitions.retain(|d| seen.insert(d.clone()));
        self.reconcile(&definitions);

        let mut queued = 0;
        for definition in &definitions {
            if cancel.is_cancelled() {
                break;
            }
            if self.halted.contains(definition) {
                continue;
            }
            let tracked = self.occurrences.get(definition).map(|next| *next);
            let due_at = match tracked {
                Some(next) => next,
                None => {
                    self.schedule_after(definition, now);
                    continue;
                }
            };
            if due_at > now {
                continue;
            }

            let item = WorkItem {
                definition: definition.clone(),
                due_at,
            };
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = writer.send(item) => sent?,
            }
            queued += 1;
            info!("Queued cleanup for {definition} (due {due_at})");
            let elapsed = chrono::Duration::from_std(started.elapsed()).unwrap_or_else(|_| chrono::Duration::zero());
            self.schedule_after(definition, now + elapsed);
        }
        Ok(queued)
    }

    /// Ticks every `interval` until `cancel` fires, then drops `writer`, which
    /// closes the queue.
    pub async fn run(self: Arc<Self>, writer: WorkQueueWriter, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Cleanup scheduler started, ticking every {interval:?}");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if let Err(e) = self.tick(Utc::now(), &writer, &cancel).await {
                error!("Cleanup scheduler stopping: {e}");
                break;
            }
        }

        writer.close();
        info!("Cleanup scheduler stopped, work queue closed");
    }

    /// Next due instant of `definition`, if it is tracked.
    pub fn next_occurrence(&self, definition: &CleanupDefinition) -> Option<DateTime<Utc>> {
        self.occurrences.get(definition).map(|next| *next)
    }

    pub fn is_halted(&self, definition: &CleanupDefinition) -> bool {
        self.halted.contains(definition)
    }

    pub fn tracked_count(&self) -> usize {
        self.occurrences.len()
    }

    /// Any change to the definition set resets every schedule.
    fn reconcile(&self, definitions: &[CleanupDefinition]) {
        let mut known = self.known.lock();
        let unchanged = known.len() == definitions.len() && definitions.iter().all(|d| known.contains(d));
        if unchanged {
            return;
        }

        self.occurrences.clear();
        self.halted.clear();
        *known = definitions.to_vec();

        if definitions.is_empty() {
            info!("No channel cleanup definitions active");
        } else {
            let listing = definitions
                .iter()
                .map(|d| format!("  {d}"))
                .collect::<Vec<_>>()
                .join("\n");
            info!("Channel cleanup definitions changed, {} active:\n{listing}", definitions.len());
        }
    }

    fn schedule_after(&self, definition: &CleanupDefinition, after: DateTime<Utc>) {
        match self.cron.next_after(&definition.cron_expression, after) {
            Ok(Some(next)) => {
                debug!("Next cleanup for channel {} at {next}", definition.channel_id);
                self.occurrences.insert(definition.clone(), next);
            }
            Ok(None) => self.halt(definition, Error::NoFutureOccurrence(definition.cron_expression.clone())),
            Err(e) => self.halt(definition, e),
        }
    }

    fn halt(&self, definition: &CleanupDefinition, reason: Error) {
        self.occurrences.remove(definition);
        if self.halted.insert(definition.clone()) {
            error!("Cleanup {definition} halted until definitions change: {reason}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::repositories::InMemoryDefinitionStore;
    use crate::tasks::work_queue::work_queue;
    use crate::utils::CronCrateParser;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, h, m, s).unwrap()
    }

    fn scheduler(defs: Vec<CleanupDefinition>) -> (Arc<InMemoryDefinitionStore>, CleanupScheduler) {
        let store = Arc::new(InMemoryDefinitionStore::default());
        store.set_cleanup_definitions(defs);
        let sched = CleanupScheduler::new(store.clone(), Arc::new(CronCrateParser));
        (store, sched)
    }

    #[tokio::test]
    async fn first_sight_only_schedules() {
        let def = CleanupDefinition::new(1, Duration::from_secs(60), "* * * * *");
        let (_store, sched) = scheduler(vec![def.clone()]);
        let (writer, reader) = work_queue(8);
        let cancel = CancellationToken::new();

        assert_eq!(sched.tick(at(0, 0, 30), &writer, &cancel).await.unwrap(), 0);
        assert_eq!(sched.next_occurrence(&def), Some(at(0, 1, 0)));
        assert!(reader.is_empty());
    }

    #[tokio::test]
    async fn halts_definitions_that_never_fire() {
        let dead = CleanupDefinition::new(1, Duration::from_secs(60), "0 0 0 1 1 * 1999");
        let broken = CleanupDefinition::new(2, Duration::from_secs(60), "not a cron");
        let ok = CleanupDefinition::new(3, Duration::from_secs(60), "* * * * *");
        let (_store, sched) = scheduler(vec![dead.clone(), broken.clone(), ok.clone()]);
        let (writer, _reader) = work_queue(8);
        let cancel = CancellationToken::new();

        sched.tick(at(0, 0, 30), &writer, &cancel).await.unwrap();
        assert!(sched.is_halted(&dead));
        assert!(sched.is_halted(&broken));
        assert!(!sched.is_halted(&ok));
        assert_eq!(sched.tracked_count(), 1);
    }

    #[tokio::test]
    async fn reconfiguration_resets_everything() {
        let a = CleanupDefinition::new(1, Duration::from_secs(60), "* * * * *");
        let dead = CleanupDefinition::new(2, Duration::from_secs(60), "0 0 0 1 1 * 1999");
        let (store, sched) = scheduler(vec![a.clone(), dead.clone()]);
        let (writer, _reader) = work_queue(8);
        let cancel = CancellationToken::new();

        sched.tick(at(0, 0, 30), &writer, &cancel).await.unwrap();
        assert!(sched.is_halted(&dead));

        let b = CleanupDefinition::new(1, Duration::from_secs(120), "* * * * *");
        store.set_cleanup_definitions(vec![a.clone(), b.clone()]);
        sched.tick(at(0, 0, 45), &writer, &cancel).await.unwrap();
        assert!(!sched.is_halted(&dead));
        assert_eq!(sched.next_occurrence(&a), Some(at(0, 1, 0)));
        assert_eq!(sched.next_occurrence(&b), Some(at(0, 1, 0)));
        assert_eq!(sched.tracked_count(), 2);
    }
}
