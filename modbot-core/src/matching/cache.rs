// File: modbot-core/src/matching/cache.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use modbot_common::error::Error;
use modbot_common::models::WordGroupFilter;

use crate::matching::pattern::{self, CompiledPattern, MatchStrategy};

pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct CacheEntry {
    patterns: OnceCell<Arc<[CompiledPattern]>>,
    last_access: Mutex<Instant>,
}

impl CacheEntry {
    fn new(now: Instant) -> Self {
        Self {
            patterns: OnceCell::new(),
            last_access: Mutex::new(now),
        }
    }

    fn touch(&self, now: Instant) {
        let mut last = self.last_access.lock();
        if now > *last {
            *last = now;
        }
    }

    fn is_idle(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(*self.last_access.lock()) >= ttl
    }
}

/// Memoizes compiled word-group filters, keyed by the exact ordered strings.
///
/// Entries expire after `idle_ttl` without a lookup. Concurrent lookups of the
/// same filter compile it once; the others wait for that result. Compile
/// failures are not cached.
pub struct CompiledPatternCache {
    strategy: MatchStrategy,
    idle_ttl: Duration,
    entries: DashMap<WordGroupFilter, Arc<CacheEntry>>,
    compilations: AtomicUsize,
}

impl CompiledPatternCache {
    pub fn new(strategy: MatchStrategy, idle_ttl: Duration) -> Self {
        Self {
            strategy,
            idle_ttl,
            entries: DashMap::new(),
            compilations: AtomicUsize::new(0),
        }
    }

    pub fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    pub fn get_or_compile(&self, filter: &WordGroupFilter) -> Result<Arc<[CompiledPattern]>, Error> {
        let now = Instant::now();
        // The map guard must be gone before compiling, or a slow compile would
        // block the whole shard.
        let entry = match self.entries.entry(filter.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_idle(now, self.idle_ttl) {
                    occupied.insert(Arc::new(CacheEntry::new(now)));
                }
                occupied.get().clone()
            }
            Entry::Vacant(vacant) => vacant.insert(Arc::new(CacheEntry::new(now))).clone(),
        };
        entry.touch(now);

        let result = entry
            .patterns
            .get_or_try_init(|| {
                self.compilations.fetch_add(1, Ordering::Relaxed);
                debug!(%filter, strategy = %self.strategy, "Compiling word-group filter");
                pattern::compile(filter, self.strategy).map(Arc::from)
            })
            .cloned();

        if result.is_err() {
            self.entries
                .remove_if(filter, |_, e| Arc::ptr_eq(e, &entry) && e.patterns.get().is_none());
        }
        result
    }

    /// True if any word-group string of `filter` matches `text`. A filter that
    /// fails to compile never matches.
    pub fn evaluate_filter(&self, text: &str, filter: &WordGroupFilter) -> bool {
        match self.get_or_compile(filter) {
            Ok(patterns) => patterns.iter().any(|p| p.is_match(text)),
            Err(e) => {
                warn!("Word-group filter {filter} cannot be evaluated: {e}");
                false
            }
        }
    }

    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Instant::now())
    }

    /// Drops every entry idle for at least the TTL as of `now`.
    pub fn evict_expired_at(&self, now: Instant) -> usize {
        let mut evicted = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_idle(now, self.idle_ttl);
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }

    /// How many compilations have run since construction.
    pub fn compilation_count(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CompiledPatternCache {
    fn default() -> Self {
        Self::new(MatchStrategy::default(), DEFAULT_IDLE_TTL)
    }
}
