// modbot-core/src/tasks/pattern_cache_maintenance.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::matching::CompiledPatternCache;

/// Spawns a background task that periodically evicts idle compiled patterns.
pub fn spawn_pattern_cache_prune_task(
    cache: Arc<CompiledPatternCache>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(interval) => {}
            }
            let evicted = cache.evict_expired();
            if evicted > 0 {
                debug!("Evicted {evicted} idle compiled pattern(s), {} remain", cache.len());
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use modbot_common::models::WordGroupFilter;

    use crate::matching::MatchStrategy;

    #[tokio::test(start_paused = true)]
    async fn prunes_idle_entries_until_cancelled() {
        let cache = Arc::new(CompiledPatternCache::new(
            MatchStrategy::Regex,
            Duration::from_secs(60),
        ));
        cache.get_or_compile(&WordGroupFilter::new(["spam"])).unwrap();

        let cancel = CancellationToken::new();
        let handle = spawn_pattern_cache_prune_task(cache.clone(), Duration::from_secs(30), cancel.clone());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(cache.len(), 1);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(cache.is_empty());

        cancel.cancel();
        handle.await.unwrap();
    }
}
