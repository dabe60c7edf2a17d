use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use modbot_common::traits::{ChatPlatform, CronParser, DefinitionStore};
use modbot_core::matching::{CompiledPatternCache, MatchStrategy};
use modbot_core::platforms::discord::{DiscordPlatform, run_gateway};
use modbot_core::repositories::JsonDefinitionStore;
use modbot_core::resilience::RetryPolicy;
use modbot_core::services::{AutoResponseService, MotdService};
use modbot_core::tasks::{CleanupConfig, CleanupService, TaskQueue, spawn_pattern_cache_prune_task};
use modbot_core::utils::CronCrateParser;

use crate::Args;

pub async fn run_bot(args: Args) -> anyhow::Result<()> {
    let token = args
        .discord_token
        .clone()
        .context("a Discord token is required (--discord-token or DISCORD_TOKEN)")?;
    let strategy: MatchStrategy = args.match_strategy.parse()?;

    // 1) Definitions and platform
    let store: Arc<dyn DefinitionStore> = Arc::new(JsonDefinitionStore::new(&args.definitions));
    let discord = Arc::new(DiscordPlatform::new(token.clone()));
    let platform: Arc<dyn ChatPlatform> = discord.clone();
    let shutdown = CancellationToken::new();

    // 2) Matching + notifications
    let patterns = Arc::new(CompiledPatternCache::new(
        strategy,
        Duration::from_secs(args.pattern_cache_ttl_secs),
    ));
    let prune_handle = spawn_pattern_cache_prune_task(
        patterns.clone(),
        Duration::from_secs(args.pattern_cache_prune_secs),
        shutdown.clone(),
    );
    let tasks = Arc::new(TaskQueue::new(
        args.notification_queue_capacity,
        args.notification_concurrency,
    ));
    let auto_responses = Arc::new(
        AutoResponseService::new(store.clone(), platform.clone(), patterns, tasks.clone())
            .with_refresh_interval(Duration::from_secs(args.definitions_refresh_secs)),
    );

    // 3) Channel cleanup pipeline
    let config = CleanupConfig {
        tick_interval: Duration::from_millis(args.tick_interval_ms),
        queue_capacity: args.queue_capacity,
        retry: RetryPolicy {
            max_retries: args.max_retries,
            base_delay: Duration::from_millis(args.retry_base_delay_ms),
            timeout: Duration::from_secs(args.cleanup_timeout_secs),
            ..RetryPolicy::default()
        },
    };
    let cleanup = CleanupService::start(store.clone(), Arc::new(CronCrateParser), platform.clone(), config, &shutdown);

    // 4) MOTD upkeep
    let motds = Arc::new(MotdService::new(store, platform));
    let motd_handle = tokio::spawn(motds.run(Duration::from_secs(args.motd_sync_secs), shutdown.clone()));

    // 5) Gateway
    let mut gateway = tokio::spawn(run_gateway(token, discord.http(), auto_responses, shutdown.clone()));
    info!("modbot running (match strategy: {strategy}). Press Ctrl-C to stop.");

    // 6) Wait for Ctrl-C or the gateway giving up
    let gateway_finished = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!("Failed to listen for Ctrl-C: {e}");
            }
            info!("Ctrl-C detected; shutting down...");
            false
        }
        result = &mut gateway => {
            match result {
                Ok(Ok(())) => warn!("Discord gateway exited; shutting down..."),
                Ok(Err(e)) => error!("Discord gateway error: {e}"),
                Err(e) => error!("Discord gateway task panicked: {e}"),
            }
            true
        }
    };

    // 7) Ordered shutdown
    shutdown.cancel();
    if !gateway_finished {
        match gateway.await {
            Ok(Err(e)) => error!("Discord gateway error during shutdown: {e}"),
            Err(e) => error!("Discord gateway task panicked: {e}"),
            Ok(Ok(())) => {}
        }
    }
    cleanup.stop().await;
    if let Err(e) = motd_handle.await {
        error!("MOTD task panicked: {e}");
    }
    let summary = tasks.shutdown().await;
    info!(
        "Notifications flushed: {} sent, {} failed",
        summary.completed, summary.failed
    );
    if let Err(e) = prune_handle.await {
        error!("Pattern cache prune task panicked: {e}");
    }
    Ok(())
}

/// Loads the definitions file once and reports what would be scheduled.
pub async fn check_definitions(args: Args) -> anyhow::Result<()> {
    let store = JsonDefinitionStore::new(&args.definitions);
    let definitions = store
        .definitions()
        .await
        .with_context(|| format!("loading {}", args.definitions.display()))?;

    let cron = CronCrateParser;
    let now = Utc::now();
    let mut broken = 0;
    for cleanup in &definitions.cleanups {
        match cron.next_after(&cleanup.cron_expression, now) {
            Ok(Some(next)) => info!("{cleanup} => next run {next}"),
            Ok(None) => {
                broken += 1;
                warn!("{cleanup} => never runs again");
            }
            Err(e) => {
                broken += 1;
                error!("{cleanup} => {e}");
            }
        }
    }
    for auto_response in &definitions.auto_responses {
        info!(
            "Auto response `{}`: {} filter(s), {} response(s)",
            auto_response.name,
            auto_response.filters.len(),
            auto_response.responses.len()
        );
    }

    for motd in &definitions.motds {
        info!("MOTD channel {}: {} message(s)", motd.channel_id, motd.messages.len());
    }

    if broken > 0 {
        anyhow::bail!("{broken} cleanup definition(s) cannot be scheduled");
    }
    info!(
        "{} cleanup definition(s), {} auto response(s) and {} MOTD channel(s) OK",
        definitions.cleanups.len(),
        definitions.auto_responses.len(),
        definitions.motds.len()
    );
    Ok(())
}
