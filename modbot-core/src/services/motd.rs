// modbot-core/src/services/motd.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use modbot_common::error::Error;
use modbot_common::models::ChannelMotd;
use modbot_common::traits::{ChatPlatform, DefinitionStore};

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(10);

/// What one pass over the MOTD definitions did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MotdReport {
    pub created: usize,
    pub updated: usize,
    /// Slots held by someone else's message.
    pub skipped: usize,
    /// Channels that could not be brought up to date.
    pub failed: usize,
}

/// Keeps each configured channel's oldest messages equal to its MOTD embeds:
/// slot `i` is edited in place when the bot owns it, posted when missing.
pub struct MotdService {
    store: Arc<dyn DefinitionStore>,
    platform: Arc<dyn ChatPlatform>,
    applied: Mutex<Option<Vec<ChannelMotd>>>,
}

impl MotdService {
    pub fn new(store: Arc<dyn DefinitionStore>, platform: Arc<dyn ChatPlatform>) -> Self {
        Self {
            store,
            platform,
            applied: Mutex::new(None),
        }
    }

    /// Applies the stored MOTDs unless they equal the last set applied
    /// without failures. `Ok(None)` means nothing changed.
    pub async fn sync(&self) -> Result<Option<MotdReport>, Error> {
        let motds = self.store.motds().await?;
        let mut applied = self.applied.lock().await;
        if applied.as_ref() == Some(&motds) {
            return Ok(None);
        }

        let report = self.apply(&motds).await?;
        if report.failed == 0 {
            *applied = Some(motds);
        }
        Ok(Some(report))
    }

    /// Creates or updates every MOTD in `motds`. A failing channel is logged
    /// and counted; the others are still processed.
    pub async fn apply(&self, motds: &[ChannelMotd]) -> Result<MotdReport, Error> {
        let bot_user_id = self.platform.bot_user_id().await?;
        let mut report = MotdReport::default();
        for motd in motds {
            if let Err(e) = self.apply_channel(motd, bot_user_id, &mut report).await {
                error!("Failed to apply MOTDs in channel {}: {e}", motd.channel_id);
                report.failed += 1;
            }
        }
        Ok(report)
    }

    async fn apply_channel(&self, motd: &ChannelMotd, bot_user_id: u64, report: &mut MotdReport) -> Result<(), Error> {
        if motd.messages.is_empty() {
            return Ok(());
        }
        let channel_id = motd.channel_id;
        let existing = self.platform.oldest_messages(channel_id, motd.messages.len()).await?;

        for (index, message) in motd.messages.iter().enumerate() {
            match existing.get(index) {
                None => {
                    self.platform.post_embed(channel_id, message).await?;
                    report.created += 1;
                    info!("Added MOTD in channel {channel_id} at index {index}");
                }
                Some(posted) if posted.author_id != bot_user_id => {
                    error!(
                        "Unable to modify MOTD at index {index} in channel {channel_id}: message {} is authored by user {}",
                        posted.message_id, posted.author_id
                    );
                    report.skipped += 1;
                }
                Some(posted) => {
                    self.platform.edit_embed(channel_id, posted.message_id, message).await?;
                    report.updated += 1;
                    info!("Updated MOTD in channel {channel_id} at index {index}");
                }
            }
        }
        Ok(())
    }

    /// Syncs every `interval` until `cancel` fires. The first sync runs
    /// immediately.
    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            match self.sync().await {
                Ok(Some(report)) => debug!("MOTD sync: {report:?}"),
                Ok(None) => {}
                Err(e) => warn!("MOTD sync failed: {e}"),
            }
        }
        info!("MOTD service stopped");
    }
}
