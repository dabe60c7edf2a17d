// modbot-core/src/services/auto_response.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use modbot_common::error::Error;
use modbot_common::models::{AutoResponse, Filter, InboundMessage, Response};
use modbot_common::traits::{ChatPlatform, DefinitionStore};

use crate::matching::CompiledPatternCache;
use crate::tasks::TaskQueue;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

struct CachedDefinitions {
    loaded_at: Instant,
    definitions: Arc<Vec<AutoResponse>>,
}

/// Runs every auto response against inbound messages and, on a match, hands
/// the moderator notifications off to the background task queue.
pub struct AutoResponseService {
    store: Arc<dyn DefinitionStore>,
    platform: Arc<dyn ChatPlatform>,
    patterns: Arc<CompiledPatternCache>,
    tasks: Arc<TaskQueue>,
    refresh_interval: Duration,
    cached: Mutex<Option<CachedDefinitions>>,
}

impl AutoResponseService {
    pub fn new(
        store: Arc<dyn DefinitionStore>,
        platform: Arc<dyn ChatPlatform>,
        patterns: Arc<CompiledPatternCache>,
        tasks: Arc<TaskQueue>,
    ) -> Self {
        Self {
            store,
            platform,
            patterns,
            tasks,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            cached: Mutex::new(None),
        }
    }

    /// How long a loaded set of definitions is reused before asking the store
    /// again.
    pub fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }

    /// Checks `message` against every auto response. Returns the names of the
    /// ones that fired. Messages from bots are ignored.
    ///
    /// Fails only if the notifications could not be queued.
    pub async fn moderate(&self, message: &InboundMessage) -> Result<Vec<String>, Error> {
        if message.author_is_bot {
            return Ok(Vec::new());
        }

        let definitions = self.definitions().await;
        let mut triggered = Vec::new();
        for definition in definitions.iter() {
            if !self.matches_filters(&definition.filters, message) {
                continue;
            }
            info!(
                "Auto response `{}` triggered by {} ({}) at {}",
                definition.name,
                message.author_name,
                message.author_id,
                message.jump_url()
            );
            for response in &definition.responses {
                self.notify(definition, response, message).await?;
            }
            triggered.push(definition.name.clone());
        }
        Ok(triggered)
    }

    /// All filters must pass. A definition without filters matches everything.
    fn matches_filters(&self, filters: &[Filter], message: &InboundMessage) -> bool {
        filters.iter().all(|filter| match filter {
            Filter::AnyChannel(channel_ids) => channel_ids.contains(&message.channel_id),
            // Unknown join dates pass.
            Filter::UserJoinAge(max_age) => message.author_joined_at.is_none_or(|joined_at| {
                // Clock skew can put the join slightly in the future.
                (Utc::now() - joined_at).to_std().map_or(true, |age| age <= *max_age)
            }),
            Filter::MessageWordOrder(word_groups) => self.patterns.evaluate_filter(&message.content, word_groups),
        })
    }

    async fn notify(&self, definition: &AutoResponse, response: &Response, message: &InboundMessage) -> Result<(), Error> {
        let platform = Arc::clone(&self.platform);
        let response = response.clone();
        let guild_id = message.guild_id;
        let jump_url = message.jump_url();
        let text = notification_text(&definition.name, message);

        self.tasks
            .enqueue(format!("notify `{}`", definition.name), async move {
                let recipients = match &response {
                    Response::MessageRoles(role_ids) => platform.users_with_any_roles(guild_id, role_ids).await?,
                    Response::MessageUsers(user_ids) => platform.users_by_ids(guild_id, user_ids).await?,
                };
                debug!("Reporting {jump_url} to {} moderator(s)", recipients.len());
                for user_id in recipients {
                    if let Err(e) = platform.send_direct_message(user_id, &text).await {
                        warn!("Could not DM report of {jump_url} to user {user_id}: {e}");
                    }
                }
                Ok(())
            })
            .await
    }

    async fn definitions(&self) -> Arc<Vec<AutoResponse>> {
        let mut cached = self.cached.lock().await;
        if let Some(c) = cached.as_ref() {
            if c.loaded_at.elapsed() < self.refresh_interval {
                return Arc::clone(&c.definitions);
            }
        }

        match self.store.auto_responses().await {
            Ok(definitions) => {
                let definitions = Arc::new(definitions);
                *cached = Some(CachedDefinitions {
                    loaded_at: Instant::now(),
                    definitions: Arc::clone(&definitions),
                });
                definitions
            }
            Err(e) => {
                warn!("Could not load auto responses: {e}");
                cached
                    .as_ref()
                    .map(|c| Arc::clone(&c.definitions))
                    .unwrap_or_default()
            }
        }
    }
}

/// DM body sent to moderators for a triggered auto response.
pub fn notification_text(name: &str, message: &InboundMessage) -> String {
    format!(
        "[AutoResponse {name}] {} said {}:\n{}",
        message.author_mention(),
        message.jump_url(),
        message.content
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::message_in;

    #[test]
    fn formats_notifications() {
        let msg = message_in(5, "anyone play subnautica with me?");
        assert_eq!(
            notification_text("lfg", &msg),
            "[AutoResponse lfg] <@42> said https://discord.com/channels/1000/5/7:\nanyone play subnautica with me?"
        );
    }
}
