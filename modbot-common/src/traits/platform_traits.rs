use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::models::{MotdMessage, PostedMessage};

/// The operations moderation needs from a chat platform.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Deletes every message in `channel_id` older than `age`. Returns how many
    /// messages were removed. Implementations should stop early once `cancel`
    /// fires.
    async fn delete_old_messages(
        &self,
        channel_id: u64,
        age: Duration,
        cancel: CancellationToken,
    ) -> Result<usize, Error>;

    /// Sends a private message to a user.
    async fn send_direct_message(&self, user_id: u64, content: &str) -> Result<(), Error>;

    /// Members of `guild_id` holding at least one of `role_ids`.
    async fn users_with_any_roles(&self, guild_id: u64, role_ids: &[u64]) -> Result<Vec<u64>, Error>;

    /// The subset of `user_ids` that are members of `guild_id`.
    async fn users_by_ids(&self, guild_id: u64, user_ids: &[u64]) -> Result<Vec<u64>, Error>;

    /// User id the bot itself posts as.
    async fn bot_user_id(&self) -> Result<u64, Error>;

    /// Up to `limit` of the oldest messages in `channel_id`, oldest first.
    async fn oldest_messages(&self, channel_id: u64, limit: usize) -> Result<Vec<PostedMessage>, Error>;

    /// Posts `embed` to `channel_id` and returns the new message id.
    async fn post_embed(&self, channel_id: u64, embed: &MotdMessage) -> Result<u64, Error>;

    /// Replaces the content of one of the bot's own messages with `embed`.
    async fn edit_embed(&self, channel_id: u64, message_id: u64, embed: &MotdMessage) -> Result<(), Error>;
}
