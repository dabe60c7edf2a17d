use chrono::{DateTime, Utc};

/// Platform-neutral view of a chat message, as the moderation code sees it.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub guild_id: u64,
    pub channel_id: u64,
    pub message_id: u64,
    pub author_id: u64,
    pub author_name: String,
    pub author_is_bot: bool,
    /// When the author joined the guild, if the platform reported it.
    pub author_joined_at: Option<DateTime<Utc>>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    /// Discord-style link pointing at the message.
    pub fn jump_url(&self) -> String {
        format!(
            "https://discord.com/channels/{}/{}/{}",
            self.guild_id, self.channel_id, self.message_id
        )
    }

    pub fn author_mention(&self) -> String {
        format!("<@{}>", self.author_id)
    }
}

/// A message already in a channel, as far as MOTD upkeep cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostedMessage {
    pub message_id: u64,
    pub author_id: u64,
}
