// File: modbot-core/src/test_utils/helpers.rs

use chrono::{DateTime, Duration, Utc};

use modbot_common::models::InboundMessage;

pub const TEST_GUILD: u64 = 1000;
pub const TEST_AUTHOR: u64 = 42;

/// A guild message from a human who joined a week before it was sent.
pub fn message_in(channel_id: u64, content: &str) -> InboundMessage {
    let timestamp = Utc::now();
    InboundMessage {
        guild_id: TEST_GUILD,
        channel_id,
        message_id: 7,
        author_id: TEST_AUTHOR,
        author_name: "newcomer".to_string(),
        author_is_bot: false,
        author_joined_at: Some(timestamp - Duration::days(7)),
        content: content.to_string(),
        timestamp,
    }
}

pub fn joined_at(message: InboundMessage, joined: Option<DateTime<Utc>>) -> InboundMessage {
    InboundMessage {
        author_joined_at: joined,
        ..message
    }
}
