// File: modbot-core/src/test_utils/fake_platform.rs

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use modbot_common::error::Error;
use modbot_common::models::{MotdMessage, PostedMessage};
use modbot_common::traits::ChatPlatform;

/// User id the fake bot posts as.
pub const BOT_USER_ID: u64 = 7;

/// Scriptable in-memory [`ChatPlatform`] that records what it was asked to do.
#[derive(Debug, Default)]
pub struct FakePlatform {
    deletable: DashMap<u64, usize>,
    delete_failures: DashMap<u64, u32>,
    delete_calls: DashMap<u64, u32>,
    role_members: DashMap<u64, Vec<u64>>,
    members: DashSet<u64>,
    dm_failures: DashSet<u64>,
    sent: Mutex<Vec<(u64, String)>>,
    channels: DashMap<u64, Vec<ChannelEntry>>,
    next_message_id: AtomicU64,
    embed_posts: AtomicUsize,
    embed_edits: AtomicUsize,
}

#[derive(Debug, Clone)]
struct ChannelEntry {
    message_id: u64,
    author_id: u64,
    embed: Option<MotdMessage>,
}

impl FakePlatform {
    /// Each successful cleanup of `channel_id` reports `count` deletions.
    pub fn set_deletable(&self, channel_id: u64, count: usize) {
        self.deletable.insert(channel_id, count);
    }

    /// The next `times` cleanups of `channel_id` fail.
    pub fn fail_deletes_for(&self, channel_id: u64, times: u32) {
        self.delete_failures.insert(channel_id, times);
    }

    pub fn delete_calls(&self, channel_id: u64) -> u32 {
        self.delete_calls.get(&channel_id).map(|c| *c).unwrap_or(0)
    }

    pub fn add_member(&self, user_id: u64, roles: &[u64]) {
        self.members.insert(user_id);
        for role in roles {
            self.role_members.entry(*role).or_default().push(user_id);
        }
    }

    pub fn fail_dms_to(&self, user_id: u64) {
        self.dm_failures.insert(user_id);
    }

    /// Direct messages sent so far, in order.
    pub fn sent_messages(&self) -> Vec<(u64, String)> {
        self.sent.lock().clone()
    }

    /// Appends a plain message by `author_id` to `channel_id`.
    pub fn post_as(&self, channel_id: u64, author_id: u64) -> u64 {
        self.push(channel_id, author_id, None)
    }

    /// Embeds in `channel_id`, oldest first; `None` for messages without one.
    pub fn channel_embeds(&self, channel_id: u64) -> Vec<Option<MotdMessage>> {
        self.channels
            .get(&channel_id)
            .map(|entries| entries.iter().map(|e| e.embed.clone()).collect())
            .unwrap_or_default()
    }

    pub fn embed_posts(&self) -> usize {
        self.embed_posts.load(Ordering::SeqCst)
    }

    pub fn embed_edits(&self) -> usize {
        self.embed_edits.load(Ordering::SeqCst)
    }

    fn push(&self, channel_id: u64, author_id: u64, embed: Option<MotdMessage>) -> u64 {
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.channels.entry(channel_id).or_default().push(ChannelEntry {
            message_id,
            author_id,
            embed,
        });
        message_id
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn delete_old_messages(
        &self,
        channel_id: u64,
        _age: Duration,
        _cancel: CancellationToken,
    ) -> Result<usize, Error> {
        *self.delete_calls.entry(channel_id).or_insert(0) += 1;
        if let Some(mut remaining) = self.delete_failures.get_mut(&channel_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::Platform(format!("channel {channel_id} unavailable")));
            }
        }
        Ok(self.deletable.get(&channel_id).map(|c| *c).unwrap_or(0))
    }

    async fn send_direct_message(&self, user_id: u64, content: &str) -> Result<(), Error> {
        if self.dm_failures.contains(&user_id) {
            return Err(Error::Platform(format!("user {user_id} does not accept DMs")));
        }
        self.sent.lock().push((user_id, content.to_string()));
        Ok(())
    }

    async fn users_with_any_roles(&self, _guild_id: u64, role_ids: &[u64]) -> Result<Vec<u64>, Error> {
        let mut users: Vec<u64> = role_ids
            .iter()
            .filter_map(|role| self.role_members.get(role).map(|m| m.clone()))
            .flatten()
            .collect();
        users.sort_unstable();
        users.dedup();
        Ok(users)
    }

    async fn users_by_ids(&self, _guild_id: u64, user_ids: &[u64]) -> Result<Vec<u64>, Error> {
        Ok(user_ids.iter().copied().filter(|id| self.members.contains(id)).collect())
    }

    async fn bot_user_id(&self) -> Result<u64, Error> {
        Ok(BOT_USER_ID)
    }

    async fn oldest_messages(&self, channel_id: u64, limit: usize) -> Result<Vec<PostedMessage>, Error> {
        Ok(self
            .channels
            .get(&channel_id)
            .map(|entries| {
                entries
                    .iter()
                    .take(limit)
                    .map(|e| PostedMessage {
                        message_id: e.message_id,
                        author_id: e.author_id,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn post_embed(&self, channel_id: u64, embed: &MotdMessage) -> Result<u64, Error> {
        self.embed_posts.fetch_add(1, Ordering::SeqCst);
        Ok(self.push(channel_id, BOT_USER_ID, Some(embed.clone())))
    }

    async fn edit_embed(&self, channel_id: u64, message_id: u64, embed: &MotdMessage) -> Result<(), Error> {
        let mut entries = self
            .channels
            .get_mut(&channel_id)
            .ok_or_else(|| Error::NotFound(format!("channel {channel_id}")))?;
        let entry = entries
            .iter_mut()
            .find(|e| e.message_id == message_id)
            .ok_or_else(|| Error::NotFound(format!("message {message_id} in channel {channel_id}")))?;
        if entry.author_id != BOT_USER_ID {
            return Err(Error::Platform(format!("cannot edit message {message_id} authored by {}", entry.author_id)));
        }
        entry.embed = Some(embed.clone());
        self.embed_edits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
