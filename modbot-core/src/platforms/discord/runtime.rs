use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use twilight_http::Client as HttpClient;
use twilight_http::client::ClientBuilder;
use twilight_model::channel::Message;
use twilight_model::channel::message::Embed;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, RoleMarker, UserMarker};
use twilight_model::util::Timestamp;
use twilight_util::builder::embed::{EmbedBuilder, EmbedFieldBuilder, EmbedFooterBuilder, ImageSource};

use modbot_common::error::Error;
use modbot_common::models::{MotdMessage, PostedMessage};
use modbot_common::traits::ChatPlatform;

/// Messages per history page; the API maximum.
const PAGE_SIZE: u16 = 100;
/// Members fetched when resolving roles.
const MEMBER_LIMIT: u16 = 1000;
/// Anything after this id is the whole channel.
const EARLIEST_MESSAGE: Id<MessageMarker> = Id::new(1);

/// [`ChatPlatform`] over the Discord REST API.
pub struct DiscordPlatform {
    http: Arc<HttpClient>,
}

impl DiscordPlatform {
    pub fn new(token: String) -> Self {
        let http = ClientBuilder::new()
            .token(token)
            .timeout(Duration::from_secs(30))
            .build();
        Self { http: Arc::new(http) }
    }

    pub fn from_client(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub fn http(&self) -> Arc<HttpClient> {
        Arc::clone(&self.http)
    }

    async fn history_page(
        &self,
        channel_id: Id<ChannelMarker>,
        before: Option<Id<MessageMarker>>,
    ) -> Result<Vec<Message>, Error> {
        let response = match before {
            Some(before) => {
                self.http
                    .channel_messages(channel_id)
                    .before(before)
                    .limit(PAGE_SIZE)
                    .await
            }
            None => self.http.channel_messages(channel_id).limit(PAGE_SIZE).await,
        }
        .map_err(|e| Error::Platform(format!("Error fetching history of channel {channel_id}: {e}")))?;

        response
            .models()
            .await
            .map_err(|e| Error::Platform(format!("Error decoding history of channel {channel_id}: {e}")))
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    /// Walks the history newest-first and deletes one message at a time, so
    /// messages past the bulk-delete window are handled too.
    async fn delete_old_messages(
        &self,
        channel_id: u64,
        age: Duration,
        cancel: CancellationToken,
    ) -> Result<usize, Error> {
        let channel: Id<ChannelMarker> = to_id(channel_id)?;
        let cutoff = Utc::now() - chrono::Duration::from_std(age)?;
        let mut before = None;
        let mut deleted = 0;

        loop {
            if cancel.is_cancelled() {
                break;
            }
            let page = self.history_page(channel, before).await?;
            let Some(last) = page.last() else {
                break;
            };
            before = Some(last.id);

            for message in &page {
                if cancel.is_cancelled() {
                    debug!("Cleanup of channel {channel_id} interrupted after {deleted} deletion(s)");
                    return Ok(deleted);
                }
                if to_datetime(message.timestamp).is_none_or(|sent| sent >= cutoff) {
                    continue;
                }
                self.http
                    .delete_message(channel, message.id)
                    .await
                    .map_err(|e| Error::Platform(format!("Error deleting message {} in {channel_id}: {e}", message.id)))?;
                trace!("Deleted message {} from channel {channel_id}", message.id);
                deleted += 1;
            }

            if page.len() < usize::from(PAGE_SIZE) {
                break;
            }
        }

        if deleted > 0 {
            info!("Deleted {deleted} message(s) older than {cutoff} from channel {channel_id}");
        }
        Ok(deleted)
    }

    async fn send_direct_message(&self, user_id: u64, content: &str) -> Result<(), Error> {
        let user: Id<UserMarker> = to_id(user_id)?;
        let channel = self
            .http
            .create_private_channel(user)
            .await
            .map_err(|e| Error::Platform(format!("Error opening DM with user {user_id}: {e}")))?
            .model()
            .await
            .map_err(|e| Error::Platform(format!("Error decoding DM channel for user {user_id}: {e}")))?;

        self.http
            .create_message(channel.id)
            .content(content)
            .await
            .map_err(|e| Error::Platform(format!("Error sending DM to user {user_id}: {e}")))?;
        Ok(())
    }

    async fn users_with_any_roles(&self, guild_id: u64, role_ids: &[u64]) -> Result<Vec<u64>, Error> {
        let guild: Id<GuildMarker> = to_id(guild_id)?;
        let wanted: Vec<Id<RoleMarker>> = role_ids.iter().filter_map(|id| Id::new_checked(*id)).collect();

        let members = self
            .http
            .guild_members(guild)
            .limit(MEMBER_LIMIT)
            .await
            .map_err(|e| Error::Platform(format!("Error listing members of guild {guild_id}: {e}")))?
            .models()
            .await
            .map_err(|e| Error::Platform(format!("Error decoding members of guild {guild_id}: {e}")))?;

        Ok(members
            .into_iter()
            .filter(|m| m.roles.iter().any(|role| wanted.contains(role)))
            .map(|m| m.user.id.get())
            .collect())
    }

    async fn users_by_ids(&self, guild_id: u64, user_ids: &[u64]) -> Result<Vec<u64>, Error> {
        let guild: Id<GuildMarker> = to_id(guild_id)?;
        let mut found = Vec::with_capacity(user_ids.len());
        for &user_id in user_ids {
            let Some(user) = Id::<UserMarker>::new_checked(user_id) else {
                continue;
            };
            match self.http.guild_member(guild, user).await {
                Ok(_) => found.push(user_id),
                Err(e) => debug!("User {user_id} not resolvable in guild {guild_id}: {e}"),
            }
        }
        Ok(found)
    }

    async fn bot_user_id(&self) -> Result<u64, Error> {
        let user = self
            .http
            .current_user()
            .await
            .map_err(|e| Error::Platform(format!("Error fetching current user: {e}")))?
            .model()
            .await
            .map_err(|e| Error::Platform(format!("Error decoding current user: {e}")))?;
        Ok(user.id.get())
    }

    async fn oldest_messages(&self, channel_id: u64, limit: usize) -> Result<Vec<PostedMessage>, Error> {
        let channel: Id<ChannelMarker> = to_id(channel_id)?;
        let limit = u16::try_from(limit).unwrap_or(PAGE_SIZE).min(PAGE_SIZE);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut messages = self
            .http
            .channel_messages(channel)
            .after(EARLIEST_MESSAGE)
            .limit(limit)
            .await
            .map_err(|e| Error::Platform(format!("Error fetching oldest messages of channel {channel_id}: {e}")))?
            .models()
            .await
            .map_err(|e| Error::Platform(format!("Error decoding oldest messages of channel {channel_id}: {e}")))?;
        messages.sort_by_key(|m| m.id);

        Ok(messages
            .into_iter()
            .map(|m| PostedMessage {
                message_id: m.id.get(),
                author_id: m.author.id.get(),
            })
            .collect())
    }

    async fn post_embed(&self, channel_id: u64, embed: &MotdMessage) -> Result<u64, Error> {
        let channel: Id<ChannelMarker> = to_id(channel_id)?;
        let embeds = [to_embed(embed)?];
        let message = self
            .http
            .create_message(channel)
            .embeds(&embeds)
            .await
            .map_err(|e| Error::Platform(format!("Error posting embed to channel {channel_id}: {e}")))?
            .model()
            .await
            .map_err(|e| Error::Platform(format!("Error decoding posted embed in channel {channel_id}: {e}")))?;
        Ok(message.id.get())
    }

    async fn edit_embed(&self, channel_id: u64, message_id: u64, embed: &MotdMessage) -> Result<(), Error> {
        let channel: Id<ChannelMarker> = to_id(channel_id)?;
        let message: Id<MessageMarker> = to_id(message_id)?;
        let embeds = [to_embed(embed)?];
        self.http
            .update_message(channel, message)
            .content(None)
            .embeds(Some(embeds.as_slice()))
            .await
            .map_err(|e| Error::Platform(format!("Error editing message {message_id} in channel {channel_id}: {e}")))?;
        Ok(())
    }
}

/// Builds the Discord embed for one MOTD; empty strings leave the part out.
fn to_embed(message: &MotdMessage) -> Result<Embed, Error> {
    let mut builder = EmbedBuilder::new().color(message.color_value()?);
    if !message.title.is_empty() {
        builder = builder.title(message.title.as_str());
    }
    if !message.description.is_empty() {
        builder = builder.description(message.description.as_str());
    }
    if !message.url.is_empty() {
        builder = builder.url(message.url.as_str());
    }
    if !message.image_url.is_empty() {
        builder = builder.image(image_source(&message.image_url)?);
    }
    if !message.thumbnail_url.is_empty() {
        builder = builder.thumbnail(image_source(&message.thumbnail_url)?);
    }
    if !message.footer.is_empty() {
        let mut footer = EmbedFooterBuilder::new(message.footer.as_str());
        if !message.footer_icon_url.is_empty() {
            footer = footer.icon_url(image_source(&message.footer_icon_url)?);
        }
        builder = builder.footer(footer);
    }
    for field in &message.fields {
        let mut built = EmbedFieldBuilder::new(field.name.as_str(), field.content.as_str());
        if field.inline {
            built = built.inline();
        }
        builder = builder.field(built);
    }

    builder
        .validate()
        .map(EmbedBuilder::build)
        .map_err(|e| Error::InvalidDefinition(format!("MOTD `{}` is not a valid embed: {e}", message.title)))
}

fn image_source(url: &str) -> Result<ImageSource, Error> {
    ImageSource::url(url).map_err(|e| Error::InvalidDefinition(format!("MOTD image `{url}`: {e}")))
}

fn to_id<T>(raw: u64) -> Result<Id<T>, Error> {
    Id::new_checked(raw).ok_or_else(|| Error::Platform(format!("invalid Discord id `{raw}`")))
}

pub(crate) fn to_datetime(timestamp: Timestamp) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros(timestamp.as_micros())
}
