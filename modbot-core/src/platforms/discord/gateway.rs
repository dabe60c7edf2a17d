use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use twilight_gateway::{self as gateway, CloseFrame, Config, Event, EventTypeFlags, Intents, Shard, StreamExt};
use twilight_http::Client as HttpClient;
use twilight_model::gateway::payload::incoming::MessageCreate;

use modbot_common::error::Error;
use modbot_common::models::InboundMessage;

use crate::platforms::discord::runtime::to_datetime;
use crate::services::AutoResponseService;

pub const INTENTS: Intents = Intents::GUILDS
    .union(Intents::GUILD_MESSAGES)
    .union(Intents::GUILD_MEMBERS)
    .union(Intents::MESSAGE_CONTENT);

/// Connects the recommended number of shards and feeds every guild message to
/// `service` until `cancel` fires.
pub async fn run_gateway(
    token: String,
    http: Arc<HttpClient>,
    service: Arc<AutoResponseService>,
    cancel: CancellationToken,
) -> Result<(), Error> {
    let config = Config::new(token, INTENTS);
    let shards = gateway::create_recommended(&http, config, |_, builder| builder.build())
        .await
        .map_err(|e| Error::Platform(format!("create_recommended error: {e}")))?;

    let mut runners = JoinSet::new();
    for shard in shards {
        runners.spawn(shard_runner(shard, Arc::clone(&service), cancel.clone()));
    }
    info!("Discord gateway connected with {} shard(s)", runners.len());

    while let Some(result) = runners.join_next().await {
        if let Err(e) = result {
            error!("Shard runner panicked: {e}");
        }
    }
    info!("Discord gateway disconnected");
    Ok(())
}

async fn shard_runner(mut shard: Shard, service: Arc<AutoResponseService>, cancel: CancellationToken) {
    let shard_id = shard.id().number();
    let wanted = EventTypeFlags::READY | EventTypeFlags::MESSAGE_CREATE;

    loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => None,
            item = shard.next_event(wanted) => item,
        };
        let Some(item) = item else {
            break;
        };
        match item {
            Ok(Event::Ready(ready)) => {
                info!("Shard {shard_id} => READY as {} (ID={})", ready.user.name, ready.user.id);
            }
            Ok(Event::MessageCreate(message)) => {
                let Some(inbound) = to_inbound(&message) else {
                    continue;
                };
                match service.moderate(&inbound).await {
                    Ok(triggered) if !triggered.is_empty() => {
                        debug!("Message {} triggered {triggered:?}", inbound.message_id);
                    }
                    Ok(_) => {}
                    Err(e) => error!("Moderation of message {} failed: {e}", inbound.message_id),
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Shard {shard_id} => error receiving event: {e}"),
        }
    }

    if cancel.is_cancelled() {
        shard.close(CloseFrame::NORMAL);
        while let Some(item) = shard.next_event(EventTypeFlags::empty()).await {
            if matches!(item, Ok(Event::GatewayClose(_)) | Err(_)) {
                break;
            }
        }
    }
    info!("Shard {shard_id} event loop ended");
}

/// Guild messages only; DMs carry no guild to moderate.
pub fn to_inbound(message: &MessageCreate) -> Option<InboundMessage> {
    let guild_id = message.guild_id?;
    Some(InboundMessage {
        guild_id: guild_id.get(),
        channel_id: message.channel_id.get(),
        message_id: message.id.get(),
        author_id: message.author.id.get(),
        author_name: message.author.name.clone(),
        author_is_bot: message.author.bot,
        author_joined_at: message
            .member
            .as_ref()
            .and_then(|member| member.joined_at)
            .and_then(to_datetime),
        content: message.content.clone(),
        timestamp: to_datetime(message.timestamp).unwrap_or_else(Utc::now),
    })
}
