//! # rr-discord-gateway
//!
//! Discord gateway ingestion. A single shard listens for message and reaction
//! events, translates them into `PlatformEvent`s and feeds them to the
//! `EventHandler` one at a time, in arrival order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rr_core::events::{
    Attachment, Author, EventHandler, PlatformEvent, ReactionAdded, ReactionRemoved, UploadObserved,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};
use twilight_gateway::{Event, EventTypeFlags, Intents, Shard, ShardId, StreamExt as _};
use twilight_model::channel::message::EmojiReactionType;
use twilight_model::channel::Message;
use twilight_model::gateway::GatewayReaction;
use twilight_model::id::marker::UserMarker;
use twilight_model::id::Id;

/// Guild metadata, messages with their attachments, and reactions.
/// `MESSAGE_CONTENT` is privileged and must be enabled for the bot.
pub const INTENTS: Intents = Intents::GUILDS
    .union(Intents::GUILD_MESSAGES)
    .union(Intents::GUILD_MESSAGE_REACTIONS)
    .union(Intents::MESSAGE_CONTENT);

const WANTED: EventTypeFlags = EventTypeFlags::READY
    .union(EventTypeFlags::MESSAGE_CREATE)
    .union(EventTypeFlags::REACTION_ADD)
    .union(EventTypeFlags::REACTION_REMOVE);

pub struct DiscordGateway {
    shard: Shard,
    events: Arc<EventHandler>,
    /// Learned from READY; reactions by this user are the bot's own seeds.
    bot_user: Option<Id<UserMarker>>,
}

impl DiscordGateway {
    pub fn new(token: &SecretString, events: Arc<EventHandler>) -> Self {
        let shard = Shard::new(ShardId::ONE, token.expose_secret().to_string(), INTENTS);
        Self {
            shard,
            events,
            bot_user: None,
        }
    }

    /// Runs until the shard closes for good. Reconnects are handled by the shard.
    pub async fn run(mut self) {
        info!("connecting to the Discord gateway");

        while let Some(item) = self.shard.next_event(WANTED).await {
            let event = match item {
                Ok(event) => event,
                Err(source) => {
                    warn!(?source, "error receiving gateway event");
                    continue;
                }
            };

            if let Event::Ready(ready) = &event {
                info!(user_id = %ready.user.id, "gateway session ready");
                self.bot_user = Some(ready.user.id);
                continue;
            }

            let Some(translated) = translate(&event, self.bot_user) else {
                continue;
            };
            let outcome = self.events.handle(translated).await;
            debug!(?outcome, "gateway event handled");
        }

        warn!("gateway shard closed");
    }
}

/// Maps the gateway events the registry cares about. Everything else is `None`.
pub fn translate(event: &Event, bot_user: Option<Id<UserMarker>>) -> Option<PlatformEvent> {
    match event {
        Event::MessageCreate(message) => Some(upload_observed(&message.0)),
        Event::ReactionAdd(reaction) => {
            let r = &reaction.0;
            Some(PlatformEvent::ReactionAdded(ReactionAdded {
                channel_id: r.channel_id.to_string(),
                message_id: r.message_id.to_string(),
                emoji: emoji_key(&r.emoji),
                actor_is_bot: actor_is_bot(r, bot_user),
            }))
        }
        Event::ReactionRemove(reaction) => {
            let r = &reaction.0;
            // The gateway does not carry the remaining aggregate; the handler fetches it.
            Some(PlatformEvent::ReactionRemoved(ReactionRemoved {
                channel_id: r.channel_id.to_string(),
                message_id: r.message_id.to_string(),
                emoji: emoji_key(&r.emoji),
                actor_is_bot: actor_is_bot(r, bot_user),
                live_count: None,
            }))
        }
        _ => None,
    }
}

fn upload_observed(message: &Message) -> PlatformEvent {
    let attachments = message
        .attachments
        .iter()
        .map(|a| Attachment {
            content_type: a.content_type.clone(),
            url: a.url.clone(),
            filename: a.filename.clone(),
        })
        .collect();

    PlatformEvent::UploadObserved(UploadObserved {
        channel_id: message.channel_id.to_string(),
        message_id: message.id.to_string(),
        author: Author {
            id: message.author.id.to_string(),
            tag: author_tag(&message.author.name, message.author.discriminator),
            bot: message.author.bot,
        },
        attachments,
        created_at: utc_from_micros(message.timestamp.as_micros()),
    })
}

fn actor_is_bot(reaction: &GatewayReaction, bot_user: Option<Id<UserMarker>>) -> bool {
    bot_user == Some(reaction.user_id)
        || reaction.member.as_ref().is_some_and(|m| m.user.bot)
}

/// "name#1234" for legacy accounts; plain "name" once discriminators are gone (0).
pub fn author_tag(name: &str, discriminator: u16) -> String {
    if discriminator == 0 {
        name.to_string()
    } else {
        format!("{name}#{discriminator:04}")
    }
}

/// Unicode emoji compare by their character; custom emoji as "name:id".
pub fn emoji_key(emoji: &EmojiReactionType) -> String {
    match emoji {
        EmojiReactionType::Unicode { name } => name.clone(),
        EmojiReactionType::Custom { id, name, .. } => {
            format!("{}:{id}", name.as_deref().unwrap_or_default())
        }
    }
}

fn utc_from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_else(|| {
        warn!(micros, "message timestamp out of range, using receive time");
        Utc::now()
    })
}
