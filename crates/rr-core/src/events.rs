//! # Platform Events
//!
//! Inbound chat-platform events and the facade that turns them into registry
//! transitions. The gateway (or an external relay) delivers events one at a time; filtering
//! (monitored channel, bot actors, video attachments, tracked emoji) happens
//! here so the registry only ever sees events it should apply.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::{NewVideo, Polarity, DISLIKE_EMOJI, LIKE_EMOJI};
use crate::registry::SharedRegistry;
use crate::traits::ChatPlatform;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    /// Display label, e.g. "name#0001"
    pub tag: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub content_type: Option<String>,
    pub url: String,
    pub filename: String,
}

impl Attachment {
    /// True when the declared content type starts with `video/`.
    /// The comparison is case-sensitive, as the platform reports lowercase types.
    pub fn is_video(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("video/"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadObserved {
    pub channel_id: String,
    pub message_id: String,
    pub author: Author,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionAdded {
    pub channel_id: String,
    pub message_id: String,
    pub emoji: String,
    #[serde(default)]
    pub actor_is_bot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRemoved {
    pub channel_id: String,
    pub message_id: String,
    pub emoji: String,
    #[serde(default)]
    pub actor_is_bot: bool,
    /// Aggregate the relay observed at removal time. When absent the handler
    /// asks the platform for it.
    #[serde(default)]
    pub live_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    UploadObserved(UploadObserved),
    ReactionAdded(ReactionAdded),
    ReactionRemoved(ReactionRemoved),
}

/// What the handler did with an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum EventOutcome {
    Registered,
    Duplicate,
    VoteApplied,
    VoteResynced,
    Ignored(&'static str),
}

pub struct EventHandler {
    registry: SharedRegistry,
    platform: Arc<dyn ChatPlatform>,
    channel_id: String,
}

impl EventHandler {
    pub fn new(
        registry: SharedRegistry,
        platform: Arc<dyn ChatPlatform>,
        channel_id: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            platform,
            channel_id: channel_id.into(),
        }
    }

    pub async fn handle(&self, event: PlatformEvent) -> EventOutcome {
        match event {
            PlatformEvent::UploadObserved(e) => self.on_upload(e).await,
            PlatformEvent::ReactionAdded(e) => self.on_reaction_added(e).await,
            PlatformEvent::ReactionRemoved(e) => self.on_reaction_removed(e).await,
        }
    }

    async fn on_upload(&self, event: UploadObserved) -> EventOutcome {
        if event.author.bot {
            return EventOutcome::Ignored("bot author");
        }
        if event.channel_id != self.channel_id {
            return EventOutcome::Ignored("unmonitored channel");
        }
        let Some(attachment) = event.attachments.into_iter().find(Attachment::is_video) else {
            return EventOutcome::Ignored("no video attachment");
        };

        let video = NewVideo {
            id: event.message_id.clone(),
            url: attachment.url,
            filename: attachment.filename,
            uploaded_by: event.author.tag,
            user_id: event.author.id,
            timestamp: event.created_at,
        };

        let inserted = self.registry.lock().await.register(video).await;
        if !inserted {
            return EventOutcome::Duplicate;
        }

        // Seed both vote options; order matters to the platform UI.
        for emoji in [LIKE_EMOJI, DISLIKE_EMOJI] {
            if let Err(e) = self
                .platform
                .react(&event.channel_id, &event.message_id, emoji)
                .await
            {
                warn!(message_id = %event.message_id, emoji, error = %e, "failed to add reaction");
                break;
            }
        }

        EventOutcome::Registered
    }

    async fn on_reaction_added(&self, event: ReactionAdded) -> EventOutcome {
        let Some(polarity) = self.accept_reaction(&event.channel_id, &event.emoji, event.actor_is_bot)
        else {
            return EventOutcome::Ignored("untracked reaction");
        };

        let applied = self
            .registry
            .lock()
            .await
            .apply_vote_delta(&event.message_id, polarity)
            .await;

        if applied {
            info!(message_id = %event.message_id, ?polarity, "reaction added");
            EventOutcome::VoteApplied
        } else {
            EventOutcome::Ignored("unknown message")
        }
    }

    async fn on_reaction_removed(&self, event: ReactionRemoved) -> EventOutcome {
        let Some(polarity) = self.accept_reaction(&event.channel_id, &event.emoji, event.actor_is_bot)
        else {
            return EventOutcome::Ignored("untracked reaction");
        };

        if self.registry.lock().await.find(&event.message_id).is_none() {
            return EventOutcome::Ignored("unknown message");
        }

        // Trust the platform's aggregate; local state never saw every reactor.
        let observed = match event.live_count {
            Some(count) => Some(count),
            None => match self
                .platform
                .reaction_count(&event.channel_id, &event.message_id, &event.emoji)
                .await
            {
                Ok(count) => count,
                Err(e) => {
                    warn!(message_id = %event.message_id, error = %e, "failed to fetch live reaction count");
                    return EventOutcome::Ignored("live count unavailable");
                }
            },
        };

        let applied = self
            .registry
            .lock()
            .await
            .reset_vote_to_count(&event.message_id, polarity, observed)
            .await;

        if applied {
            info!(message_id = %event.message_id, ?polarity, ?observed, "reaction removed");
            EventOutcome::VoteResynced
        } else {
            EventOutcome::Ignored("unknown message")
        }
    }

    fn accept_reaction(&self, channel_id: &str, emoji: &str, actor_is_bot: bool) -> Option<Polarity> {
        if actor_is_bot || channel_id != self.channel_id {
            return None;
        }
        Polarity::from_emoji(emoji)
    }
}
