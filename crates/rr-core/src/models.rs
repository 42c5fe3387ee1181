//! # Domain Models
//!
//! These structs represent the core entities of reel-review.
//! Field names serialize in camelCase because the same shape is used for the
//! persisted state file and the HTTP API consumed by the review tool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Emoji the bot seeds on every registered upload and counts as a like.
pub const LIKE_EMOJI: &str = "👍";
/// Emoji counted as a dislike.
pub const DISLIKE_EMOJI: &str = "👎";

/// One uploaded video observed in the monitored channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    /// ID of the originating chat message; join key for reactions.
    pub id: String,
    pub url: String,
    pub filename: String,
    /// Display label of the uploader (e.g., "name#0001")
    pub uploaded_by: String,
    /// Stable uploader ID used for moderation actions
    pub user_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub likes: u64,
    pub dislikes: u64,
}

/// Everything needed to register an upload. Counters always start at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVideo {
    pub id: String,
    pub url: String,
    pub filename: String,
    pub uploaded_by: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

impl From<NewVideo> for VideoRecord {
    fn from(video: NewVideo) -> Self {
        Self {
            id: video.id,
            url: video.url,
            filename: video.filename,
            uploaded_by: video.uploaded_by,
            user_id: video.user_id,
            timestamp: video.timestamp,
            likes: 0,
            dislikes: 0,
        }
    }
}

/// The full persisted state of the registry.
///
/// `last_viewed_video_index` is the index of the next unseen video; a value
/// equal to `video_urls.len()` means everything has been reviewed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    #[serde(default)]
    pub video_urls: Vec<VideoRecord>,
    #[serde(default)]
    pub last_viewed_video_index: usize,
}

/// Which of the two tracked reactions a vote event represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Like,
    Dislike,
}

impl Polarity {
    /// Maps a reaction emoji to a polarity. Any other emoji is not tracked.
    pub fn from_emoji(emoji: &str) -> Option<Self> {
        match emoji {
            LIKE_EMOJI => Some(Self::Like),
            DISLIKE_EMOJI => Some(Self::Dislike),
            _ => None,
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Like => LIKE_EMOJI,
            Self::Dislike => DISLIKE_EMOJI,
        }
    }
}

/// Target of a mark-as-viewed request.
///
/// A valid `index` wins; otherwise `video_id` is looked up. An `index` that
/// is not an integral number (a string, `true`, `1.5`) is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSelector {
    #[serde(default, deserialize_with = "lenient_index")]
    pub index: Option<i64>,
    pub video_id: Option<String>,
}

fn lenient_index<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(integral))
}

fn integral(value: &serde_json::Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    // 1.0 is a valid position; 1.5 is not.
    value
        .as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
        .map(|f| f as i64)
}

impl ViewSelector {
    pub fn by_index(index: i64) -> Self {
        Self {
            index: Some(index),
            video_id: None,
        }
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            index: None,
            video_id: Some(id.into()),
        }
    }
}
