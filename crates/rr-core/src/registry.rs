//! # Video Registry
//!
//! Owns the ordered list of video records and the "last viewed" cursor.
//!
//! Every mutation rewrites the full snapshot through the injected
//! [`SnapshotStore`] before returning. Save failures are logged and
//! swallowed: in-memory state stays authoritative until the next successful
//! save, so a crash can lose at most the mutation whose save failed.
//!
//! Records are never re-sorted or removed; list order is arrival order and is
//! the only ordering used for indexing.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, Result};
use crate::models::{NewVideo, Polarity, RegistrySnapshot, VideoRecord, ViewSelector};
use crate::traits::SnapshotStore;

/// Handle shared between the event facade and the HTTP handlers.
pub type SharedRegistry = Arc<Mutex<VideoRegistry>>;

pub struct VideoRegistry {
    videos: Vec<VideoRecord>,
    cursor: usize,
    store: Box<dyn SnapshotStore>,
}

impl VideoRegistry {
    /// Creates an empty registry. Call [`VideoRegistry::load`] to restore
    /// persisted state.
    pub fn new(store: Box<dyn SnapshotStore>) -> Self {
        Self {
            videos: Vec::new(),
            cursor: 0,
            store,
        }
    }

    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(Mutex::new(self))
    }

    /// Replaces in-memory state with the persisted snapshot.
    ///
    /// A missing snapshot keeps the empty default; an unreadable one resets to
    /// the empty default. Neither case is an error for the caller.
    pub async fn load(&mut self) {
        match self.store.load().await {
            Ok(Some(snapshot)) => {
                self.videos = snapshot.video_urls;
                self.cursor = snapshot.last_viewed_video_index;
                if self.cursor > self.videos.len() {
                    warn!(
                        cursor = self.cursor,
                        count = self.videos.len(),
                        "persisted cursor past end of list, clamping"
                    );
                    self.cursor = self.videos.len();
                }
                info!(count = self.videos.len(), cursor = self.cursor, "registry state loaded");
            }
            Ok(None) => {
                info!("no persisted registry state found, starting fresh");
            }
            Err(e) => {
                error!(error = %e, "failed to load registry state, starting fresh");
                self.videos.clear();
                self.cursor = 0;
            }
        }
    }

    /// Writes the full snapshot. Failures are logged, never raised.
    pub async fn save(&self) {
        let snapshot = self.snapshot();
        match self.store.save(&snapshot).await {
            Ok(()) => debug!(count = snapshot.video_urls.len(), "registry state saved"),
            Err(e) => error!(error = %e, "failed to save registry state"),
        }
    }

    /// Appends a new record with zeroed counters.
    ///
    /// Registering an ID that is already present is ignored and returns
    /// `false`; the existing record and its counters are left untouched.
    pub async fn register(&mut self, video: NewVideo) -> bool {
        if self.position(&video.id).is_some() {
            debug!(message_id = %video.id, "upload already registered, ignoring");
            return false;
        }

        info!(message_id = %video.id, uploaded_by = %video.uploaded_by, "registering video");
        self.videos.push(video.into());
        self.save().await;
        true
    }

    /// Increments the like or dislike counter. Unknown IDs are ignored.
    pub async fn apply_vote_delta(&mut self, id: &str, polarity: Polarity) -> bool {
        let Some(record) = self.videos.iter_mut().find(|v| v.id == id) else {
            return false;
        };

        *counter_mut(record, polarity) += 1;
        debug!(message_id = %id, ?polarity, likes = record.likes, dislikes = record.dislikes, "vote applied");
        self.save().await;
        true
    }

    /// Resynchronizes a counter with the platform's live aggregate.
    ///
    /// `observed` is the count still held by other users after a removal;
    /// `None` means nobody holds the reaction any more and the counter drops
    /// to zero. Unknown IDs are ignored.
    pub async fn reset_vote_to_count(
        &mut self,
        id: &str,
        polarity: Polarity,
        observed: Option<u64>,
    ) -> bool {
        let Some(record) = self.videos.iter_mut().find(|v| v.id == id) else {
            return false;
        };

        *counter_mut(record, polarity) = observed.unwrap_or(0);
        debug!(message_id = %id, ?polarity, likes = record.likes, dislikes = record.dislikes, "vote resynced");
        self.save().await;
        true
    }

    /// Moves the cursor just past the selected video and returns it.
    pub async fn advance_cursor(&mut self, selector: &ViewSelector) -> Result<usize> {
        let target = self.resolve(selector).ok_or_else(|| {
            AppError::InvalidSelector(format!(
                "video index or ID does not match any of the {} videos",
                self.videos.len()
            ))
        })?;

        if target > self.videos.len() {
            return Err(AppError::InvalidSelector(format!(
                "cursor {target} is past the end of the list"
            )));
        }

        self.cursor = target;
        info!(cursor = target, "cursor advanced");
        self.save().await;
        Ok(target)
    }

    fn resolve(&self, selector: &ViewSelector) -> Option<usize> {
        let by_index = selector
            .index
            .and_then(|i| usize::try_from(i).ok())
            .filter(|&i| i < self.videos.len());

        by_index
            .or_else(|| selector.video_id.as_deref().and_then(|id| self.position(id)))
            .map(|p| p + 1)
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            video_urls: self.videos.clone(),
            last_viewed_video_index: self.cursor,
        }
    }

    pub fn videos(&self) -> &[VideoRecord] {
        &self.videos
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn find(&self, id: &str) -> Option<&VideoRecord> {
        self.videos.iter().find(|v| v.id == id)
    }

    /// Stable ID of the user who uploaded `video_id`.
    pub fn uploader_of(&self, video_id: &str) -> Option<&str> {
        self.find(video_id).map(|v| v.user_id.as_str())
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.videos.iter().position(|v| v.id == id)
    }
}

fn counter_mut(record: &mut VideoRecord, polarity: Polarity) -> &mut u64 {
    match polarity {
        Polarity::Like => &mut record.likes,
        Polarity::Dislike => &mut record.dislikes,
    }
}
