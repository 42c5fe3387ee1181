//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::RegistrySnapshot;

/// Persistence contract for the registry snapshot.
///
/// The snapshot is read whole at startup and overwritten whole after every
/// mutation; implementations never see partial updates.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Returns `Ok(None)` when nothing has been persisted yet.
    async fn load(&self) -> anyhow::Result<Option<RegistrySnapshot>>;
    async fn save(&self, snapshot: &RegistrySnapshot) -> anyhow::Result<()>;
}

/// Outbound calls into the chat platform.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Adds the bot's own reaction to a message.
    async fn react(&self, channel_id: &str, message_id: &str, emoji: &str) -> Result<()>;

    /// Current aggregate count for `emoji` on a message, `None` when no user
    /// holds that reaction any more.
    async fn reaction_count(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<Option<u64>>;

    async fn guild_exists(&self, guild_id: &str) -> Result<bool>;

    /// Fails when the user is not a member of the guild.
    async fn fetch_member(&self, guild_id: &str, user_id: &str) -> Result<()>;

    async fn ban_member(&self, guild_id: &str, user_id: &str) -> Result<()>;
}
