//! # rr-store-json
//!
//! Local filesystem implementation of `SnapshotStore`.
//! The whole registry lives in one pretty-printed JSON document that is read
//! once at startup and replaced after every mutation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use rr_core::models::RegistrySnapshot;
use rr_core::traits::SnapshotStore;
use tokio::fs;

pub struct JsonFileStore {
    /// Target file (e.g., "./state.json")
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file the snapshot is staged in before the rename.
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn load(&self) -> anyhow::Result<Option<RegistrySnapshot>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()));
            }
        };

        let snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(Some(snapshot))
    }

    /// Writes to a staging file and renames it over the target so readers
    /// never observe a half-written document.
    async fn save(&self, snapshot: &RegistrySnapshot) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(snapshot)?;
        let staging = self.staging_path();
        fs::write(&staging, &json)
            .await
            .with_context(|| format!("writing {}", staging.display()))?;
        fs::rename(&staging, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;

        tracing::trace!(path = %self.path.display(), bytes = json.len(), "snapshot written");
        Ok(())
    }
}
