//! Snapshot persistence
//!
//! Snapshots are written atomically: the payload is fully serialized to a
//! temporary file first, then copied over the "latest" file and again to a
//! timestamped history file. A single gate serializes saves and loads; the
//! temp write, the two copies, and history pruning form one logical unit.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use rejoin_core::models::Snapshot;
use rejoin_core::options::SnapshotOptions;

use crate::error::{StoreError, StoreResult};

const HISTORY_PREFIX: &str = "snapshot-";
const HISTORY_SUFFIX: &str = ".json";

/// Durable storage for reconciliation snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist a snapshot, replacing the latest and appending to history.
    async fn save(&self, snapshot: &Snapshot) -> StoreResult<()>;

    /// Load the most recent snapshot, or `None` when none has been saved.
    async fn get_latest(&self) -> StoreResult<Option<Snapshot>>;
}

/// File-backed snapshot store.
pub struct FileSnapshotStore {
    options: SnapshotOptions,
    gate: Mutex<()>,
}

impl FileSnapshotStore {
    /// Create a store rooted at the configured snapshot directory.
    #[must_use]
    pub fn new(options: SnapshotOptions) -> Self {
        Self {
            options,
            gate: Mutex::new(()),
        }
    }

    fn latest_path(&self, root: &Path) -> PathBuf {
        root.join(&self.options.latest_file_name)
    }

    fn history_path(&self, root: &Path, snapshot: &Snapshot) -> PathBuf {
        root.join(format!(
            "{HISTORY_PREFIX}{}{HISTORY_SUFFIX}",
            snapshot.captured_at.format("%Y%m%d%H%M%S")
        ))
    }

    /// Delete history files beyond the retention count, oldest first.
    ///
    /// A failure to delete one file is logged and does not fail the save.
    async fn prune_history(&self, root: &Path) {
        if self.options.history_size == 0 {
            return;
        }

        let mut entries = match fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Failed to list snapshot history for pruning");
                return;
            }
        };

        let mut history: Vec<(PathBuf, std::time::SystemTime, String)> = Vec::new();

        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with(HISTORY_PREFIX) || !name.ends_with(HISTORY_SUFFIX) {
                continue;
            }
            let created = match entry.metadata().await {
                Ok(metadata) => metadata
                    .created()
                    .or_else(|_| metadata.modified())
                    .unwrap_or(std::time::SystemTime::UNIX_EPOCH),
                Err(_) => std::time::SystemTime::UNIX_EPOCH,
            };
            history.push((entry.path(), created, name));
        }

        // Newest first; the timestamped name breaks creation-time ties
        history.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.2.cmp(&a.2)));

        for (path, _, _) in history.into_iter().skip(self.options.history_size) {
            if let Err(e) = fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to delete history snapshot");
            }
        }
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    #[instrument(skip_all)]
    async fn save(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let _guard = self.gate.lock().await;

        let root = PathBuf::from(&self.options.root_path);
        fs::create_dir_all(&root)
            .await
            .map_err(|e| StoreError::io("creating snapshot directory", e))?;

        let latest_path = self.latest_path(&root);
        let history_path = self.history_path(&root, snapshot);
        let temp_path = root.join(format!("tmp-{}.json", Uuid::new_v4().simple()));

        let payload = serde_json::to_vec_pretty(snapshot)?;

        fs::write(&temp_path, &payload)
            .await
            .map_err(|e| StoreError::io("writing snapshot temp file", e))?;

        fs::copy(&temp_path, &latest_path)
            .await
            .map_err(|e| StoreError::io("replacing latest snapshot", e))?;

        // Two saves within the same capture second would collide; surface
        // that rather than silently overwriting history.
        if fs::try_exists(&history_path).await.unwrap_or(false) {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StoreError::HistoryCollision { path: history_path });
        }

        fs::copy(&temp_path, &history_path)
            .await
            .map_err(|e| StoreError::io("writing history snapshot", e))?;

        fs::remove_file(&temp_path)
            .await
            .map_err(|e| StoreError::io("removing snapshot temp file", e))?;

        self.prune_history(&root).await;

        info!(path = %latest_path.display(), "Snapshot persisted");

        Ok(())
    }

    #[instrument(skip_all)]
    async fn get_latest(&self) -> StoreResult<Option<Snapshot>> {
        let _guard = self.gate.lock().await;

        let root = PathBuf::from(&self.options.root_path);
        let latest_path = self.latest_path(&root);

        let bytes = match fs::read(&latest_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io("reading latest snapshot", e)),
        };

        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

impl std::fmt::Debug for FileSnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSnapshotStore")
            .field("options", &self.options)
            .finish()
    }
}
