//! JSON file storage backend implementation.
//!
//! Each store lives in its own pretty-printed JSON file. Writes go to a
//! sibling temp file that is then renamed over the target, so a crash mid-write
//! leaves the previous snapshot intact.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{Snapshot, SnapshotStorage, StorageStats};
use crate::RegistryError;

/// File-backed snapshot storage.
///
/// A missing file loads as an empty snapshot. A file that exists but does not
/// parse is an error; it is never silently replaced.
///
/// # Example
///
/// ```rust
/// use nfc_canvas_auth::storage::{JsonFileStorage, SnapshotStorage};
/// use nfc_canvas_auth::TokenStore;
///
/// # async fn example() -> Result<(), nfc_canvas_auth::RegistryError> {
/// let storage = JsonFileStorage::<TokenStore>::new("./data/tokens.json");
/// storage.init().await?;
/// let tokens = storage.load().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStorage<T: Snapshot> {
    path: PathBuf,
    _snapshot: PhantomData<fn() -> T>,
}

impl<T: Snapshot> JsonFileStorage<T> {
    /// Creates a storage backend for the file at `path`.
    ///
    /// Nothing touches the filesystem until `init`, `load` or `save` runs.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _snapshot: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Writes `bytes` to `path` and flushes them to disk before returning.
async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

#[async_trait]
impl<T: Snapshot> SnapshotStorage<T> for JsonFileStorage<T> {
    async fn init(&self) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn load(&self) -> Result<T, RegistryError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("{} does not exist yet, starting empty", self.path.display());
                return Ok(T::default());
            }
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            RegistryError::SerializationError(format!("{}: {e}", self.path.display()))
        })
    }

    async fn save(&self, snapshot: &T) -> Result<(), RegistryError> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        let temp = self.temp_path();

        if let Err(e) = write_synced(&temp, &json).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn get_stats(&self) -> Result<StorageStats, RegistryError> {
        let snapshot = self.load().await?;
        let size = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };
        Ok(StorageStats {
            total_records: snapshot.record_count(),
            backend_info: format!("JSON file storage at {} ({} bytes)", self.path.display(), size),
        })
    }
}
