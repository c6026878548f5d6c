//! In-memory storage backend implementation.
//!
//! Keeps the last saved snapshot in memory. Nothing survives a restart, which
//! makes it the right choice for tests and throwaway deployments.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Snapshot, SnapshotStorage, StorageStats};
use crate::RegistryError;

/// A simple in-memory snapshot store.
///
/// # Example
///
/// ```rust
/// use nfc_canvas_auth::storage::{MemoryStorage, SnapshotStorage};
/// use nfc_canvas_auth::NfcBindingStore;
///
/// # async fn example() -> Result<(), nfc_canvas_auth::RegistryError> {
/// let storage = MemoryStorage::<NfcBindingStore>::new();
/// let loaded = storage.load().await?;
/// assert!(loaded.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryStorage<T: Snapshot> {
    data: Arc<RwLock<T>>,
    saves: AtomicU64,
}

impl<T: Snapshot> Default for MemoryStorage<T> {
    fn default() -> Self {
        Self::with_snapshot(T::default())
    }
}

impl<T: Snapshot> MemoryStorage<T> {
    /// Creates an empty in-memory storage instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage instance pre-seeded with `snapshot`.
    pub fn with_snapshot(snapshot: T) -> Self {
        Self {
            data: Arc::new(RwLock::new(snapshot)),
            saves: AtomicU64::new(0),
        }
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> u64 {
        self.saves.load(Ordering::SeqCst)
    }

    /// Copy of the currently stored snapshot.
    pub async fn snapshot(&self) -> T {
        self.data.read().await.clone()
    }
}

#[async_trait]
impl<T: Snapshot> SnapshotStorage<T> for MemoryStorage<T> {
    async fn load(&self) -> Result<T, RegistryError> {
        Ok(self.data.read().await.clone())
    }

    async fn save(&self, snapshot: &T) -> Result<(), RegistryError> {
        *self.data.write().await = snapshot.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_stats(&self) -> Result<StorageStats, RegistryError> {
        let data = self.data.read().await;
        Ok(StorageStats {
            total_records: data.record_count(),
            backend_info: format!("In-memory snapshot storage ({} saves)", self.save_count()),
        })
    }
}
