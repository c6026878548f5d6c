//! Pluggable storage backends for registry snapshots.
//!
//! Both registries persist their whole collection after every mutation, so a
//! backend only has to load and save complete snapshots. This module provides
//! the storage trait plus an in-memory and a JSON file backend.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::RegistryError;

mod json_file;
mod memory;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

/// A collection that is persisted as one unit.
pub trait Snapshot:
    Serialize + DeserializeOwned + Default + Clone + Send + Sync + 'static
{
    /// Number of records in the collection.
    fn record_count(&self) -> usize;
}

/// Statistics about a storage backend.
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Number of records in the persisted snapshot
    pub total_records: usize,
    /// Additional backend-specific information
    pub backend_info: String,
}

/// Abstract storage backend for registry snapshots.
///
/// # Available Implementations
///
/// - [`MemoryStorage`] - In-memory snapshot, for tests and ephemeral deployments
/// - [`JsonFileStorage`] - Pretty-printed JSON file, written atomically
///
/// # Thread Safety
///
/// All methods are async and must be thread-safe. The registrars never call
/// `save` concurrently for the same store, but `load` and `get_stats` may
/// overlap with a `save`.
///
/// # Example Implementation
///
/// ```rust
/// use nfc_canvas_auth::storage::{Snapshot, SnapshotStorage, StorageStats};
/// use nfc_canvas_auth::RegistryError;
/// use async_trait::async_trait;
/// use tokio::sync::Mutex;
///
/// /// Keeps the last snapshot as a JSON string.
/// #[derive(Default)]
/// pub struct StringStorage {
///     json: Mutex<Option<String>>,
/// }
///
/// #[async_trait]
/// impl<T: Snapshot> SnapshotStorage<T> for StringStorage {
///     async fn load(&self) -> Result<T, RegistryError> {
///         match self.json.lock().await.as_deref() {
///             Some(json) => Ok(serde_json::from_str(json)?),
///             None => Ok(T::default()),
///         }
///     }
///
///     async fn save(&self, snapshot: &T) -> Result<(), RegistryError> {
///         *self.json.lock().await = Some(serde_json::to_string(snapshot)?);
///         Ok(())
///     }
///
///     async fn get_stats(&self) -> Result<StorageStats, RegistryError> {
///         let snapshot = <Self as SnapshotStorage<T>>::load(self).await?;
///         Ok(StorageStats {
///             total_records: snapshot.record_count(),
///             backend_info: "JSON string storage".to_string(),
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait SnapshotStorage<T: Snapshot>: Send + Sync {
    /// Optional method for backend initialization.
    ///
    /// Called once by the registry builder before the first `load`.
    /// Implementations can use it to create directories, open connections, etc.
    async fn init(&self) -> Result<(), RegistryError> {
        Ok(())
    }

    /// Loads the persisted snapshot.
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - The stored snapshot, or `T::default()` if nothing was saved yet
    /// * `Err(RegistryError)` - If the backend could not be read or decoded
    async fn load(&self) -> Result<T, RegistryError>;

    /// Replaces the persisted snapshot.
    ///
    /// Must either persist all of `snapshot` or leave the previous snapshot
    /// intact.
    async fn save(&self, snapshot: &T) -> Result<(), RegistryError>;

    /// Returns statistics about the storage backend.
    async fn get_stats(&self) -> Result<StorageStats, RegistryError>;
}
