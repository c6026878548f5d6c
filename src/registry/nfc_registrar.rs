use std::sync::Arc;

use tokio::sync::RwLock;

use super::storage::SnapshotStorage;
use super::{BindingOutcome, ConcurrencyGuard, IdentityVerifier, NfcBinding, NfcBindingStore};
use crate::RegistryError;

/// A card found by [`NfcLookup::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfcMatch {
    pub login_id: String,
    pub binding: NfcBinding,
}

/// Read-only view of the committed NFC bindings.
///
/// Cheap to clone; every clone observes the same committed store, and never
/// a half-applied registration.
#[derive(Debug, Clone)]
pub struct NfcLookup {
    bindings: Arc<RwLock<NfcBindingStore>>,
}

impl NfcLookup {
    /// Finds the student currently holding card `nfc_id`.
    pub async fn lookup(&self, nfc_id: &str) -> Option<NfcMatch> {
        let bindings = self.bindings.read().await;
        bindings.find_by_nfc(nfc_id).map(|(login_id, binding)| NfcMatch {
            login_id: login_id.to_string(),
            binding: binding.clone(),
        })
    }
}

/// Binds NFC card serials to student login ids.
///
/// One card belongs to at most one student. Binding a card that another
/// student holds is reported as a conflict and changes nothing. A student who
/// already has a binding keeps their identity record when they switch cards;
/// only the card serial is replaced.
///
/// Like [`TokenRegistrar`](crate::TokenRegistrar), the whole registration
/// including identity resolution runs inside the shared guard scope.
pub struct NfcRegistrar {
    bindings: Arc<RwLock<NfcBindingStore>>,
    storage: Arc<dyn SnapshotStorage<NfcBindingStore>>,
    verifier: Arc<dyn IdentityVerifier>,
    guard: ConcurrencyGuard,
}

impl NfcRegistrar {
    /// Creates a registrar over an already loaded binding store.
    pub fn new(
        bindings: NfcBindingStore,
        storage: Arc<dyn SnapshotStorage<NfcBindingStore>>,
        verifier: Arc<dyn IdentityVerifier>,
        guard: ConcurrencyGuard,
    ) -> Self {
        Self {
            bindings: Arc::new(RwLock::new(bindings)),
            storage,
            verifier,
            guard,
        }
    }

    /// Loads the binding store from `storage` and creates a registrar over it.
    pub async fn load(
        storage: Arc<dyn SnapshotStorage<NfcBindingStore>>,
        verifier: Arc<dyn IdentityVerifier>,
        guard: ConcurrencyGuard,
    ) -> Result<Self, RegistryError> {
        let bindings = storage.load().await?;
        tracing::debug!("Loaded {} NFC binding(s)", bindings.len());
        Ok(Self::new(bindings, storage, verifier, guard))
    }

    /// Binds card `nfc_id` to `login_id`, resolving the student in `course_id`
    /// if they have never been bound before.
    ///
    /// The card conflict check runs before any identity lookup, so a
    /// conflicting request never reaches the identity provider. Whether the
    /// result is `Registered` or `Updated` depends on whether `login_id` was
    /// already known, not on the card.
    pub async fn register_binding(
        &self,
        nfc_id: &str,
        login_id: &str,
        course_id: &str,
    ) -> BindingOutcome {
        let _scope = self.guard.enter().await;
        let mut staged = self.bindings.read().await.clone();

        if let Some((holder, binding)) = staged.find_by_nfc(nfc_id) {
            if holder != login_id {
                tracing::warn!(
                    "Card {} is already bound to {}, refusing to bind it to {}",
                    nfc_id,
                    holder,
                    login_id
                );
                return BindingOutcome::Conflict {
                    login_id: holder.to_string(),
                    full_name: binding.full_name.clone(),
                    nfc_id: nfc_id.to_string(),
                };
            }
        }

        let created = if staged.contains_login(login_id) {
            false
        } else {
            let identity = match self.verifier.resolve_student(course_id, login_id).await {
                Ok(identity) => identity,
                Err(e) => {
                    tracing::warn!(
                        "Could not resolve {} in course {}: {}",
                        login_id,
                        course_id,
                        e
                    );
                    return BindingOutcome::Error(e);
                }
            };
            staged.insert(
                login_id,
                NfcBinding {
                    full_name: identity.full_name,
                    canvas_id: Some(identity.canvas_id),
                    nfc_id: String::new(),
                },
            );
            true
        };

        if let Some(binding) = staged.get_mut(login_id) {
            binding.nfc_id = nfc_id.to_string();
        }

        if let Err(e) = self.storage.save(&staged).await {
            tracing::warn!("Failed to persist NFC bindings: {}", e);
            return BindingOutcome::Error(e);
        }
        *self.bindings.write().await = staged;

        if created {
            tracing::info!("Bound card {} to new student {}", nfc_id, login_id);
            BindingOutcome::Registered
        } else {
            tracing::info!("Moved {} to card {}", login_id, nfc_id);
            BindingOutcome::Updated
        }
    }

    /// Finds the student currently holding card `nfc_id`.
    pub async fn lookup(&self, nfc_id: &str) -> Option<NfcMatch> {
        self.lookup_handle().lookup(nfc_id).await
    }

    /// A read-only handle over this registrar's committed bindings.
    pub fn lookup_handle(&self) -> NfcLookup {
        NfcLookup {
            bindings: Arc::clone(&self.bindings),
        }
    }

    /// Copy of the committed binding store.
    pub async fn snapshot(&self) -> NfcBindingStore {
        self.bindings.read().await.clone()
    }

    /// The scope this registrar serializes its writes under.
    pub fn guard(&self) -> &ConcurrencyGuard {
        &self.guard
    }

    /// Writes the committed store to storage.
    ///
    /// Callers must hold the guard scope.
    pub(crate) async fn persist_committed(&self) -> Result<(), RegistryError> {
        let bindings = self.bindings.read().await;
        self.storage.save(&bindings).await
    }
}
