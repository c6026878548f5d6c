use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

/// Mutual-exclusion scope shared by every registrar write sequence.
///
/// A registrar holds the scope from the first read of its store until the
/// new snapshot has been persisted and committed, so two registrations can
/// never both pass a uniqueness check before either one commits. Cloning is
/// cheap and every clone guards the same scope, which is how the token and
/// NFC registrars end up serialized against each other.
///
/// The scope is released when the returned guard is dropped, on every exit
/// path including early returns and upstream failures.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyGuard {
    inner: Arc<Mutex<()>>,
}

impl ConcurrencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access and returns the scope guard.
    pub async fn enter(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().await
    }

    /// True when both handles guard the same scope.
    pub fn shares_scope_with(&self, other: &ConcurrencyGuard) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
