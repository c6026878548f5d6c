use std::sync::Arc;

use super::{
    BindingOutcome, ConcurrencyGuard, IdentityVerifier, NfcLookup, NfcMatch, NfcRegistrar,
    RegistryBuilder, RegistryConfig, RegistryError, TokenOutcome, TokenRegistrar,
};

/// Record counts of both committed stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub tokens: usize,
    pub bindings: usize,
}

/// Token and NFC registries sharing one write scope.
///
/// This is what an HTTP layer holds: it authenticates callers with
/// [`check_token`](Self::check_token), and maps the outcome enums of the
/// register calls onto responses.
///
/// To create an instance, use [`Registry::builder`].
pub struct Registry {
    tokens: TokenRegistrar,
    nfc: NfcRegistrar,
    guard: ConcurrencyGuard,
    config: RegistryConfig,
}

impl Registry {
    /// Creates a builder around the identity provider the registry will use.
    pub fn builder(verifier: Arc<dyn IdentityVerifier>) -> RegistryBuilder {
        RegistryBuilder::new(verifier)
    }

    pub(crate) fn new(
        tokens: TokenRegistrar,
        nfc: NfcRegistrar,
        guard: ConcurrencyGuard,
        config: RegistryConfig,
    ) -> Self {
        Self {
            tokens,
            nfc,
            guard,
            config,
        }
    }

    /// See [`TokenRegistrar::register`].
    pub async fn register_token(&self, raw_token: &str) -> TokenOutcome {
        self.tokens.register(raw_token).await
    }

    /// See [`TokenRegistrar::check`].
    pub async fn check_token(&self, raw_token: &str) -> bool {
        self.tokens.check(raw_token).await
    }

    /// See [`NfcRegistrar::register_binding`].
    pub async fn register_binding(
        &self,
        nfc_id: &str,
        login_id: &str,
        course_id: &str,
    ) -> BindingOutcome {
        self.nfc.register_binding(nfc_id, login_id, course_id).await
    }

    /// See [`NfcLookup::lookup`].
    pub async fn lookup(&self, nfc_id: &str) -> Option<NfcMatch> {
        self.nfc.lookup(nfc_id).await
    }

    /// A cloneable read-only handle over the NFC bindings.
    pub fn lookup_handle(&self) -> NfcLookup {
        self.nfc.lookup_handle()
    }

    pub fn token_registrar(&self) -> &TokenRegistrar {
        &self.tokens
    }

    pub fn nfc_registrar(&self) -> &NfcRegistrar {
        &self.nfc
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Record counts of the committed stores.
    pub async fn stats(&self) -> RegistryStats {
        RegistryStats {
            tokens: self.tokens.snapshot().await.len(),
            bindings: self.nfc.snapshot().await.len(),
        }
    }

    /// Writes both committed stores one final time.
    ///
    /// Waits for any in-flight registration to finish first. Both stores are
    /// attempted even if the first save fails; the first error is returned.
    pub async fn shutdown(&self) -> Result<(), RegistryError> {
        let _scope = self.guard.enter().await;

        let tokens = self.tokens.persist_committed().await;
        let bindings = self.nfc.persist_committed().await;

        if let Err(e) = &tokens {
            tracing::warn!("Final save of token store failed: {}", e);
        }
        if let Err(e) = &bindings {
            tracing::warn!("Final save of NFC bindings failed: {}", e);
        }
        tokens.and(bindings)
    }
}
