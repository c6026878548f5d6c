use std::sync::Arc;

use crate::registry::storage::{JsonFileStorage, MemoryStorage, SnapshotStorage};
use crate::registry::{
    ConcurrencyGuard, IdentityVerifier, NfcBindingStore, NfcRegistrar, Registry, RegistryConfig,
    RegistryError, SecretHasher, TokenRegistrar, TokenStore,
};

/// A builder for creating a [`Registry`].
///
/// Both stores default to [`MemoryStorage`]; call `.with_json_files()` or
/// provide custom backends to persist them. The hasher defaults to Argon2id
/// with the cost settings from the configuration.
#[must_use = "The builder does nothing unless `.build_and_init()` is called."]
pub struct RegistryBuilder {
    verifier: Arc<dyn IdentityVerifier>,
    token_storage: Option<Arc<dyn SnapshotStorage<TokenStore>>>,
    binding_storage: Option<Arc<dyn SnapshotStorage<NfcBindingStore>>>,
    hasher: Option<Arc<dyn SecretHasher>>,
    config: RegistryConfig,
}

impl RegistryBuilder {
    pub(crate) fn new(verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self {
            verifier,
            token_storage: None,
            binding_storage: None,
            hasher: None,
            config: RegistryConfig::default(),
        }
    }

    /// Replaces the configuration (defaults to `RegistryConfig::default()`,
    /// which reads the environment).
    pub fn with_config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Persists the token store with a custom backend.
    pub fn with_token_storage<S>(mut self, storage: Arc<S>) -> Self
    where
        S: SnapshotStorage<TokenStore> + 'static,
    {
        self.token_storage = Some(storage as Arc<dyn SnapshotStorage<TokenStore>>);
        self
    }

    /// Persists the NFC binding store with a custom backend.
    pub fn with_binding_storage<S>(mut self, storage: Arc<S>) -> Self
    where
        S: SnapshotStorage<NfcBindingStore> + 'static,
    {
        self.binding_storage = Some(storage as Arc<dyn SnapshotStorage<NfcBindingStore>>);
        self
    }

    /// Persists both stores as JSON files at the configured paths.
    ///
    /// Uses the paths of the configuration set so far, so call this after
    /// `.with_config()`.
    pub fn with_json_files(self) -> Self {
        let tokens = Arc::new(JsonFileStorage::<TokenStore>::new(self.config.token_file.clone()));
        let bindings = Arc::new(JsonFileStorage::<NfcBindingStore>::new(
            self.config.nfc_file.clone(),
        ));
        self.with_token_storage(tokens).with_binding_storage(bindings)
    }

    /// Uses a custom token hasher instead of the default Argon2id.
    pub fn with_hasher<H>(mut self, hasher: Arc<H>) -> Self
    where
        H: SecretHasher + 'static,
    {
        self.hasher = Some(hasher as Arc<dyn SecretHasher>);
        self
    }

    /// Builds the registry and loads both stores.
    ///
    /// Initializes each storage backend, loads its snapshot, and wires both
    /// registrars to one shared [`ConcurrencyGuard`]. Configuration warnings
    /// are logged, not fatal.
    pub async fn build_and_init(self) -> Result<Registry, RegistryError> {
        for warning in self.config.validate() {
            tracing::warn!("{}", warning);
        }

        let hasher = match self.hasher {
            Some(hasher) => hasher,
            None => default_hasher(&self.config)?,
        };
        let token_storage: Arc<dyn SnapshotStorage<TokenStore>> = match self.token_storage {
            Some(storage) => storage,
            None => Arc::new(MemoryStorage::<TokenStore>::new()),
        };
        let binding_storage: Arc<dyn SnapshotStorage<NfcBindingStore>> = match self.binding_storage
        {
            Some(storage) => storage,
            None => Arc::new(MemoryStorage::<NfcBindingStore>::new()),
        };

        token_storage.init().await?;
        binding_storage.init().await?;

        let guard = ConcurrencyGuard::new();
        let tokens = TokenRegistrar::load(
            token_storage,
            Arc::clone(&self.verifier),
            hasher,
            guard.clone(),
        )
        .await?
        .with_student_marker(self.config.student_marker.clone());
        let nfc = NfcRegistrar::load(binding_storage, self.verifier, guard.clone()).await?;

        tracing::info!("Registry ready: {}", self.config.summary());
        Ok(Registry::new(tokens, nfc, guard, self.config))
    }
}

#[cfg(feature = "algo-argon2")]
fn default_hasher(config: &RegistryConfig) -> Result<Arc<dyn SecretHasher>, RegistryError> {
    Ok(Arc::new(crate::registry::Argon2Hasher::from_config(config)?))
}

#[cfg(not(feature = "algo-argon2"))]
fn default_hasher(_config: &RegistryConfig) -> Result<Arc<dyn SecretHasher>, RegistryError> {
    Err(RegistryError::ConfigError(
        "No token hasher configured; enable `algo-argon2` or call `.with_hasher()`".to_string(),
    ))
}
