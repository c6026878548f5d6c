// Core architecture components
mod config;
mod error;
mod guard;
mod hasher;
mod outcome;
mod verifier;

// Stores and persistence
mod binding_store;
pub mod storage;
mod token_store;

// Registrars and the facade over them
mod nfc_registrar;
mod service;
mod service_builder;
mod token_registrar;

// Canvas LMS client (optional feature)
#[cfg(feature = "canvas-client")]
mod canvas;

#[cfg(test)]
pub(crate) mod test_utils;

// Core components exports
pub use config::{ConfigPreset, RegistryConfig};
pub use error::RegistryError;
pub use guard::ConcurrencyGuard;
#[cfg(feature = "algo-argon2")]
pub use hasher::Argon2Hasher;
pub use hasher::SecretHasher;
pub use outcome::{BindingOutcome, RejectReason, TokenOutcome};
pub use verifier::{IdentityVerifier, Profile, StudentIdentity};

// Store exports
pub use binding_store::{NfcBinding, NfcBindingStore};
pub use storage::{JsonFileStorage, MemoryStorage, Snapshot, SnapshotStorage, StorageStats};
pub use token_store::{TokenRecord, TokenStore};

// Registrar exports
pub use nfc_registrar::{NfcLookup, NfcMatch, NfcRegistrar};
pub use service::{Registry, RegistryStats};
pub use service_builder::RegistryBuilder;
pub use token_registrar::{TokenRegistrar, bearer_token};

// Canvas exports (optional feature)
#[cfg(feature = "canvas-client")]
pub use canvas::{CanvasClient, CanvasConfig};
