//! # NFC Canvas Auth
//!
//! Caller registration and NFC card binding for a Canvas LMS attendance bridge.
//!
//! Teachers register their Canvas API token once; the service checks it with
//! Canvas, refuses student accounts, and keeps only a salted digest of it.
//! Later requests authenticate by presenting the same token. Student NFC cards
//! are bound to Canvas login ids, so a card tap can be resolved to a student
//! without asking Canvas again.
//!
//! ## Features
//!
//! - **Verified Registration**: Tokens are accepted only after the LMS confirms them
//! - **Role Gating**: Accounts whose email carries the student marker are refused
//! - **Salted Digests**: Raw tokens are never stored; Argon2id by default
//! - **Card Conflicts**: A card can belong to at most one login id
//! - **Atomic Snapshots**: Each accepted change is persisted before it becomes visible
//! - **Pluggable Backends**: JSON files, memory, or your own [`SnapshotStorage`]
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use nfc_canvas_auth::{
//!     BindingOutcome, ConfigPreset, IdentityVerifier, Registry, RegistryConfig, TokenOutcome,
//! };
//!
//! # async fn example(verifier: Arc<dyn IdentityVerifier>) -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::builder(verifier)
//!     .with_config(RegistryConfig::from(ConfigPreset::Production))
//!     .with_json_files()
//!     .build_and_init()
//!     .await?;
//!
//! match registry.register_token("canvas-token").await {
//!     TokenOutcome::Registered | TokenOutcome::Updated => println!("Caller registered"),
//!     TokenOutcome::Rejected(reason) => println!("Refused: {reason:?}"),
//!     TokenOutcome::Error(e) => println!("Could not save: {e}"),
//! }
//!
//! if registry.check_token("canvas-token").await {
//!     if let BindingOutcome::Conflict { login_id, .. } =
//!         registry.register_binding("04a2b9c1", "alice", "1234").await
//!     {
//!         println!("Card already belongs to {login_id}");
//!     }
//! }
//!
//! registry.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! [`RegistryConfig::default()`] reads the environment:
//!
//! ```bash
//! export NFC_AUTH_TOKEN_FILE="/var/lib/nfc-auth/tokens.json"
//! export NFC_AUTH_NFC_FILE="/var/lib/nfc-auth/nfc_data.json"
//! export NFC_AUTH_STUDENT_MARKER="student"
//! ```
//!
//! With the `canvas-client` feature, `CanvasClient` talks to Canvas and is
//! configured through `CANVAS_BASE_URL`, `CANVAS_SERVICE_TOKEN` and
//! `CANVAS_TIMEOUT_SECS`.
//!
//! ## Architecture
//!
//! - **[`Registry`]**: Both registrars behind one write scope; built with [`Registry::builder`]
//! - **[`TokenRegistrar`]**: Token registration and caller authentication
//! - **[`NfcRegistrar`]**: Card binding and lookup
//! - **[`IdentityVerifier`]**: The LMS seam; implement it to plug in another provider
//! - **[`RegistryError`]**: Error handling for all failure modes

pub mod registry;

pub use registry::storage;

// Re-export commonly used types
pub use registry::{
    BindingOutcome, ConcurrencyGuard, ConfigPreset, IdentityVerifier, NfcBinding,
    NfcBindingStore, NfcLookup, NfcMatch, NfcRegistrar, Profile, Registry, RegistryBuilder,
    RegistryConfig, RegistryError, RegistryStats, RejectReason, SecretHasher, StudentIdentity,
    TokenOutcome, TokenRecord, TokenRegistrar, TokenStore, bearer_token,
};
pub use registry::{JsonFileStorage, MemoryStorage, Snapshot, SnapshotStorage, StorageStats};

#[cfg(feature = "algo-argon2")]
pub use registry::Argon2Hasher;

#[cfg(feature = "canvas-client")]
pub use registry::{CanvasClient, CanvasConfig};
