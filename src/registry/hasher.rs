//! Pluggable one-way hashing for bearer tokens.
//!
//! Tokens are never stored in the clear. The registry keeps a salted digest
//! per token and recognises a returning token by re-verifying it against each
//! stored digest. The crate ships with Argon2id as the default algorithm
//! (feature `algo-argon2`); custom algorithms implement [`SecretHasher`].

use sha2::{Digest, Sha256};

use crate::RegistryError;

/// A trait for salted, adaptive token hashing.
///
/// # Implementation Notes
///
/// - `hash` must draw a fresh salt on every call, so hashing the same token
///   twice yields two different digests
/// - `verify` must recover the salt and cost parameters from the digest itself
/// - `verify` returns `false` for malformed digests instead of failing
///
/// # Example
///
/// ```rust
/// use nfc_canvas_auth::{RegistryError, SecretHasher};
///
/// struct Reversed;
///
/// impl SecretHasher for Reversed {
///     fn name(&self) -> &'static str {
///         "reversed"
///     }
///
///     fn hash(&self, raw: &str) -> Result<String, RegistryError> {
///         Ok(raw.chars().rev().collect())
///     }
///
///     fn verify(&self, digest: &str, raw: &str) -> bool {
///         digest.chars().rev().eq(raw.chars())
///     }
/// }
///
/// let h = Reversed;
/// assert!(h.verify(&h.hash("abc").unwrap(), "abc"));
/// ```
pub trait SecretHasher: Send + Sync {
    /// Short identifier such as "argon2id", used in logs.
    fn name(&self) -> &'static str;

    /// Produces a salted digest of `raw`.
    fn hash(&self, raw: &str) -> Result<String, RegistryError>;

    /// Checks whether `raw` hashes to `digest` under the digest's own salt.
    fn verify(&self, digest: &str, raw: &str) -> bool;
}

/// Argon2id hasher producing PHC-format digest strings.
#[cfg(feature = "algo-argon2")]
#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: argon2::Argon2<'static>,
}

#[cfg(feature = "algo-argon2")]
impl Argon2Hasher {
    /// Creates a hasher with the argon2 crate's recommended parameters.
    pub fn new() -> Self {
        Self {
            argon2: argon2::Argon2::default(),
        }
    }

    /// Creates a hasher with explicit cost parameters.
    ///
    /// # Arguments
    ///
    /// * `memory_kib` - Memory cost in KiB (at least `8 * parallelism`)
    /// * `iterations` - Number of passes
    /// * `parallelism` - Number of lanes
    pub fn with_params(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, RegistryError> {
        let params = argon2::Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| RegistryError::ConfigError(format!("Invalid Argon2 parameters: {e}")))?;
        Ok(Self {
            argon2: argon2::Argon2::new(
                argon2::Algorithm::Argon2id,
                argon2::Version::V0x13,
                params,
            ),
        })
    }

    /// Builds a hasher from the cost settings of a [`RegistryConfig`](crate::RegistryConfig).
    pub fn from_config(config: &crate::RegistryConfig) -> Result<Self, RegistryError> {
        Self::with_params(
            config.hash_memory_kib,
            config.hash_iterations,
            config.hash_parallelism,
        )
    }
}

#[cfg(feature = "algo-argon2")]
impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "algo-argon2")]
impl SecretHasher for Argon2Hasher {
    fn name(&self) -> &'static str {
        "argon2id"
    }

    fn hash(&self, raw: &str) -> Result<String, RegistryError> {
        use argon2::password_hash::{PasswordHasher, SaltString, rand_core::OsRng};

        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(raw.as_bytes(), &salt)
            .map(|digest| digest.to_string())
            .map_err(|e| RegistryError::HashingError(e.to_string()))
    }

    fn verify(&self, digest: &str, raw: &str) -> bool {
        use argon2::password_hash::{PasswordHash, PasswordVerifier};

        match PasswordHash::new(digest) {
            Ok(parsed) => self.argon2.verify_password(raw.as_bytes(), &parsed).is_ok(),
            Err(e) => {
                tracing::debug!("Skipping malformed token digest: {}", e);
                false
            }
        }
    }
}

/// Short, non-reversible identifier for a raw token, safe to put in logs.
pub(crate) fn token_fingerprint(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    hex::encode(&digest[..6])
}
