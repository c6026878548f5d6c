use std::path::PathBuf;

/// Argon2 memory cost (KiB) recommended by the argon2 crate.
const DEFAULT_HASH_MEMORY_KIB: u32 = 19 * 1024;
const DEFAULT_HASH_ITERATIONS: u32 = 2;
const DEFAULT_HASH_PARALLELISM: u32 = 1;

/// Predefined configuration presets for common deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPreset {
    /// Production-ready configuration.
    ///
    /// - Files: `tokens.json` and `nfc_data.json` in the working directory
    /// - Hashing: Argon2id with the crate's recommended cost (19 MiB, 2 passes)
    Production,

    /// Development-friendly configuration.
    ///
    /// Cheap hashing so test suites and local runs stay fast:
    /// - Hashing: Argon2id with 8 MiB and a single pass
    Development,

    /// Load configuration from environment variables.
    ///
    /// Reads configuration from:
    /// - `NFC_AUTH_TOKEN_FILE`: token store path (default: `tokens.json`)
    /// - `NFC_AUTH_NFC_FILE`: NFC binding store path (default: `nfc_data.json`)
    /// - `NFC_AUTH_STUDENT_MARKER`: email marker for student accounts (default: `student`)
    /// - `NFC_AUTH_HASH_MEMORY_KIB`, `NFC_AUTH_HASH_ITERATIONS`, `NFC_AUTH_HASH_PARALLELISM`
    FromEnv,
}

/// Configuration for the token and NFC registry.
///
/// # Example
///
/// ```rust
/// use nfc_canvas_auth::{ConfigPreset, RegistryConfig};
///
/// let config = RegistryConfig::from(ConfigPreset::Development);
/// assert!(config.student_marker == "student");
/// ```
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Where registered token hashes are kept
    pub token_file: PathBuf,
    /// Where NFC bindings are kept
    pub nfc_file: PathBuf,
    /// Substring of a profile email that classifies the account as a student
    pub student_marker: String,
    /// Argon2 memory cost in KiB
    pub hash_memory_kib: u32,
    /// Argon2 pass count
    pub hash_iterations: u32,
    /// Argon2 lane count
    pub hash_parallelism: u32,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            token_file: PathBuf::from(env_or(
                "NFC_AUTH_TOKEN_FILE",
                "tokens.json".to_string(),
            )),
            nfc_file: PathBuf::from(env_or("NFC_AUTH_NFC_FILE", "nfc_data.json".to_string())),
            student_marker: env_or("NFC_AUTH_STUDENT_MARKER", "student".to_string()),
            hash_memory_kib: env_or("NFC_AUTH_HASH_MEMORY_KIB", DEFAULT_HASH_MEMORY_KIB),
            hash_iterations: env_or("NFC_AUTH_HASH_ITERATIONS", DEFAULT_HASH_ITERATIONS),
            hash_parallelism: env_or("NFC_AUTH_HASH_PARALLELISM", DEFAULT_HASH_PARALLELISM),
        }
    }
}

impl RegistryConfig {
    /// Validates the configuration and returns any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.student_marker.trim().is_empty() {
            warnings.push(
                "Empty student marker disables role gating for token registration".to_string(),
            );
        }
        if self.token_file == self.nfc_file {
            warnings.push(
                "Token and NFC stores share one file and will overwrite each other".to_string(),
            );
        }

        if self.hash_memory_kib < 8 * 1024 {
            warnings.push("Hash memory cost below 8 MiB weakens stored token hashes".to_string());
        }
        if self.hash_iterations == 0 {
            warnings.push("Hash iteration count must be at least 1".to_string());
        }
        if self.hash_parallelism == 0 {
            warnings.push("Hash parallelism must be at least 1".to_string());
        }

        warnings
    }

    /// Returns a summary of the current configuration.
    pub fn summary(&self) -> String {
        format!(
            "RegistryConfig {{ Tokens: {}, NFC: {}, Student marker: {:?}, Argon2: m={}KiB t={} p={} }}",
            self.token_file.display(),
            self.nfc_file.display(),
            self.student_marker,
            self.hash_memory_kib,
            self.hash_iterations,
            self.hash_parallelism,
        )
    }
}

impl From<ConfigPreset> for RegistryConfig {
    fn from(preset: ConfigPreset) -> Self {
        let production = Self {
            token_file: PathBuf::from("tokens.json"),
            nfc_file: PathBuf::from("nfc_data.json"),
            student_marker: "student".to_string(),
            hash_memory_kib: DEFAULT_HASH_MEMORY_KIB,
            hash_iterations: DEFAULT_HASH_ITERATIONS,
            hash_parallelism: DEFAULT_HASH_PARALLELISM,
        };
        match preset {
            ConfigPreset::Production => production,
            ConfigPreset::Development => Self {
                hash_memory_kib: 8 * 1024,
                hash_iterations: 1,
                ..production
            },
            ConfigPreset::FromEnv => Self::default(),
        }
    }
}
