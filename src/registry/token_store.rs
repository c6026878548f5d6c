use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SecretHasher;
use super::storage::Snapshot;

/// A registered caller token, stored only as a salted digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Salted digest of the raw token
    pub hash: String,
    /// Owner's sortable name at registration time
    #[serde(rename = "sortable_name")]
    pub display_name: String,
    /// When the token was last proven live against the LMS
    pub last_verified: DateTime<Utc>,
}

/// The ordered collection of registered token records.
///
/// Records are identified by the raw token they verify against, never by
/// their digest string, so lookups are a linear verify scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenStore {
    records: Vec<TokenRecord>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the first record that `raw_token` verifies against.
    pub fn find_match(&self, hasher: &dyn SecretHasher, raw_token: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|record| hasher.verify(&record.hash, raw_token))
    }

    /// Whether any record verifies against `raw_token`.
    pub fn contains(&self, hasher: &dyn SecretHasher, raw_token: &str) -> bool {
        self.find_match(hasher, raw_token).is_some()
    }

    pub fn push(&mut self, record: TokenRecord) {
        self.records.push(record);
    }

    /// Refreshes the verification timestamp of the record at `index`.
    ///
    /// Returns `false` if there is no such record.
    pub fn touch(&mut self, index: usize, at: DateTime<Utc>) -> bool {
        match self.records.get_mut(index) {
            Some(record) => {
                record.last_verified = at;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<&TokenRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[TokenRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Snapshot for TokenStore {
    fn record_count(&self) -> usize {
        self.len()
    }
}
