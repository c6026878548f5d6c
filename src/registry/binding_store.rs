use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::storage::Snapshot;

/// What the registry knows about a student holding an NFC card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NfcBinding {
    /// Display name, fetched once when the binding is created
    pub full_name: String,
    /// LMS account id, fetched once when the binding is created
    #[serde(default)]
    pub canvas_id: Option<String>,
    /// Serial of the card currently bound to this student
    pub nfc_id: String,
}

/// NFC bindings keyed by login id.
///
/// The store itself does not enforce that card serials are unique; the
/// [`NfcRegistrar`](crate::NfcRegistrar) checks for conflicts before every
/// insert or update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NfcBindingStore {
    bindings: BTreeMap<String, NfcBinding>,
}

impl NfcBindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// First binding, in login id order, holding card `nfc_id`.
    pub fn find_by_nfc(&self, nfc_id: &str) -> Option<(&str, &NfcBinding)> {
        self.bindings
            .iter()
            .find(|(_, binding)| binding.nfc_id == nfc_id)
            .map(|(login_id, binding)| (login_id.as_str(), binding))
    }

    pub fn get(&self, login_id: &str) -> Option<&NfcBinding> {
        self.bindings.get(login_id)
    }

    pub fn get_mut(&mut self, login_id: &str) -> Option<&mut NfcBinding> {
        self.bindings.get_mut(login_id)
    }

    pub fn contains_login(&self, login_id: &str) -> bool {
        self.bindings.contains_key(login_id)
    }

    /// Inserts or replaces the binding for `login_id`.
    pub fn insert(&mut self, login_id: impl Into<String>, binding: NfcBinding) {
        self.bindings.insert(login_id.into(), binding);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NfcBinding)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Snapshot for NfcBindingStore {
    fn record_count(&self) -> usize {
        self.len()
    }
}
