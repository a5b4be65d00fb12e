use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::modules::attendance_sync::core::fingerprint::Fingerprint;

/// Board item an attendance was synced to, and the fingerprint of the column
/// values last confirmed by the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMapping {
    pub downstream_id: String,
    pub fingerprint: Fingerprint,
}

/// Upstream external reference -> board item. Entries are never removed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityTable {
    mappings: BTreeMap<String, IdentityMapping>,
}

impl IdentityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, external_reference: &str) -> Option<&IdentityMapping> {
        self.mappings.get(external_reference)
    }

    pub fn insert(&mut self, external_reference: impl Into<String>, mapping: IdentityMapping) {
        self.mappings.insert(external_reference.into(), mapping);
    }

    /// Returns false when the reference has no mapping.
    pub fn update_fingerprint(&mut self, external_reference: &str, fingerprint: Fingerprint) -> bool {
        match self.mappings.get_mut(external_reference) {
            Some(mapping) => {
                mapping.fingerprint = fingerprint;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IdentityMapping)> {
        self.mappings.iter()
    }
}
