//! Vault and snapshot types.
//!
//! A `Vault` is one user's labelled secrets plus the default-label
//! pointer.  Secret values are stored as envelopes: either the raw
//! Base32 secret or an `enc:v1:` ciphertext string, see
//! [`crate::crypto::SecretCodec`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};

/// All users' vaults, keyed by user identifier.
pub type Snapshot = BTreeMap<String, Vault>;

/// One user's collection of labelled secrets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// Label -> secret envelope.
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,

    /// Label used when a request names none.  Always a key of `secrets`.
    #[serde(rename = "defaultLabel", default)]
    pub default_label: Option<String>,
}

impl Vault {
    /// Insert or replace a secret.
    ///
    /// The first secret saved into a vault without a default becomes the
    /// default.  Returns `true` if an existing label was overwritten.
    pub fn insert_secret(&mut self, label: &str, envelope: String) -> bool {
        let replaced = self.secrets.insert(label.to_string(), envelope).is_some();
        if self.default_label.is_none() {
            self.default_label = Some(label.to_string());
        }
        replaced
    }

    /// Remove a secret, moving the default to the first remaining label
    /// (or clearing it) when the default is the one removed.
    pub fn remove_secret(&mut self, label: &str) -> Result<String> {
        let envelope = self
            .secrets
            .remove(label)
            .ok_or_else(|| VaultError::LabelNotFound(label.to_string()))?;

        if self.default_label.as_deref() == Some(label) {
            self.default_label = self.secrets.keys().next().cloned();
        }

        Ok(envelope)
    }

    pub fn set_default(&mut self, label: &str) -> Result<()> {
        if !self.secrets.contains_key(label) {
            return Err(VaultError::LabelNotFound(label.to_string()));
        }
        self.default_label = Some(label.to_string());
        Ok(())
    }

    /// Envelope stored under `label`.
    pub fn envelope(&self, label: &str) -> Result<&str> {
        self.secrets
            .get(label)
            .map(String::as_str)
            .ok_or_else(|| VaultError::LabelNotFound(label.to_string()))
    }

    /// Labels in sorted order.
    pub fn labels(&self) -> Vec<&str> {
        self.secrets.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Restore the default-label invariant on data loaded from storage.
    ///
    /// Returns `true` if anything changed.
    pub fn repair_default(&mut self) -> bool {
        let dangling = match &self.default_label {
            Some(label) => !self.secrets.contains_key(label),
            None => !self.secrets.is_empty(),
        };
        if dangling {
            self.default_label = self.secrets.keys().next().cloned();
        }
        dangling
    }
}

/// Repair every vault in a freshly loaded snapshot.
pub fn repair_snapshot(snapshot: &mut Snapshot) {
    for (user_id, vault) in snapshot.iter_mut() {
        if vault.repair_default() {
            tracing::debug!(user_id = %user_id, "Repaired dangling default label");
        }
    }
}
