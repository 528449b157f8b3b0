//! User-facing vault operations.
//!
//! `VaultService` ties together the store, the codec and the code
//! generator.  Secrets are encrypted before they are inserted and
//! decrypted only when a code is requested.

use tracing::{debug, info};

use super::model::Vault;
use super::validate::{
    is_likely_base32, is_valid_code_format, is_valid_label, normalize_label, normalize_secret,
};
use crate::config::Settings;
use crate::crypto::SecretCodec;
use crate::errors::{Result, VaultError};
use crate::storage::{StorageMode, VaultStore};
use crate::totp::{CodeGenerator, Totp};

/// Result of a successful `save`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub label: String,
    pub encrypted: bool,
    pub replaced: bool,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelListing {
    pub labels: Vec<String>,
    pub default_label: Option<String>,
}

/// Where the secret behind a generated code came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeSource {
    OneOff,
    Label(String),
    DefaultLabel(String),
}

impl std::fmt::Display for CodeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeSource::OneOff => f.write_str("manual secret"),
            CodeSource::Label(label) => write!(f, "label `{label}`"),
            CodeSource::DefaultLabel(label) => write!(f, "default label `{label}`"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCode {
    pub code: String,
    pub source: CodeSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultStatus {
    pub label_count: usize,
    pub default_label: Option<String>,
    pub encryption_enabled: bool,
    pub storage_mode: StorageMode,
}

pub struct VaultService {
    store: VaultStore,
    codec: SecretCodec,
    generator: Box<dyn CodeGenerator>,
}

impl VaultService {
    pub fn new(store: VaultStore, codec: SecretCodec, generator: Box<dyn CodeGenerator>) -> Self {
        Self {
            store,
            codec,
            generator,
        }
    }

    /// Build the service from settings: pick the storage backend, set up
    /// the codec, and use RFC 6238 TOTP for codes.
    pub async fn initialize(settings: &Settings) -> Self {
        let store = VaultStore::initialize(settings).await;
        let codec = SecretCodec::new(settings.encryption_key.as_deref());
        Self::new(store, codec, Box::new(Totp))
    }

    pub fn store(&self) -> &VaultStore {
        &self.store
    }

    pub fn codec(&self) -> &SecretCodec {
        &self.codec
    }

    /// Save `secret` under `label`, replacing any existing value.
    ///
    /// The secret must be Base32 and accepted by the code generator.
    pub async fn save(&self, user_id: &str, label: &str, secret: &str) -> Result<SaveOutcome> {
        let label = checked_label(label)?;
        let secret = self.checked_secret(secret)?;

        let envelope = self.codec.encrypt(&secret)?;
        let encrypted = SecretCodec::is_encrypted(&envelope);

        let (replaced, is_default) = self
            .store
            .update_vault(user_id, |vault| {
                let replaced = vault.insert_secret(&label, envelope);
                Ok((replaced, vault.default_label.as_deref() == Some(label.as_str())))
            })
            .await?;

        info!(user_id, label = %label, encrypted, replaced, "Saved secret");

        Ok(SaveOutcome {
            label,
            encrypted,
            replaced,
            is_default,
        })
    }

    pub async fn list(&self, user_id: &str) -> Result<LabelListing> {
        let vault = self.store.vault(user_id).await?;
        Ok(LabelListing {
            labels: vault.labels().into_iter().map(str::to_string).collect(),
            default_label: vault.default_label,
        })
    }

    /// Remove `label`; returns the new default label.
    pub async fn remove(&self, user_id: &str, label: &str) -> Result<Option<String>> {
        let label = normalize_label(label);

        let new_default = self
            .store
            .update_vault(user_id, |vault| {
                vault.remove_secret(&label)?;
                Ok(vault.default_label.clone())
            })
            .await?;

        info!(user_id, label = %label, "Removed secret");
        Ok(new_default)
    }

    pub async fn set_default(&self, user_id: &str, label: &str) -> Result<String> {
        let label = normalize_label(label);

        self.store
            .update_vault(user_id, |vault| vault.set_default(&label))
            .await?;

        info!(user_id, label = %label, "Default label changed");
        Ok(label)
    }

    /// Generate a code.
    ///
    /// A one-off `secret` wins over `label`, which wins over the vault's
    /// default label.
    pub async fn code(
        &self,
        user_id: &str,
        label: Option<&str>,
        secret: Option<&str>,
    ) -> Result<GeneratedCode> {
        let one_off = secret.map(normalize_secret).filter(|s| !s.is_empty());
        let label = label.map(normalize_label).filter(|l| !l.is_empty());

        let (plaintext, source) = if let Some(secret) = one_off {
            (self.checked_secret(&secret)?, CodeSource::OneOff)
        } else {
            let vault = self.store.vault(user_id).await?;
            match (label, &vault.default_label) {
                (Some(label), _) => (self.open(&vault, &label)?, CodeSource::Label(label)),
                (None, Some(default)) => (
                    self.open(&vault, default)?,
                    CodeSource::DefaultLabel(default.clone()),
                ),
                (None, None) => return Err(VaultError::NoSecretAvailable),
            }
        };

        let code = self.generator.generate(&plaintext)?;
        if !is_valid_code_format(&code) {
            return Err(VaultError::InvalidCode(code));
        }

        debug!(user_id, source = %source, "Generated code");
        Ok(GeneratedCode { code, source })
    }

    pub async fn status(&self, user_id: &str) -> Result<VaultStatus> {
        let vault = self.store.vault(user_id).await?;
        Ok(VaultStatus {
            label_count: vault.len(),
            default_label: vault.default_label,
            encryption_enabled: self.codec.encryption_enabled(),
            storage_mode: self.store.mode(),
        })
    }

    /// Decrypt the secret stored under `label`.
    fn open(&self, vault: &Vault, label: &str) -> Result<String> {
        let envelope = vault.envelope(label)?;
        Ok(self.codec.decrypt(envelope)?)
    }

    fn checked_secret(&self, raw: &str) -> Result<String> {
        let secret = normalize_secret(raw);
        if !is_likely_base32(&secret) {
            return Err(VaultError::InvalidSecret(
                "use Base32 characters A-Z and 2-7".into(),
            ));
        }
        // Prove the generator can actually use it before it is stored.
        self.generator.generate(&secret).map_err(|e| match e {
            VaultError::InvalidSecret(_) => e,
            other => VaultError::InvalidSecret(other.to_string()),
        })?;
        Ok(secret)
    }
}

fn checked_label(raw: &str) -> Result<String> {
    let label = normalize_label(raw);
    if !is_valid_label(&label) {
        return Err(VaultError::InvalidLabel(label));
    }
    Ok(label)
}
