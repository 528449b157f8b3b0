//! Envelope key derivation.
//!
//! The configured key material is a Base64 string that must decode to
//! exactly 64 bytes.  Those bytes act as a high-entropy passphrase: they
//! are hashed once with SHA-256 and the 32-byte digest becomes the
//! AES-256-GCM key.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

use crate::errors::{Result, VaultError};

/// Required length of the decoded key material.
pub const KEY_MATERIAL_LEN: usize = 64;

/// Length of the derived AEAD key (256 bits).
const KEY_LEN: usize = 32;

/// A derived 32-byte AEAD key that zeroes its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct EnvelopeKey {
    bytes: [u8; KEY_LEN],
}

impl EnvelopeKey {
    /// Decode Base64 key material and derive the AEAD key from it.
    pub fn from_base64(material: &str) -> Result<Self> {
        let raw = Zeroizing::new(BASE64.decode(material.trim()).map_err(|e| {
            VaultError::Config(format!("SECRET_ENCRYPTION_KEY_BASE64 is not valid Base64: {e}"))
        })?);

        if raw.len() != KEY_MATERIAL_LEN {
            return Err(VaultError::Config(format!(
                "SECRET_ENCRYPTION_KEY_BASE64 must decode to exactly {KEY_MATERIAL_LEN} bytes, got {}",
                raw.len()
            )));
        }

        Ok(Self::derive(&raw))
    }

    /// Hash raw key material into the AEAD key.
    pub fn derive(material: &[u8]) -> Self {
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&Sha256::digest(material));
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EnvelopeKey([REDACTED])")
    }
}
