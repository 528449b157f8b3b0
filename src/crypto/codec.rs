//! Secret value codec: turns plaintext secrets into stored envelopes and back.
//!
//! Envelope layout:
//!
//! ```text
//! enc:v1:<base64 iv>:<base64 tag>:<base64 ciphertext>
//! ```
//!
//! Values without the `enc:v1:` prefix are plaintext envelopes and pass
//! through `decrypt` untouched, so a store may hold a mix of both forms.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{error, info};
use zeroize::Zeroize;

use super::encryption::{open, seal};
use super::keys::EnvelopeKey;
use crate::errors::{DecryptionError, Result};

/// Literal prefix that marks an encrypted envelope.
pub const ENVELOPE_PREFIX: &str = "enc:v1:";

/// `enc`, `v1`, iv, tag, ciphertext.
const ENVELOPE_FIELDS: usize = 5;

/// Encrypts and decrypts individual secret values.
///
/// The key is fixed at construction.  Without a usable key the codec runs
/// in passthrough mode for the whole process.
pub struct SecretCodec {
    key: Option<EnvelopeKey>,
}

impl SecretCodec {
    /// Build a codec from optional Base64 key material.
    ///
    /// Malformed material is not fatal: it is logged as an error and the
    /// codec degrades to passthrough.
    pub fn new(key_material: Option<&str>) -> Self {
        let material = key_material.map(str::trim).filter(|m| !m.is_empty());

        let key = match material {
            None => None,
            Some(material) => match EnvelopeKey::from_base64(material) {
                Ok(key) => {
                    info!("Secret encryption enabled (AES-256-GCM)");
                    Some(key)
                }
                Err(e) => {
                    error!(
                        error = %e,
                        "Invalid encryption key material; new secrets will be stored UNENCRYPTED"
                    );
                    None
                }
            },
        };

        Self { key }
    }

    /// A codec that never encrypts.
    pub fn passthrough() -> Self {
        Self { key: None }
    }

    pub fn encryption_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// Returns `true` if `value` carries the encrypted-envelope prefix.
    pub fn is_encrypted(value: &str) -> bool {
        value.starts_with(ENVELOPE_PREFIX)
    }

    /// Encrypt `plaintext` into a versioned envelope.
    ///
    /// In passthrough mode the plaintext is returned unchanged.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let Some(key) = &self.key else {
            return Ok(plaintext.to_string());
        };

        let sealed = seal(key.as_bytes(), plaintext.as_bytes())?;

        Ok(format!(
            "{ENVELOPE_PREFIX}{}:{}:{}",
            BASE64.encode(sealed.nonce),
            BASE64.encode(sealed.tag),
            BASE64.encode(&sealed.ciphertext)
        ))
    }

    /// Recover the plaintext held by `envelope`.
    ///
    /// Plaintext envelopes are returned as-is.  Encrypted envelopes fail
    /// closed: a missing key, a malformed envelope or a failed tag check
    /// is an error, never a best-effort result.
    pub fn decrypt(&self, envelope: &str) -> std::result::Result<String, DecryptionError> {
        if !Self::is_encrypted(envelope) {
            return Ok(envelope.to_string());
        }

        let key = self.key.as_ref().ok_or(DecryptionError::MissingKey)?;

        let parts: Vec<&str> = envelope.split(':').collect();
        if parts.len() != ENVELOPE_FIELDS {
            return Err(DecryptionError::MalformedEnvelope(format!(
                "expected {ENVELOPE_FIELDS} colon-separated fields, got {}",
                parts.len()
            )));
        }

        let iv = decode_field("iv", parts[2])?;
        let tag = decode_field("tag", parts[3])?;
        let ciphertext = decode_field("ciphertext", parts[4])?;

        let plaintext = open(key.as_bytes(), &iv, &tag, &ciphertext)?;

        String::from_utf8(plaintext).map_err(|e| {
            let mut bad_bytes = e.into_bytes();
            bad_bytes.zeroize();
            DecryptionError::InvalidUtf8
        })
    }
}

impl std::fmt::Debug for SecretCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCodec")
            .field("encryption_enabled", &self.encryption_enabled())
            .finish()
    }
}

fn decode_field(name: &str, value: &str) -> std::result::Result<Vec<u8>, DecryptionError> {
    BASE64
        .decode(value)
        .map_err(|e| DecryptionError::MalformedEnvelope(format!("{name} is not valid Base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn key_material(byte: u8) -> String {
        BASE64.encode([byte; 64])
    }

    #[test]
    fn passthrough_leaves_values_alone() {
        let codec = SecretCodec::new(None);
        assert!(!codec.encryption_enabled());
        assert_eq!(codec.encrypt("JBSWY3DPEHPK3PXP").unwrap(), "JBSWY3DPEHPK3PXP");
        assert_eq!(codec.decrypt("JBSWY3DPEHPK3PXP").unwrap(), "JBSWY3DPEHPK3PXP");
    }

    #[test]
    fn blank_key_material_means_passthrough() {
        assert!(!SecretCodec::new(Some("   ")).encryption_enabled());
    }

    #[test]
    fn wrong_length_key_degrades_to_passthrough() {
        let codec = SecretCodec::new(Some(BASE64.encode([1u8; 32]).as_str()));
        assert!(!codec.encryption_enabled());
        assert_eq!(codec.encrypt("ABC").unwrap(), "ABC");
    }

    #[test]
    #[traced_test]
    fn wrong_length_key_is_logged_as_unencrypted() {
        SecretCodec::new(Some(BASE64.encode([1u8; 32]).as_str()));

        assert!(logs_contain("Invalid encryption key material"));
        assert!(logs_contain("UNENCRYPTED"));
        assert!(logs_contain("exactly 64 bytes"));
    }

    #[test]
    #[traced_test]
    fn valid_key_logs_encryption_enabled() {
        SecretCodec::new(Some(key_material(3).as_str()));

        assert!(logs_contain("Secret encryption enabled"));
        assert!(!logs_contain("UNENCRYPTED"));
    }

    #[test]
    fn envelope_has_five_fields_and_prefix() {
        let codec = SecretCodec::new(Some(key_material(3).as_str()));
        let envelope = codec.encrypt("JBSWY3DPEHPK3PXP").unwrap();
        assert!(envelope.starts_with(ENVELOPE_PREFIX));
        assert_eq!(envelope.split(':').count(), 5);
    }

    #[test]
    fn same_plaintext_encrypts_differently() {
        let codec = SecretCodec::new(Some(key_material(3).as_str()));
        assert_ne!(codec.encrypt("same").unwrap(), codec.encrypt("same").unwrap());
    }

    #[test]
    fn ciphertext_without_key_is_missing_key() {
        let encrypted = SecretCodec::new(Some(key_material(3).as_str())).encrypt("x1").unwrap();
        let err = SecretCodec::passthrough().decrypt(&encrypted).unwrap_err();
        assert_eq!(err, DecryptionError::MissingKey);
    }

    #[test]
    fn extra_field_is_malformed() {
        let codec = SecretCodec::new(Some(key_material(3).as_str()));
        let envelope = format!("{}:AAAA", codec.encrypt("x1").unwrap());
        assert!(matches!(
            codec.decrypt(&envelope),
            Err(DecryptionError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn debug_does_not_leak_key() {
        let codec = SecretCodec::new(Some(key_material(3).as_str()));
        assert_eq!(
            format!("{codec:?}"),
            "SecretCodec { encryption_enabled: true }"
        );
    }
}
