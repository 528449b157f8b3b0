//! AES-256-GCM authenticated encryption with a detached tag.
//!
//! Each call to `seal` generates a fresh random 12-byte nonce.  The nonce,
//! the 16-byte authentication tag and the ciphertext are returned as
//! separate parts because the envelope format stores them as separate
//! fields.  Associated data is always empty.

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use crate::errors::{DecryptionError, Result, VaultError};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Output of one `seal` call.
#[derive(Debug, Clone)]
pub struct Sealed {
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
}

/// Encrypt `plaintext` with a 32-byte `key` under a fresh random nonce.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<Sealed> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| VaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(&nonce, b"", &mut buffer)
        .map_err(|e| VaultError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    nonce_bytes.copy_from_slice(nonce.as_slice());
    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(tag.as_slice());

    Ok(Sealed {
        nonce: nonce_bytes,
        tag: tag_bytes,
        ciphertext: buffer,
    })
}

/// Decrypt and verify data produced by `seal`.
///
/// Any length mismatch or tag failure yields an error; no partially
/// decrypted bytes are ever returned.
pub fn open(
    key: &[u8; 32],
    nonce: &[u8],
    tag: &[u8],
    ciphertext: &[u8],
) -> std::result::Result<Vec<u8>, DecryptionError> {
    if nonce.len() != NONCE_LEN {
        return Err(DecryptionError::MalformedEnvelope(format!(
            "iv must be {NONCE_LEN} bytes, got {}",
            nonce.len()
        )));
    }
    if tag.len() != TAG_LEN {
        return Err(DecryptionError::MalformedEnvelope(format!(
            "tag must be {TAG_LEN} bytes, got {}",
            tag.len()
        )));
    }

    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| DecryptionError::AuthenticationFailed)?;

    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(nonce),
            b"",
            &mut buffer,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| DecryptionError::AuthenticationFailed)?;

    Ok(buffer)
}
