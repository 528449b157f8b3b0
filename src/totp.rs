//! One-time code generation.
//!
//! The vault only needs `secret -> 6-digit code`; [`CodeGenerator`] is that
//! boundary and [`Totp`] the RFC 6238 implementation used by the binary.

use chrono::Utc;
use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::errors::{Result, VaultError};

/// Turns a Base32 secret into a current numeric code.
pub trait CodeGenerator: Send + Sync {
    /// Fails with [`VaultError::InvalidSecret`] for secrets it cannot use.
    fn generate(&self, secret_base32: &str) -> Result<String>;
}

/// RFC 6238 TOTP: HMAC-SHA1, 30 second step, 6 digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Totp;

impl Totp {
    pub const STEP_SECS: u64 = 30;
    pub const DIGITS: u32 = 6;

    /// Code for the step containing `unix_secs`.
    pub fn generate_at(&self, secret_base32: &str, unix_secs: u64) -> Result<String> {
        let key = decode_secret(secret_base32)?;
        let counter = unix_secs / Self::STEP_SECS;

        let mut mac = Hmac::<Sha1>::new_from_slice(&key)
            .map_err(|e| VaultError::InvalidSecret(format!("unusable key: {e}")))?;
        mac.update(&counter.to_be_bytes());
        let digest = mac.finalize().into_bytes();

        // RFC 4226 dynamic truncation.
        let offset = usize::from(digest[digest.len() - 1] & 0x0f);
        let binary = u32::from_be_bytes([
            digest[offset] & 0x7f,
            digest[offset + 1],
            digest[offset + 2],
            digest[offset + 3],
        ]);

        let code = binary % 10u32.pow(Self::DIGITS);
        Ok(format!("{code:0width$}", width = Self::DIGITS as usize))
    }
}

impl CodeGenerator for Totp {
    fn generate(&self, secret_base32: &str) -> Result<String> {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        self.generate_at(secret_base32, now)
    }
}

fn decode_secret(secret: &str) -> Result<Vec<u8>> {
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let key = BASE32_NOPAD
        .decode(normalized.as_bytes())
        .map_err(|e| VaultError::InvalidSecret(e.to_string()))?;

    if key.is_empty() {
        return Err(VaultError::InvalidSecret("secret is empty".into()));
    }
    Ok(key)
}
