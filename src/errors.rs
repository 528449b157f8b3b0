use thiserror::Error;

/// Reasons a stored envelope could not be turned back into plaintext.
///
/// Kept apart from [`VaultError`] so callers can tell a key or integrity
/// problem from an ordinary "no such label".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecryptionError {
    #[error("secret is encrypted but SECRET_ENCRYPTION_KEY_BASE64 is not configured")]
    MissingKey,

    #[error("invalid encrypted payload format: {0}")]
    MalformedEnvelope(String),

    #[error("authentication failed — wrong key or tampered ciphertext")]
    AuthenticationFailed,

    #[error("decrypted secret is not valid UTF-8")]
    InvalidUtf8,
}

/// All errors that can occur in AuthVault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    Decryption(#[from] DecryptionError),

    // --- Vault errors ---
    #[error("Label must be 2-32 characters of lowercase letters, digits, `_` or `-` (got '{0}')")]
    InvalidLabel(String),

    #[error("Secret is not valid Base32: {0}")]
    InvalidSecret(String),

    #[error("Label '{0}' not found")]
    LabelNotFound(String),

    #[error("No secret available — save one, pass --secret, or set a default label")]
    NoSecretAvailable,

    #[error("Code generator returned '{0}', expected 6 digits")]
    InvalidCode(String),

    // --- Config errors ---
    #[error("Config error: {0}")]
    Config(String),

    // --- Storage errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Storage backend did not apply the update for user '{0}'")]
    UpdateSkipped(String),

    #[error("Remote write failed for {failed} of {total} user documents")]
    PartialWrite { failed: usize, total: usize },
}

impl From<mongodb::error::Error> for VaultError {
    fn from(err: mongodb::error::Error) -> Self {
        VaultError::Remote(err.to_string())
    }
}

/// Convenience type alias for AuthVault results.
pub type Result<T> = std::result::Result<T, VaultError>;
