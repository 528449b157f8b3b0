//! Cryptographic primitives for AuthVault.
//!
//! This module provides:
//! - AES-256-GCM encryption with a detached tag (`encryption`)
//! - SHA-256 derivation of the AEAD key from configured key material (`keys`)
//! - The versioned secret envelope codec (`codec`)

pub mod codec;
pub mod encryption;
pub mod keys;

pub use codec::{SecretCodec, ENVELOPE_PREFIX};
pub use encryption::{open, seal, Sealed};
pub use keys::EnvelopeKey;
