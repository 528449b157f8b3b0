//! Vault module — per-user labelled TOTP secrets.
//!
//! This module provides:
//! - `Vault` and `Snapshot` types (`model`)
//! - Label, secret and code format checks (`validate`)
//! - High-level `VaultService` operations used by CLI commands (`service`)

pub mod model;
pub mod service;
pub mod validate;

// Re-export the most commonly used items.
pub use model::{Snapshot, Vault};
pub use service::{
    CodeSource, GeneratedCode, LabelListing, SaveOutcome, VaultService, VaultStatus,
};
