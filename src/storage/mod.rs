//! Vault persistence.
//!
//! This module provides:
//! - The `StorageBackend` trait shared by every backend
//! - A crash-consistent local JSON backend (`file`)
//! - A remote document-store backend with TLS negotiation (`remote`, `mongo`)
//! - In-memory remote fakes for tests and demos (`memory`)
//! - The `VaultStore` facade that picks a backend at startup (`store`)

pub mod file;
pub mod memory;
pub mod mongo;
pub mod remote;
pub mod store;

use std::fmt;

use async_trait::async_trait;

use crate::errors::Result;
use crate::vault::{Snapshot, Vault};

pub use file::FileBackend;
pub use memory::{MemoryCollection, MemoryConnector};
pub use mongo::MongoConnector;
pub use remote::{RemoteBackend, RemoteConnector, UserDocument, VaultCollection};
pub use store::VaultStore;

/// Which kind of backend is serving reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    LocalFile,
    Remote { namespace: String },
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::LocalFile => f.write_str("local file"),
            StorageMode::Remote { namespace } => write!(f, "remote ({namespace})"),
        }
    }
}

/// Mutation applied to one user's vault inside [`StorageBackend::update_entry`].
pub type EntryMutation<'a> = Box<dyn FnOnce(&mut Vault) -> Result<()> + Send + 'a>;

/// Snapshot-level persistence contract.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Load every user's vault.
    async fn read(&self) -> Result<Snapshot>;

    /// Persist every vault in `snapshot`.
    async fn write(&self, snapshot: &Snapshot) -> Result<()>;

    /// Load a single user's vault, `None` if the user has none.
    async fn read_entry(&self, user_id: &str) -> Result<Option<Vault>> {
        Ok(self.read().await?.remove(user_id))
    }

    /// Persist a single user's vault.
    ///
    /// The default rewrites the whole snapshot; backends that can address
    /// one user directly should override it.
    async fn write_entry(&self, user_id: &str, vault: &Vault) -> Result<()> {
        let mut snapshot = self.read().await?;
        snapshot.insert(user_id.to_string(), vault.clone());
        self.write(&snapshot).await
    }

    /// Load one user's vault (empty if absent), apply `mutate`, persist it.
    ///
    /// Nothing is written when `mutate` fails.
    async fn update_entry<'a>(&self, user_id: &str, mutate: EntryMutation<'a>) -> Result<()> {
        let mut vault = self.read_entry(user_id).await?.unwrap_or_default();
        mutate(&mut vault)?;
        self.write_entry(user_id, &vault).await
    }

    fn mode(&self) -> StorageMode;
}
