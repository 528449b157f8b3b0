//! Backend selection and the read/write surface used by the rest of the app.
//!
//! `VaultStore` picks its backend once, in `initialize`, and keeps it for
//! its whole lifetime.  Construct it at startup and share it by reference.

use tokio::sync::Mutex;
use tracing::warn;

use super::file::FileBackend;
use super::mongo::MongoConnector;
use super::remote::{RemoteBackend, RemoteConnector};
use super::{StorageBackend, StorageMode};
use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::vault::{Snapshot, Vault};

pub struct VaultStore {
    backend: Box<dyn StorageBackend>,

    /// Serializes read-modify-write cycles issued through this store.
    writer: Mutex<()>,
}

impl VaultStore {
    pub fn with_backend(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            backend,
            writer: Mutex::new(()),
        }
    }

    /// Store backed by a local JSON file.
    pub fn local(path: impl Into<std::path::PathBuf>) -> Self {
        Self::with_backend(Box::new(FileBackend::new(path)))
    }

    /// Select the backend for this process using the MongoDB driver.
    pub async fn initialize(settings: &Settings) -> Self {
        Self::initialize_with(settings, &MongoConnector).await
    }

    /// Select the backend using a specific remote connector.
    ///
    /// The remote backend is used when configured and reachable;
    /// otherwise the local file at `settings.data_file`.
    pub async fn initialize_with(settings: &Settings, connector: &dyn RemoteConnector) -> Self {
        match RemoteBackend::initialize(settings.remote.as_ref(), connector).await {
            Some(remote) => Self::with_backend(Box::new(remote)),
            None => {
                if settings.remote.is_some() {
                    warn!(
                        path = %settings.data_file.display(),
                        "Using local JSON store for the rest of this process"
                    );
                }
                Self::local(&settings.data_file)
            }
        }
    }

    pub fn mode(&self) -> StorageMode {
        self.backend.mode()
    }

    /// Load the full snapshot.
    pub async fn read(&self) -> Result<Snapshot> {
        self.backend.read().await
    }

    /// Persist a full snapshot.
    ///
    /// Whatever changed between the caller's `read` and this call in
    /// other users' entries is overwritten; prefer [`Self::update_vault`].
    pub async fn write(&self, snapshot: &Snapshot) -> Result<()> {
        let _guard = self.writer.lock().await;
        self.backend.write(snapshot).await
    }

    /// One user's vault, empty if the user has none yet.
    pub async fn vault(&self, user_id: &str) -> Result<Vault> {
        Ok(self.backend.read_entry(user_id).await?.unwrap_or_default())
    }

    /// Apply `mutate` to one user's vault and persist only that user.
    ///
    /// Cycles are serialized, so concurrent updates never lose each
    /// other's changes.  If `mutate` fails nothing is written.
    pub async fn update_vault<T, F>(&self, user_id: &str, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut Vault) -> Result<T> + Send,
        T: Send,
    {
        let _guard = self.writer.lock().await;

        let mut output = None;
        self.backend
            .update_entry(
                user_id,
                Box::new(|vault: &mut Vault| -> Result<()> {
                    output = Some(mutate(vault)?);
                    Ok(())
                }),
            )
            .await?;

        output.ok_or_else(|| VaultError::UpdateSkipped(user_id.to_string()))
    }
}
