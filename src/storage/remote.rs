//! Remote document-store backend.
//!
//! One document per user: `{ userId, secrets, defaultLabel }`, with the
//! vault fields flattened to the top level and `userId` uniquely indexed.
//!
//! Connecting goes through [`RemoteConnector`] and document access through
//! [`VaultCollection`], so the TLS negotiation and write-isolation rules
//! here are independent of the driver.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{StorageBackend, StorageMode};
use crate::config::RemoteSettings;
use crate::errors::{Result, VaultError};
use crate::vault::{Snapshot, Vault};

/// Stored shape of one user's vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDocument {
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(flatten)]
    pub vault: Vault,
}

impl UserDocument {
    pub fn new(user_id: &str, vault: Vault) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            vault,
        }
    }
}

/// Access to the collection holding user documents.
#[async_trait]
pub trait VaultCollection: Send + Sync {
    async fn find_all(&self) -> Result<Vec<UserDocument>>;

    /// The document whose `userId` is `user_id`, if any.
    async fn find_one(&self, user_id: &str) -> Result<Option<UserDocument>>;

    /// Replace the document with the same `userId`, inserting it if absent.
    async fn replace_one(&self, document: &UserDocument) -> Result<()>;
}

/// Opens a collection handle in a given TLS mode.
///
/// Implementations must bound the attempt by the configured server
/// selection timeout and ensure the unique `userId` index exists.
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    async fn connect(&self, settings: &RemoteSettings, tls: bool)
        -> Result<Arc<dyn VaultCollection>>;
}

pub struct RemoteBackend {
    collection: Arc<dyn VaultCollection>,
    namespace: String,
}

impl RemoteBackend {
    /// Wrap an already-connected collection.
    pub fn new(collection: Arc<dyn VaultCollection>, namespace: impl Into<String>) -> Self {
        Self {
            collection,
            namespace: namespace.into(),
        }
    }

    /// Try to bring up the remote backend.
    ///
    /// Returns `None` when no endpoint is configured or when connecting
    /// failed; the caller then uses the local file for the rest of the
    /// process.  A failed first attempt is retried exactly once with the
    /// opposite TLS mode, unless TLS was pinned by configuration or by
    /// the connection string.
    pub async fn initialize(
        settings: Option<&RemoteSettings>,
        connector: &dyn RemoteConnector,
    ) -> Option<Self> {
        let Some(settings) = settings else {
            info!("Storage mode: local file JSON");
            return None;
        };
        let namespace = settings.namespace();

        let first_error = match connector.connect(settings, settings.tls).await {
            Ok(collection) => {
                info!(namespace = %namespace, tls = settings.tls, "Storage mode: remote document store");
                return Some(Self::new(collection, namespace));
            }
            Err(e) => e,
        };

        if !settings.tls_flip_allowed() {
            warn!(
                error = %first_error,
                tls = settings.tls,
                "Remote store connection failed, falling back to local JSON store"
            );
            return None;
        }

        let flipped = !settings.tls;
        warn!(
            error = %first_error,
            tls = settings.tls,
            retry_tls = flipped,
            "Remote store connection failed, retrying with TLS mode flipped"
        );

        match connector.connect(settings, flipped).await {
            Ok(collection) => {
                info!(namespace = %namespace, tls = flipped, "Storage mode: remote document store");
                Some(Self::new(collection, namespace))
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Remote store connection failed, falling back to local JSON store. \
                     Check MONGODB_TLS / MONGODB_TLS_ALLOW_INVALID_CERTIFICATES if the server has TLS constraints"
                );
                None
            }
        }
    }
}

#[async_trait]
impl StorageBackend for RemoteBackend {
    async fn read(&self) -> Result<Snapshot> {
        let mut snapshot = Snapshot::new();

        for document in self.collection.find_all().await? {
            match document.user_id.filter(|id| !id.is_empty()) {
                Some(user_id) => {
                    let mut vault = document.vault;
                    vault.repair_default();
                    snapshot.insert(user_id, vault);
                }
                None => debug!("Skipping remote document without userId"),
            }
        }

        Ok(snapshot)
    }

    async fn read_entry(&self, user_id: &str) -> Result<Option<Vault>> {
        Ok(self.collection.find_one(user_id).await?.map(|document| {
            let mut vault = document.vault;
            vault.repair_default();
            vault
        }))
    }

    /// Upsert every user independently.
    ///
    /// All upserts run to completion even if some fail; failures are
    /// logged per user and reported together afterwards.
    async fn write(&self, snapshot: &Snapshot) -> Result<()> {
        let total = snapshot.len();

        let results = join_all(snapshot.iter().map(|(user_id, vault)| async move {
            let document = UserDocument::new(user_id, vault.clone());
            (user_id, self.collection.replace_one(&document).await)
        }))
        .await;

        let mut failed = 0;
        for (user_id, result) in results {
            if let Err(e) = result {
                warn!(user_id = %user_id, error = %e, "Remote upsert failed");
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(VaultError::PartialWrite { failed, total });
        }
        Ok(())
    }

    async fn write_entry(&self, user_id: &str, vault: &Vault) -> Result<()> {
        self.collection
            .replace_one(&UserDocument::new(user_id, vault.clone()))
            .await
    }

    fn mode(&self) -> StorageMode {
        StorageMode::Remote {
            namespace: self.namespace.clone(),
        }
    }
}
