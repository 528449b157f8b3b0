//! In-memory stand-ins for the remote store.
//!
//! `MemoryConnector` succeeds only for the TLS modes it is told to accept
//! and records every attempt.  `MemoryCollection` keeps documents in a
//! `Vec` and can be told to reject writes for particular users.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::remote::{RemoteConnector, UserDocument, VaultCollection};
use crate::config::RemoteSettings;
use crate::errors::{Result, VaultError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub struct MemoryCollection {
    documents: Mutex<Vec<UserDocument>>,
    failing_users: Mutex<HashSet<String>>,
    replace_calls: Mutex<usize>,
    find_all_calls: Mutex<usize>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document as-is, bypassing upsert matching.
    pub fn insert_raw(&self, document: UserDocument) {
        lock(&self.documents).push(document);
    }

    /// Make every later `replace_one` for `user_id` fail.
    pub fn fail_writes_for(&self, user_id: &str) {
        lock(&self.failing_users).insert(user_id.to_string());
    }

    pub fn documents(&self) -> Vec<UserDocument> {
        lock(&self.documents).clone()
    }

    pub fn document(&self, user_id: &str) -> Option<UserDocument> {
        lock(&self.documents)
            .iter()
            .find(|d| d.user_id.as_deref() == Some(user_id))
            .cloned()
    }

    /// Number of full-collection scans.
    pub fn find_all_calls(&self) -> usize {
        *lock(&self.find_all_calls)
    }

    /// Number of `replace_one` calls, failed ones included.
    pub fn replace_calls(&self) -> usize {
        *lock(&self.replace_calls)
    }
}

#[async_trait]
impl VaultCollection for MemoryCollection {
    async fn find_all(&self) -> Result<Vec<UserDocument>> {
        *lock(&self.find_all_calls) += 1;
        Ok(self.documents())
    }

    async fn find_one(&self, user_id: &str) -> Result<Option<UserDocument>> {
        Ok(self.document(user_id))
    }

    async fn replace_one(&self, document: &UserDocument) -> Result<()> {
        *lock(&self.replace_calls) += 1;

        let user_id = document
            .user_id
            .clone()
            .ok_or_else(|| VaultError::Remote("document has no userId".into()))?;

        if lock(&self.failing_users).contains(&user_id) {
            return Err(VaultError::Remote(format!("write rejected for {user_id}")));
        }

        let mut documents = lock(&self.documents);
        match documents
            .iter_mut()
            .find(|d| d.user_id.as_deref() == Some(user_id.as_str()))
        {
            Some(existing) => *existing = document.clone(),
            None => documents.push(document.clone()),
        }
        Ok(())
    }
}

pub struct MemoryConnector {
    collection: Arc<MemoryCollection>,
    accepted_tls_modes: Vec<bool>,
    attempts: Mutex<Vec<bool>>,
}

impl MemoryConnector {
    /// A connector that succeeds only when asked for one of `tls_modes`.
    pub fn accepting(tls_modes: &[bool], collection: Arc<MemoryCollection>) -> Self {
        Self {
            collection,
            accepted_tls_modes: tls_modes.to_vec(),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// A connector whose every attempt fails.
    pub fn unreachable() -> Self {
        Self::accepting(&[], Arc::new(MemoryCollection::new()))
    }

    /// TLS mode of each connection attempt, in order.
    pub fn attempts(&self) -> Vec<bool> {
        lock(&self.attempts).clone()
    }
}

#[async_trait]
impl RemoteConnector for MemoryConnector {
    async fn connect(
        &self,
        settings: &RemoteSettings,
        tls: bool,
    ) -> Result<Arc<dyn VaultCollection>> {
        lock(&self.attempts).push(tls);

        if self.accepted_tls_modes.contains(&tls) {
            let collection: Arc<dyn VaultCollection> = self.collection.clone();
            Ok(collection)
        } else {
            Err(VaultError::Remote(format!(
                "server selection timed out after {:?} (tls={tls})",
                settings.server_selection_timeout
            )))
        }
    }
}
