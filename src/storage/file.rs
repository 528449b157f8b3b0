//! Local JSON file backend.
//!
//! The whole snapshot lives in one pretty-printed JSON object keyed by
//! user id.  Writes go to a uniquely named `<artifact>.tmp.<pid>.<seq>` file
//! in the same directory and are renamed over the artifact, so the
//! artifact always holds either the previous or the new complete snapshot.
//!
//! A file that fails to parse is copied to `<artifact>.broken.<unix ms>`
//! and replaced with an empty snapshot instead of failing the read.
//!
//! Every operation that may create, reset or replace the artifact runs
//! under one lock shared by clones of the backend.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error};

use super::{EntryMutation, StorageBackend, StorageMode};
use crate::errors::{Result, VaultError};
use crate::vault::model::repair_snapshot;
use crate::vault::{Snapshot, Vault};

const EMPTY_SNAPSHOT: &[u8] = b"{}";

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `path` is one of this backend's temp files.
    pub fn is_temp_path(&self, path: &Path) -> bool {
        let prefix = self.sibling(".tmp.");
        let prefix = prefix.to_string_lossy();
        path.to_string_lossy().starts_with(&*prefix)
    }

    /// Create the parent directory and an empty artifact if missing.
    ///
    /// Touches nothing when both already exist.
    pub async fn ensure(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.ensure_locked().await
    }

    async fn ensure_locked(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        if !fs::try_exists(&self.path).await? {
            debug!(path = %self.path.display(), "Initializing empty vault store file");
            self.write_atomic(EMPTY_SNAPSHOT).await?;
        }

        Ok(())
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    }

    /// Fresh temp file name; never shared between two writes.
    fn next_temp_path(&self) -> PathBuf {
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        self.sibling(&format!(".tmp.{}.{seq}", std::process::id()))
    }

    /// Write `contents` to a temp file, flush it, then rename it over the
    /// artifact.
    async fn write_atomic(&self, contents: &[u8]) -> Result<()> {
        let tmp_path = self.next_temp_path();

        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn write_snapshot_locked(&self, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| VaultError::Serialization(format!("snapshot: {e}")))?;
        self.write_atomic(&json).await
    }

    /// Read and parse the artifact, recovering from corruption.
    async fn load_locked(&self) -> Result<Snapshot> {
        self.ensure_locked().await?;

        let raw = fs::read(&self.path).await?;
        match parse_snapshot(&raw) {
            Ok(mut snapshot) => {
                repair_snapshot(&mut snapshot);
                Ok(snapshot)
            }
            Err(e) => {
                self.recover_corrupted(&e).await?;
                Ok(Snapshot::new())
            }
        }
    }

    /// First `<artifact>.broken.<ms>` name not already taken.
    async fn backup_path(&self) -> Result<PathBuf> {
        let mut stamp = Utc::now().timestamp_millis();
        loop {
            let candidate = self.sibling(&format!(".broken.{stamp}"));
            if !fs::try_exists(&candidate).await? {
                return Ok(candidate);
            }
            stamp += 1;
        }
    }

    /// Back up a corrupted artifact and reset it to an empty snapshot.
    async fn recover_corrupted(&self, cause: &serde_json::Error) -> Result<PathBuf> {
        let backup = self.backup_path().await?;

        if let Err(e) = fs::copy(&self.path, &backup).await {
            error!(
                path = %self.path.display(),
                backup = %backup.display(),
                error = %e,
                "Failed to back up broken store file"
            );
        }

        self.write_atomic(EMPTY_SNAPSHOT).await?;

        error!(
            path = %self.path.display(),
            backup = %backup.display(),
            cause = %cause,
            "Store file was corrupted; reinitialized empty store"
        );

        Ok(backup)
    }
}

/// Parse the artifact.  A top-level `null` is an empty store and `null`
/// user entries are dropped; anything else that is not an object of
/// vaults is an error.
fn parse_snapshot(raw: &[u8]) -> serde_json::Result<Snapshot> {
    let parsed: Option<BTreeMap<String, Option<Vault>>> = serde_json::from_slice(raw)?;

    Ok(parsed
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(user_id, vault)| {
            if vault.is_none() {
                debug!(user_id = %user_id, "Skipping null vault entry");
            }
            vault.map(|v| (user_id, v))
        })
        .collect())
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn read(&self) -> Result<Snapshot> {
        let _guard = self.lock.lock().await;
        self.load_locked().await
    }

    async fn write(&self, snapshot: &Snapshot) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.ensure_locked().await?;
        self.write_snapshot_locked(snapshot).await
    }

    async fn write_entry(&self, user_id: &str, vault: &Vault) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut snapshot = self.load_locked().await?;
        snapshot.insert(user_id.to_string(), vault.clone());
        self.write_snapshot_locked(&snapshot).await
    }

    /// One parse and one rewrite of the artifact, all under the lock.
    async fn update_entry<'a>(&self, user_id: &str, mutate: EntryMutation<'a>) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut snapshot = self.load_locked().await?;

        let mut vault = snapshot.remove(user_id).unwrap_or_default();
        mutate(&mut vault)?;
        snapshot.insert(user_id.to_string(), vault);

        self.write_snapshot_locked(&snapshot).await
    }

    fn mode(&self) -> StorageMode {
        StorageMode::LocalFile
    }
}
