//! Integration tests for remote backend negotiation, fallback and writes.
//!
//! These run against the in-memory connector and collection; nothing here
//! needs a live database.

use std::sync::Arc;
use std::time::Duration;

use authvault::config::{RemoteSettings, Settings};
use authvault::errors::VaultError;
use authvault::storage::{
    MemoryCollection, MemoryConnector, RemoteBackend, StorageBackend, StorageMode, UserDocument,
    VaultStore,
};
use authvault::vault::{Snapshot, Vault};
use tempfile::TempDir;

fn remote(uri: &str, tls: bool, tls_explicit: bool) -> RemoteSettings {
    RemoteSettings {
        uri: uri.to_string(),
        database: "authvault".to_string(),
        collection: "user_vaults".to_string(),
        tls,
        tls_explicit,
        allow_invalid_certificates: false,
        server_selection_timeout: Duration::from_millis(5_000),
    }
}

fn vault_with(label: &str, envelope: &str) -> Vault {
    let mut vault = Vault::default();
    vault.insert_secret(label, envelope.to_string());
    vault
}

// ---------------------------------------------------------------------------
// Initialization and TLS negotiation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn no_endpoint_means_no_remote_backend() {
    let connector = MemoryConnector::unreachable();
    assert!(RemoteBackend::initialize(None, &connector).await.is_none());
    assert!(connector.attempts().is_empty());
}

#[tokio::test]
async fn connects_on_first_attempt() {
    let connector = MemoryConnector::accepting(&[false], Arc::new(MemoryCollection::new()));
    let settings = remote("mongodb://db.local", false, false);

    let backend = RemoteBackend::initialize(Some(&settings), &connector).await;

    assert!(backend.is_some());
    assert_eq!(connector.attempts(), vec![false]);
}

#[tokio::test]
async fn inferred_tls_mode_is_flipped_once() {
    let connector = MemoryConnector::accepting(&[true], Arc::new(MemoryCollection::new()));
    let settings = remote("mongodb://db.local", false, false);

    let backend = RemoteBackend::initialize(Some(&settings), &connector).await;

    assert!(backend.is_some());
    assert_eq!(connector.attempts(), vec![false, true]);
}

#[tokio::test]
async fn flip_happens_at_most_once() {
    let connector = MemoryConnector::unreachable();
    let settings = remote("mongodb://db.local", true, false);

    assert!(RemoteBackend::initialize(Some(&settings), &connector).await.is_none());
    assert_eq!(connector.attempts(), vec![true, false]);
}

#[tokio::test]
async fn explicit_tls_mode_is_never_flipped() {
    let connector = MemoryConnector::accepting(&[false], Arc::new(MemoryCollection::new()));
    let settings = remote("mongodb://db.local", true, true);

    assert!(RemoteBackend::initialize(Some(&settings), &connector).await.is_none());
    assert_eq!(connector.attempts(), vec![true]);
}

#[tokio::test]
async fn tls_mandated_by_uri_is_never_flipped() {
    let connector = MemoryConnector::accepting(&[false], Arc::new(MemoryCollection::new()));
    let settings = remote("mongodb+srv://cluster0.example.net/", true, false);

    assert!(RemoteBackend::initialize(Some(&settings), &connector).await.is_none());
    assert_eq!(connector.attempts(), vec![true]);
}

// ---------------------------------------------------------------------------
// VaultStore backend selection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_uses_remote_when_reachable() {
    let dir = TempDir::new().unwrap();
    let collection = Arc::new(MemoryCollection::new());
    let connector = MemoryConnector::accepting(&[false], collection.clone());
    let settings = Settings {
        data_file: dir.path().join("store.json"),
        remote: Some(remote("mongodb://db.local", false, false)),
        encryption_key: None,
    };

    let store = VaultStore::initialize_with(&settings, &connector).await;
    assert_eq!(
        store.mode(),
        StorageMode::Remote {
            namespace: "authvault.user_vaults".into()
        }
    );

    store
        .update_vault("u1", |vault| {
            vault.insert_secret("work", "JBSWY3DPEHPK3PXP".into());
            Ok(())
        })
        .await
        .unwrap();

    assert!(collection.document("u1").is_some());
    assert_eq!(collection.find_all_calls(), 0, "updates address one user");
    assert!(!settings.data_file.exists(), "local file must stay untouched");
}

#[tokio::test]
async fn store_falls_back_to_local_file_when_unreachable() {
    let dir = TempDir::new().unwrap();
    let connector = MemoryConnector::unreachable();
    let settings = Settings {
        data_file: dir.path().join("store.json"),
        remote: Some(remote("mongodb://db.local", false, false)),
        encryption_key: None,
    };

    let store = VaultStore::initialize_with(&settings, &connector).await;
    assert_eq!(store.mode(), StorageMode::LocalFile);

    store
        .update_vault("u1", |vault| {
            vault.insert_secret("work", "JBSWY3DPEHPK3PXP".into());
            Ok(())
        })
        .await
        .unwrap();

    assert!(settings.data_file.exists());
    // Selection is not re-evaluated per request.
    assert_eq!(connector.attempts().len(), 2);
}

#[tokio::test]
async fn store_without_remote_settings_never_connects() {
    let dir = TempDir::new().unwrap();
    let connector = MemoryConnector::accepting(&[true, false], Arc::new(MemoryCollection::new()));
    let settings = Settings {
        data_file: dir.path().join("store.json"),
        ..Settings::default()
    };

    let store = VaultStore::initialize_with(&settings, &connector).await;

    assert_eq!(store.mode(), StorageMode::LocalFile);
    assert!(connector.attempts().is_empty());
}

// ---------------------------------------------------------------------------
// Reads and writes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn read_folds_documents_by_user_and_skips_anonymous_ones() {
    let collection = Arc::new(MemoryCollection::new());
    collection.insert_raw(UserDocument::new("u1", vault_with("work", "A")));
    collection.insert_raw(UserDocument::new("u2", vault_with("home", "B")));
    collection.insert_raw(UserDocument {
        user_id: None,
        vault: vault_with("orphan", "C"),
    });
    let backend = RemoteBackend::new(collection, "authvault.user_vaults");

    let snapshot = backend.read().await.unwrap();

    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot["u1"].envelope("work").unwrap(), "A");
    assert_eq!(snapshot["u2"].envelope("home").unwrap(), "B");
}

#[tokio::test]
async fn empty_collection_reads_as_empty_snapshot() {
    let backend = RemoteBackend::new(Arc::new(MemoryCollection::new()), "ns");
    assert!(backend.read().await.unwrap().is_empty());
}

#[tokio::test]
async fn write_upserts_one_document_per_user() {
    let collection = Arc::new(MemoryCollection::new());
    collection.insert_raw(UserDocument::new("u1", vault_with("old", "X")));
    let backend = RemoteBackend::new(collection.clone(), "ns");

    let mut snapshot = Snapshot::new();
    snapshot.insert("u1".into(), vault_with("work", "A"));
    snapshot.insert("u2".into(), vault_with("home", "B"));
    backend.write(&snapshot).await.unwrap();

    assert_eq!(collection.documents().len(), 2);
    assert_eq!(collection.document("u1").unwrap().vault, vault_with("work", "A"));
    assert_eq!(backend.read().await.unwrap(), snapshot);
}

#[tokio::test]
async fn failure_for_one_user_does_not_block_others() {
    let collection = Arc::new(MemoryCollection::new());
    collection.fail_writes_for("u2");
    let backend = RemoteBackend::new(collection.clone(), "ns");

    let mut snapshot = Snapshot::new();
    snapshot.insert("u1".into(), vault_with("work", "A"));
    snapshot.insert("u2".into(), vault_with("home", "B"));
    snapshot.insert("u3".into(), vault_with("play", "C"));

    let err = backend.write(&snapshot).await.unwrap_err();

    assert!(matches!(err, VaultError::PartialWrite { failed: 1, total: 3 }));
    assert_eq!(collection.replace_calls(), 3);
    assert!(collection.document("u1").is_some());
    assert!(collection.document("u2").is_none());
    assert!(collection.document("u3").is_some());
}

#[tokio::test]
async fn write_entry_touches_only_that_user() {
    let collection = Arc::new(MemoryCollection::new());
    let backend = RemoteBackend::new(collection.clone(), "ns");

    backend
        .write_entry("u1", &vault_with("work", "A"))
        .await
        .unwrap();

    assert_eq!(collection.replace_calls(), 1);
    assert_eq!(collection.documents().len(), 1);
}
