use socialbook_core::storage::kv::{MemoryKeyValueStore, SqliteKeyValueStore};
use socialbook_core::storage::local::LocalStorageAdapter;
use socialbook_core::{
    AppConfig, PreferenceStore, SocialStore, SortMode, StorageBackend, StorageError, StoreError,
    StoreOptions, SyncStatus, ThemeKey,
};
use std::sync::Arc;
use std::time::Duration;

fn memory_store(kv: &MemoryKeyValueStore) -> SocialStore<LocalStorageAdapter<MemoryKeyValueStore>> {
    let adapter = LocalStorageAdapter::new(kv.clone(), "social", 1);
    let prefs = PreferenceStore::new(Arc::new(kv.clone()), "social", 1);
    SocialStore::new(adapter, prefs)
}

#[tokio::test]
async fn sqlite_file_round_trips_across_store_instances() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        data_dir: dir.path().to_path_buf(),
        ..AppConfig::default()
    };

    let opened = StorageBackend::from_config(&config).unwrap();
    let store = SocialStore::with_options(
        opened.adapter,
        opened.prefs,
        StoreOptions::from_config(&config),
    );
    store.hydrate().await.unwrap();
    let group = store.create_group("Work").await.unwrap();
    let person = store
        .create_person(group.id, "Alice", Some("desk 4"))
        .await
        .unwrap();
    store.set_theme(ThemeKey::Teal).await.unwrap();
    store.set_sort(SortMode::Az).await.unwrap();
    let before = store.snapshot();
    store.shutdown().await;
    drop(store);

    let reopened = StorageBackend::from_config(&config).unwrap();
    let store = SocialStore::new(reopened.adapter, reopened.prefs);
    store.hydrate().await.unwrap();
    let after = store.snapshot();

    assert_eq!(after.groups, before.groups);
    assert_eq!(after.theme, ThemeKey::Teal);
    assert_eq!(after.sort, SortMode::Az);
    let loaded = store.group(group.id).unwrap();
    assert_eq!(loaded.person(person.id).unwrap().notes.as_deref(), Some("desk 4"));
}

#[tokio::test]
async fn sqlite_store_survives_in_memory_connection() {
    let kv = SqliteKeyValueStore::open_in_memory().unwrap();
    let adapter = LocalStorageAdapter::new(kv.clone(), "social", 1);
    let prefs = PreferenceStore::new(Arc::new(kv), "social", 1);
    let store = SocialStore::new(adapter, prefs);
    store.hydrate().await.unwrap();
    store.create_group("Solo").await.unwrap();
    assert_eq!(store.snapshot().sync, SyncStatus::Synced);
}

#[tokio::test]
async fn corrupt_payload_hydrates_empty() {
    let kv = MemoryKeyValueStore::new();
    kv.insert_raw("social:v1", "{\"groups\": [ nope");
    kv.insert_raw("social:prefs:v1", "{\"theme\":\"amber\",\"sort\":42}");
    let store = memory_store(&kv);

    store.hydrate().await.unwrap();
    let snapshot = store.snapshot();
    assert!(!snapshot.loading);
    assert!(snapshot.groups.is_empty());
    assert_eq!(snapshot.theme, ThemeKey::Amber);
    assert_eq!(snapshot.sort, SortMode::Recent);
    assert!(kv.peek("social:v1:corrupt").is_some());
}

#[tokio::test]
async fn unreadable_backend_still_finishes_loading() {
    let kv = MemoryKeyValueStore::new();
    kv.faults().fail_reads(true);
    let store = memory_store(&kv);

    let err = store.hydrate().await.unwrap_err();
    assert!(matches!(err, StoreError::Storage(StorageError::Unavailable(_))));
    assert!(!store.snapshot().loading);
    assert!(store.snapshot().groups.is_empty());
}

#[tokio::test]
async fn mutations_before_hydrate_are_refused_and_keep_stored_data() {
    let kv = MemoryKeyValueStore::new();
    let first = memory_store(&kv);
    first.hydrate().await.unwrap();
    first.create_group("Old").await.unwrap();
    first.shutdown().await;

    let second = memory_store(&kv);
    assert!(second.snapshot().loading);
    assert_eq!(
        second.create_group("Early").await.unwrap_err(),
        StoreError::NotLoaded
    );
    assert_eq!(
        second.set_theme(ThemeKey::Amber).await.unwrap_err(),
        StoreError::NotLoaded
    );
    assert_eq!(second.snapshot().revision, 0);

    let payload = kv.peek("social:v1").unwrap();
    assert!(payload.contains("Old"));
    assert!(!payload.contains("Early"));
}

#[tokio::test]
async fn failed_hydrate_refuses_writes_until_a_reload_succeeds() {
    let kv = MemoryKeyValueStore::new();
    let first = memory_store(&kv);
    first.hydrate().await.unwrap();
    first.create_group("Old").await.unwrap();
    first.shutdown().await;

    let second = memory_store(&kv);
    kv.faults().fail_reads(true);
    second.hydrate().await.unwrap_err();
    kv.faults().fail_reads(false);

    assert_eq!(
        second.create_group("New").await.unwrap_err(),
        StoreError::NotLoaded
    );
    assert_eq!(second.flush().await.unwrap_err(), StoreError::NotLoaded);
    assert!(second.snapshot().groups.is_empty());
    assert!(!kv.peek("social:v1").unwrap().contains("New"));

    second.hydrate().await.unwrap();
    second.create_group("New").await.unwrap();
    let names: Vec<String> = second
        .snapshot()
        .groups
        .into_iter()
        .map(|group| group.name)
        .collect();
    assert_eq!(names, vec!["New", "Old"]);
}

#[tokio::test]
async fn failed_write_keeps_memory_and_flush_retries() {
    let kv = MemoryKeyValueStore::new();
    let store = memory_store(&kv);
    store.hydrate().await.unwrap();

    kv.faults().fail_writes(true);
    let err = store.create_group("Offline").await.unwrap_err();
    assert!(matches!(err, StoreError::Storage(StorageError::WriteFailed(_))));
    let snapshot = store.snapshot();
    assert_eq!(snapshot.groups.len(), 1);
    assert!(matches!(snapshot.sync, SyncStatus::Failed(_)));
    assert!(kv.peek("social:v1").is_none());

    kv.faults().fail_writes(false);
    store.flush().await.unwrap();
    assert_eq!(store.snapshot().sync, SyncStatus::Synced);
    assert!(kv.peek("social:v1").unwrap().contains("Offline"));

    store.flush().await.unwrap();
}

#[tokio::test]
async fn slow_backend_surfaces_timeout() {
    let kv = MemoryKeyValueStore::new();
    let adapter = LocalStorageAdapter::new(kv.clone(), "social", 1);
    let prefs = PreferenceStore::new(Arc::new(kv.clone()), "social", 1);
    let options = StoreOptions::default().with_timeout(Duration::from_millis(25));
    let store = SocialStore::with_options(adapter, prefs, options);
    store.hydrate().await.unwrap();

    kv.faults().delay_writes(Duration::from_millis(250));
    let err = store.create_group("Slow").await.unwrap_err();
    assert_eq!(
        err,
        StoreError::Storage(StorageError::Timeout {
            operation: "save",
            after_ms: 25
        })
    );
    assert_eq!(store.snapshot().groups.len(), 1);
}

#[tokio::test]
async fn writes_after_shutdown_are_refused() {
    let kv = MemoryKeyValueStore::new();
    let store = memory_store(&kv);
    store.hydrate().await.unwrap();
    store.create_group("Before").await.unwrap();
    store.shutdown().await;

    assert!(matches!(
        store.create_group("After").await,
        Err(StoreError::Storage(StorageError::Unavailable(_)))
    ));
    assert_eq!(store.snapshot().groups.len(), 1);
}

#[tokio::test]
async fn concurrent_mutations_all_persist() {
    let kv = MemoryKeyValueStore::new();
    let store = Arc::new(memory_store(&kv));
    store.hydrate().await.unwrap();

    let mut tasks = Vec::new();
    for index in 0..8 {
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            store.create_group(&format!("Group {index}")).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let raw = kv.peek("social:v1").unwrap();
    for index in 0..8 {
        assert!(raw.contains(&format!("Group {index}")));
    }
    assert_eq!(store.snapshot().sync, SyncStatus::Synced);
}
