use socialbook_core::storage::kv::MemoryKeyValueStore;
use socialbook_core::storage::local::LocalStorageAdapter;
use socialbook_core::{
    ImportError, ImportMode, ManualClock, PreferenceStore, SocialStore, StoreError, StoreOptions,
};
use std::sync::Arc;

fn memory_store() -> SocialStore<LocalStorageAdapter<MemoryKeyValueStore>> {
    let kv = MemoryKeyValueStore::new();
    let adapter = LocalStorageAdapter::new(kv.clone(), "social", 1);
    let prefs = PreferenceStore::new(Arc::new(kv), "social", 1);
    SocialStore::new(adapter, prefs)
}

#[tokio::test]
async fn export_then_import_reproduces_the_dataset() {
    let source = memory_store();
    source.hydrate().await.unwrap();
    let work = source.create_group("Work").await.unwrap();
    source
        .create_person(work.id, "Alice", Some("met at conference"))
        .await
        .unwrap();
    source.create_person(work.id, "Bob", None).await.unwrap();
    source.create_group("Family").await.unwrap();
    let exported = serde_json::to_string_pretty(&source.export_all()).unwrap();

    let target = memory_store();
    target.hydrate().await.unwrap();
    let summary = target
        .import_json(&exported, ImportMode::Replace)
        .await
        .unwrap();
    assert_eq!(summary.groups, 2);
    assert_eq!(summary.people, 2);
    assert_eq!(target.snapshot().groups, source.snapshot().groups);
}

#[tokio::test]
async fn malformed_import_leaves_dataset_untouched() {
    let store = memory_store();
    store.hydrate().await.unwrap();
    store.create_group("Keep me").await.unwrap();
    let before = store.snapshot();

    let err = store
        .import_json("{\"groups\": [", ImportMode::Replace)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Import(ImportError::Parse(_))));

    let err = store
        .import_json(
            r#"{"groups":[{"id":"not-a-uuid","name":"x"}],"people":[]}"#,
            ImportMode::Merge,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Import(ImportError::Parse(_))));

    assert_eq!(store.snapshot(), before);
}

#[tokio::test]
async fn merge_import_upserts_by_id() {
    let store = memory_store();
    store.hydrate().await.unwrap();
    let work = store.create_group("Work").await.unwrap();
    let kept = store.create_group("Kept").await.unwrap();

    let raw = format!(
        r#"{{"groups":[{{"id":"{}","name":"Work Renamed","updatedAt":1}}],"names":[]}}"#,
        work.id
    );
    store.import_json(&raw, ImportMode::Merge).await.unwrap();

    assert_eq!(store.group(work.id).unwrap().name, "Work Renamed");
    assert!(store.group(kept.id).is_some());
    assert_eq!(store.snapshot().groups.len(), 2);
}

#[tokio::test]
async fn merge_import_touches_the_group_a_person_leaves() {
    let kv = MemoryKeyValueStore::new();
    let clock = Arc::new(ManualClock::new(100));
    let store = SocialStore::with_options(
        LocalStorageAdapter::new(kv.clone(), "social", 1),
        PreferenceStore::new(Arc::new(kv), "social", 1),
        StoreOptions::default().with_clock(clock.clone()),
    );
    store.hydrate().await.unwrap();
    let home = store.create_group("Home").await.unwrap();
    let alice = store.create_person(home.id, "Alice", None).await.unwrap();
    let work = store.create_group("Work").await.unwrap();

    clock.set(10_000);
    let raw = format!(
        r#"{{"groups":[{{"id":"{}","name":"Work"}}],"people":[{{"id":"{}","name":"Alice","groupId":"{}"}}]}}"#,
        work.id, alice.id, work.id
    );
    store.import_json(&raw, ImportMode::Merge).await.unwrap();

    let home = store.group(home.id).unwrap();
    assert!(home.people.is_empty());
    assert_eq!(home.updated_at, 10_000);
    let work = store.group(work.id).unwrap();
    assert_eq!(work.people[0].id, alice.id);
}

#[tokio::test]
async fn per_entity_exports() {
    let store = memory_store();
    store.hydrate().await.unwrap();
    let group = store.create_group("Team").await.unwrap();
    let person = store.create_person(group.id, "Dana", None).await.unwrap();

    let group_export = store.export_group(group.id).unwrap();
    assert_eq!(group_export.group.name, "Team");
    assert_eq!(group_export.people.len(), 1);

    let person_export = store.export_person(group.id, person.id).unwrap();
    assert_eq!(person_export.person.group_id, group.id);
    assert!(store.export_person(person.id, person.id).is_none());
}
