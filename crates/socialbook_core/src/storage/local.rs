//! Device-local adapter: the whole dataset as one JSON value under one key.
//!
//! # Invariants
//! - Key layout is `<namespace>:v<version>`.
//! - A corrupt payload is copied to `<key>:corrupt` and read as empty.

use crate::model::dataset::Dataset;
use crate::storage::kv::KeyValueStore;
use crate::storage::{BackendKind, StorageAdapter, StorageError, StorageResult};
use async_trait::async_trait;
use log::{error, info, warn};
use std::time::Instant;

/// Builds the dataset key for a namespace and schema version.
pub fn dataset_key(namespace: &str, version: u32) -> String {
    format!("{namespace}:v{version}")
}

/// Bulk adapter over any `KeyValueStore`.
pub struct LocalStorageAdapter<K: KeyValueStore> {
    kv: K,
    key: String,
}

impl<K: KeyValueStore> LocalStorageAdapter<K> {
    pub fn new(kv: K, namespace: &str, version: u32) -> Self {
        Self {
            kv,
            key: dataset_key(namespace, version),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    async fn quarantine(&self, raw: &str, reason: &StorageError) {
        let backup_key = format!("{}:corrupt", self.key);
        warn!(
            "event=storage_load module=storage status=degraded backend=local error_code={} backup_key={}",
            reason.code(),
            backup_key
        );
        if let Err(err) = self.kv.set(&backup_key, raw).await {
            error!(
                "event=storage_quarantine module=storage status=error backend=local error_code={} error={}",
                err.code(),
                err
            );
        }
    }
}

/// Decodes and checks a persisted payload.
pub(crate) fn decode_dataset(raw: &str) -> StorageResult<Dataset> {
    let dataset: Dataset = serde_json::from_str(raw)
        .map_err(|err| StorageError::CorruptPersistedData(err.to_string()))?;
    dataset
        .validate()
        .map_err(|err| StorageError::CorruptPersistedData(err.to_string()))?;
    Ok(dataset)
}

#[async_trait]
impl<K: KeyValueStore> StorageAdapter for LocalStorageAdapter<K> {
    fn backend(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn load(&self) -> StorageResult<Dataset> {
        let started_at = Instant::now();
        let Some(raw) = self.kv.get(&self.key).await? else {
            info!(
                "event=storage_load module=storage status=ok backend=local first_run=true duration_ms={}",
                started_at.elapsed().as_millis()
            );
            return Ok(Dataset::empty());
        };

        match decode_dataset(&raw) {
            Ok(dataset) => {
                info!(
                    "event=storage_load module=storage status=ok backend=local groups={} people={} duration_ms={}",
                    dataset.groups.len(),
                    dataset.person_count(),
                    started_at.elapsed().as_millis()
                );
                Ok(dataset)
            }
            Err(reason) => {
                self.quarantine(&raw, &reason).await;
                Ok(Dataset::empty())
            }
        }
    }

    async fn save(&self, dataset: &Dataset) -> StorageResult<()> {
        let payload = serde_json::to_string(dataset).map_err(StorageError::write)?;
        self.kv.set(&self.key, &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::{dataset_key, LocalStorageAdapter};
    use crate::model::dataset::Dataset;
    use crate::model::group::Group;
    use crate::storage::kv::MemoryKeyValueStore;
    use crate::storage::StorageAdapter;
    use uuid::Uuid;

    #[test]
    fn key_layout_is_namespace_and_version() {
        assert_eq!(dataset_key("social", 1), "social:v1");
    }

    #[tokio::test]
    async fn first_load_is_empty() {
        let adapter = LocalStorageAdapter::new(MemoryKeyValueStore::new(), "social", 1);
        assert!(adapter.load().await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn corrupt_payload_degrades_and_is_kept_aside() {
        let kv = MemoryKeyValueStore::new();
        kv.insert_raw("social:v1", "{not json");
        let adapter = LocalStorageAdapter::new(kv.clone(), "social", 1);

        let loaded = adapter.load().await.expect("corrupt data must not fail load");
        assert!(loaded.is_empty());
        assert_eq!(kv.peek("social:v1:corrupt").as_deref(), Some("{not json"));
    }

    #[tokio::test]
    async fn payload_breaking_invariants_is_treated_as_corrupt() {
        let kv = MemoryKeyValueStore::new();
        let id = Uuid::new_v4();
        let raw = format!(
            r#"{{"groups":[{{"id":"{id}","name":"A","people":[]}},{{"id":"{id}","name":"B","people":[]}}]}}"#
        );
        kv.insert_raw("social:v1", &raw);
        let adapter = LocalStorageAdapter::new(kv, "social", 1);
        assert!(adapter.load().await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let adapter = LocalStorageAdapter::new(MemoryKeyValueStore::new(), "social", 1);
        let dataset = Dataset {
            groups: vec![Group::with_id(Uuid::new_v4(), "Work", 42).expect("valid group")],
        };
        adapter.save(&dataset).await.expect("save");
        assert_eq!(adapter.load().await.expect("load"), dataset);
    }
}
