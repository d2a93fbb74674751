//! Remote adapter: one document per group under the signed-in user.
//!
//! # Invariants
//! - Every path is `users/<uid>/groups/<groupId>`; the user is resolved
//!   before any document I/O.
//! - People are embedded in their group document, so deleting a group
//!   removes its people in the same write.
//! - A save is one atomic batch of sets and deletes.
//! - Documents that do not decode as a group are copied to
//!   `users/<uid>/corrupt` on load and are never deleted by a save.

use crate::model::dataset::Dataset;
use crate::model::group::Group;
use crate::storage::document::{DocumentStore, DocumentWrite, StoredDocument};
use crate::storage::identity::{IdentityProvider, UserId};
use crate::storage::{BackendKind, StorageAdapter, StorageError, StorageResult};
use async_trait::async_trait;
use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

/// Collection holding one user's group documents.
pub fn groups_collection(user: &UserId) -> String {
    format!("users/{}/groups", user.as_str())
}

/// Collection holding copies of group documents that failed to decode.
pub fn corrupt_collection(user: &UserId) -> String {
    format!("users/{}/corrupt", user.as_str())
}

/// Decodes a stored group document that is well-formed on its own.
fn decode_group(doc_id: &str, body: &str) -> Option<Group> {
    let group = serde_json::from_str::<Group>(body).ok()?;
    let blank = group.name.trim().is_empty()
        || group.people.iter().any(|person| person.name.trim().is_empty());
    if blank || group.id.to_string() != doc_id {
        return None;
    }
    Some(group)
}

/// Bulk adapter over any `DocumentStore`, scoped by user identity.
pub struct RemoteStorageAdapter<D: DocumentStore> {
    documents: D,
    identity: Arc<dyn IdentityProvider>,
}

impl<D: DocumentStore> RemoteStorageAdapter<D> {
    pub fn new(documents: D, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            documents,
            identity,
        }
    }

    fn require_user(&self) -> StorageResult<UserId> {
        self.identity
            .current_user()
            .ok_or(StorageError::Unauthenticated)
    }

    /// Copies skipped documents aside; failure only degrades the load.
    async fn quarantine(&self, user: &UserId, skipped: Vec<StoredDocument>) {
        let collection = corrupt_collection(user);
        let count = skipped.len();
        let writes = skipped
            .into_iter()
            .map(|doc| DocumentWrite::Set {
                collection: collection.clone(),
                id: doc.id,
                body: doc.body,
            })
            .collect();
        match self.documents.commit(writes).await {
            Ok(()) => warn!(
                "event=storage_quarantine module=storage status=ok backend=remote docs={}",
                count
            ),
            Err(err) => warn!(
                "event=storage_quarantine module=storage status=error backend=remote docs={} error_code={}",
                count,
                err.code()
            ),
        }
    }
}

#[async_trait]
impl<D: DocumentStore> StorageAdapter for RemoteStorageAdapter<D> {
    fn backend(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn authorize(&self) -> StorageResult<()> {
        self.require_user().map(|_| ())
    }

    async fn load(&self) -> StorageResult<Dataset> {
        let user = self.require_user()?;
        let started_at = Instant::now();
        let collection = groups_collection(&user);
        let stored = self.documents.list(&collection).await?;

        let mut groups: Vec<Group> = Vec::with_capacity(stored.len());
        let mut seen = HashSet::new();
        let mut skipped = Vec::new();
        for doc in stored {
            let Some(group) = decode_group(&doc.id, &doc.body) else {
                skipped.push(doc);
                continue;
            };
            let ids_clash = seen.contains(&group.id)
                || group.people.iter().any(|person| seen.contains(&person.id));
            if ids_clash {
                skipped.push(doc);
                continue;
            }
            seen.insert(group.id);
            seen.extend(group.people.iter().map(|person| person.id));
            groups.push(group);
        }
        groups.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| left.id.cmp(&right.id))
        });

        if !skipped.is_empty() {
            warn!(
                "event=storage_load module=storage status=degraded backend=remote skipped_docs={}",
                skipped.len()
            );
            self.quarantine(&user, skipped).await;
        }
        let dataset = Dataset { groups };
        info!(
            "event=storage_load module=storage status=ok backend=remote groups={} people={} duration_ms={}",
            dataset.groups.len(),
            dataset.person_count(),
            started_at.elapsed().as_millis()
        );
        Ok(dataset)
    }

    async fn save(&self, dataset: &Dataset) -> StorageResult<()> {
        let user = self.require_user()?;
        let collection = groups_collection(&user);
        let existing: HashMap<String, String> = self
            .documents
            .list(&collection)
            .await?
            .into_iter()
            .map(|doc| (doc.id, doc.body))
            .collect();

        let mut writes = Vec::new();
        let mut keep = HashSet::with_capacity(dataset.groups.len());
        for group in &dataset.groups {
            let id = group.id.to_string();
            let body = serde_json::to_string(group).map_err(StorageError::write)?;
            if existing.get(&id) != Some(&body) {
                writes.push(DocumentWrite::Set {
                    collection: collection.clone(),
                    id: id.clone(),
                    body,
                });
            }
            keep.insert(id);
        }
        let removable = existing
            .iter()
            .filter(|(id, body)| !keep.contains(*id) && decode_group(id, body).is_some())
            .map(|(id, _)| id);
        for id in removable {
            writes.push(DocumentWrite::Delete {
                collection: collection.clone(),
                id: id.clone(),
            });
        }

        if writes.is_empty() {
            return Ok(());
        }
        self.documents.commit(writes).await
    }
}

#[cfg(test)]
mod tests {
    use super::{corrupt_collection, groups_collection, RemoteStorageAdapter};
    use crate::model::dataset::Dataset;
    use crate::model::group::Group;
    use crate::model::person::Person;
    use crate::storage::document::{DocumentStore, MemoryDocumentStore};
    use crate::storage::identity::{SessionIdentity, UserId};
    use crate::storage::{StorageAdapter, StorageError};
    use std::sync::Arc;
    use uuid::Uuid;

    fn uid(value: &str) -> UserId {
        UserId::parse(value).expect("valid user id")
    }

    #[tokio::test]
    async fn unauthenticated_calls_fail_before_io() {
        let docs = MemoryDocumentStore::new();
        docs.faults().fail_reads(true);
        let adapter = RemoteStorageAdapter::new(docs, Arc::new(SessionIdentity::signed_out()));

        assert_eq!(adapter.authorize(), Err(StorageError::Unauthenticated));
        assert_eq!(adapter.load().await, Err(StorageError::Unauthenticated));
        assert_eq!(
            adapter.save(&Dataset::empty()).await,
            Err(StorageError::Unauthenticated)
        );
    }

    #[tokio::test]
    async fn deleting_a_group_drops_its_document_and_people() {
        let docs = MemoryDocumentStore::new();
        let identity = Arc::new(SessionIdentity::signed_in(uid("u1")));
        let adapter = RemoteStorageAdapter::new(docs.clone(), identity);

        let mut group = Group::with_id(Uuid::new_v4(), "Work", 1).expect("valid group");
        group
            .people
            .push(Person::with_id(Uuid::new_v4(), "Alice", None, 1).expect("valid person"));
        let dataset = Dataset {
            groups: vec![group],
        };
        adapter.save(&dataset).await.expect("save");
        assert_eq!(docs.len(), 1);

        adapter.save(&Dataset::empty()).await.expect("save empty");
        assert!(docs.is_empty());
        assert!(adapter.load().await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn load_skips_corrupt_documents_and_orders_newest_first() {
        let docs = MemoryDocumentStore::new();
        let user = uid("u1");
        let collection = groups_collection(&user);
        let older = Group::with_id(Uuid::new_v4(), "Older", 10).expect("valid group");
        let newer = Group::with_id(Uuid::new_v4(), "Newer", 20).expect("valid group");
        for group in [&older, &newer] {
            docs.insert_raw(
                &collection,
                &group.id.to_string(),
                &serde_json::to_string(group).expect("serialize"),
            );
        }
        docs.insert_raw(&collection, &Uuid::new_v4().to_string(), "{broken");

        let adapter = RemoteStorageAdapter::new(docs, Arc::new(SessionIdentity::signed_in(user)));
        let loaded = adapter.load().await.expect("load");
        let names: Vec<&str> = loaded.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Newer", "Older"]);
    }

    #[tokio::test]
    async fn save_keeps_undecodable_documents_and_load_copies_them_aside() {
        let docs = MemoryDocumentStore::new();
        let user = uid("u1");
        let collection = groups_collection(&user);
        let broken_id = Uuid::new_v4().to_string();
        docs.insert_raw(&collection, &broken_id, "{broken-but-user-data");

        let adapter = RemoteStorageAdapter::new(
            docs.clone(),
            Arc::new(SessionIdentity::signed_in(user.clone())),
        );
        let mut dataset = adapter.load().await.expect("load");
        assert!(dataset.is_empty());
        assert_eq!(
            docs.get(&corrupt_collection(&user), &broken_id)
                .await
                .expect("get")
                .as_deref(),
            Some("{broken-but-user-data")
        );

        dataset
            .groups
            .push(Group::with_id(Uuid::new_v4(), "Work", 5).expect("valid group"));
        adapter.save(&dataset).await.expect("save");
        adapter.save(&Dataset::empty()).await.expect("save empty");

        let remaining = docs.list(&collection).await.expect("list");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, broken_id);
        assert_eq!(remaining[0].body, "{broken-but-user-data");
    }

    #[tokio::test]
    async fn users_do_not_see_each_other() {
        let docs = MemoryDocumentStore::new();
        let alice = RemoteStorageAdapter::new(
            docs.clone(),
            Arc::new(SessionIdentity::signed_in(uid("alice"))),
        );
        let bob = RemoteStorageAdapter::new(
            docs.clone(),
            Arc::new(SessionIdentity::signed_in(uid("bob"))),
        );
        let dataset = Dataset {
            groups: vec![Group::with_id(Uuid::new_v4(), "Family", 1).expect("valid group")],
        };
        alice.save(&dataset).await.expect("save");

        assert!(bob.load().await.expect("load").is_empty());
        assert_eq!(
            docs.list("users/alice/groups").await.expect("list").len(),
            1
        );
    }
}
