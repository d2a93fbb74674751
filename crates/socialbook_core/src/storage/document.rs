//! Document-database backends addressed by `(collection, id)`.
//!
//! # Invariants
//! - `commit` applies a batch of set/delete writes all-or-nothing.
//! - Bodies are stored as raw JSON text; decoding is the adapter's job.

use crate::db::{ensure_table_ready, open_db, open_db_in_memory, DbResult, SharedConnection};
use crate::storage::fault::FaultSwitch;
use crate::storage::{StorageError, StorageResult};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// One document as returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub id: String,
    pub body: String,
}

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentWrite {
    Set {
        collection: String,
        id: String,
        body: String,
    },
    Delete {
        collection: String,
        id: String,
    },
}

/// Collection/document persistence API.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> StorageResult<Option<String>>;
    /// Lists documents of a collection ordered by id.
    async fn list(&self, collection: &str) -> StorageResult<Vec<StoredDocument>>;
    async fn commit(&self, writes: Vec<DocumentWrite>) -> StorageResult<()>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn get(&self, collection: &str, id: &str) -> StorageResult<Option<String>> {
        (**self).get(collection, id).await
    }

    async fn list(&self, collection: &str) -> StorageResult<Vec<StoredDocument>> {
        (**self).list(collection).await
    }

    async fn commit(&self, writes: Vec<DocumentWrite>) -> StorageResult<()> {
        (**self).commit(writes).await
    }
}

type DocumentKey = (String, String);

/// In-process document store. Clones share the same documents, which lets
/// several clients race against one "remote" database.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    docs: Arc<Mutex<BTreeMap<DocumentKey, String>>>,
    faults: FaultSwitch,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &FaultSwitch {
        &self.faults
    }

    /// Writes a raw body directly, bypassing fault switches.
    pub fn insert_raw(&self, collection: &str, id: &str, body: &str) {
        if let Ok(mut docs) = self.docs.lock() {
            docs.insert((collection.to_string(), id.to_string()), body.to_string());
        }
    }

    /// Number of documents across all collections.
    pub fn len(&self) -> usize {
        self.docs.lock().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, BTreeMap<DocumentKey, String>>> {
        self.docs
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> StorageResult<Option<String>> {
        if self.faults.reads_fail() {
            return Err(StorageError::Unavailable("injected read failure".to_string()));
        }
        let key = (collection.to_string(), id.to_string());
        Ok(self.lock()?.get(&key).cloned())
    }

    async fn list(&self, collection: &str) -> StorageResult<Vec<StoredDocument>> {
        if self.faults.reads_fail() {
            return Err(StorageError::Unavailable("injected read failure".to_string()));
        }
        let docs = self.lock()?;
        Ok(docs
            .iter()
            .filter(|((doc_collection, _), _)| doc_collection == collection)
            .map(|((_, id), body)| StoredDocument {
                id: id.clone(),
                body: body.clone(),
            })
            .collect())
    }

    async fn commit(&self, writes: Vec<DocumentWrite>) -> StorageResult<()> {
        self.faults.apply_write_delay().await;
        if self.faults.writes_fail() {
            return Err(StorageError::WriteFailed("injected write failure".to_string()));
        }
        let mut docs = self.lock()?;
        for write in writes {
            match write {
                DocumentWrite::Set {
                    collection,
                    id,
                    body,
                } => {
                    docs.insert((collection, id), body);
                }
                DocumentWrite::Delete { collection, id } => {
                    docs.remove(&(collection, id));
                }
            }
        }
        Ok(())
    }
}

/// SQLite-backed document store over the `documents` table.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    conn: SharedConnection,
}

impl SqliteDocumentStore {
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Self::try_new(SharedConnection::new(open_db(path)?))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Self::try_new(SharedConnection::new(open_db_in_memory()?))
    }

    /// Wraps an existing connection after checking it is migrated.
    pub fn try_new(conn: SharedConnection) -> DbResult<Self> {
        conn.run_blocking(|conn| ensure_table_ready(conn, "documents"))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> StorageResult<Option<String>> {
        let collection = collection.to_string();
        let id = id.to_string();
        self.conn
            .run(move |conn| {
                let body = conn
                    .query_row(
                        "SELECT body FROM documents WHERE collection = ?1 AND doc_id = ?2;",
                        params![collection, id],
                        |row| row.get::<_, String>(0),
                    )
                    .optional()?;
                Ok(body)
            })
            .await
            .map_err(StorageError::read)
    }

    async fn list(&self, collection: &str) -> StorageResult<Vec<StoredDocument>> {
        let collection = collection.to_string();
        self.conn
            .run(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT doc_id, body
                     FROM documents
                     WHERE collection = ?1
                     ORDER BY doc_id ASC;",
                )?;
                let mut rows = stmt.query([collection])?;
                let mut docs = Vec::new();
                while let Some(row) = rows.next()? {
                    docs.push(StoredDocument {
                        id: row.get("doc_id")?,
                        body: row.get("body")?,
                    });
                }
                Ok(docs)
            })
            .await
            .map_err(StorageError::read)
    }

    async fn commit(&self, writes: Vec<DocumentWrite>) -> StorageResult<()> {
        if writes.is_empty() {
            return Ok(());
        }
        self.conn
            .run(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                for write in &writes {
                    match write {
                        DocumentWrite::Set {
                            collection,
                            id,
                            body,
                        } => {
                            tx.execute(
                                "INSERT INTO documents (collection, doc_id, body)
                                 VALUES (?1, ?2, ?3)
                                 ON CONFLICT(collection, doc_id) DO UPDATE SET
                                    body = excluded.body,
                                    updated_at = (strftime('%s', 'now') * 1000);",
                                params![collection, id, body],
                            )?;
                        }
                        DocumentWrite::Delete { collection, id } => {
                            tx.execute(
                                "DELETE FROM documents WHERE collection = ?1 AND doc_id = ?2;",
                                params![collection, id],
                            )?;
                        }
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(StorageError::write)
    }
}

#[cfg(test)]
mod tests {
    use super::{DocumentStore, DocumentWrite, MemoryDocumentStore, SqliteDocumentStore};

    fn set(collection: &str, id: &str, body: &str) -> DocumentWrite {
        DocumentWrite::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn sqlite_batch_applies_sets_and_deletes() {
        let store = SqliteDocumentStore::open_in_memory().expect("store should open");
        store
            .commit(vec![
                set("users/u1/groups", "a", "{}"),
                set("users/u1/groups", "b", "{}"),
                set("users/u2/groups", "a", "{}"),
            ])
            .await
            .expect("first batch");

        store
            .commit(vec![
                DocumentWrite::Delete {
                    collection: "users/u1/groups".to_string(),
                    id: "a".to_string(),
                },
                set("users/u1/groups", "b", "{\"v\":2}"),
            ])
            .await
            .expect("second batch");

        let listed = store.list("users/u1/groups").await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "b");
        assert_eq!(listed[0].body, "{\"v\":2}");
        assert!(store
            .get("users/u2/groups", "a")
            .await
            .expect("get")
            .is_some());
    }

    #[tokio::test]
    async fn memory_batch_is_rejected_whole_on_write_failure() {
        let store = MemoryDocumentStore::new();
        store
            .commit(vec![set("c", "a", "1")])
            .await
            .expect("seed write");

        store.faults().fail_writes(true);
        store
            .commit(vec![
                set("c", "b", "2"),
                DocumentWrite::Delete {
                    collection: "c".to_string(),
                    id: "a".to_string(),
                },
            ])
            .await
            .expect_err("batch should fail");

        let listed = store.list("c").await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "a");
    }
}
