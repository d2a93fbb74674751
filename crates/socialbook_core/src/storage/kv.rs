//! Device-local key/value backends.
//!
//! # Invariants
//! - `set` replaces the whole value for a key in one statement; readers see
//!   either the old or the new value, never a partial one.

use crate::db::{ensure_table_ready, open_db, open_db_in_memory, DbResult, SharedConnection};
use crate::storage::fault::FaultSwitch;
use crate::storage::{StorageError, StorageResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// String-keyed, string-valued persistence API.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key).await
    }
}

/// In-process key/value store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
    faults: FaultSwitch,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &FaultSwitch {
        &self.faults
    }

    /// Reads an entry without going through the async contract.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    /// Writes an entry directly, bypassing fault switches.
    pub fn insert_raw(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        if self.faults.reads_fail() {
            return Err(StorageError::Unavailable("injected read failure".to_string()));
        }
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.faults.apply_write_delay().await;
        if self.faults.writes_fail() {
            return Err(StorageError::WriteFailed("injected write failure".to_string()));
        }
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.faults.apply_write_delay().await;
        if self.faults.writes_fail() {
            return Err(StorageError::WriteFailed("injected write failure".to_string()));
        }
        self.lock()?.remove(key);
        Ok(())
    }
}

/// SQLite-backed key/value store over the `kv_entries` table.
#[derive(Clone)]
pub struct SqliteKeyValueStore {
    conn: SharedConnection,
}

impl SqliteKeyValueStore {
    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Self::try_new(SharedConnection::new(open_db(path)?))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Self::try_new(SharedConnection::new(open_db_in_memory()?))
    }

    /// Wraps an existing connection after checking it is migrated.
    pub fn try_new(conn: SharedConnection) -> DbResult<Self> {
        conn.run_blocking(|conn| ensure_table_ready(conn, "kv_entries"))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let key = key.to_string();
        self.conn
            .run(move |conn| read_entry(conn, &key))
            .await
            .map_err(StorageError::read)
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.conn
            .run(move |conn| {
                conn.execute(
                    "INSERT INTO kv_entries (key, value)
                     VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = (strftime('%s', 'now') * 1000);",
                    params![key, value],
                )?;
                Ok(())
            })
            .await
            .map_err(StorageError::write)
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let key = key.to_string();
        self.conn
            .run(move |conn| {
                conn.execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
                Ok(())
            })
            .await
            .map_err(StorageError::write)
    }
}

fn read_entry(conn: &Connection, key: &str) -> DbResult<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM kv_entries WHERE key = ?1;",
            [key],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(value)
}
