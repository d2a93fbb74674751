//! Shared, thread-safe handle over one migrated SQLite connection.

use super::{DbError, DbResult};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// Cloneable connection handle. Blocking SQLite work runs off the async
/// executor via `spawn_blocking`.
#[derive(Clone)]
pub struct SharedConnection {
    inner: Arc<Mutex<Connection>>,
}

impl SharedConnection {
    pub fn new(conn: Connection) -> Self {
        Self {
            inner: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `op` with exclusive access to the connection on the blocking pool.
    pub async fn run<T, F>(&self, op: F) -> DbResult<T>
    where
        F: FnOnce(&mut Connection) -> DbResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut guard = inner.lock().map_err(|_| DbError::ConnectionPoisoned)?;
            op(&mut guard)
        })
        .await
        .map_err(|err| DbError::TaskFailed(err.to_string()))?
    }

    /// Runs `op` synchronously on the current thread.
    pub fn run_blocking<T>(&self, op: impl FnOnce(&mut Connection) -> DbResult<T>) -> DbResult<T> {
        let mut guard = self.inner.lock().map_err(|_| DbError::ConnectionPoisoned)?;
        op(&mut guard)
    }
}
