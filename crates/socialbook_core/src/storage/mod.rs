//! Storage adapters and the raw backends they persist through.
//!
//! # Responsibility
//! - Define the uniform `StorageAdapter` contract the store depends on.
//! - Provide device-local (key/value) and remote (document store) adapters.
//! - Keep preference persistence on its own key, apart from the dataset.
//!
//! # Invariants
//! - `load` never fails for a missing or corrupt payload; it yields an empty
//!   dataset instead.
//! - A `save` either lands completely or leaves the previous payload intact.
//! - Remote adapters resolve the user before any I/O.

use crate::db::DbError;
use crate::model::dataset::Dataset;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub mod backend;
pub mod document;
pub mod fault;
pub mod identity;
pub mod kv;
pub mod local;
pub mod prefs;
pub mod remote;

pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence failure surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No resolved user identity for a user-scoped backend.
    Unauthenticated,
    /// Backend could not be read or reached.
    Unavailable(String),
    /// Backend rejected or failed a write.
    WriteFailed(String),
    /// Call did not complete within the configured bound.
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },
    /// Stored payload could not be decoded.
    CorruptPersistedData(String),
}

impl StorageError {
    /// Stable short code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Unavailable(_) => "storage_unavailable",
            Self::WriteFailed(_) => "storage_write_failed",
            Self::Timeout { .. } => "storage_timeout",
            Self::CorruptPersistedData(_) => "corrupt_persisted_data",
        }
    }

    pub(crate) fn read(err: impl Display) -> Self {
        Self::Unavailable(err.to_string())
    }

    pub(crate) fn write(err: impl Display) -> Self {
        Self::WriteFailed(err.to_string())
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "no signed-in user for user-scoped storage"),
            Self::Unavailable(message) => write!(f, "storage unavailable: {message}"),
            Self::WriteFailed(message) => write!(f, "storage write failed: {message}"),
            Self::Timeout {
                operation,
                after_ms,
            } => write!(f, "storage {operation} timed out after {after_ms}ms"),
            Self::CorruptPersistedData(message) => {
                write!(f, "corrupt persisted data: {message}")
            }
        }
    }
}

impl Error for StorageError {}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Unavailable(value.to_string())
    }
}

/// Which persistence strategy an adapter implements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Remote,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => Err(format!("unknown backend `{other}`")),
        }
    }
}

/// Bulk persistence contract for the group/person dataset.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Names the strategy for diagnostics.
    fn backend(&self) -> BackendKind;

    /// Pre-flight check run before the store mutates memory.
    ///
    /// Must not perform I/O.
    fn authorize(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Loads the persisted dataset; empty on first use or corrupt payload.
    async fn load(&self) -> StorageResult<Dataset>;

    /// Persists the full dataset atomically.
    async fn save(&self, dataset: &Dataset) -> StorageResult<()>;
}
