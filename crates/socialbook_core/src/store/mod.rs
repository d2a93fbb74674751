//! In-memory state container over a storage adapter.
//!
//! # Responsibility
//! - Own the dataset and preferences, validate and apply mutations.
//! - Persist every dataset change through one ordered writer.
//! - Publish snapshots to subscribers after each change.
//!
//! # Invariants
//! - Validation and authorization run before memory is touched.
//! - A failed save keeps the in-memory change; `SyncStatus::Failed` records it
//!   until a later save or `flush` succeeds.
//! - No dataset write is issued until a `hydrate` has succeeded, so an unread
//!   persisted dataset is never replaced by an empty one.

use crate::model::group::Group;
use crate::model::prefs::{SortMode, ThemeKey};
use crate::model::validate::ValidationError;
use crate::storage::StorageError;
use crate::transfer::ImportError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

mod social_store;
mod writer;

pub use social_store::{SocialStore, StoreOptions};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Validation(ValidationError),
    /// A required target does not exist.
    NotFound { kind: &'static str, id: Uuid },
    Storage(StorageError),
    Import(ImportError),
    /// Persisted data has not been read yet, or the last read failed.
    NotLoaded,
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Storage(err) => err.code(),
            Self::Import(_) => "import_rejected",
            Self::NotLoaded => "not_loaded",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::Import(err) => write!(f, "{err}"),
            Self::NotLoaded => write!(f, "dataset not loaded; hydrate must succeed first"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound { .. } | Self::NotLoaded => None,
            Self::Storage(err) => Some(err),
            Self::Import(err) => Some(err),
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StorageError> for StoreError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<ImportError> for StoreError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

/// Persistence state of the in-memory dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SyncStatus {
    /// Every in-memory change has been written.
    #[default]
    Synced,
    /// A write is queued or in flight.
    Pending,
    /// The latest write failed; memory is ahead of storage.
    Failed(StorageError),
}

/// Immutable view published after every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSnapshot {
    /// Groups in stored order.
    pub groups: Vec<Group>,
    pub theme: ThemeKey,
    pub sort: SortMode,
    /// True until the first `hydrate` finishes.
    pub loading: bool,
    /// In-memory mutation counter.
    pub revision: u64,
    pub sync: SyncStatus,
}
