//! Core of socialbook: groups of people, persisted through a pluggable
//! storage adapter and served from an in-memory store.
//! This crate is the single source of truth for dataset invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod search;
pub mod storage;
pub mod store;
pub mod transfer;

pub use config::{AppConfig, ConfigError, ConfigResult};
pub use logging::{init_logging, logging_status, LoggingError};
pub use model::clock::{Clock, ManualClock, SystemClock};
pub use model::dataset::Dataset;
pub use model::group::{Group, GroupId};
pub use model::person::{Person, PersonId, PersonPatch};
pub use model::prefs::{Preferences, SortMode, ThemeKey};
pub use model::validate::ValidationError;
pub use search::SearchHit;
pub use storage::backend::{BackendInitError, OpenedBackend, StorageBackend};
pub use storage::identity::{IdentityProvider, SessionIdentity, UserId};
pub use storage::prefs::PreferenceStore;
pub use storage::{BackendKind, StorageAdapter, StorageError, StorageResult};
pub use store::{SocialStore, StoreError, StoreOptions, StoreResult, StoreSnapshot, SyncStatus};
pub use transfer::{ImportError, ImportMode, ImportSummary};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
