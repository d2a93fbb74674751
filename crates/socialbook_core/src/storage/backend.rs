//! Startup-time backend selection.

use crate::config::{AppConfig, ConfigError};
use crate::db::DbError;
use crate::model::dataset::Dataset;
use crate::storage::document::SqliteDocumentStore;
use crate::storage::identity::{SessionIdentity, UserId};
use crate::storage::kv::SqliteKeyValueStore;
use crate::storage::local::LocalStorageAdapter;
use crate::storage::prefs::PreferenceStore;
use crate::storage::remote::RemoteStorageAdapter;
use crate::storage::{BackendKind, StorageAdapter, StorageResult};
use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// The configured persistence strategy.
pub enum StorageBackend {
    Local(LocalStorageAdapter<SqliteKeyValueStore>),
    Remote(RemoteStorageAdapter<SqliteDocumentStore>),
}

/// Dataset adapter plus the preference store that sits beside it.
pub struct OpenedBackend {
    pub adapter: StorageBackend,
    pub prefs: PreferenceStore,
}

#[derive(Debug)]
pub enum BackendInitError {
    Config(ConfigError),
    Db(DbError),
}

impl Display for BackendInitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BackendInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<ConfigError> for BackendInitError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for BackendInitError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl StorageBackend {
    /// Opens the backend named by `config`.
    ///
    /// Preferences always live in the device-local store.
    ///
    /// # Errors
    /// - `Config` when validation fails or the user id is unusable.
    /// - `Db` when a SQLite file cannot be opened or migrated.
    pub fn from_config(config: &AppConfig) -> Result<OpenedBackend, BackendInitError> {
        config.validate()?;
        let local_kv = SqliteKeyValueStore::open(config.local_db_path())?;
        let prefs = PreferenceStore::new(
            Arc::new(local_kv.clone()),
            &config.namespace,
            config.schema_version,
        );

        let adapter = match config.backend {
            BackendKind::Local => StorageBackend::Local(LocalStorageAdapter::new(
                local_kv,
                &config.namespace,
                config.schema_version,
            )),
            BackendKind::Remote => {
                let raw_user = config.user.clone().unwrap_or_default();
                let user = UserId::parse(&raw_user).map_err(|_| ConfigError::InvalidValue {
                    key: "user",
                    value: raw_user.clone(),
                })?;
                let documents = SqliteDocumentStore::open(config.remote_db_path())?;
                StorageBackend::Remote(RemoteStorageAdapter::new(
                    documents,
                    Arc::new(SessionIdentity::signed_in(user)),
                ))
            }
        };

        info!(
            "event=backend_select module=storage status=ok backend={} schema_version={}",
            config.backend, config.schema_version
        );
        Ok(OpenedBackend { adapter, prefs })
    }
}

#[async_trait]
impl StorageAdapter for StorageBackend {
    fn backend(&self) -> BackendKind {
        match self {
            Self::Local(adapter) => adapter.backend(),
            Self::Remote(adapter) => adapter.backend(),
        }
    }

    fn authorize(&self) -> StorageResult<()> {
        match self {
            Self::Local(adapter) => adapter.authorize(),
            Self::Remote(adapter) => adapter.authorize(),
        }
    }

    async fn load(&self) -> StorageResult<Dataset> {
        match self {
            Self::Local(adapter) => adapter.load().await,
            Self::Remote(adapter) => adapter.load().await,
        }
    }

    async fn save(&self, dataset: &Dataset) -> StorageResult<()> {
        match self {
            Self::Local(adapter) => adapter.save(dataset).await,
            Self::Remote(adapter) => adapter.save(dataset).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BackendInitError, StorageBackend};
    use crate::config::{AppConfig, ConfigError};
    use crate::storage::{BackendKind, StorageAdapter};

    #[test]
    fn remote_without_user_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = AppConfig {
            backend: BackendKind::Remote,
            data_dir: dir.path().to_path_buf(),
            ..AppConfig::default()
        };
        assert!(matches!(
            StorageBackend::from_config(&config),
            Err(BackendInitError::Config(ConfigError::MissingUser))
        ));
    }

    #[test]
    fn remote_user_with_slash_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = AppConfig {
            backend: BackendKind::Remote,
            data_dir: dir.path().to_path_buf(),
            user: Some("a/b".to_string()),
            ..AppConfig::default()
        };
        assert!(matches!(
            StorageBackend::from_config(&config),
            Err(BackendInitError::Config(ConfigError::InvalidValue { key: "user", .. }))
        ));
    }

    #[test]
    fn selects_configured_backend() {
        let dir = tempfile::tempdir().expect("temp dir");
        let local = AppConfig {
            data_dir: dir.path().to_path_buf(),
            ..AppConfig::default()
        };
        let opened = StorageBackend::from_config(&local).expect("local opens");
        assert_eq!(opened.adapter.backend(), BackendKind::Local);
        assert_eq!(opened.prefs.key(), "social:prefs:v1");

        let remote = AppConfig {
            backend: BackendKind::Remote,
            user: Some("uid-1".to_string()),
            ..local
        };
        let opened = StorageBackend::from_config(&remote).expect("remote opens");
        assert_eq!(opened.adapter.backend(), BackendKind::Remote);
        opened.adapter.authorize().expect("signed in");
    }
}
