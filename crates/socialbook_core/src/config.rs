//! Application configuration: JSON file plus `SOCIALBOOK_*` overrides.
//!
//! # Invariants
//! - `namespace` is non-empty and contains no `:`.
//! - `schema_version >= 1` and `timeout_ms > 0`.
//! - A validated config always names a user when `backend = remote`.

use crate::logging::normalize_level;
use crate::storage::BackendKind;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_BACKEND: &str = "SOCIALBOOK_BACKEND";
pub const ENV_DATA_DIR: &str = "SOCIALBOOK_DATA_DIR";
pub const ENV_USER: &str = "SOCIALBOOK_USER";
pub const ENV_NAMESPACE: &str = "SOCIALBOOK_NAMESPACE";
pub const ENV_TIMEOUT_MS: &str = "SOCIALBOOK_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "SOCIALBOOK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "SOCIALBOOK_LOG_DIR";

const LOCAL_DB_FILE: &str = "local.sqlite3";
const REMOTE_DB_FILE: &str = "remote.sqlite3";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    /// An override or field holds an unusable value.
    InvalidValue { key: &'static str, value: String },
    /// Remote backend selected without a user.
    MissingUser,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "config io error: {err}"),
            Self::Parse(err) => write!(f, "config parse error: {err}"),
            Self::InvalidValue { key, value } => write!(f, "invalid value `{value}` for {key}"),
            Self::MissingUser => write!(f, "remote backend requires a user id"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendKind,
    /// Directory holding the SQLite files.
    pub data_dir: PathBuf,
    /// Signed-in user for the remote backend.
    pub user: Option<String>,
    pub namespace: String,
    pub schema_version: u32,
    /// Bound on every adapter call.
    pub timeout_ms: u64,
    pub log_level: String,
    /// Log files are written only when set.
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Local,
            data_dir: PathBuf::from("socialbook-data"),
            user: None,
            namespace: "social".to_string(),
            schema_version: 1,
            timeout_ms: 5_000,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    pub fn load_from<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Loads the file when it exists, defaults otherwise.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any lookup; empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get(ENV_BACKEND) {
            self.backend = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_BACKEND,
                value,
            })?;
        }
        if let Some(value) = get(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_USER) {
            self.user = Some(value.trim().to_string());
        }
        if let Some(value) = get(ENV_NAMESPACE) {
            self.namespace = value.trim().to_string();
        }
        if let Some(value) = get(ENV_TIMEOUT_MS) {
            self.timeout_ms = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_TIMEOUT_MS,
                value,
            })?;
        }
        if let Some(value) = get(ENV_LOG_LEVEL) {
            self.log_level = value;
        }
        if let Some(value) = get(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(value));
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let namespace = self.namespace.trim();
        if namespace.is_empty() || namespace.contains(':') {
            return Err(ConfigError::InvalidValue {
                key: "namespace",
                value: self.namespace.clone(),
            });
        }
        if self.schema_version == 0 {
            return Err(ConfigError::InvalidValue {
                key: "schema_version",
                value: self.schema_version.to_string(),
            });
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout_ms",
                value: self.timeout_ms.to_string(),
            });
        }
        if normalize_level(&self.log_level).is_err() {
            return Err(ConfigError::InvalidValue {
                key: "log_level",
                value: self.log_level.clone(),
            });
        }
        let has_user = self
            .user
            .as_deref()
            .is_some_and(|user| !user.trim().is_empty());
        if self.backend == BackendKind::Remote && !has_user {
            return Err(ConfigError::MissingUser);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn local_db_path(&self) -> PathBuf {
        self.data_dir.join(LOCAL_DB_FILE)
    }

    pub fn remote_db_path(&self) -> PathBuf {
        self.data_dir.join(REMOTE_DB_FILE)
    }
}
