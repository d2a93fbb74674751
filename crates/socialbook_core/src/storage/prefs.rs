//! Preference persistence on its own key, apart from the dataset.
//!
//! Unknown or corrupt values fall back to defaults field by field.

use crate::model::prefs::{Preferences, SortMode, ThemeKey};
use crate::storage::kv::KeyValueStore;
use crate::storage::{StorageError, StorageResult};
use log::warn;
use serde_json::{json, Value};
use std::sync::Arc;

/// Builds the preference key for a namespace and schema version.
pub fn prefs_key(namespace: &str, version: u32) -> String {
    format!("{namespace}:prefs:v{version}")
}

#[derive(Clone)]
pub struct PreferenceStore {
    kv: Arc<dyn KeyValueStore>,
    key: String,
}

impl PreferenceStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, namespace: &str, version: u32) -> Self {
        Self {
            kv,
            key: prefs_key(namespace, version),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads preferences; missing or unreadable fields use defaults.
    pub async fn load(&self) -> StorageResult<Preferences> {
        let Some(raw) = self.kv.get(&self.key).await? else {
            return Ok(Preferences::default());
        };
        Ok(parse_preferences(&raw))
    }

    pub async fn save(&self, prefs: Preferences) -> StorageResult<()> {
        let payload = json!({
            "theme": prefs.theme.as_str(),
            "sort": prefs.sort.as_str(),
        });
        let raw = serde_json::to_string(&payload).map_err(StorageError::write)?;
        self.kv.set(&self.key, &raw).await
    }
}

pub(crate) fn parse_preferences(raw: &str) -> Preferences {
    let Ok(value) = serde_json::from_str::<Value>(raw) else {
        warn!("event=prefs_load module=storage status=degraded reason=unparseable");
        return Preferences::default();
    };
    let field = |name: &str| value.get(name).and_then(Value::as_str);

    let theme = field("theme")
        .and_then(|key| key.parse::<ThemeKey>().ok())
        .unwrap_or_default();
    let sort = field("sort")
        .and_then(|key| key.parse::<SortMode>().ok())
        .unwrap_or_default();
    Preferences { theme, sort }
}
