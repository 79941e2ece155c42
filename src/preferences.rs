use async_trait::async_trait;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::language::{is_supported, language_name, DEFAULT_LANGUAGE_CODE};
use crate::AnalysisError;

/// Key under which the preferred language code is stored
pub const LANGUAGE_KEY: &str = "preferredLanguage";

/// Persistent string key/value storage
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AnalysisError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), AnalysisError>;
}

/// Preferences kept as a flat JSON object in a single file
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    async fn read_map(&self) -> Result<Map<String, Value>, AnalysisError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(storage_error(&self.path, e)),
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            _ => {
                warn!(
                    "Ignoring unreadable preferences file {}",
                    self.path.display()
                );
                Ok(Map::new())
            }
        }
    }
}

fn storage_error(path: &std::path::Path, e: std::io::Error) -> AnalysisError {
    AnalysisError::Storage(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl PreferenceStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AnalysisError> {
        let map = self.read_map().await?;
        Ok(map.get(key).and_then(Value::as_str).map(str::to_string))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AnalysisError> {
        let mut map = self.read_map().await?;
        map.insert(key.to_string(), Value::String(value.to_string()));

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error(parent, e))?;
        }

        let content = serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|e| AnalysisError::Storage(e.to_string()))?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| storage_error(&self.path, e))?;

        debug!("Saved preference {} to {}", key, self.path.display());
        Ok(())
    }
}

/// In-process store, used by tests and embedders without a filesystem
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AnalysisError> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AnalysisError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The user's answer language, persisted across sessions
pub struct LanguagePreference<S: PreferenceStore> {
    store: S,
}

impl<S: PreferenceStore> LanguagePreference<S> {
    pub fn new(store: S) -> Self {
        LanguagePreference { store }
    }

    /// Stored language code, or `"en"` when nothing usable is stored
    pub async fn load(&self) -> String {
        match self.store.get(LANGUAGE_KEY).await {
            Ok(Some(code)) if is_supported(&code) => code,
            Ok(Some(code)) => {
                warn!("Stored language {:?} is not supported", code);
                DEFAULT_LANGUAGE_CODE.to_string()
            }
            Ok(None) => DEFAULT_LANGUAGE_CODE.to_string(),
            Err(e) => {
                warn!("Could not read language preference: {}", e);
                DEFAULT_LANGUAGE_CODE.to_string()
            }
        }
    }

    /// Display name of the stored language, used in prompts
    pub async fn load_name(&self) -> &'static str {
        language_name(&self.load().await)
    }

    pub async fn save(&self, code: &str) -> Result<(), AnalysisError> {
        if !is_supported(code) {
            return Err(AnalysisError::Validation(format!(
                "Unsupported language code: {code}"
            )));
        }
        self.store.set(LANGUAGE_KEY, code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_defaults_to_english() {
        let preference = LanguagePreference::new(MemoryStore::default());
        assert_eq!(preference.load().await, "en");
        assert_eq!(preference.load_name().await, "English");
    }

    #[tokio::test]
    async fn test_unsupported_stored_code_falls_back() {
        let store = MemoryStore::default();
        store.set(LANGUAGE_KEY, "xx").await.unwrap();
        let preference = LanguagePreference::new(store);
        assert_eq!(preference.load().await, "en");
    }

    #[tokio::test]
    async fn test_save_rejects_unknown_code() {
        let preference = LanguagePreference::new(MemoryStore::default());
        assert!(matches!(
            preference.save("klingon").await,
            Err(AnalysisError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_file_store_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.json");

        LanguagePreference::new(FileStore::new(&path))
            .save("ja")
            .await
            .unwrap();

        let reloaded = LanguagePreference::new(FileStore::new(&path));
        assert_eq!(reloaded.load().await, "ja");
        assert_eq!(reloaded.load_name().await, "Japanese");

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"preferredLanguage\": \"ja\""));
    }

    #[tokio::test]
    async fn test_file_store_keeps_other_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let store = FileStore::new(&path);
        store.set(LANGUAGE_KEY, "fr").await.unwrap();

        assert_eq!(store.get("theme").await.unwrap().as_deref(), Some("dark"));
        assert_eq!(store.get(LANGUAGE_KEY).await.unwrap().as_deref(), Some("fr"));
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, "not json").unwrap();

        let preference = LanguagePreference::new(FileStore::new(&path));
        assert_eq!(preference.load().await, "en");
    }
}
