//! Local tier: device-resident key/value persistence
//!
//! Every key maps to one JSON document. The file-backed implementation keeps
//! one file per key under the storage base directory:
//!
//! ```text
//! ~/.local/share/encore/
//! ├── chat_memory.json
//! ├── chat_messages.json
//! ├── knowledge_base.json
//! ├── artists.json
//! ├── artist_profile-<artist-id>.json
//! └── settings.json
//! ```
//!
//! Writes are synchronous: callers treat the local tier as authoritative for
//! immediate reads after a write.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Synchronous key/value tier holding serialized JSON documents.
pub trait LocalTier: Send + Sync {
    /// Read the raw document stored under `key`.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replace the document stored under `key`.
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Deserialize the document under `key`, if any.
pub fn load_json<T: DeserializeOwned>(tier: &dyn LocalTier, key: &str) -> Result<Option<T>> {
    match tier.read(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize `value` and store it under `key`.
pub fn save_json<T: Serialize + ?Sized>(tier: &dyn LocalTier, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    tier.write(key, &raw)
}

/// File-backed local tier, one `<key>.json` file per key.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Default directory (`<data dir>/encore`)
    pub fn default_dir() -> PathBuf {
        dirs_next::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("encore")
    }

    /// Root directory of this store
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

impl LocalTier for JsonFileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        tracing::debug!(key, bytes = value.len(), "local tier write");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local tier (nothing survives a restart).
#[derive(Default)]
pub struct MemoryTier {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalTier for MemoryTier {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::Storage("memory tier lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| Error::Storage("memory tier lock poisoned".to_string()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| Error::Storage("memory tier lock poisoned".to_string()))?
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        title: String,
        tags: Vec<String>,
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        let doc = Doc {
            title: "Tour plan".to_string(),
            tags: vec!["live".to_string()],
        };

        save_json(&store, "knowledge_base", &doc).unwrap();
        let loaded: Option<Doc> = load_json(&store, "knowledge_base").unwrap();
        assert_eq!(loaded, Some(doc));
        assert!(dir.path().join("knowledge_base.json").exists());
    }

    #[test]
    fn test_file_store_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        assert!(store.read("nothing").unwrap().is_none());
        store.remove("nothing").unwrap();
    }

    #[test]
    fn test_file_store_sanitizes_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        store.write("artist_profile:abc/../x", "{}").unwrap();
        assert!(dir.path().join("artist_profile-abc----x.json").exists());
        assert_eq!(store.read("artist_profile:abc/../x").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_file_store_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        store.write("settings", "{\"a\":1}").unwrap();
        store.remove("settings").unwrap();
        assert!(store.read("settings").unwrap().is_none());
    }

    #[test]
    fn test_memory_tier() {
        let tier = MemoryTier::new();
        save_json(&tier, "k", &vec![1, 2, 3]).unwrap();
        let loaded: Option<Vec<i32>> = load_json(&tier, "k").unwrap();
        assert_eq!(loaded, Some(vec![1, 2, 3]));
        tier.remove("k").unwrap();
        assert!(tier.read("k").unwrap().is_none());
    }

    #[test]
    fn test_load_json_corrupt_document() {
        let tier = MemoryTier::new();
        tier.write("k", "not json").unwrap();
        let loaded: Result<Option<Vec<i32>>> = load_json(&tier, "k");
        assert!(matches!(loaded, Err(Error::Serialization(_))));
    }
}
