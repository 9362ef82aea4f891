use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::error::{RepositoryError, RepositoryResult};
use super::kv_store::KeyValueStore;

const STORAGE_FILE_NAME: &str = "storage.json";

/// JSON-file backed key/value store.
///
/// All keys live in one JSON object file (`<dir>/storage.json`), read once on
/// open and rewritten atomically (temp file + rename) on every change.
pub struct JsonFileStore {
    file_path: PathBuf,
    entries: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl JsonFileStore {
    /// Open the store in the platform data directory (`<data_dir>/parley`)
    pub fn new() -> RepositoryResult<Self> {
        let data_dir = dirs::data_dir().ok_or_else(|| RepositoryError::InitializationError {
            message: "Could not determine data directory".to_string(),
        })?;
        Self::open(&data_dir.join("parley"))
    }

    /// Open (or create) the store file inside `dir`.
    ///
    /// A file that cannot be parsed is moved aside to `storage.json.corrupt`
    /// and the store starts empty.
    pub fn open(dir: &Path) -> RepositoryResult<Self> {
        std::fs::create_dir_all(dir)?;
        let file_path = dir.join(STORAGE_FILE_NAME);

        let entries = if file_path.exists() {
            let contents = std::fs::read_to_string(&file_path)?;
            match serde_json::from_str::<BTreeMap<String, String>>(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(
                        path = %file_path.display(),
                        error = ?e,
                        "Storage file is malformed, starting with empty storage"
                    );
                    let backup = file_path.with_extension("json.corrupt");
                    if let Err(e) = std::fs::rename(&file_path, &backup) {
                        warn!(error = ?e, "Failed to move malformed storage file aside");
                    }
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %file_path.display(), keys = entries.len(), "Opened key/value storage");

        Ok(Self {
            file_path,
            entries,
            quota: None,
        })
    }

    /// Reject writes whose serialized storage would exceed `quota` bytes
    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> RepositoryResult<()> {
        let json = serde_json::to_string_pretty(entries)?;

        if let Some(quota) = self.quota
            && json.len() > quota
        {
            return Err(RepositoryError::QuotaExceeded {
                required: json.len(),
                quota,
            });
        }

        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write atomically using temp file + rename
        let temp_path = self.file_path.with_extension("json.tmp");
        std::fs::write(&temp_path, json)?;
        std::fs::rename(&temp_path, &self.file_path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> RepositoryResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> RepositoryResult<()> {
        let mut next = self.entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        self.entries = next;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> RepositoryResult<()> {
        if !self.entries.contains_key(key) {
            return Ok(());
        }
        let mut next = self.entries.clone();
        next.remove(key);
        self.persist(&next)?;
        self.entries = next;
        Ok(())
    }

    fn storage_path(&self) -> String {
        self.file_path.to_string_lossy().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_survive_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(tmp.path()).unwrap();
        store.set("chat-app-theme", "light").unwrap();
        store.set("chat-app-sidebar", "closed").unwrap();
        drop(store);

        let reopened = JsonFileStore::open(tmp.path()).unwrap();
        assert_eq!(
            reopened.get("chat-app-theme").unwrap().as_deref(),
            Some("light")
        );
        assert_eq!(
            reopened.get("chat-app-sidebar").unwrap().as_deref(),
            Some("closed")
        );
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(tmp.path()).unwrap();
        store.set("k", "v").unwrap();
        assert!(store.file_path().exists());
        assert!(!tmp.path().join("storage.json.tmp").exists());
    }

    #[test]
    fn test_malformed_file_is_moved_aside() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("storage.json"), "{not json").unwrap();

        let store = JsonFileStore::open(tmp.path()).unwrap();
        assert_eq!(store.get("anything").unwrap(), None);
        assert!(tmp.path().join("storage.json.corrupt").exists());
    }

    #[test]
    fn test_quota_failure_keeps_previous_value() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(tmp.path()).unwrap().with_quota(64);
        store.set("k", "small").unwrap();

        let err = store.set("k", &"x".repeat(200)).unwrap_err();
        assert!(matches!(err, RepositoryError::QuotaExceeded { .. }));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("small"));
    }

    #[test]
    fn test_remove_absent_key() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::open(tmp.path()).unwrap();
        store.remove("missing").unwrap();
        assert!(!store.file_path().exists());
    }
}
