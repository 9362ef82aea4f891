use super::error::RepositoryResult;

/// Flat string key/value storage, the local-storage equivalent.
///
/// Values are opaque strings; callers own their encoding. Writes replace the
/// whole value for a key.
pub trait KeyValueStore: Send + 'static {
    /// Read the value stored under `key`, `None` if absent
    fn get(&self, key: &str) -> RepositoryResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: &str) -> RepositoryResult<()>;

    /// Remove `key`. Removing an absent key succeeds.
    fn remove(&mut self, key: &str) -> RepositoryResult<()>;

    /// Human-readable location, for logs
    fn storage_path(&self) -> String;
}
