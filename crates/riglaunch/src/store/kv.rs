use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::StoreError;

/// Flat string key-value storage, the shape of a platform preferences store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
    /// Reads and removes a value in one step; a write racing the call is
    /// either returned here or kept for the next reader.
    fn take(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Missing or unparsable values read as `false`.
    fn get_bool(&self, key: &str) -> Result<bool, StoreError> {
        Ok(matches!(self.get(key)?.as_deref(), Some("true") | Some("1")))
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), StoreError> {
        self.set(key, if value { "true" } else { "false" })
    }

    fn get_i64(&self, key: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.get(key)?.and_then(|v| v.parse().ok()))
    }

    fn set_i64(&self, key: &str, value: i64) -> Result<(), StoreError> {
        self.set(key, &value.to_string())
    }
}

/// In-process tier, used by tests and by hosts without durable storage.
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn take(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.remove(key))
    }
}
