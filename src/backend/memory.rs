use std::{collections::BTreeMap, sync::Mutex};

use crate::{
    backend::PreferenceBackend,
    error::{StorageError, StorageResult},
};

/// In-memory backend, for tests and hosts without durable storage
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: Mutex<BTreeMap<String, String>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with one record
    #[must_use]
    pub fn with_record(key: impl Into<String>, record: impl Into<String>) -> Self {
        Self {
            records: Mutex::new(BTreeMap::from([(key.into(), record.into())])),
        }
    }

    fn records(&self) -> StorageResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.records
            .lock()
            .map_err(|_| StorageError::unavailable("memory backend lock poisoned"))
    }
}

impl PreferenceBackend for MemoryBackend {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.records()?.get(key).cloned())
    }

    fn write(&self, key: &str, record: &str) -> StorageResult<()> {
        self.records()?.insert(key.to_string(), record.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.records()?.remove(key);
        Ok(())
    }
}
