use std::fmt::Debug;

use crate::error::StorageResult;

pub mod file;
pub mod memory;

pub use file::FileBackend;
pub use memory::MemoryBackend;

/// Key-value persistence beneath the preference store.
///
/// Each key holds one serialized record. Implementations must make a single
/// `write` atomic with respect to `read`; concurrent writers are serialized by
/// the backend with the last write winning.
pub trait PreferenceBackend: Send + Sync + Debug {
    /// Read the record stored under `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be read
    fn read(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the record stored under `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be written
    fn write(&self, key: &str, record: &str) -> StorageResult<()>;

    /// Remove the record stored under `key`; removing a missing record succeeds
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be written
    fn remove(&self, key: &str) -> StorageResult<()>;
}
