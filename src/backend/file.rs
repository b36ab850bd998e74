use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
    backend::PreferenceBackend,
    error::{StorageError, StorageResult},
};

/// Directory name under the platform config dir
pub const APP_DIR: &str = "copyfmt";

/// Overrides the storage directory when set
pub const STORAGE_DIR_ENV: &str = "COPYFMT_STORAGE_DIR";

const RECORD_EXTENSION: &str = "json";

/// Directory-backed storage: one `<key>.json` file per record.
///
/// Each write is staged in its own uniquely named temporary sibling and
/// renamed into place, so a reader never observes a half-written record and
/// concurrent writers on one directory resolve to the last rename.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (creating if needed) a storage directory
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created
    pub fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            StorageError::unavailable(format!("cannot create {}: {e}", dir.display()))
        })?;
        debug!(dir = %dir.display(), "Opened file preference backend");
        Ok(Self { dir })
    }

    /// Open the default storage directory
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created
    pub fn open_default() -> StorageResult<Self> {
        Self::open(Self::default_dir())
    }

    /// `$COPYFMT_STORAGE_DIR`, else `<config dir>/copyfmt`
    #[must_use]
    pub fn default_dir() -> PathBuf {
        if let Some(dir) = std::env::var_os(STORAGE_DIR_ENV).filter(|d| !d.is_empty()) {
            return PathBuf::from(dir);
        }
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the record for `key`
    ///
    /// # Errors
    ///
    /// Returns an error if `key` is empty or would escape the directory
    pub fn record_path(&self, key: &str) -> StorageResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::invalid_key(key));
        }
        Ok(self.dir.join(format!("{key}.{RECORD_EXTENSION}")))
    }
}

impl PreferenceBackend for FileBackend {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.record_path(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(key, e)),
        }
    }

    fn write(&self, key: &str, record: &str) -> StorageResult<()> {
        let path = self.record_path(key)?;
        let mut staged = NamedTempFile::new_in(&self.dir).map_err(|e| StorageError::io(key, e))?;
        staged
            .write_all(record.as_bytes())
            .map_err(|e| StorageError::io(key, e))?;
        staged
            .persist(&path)
            .map_err(|e| StorageError::io(key, e.error))?;

        debug!(path = %path.display(), bytes = record.len(), "Wrote preference record");
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.record_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(key, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_path_uses_json_extension() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        let path = backend.record_path("copy-format-storage-key").unwrap();
        assert_eq!(path, dir.path().join("copy-format-storage-key.json"));
    }

    #[test]
    fn test_record_path_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();

        for key in ["", "../prefs", "a/b", ".hidden", "a\\b"] {
            assert!(
                matches!(backend.record_path(key), Err(StorageError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_open_creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let backend = FileBackend::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(backend.dir(), nested.as_path());
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        backend.write("prefs", "{}").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["prefs.json".to_string()]);
    }

    #[test]
    fn test_records_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        FileBackend::open(dir.path())
            .unwrap()
            .write("prefs", "saved")
            .unwrap();

        let reopened = FileBackend::open(dir.path()).unwrap();
        assert_eq!(reopened.read("prefs").unwrap().as_deref(), Some("saved"));
    }

    #[test]
    fn test_concurrent_writers_never_tear_records() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<String> = (0..4u8)
            .map(|n| {
                let fill = char::from(b'a' + n).to_string().repeat(64 * 1024);
                format!("{{\"writer\":{n},\"fill\":\"{fill}\"}}")
            })
            .collect();

        std::thread::scope(|scope| {
            for record in &records {
                let backend = FileBackend::open(dir.path()).unwrap();
                let records = &records;
                scope.spawn(move || {
                    for _ in 0..50 {
                        backend.write("prefs", record).unwrap();
                        let read = backend.read("prefs").unwrap().unwrap();
                        assert!(records.contains(&read), "torn record of {} bytes", read.len());
                    }
                });
            }
        });

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["prefs.json".to_string()]);
    }

    #[test]
    fn test_read_directory_as_record_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        fs::create_dir(dir.path().join("prefs.json")).unwrap();
        assert!(matches!(backend.read("prefs"), Err(StorageError::Io { .. })));
    }
}
