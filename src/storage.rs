//! Local key-value storage for form state and drafts.
//!
//! `FileStorage` keeps every key in one JSON object on disk and rewrites it
//! atomically (temp file + rename). `MemoryStorage` backs tests and can be
//! given a byte quota to reproduce quota-exceeded failures.
//!
//! A storage file that no longer parses is moved aside to `*.json.corrupt`
//! and treated as empty, so one bad write cannot block every later save.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::warn;

/// Errors raised by a storage read or write.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode storage: {0}")]
    Json(#[from] serde_json::Error),

    #[error("quota exceeded writing '{key}': {needed} bytes needed, limit is {limit}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },
}

/// String-keyed, string-valued persistent storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// File-backed storage: one JSON object mapping keys to stored strings.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Open storage at `path`. The file is created on first write.
    pub fn new(path: &Path) -> Self {
        FileStorage {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let buf = fs::read_to_string(&self.path)?;
        if buf.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        match serde_json::from_str(&buf) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                let aside = self.corrupt_path();
                warn!(
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    error = %e,
                    "storage file is not valid JSON; starting empty"
                );
                fs::rename(&self.path, &aside)?;
                Ok(BTreeMap::new())
            }
        }
    }

    /// Where an unparseable storage file is moved to.
    pub fn corrupt_path(&self) -> PathBuf {
        self.path.with_extension("json.corrupt")
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        // Atomic-ish write via temp + rename.
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(entries)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read_all()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// In-memory storage with an optional total-size quota.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    writes: Mutex<HashMap<String, usize>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once keys plus values would exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        MemoryStorage {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    /// Number of successful writes made to `key`.
    pub fn write_count(&self, key: &str) -> usize {
        let writes = self.writes.lock().unwrap_or_else(|e| e.into_inner());
        writes.get(key).copied().unwrap_or(0)
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(limit) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        let mut writes = self.writes.lock().unwrap_or_else(|e| e.into_inner());
        *writes.entry(key.to_string()).or_default() += 1;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A unique scratch directory under the system temp dir.
    pub(crate) fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "taskdraft_test_{}_{}",
            name,
            uuid::Uuid::new_v4()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn file_storage_round_trip() {
        let dir = scratch_dir("file_round_trip");
        let storage = FileStorage::new(&dir.join("nested").join("storage.json"));

        assert_eq!(storage.get("a").unwrap(), None);
        storage.set("a", "{\"x\":1}").unwrap();
        storage.set("b", "two").unwrap();
        assert_eq!(storage.get("a").unwrap().as_deref(), Some("{\"x\":1}"));

        // A fresh handle sees what the first one wrote.
        let reopened = FileStorage::new(storage.path());
        assert_eq!(reopened.get("b").unwrap().as_deref(), Some("two"));

        reopened.remove("a").unwrap();
        assert_eq!(storage.get("a").unwrap(), None);
        assert!(!storage.path().with_extension("json.tmp").exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn corrupt_file_is_moved_aside() {
        let dir = scratch_dir("corrupt_file");
        let path = dir.join("storage.json");
        fs::write(&path, "{\"task-form-draft\": \"trunc").unwrap();
        let storage = FileStorage::new(&path);

        storage.set("a", "1").unwrap();
        assert_eq!(storage.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(
            fs::read_to_string(storage.corrupt_path()).unwrap(),
            "{\"task-form-draft\": \"trunc"
        );

        fs::write(&path, "not json").unwrap();
        assert_eq!(storage.get("a").unwrap(), None);
        storage.remove("a").unwrap();
        assert_eq!(fs::read_to_string(storage.corrupt_path()).unwrap(), "not json");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn memory_quota_rejects_oversized_writes() {
        let storage = MemoryStorage::with_quota(10);
        storage.set("k", "12345").unwrap();
        let err = storage.set("k", "0123456789").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { needed: 11, limit: 10, .. }));
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("12345"));
        assert_eq!(storage.write_count("k"), 1);
    }
}
