//! File-backed storage.
//!
//! All keys live in one JSON object on disk. Every mutation rewrites the
//! whole file through a temporary sibling and a rename, so a reader never
//! sees a half-written file. On unix the file is created owner-only (0600). A file that fails to parse is treated as empty
//! and overwritten on the next write.

use crate::{DurableStorage, StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Durable storage persisted to a single JSON file.
pub struct FileStorage {
    path: PathBuf,
    cache: Mutex<Option<BTreeMap<String, String>>>,
}

impl FileStorage {
    /// Create storage backed by `path`. The file is read lazily.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> StorageResult<BTreeMap<String, String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        match serde_json::from_str(&content) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Storage file is corrupt, starting empty");
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_file(&self, map: &BTreeMap<String, String>) -> StorageResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let json = serde_json::to_string_pretty(map)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;

        let tmp_path = self.path.with_extension("tmp");
        let written = (|| -> std::io::Result<()> {
            let mut options = OpenOptions::new();
            options.write(true).create(true).truncate(true);
            // Tokens live here: owner read/write only.
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o600);
            }
            let mut file = options.open(&tmp_path)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
            }
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
            std::fs::rename(&tmp_path, &self.path)?;

            if let Ok(parent_dir) = File::open(dir) {
                let _ = parent_dir.sync_all();
            }
            Ok(())
        })();

        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(StorageError::Io(e));
        }

        debug!(path = %self.path.display(), keys = map.len(), "Storage file written");
        Ok(())
    }

    fn read_map<T>(&self, f: impl FnOnce(&BTreeMap<String, String>) -> T) -> StorageResult<T> {
        let mut guard = self.cache.lock();
        if guard.is_none() {
            *guard = Some(self.read_file()?);
        }
        let map = guard
            .as_ref()
            .ok_or_else(|| StorageError::Platform("storage cache unavailable".to_string()))?;
        Ok(f(map))
    }

    /// Apply `f` to a copy of the map. The copy replaces the cache only once
    /// it is on disk, so a failed write leaves both sides unchanged.
    fn update_map<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> (T, bool),
    ) -> StorageResult<T> {
        let mut guard = self.cache.lock();
        if guard.is_none() {
            *guard = Some(self.read_file()?);
        }
        let map = guard
            .as_mut()
            .ok_or_else(|| StorageError::Platform("storage cache unavailable".to_string()))?;

        let mut next = map.clone();
        let (value, dirty) = f(&mut next);
        if dirty {
            self.write_file(&next)?;
            *map = next;
        }
        Ok(value)
    }
}

impl DurableStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.update_map(|map| {
            map.insert(key.to_string(), value.to_string());
            ((), true)
        })
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.read_map(|map| map.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        self.update_map(|map| {
            let existed = map.remove(key).is_some();
            (existed, existed)
        })
    }

    fn list_keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.read_map(|map| {
            map.keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        let storage = FileStorage::new(&path);
        storage.set("inms.access_token", "A1").unwrap();
        storage.set("inms.refresh_token", "R1").unwrap();
        drop(storage);

        let reopened = FileStorage::new(&path);
        assert_eq!(
            reopened.get("inms.access_token").unwrap(),
            Some("A1".to_string())
        );
        assert_eq!(
            reopened.get("inms.refresh_token").unwrap(),
            Some("R1".to_string())
        );
    }

    #[test]
    fn test_delete_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        let storage = FileStorage::new(&path);
        storage.set("key", "value").unwrap();
        assert!(storage.delete("key").unwrap());
        assert!(!storage.delete("key").unwrap());

        let reopened = FileStorage::new(&path);
        assert!(!reopened.has("key").unwrap());
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested").join("session.json"));
        assert_eq!(storage.get("anything").unwrap(), None);

        storage.set("k", "v").unwrap();
        assert!(storage.path().exists());
    }

    #[test]
    fn test_corrupt_file_treated_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{ not json").unwrap();

        let storage = FileStorage::new(&path);
        assert_eq!(storage.get("inms.user").unwrap(), None);

        storage.set("inms.user", "{}").unwrap();
        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get("inms.user").unwrap(), Some("{}".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let storage = FileStorage::new(&path);
        storage.set("inms.refresh_token", "R1").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_failed_write_keeps_previous_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let storage = FileStorage::new(&path);
        storage.set("inms.access_token", "A1").unwrap();

        // A directory where the temp file goes makes the next write fail.
        std::fs::create_dir(path.with_extension("tmp")).unwrap();

        assert!(storage.delete("inms.access_token").is_err());
        assert!(storage.set("inms.user", "{}").is_err());

        assert_eq!(
            storage.get("inms.access_token").unwrap(),
            Some("A1".to_string())
        );
        assert_eq!(storage.get("inms.user").unwrap(), None);
        let reopened = FileStorage::new(&path);
        assert_eq!(
            reopened.get("inms.access_token").unwrap(),
            Some("A1".to_string())
        );
    }
}
