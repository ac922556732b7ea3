//! File-backed cache: one JSON document per key.

use super::{hash_key, CacheEngine, CacheEntry, CacheResult};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Stores each entry as `<dir>/<hash of key>.json`.
///
/// Each write goes to a temporary file in the same directory that is then
/// renamed over the target, so readers see either the old or the new
/// document and concurrent writers of the same key leave one complete
/// document behind.
#[derive(Debug, Clone)]
pub struct JsonCache {
    dir: PathBuf,
}

impl JsonCache {
    /// Open the cache, creating the directory if needed
    pub fn open<P: AsRef<Path>>(dir: P) -> CacheResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hash_key(key)))
    }

    fn read_entry(&self, path: &Path) -> CacheResult<Option<CacheEntry>> {
        match std::fs::read(path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl CacheEngine for JsonCache {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let path = self.path_for(key);
        match self.read_entry(&path)? {
            Some(entry) if !entry.belongs_to(key) => {
                debug!(key = key, stored = %entry.key, "Cache MISS (json, hash collision)");
                Ok(None)
            }
            Some(entry) if entry.is_expired() => {
                debug!(key = key, "Cache EXPIRED (json)");
                // Another reader may have removed it first
                if let Err(e) = std::fs::remove_file(&path) {
                    if e.kind() != ErrorKind::NotFound {
                        return Err(e.into());
                    }
                }
                Ok(None)
            }
            Some(entry) => {
                debug!(key = key, "Cache HIT (json)");
                Ok(Some(entry.data))
            }
            None => {
                debug!(key = key, "Cache MISS (json)");
                Ok(None)
            }
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let entry = CacheEntry::new(key, value, ttl);
        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
        file.write_all(&serde_json::to_vec(&entry)?)?;
        file.persist(self.path_for(key)).map_err(|e| e.error)?;
        debug!(key = key, ttl_seconds = ttl.as_secs(), "Cache SET (json)");
        Ok(())
    }

    fn delete(&self, key: &str) -> CacheResult<bool> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => {
                debug!(key = key, "Cache DEL (json)");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
