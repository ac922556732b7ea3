//! In-process cache, the `apcu` method.
//!
//! Backed by a single temporary sled database that lives as long as the
//! process. Every handle opened in the process reads and writes that same
//! database, so independent clients see each other's entries.

use super::{CacheEngine, CacheEntry, CacheResult};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;
use tracing::debug;

static SHARED: OnceLock<sled::Db> = OnceLock::new();
static OPENING: Mutex<()> = Mutex::new(());

#[derive(Clone)]
pub struct ApcuCache {
    db: sled::Db,
}

impl std::fmt::Debug for ApcuCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApcuCache")
            .field("entries", &self.db.len())
            .finish()
    }
}

impl ApcuCache {
    /// Handle to the process-wide store, created on first use
    pub fn open() -> CacheResult<Self> {
        if let Some(db) = SHARED.get() {
            return Ok(Self { db: db.clone() });
        }

        // Serialize creation so only one database is ever opened
        let _guard = OPENING.lock().unwrap_or_else(|e| e.into_inner());
        let db = match SHARED.get() {
            Some(db) => db.clone(),
            None => {
                let db = sled::Config::new().temporary(true).open()?;
                debug!("Created process-wide apcu store");
                SHARED.get_or_init(|| db).clone()
            }
        };
        Ok(Self { db })
    }

    /// Number of stored entries across the process, expired ones included
    pub fn len(&self) -> usize {
        self.db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

impl CacheEngine for ApcuCache {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let Some(data) = self.db.get(key.as_bytes())? else {
            debug!(key = key, "Cache MISS (apcu)");
            return Ok(None);
        };

        let entry: CacheEntry = serde_json::from_slice(&data)?;
        if !entry.belongs_to(key) {
            debug!(key = key, "Cache MISS (apcu, foreign entry)");
            return Ok(None);
        }
        if entry.is_expired() {
            debug!(key = key, "Cache EXPIRED (apcu)");
            self.db.remove(key.as_bytes())?;
            return Ok(None);
        }

        debug!(key = key, "Cache HIT (apcu)");
        Ok(Some(entry.data))
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let entry = CacheEntry::new(key, value, ttl);
        self.db.insert(key.as_bytes(), serde_json::to_vec(&entry)?)?;
        debug!(key = key, ttl_seconds = ttl.as_secs(), "Cache SET (apcu)");
        Ok(())
    }

    fn delete(&self, key: &str) -> CacheResult<bool> {
        let existed = self.db.remove(key.as_bytes())?.is_some();
        debug!(key = key, existed = existed, "Cache DEL (apcu)");
        Ok(existed)
    }

    fn name(&self) -> &'static str {
        "apcu"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    // The store is shared by every test in the process, so each test uses
    // its own keys.

    #[test]
    fn test_crud() {
        let cache = ApcuCache::open().unwrap();
        assert_eq!(cache.get("crud").unwrap(), None);

        cache.set("crud", "v", Duration::from_secs(60)).unwrap();
        assert_eq!(cache.get("crud").unwrap().as_deref(), Some("v"));
        assert!(!cache.is_empty());

        assert!(cache.delete("crud").unwrap());
        assert!(!cache.delete("crud").unwrap());
        assert!(!cache.exists("crud").unwrap());
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = ApcuCache::open().unwrap();
        cache.set("expired", "v", Duration::ZERO).unwrap();
        assert_eq!(cache.get("expired").unwrap(), None);
        assert!(cache.db.get("expired").unwrap().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let cache = ApcuCache::open().unwrap();
        let other = cache.clone();
        cache.set("cloned", "v", Duration::from_secs(60)).unwrap();
        assert_eq!(other.get("cloned").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_separately_opened_handles_share_state() {
        let a = ApcuCache::open().unwrap();
        let b = ApcuCache::open().unwrap();
        a.set("opened-twice", "v", Duration::from_secs(60)).unwrap();
        assert_eq!(b.get("opened-twice").unwrap().as_deref(), Some("v"));
        assert!(b.delete("opened-twice").unwrap());
        assert_eq!(a.get("opened-twice").unwrap(), None);
    }

    #[test]
    fn test_entry_for_another_key_is_a_miss() {
        let cache = ApcuCache::open().unwrap();
        let entry = CacheEntry::new("owner", "v", Duration::from_secs(60));
        cache
            .db
            .insert("intruder", serde_json::to_vec(&entry).unwrap())
            .unwrap();
        assert_eq!(cache.get("intruder").unwrap(), None);
    }

    #[test]
    fn test_concurrent_open_and_write() {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                thread::spawn(move || {
                    let cache = ApcuCache::open().unwrap();
                    let key = format!("concurrent{}", i);
                    cache.set(&key, "v", Duration::from_secs(60)).unwrap();
                    key
                })
            })
            .collect();
        let keys: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let cache = Arc::new(ApcuCache::open().unwrap());
        for key in keys {
            assert_eq!(cache.get(&key).unwrap().as_deref(), Some("v"));
        }
    }
}
