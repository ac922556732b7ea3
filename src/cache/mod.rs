//! # Response cache engines
//!
//! Pluggable key/value stores that keep scraping API responses around so the
//! front-end does not hit the remote service for every page view.
//!
//! ```text
//! Cache (enum)              <- dispatch without a vtable
//!   ├── Json(JsonCache)     <- one JSON file per key
//!   ├── Apcu(ApcuCache)     <- in-process store shared by every client in the process
//!   └── Redis(RedisCache)   <- external key/value server
//! ```
//!
//! Selection happens in two steps: [`resolve`] turns configuration into a
//! [`CacheEngineRef`] (validating it), and [`CacheEngineRef::open`] builds the
//! engine. An absent or unrecognized `API_CACHE` disables caching.

pub mod apcu;
pub mod json;
pub mod redis;

pub use self::apcu::ApcuCache;
pub use self::json::JsonCache;
pub use self::redis::{RedisCache, RedisSettings};

use crate::config::{self, ConfigError, ConfigProvider};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Port used when a Redis URL does not name one
pub const DEFAULT_REDIS_PORT: u16 = 6379;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("cache database error: {0}")]
    Db(#[from] sled::Error),
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("invalid cache settings: {0}")]
    InvalidSettings(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Operations every cache backend provides.
///
/// Implementations must tolerate concurrent use from independent clients;
/// callers add no locking of their own.
pub trait CacheEngine: Send + Sync {
    /// Returns `Ok(Some(value))` on hit, `Ok(None)` on miss or expiry.
    fn get(&self, key: &str) -> CacheResult<Option<String>>;

    fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Store `value` under `key` for `ttl`.
    fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Remove `key`; returns whether anything was removed.
    fn delete(&self, key: &str) -> CacheResult<bool>;

    fn name(&self) -> &'static str;
}

/// Cache method named by `API_CACHE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMethod {
    Json,
    Apcu,
    Redis,
}

impl CacheMethod {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(Self::Json),
            "apcu" => Some(Self::Apcu),
            "redis" => Some(Self::Redis),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Apcu => "apcu",
            Self::Redis => "redis",
        }
    }
}

/// A validated, not yet opened, cache selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEngineRef {
    Json { dir: PathBuf },
    Apcu,
    Redis(RedisSettings),
}

impl CacheEngineRef {
    pub fn method(&self) -> CacheMethod {
        match self {
            Self::Json { .. } => CacheMethod::Json,
            Self::Apcu => CacheMethod::Apcu,
            Self::Redis(_) => CacheMethod::Redis,
        }
    }

    /// Construct the engine. Redis does not connect until the first operation.
    pub fn open(&self) -> CacheResult<Cache> {
        let cache = match self {
            Self::Json { dir } => Cache::Json(JsonCache::open(dir)?),
            Self::Apcu => Cache::Apcu(ApcuCache::open()?),
            Self::Redis(settings) => {
                Cache::Redis(Box::new(RedisCache::new(settings.clone())?))
            }
        };
        info!(backend = cache.name(), "Cache engine ready");
        Ok(cache)
    }
}

/// Pick the cache backend from configuration.
///
/// Unset or unrecognized `API_CACHE` means no cache. Redis needs either
/// `REDIS_URL` or both `REDIS_HOST` and `REDIS_PORT`; the URL wins when both
/// are present.
pub fn resolve(provider: &dyn ConfigProvider) -> Result<Option<CacheEngineRef>, ConfigError> {
    let Some(value) = provider.get_non_empty(config::API_CACHE) else {
        return Ok(None);
    };

    let Some(method) = CacheMethod::parse(&value) else {
        warn!(method = %value, "Unknown cache method, caching disabled");
        return Ok(None);
    };

    let engine = match method {
        CacheMethod::Json => CacheEngineRef::Json {
            dir: provider
                .get_non_empty(config::API_CACHE_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(default_json_dir),
        },
        CacheMethod::Apcu => CacheEngineRef::Apcu,
        CacheMethod::Redis => CacheEngineRef::Redis(resolve_redis(provider)?),
    };
    Ok(Some(engine))
}

fn resolve_redis(provider: &dyn ConfigProvider) -> Result<RedisSettings, ConfigError> {
    if let Some(url) = provider.get_non_empty(config::REDIS_URL) {
        return RedisSettings::from_url(&url);
    }

    match (
        provider.get_non_empty(config::REDIS_HOST),
        provider.get_non_empty(config::REDIS_PORT),
    ) {
        (Some(host), Some(port)) => {
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidRedisPort(port.clone()))?;
            Ok(RedisSettings {
                host,
                port,
                password: provider.get_non_empty(config::REDIS_PASSWORD),
            })
        }
        _ => Err(ConfigError::MissingRedisSettings),
    }
}

fn default_json_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("proxifront").join("api"))
        .unwrap_or_else(|| PathBuf::from("./cache/api"))
}

/// Resolve and open the configured engine in one step.
pub fn from_config(provider: &dyn ConfigProvider) -> Result<Option<Cache>, crate::ClientError> {
    match resolve(provider)? {
        Some(engine) => Ok(Some(engine.open()?)),
        None => Ok(None),
    }
}

/// An opened cache engine.
#[derive(Debug, Clone)]
pub enum Cache {
    Json(JsonCache),
    Apcu(ApcuCache),
    /// Boxed to keep the enum small
    Redis(Box<RedisCache>),
}

impl CacheEngine for Cache {
    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        match self {
            Self::Json(c) => c.get(key),
            Self::Apcu(c) => c.get(key),
            Self::Redis(c) => c.get(key),
        }
    }

    fn exists(&self, key: &str) -> CacheResult<bool> {
        match self {
            Self::Json(c) => c.exists(key),
            Self::Apcu(c) => c.exists(key),
            Self::Redis(c) => c.exists(key),
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        match self {
            Self::Json(c) => c.set(key, value, ttl),
            Self::Apcu(c) => c.set(key, value, ttl),
            Self::Redis(c) => c.set(key, value, ttl),
        }
    }

    fn delete(&self, key: &str) -> CacheResult<bool> {
        match self {
            Self::Json(c) => c.delete(key),
            Self::Apcu(c) => c.delete(key),
            Self::Redis(c) => c.delete(key),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Json(c) => c.name(),
            Self::Apcu(c) => c.name(),
            Self::Redis(c) => c.name(),
        }
    }
}

/// A cached value with its expiry, as persisted by the local backends.
///
/// The key is stored alongside the value so a reader can tell a hashed file
/// name that collides with another key from a real hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CacheEntry {
    #[serde(default)]
    pub key: String,
    pub data: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: &str, data: &str, ttl: Duration) -> Self {
        let created_at = Utc::now();
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            key: key.to_string(),
            data: data.to_string(),
            created_at,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Whether this entry was written for `key`
    pub fn belongs_to(&self, key: &str) -> bool {
        self.key == key
    }
}

/// Hash a key for backends that need a filesystem-safe name
pub(crate) fn hash_key(key: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}
