//! Configuration loading and management for proxifront.
//!
//! Every setting is read through a [`ConfigProvider`], so nothing below the
//! binary touches the process environment directly. Settings come from
//! `proxifront.toml` with environment variable overrides.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const API_SIGNER: &str = "API_SIGNER";
pub const API_SIGNER_URL: &str = "API_SIGNER_URL";
pub const API_BROWSER_URL: &str = "API_BROWSER_URL";
pub const API_TEST_ENDPOINTS: &str = "API_TEST_ENDPOINTS";
pub const API_CACHE: &str = "API_CACHE";
pub const API_CACHE_DIR: &str = "API_CACHE_DIR";
pub const PROXY_HOST: &str = "PROXY_HOST";
pub const PROXY_PORT: &str = "PROXY_PORT";
pub const PROXY_USERNAME: &str = "PROXY_USERNAME";
pub const PROXY_PASSWORD: &str = "PROXY_PASSWORD";
pub const REDIS_URL: &str = "REDIS_URL";
pub const REDIS_HOST: &str = "REDIS_HOST";
pub const REDIS_PORT: &str = "REDIS_PORT";
pub const REDIS_PASSWORD: &str = "REDIS_PASSWORD";
pub const USER_AGENT: &str = "USER_AGENT";
pub const APP_URL: &str = "APP_URL";

const CONFIG_FILE_NAME: &str = "proxifront.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("you need to set REDIS_URL or REDIS_HOST and REDIS_PORT to use the redis cache")]
    MissingRedisSettings,
    #[error("invalid REDIS_URL: {0}")]
    InvalidRedisUrl(String),
    #[error("invalid REDIS_PORT: {0}")]
    InvalidRedisPort(String),
}

/// Source of named configuration values.
pub trait ConfigProvider {
    /// Raw value for `key`, if set at all.
    fn get(&self, key: &str) -> Option<String>;

    /// Value for `key`, treating an empty string as unset.
    fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Boolean flag; `1`, `true`, `yes` and `on` are true, anything else false.
    fn get_flag(&self, key: &str) -> bool {
        self.get(key).map(|v| is_truthy(&v)).unwrap_or(false)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvProvider;

impl ConfigProvider for EnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory key/value settings, used for config files and tests.
#[derive(Debug, Clone, Default)]
pub struct MapProvider {
    values: HashMap<String, String>,
}

impl MapProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse a flat TOML table. Non-string scalars are stored in their TOML spelling.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(content)?;
        let values = table
            .into_iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    toml::Value::String(s) => s,
                    toml::Value::Integer(i) => i.to_string(),
                    toml::Value::Float(f) => f.to_string(),
                    toml::Value::Boolean(b) => b.to_string(),
                    _ => return None,
                };
                Some((key, value))
            })
            .collect();
        Ok(Self { values })
    }

    /// Load settings from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

impl ConfigProvider for MapProvider {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Environment variables layered over the config file.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    file: MapProvider,
    source: Option<PathBuf>,
}

impl Settings {
    /// Load from the default location (proxifront.toml in cwd or home).
    ///
    /// A missing config file is not an error: the environment alone is enough.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load settings from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let file = MapProvider::load_from(path)?;
        tracing::debug!(path = %path.display(), keys = file.len(), "Loaded config file");
        Ok(Self {
            file,
            source: Some(path.to_path_buf()),
        })
    }

    /// The config file these settings were read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check current directory first
        let local_config = PathBuf::from(CONFIG_FILE_NAME);
        if local_config.exists() {
            return Some(local_config);
        }

        let home_config = dirs::home_dir()?
            .join(".config")
            .join("proxifront")
            .join(CONFIG_FILE_NAME);
        home_config.exists().then_some(home_config)
    }
}

impl ConfigProvider for Settings {
    fn get(&self, key: &str) -> Option<String> {
        EnvProvider.get(key).or_else(|| self.file.get(key))
    }
}
