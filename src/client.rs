//! Scraping API client setup.
//!
//! [`ClientConfigBuilder`] turns settings and request cookies into an
//! immutable [`ClientConfig`]; [`ApiClient::new`] turns that into a handle
//! with a configured HTTP client and cache engine.

use crate::cache::{self, Cache, CacheEngine, CacheEngineRef, CacheError};
use crate::config::{self, ConfigError, ConfigProvider};
use crate::cookies::Cookies;
use crate::signer::{self, SignerConfig};
use reqwest::{Client, Proxy};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Version of the scraping API client shipped in this crate
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent sent when no override is configured
pub const DEFAULT_USER_AGENT: &str = concat!(
    "proxifront/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/cladam/proxifront)"
);

/// Default timeout for HTTP requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long fetched responses stay cached
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

pub const API_BASE_URL: &str = "https://www.tiktok.com";
pub const TEST_API_BASE_URL: &str = "https://t.tiktok.com";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ProxyConfig {
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Everything needed to build an [`ApiClient`]. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    test_endpoints: bool,
    signer: SignerConfig,
    proxy: Option<ProxyConfig>,
    user_agent: Option<String>,
    cache: Option<CacheEngineRef>,
}

impl ClientConfig {
    pub fn test_endpoints(&self) -> bool {
        self.test_endpoints
    }

    pub fn signer(&self) -> &SignerConfig {
        &self.signer
    }

    pub fn proxy(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref()
    }

    /// The override, if one was configured
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn cache(&self) -> Option<&CacheEngineRef> {
        self.cache.as_ref()
    }
}

/// Reads the client settings from a [`ConfigProvider`] and request cookies.
pub struct ClientConfigBuilder<'a> {
    provider: &'a dyn ConfigProvider,
    cookies: Option<&'a Cookies>,
}

impl<'a> ClientConfigBuilder<'a> {
    pub fn new(provider: &'a dyn ConfigProvider) -> Self {
        Self {
            provider,
            cookies: None,
        }
    }

    /// Cookies of the current request, if there is one
    pub fn cookies(mut self, cookies: &'a Cookies) -> Self {
        self.cookies = Some(cookies);
        self
    }

    /// Only cache settings can fail.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let test_endpoints = self.provider.get_flag(config::API_TEST_ENDPOINTS)
            || self.cookies.is_some_and(Cookies::test_endpoints);

        let proxy = match (
            self.provider.get_non_empty(config::PROXY_HOST),
            self.provider.get_non_empty(config::PROXY_PORT),
        ) {
            (Some(host), Some(port)) => Some(ProxyConfig {
                host,
                port,
                username: self.provider.get_non_empty(config::PROXY_USERNAME),
                password: self.provider.get_non_empty(config::PROXY_PASSWORD),
            }),
            _ => None,
        };

        Ok(ClientConfig {
            test_endpoints,
            signer: signer::resolve(self.provider),
            proxy,
            user_agent: self.provider.get_non_empty(config::USER_AGENT),
            cache: cache::resolve(self.provider)?,
        })
    }
}

/// Handle for talking to the scraping API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ClientConfig,
    http: Client,
    cache: Option<Cache>,
}

impl ApiClient {
    /// Build the handle. No network I/O happens here.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let cache = config.cache().map(CacheEngineRef::open).transpose()?;
        let http = create_client(&config)?;

        info!(
            signer = config.signer().method.as_str(),
            proxy = config.proxy().is_some(),
            cache = cache.as_ref().map(|c| c.name()).unwrap_or("none"),
            test_endpoints = config.test_endpoints(),
            "API client ready"
        );

        Ok(Self {
            config,
            http,
            cache,
        })
    }

    /// Resolve configuration and build the client in one step
    pub fn from_provider(
        provider: &dyn ConfigProvider,
        cookies: Option<&Cookies>,
    ) -> Result<Self, ClientError> {
        let mut builder = ClientConfigBuilder::new(provider);
        if let Some(cookies) = cookies {
            builder = builder.cookies(cookies);
        }
        Self::new(builder.build()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&Cache> {
        self.cache.as_ref()
    }

    pub fn base_url(&self) -> &'static str {
        if self.config.test_endpoints() {
            TEST_API_BASE_URL
        } else {
            API_BASE_URL
        }
    }

    /// GET a JSON document, going through the cache when there is one
    pub async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, ClientError> {
        if let Some(value) = self.cached_json(url) {
            return Ok(value);
        }

        let response = self.http.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        let value: serde_json::Value = serde_json::from_str(&body)?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(url, &body, DEFAULT_CACHE_TTL) {
                warn!(error = %e, backend = cache.name(), "Failed to store response in cache");
            }
        }

        Ok(value)
    }

    fn cached_json(&self, url: &str) -> Option<serde_json::Value> {
        let cache = self.cache.as_ref()?;
        let body = match cache.get(url) {
            Ok(body) => body?,
            Err(e) => {
                warn!(error = %e, backend = cache.name(), "Cache read failed, fetching");
                return None;
            }
        };

        match serde_json::from_str(&body) {
            Ok(value) => {
                debug!(url = url, "Serving response from cache");
                Some(value)
            }
            Err(e) => {
                warn!(error = %e, "Cached response is not valid JSON, fetching");
                None
            }
        }
    }
}

/// Create the HTTP client with user agent and proxy applied
fn create_client(config: &ClientConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent().unwrap_or(DEFAULT_USER_AGENT))
        .timeout(REQUEST_TIMEOUT);

    if let Some(proxy) = config.proxy() {
        let mut reqwest_proxy = Proxy::all(proxy.url())?;
        if let Some(username) = &proxy.username {
            reqwest_proxy =
                reqwest_proxy.basic_auth(username, proxy.password.as_deref().unwrap_or(""));
        }
        builder = builder.proxy(reqwest_proxy);
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapProvider;
    use crate::cookies::TEST_ENDPOINTS_COOKIE;
    use crate::signer::SignerMethod;

    #[test]
    fn test_defaults() {
        let config = ClientConfigBuilder::new(&MapProvider::new()).build().unwrap();
        assert!(!config.test_endpoints());
        assert_eq!(config.signer().method, SignerMethod::None);
        assert_eq!(config.proxy(), None);
        assert_eq!(config.user_agent(), None);
        assert_eq!(config.cache(), None);
    }

    #[test]
    fn test_endpoints_from_cookie_alone() {
        let provider = MapProvider::new().with(config::API_TEST_ENDPOINTS, "false");
        let cookies = Cookies::default().with(TEST_ENDPOINTS_COOKIE, "yes");
        let config = ClientConfigBuilder::new(&provider)
            .cookies(&cookies)
            .build()
            .unwrap();
        assert!(config.test_endpoints());
    }

    #[test]
    fn test_endpoints_from_flag_alone() {
        let provider = MapProvider::new().with(config::API_TEST_ENDPOINTS, "true");
        let cookies = Cookies::default().with(TEST_ENDPOINTS_COOKIE, "no");
        let config = ClientConfigBuilder::new(&provider)
            .cookies(&cookies)
            .build()
            .unwrap();
        assert!(config.test_endpoints());
    }

    #[test]
    fn test_endpoints_cookie_must_be_yes() {
        let cookies = Cookies::default().with(TEST_ENDPOINTS_COOKIE, "true");
        let config = ClientConfigBuilder::new(&MapProvider::new())
            .cookies(&cookies)
            .build()
            .unwrap();
        assert!(!config.test_endpoints());
    }

    #[test]
    fn test_proxy_requires_host_and_port() {
        let provider = MapProvider::new().with(config::PROXY_HOST, "proxy.local");
        let config = ClientConfigBuilder::new(&provider).build().unwrap();
        assert_eq!(config.proxy(), None);

        let provider = MapProvider::new()
            .with(config::PROXY_HOST, "proxy.local")
            .with(config::PROXY_PORT, "");
        let config = ClientConfigBuilder::new(&provider).build().unwrap();
        assert_eq!(config.proxy(), None);
    }

    #[test]
    fn test_proxy_credentials_are_independent() {
        let provider = MapProvider::new()
            .with(config::PROXY_HOST, "proxy.local")
            .with(config::PROXY_PORT, "8080")
            .with(config::PROXY_PASSWORD, "pw");
        let config = ClientConfigBuilder::new(&provider).build().unwrap();
        let proxy = config.proxy().unwrap();
        assert_eq!(proxy.url(), "http://proxy.local:8080");
        assert_eq!(proxy.username, None);
        assert_eq!(proxy.password.as_deref(), Some("pw"));
        assert!(!format!("{:?}", proxy).contains("pw\""));
    }

    #[test]
    fn test_user_agent_only_when_non_empty() {
        let provider = MapProvider::new().with(config::USER_AGENT, "");
        assert_eq!(
            ClientConfigBuilder::new(&provider).build().unwrap().user_agent(),
            None
        );

        let provider = MapProvider::new().with(config::USER_AGENT, "Mozilla/5.0 custom");
        assert_eq!(
            ClientConfigBuilder::new(&provider).build().unwrap().user_agent(),
            Some("Mozilla/5.0 custom")
        );
    }

    #[test]
    fn test_cache_errors_surface_from_build() {
        let provider = MapProvider::new().with(config::API_CACHE, "redis");
        assert!(matches!(
            ClientConfigBuilder::new(&provider).build(),
            Err(ConfigError::MissingRedisSettings)
        ));
        assert!(matches!(
            ApiClient::from_provider(&provider, None),
            Err(ClientError::Config(ConfigError::MissingRedisSettings))
        ));
    }

    #[test]
    fn test_client_without_cache() {
        let provider = MapProvider::new().with(config::API_CACHE, "bogus");
        let client = ApiClient::from_provider(&provider, None).unwrap();
        assert!(client.cache().is_none());
        assert_eq!(client.base_url(), API_BASE_URL);
    }

    #[test]
    fn test_client_with_proxy_and_test_endpoints() {
        let provider = MapProvider::new()
            .with(config::PROXY_HOST, "proxy.local")
            .with(config::PROXY_PORT, "8080")
            .with(config::PROXY_USERNAME, "user")
            .with(config::PROXY_PASSWORD, "pw")
            .with(config::USER_AGENT, "custom-agent");
        let cookies = Cookies::parse("api-test_endpoints=yes");
        let client = ApiClient::from_provider(&provider, Some(&cookies)).unwrap();
        assert_eq!(client.base_url(), TEST_API_BASE_URL);
        assert_eq!(client.config().user_agent(), Some("custom-agent"));
    }

    #[test]
    fn test_client_opens_json_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("api");
        let provider = MapProvider::new()
            .with(config::API_CACHE, "json")
            .with(config::API_CACHE_DIR, cache_dir.to_str().unwrap());
        let client = ApiClient::from_provider(&provider, None).unwrap();
        assert_eq!(client.cache().map(|c| c.name()), Some("json"));
        assert!(cache_dir.is_dir());
    }

    #[test]
    fn test_apcu_clients_share_entries() {
        let provider = MapProvider::new().with(config::API_CACHE, "apcu");
        let first = ApiClient::from_provider(&provider, None).unwrap();
        let second = ApiClient::from_provider(&provider, None).unwrap();

        first
            .cache()
            .unwrap()
            .set("shared-between-clients", "v", DEFAULT_CACHE_TTL)
            .unwrap();
        let seen = second.cache().unwrap().get("shared-between-clients").unwrap();
        assert_eq!(seen.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_fetch_json_served_from_cache() {
        let provider = MapProvider::new().with(config::API_CACHE, "apcu");
        let client = ApiClient::from_provider(&provider, None).unwrap();

        // Unroutable: only a cache hit can answer
        let url = "http://127.0.0.1:1/api/item/detail?itemId=1";
        client
            .cache()
            .unwrap()
            .set(url, r#"{"statusCode":0}"#, DEFAULT_CACHE_TTL)
            .unwrap();

        let value = client.fetch_json(url).await.unwrap();
        assert_eq!(value["statusCode"], 0);
    }

    #[tokio::test]
    async fn test_fetch_json_without_server_fails() {
        let client = ApiClient::from_provider(&MapProvider::new(), None).unwrap();
        let result = client.fetch_json("http://127.0.0.1:1/api").await;
        assert!(matches!(result, Err(ClientError::Http(_))));
    }
}
