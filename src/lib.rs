//! # Proxifront
//!
//! Integration layer for a scraping-API web front-end.
//!
//! ## Features
//!
//! - **Client setup**: signer, proxy, user agent and test-endpoint settings
//!   resolved from the environment, a config file and request cookies
//! - **Pluggable caching**: JSON files, an in-process store or Redis, picked by `API_CACHE`
//! - **Description rendering**: escaped text with links for mentions and hashtags

pub mod cache;
pub mod client;
pub mod config;
pub mod cookies;
pub mod logging;
pub mod render;
pub mod signer;
pub mod template;
pub mod urls;

pub use cache::{Cache, CacheEngine, CacheEngineRef};
pub use client::{ApiClient, ClientConfig, ClientConfigBuilder, ClientError};
pub use config::{ConfigError, ConfigProvider, Settings};
pub use cookies::Cookies;
pub use render::{render_description, Annotation, AnnotationKind, RenderedText};
pub use template::TemplateFunctions;
pub use urls::UrlBuilder;
