//! URL builders used by templates and the description renderer.

use crate::config::{self, ConfigProvider};
use thiserror::Error;
use url::form_urlencoded;

const EXTERNAL_BASE_URL: &str = "https://www.tiktok.com";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum UrlError {
    #[error("invalid static asset type: {0}")]
    InvalidAssetType(String),
}

/// Builds application URLs relative to `APP_URL`.
///
/// Path segments are inserted as given; callers escape untrusted input first.
#[derive(Debug, Clone, Default)]
pub struct UrlBuilder {
    base: String,
}

impl UrlBuilder {
    pub fn new(base: impl Into<String>) -> Self {
        let base: String = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_provider(provider: &dyn ConfigProvider) -> Self {
        Self::new(provider.get(config::APP_URL).unwrap_or_default())
    }

    /// Application URL with optional endpoint
    pub fn path(&self, endpoint: &str) -> String {
        format!("{}{}", self.base, endpoint)
    }

    /// Scripts and stylesheets, optionally from the vendor directory
    pub fn static_asset(&self, kind: &str, file: &str, vendor: bool) -> Result<String, UrlError> {
        let mut endpoint = match kind {
            "js" => String::from("/scripts"),
            "css" => String::from("/styles"),
            other => return Err(UrlError::InvalidAssetType(other.to_string())),
        };
        if vendor {
            endpoint.push_str("/vendor");
        }
        endpoint.push('/');
        endpoint.push_str(file);
        Ok(self.path(&endpoint))
    }

    pub fn user(&self, username: &str) -> String {
        self.path(&format!("/@{}", username))
    }

    pub fn tag(&self, tag: &str) -> String {
        self.path(&format!("/tag/{}", tag))
    }

    pub fn video_internal(&self, username: &str, id: &str) -> String {
        self.path(&format!("/@{}/video/{}", username, id))
    }

    /// Link to the video on the original site
    pub fn video_external(&self, username: &str, id: &str) -> String {
        format!("{}/@{}/video/{}", EXTERNAL_BASE_URL, username, id)
    }

    /// Media proxied through the front-end
    pub fn stream(&self, url: &str) -> String {
        self.path(&format!("/stream?url={}", encode(url)))
    }

    pub fn download(&self, url: &str, username: &str, id: &str, watermark: bool) -> String {
        let mut endpoint = format!(
            "/download?url={}&id={}&user={}",
            encode(url),
            encode(id),
            encode(username)
        );
        if watermark {
            endpoint.push_str("&watermark=1");
        }
        self.path(&endpoint)
    }
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
