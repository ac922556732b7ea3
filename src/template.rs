//! Helper functions exposed to page templates.

use crate::client;
use crate::config::ConfigProvider;
use crate::cookies::Cookies;
use crate::render::{self, RenderedText, TextExtra};
use crate::urls::{UrlBuilder, UrlError};

/// Per-request helper surface for templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateFunctions {
    urls: UrlBuilder,
    cookies: Cookies,
}

impl TemplateFunctions {
    pub fn new(urls: UrlBuilder, cookies: Cookies) -> Self {
        Self { urls, cookies }
    }

    pub fn from_provider(provider: &dyn ConfigProvider, cookies: Cookies) -> Self {
        Self::new(UrlBuilder::from_provider(provider), cookies)
    }

    pub fn urls(&self) -> &UrlBuilder {
        &self.urls
    }

    pub fn path(&self, endpoint: &str) -> String {
        self.urls.path(endpoint)
    }

    pub fn static_asset(&self, kind: &str, file: &str, vendor: bool) -> Result<String, UrlError> {
        self.urls.static_asset(kind, file, vendor)
    }

    pub fn theme(&self) -> &str {
        self.cookies.theme()
    }

    pub fn version_frontend(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Version of the API client doing the scraping
    pub fn version_scraper(&self) -> &'static str {
        client::CLIENT_VERSION
    }

    pub fn bool_to_str(&self, cond: bool) -> &'static str {
        if cond {
            "yes"
        } else {
            "no"
        }
    }

    pub fn url_stream(&self, url: &str) -> String {
        self.urls.stream(url)
    }

    pub fn url_user(&self, username: &str) -> String {
        self.urls.user(username)
    }

    pub fn url_tag(&self, tag: &str) -> String {
        self.urls.tag(tag)
    }

    pub fn url_video_internal(&self, username: &str, id: &str) -> String {
        self.urls.video_internal(username, id)
    }

    pub fn url_video_external(&self, username: &str, id: &str) -> String {
        self.urls.video_external(username, id)
    }

    pub fn url_download(&self, url: &str, username: &str, id: &str, watermark: bool) -> String {
        self.urls.download(url, username, id, watermark)
    }

    /// Video description with mention and hashtag links
    pub fn render_desc(&self, desc: &str, extras: &[TextExtra]) -> RenderedText {
        render::render_text_extras(desc, extras, &self.urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{self, MapProvider};

    fn functions() -> TemplateFunctions {
        let provider = MapProvider::new().with(config::APP_URL, "https://front.example");
        TemplateFunctions::from_provider(&provider, Cookies::parse("theme=card"))
    }

    #[test]
    fn test_helpers() {
        let f = functions();
        assert_eq!(f.path("/settings"), "https://front.example/settings");
        assert_eq!(f.theme(), "card");
        assert_eq!(f.bool_to_str(true), "yes");
        assert_eq!(f.bool_to_str(false), "no");
        assert_eq!(f.version_frontend(), env!("CARGO_PKG_VERSION"));
        assert_eq!(f.version_scraper(), crate::client::CLIENT_VERSION);
        assert!(!f.version_scraper().is_empty());
        assert_eq!(f.url_user("someone"), "https://front.example/@someone");
        assert_eq!(f.url_tag("cats"), "https://front.example/tag/cats");
        assert!(f.static_asset("svg", "x.svg", false).is_err());
    }

    #[test]
    fn test_render_desc_uses_base_url() {
        let extras = vec![TextExtra {
            kind: 1,
            start: 4,
            end: 9,
            user_unique_id: None,
            hashtag_name: Some("cats".to_string()),
        }];
        let out = functions().render_desc("all #cats", &extras);
        assert_eq!(
            out.as_str(),
            "all <a href=\"https://front.example/tag/cats\">#cats</a>"
        );
    }
}
