//! Signer selection.
//!
//! A signer computes the request signatures the scraping API requires. The
//! unified `API_SIGNER` / `API_SIGNER_URL` pair replaced two single-purpose
//! variables, which are still honoured after it.

use crate::config::{self, ConfigProvider};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignerMethod {
    #[default]
    None,
    Remote,
    Browser,
}

impl SignerMethod {
    /// Methods that can be named explicitly in `API_SIGNER`
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "remote" => Some(Self::Remote),
            "browser" => Some(Self::Browser),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Remote => "remote",
            Self::Browser => "browser",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignerConfig {
    pub method: SignerMethod,
    /// Non-empty whenever `method` is not `None`
    pub url: String,
    pub close_when_done: bool,
}

impl SignerConfig {
    fn new(method: SignerMethod, url: String) -> Self {
        Self {
            method,
            url,
            close_when_done: false,
        }
    }
}

/// Resolve the signer, first match wins:
///
/// 1. `API_SIGNER` names a method: use it with `API_SIGNER_URL`
/// 2. `API_SIGNER_URL` alone: legacy remote signer
/// 3. `API_BROWSER_URL`: legacy browser signer
/// 4. no signer
pub fn resolve(provider: &dyn ConfigProvider) -> SignerConfig {
    let signer_url = provider.get_non_empty(config::API_SIGNER_URL);

    if let Some(raw) = provider.get_non_empty(config::API_SIGNER) {
        match (SignerMethod::parse(&raw), &signer_url) {
            (Some(method), Some(url)) => {
                debug!(method = method.as_str(), "Using configured signer");
                return SignerConfig::new(method, url.clone());
            }
            (Some(method), None) => {
                warn!(
                    method = method.as_str(),
                    "API_SIGNER is set but API_SIGNER_URL is empty, signing disabled"
                );
                return SignerConfig::default();
            }
            (None, _) => {
                warn!(method = %raw, "Unknown signer method, trying legacy settings");
            }
        }
    }

    if let Some(url) = signer_url {
        debug!("Using legacy remote signer");
        return SignerConfig::new(SignerMethod::Remote, url);
    }

    if let Some(url) = provider.get_non_empty(config::API_BROWSER_URL) {
        debug!("Using legacy browser signer");
        return SignerConfig::new(SignerMethod::Browser, url);
    }

    SignerConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapProvider;

    #[test]
    fn test_nothing_configured() {
        let signer = resolve(&MapProvider::new());
        assert_eq!(signer.method, SignerMethod::None);
        assert_eq!(signer.url, "");
        assert!(!signer.close_when_done);
    }

    #[test]
    fn test_legacy_browser_url() {
        let provider = MapProvider::new().with(config::API_BROWSER_URL, "http://x");
        let signer = resolve(&provider);
        assert_eq!(signer.method, SignerMethod::Browser);
        assert_eq!(signer.url, "http://x");
    }

    #[test]
    fn test_legacy_remote_url() {
        let provider = MapProvider::new().with(config::API_SIGNER_URL, "http://y");
        let signer = resolve(&provider);
        assert_eq!(signer.method, SignerMethod::Remote);
        assert_eq!(signer.url, "http://y");
    }

    #[test]
    fn test_legacy_remote_beats_legacy_browser() {
        let provider = MapProvider::new()
            .with(config::API_SIGNER_URL, "http://y")
            .with(config::API_BROWSER_URL, "http://x");
        let signer = resolve(&provider);
        assert_eq!(signer.method, SignerMethod::Remote);
        assert_eq!(signer.url, "http://y");
    }

    #[test]
    fn test_explicit_wins_over_legacy() {
        let provider = MapProvider::new()
            .with(config::API_SIGNER, "remote")
            .with(config::API_SIGNER_URL, "http://y")
            .with(config::API_BROWSER_URL, "http://x");
        let signer = resolve(&provider);
        assert_eq!(signer.method, SignerMethod::Remote);
        assert_eq!(signer.url, "http://y");
    }

    #[test]
    fn test_explicit_browser_uses_signer_url() {
        let provider = MapProvider::new()
            .with(config::API_SIGNER, "browser")
            .with(config::API_SIGNER_URL, "http://y")
            .with(config::API_BROWSER_URL, "http://x");
        let signer = resolve(&provider);
        assert_eq!(signer.method, SignerMethod::Browser);
        assert_eq!(signer.url, "http://y");
    }

    #[test]
    fn test_explicit_without_url_disables_signing() {
        let provider = MapProvider::new()
            .with(config::API_SIGNER, "remote")
            .with(config::API_BROWSER_URL, "http://x");
        assert_eq!(resolve(&provider), SignerConfig::default());
    }

    #[test]
    fn test_unknown_method_falls_back_to_legacy() {
        let provider = MapProvider::new()
            .with(config::API_SIGNER, "quantum")
            .with(config::API_BROWSER_URL, "http://x");
        let signer = resolve(&provider);
        assert_eq!(signer.method, SignerMethod::Browser);
        assert_eq!(signer.url, "http://x");
    }

    #[test]
    fn test_empty_values_are_unset() {
        let provider = MapProvider::new()
            .with(config::API_SIGNER, "")
            .with(config::API_SIGNER_URL, "")
            .with(config::API_BROWSER_URL, "http://x");
        assert_eq!(resolve(&provider).method, SignerMethod::Browser);
    }
}
