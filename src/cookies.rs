//! Request cookies the front-end cares about.

use std::collections::HashMap;

pub const TEST_ENDPOINTS_COOKIE: &str = "api-test_endpoints";
pub const THEME_COOKIE: &str = "theme";

pub const DEFAULT_THEME: &str = "default";
const THEMES: &[&str] = &[DEFAULT_THEME, "card"];

/// Cookies sent with a request, parsed from the `Cookie` header.
#[derive(Debug, Clone, Default)]
pub struct Cookies {
    values: HashMap<String, String>,
}

impl Cookies {
    /// Parse a `Cookie` header value (`a=1; b=2`).
    ///
    /// Pairs without `=` are ignored; the first occurrence of a name wins.
    pub fn parse(header: &str) -> Self {
        let mut values = HashMap::new();
        for pair in header.split(';') {
            if let Some((name, value)) = pair.split_once('=') {
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                values
                    .entry(name.to_string())
                    .or_insert_with(|| value.trim().trim_matches('"').to_string());
            }
        }
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Builder-style insert
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }

    /// True only when the preference cookie holds exactly `yes`.
    pub fn test_endpoints(&self) -> bool {
        self.get(TEST_ENDPOINTS_COOKIE) == Some("yes")
    }

    /// Selected theme, falling back to the default for unknown values.
    pub fn theme(&self) -> &str {
        match self.get(THEME_COOKIE) {
            Some(theme) if THEMES.contains(&theme) => theme,
            _ => DEFAULT_THEME,
        }
    }
}
