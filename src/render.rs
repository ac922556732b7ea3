//! Description rendering: HTML-escaped text with mention and hashtag links.
//!
//! Annotations come from the scraper as offset ranges over the raw text. They
//! are untrusted: payloads are escaped before they reach a URL, and offsets
//! outside the text are ignored.
//!
//! Known limitations, kept for output compatibility:
//! - Text with any multi-byte character is returned as-is, unescaped and
//!   unlinked, since the upstream offsets cannot be mapped onto it reliably.
//! - Links are inserted by replacing every occurrence of the annotated
//!   substring, so repeated mentions or hashtags are all linked.
//! - Matching happens against the escaped text, so an annotation whose raw
//!   text contains a reserved character (`#it's`) is left unlinked.

use crate::urls::UrlBuilder;
use maud::{html, Markup, PreEscaped, Render};
use serde::Deserialize;

const USER_TYPE: i64 = 0;
const HASHTAG_TYPE: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationKind {
    User,
    Hashtag,
    /// Upstream type code we do not link to anything
    Unknown(i64),
}

impl AnnotationKind {
    pub fn from_code(code: i64) -> Self {
        match code {
            USER_TYPE => Self::User,
            HASHTAG_TYPE => Self::Hashtag,
            other => Self::Unknown(other),
        }
    }
}

/// A mention or hashtag spanning `start..end` of the raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub start: usize,
    pub end: usize,
    /// Username or tag name
    pub payload: String,
}

impl Annotation {
    pub fn user(start: usize, end: usize, username: &str) -> Self {
        Self {
            kind: AnnotationKind::User,
            start,
            end,
            payload: username.to_string(),
        }
    }

    pub fn hashtag(start: usize, end: usize, tag: &str) -> Self {
        Self {
            kind: AnnotationKind::Hashtag,
            start,
            end,
            payload: tag.to_string(),
        }
    }
}

/// Annotation as delivered by the scraping API (`textExtra` entries).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextExtra {
    #[serde(rename = "type")]
    pub kind: i64,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub user_unique_id: Option<String>,
    #[serde(default)]
    pub hashtag_name: Option<String>,
}

impl From<&TextExtra> for Annotation {
    fn from(extra: &TextExtra) -> Self {
        let kind = AnnotationKind::from_code(extra.kind);
        let payload = match kind {
            AnnotationKind::User => extra.user_unique_id.clone(),
            AnnotationKind::Hashtag => extra.hashtag_name.clone(),
            AnnotationKind::Unknown(_) => None,
        };
        Self {
            kind,
            start: extra.start,
            end: extra.end,
            payload: payload.unwrap_or_default(),
        }
    }
}

/// HTML produced by [`render_description`]; embed it without escaping again.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedText(String);

impl RenderedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for RenderedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Render for RenderedText {
    fn render(&self) -> Markup {
        PreEscaped(self.0.clone())
    }
}

/// Escape `&`, `<`, `>`, `"` and `'`.
///
/// Single quotes become `&#039;`, so text containing them is never matched
/// by an annotation spanning the raw quote.
pub fn escape_html(text: &str) -> String {
    html! { (text) }.into_string().replace('\'', "&#039;")
}

/// Render `text` with links for each annotation, in input order.
pub fn render_description(
    text: &str,
    annotations: &[Annotation],
    urls: &UrlBuilder,
) -> RenderedText {
    // Byte length differs from char count exactly when the text is not ASCII
    if !text.is_ascii() {
        return RenderedText(text.to_string());
    }

    let mut out = escape_html(text);
    for annotation in annotations {
        // One byte per char here, so offsets index the text directly
        let Some(needle) = annotation_text(text, annotation) else {
            tracing::debug!(
                start = annotation.start,
                end = annotation.end,
                len = text.len(),
                "Skipping annotation outside the text"
            );
            continue;
        };

        let url = match annotation.kind {
            AnnotationKind::User => urls.user(&escape_html(&annotation.payload)),
            AnnotationKind::Hashtag => urls.tag(&escape_html(&annotation.payload)),
            AnnotationKind::Unknown(_) => String::new(),
        };

        let link = html! { a href=(PreEscaped(&url)) { (PreEscaped(needle)) } }.into_string();
        out = out.replace(needle, &link);
    }

    RenderedText(out)
}

fn annotation_text<'t>(text: &'t str, annotation: &Annotation) -> Option<&'t str> {
    if annotation.start >= annotation.end {
        return None;
    }
    text.get(annotation.start..annotation.end)
}

/// Convenience for upstream `textExtra` lists
pub fn render_text_extras(text: &str, extras: &[TextExtra], urls: &UrlBuilder) -> RenderedText {
    let annotations: Vec<Annotation> = extras.iter().map(Annotation::from).collect();
    render_description(text, &annotations, urls)
}
