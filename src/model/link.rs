use serde::{Deserialize, Serialize};
use url::Url;

/// A hyperlink found on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Absolute URL the link points to
    pub url: Url,

    /// Visible anchor text, whitespace-collapsed
    pub text: String,

    /// The `rel` attribute, if present
    pub rel: Option<String>,

    /// The `title` attribute, if present
    pub title: Option<String>,
}

impl Link {
    /// Creates a link with no anchor text or attributes
    pub fn new(url: Url) -> Self {
        Self {
            url,
            text: String::new(),
            rel: None,
            title: None,
        }
    }

    /// Sets the anchor text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Sets the `rel` attribute
    pub fn with_rel(mut self, rel: impl Into<String>) -> Self {
        self.rel = Some(rel.into());
        self
    }

    /// Sets the `title` attribute
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}
