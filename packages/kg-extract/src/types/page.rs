//! Page type - fetched page text with metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A fetched page.
///
/// Created once by a fetcher (or loaded from a pages file) and consumed
/// read-only by the extraction calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Source URL of the page
    pub url: String,

    /// Page text (usually markdown)
    pub text: String,

    /// Source-specific metadata (title, description, status code, ...)
    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// When the page was fetched
    #[serde(default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
}

impl Page {
    /// Create a new page with no metadata.
    pub fn new(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text: text.into(),
            metadata: Map::new(),
            fetched_at: Utc::now(),
        }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replace all metadata.
    pub fn with_metadata_map(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the fetched timestamp.
    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }

    /// Page title from metadata, if the fetcher reported one.
    pub fn title(&self) -> Option<&str> {
        self.metadata.get("title").and_then(Value::as_str)
    }

    /// Check if this page has content.
    pub fn has_content(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Text followed by a `Page metadata:` line when metadata is present.
    pub fn text_with_metadata(&self) -> String {
        if self.metadata.is_empty() {
            return self.text.clone();
        }

        let metadata = Value::Object(self.metadata.clone());
        format!("{}\nPage metadata: {}", self.text, metadata)
    }

    /// The first `max_chars` characters of the text.
    pub fn excerpt(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.text[..idx],
            None => &self.text,
        }
    }
}

/// A page a pipeline gave up on, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedPage {
    pub url: String,
    pub reason: String,
}

impl SkippedPage {
    pub fn new(url: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
