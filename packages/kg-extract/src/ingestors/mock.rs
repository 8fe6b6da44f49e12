//! Mock fetcher for testing.
//!
//! Provides a configurable mock implementation of the PageFetcher trait.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::PageFetcher;
use crate::types::page::Page;

/// Mock fetcher for testing.
///
/// Returns canned pages by URL. URLs registered with [`MockFetcher::fail_url`]
/// fail with a status error; unknown URLs fail with missing content.
///
/// # Example
///
/// ```rust
/// use kg_extract::ingestors::MockFetcher;
/// use kg_extract::types::page::Page;
///
/// let mock = MockFetcher::new()
///     .with_page(Page::new("https://example.com", "# Hello\n\nWorld"))
///     .fail_url("https://down.example.com");
/// ```
#[derive(Default, Clone)]
pub struct MockFetcher {
    /// Canned pages indexed by URL
    pages: Arc<RwLock<HashMap<String, Page>>>,
    /// URLs that fail
    failing: Arc<RwLock<HashSet<String>>>,
    /// Requested URLs, in call order
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    /// Create a new empty mock fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page that will be returned by fetch.
    pub fn add_page(&self, page: Page) {
        self.pages.write().unwrap().insert(page.url.clone(), page);
    }

    /// Builder form of [`MockFetcher::add_page`].
    pub fn with_page(self, page: Page) -> Self {
        self.add_page(page);
        self
    }

    /// Add multiple pages.
    pub fn with_pages(self, pages: impl IntoIterator<Item = Page>) -> Self {
        for page in pages {
            self.add_page(page);
        }
        self
    }

    /// Make a URL fail.
    pub fn fail_url(self, url: impl Into<String>) -> Self {
        self.failing.write().unwrap().insert(url.into());
        self
    }

    /// Get the URLs that were requested.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<Page> {
        self.calls.write().unwrap().push(url.to_string());

        if self.failing.read().unwrap().contains(url) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: 500,
                body: "mock failure".to_string(),
            });
        }

        self.pages
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::MissingContent {
                url: url.to_string(),
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_fetch() {
        let mock = MockFetcher::new().with_pages(vec![
            Page::new("https://example.com/a", "Page A"),
            Page::new("https://example.com/b", "Page B"),
        ]);

        let page = mock.fetch("https://example.com/b").await.unwrap();
        assert_eq!(page.text, "Page B");

        let missing = mock.fetch("https://example.com/missing").await;
        assert!(matches!(missing, Err(FetchError::MissingContent { .. })));
    }

    #[tokio::test]
    async fn test_mock_failure_and_tracking() {
        let mock = MockFetcher::new().fail_url("https://down.example.com");

        let err = mock.fetch("https://down.example.com").await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500, .. }));

        let clone = mock.clone();
        clone.fetch("https://other.example.com").await.ok();
        assert_eq!(
            mock.calls(),
            vec![
                "https://down.example.com".to_string(),
                "https://other.example.com".to_string(),
            ]
        );
    }
}
