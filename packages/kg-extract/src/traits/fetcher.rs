//! Page fetcher trait for pluggable page retrieval.
//!
//! The scraping service is an external collaborator: the pipelines only need
//! "URL in, page text plus metadata out", and must survive any single URL
//! failing.
//!
//! # Usage
//!
//! ```rust,ignore
//! use kg_extract::traits::fetcher::PageFetcher;
//!
//! let page = fetcher.fetch("https://example.com").await?;
//! println!("{} chars", page.text.len());
//! ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::FetchResult;
use crate::types::page::Page;

/// Page fetcher trait.
///
/// Implementations:
/// - `FirecrawlFetcher` - Firecrawl scrape API (markdown output)
/// - `MockFetcher` - For testing
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one URL.
    ///
    /// Missing content, non-2xx responses and client errors are all
    /// reported as a [`FetchError`](crate::error::FetchError); callers
    /// decide whether to skip.
    async fn fetch(&self, url: &str) -> FetchResult<Page>;

    /// Get the fetcher name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for Arc<T> {
    async fn fetch(&self, url: &str) -> FetchResult<Page> {
        (**self).fetch(url).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
