//! Page fetcher implementations.
//!
//! # Available Fetchers
//!
//! - `FirecrawlFetcher` - Firecrawl scrape API (requires `firecrawl` feature)
//! - `MockFetcher` - For testing
//!
//! # Example
//!
//! ```rust,ignore
//! use kg_extract::ingestors::FirecrawlFetcher;
//! use kg_extract::pipeline::crawl_pages;
//!
//! let fetcher = FirecrawlFetcher::from_env()?;
//! let report = crawl_pages(&fetcher, &urls, Duration::from_secs(120)).await;
//! ```

mod mock;

#[cfg(feature = "firecrawl")]
mod firecrawl;

pub use mock::MockFetcher;

#[cfg(feature = "firecrawl")]
pub use firecrawl::{page_from_response, FirecrawlFetcher, ScrapeData, ScrapeResponse};

// Re-export from traits for convenience
pub use crate::traits::fetcher::PageFetcher;
