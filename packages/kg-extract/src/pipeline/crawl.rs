//! Fetch a list of URLs, skipping the ones that fail.

use std::time::Duration;

use tracing::{info, warn};
use url::Url;

use crate::error::FetchError;
use crate::traits::fetcher::PageFetcher;
use crate::types::page::{Page, SkippedPage};

/// Pages fetched from a URL list.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// Successfully fetched pages, in input order
    pub pages: Vec<Page>,

    /// URLs that could not be fetched
    pub failures: Vec<SkippedPage>,
}

impl CrawlReport {
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Fetch each URL in turn.
///
/// Errors, timeouts and pages without content are logged and skipped; one
/// bad URL never stops the rest.
pub async fn crawl_pages<F: PageFetcher + ?Sized>(
    fetcher: &F,
    urls: &[String],
    timeout: Duration,
) -> CrawlReport {
    let mut report = CrawlReport::default();

    for url in urls {
        info!(url = %url, fetcher = fetcher.name(), "Crawling");

        let outcome = match validate_url(url) {
            Err(e) => Err(e),
            Ok(()) => match tokio::time::timeout(timeout, fetcher.fetch(url)).await {
                Ok(Ok(page)) if page.has_content() => Ok(page),
                Ok(Ok(_)) => Err(FetchError::MissingContent { url: url.clone() }),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(FetchError::Timeout { url: url.clone() }),
            },
        };

        match outcome {
            Ok(page) => {
                info!(url = %url, chars = page.text.len(), "Crawled");
                report.pages.push(page);
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Skipping URL");
                report.failures.push(SkippedPage::new(url.as_str(), &e));
            }
        }
    }

    info!(
        fetched = report.pages.len(),
        failed = report.failures.len(),
        "Crawl complete"
    );
    report
}

/// Only absolute http(s) URLs are sent to the fetcher.
fn validate_url(raw: &str) -> Result<(), FetchError> {
    let invalid = |message: String| FetchError::InvalidUrl {
        url: raw.to_string(),
        message,
    };

    let parsed = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme `{}`", other))),
    }
}
