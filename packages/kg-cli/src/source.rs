//! Where a pipeline's pages come from: crawled URLs or an offline JSON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use kg_extract::{crawl_pages, Page, PageFetcher};
use tracing::{info, warn};

use crate::config::Config;

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct PageSource {
    /// URL to crawl (repeatable)
    #[arg(long = "url", value_name = "URL")]
    pub urls: Vec<String>,

    /// File with one URL per line (blank lines and `#` comments ignored)
    #[arg(long, value_name = "FILE")]
    pub urls_file: Option<PathBuf>,

    /// JSON file of pre-fetched pages: `[{"url", "text", "metadata"}]`
    #[arg(long, value_name = "FILE")]
    pub pages_file: Option<PathBuf>,
}

impl PageSource {
    /// Load pages, crawling through the configured fetcher when needed.
    pub async fn load(&self, config: &Config) -> Result<Vec<Page>> {
        if let Some(path) = &self.pages_file {
            return read_pages_file(path);
        }

        let urls = match &self.urls_file {
            Some(path) => read_urls_file(path)?,
            None => self.urls.clone(),
        };

        let fetcher = config.fetcher()?;
        fetch(&fetcher, &urls, config.call_timeout).await
    }
}

/// Crawl `urls`, failing only when nothing could be fetched.
pub async fn fetch<F: PageFetcher + ?Sized>(
    fetcher: &F,
    urls: &[String],
    timeout: Duration,
) -> Result<Vec<Page>> {
    if urls.is_empty() {
        bail!("No URLs given");
    }

    let report = crawl_pages(fetcher, urls, timeout).await;
    if report.is_empty() {
        bail!("No pages fetched ({} URLs failed)", report.failures.len());
    }
    Ok(report.pages)
}

fn read_urls_file(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL list {}", path.display()))?;
    Ok(parse_url_list(&text))
}

pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn read_pages_file(path: &Path) -> Result<Vec<Page>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read pages file {}", path.display()))?;
    let pages: Vec<Page> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid pages file {}", path.display()))?;

    let (pages, blank): (Vec<Page>, Vec<Page>) = pages.into_iter().partition(Page::has_content);
    for page in &blank {
        warn!(url = %page.url, "Skipping page without content");
    }
    if pages.is_empty() {
        bail!("No pages with content in {}", path.display());
    }

    info!(pages = pages.len(), path = %path.display(), "Loaded pages");
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_extract::testing::MockFetcher;
    use std::io::Write;

    #[test]
    fn test_parse_url_list() {
        let urls = parse_url_list("https://jasper.ai\n\n  # competitors\n  https://copy.ai  \n");
        assert_eq!(urls, vec!["https://jasper.ai", "https://copy.ai"]);
    }

    #[test]
    fn test_read_pages_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"url": "https://jasper.ai", "text": "Jasper writes copy.", "metadata": {{"title": "Jasper"}}}},
                {{"url": "https://empty.example", "text": "  "}}
            ]"#
        )
        .unwrap();

        let pages = read_pages_file(file.path()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title(), Some("Jasper"));
    }

    #[test]
    fn test_read_pages_file_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = read_pages_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid pages file"));
    }

    #[tokio::test]
    async fn test_fetch_fails_when_nothing_fetched() {
        let fetcher = MockFetcher::new().fail_url("https://jasper.ai");
        let urls = vec!["https://jasper.ai".to_string()];

        let err = fetch(&fetcher, &urls, Duration::from_secs(1)).await.unwrap_err();
        assert!(err.to_string().contains("No pages fetched"));
    }

    #[tokio::test]
    async fn test_fetch_keeps_successful_pages() {
        let fetcher = MockFetcher::new()
            .with_page(Page::new("https://copy.ai", "Copy.ai"))
            .fail_url("https://jasper.ai");
        let urls = vec!["https://jasper.ai".to_string(), "https://copy.ai".to_string()];

        let pages = fetch(&fetcher, &urls, Duration::from_secs(1)).await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].url, "https://copy.ai");
    }
}
