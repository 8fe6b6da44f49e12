//! Firecrawl-based page fetcher.
//!
//! Uses the Firecrawl scrape API, which renders JavaScript and returns the
//! page as markdown plus a metadata object.
//!
//! Requires the `firecrawl` feature to be enabled.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::error::{FetchError, FetchResult};
use crate::security::ApiKey;
use crate::traits::fetcher::PageFetcher;
use crate::types::page::Page;

const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev";

/// Firecrawl-based fetcher.
///
/// # Example
///
/// ```rust,ignore
/// use kg_extract::ingestors::FirecrawlFetcher;
///
/// let fetcher = FirecrawlFetcher::from_env()?;
/// let page = fetcher.fetch("https://jasper.ai").await?;
/// ```
pub struct FirecrawlFetcher {
    client: Client,
    api_key: ApiKey,
    base_url: String,
}

#[derive(Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'a str; 1],
}

/// Body of a `/v1/scrape` reply.
///
/// Content and metadata may sit under `data` or at the top level depending
/// on the API version, so every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct ScrapeResponse {
    pub success: Option<bool>,
    pub error: Option<String>,
    pub data: Option<ScrapeData>,
    pub markdown: Option<String>,
    pub content: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScrapeData {
    pub markdown: Option<String>,
    pub content: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

impl FirecrawlFetcher {
    /// Create a new Firecrawl fetcher with the given API key.
    pub fn new(api_key: impl Into<ApiKey>) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: FIRECRAWL_API_URL.to_string(),
        })
    }

    /// Create from environment variable `FIRECRAWL_API_KEY`.
    pub fn from_env() -> FetchResult<Self> {
        let api_key = ApiKey::from_env("FIRECRAWL_API_KEY").ok_or_else(|| {
            FetchError::Config("FIRECRAWL_API_KEY environment variable not set".to_string())
        })?;
        Self::new(api_key)
    }

    /// Point at a different API host (self-hosted Firecrawl, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn scrape(&self, url: &str) -> FetchResult<ScrapeResponse> {
        let endpoint = format!("{}/v1/scrape", self.base_url);
        let response = self
            .client
            .post(&endpoint)
            .header("Authorization", self.api_key.bearer())
            .json(&ScrapeRequest {
                url,
                formats: ["markdown"],
            })
            .send()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::Http(Box::new(e)))
    }
}

/// Turn a scrape response body into a page.
///
/// Content is read from `data.markdown`, then top-level `markdown`, then
/// `content`; metadata from `data.metadata` or `metadata`.
pub fn page_from_response(url: &str, body: ScrapeResponse) -> FetchResult<Page> {
    if body.success == Some(false) {
        return Err(FetchError::Unsuccessful {
            url: url.to_string(),
            reason: body.error.unwrap_or_else(|| "no reason given".to_string()),
        });
    }

    let data = body.data.unwrap_or_default();
    let text = [data.markdown, body.markdown, body.content, data.content]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .ok_or_else(|| FetchError::MissingContent {
            url: url.to_string(),
        })?;

    let metadata = data.metadata.or(body.metadata).unwrap_or_default();

    Ok(Page::new(url, text)
        .with_metadata_map(metadata)
        .with_fetched_at(Utc::now()))
}

#[async_trait]
impl PageFetcher for FirecrawlFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<Page> {
        tracing::debug!(url, "Scraping with Firecrawl");
        let body = self.scrape(url).await?;
        page_from_response(url, body)
    }

    fn name(&self) -> &str {
        "firecrawl"
    }
}
