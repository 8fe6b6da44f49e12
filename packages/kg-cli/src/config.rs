use anyhow::{Context, Result};
use dotenvy::dotenv;
use kg_extract::ai::OpenAiCompletion;
use kg_extract::ingestors::FirecrawlFetcher;
use kg_extract::security::ApiKey;
use kg_extract::{FailurePolicy, PipelineConfig};
use std::env;
use std::time::Duration;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<ApiKey>,
    pub openai_base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub firecrawl_api_key: Option<ApiKey>,
    pub firecrawl_base_url: Option<String>,
    pub call_timeout: Duration,
    pub concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            openai_api_key: non_blank("OPENAI_API_KEY").map(ApiKey::new),
            openai_base_url: non_blank("OPENAI_BASE_URL"),
            model: non_blank("KG_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            temperature: non_blank("KG_TEMPERATURE")
                .unwrap_or_else(|| "0".to_string())
                .parse()
                .context("KG_TEMPERATURE must be a number")?,
            firecrawl_api_key: non_blank("FIRECRAWL_API_KEY").map(ApiKey::new),
            firecrawl_base_url: non_blank("FIRECRAWL_BASE_URL"),
            call_timeout: Duration::from_secs(
                non_blank("KG_CALL_TIMEOUT_SECS")
                    .unwrap_or_else(|| "120".to_string())
                    .parse()
                    .context("KG_CALL_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            concurrency: non_blank("KG_CONCURRENCY")
                .unwrap_or_else(|| "4".to_string())
                .parse()
                .context("KG_CONCURRENCY must be a valid number")?,
        })
    }

    /// Completion service for the configured model.
    pub fn completion(&self) -> Result<OpenAiCompletion> {
        let key = self
            .openai_api_key
            .clone()
            .context("OPENAI_API_KEY must be set")?;

        let mut ai = OpenAiCompletion::new(key)
            .with_model(&self.model)
            .with_temperature(self.temperature);
        if let Some(base_url) = &self.openai_base_url {
            ai = ai.with_base_url(base_url);
        }
        Ok(ai)
    }

    /// Page fetcher for crawling URLs.
    pub fn fetcher(&self) -> Result<FirecrawlFetcher> {
        let key = self
            .firecrawl_api_key
            .clone()
            .context("FIRECRAWL_API_KEY must be set")?;

        let mut fetcher = FirecrawlFetcher::new(key).context("Failed to build Firecrawl client")?;
        if let Some(base_url) = &self.firecrawl_base_url {
            fetcher = fetcher.with_base_url(base_url);
        }
        Ok(fetcher)
    }

    /// Pipeline settings, with command-line overrides applied.
    pub fn pipeline(&self, fail_fast: bool, concurrency: Option<usize>) -> PipelineConfig {
        let policy = if fail_fast {
            FailurePolicy::Abort
        } else {
            FailurePolicy::SkipPage
        };

        PipelineConfig::default()
            .with_call_timeout(self.call_timeout)
            .with_failure_policy(policy)
            .with_concurrency(concurrency.unwrap_or(self.concurrency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.call_timeout, Duration::from_secs(120));
        assert_eq!(config.concurrency, 4);
        assert!(config.completion().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("KG_MODEL", "gpt-4o"),
            ("KG_TEMPERATURE", "0.7"),
            ("KG_CALL_TIMEOUT_SECS", "30"),
            ("KG_CONCURRENCY", "8"),
            ("FIRECRAWL_API_KEY", "  "),
        ]))
        .unwrap();

        let ai = config.completion().unwrap();
        assert_eq!(ai.model(), "gpt-4o");
        assert_eq!(ai.temperature(), 0.7);
        assert!(config.firecrawl_api_key.is_none());

        let pipeline = config.pipeline(true, Some(2));
        assert_eq!(pipeline.call_timeout, Duration::from_secs(30));
        assert_eq!(pipeline.failure_policy, FailurePolicy::Abort);
        assert_eq!(pipeline.concurrency, 2);
        assert_eq!(config.pipeline(false, None).concurrency, 8);
    }

    #[test]
    fn test_invalid_number() {
        let err = Config::from_lookup(lookup(&[("KG_CONCURRENCY", "many")])).unwrap_err();
        assert!(err.to_string().contains("KG_CONCURRENCY"));
    }

    #[test]
    fn test_invalid_temperature() {
        let err = Config::from_lookup(lookup(&[("KG_TEMPERATURE", "warm")])).unwrap_err();
        assert!(err.to_string().contains("KG_TEMPERATURE"));
    }

    #[test]
    fn test_key_redacted_in_debug() {
        let config = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-secret")])).unwrap();
        assert!(!format!("{:?}", config).contains("sk-secret"));
    }
}
