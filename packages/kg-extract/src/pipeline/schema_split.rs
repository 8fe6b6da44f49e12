//! Schema/instance split: one shared schema, then per-page instance data.
//!
//! Instance calls depend only on the schema, never on each other, so they
//! run concurrently up to `PipelineConfig::concurrency`. Results are kept in
//! input order.

use std::time::Instant;

use futures::future::join_all;
use indexmap::IndexMap;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::error::{ExtractionError, Result, ServiceError, ServiceResult};
use crate::pipeline::merge::record_failure;
use crate::pipeline::prompts::{EXTRACT_COMMON_SCHEMA, EXTRACT_INSTANCES};
use crate::traits::completion::{CompletionRequest, CompletionService};
use crate::types::config::PipelineConfig;
use crate::types::fragment::Fragment;
use crate::types::page::{Page, SkippedPage};

/// Separator between page blocks sent to the schema call.
pub const PAGE_SEPARATOR: &str = "\n\n---PAGE---\n\n";

/// Output of a schema/instance run.
#[derive(Debug, Clone)]
pub struct SchemaInstanceResult {
    pub schema: Fragment,

    /// Instance data by page URL, in input order
    pub instances: IndexMap<String, Fragment>,

    /// Pages whose instance call failed
    pub skipped: Vec<SkippedPage>,
}

impl SchemaInstanceResult {
    pub fn pages_processed(&self) -> usize {
        self.instances.len()
    }
}

/// Two-phase schema/instance extractor.
pub struct SchemaInstancePipeline<A> {
    service: A,
    config: PipelineConfig,
}

impl<A: CompletionService> SchemaInstancePipeline<A> {
    pub fn new(service: A, config: PipelineConfig) -> Self {
        Self { service, config }
    }

    /// Page excerpts as shown to the schema call.
    pub fn pages_content(&self, pages: &[Page]) -> String {
        pages
            .iter()
            .map(|p| {
                format!(
                    "URL: {}\nContent: {}...",
                    p.url,
                    p.excerpt(self.config.schema_excerpt_chars)
                )
            })
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR)
    }

    /// Phase 1: infer the schema shared by all pages.
    pub async fn extract_schema(&self, domain: &str, pages: &[Page]) -> ServiceResult<Fragment> {
        let request = CompletionRequest::new(&EXTRACT_COMMON_SCHEMA)
            .input("domain", domain)
            .input("pages_content", self.pages_content(pages));

        let mut response = self
            .service
            .complete_within(&request, self.config.call_timeout)
            .await?;
        Ok(Fragment::new(response.take(&EXTRACT_COMMON_SCHEMA, "schema_rdf")?))
    }

    /// Phase 2, one page: instance data following `schema`.
    pub async fn extract_instances(
        &self,
        schema: &Fragment,
        domain: &str,
        page: &Page,
    ) -> ServiceResult<Fragment> {
        let request = CompletionRequest::new(&EXTRACT_INSTANCES)
            .input("schema_rdf", schema.as_str())
            .input("domain", domain)
            .input("page_content", page.text.as_str())
            .input("page_url", page.url.as_str());

        let mut response = self
            .service
            .complete_within(&request, self.config.call_timeout)
            .await?;
        Ok(Fragment::new(response.take(&EXTRACT_INSTANCES, "instance_rdf")?))
    }

    /// Run both phases.
    ///
    /// A failed schema call ends the run. A failed instance call is handled
    /// per the configured failure policy.
    pub async fn run(&self, domain: &str, pages: &[Page]) -> Result<SchemaInstanceResult> {
        if pages.is_empty() {
            return Err(ExtractionError::NoPages);
        }

        let start = Instant::now();
        info!(domain, pages = pages.len(), "Extracting common schema");
        let schema = self.extract_schema(domain, pages).await?;

        info!(
            domain,
            concurrency = self.config.concurrency,
            "Extracting instance data"
        );
        let semaphore = Semaphore::new(self.config.concurrency.max(1));
        let calls = pages.iter().map(|page| {
            let semaphore = &semaphore;
            let schema = &schema;
            async move {
                let outcome = match semaphore.acquire().await {
                    Ok(_permit) => self.extract_instances(schema, domain, page).await,
                    Err(_) => Err(ServiceError::Config(
                        "instance extraction cancelled".to_string(),
                    )),
                };
                debug!(url = %page.url, ok = outcome.is_ok(), "Instance call finished");
                (page, outcome)
            }
        });
        let results = join_all(calls).await;

        let mut instances = IndexMap::with_capacity(pages.len());
        let mut skipped = Vec::new();
        for (page, outcome) in results {
            match outcome {
                Ok(fragment) => {
                    instances.insert(page.url.clone(), fragment);
                }
                Err(e) => record_failure(self.config.failure_policy, &mut skipped, &page.url, e)?,
            }
        }

        info!(
            domain,
            instances = instances.len(),
            skipped = skipped.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Schema/instance extraction complete"
        );

        Ok(SchemaInstanceResult {
            schema,
            instances,
            skipped,
        })
    }
}
