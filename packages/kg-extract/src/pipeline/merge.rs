//! Incremental merge loop: fold per-page graphs into one canonical graph.
//!
//! Each merge call conditions on everything merged so far, so pages are
//! processed strictly in input order and never concurrently. The canonical
//! graph is replaced wholesale by each merge output.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{ExtractionError, GraphError, Result, ServiceError, ServiceResult};
use crate::graph::{GraphFormat, RdfGraph};
use crate::pipeline::prompts::{EXTRACT_PAGE_RDF, INCREMENTAL_MERGE, INFER_SCHEMA, SIMPLE_MERGE};
use crate::traits::completion::{CompletionRequest, CompletionService};
use crate::types::config::{FailurePolicy, PipelineConfig};
use crate::types::fragment::Fragment;
use crate::types::page::{Page, SkippedPage};

/// Separator between sample page graphs sent to schema inference.
pub const SAMPLE_SEPARATOR: &str = "\n---\n";

/// Where the merge loop is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeState {
    /// Nothing merged yet; canonical graph is empty
    Idle,

    /// Canonical graph seeded with an inferred schema
    SchemaInferred { schema: Fragment },

    /// At least one page merged
    Merging { merged: Fragment, pages_processed: usize },

    /// All pages handled
    Done { canonical: Fragment, pages_processed: usize },
}

impl MergeState {
    /// The canonical graph as of this state.
    pub fn canonical(&self) -> Fragment {
        match self {
            MergeState::Idle => Fragment::empty(),
            MergeState::SchemaInferred { schema } => schema.clone(),
            MergeState::Merging { merged, .. } => merged.clone(),
            MergeState::Done { canonical, .. } => canonical.clone(),
        }
    }

    /// Pages merged so far.
    pub fn pages_processed(&self) -> usize {
        match self {
            MergeState::Merging { pages_processed, .. } | MergeState::Done { pages_processed, .. } => {
                *pages_processed
            }
            _ => 0,
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            MergeState::Idle => "idle",
            MergeState::SchemaInferred { .. } => "schema_inferred",
            MergeState::Merging { .. } => "merging",
            MergeState::Done { .. } => "done",
        }
    }

    /// Replace the canonical graph with a merge output.
    fn merged(self, merged: Fragment) -> Self {
        let pages_processed = self.pages_processed() + 1;
        MergeState::Merging {
            merged,
            pages_processed,
        }
    }

    fn finish(self) -> Self {
        let pages_processed = self.pages_processed();
        MergeState::Done {
            canonical: self.canonical(),
            pages_processed,
        }
    }
}

/// Result of a merge run.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Final canonical graph, verbatim from the last successful merge
    pub canonical: Fragment,

    /// Pages successfully merged
    pub pages_processed: usize,

    /// Pages dropped under [`FailurePolicy::SkipPage`]
    pub skipped: Vec<SkippedPage>,
}

/// Extract the graph for one page.
///
/// The page text is sent with its metadata appended.
pub async fn extract_page_rdf<A: CompletionService + ?Sized>(
    service: &A,
    domain: &str,
    page: &Page,
    config: &PipelineConfig,
) -> ServiceResult<Fragment> {
    let request = CompletionRequest::new(&EXTRACT_PAGE_RDF)
        .input("domain", domain)
        .input("text", page.text_with_metadata())
        .input("url", page.url.as_str());

    let mut response = service.complete_within(&request, config.call_timeout).await?;
    Ok(Fragment::new(response.take(&EXTRACT_PAGE_RDF, "rdf")?))
}

/// Schema-seeded incremental merger.
pub struct IncrementalMerger<A> {
    service: A,
    config: PipelineConfig,
}

impl<A: CompletionService> IncrementalMerger<A> {
    pub fn new(service: A, config: PipelineConfig) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build one canonical graph from `pages`, in order.
    ///
    /// With more than `schema_threshold` pages the first
    /// `schema_sample_size` page graphs seed the canonical graph through a
    /// schema inference call. Sample graphs are reused for the fold rather
    /// than extracted a second time.
    pub async fn build(&self, domain: &str, pages: &[Page]) -> Result<MergeOutcome> {
        if pages.is_empty() {
            return Err(ExtractionError::NoPages);
        }

        let start = Instant::now();
        let mut skipped = Vec::new();
        let mut extracted: Vec<Option<Fragment>> = vec![None; pages.len()];
        let mut failed = vec![false; pages.len()];
        let mut state = MergeState::Idle;

        if pages.len() > self.config.schema_threshold {
            let sample_size = self.config.schema_sample_size.min(pages.len());
            info!(domain, sample_size, "Inferring schema from sample pages");

            let mut samples = Vec::with_capacity(sample_size);
            for (idx, page) in pages.iter().take(sample_size).enumerate() {
                match extract_page_rdf(&self.service, domain, page, &self.config).await {
                    Ok(fragment) => {
                        samples.push(fragment.as_str().to_string());
                        extracted[idx] = Some(fragment);
                    }
                    Err(e) => {
                        self.on_failure(&mut skipped, &page.url, e)?;
                        failed[idx] = true;
                    }
                }
            }

            if samples.is_empty() {
                warn!(domain, "No sample page extracted, starting from an empty graph");
            } else {
                match self.infer_schema(domain, &samples.join(SAMPLE_SEPARATOR)).await {
                    Ok(schema) => state = MergeState::SchemaInferred { schema },
                    Err(e) => {
                        if self.config.failure_policy == FailurePolicy::Abort {
                            return Err(e.into());
                        }
                        warn!(domain, error = %e, "Schema inference failed, starting from an empty graph");
                    }
                }
            }
            debug!(state = state.label(), "Merge state");
        }

        for (idx, page) in pages.iter().enumerate() {
            if failed[idx] {
                continue;
            }

            let fragment = match extracted[idx].take() {
                Some(fragment) => fragment,
                None => match extract_page_rdf(&self.service, domain, page, &self.config).await {
                    Ok(fragment) => fragment,
                    Err(e) => {
                        self.on_failure(&mut skipped, &page.url, e)?;
                        continue;
                    }
                },
            };

            match self.merge(&state.canonical(), &fragment, &page.url, domain).await {
                Ok(merged) => {
                    state = state.merged(merged);
                    debug!(
                        url = %page.url,
                        pages_processed = state.pages_processed(),
                        state = state.label(),
                        "Merged page"
                    );
                }
                Err(e) => self.on_failure(&mut skipped, &page.url, e)?,
            }
        }

        let state = state.finish();
        info!(
            domain,
            pages_processed = state.pages_processed(),
            skipped = skipped.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Incremental merge complete"
        );

        Ok(MergeOutcome {
            canonical: state.canonical(),
            pages_processed: state.pages_processed(),
            skipped,
        })
    }

    async fn infer_schema(&self, domain: &str, sample_pages: &str) -> ServiceResult<Fragment> {
        let request = CompletionRequest::new(&INFER_SCHEMA)
            .input("domain", domain)
            .input("sample_pages", sample_pages);

        let mut response = self
            .service
            .complete_within(&request, self.config.call_timeout)
            .await?;
        Ok(Fragment::new(response.take(&INFER_SCHEMA, "schema_rdf")?))
    }

    async fn merge(
        &self,
        canonical: &Fragment,
        new_page: &Fragment,
        source_url: &str,
        domain: &str,
    ) -> ServiceResult<Fragment> {
        let request = CompletionRequest::new(&INCREMENTAL_MERGE)
            .input("canonical_rdf", canonical.as_str())
            .input("new_page_rdf", new_page.as_str())
            .input("source_url", source_url)
            .input("domain", domain);

        let mut response = self
            .service
            .complete_within(&request, self.config.call_timeout)
            .await?;
        Ok(Fragment::new(response.take(&INCREMENTAL_MERGE, "merged_rdf")?))
    }

    fn on_failure(&self, skipped: &mut Vec<SkippedPage>, url: &str, error: ServiceError) -> Result<()> {
        record_failure(self.config.failure_policy, skipped, url, error)
    }
}

/// Apply the failure policy to one failed page.
pub(crate) fn record_failure(
    policy: FailurePolicy,
    skipped: &mut Vec<SkippedPage>,
    url: &str,
    error: ServiceError,
) -> Result<()> {
    match policy {
        FailurePolicy::Abort => Err(error.into()),
        FailurePolicy::SkipPage => {
            warn!(url, error = %error, "Skipping page");
            if !skipped.iter().any(|s| s.url == url) {
                skipped.push(SkippedPage::new(url, &error));
            }
            Ok(())
        }
    }
}

/// Merge loop without a schema step.
///
/// While the accumulated graph is empty, the next page's graph replaces it
/// as-is; every later page is merged into it.
pub struct SimpleAccumulator<A> {
    service: A,
    config: PipelineConfig,
}

impl<A: CompletionService> SimpleAccumulator<A> {
    pub fn new(service: A, config: PipelineConfig) -> Self {
        Self { service, config }
    }

    pub async fn build(&self, domain: &str, pages: &[Page]) -> Result<MergeOutcome> {
        if pages.is_empty() {
            return Err(ExtractionError::NoPages);
        }

        let mut skipped = Vec::new();
        let mut state = MergeState::Idle;

        for page in pages {
            let extracted = match extract_page_rdf(&self.service, domain, page, &self.config).await {
                Ok(fragment) => fragment,
                Err(e) => {
                    record_failure(self.config.failure_policy, &mut skipped, &page.url, e)?;
                    continue;
                }
            };

            if state.canonical().is_empty() {
                state = state.merged(extracted);
                continue;
            }

            match self.merge(&state.canonical(), &extracted, domain).await {
                Ok(merged) => state = state.merged(merged),
                Err(e) => record_failure(self.config.failure_policy, &mut skipped, &page.url, e)?,
            }
        }

        let state = state.finish();
        info!(
            domain,
            pages_processed = state.pages_processed(),
            skipped = skipped.len(),
            "Simple accumulation complete"
        );

        Ok(MergeOutcome {
            canonical: state.canonical(),
            pages_processed: state.pages_processed(),
            skipped,
        })
    }

    async fn merge(&self, current: &Fragment, new: &Fragment, domain: &str) -> ServiceResult<Fragment> {
        let request = CompletionRequest::new(&SIMPLE_MERGE)
            .input("current_graph", current.as_str())
            .input("new_content", new.as_str())
            .input("domain", domain);

        let mut response = self
            .service
            .complete_within(&request, self.config.call_timeout)
            .await?;
        Ok(Fragment::new(response.take(&SIMPLE_MERGE, "merged_graph")?))
    }
}

/// Triple count of the canonical graph, or why it could not be counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphStats {
    Parsed {
        total_triples: usize,
        pages_processed: usize,
    },
    Unparsed {
        error: GraphError,
        pages_processed: usize,
    },
}

/// A validated landscape graph, ready to print.
#[derive(Debug, Clone)]
pub struct LandscapeGraph {
    /// Canonical graph in the requested format (raw Turtle if it did not parse)
    pub canonical_graph: String,
    pub stats: GraphStats,
    pub skipped: Vec<SkippedPage>,
}

impl LandscapeGraph {
    /// Validate a merge outcome and convert it to `format`.
    ///
    /// The canonical graph is expected in Turtle. When it does not parse the
    /// raw text is kept and the parse error is reported in the stats.
    pub fn from_outcome(outcome: MergeOutcome, format: GraphFormat) -> Self {
        let raw = outcome.canonical.into_string();
        let pages_processed = outcome.pages_processed;

        let parsed = RdfGraph::parse(&raw, GraphFormat::Turtle).and_then(|graph| {
            let text = if format == GraphFormat::Turtle {
                raw.clone()
            } else {
                graph.serialize(format)?
            };
            Ok((text, graph.len()))
        });

        let (canonical_graph, stats) = match parsed {
            Ok((text, total_triples)) => (
                text,
                GraphStats::Parsed {
                    total_triples,
                    pages_processed,
                },
            ),
            Err(error) => (
                raw,
                GraphStats::Unparsed {
                    error,
                    pages_processed,
                },
            ),
        };

        Self {
            canonical_graph,
            stats,
            skipped: outcome.skipped,
        }
    }
}

/// Run the incremental merger and validate its output.
pub async fn build_landscape_graph<A: CompletionService>(
    merger: &IncrementalMerger<A>,
    domain: &str,
    pages: &[Page],
    format: GraphFormat,
) -> Result<LandscapeGraph> {
    let outcome = merger.build(domain, pages).await?;
    Ok(LandscapeGraph::from_outcome(outcome, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{union_lines, MockCompletion};

    fn pages(n: usize) -> Vec<Page> {
        (1..=n)
            .map(|i| Page::new(format!("https://site{}.example", i), format!("text {}", i)))
            .collect()
    }

    fn folding_mock() -> MockCompletion {
        MockCompletion::new()
            .with_output_fn("ExtractPageRdf", "rdf", |req| {
                format!("page {}", req.get("url").unwrap_or_default())
            })
            .with_fixed("InitialSchemaInference", "schema_rdf", "schema")
            .with_output_fn("IncrementalRdfMerge", "merged_rdf", |req| {
                union_lines(
                    req.get("canonical_rdf").unwrap_or_default(),
                    req.get("new_page_rdf").unwrap_or_default(),
                )
            })
    }

    #[test]
    fn test_state_transitions() {
        let state = MergeState::Idle;
        assert_eq!(state.canonical(), Fragment::empty());

        let state = state.merged(Fragment::new("a"));
        assert_eq!(state.label(), "merging");
        let state = state.merged(Fragment::new("b")).finish();

        assert_eq!(
            state,
            MergeState::Done {
                canonical: Fragment::new("b"),
                pages_processed: 2
            }
        );
    }

    #[tokio::test]
    async fn test_small_run_skips_schema() {
        let ai = folding_mock();
        let merger = IncrementalMerger::new(ai.clone(), PipelineConfig::default());

        let outcome = merger.build("Tools", &pages(3)).await.unwrap();

        assert!(ai.calls_for("InitialSchemaInference").is_empty());
        assert_eq!(outcome.pages_processed, 3);
        assert_eq!(ai.calls_for("IncrementalRdfMerge")[0].input("canonical_rdf"), Some(""));
        assert_eq!(
            outcome.canonical.as_str(),
            "page https://site1.example\npage https://site2.example\npage https://site3.example"
        );
    }

    #[tokio::test]
    async fn test_large_run_seeds_schema() {
        let ai = folding_mock();
        let merger = IncrementalMerger::new(ai.clone(), PipelineConfig::default());

        let outcome = merger.build("Tools", &pages(4)).await.unwrap();

        let schema_calls = ai.calls_for("InitialSchemaInference");
        assert_eq!(schema_calls.len(), 1);
        assert_eq!(
            schema_calls[0].input("sample_pages"),
            Some("page https://site1.example\n---\npage https://site2.example\n---\npage https://site3.example")
        );
        assert_eq!(ai.calls_for("IncrementalRdfMerge")[0].input("canonical_rdf"), Some("schema"));
        // sample graphs are reused, so each page is extracted once
        assert_eq!(ai.calls_for("ExtractPageRdf").len(), 4);
        assert_eq!(outcome.pages_processed, 4);
        assert!(outcome.canonical.as_str().starts_with("schema\n"));
    }

    #[tokio::test]
    async fn test_metadata_sent_with_text() {
        let ai = folding_mock();
        let merger = IncrementalMerger::new(ai.clone(), PipelineConfig::default());
        let page = Page::new("https://jasper.ai", "Jasper").with_metadata("title", "Jasper AI");

        merger.build("Tools", &[page]).await.unwrap();

        let text = ai.calls_for("ExtractPageRdf")[0].input("text").unwrap().to_string();
        assert_eq!(text, "Jasper\nPage metadata: {\"title\":\"Jasper AI\"}");
    }

    #[tokio::test]
    async fn test_skip_policy_keeps_canonical() {
        let ai = folding_mock().failing_when("IncrementalRdfMerge", "source_url", "https://site2.example");
        let merger = IncrementalMerger::new(ai, PipelineConfig::default());

        let outcome = merger.build("Tools", &pages(3)).await.unwrap();

        assert_eq!(outcome.pages_processed, 2);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].url, "https://site2.example");
        assert_eq!(
            outcome.canonical.as_str(),
            "page https://site1.example\npage https://site3.example"
        );
    }

    #[tokio::test]
    async fn test_abort_policy_stops_run() {
        let ai = folding_mock().failing_when("ExtractPageRdf", "url", "https://site2.example");
        let merger = IncrementalMerger::new(ai.clone(), PipelineConfig::default().fail_fast());

        let err = merger.build("Tools", &pages(3)).await.unwrap_err();

        assert!(matches!(err, ExtractionError::Service(ServiceError::Api { .. })));
        assert_eq!(ai.calls_for("IncrementalRdfMerge").len(), 1);
    }

    #[tokio::test]
    async fn test_failed_sample_page_not_retried() {
        let ai = folding_mock().failing_when("ExtractPageRdf", "url", "https://site1.example");
        let merger = IncrementalMerger::new(ai.clone(), PipelineConfig::default());

        let outcome = merger.build("Tools", &pages(4)).await.unwrap();

        assert_eq!(ai.calls_for("ExtractPageRdf").len(), 4);
        assert_eq!(outcome.pages_processed, 3);
        assert_eq!(outcome.skipped.len(), 1);
    }

    #[tokio::test]
    async fn test_no_schema_call_without_samples() {
        let ai = folding_mock()
            .failing_when("ExtractPageRdf", "url", "https://site1.example")
            .failing_when("ExtractPageRdf", "url", "https://site2.example");
        let config = PipelineConfig::default().with_schema_sample_size(2);
        let merger = IncrementalMerger::new(ai.clone(), config);

        let outcome = merger.build("Tools", &pages(4)).await.unwrap();

        assert!(ai.calls_for("InitialSchemaInference").is_empty());
        assert_eq!(ai.calls_for("IncrementalRdfMerge")[0].input("canonical_rdf"), Some(""));
        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(
            outcome.canonical.as_str(),
            "page https://site3.example\npage https://site4.example"
        );
    }

    #[tokio::test]
    async fn test_no_pages() {
        let merger = IncrementalMerger::new(MockCompletion::new(), PipelineConfig::default());
        assert!(matches!(
            merger.build("Tools", &[]).await,
            Err(ExtractionError::NoPages)
        ));
    }

    #[tokio::test]
    async fn test_simple_accumulator_seeds_with_first_page() {
        let ai = MockCompletion::new()
            .with_output_fn("ExtractPageRdf", "rdf", |req| {
                format!("page {}", req.get("url").unwrap_or_default())
            })
            .with_output_fn("SimpleMergeRdf", "merged_graph", |req| {
                union_lines(
                    req.get("current_graph").unwrap_or_default(),
                    req.get("new_content").unwrap_or_default(),
                )
            });
        let accumulator = SimpleAccumulator::new(ai.clone(), PipelineConfig::default());

        let outcome = accumulator.build("Tools", &pages(3)).await.unwrap();

        assert_eq!(ai.calls_for("SimpleMergeRdf").len(), 2);
        assert_eq!(outcome.pages_processed, 3);
        assert_eq!(
            outcome.canonical.as_str(),
            "page https://site1.example\npage https://site2.example\npage https://site3.example"
        );
    }

    #[tokio::test]
    async fn test_simple_accumulator_reseeds_empty_graph() {
        let ai = MockCompletion::new()
            .with_output_fn("ExtractPageRdf", "rdf", |req| match req.get("url") {
                Some("https://site1.example") => "  \n".to_string(),
                url => format!("page {}", url.unwrap_or_default()),
            })
            .with_output_fn("SimpleMergeRdf", "merged_graph", |req| {
                union_lines(
                    req.get("current_graph").unwrap_or_default(),
                    req.get("new_content").unwrap_or_default(),
                )
            });
        let accumulator = SimpleAccumulator::new(ai.clone(), PipelineConfig::default());

        let outcome = accumulator.build("Tools", &pages(3)).await.unwrap();

        let merges = ai.calls_for("SimpleMergeRdf");
        assert_eq!(merges.len(), 1);
        assert_eq!(merges[0].input("current_graph"), Some("page https://site2.example"));
        assert_eq!(
            outcome.canonical.as_str(),
            "page https://site2.example\npage https://site3.example"
        );
    }

    #[test]
    fn test_landscape_graph_stats() {
        let outcome = MergeOutcome {
            canonical: Fragment::new("<http://a> <http://b> <http://c> ."),
            pages_processed: 2,
            skipped: vec![],
        };
        let graph = LandscapeGraph::from_outcome(outcome, GraphFormat::NTriples);
        assert_eq!(
            graph.stats,
            GraphStats::Parsed {
                total_triples: 1,
                pages_processed: 2
            }
        );
        assert_eq!(graph.canonical_graph.trim(), "<http://a> <http://b> <http://c> .");
    }

    #[test]
    fn test_landscape_graph_keeps_unparsed_text() {
        let outcome = MergeOutcome {
            canonical: Fragment::new("this is not turtle"),
            pages_processed: 1,
            skipped: vec![],
        };
        let graph = LandscapeGraph::from_outcome(outcome, GraphFormat::RdfXml);
        assert_eq!(graph.canonical_graph, "this is not turtle");
        assert!(matches!(graph.stats, GraphStats::Unparsed { pages_processed: 1, .. }));
    }
}
