//! Knowledge-Graph Extraction Library
//!
//! Turns free text or crawled web pages into RDF graphs by delegating every
//! semantic decision to a language model, and keeps the mechanics (calls,
//! ordering, validation, files) deterministic and testable.
//!
//! # Design Philosophy
//!
//! - The model is a pluggable service behind [`CompletionService`]
//! - Model output is checked syntactically, never semantically
//! - A page that fails to fetch is skipped, not fatal
//! - Merging is a strict left fold; instance extraction is embarrassingly parallel
//!
//! # Usage
//!
//! ```rust,ignore
//! use kg_extract::{IncrementalMerger, PipelineConfig};
//! use kg_extract::ai::OpenAiCompletion;
//!
//! let ai = OpenAiCompletion::from_env()?;
//! let merger = IncrementalMerger::new(ai, PipelineConfig::default());
//! let outcome = merger.build("AI Writing Tools", &pages).await?;
//! println!("{}", outcome.canonical);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Service seams (CompletionService, PageFetcher)
//! - [`types`] - Pages, fragments, triples, configuration
//! - [`pipeline`] - Extraction, merging and schema/instance pipelines
//! - [`graph`] - RDF parse/serialize boundary
//! - [`output`] - Files written by the schema/instance pipeline
//! - [`ingestors`] - Page fetchers (Firecrawl, mock)
//! - [`ai`] - Completion services (OpenAI)
//! - [`testing`] - Deterministic stubs for tests

pub mod ai;
pub mod error;
pub mod graph;
pub mod ingestors;
pub mod output;
pub mod pipeline;
pub mod security;
pub mod slug;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{ExtractionError, FetchError, GraphError, ServiceError};
pub use graph::{GraphFormat, RdfGraph};
pub use slug::slugify;
pub use traits::{
    completion::{CompletionRequest, CompletionResponse, CompletionService, FieldSpec, Prompt},
    fetcher::PageFetcher,
};
pub use types::{
    config::{FailurePolicy, PipelineConfig},
    fragment::Fragment,
    page::{Page, SkippedPage},
    triple::Triple,
};

// Re-export pipeline components
pub use pipeline::{
    build_landscape_graph, crawl_pages, CrawlReport, Extraction, Extractor, GraphStats,
    IncrementalMerger, LandscapeGraph, MergeOutcome, MergeState, SchemaInstancePipeline,
    SchemaInstanceResult, SimpleAccumulator, TripleGraphBuilder,
};

pub use output::{write_outputs, InstanceFile, OutputPaths};
