//! Graph pipelines - the core of the library.
//!
//! The pipelines orchestrate:
//! - Single-pass extraction (theme + text → graph fragment)
//! - Triple extraction with local graph assembly
//! - Incremental merging of page graphs into one canonical graph
//! - Schema/instance split with concurrent per-page calls
//! - Crawling a URL list through a page fetcher

pub mod crawl;
pub mod extract;
pub mod merge;
pub mod prompts;
pub mod schema_split;
pub mod triples;

pub use crawl::{crawl_pages, CrawlReport};
pub use extract::{strip_code_fence, Extraction, Extractor};
pub use merge::{
    build_landscape_graph, extract_page_rdf, GraphStats, IncrementalMerger, LandscapeGraph,
    MergeOutcome, MergeState, SimpleAccumulator,
};
pub use schema_split::{SchemaInstancePipeline, SchemaInstanceResult};
pub use triples::{parse_triples, TripleGraphBuilder};
