use anyhow::Result;
use clap::Args;
use kg_extract::{
    build_landscape_graph, GraphFormat, GraphStats, IncrementalMerger, LandscapeGraph,
    SimpleAccumulator,
};
use tracing::{info, warn};

use crate::config::Config;
use crate::source::PageSource;

#[derive(Args, Debug)]
pub struct LandscapeArgs {
    /// Domain the landscape covers, e.g. "AI Writing Tools"
    #[arg(long)]
    pub domain: String,

    #[command(flatten)]
    pub source: PageSource,

    /// Serialization of the printed graph
    #[arg(long, default_value = "turtle")]
    pub output_format: GraphFormat,

    /// Accumulate pages without the schema seeding step
    #[arg(long)]
    pub simple: bool,

    /// Stop at the first failed model call
    #[arg(long)]
    pub fail_fast: bool,
}

pub async fn run(args: LandscapeArgs, config: &Config) -> Result<()> {
    let pages = args.source.load(config).await?;
    let ai = config.completion()?;
    let pipeline = config.pipeline(args.fail_fast, None);

    info!(domain = %args.domain, pages = pages.len(), simple = args.simple, "Building landscape graph");

    let graph = if args.simple {
        let outcome = SimpleAccumulator::new(ai, pipeline)
            .build(&args.domain, &pages)
            .await?;
        LandscapeGraph::from_outcome(outcome, args.output_format)
    } else {
        let merger = IncrementalMerger::new(ai, pipeline);
        build_landscape_graph(&merger, &args.domain, &pages, args.output_format).await?
    };

    println!("{}", graph.canonical_graph);

    for skipped in &graph.skipped {
        warn!(url = %skipped.url, reason = %skipped.reason, "Page skipped");
    }
    match &graph.stats {
        GraphStats::Parsed {
            total_triples,
            pages_processed,
        } => info!(total_triples, pages_processed, "Landscape graph complete"),
        GraphStats::Unparsed {
            error,
            pages_processed,
        } => warn!(error = %error, pages_processed, "Landscape graph does not parse; printed raw"),
    }
    Ok(())
}
