use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use kg_extract::{CompletionService, Extractor, GraphFormat, TripleGraphBuilder};
use tracing::{info, warn};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Theme that steers which entities and relations are extracted
    #[arg(long)]
    pub theme: String,

    /// Text file to extract from
    #[arg(long)]
    pub file: PathBuf,

    /// Serialization the model is asked to write (turtle, ntriples, nquads, trig, xml, n3, jsonld)
    #[arg(long, default_value = "turtle")]
    pub format: GraphFormat,

    /// Serialization to print; the graph is converted locally when it differs from --format
    #[arg(long)]
    pub output_format: Option<GraphFormat>,

    /// Ask for JSON triples and assemble the graph locally
    #[arg(long)]
    pub triples: bool,
}

impl ExtractArgs {
    fn output_format(&self) -> GraphFormat {
        self.output_format.unwrap_or(self.format)
    }
}

pub async fn run(args: ExtractArgs, config: &Config) -> Result<()> {
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let output = extract(config.completion()?, &args, &text, config.call_timeout).await?;
    println!("{}", output);
    Ok(())
}

/// Run one extraction and return the text to print.
pub async fn extract<A: CompletionService>(
    ai: A,
    args: &ExtractArgs,
    text: &str,
    timeout: Duration,
) -> Result<String> {
    let output_format = args.output_format();

    if args.triples {
        let builder = TripleGraphBuilder::new(ai).with_timeout(timeout);
        let triples = builder.extract_triples(&args.theme, text).await?;
        let graph = builder.assemble(&args.theme, &triples)?;
        info!(extracted = triples.len(), triples = graph.len(), "Graph assembled");
        return Ok(graph.serialize(output_format)?);
    }

    let extraction = Extractor::new(ai)
        .with_format(args.format)
        .with_timeout(timeout)
        .extract(&args.theme, text)
        .await?;

    match &extraction.parsed {
        Ok(graph) => info!(triples = graph.len(), format = %args.format, "Graph parsed"),
        Err(e) => {
            warn!(error = %e, "Output is not a valid graph; printing it unconverted")
        }
    }
    Ok(extraction.render(output_format)?)
}
