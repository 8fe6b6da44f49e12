use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use kg_extract::{write_outputs, SchemaInstancePipeline};
use tracing::{info, warn};

use super::preview;
use crate::config::Config;
use crate::source::PageSource;

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Domain the schema covers, e.g. "AI Writing Tools"
    #[arg(long)]
    pub domain: String,

    #[command(flatten)]
    pub source: PageSource,

    /// Directory the schema and instance files are written to
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Maximum concurrent instance extractions (defaults to KG_CONCURRENCY)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Stop at the first failed model call
    #[arg(long)]
    pub fail_fast: bool,
}

pub async fn run(args: SchemaArgs, config: &Config) -> Result<()> {
    let pages = args.source.load(config).await?;
    let pipeline = SchemaInstancePipeline::new(
        config.completion()?,
        config.pipeline(args.fail_fast, args.concurrency),
    );

    let result = pipeline.run(&args.domain, &pages).await?;
    let paths = write_outputs(&args.output_dir, &args.domain, &result)?;

    println!("Schema: {}", paths.schema.display());
    println!("{}\n", preview(result.schema.as_str(), 500));

    println!("Instances:");
    for instance in &paths.instances {
        let triples = match &instance.triples {
            Ok(count) => format!("{} triples", count),
            Err(_) => "unparsed".to_string(),
        };
        println!("  {} -> {} ({})", instance.url, instance.path.display(), triples);
    }
    println!("Merged: {}", paths.merged.display());

    for skipped in &result.skipped {
        warn!(url = %skipped.url, reason = %skipped.reason, "Page skipped");
    }
    info!(
        instances = paths.instances.len(),
        skipped = result.skipped.len(),
        dir = %args.output_dir.display(),
        "Schema pipeline complete"
    );
    Ok(())
}
