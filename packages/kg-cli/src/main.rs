//! `kg` - build RDF knowledge graphs from text and crawled pages.
//!
//! Graph text goes to stdout; logs go to stderr.

mod cmd;
mod config;
mod source;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cmd::{
    extract::ExtractArgs, landscape::LandscapeArgs, schema::SchemaArgs, scrape::ScrapeArgs,
};
use config::Config;

#[derive(Parser)]
#[command(name = "kg")]
#[command(about = "Prompt-driven knowledge graph extraction")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a graph from one text file
    Extract(ExtractArgs),

    /// Merge pages into one canonical landscape graph
    Landscape(LandscapeArgs),

    /// Extract a shared schema, then per-page instance files
    Schema(SchemaArgs),

    /// Fetch one URL and show what the fetcher returns
    Scrape(ScrapeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,kg_extract=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Extract(args) => cmd::extract::run(args, &config).await,
        Commands::Landscape(args) => cmd::landscape::run(args, &config).await,
        Commands::Schema(args) => cmd::schema::run(args, &config).await,
        Commands::Scrape(args) => cmd::scrape::run(args, &config).await,
    }
}
