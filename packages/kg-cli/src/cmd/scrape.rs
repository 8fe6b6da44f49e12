use anyhow::{bail, Result};
use clap::Args;
use kg_extract::crawl_pages;

use super::preview;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// URL to fetch
    #[arg(long)]
    pub url: String,
}

pub async fn run(args: ScrapeArgs, config: &Config) -> Result<()> {
    let fetcher = config.fetcher()?;
    let report = crawl_pages(&fetcher, &[args.url.clone()], config.call_timeout).await;

    let Some(page) = report.pages.into_iter().next() else {
        let reason = report
            .failures
            .first()
            .map(|f| f.reason.clone())
            .unwrap_or_default();
        bail!("Failed to scrape {}: {}", args.url, reason);
    };

    println!("URL: {}", page.url);
    if let Some(title) = page.title() {
        println!("Title: {}", title);
    }
    println!("Characters: {}\n", page.text.chars().count());
    println!("{}\n", preview(&page.text, 500));
    println!("Metadata:\n{}", serde_json::to_string_pretty(&page.metadata)?);
    Ok(())
}
