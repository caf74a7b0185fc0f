//! Recipe Discovery Runner
//!
//! Crawls one or more recipe sites and prints the batch report as JSON on
//! stdout. Logs go to stderr.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use recipe_discovery::{
    BatchRunner, CrawlOrchestrator, FetchStrategySelector, Fetcher, FirecrawlFetcher, HttpFetcher,
    SiteSeed,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "discover")]
#[command(about = "Discover recipe page URLs on recipe websites")]
struct Cli {
    /// Seed URLs, one site each
    seeds: Vec<String>,

    /// File with one seed URL per line (`#` starts a comment)
    #[arg(long)]
    sites_file: Option<PathBuf>,

    /// Recipe URLs to discover per site [env: RECIPE_MAX_URLS]
    #[arg(long)]
    max_urls: Option<usize>,

    /// Link depth limit [env: RECIPE_MAX_DEPTH]
    #[arg(long)]
    max_depth: Option<usize>,

    /// Seconds between fetches of one worker [env: POLITENESS_DELAY_SECONDS]
    #[arg(long)]
    politeness_delay: Option<f64>,

    /// Workers per site [env: WORKER_COUNT]
    #[arg(long)]
    workers: Option<usize>,

    /// Sites per batch chunk [env: SITE_BATCH_SIZE]
    #[arg(long)]
    batch_size: Option<usize>,

    /// Sites crawled at once [env: SITE_CONCURRENCY]
    #[arg(long)]
    concurrency: Option<usize>,

    /// Never use the Firecrawl fallback, even when FIRECRAWL_API_KEY is set
    #[arg(long)]
    no_fallback: bool,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(v) = self.max_urls {
            config.max_recipe_urls = v;
        }
        if let Some(v) = self.max_depth {
            config.max_depth = v;
        }
        if let Some(v) = self.politeness_delay {
            config.politeness_delay_seconds = v;
        }
        if let Some(v) = self.workers {
            config.worker_count = v;
        }
        if let Some(v) = self.batch_size {
            config.site_batch_size = v;
        }
        if let Some(v) = self.concurrency {
            config.site_concurrency = v;
        }
        if self.no_fallback {
            config.firecrawl_api_key = None;
        }
    }

    fn seeds(&self) -> Result<Vec<SiteSeed>> {
        let mut seeds: Vec<String> = self.seeds.clone();
        if let Some(path) = &self.sites_file {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read sites file {}", path.display()))?;
            seeds.extend(
                contents
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(str::to_string),
            );
        }
        if seeds.is_empty() {
            bail!("No seed URLs given; pass URLs or --sites-file");
        }
        Ok(seeds.into_iter().map(SiteSeed::new).collect())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,recipe_discovery=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    cli.apply(&mut config);
    config.validate()?;
    let seeds = cli.seeds()?;

    tracing::info!(
        sites = seeds.len(),
        max_urls = config.max_recipe_urls,
        workers = config.worker_count,
        fallback = config.firecrawl_api_key.is_some(),
        "Starting recipe discovery"
    );

    let cheap = HttpFetcher::new(Duration::from_secs(config.fetch_timeout_seconds))
        .context("Failed to build HTTP client")?;
    let fallback: Option<Arc<dyn Fetcher>> = match &config.firecrawl_api_key {
        Some(key) => Some(Arc::new(
            FirecrawlFetcher::new(key.clone()).context("Failed to build Firecrawl client")?,
        )),
        None => {
            tracing::warn!("FIRECRAWL_API_KEY not set, anti-scraping fallback disabled");
            None
        }
    };

    let selector = FetchStrategySelector::new(Arc::new(cheap)).with_optional_fallback(fallback);
    let orchestrator = CrawlOrchestrator::new(selector).with_config(config.crawl_config());
    let runner = BatchRunner::new(orchestrator)
        .with_config(config.batch_config())
        .with_budget(config.budget());

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing in-flight fetches");
            on_signal.cancel();
        }
    });

    let report = runner
        .run_with_cancel(seeds, cancel)
        .await
        .context("Batch failed")?;

    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .context("Failed to serialize report")?;
    println!("{}", json);

    tracing::info!(
        successful = report.successful_sites,
        failed = report.failed_sites,
        fallback = report.fallback_sites,
        recipes = report.total_recipes,
        "Recipe discovery complete"
    );

    Ok(())
}
