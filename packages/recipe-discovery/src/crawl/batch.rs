//! Batch layer: many site jobs, bounded concurrency, isolated failures.
//!
//! Sites are processed in chunks of `site_batch_size`; within a chunk at most
//! `site_concurrency` jobs run at once. Jobs share nothing, so a setup error
//! or a bad site only ever fails its own report.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::crawl::job::{CrawlReport, JobState};
use crate::crawl::orchestrator::CrawlOrchestrator;
use crate::error::{BatchError, BatchResult};
use crate::types::config::{BatchConfig, CrawlBudget};
use crate::types::site::SiteConfig;

/// One site to crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSeed {
    pub seed_url: String,

    /// Explicit site config; derived from the seed when absent
    #[serde(default)]
    pub site: Option<SiteConfig>,

    /// Per-site budget override
    #[serde(default)]
    pub budget: Option<CrawlBudget>,
}

impl SiteSeed {
    pub fn new(seed_url: impl Into<String>) -> Self {
        Self {
            seed_url: seed_url.into(),
            site: None,
            budget: None,
        }
    }

    pub fn with_site(mut self, site: SiteConfig) -> Self {
        self.site = Some(site);
        self
    }

    pub fn with_budget(mut self, budget: CrawlBudget) -> Self {
        self.budget = Some(budget);
        self
    }
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// One report per input site, in input order
    pub jobs: Vec<CrawlReport>,

    /// Sites that yielded at least one recipe URL
    pub successful_sites: usize,

    /// Sites that failed setup or found nothing
    pub failed_sites: usize,

    /// Sites where the fallback fetcher was invoked
    pub fallback_sites: usize,

    pub total_recipes: usize,
    pub elapsed_ms: i64,
}

impl BatchReport {
    fn from_jobs(jobs: Vec<CrawlReport>, elapsed_ms: i64) -> Self {
        let successful_sites = jobs.iter().filter(|j| !j.recipes.is_empty()).count();
        let fallback_sites = jobs.iter().filter(|j| j.stats.used_fallback()).count();
        let total_recipes = jobs.iter().map(|j| j.recipes.len()).sum();
        Self {
            failed_sites: jobs.len() - successful_sites,
            successful_sites,
            fallback_sites,
            total_recipes,
            elapsed_ms,
            jobs,
        }
    }

    /// Every discovered recipe URL with the host it came from.
    pub fn recipe_urls(&self) -> Vec<(&str, &str)> {
        self.jobs
            .iter()
            .flat_map(|job| {
                job.recipes
                    .iter()
                    .map(move |r| (job.host.as_str(), r.url.as_str()))
            })
            .collect()
    }

    pub fn setup_failures(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| j.state == JobState::Failed)
            .count()
    }
}

/// Runs crawl jobs for many sites.
#[derive(Clone)]
pub struct BatchRunner {
    orchestrator: CrawlOrchestrator,
    config: BatchConfig,
    budget: CrawlBudget,
}

impl BatchRunner {
    pub fn new(orchestrator: CrawlOrchestrator) -> Self {
        Self {
            orchestrator,
            config: BatchConfig::default(),
            budget: CrawlBudget::default(),
        }
    }

    pub fn with_config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Budget for sites without their own override.
    pub fn with_budget(mut self, budget: CrawlBudget) -> Self {
        self.budget = budget;
        self
    }

    pub async fn run(&self, sites: Vec<SiteSeed>) -> BatchResult<BatchReport> {
        self.run_with_cancel(sites, CancellationToken::new()).await
    }

    /// Run every site; `cancel` stops running jobs and skips pending ones.
    ///
    /// Skipped sites still get a report (`BudgetedOut(Cancelled)`, nothing
    /// fetched) so the output stays one report per input.
    pub async fn run_with_cancel(
        &self,
        sites: Vec<SiteSeed>,
        cancel: CancellationToken,
    ) -> BatchResult<BatchReport> {
        if self.config.site_batch_size == 0 {
            return Err(BatchError::InvalidConfig {
                reason: "site_batch_size must be at least 1".to_string(),
            });
        }
        if self.config.site_concurrency == 0 {
            return Err(BatchError::InvalidConfig {
                reason: "site_concurrency must be at least 1".to_string(),
            });
        }

        let started_at = Utc::now();
        let total = sites.len();
        let chunks = total.div_ceil(self.config.site_batch_size);
        info!(
            sites = total,
            chunks,
            site_concurrency = self.config.site_concurrency,
            "Batch starting"
        );

        let mut jobs: Vec<(usize, CrawlReport)> = Vec::with_capacity(total);
        let indexed: Vec<(usize, SiteSeed)> = sites.into_iter().enumerate().collect();

        for (chunk_index, chunk) in indexed.chunks(self.config.site_batch_size).enumerate() {
            info!(chunk = chunk_index + 1, of = chunks, sites = chunk.len(), "Processing site chunk");

            let handles = chunk.iter().cloned().map(|(index, seed)| {
                let orchestrator = self.orchestrator.clone();
                let budget = seed.budget.clone().unwrap_or_else(|| self.budget.clone());
                let cancel = cancel.child_token();
                let seed_url = seed.seed_url.clone();
                let host = seed.site.as_ref().map(|s| s.host.clone()).unwrap_or_default();
                let handle =
                    tokio::spawn(async move { run_site(&orchestrator, seed, budget, cancel).await });
                async move { (index, join_report(handle.await, &seed_url, &host)) }
            });

            let results: Vec<(usize, CrawlReport)> = stream::iter(handles)
                .buffer_unordered(self.config.site_concurrency)
                .collect()
                .await;
            jobs.extend(results);
        }

        jobs.sort_by_key(|(index, _)| *index);
        let jobs: Vec<CrawlReport> = jobs.into_iter().map(|(_, job)| job).collect();
        let report = BatchReport::from_jobs(jobs, (Utc::now() - started_at).num_milliseconds());

        info!(
            sites = total,
            successful = report.successful_sites,
            failed = report.failed_sites,
            fallback = report.fallback_sites,
            recipes = report.total_recipes,
            elapsed_ms = report.elapsed_ms,
            "Batch finished"
        );
        Ok(report)
    }
}

/// A site task that died (panic or abort) becomes that site's failed report.
fn join_report(
    joined: Result<CrawlReport, JoinError>,
    seed_url: &str,
    host: &str,
) -> CrawlReport {
    match joined {
        Ok(report) => report,
        Err(e) => {
            error!(seed = %seed_url, error = %e, "Site task failed");
            CrawlReport::failed(
                uuid::Uuid::now_v7(),
                seed_url,
                host,
                format!("crawl task failed: {}", e),
                Utc::now(),
            )
        }
    }
}

async fn run_site(
    orchestrator: &CrawlOrchestrator,
    seed: SiteSeed,
    budget: CrawlBudget,
    cancel: CancellationToken,
) -> CrawlReport {
    let site = match seed.site {
        Some(site) => site,
        None => match SiteConfig::for_seed(&seed.seed_url) {
            Ok(site) => site,
            Err(e) => {
                warn!(seed = %seed.seed_url, error = %e, "Site config could not be derived");
                return CrawlReport::failed(
                    uuid::Uuid::now_v7(),
                    &seed.seed_url,
                    "",
                    &e,
                    Utc::now(),
                );
            }
        },
    };

    orchestrator
        .run_with_cancel(&seed.seed_url, site, budget, cancel)
        .await
}
