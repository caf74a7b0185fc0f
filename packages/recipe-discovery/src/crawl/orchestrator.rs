//! Crawl orchestrator: drains one job's frontier with a bounded worker pool.
//!
//! Each worker loops: pop, re-check exclusion, fetch through the strategy
//! selector (with retries), extract links, classify, push. A per-worker
//! politeness delay separates one fetch completing from that worker's next
//! dispatch. The job ends when the frontier drains with nothing in flight,
//! or when a budget, deadline or external cancellation stops it; every exit
//! path returns what was discovered so far.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::classifier::UrlClassifier;
use crate::crawl::job::{BudgetReason, CrawlJob, CrawlReport, JobState};
use crate::crawl::retry::{jittered, RetryPolicy};
use crate::error::{FetchError, FetchResult, JobSetupError, SetupResult};
use crate::extractors::HtmlLinkExtractor;
use crate::frontier::{host_of, FrontierEntry, FrontierPoll, PushOutcome};
use crate::strategy::FetchStrategySelector;
use crate::traits::link_extractor::LinkExtractor;
use crate::types::classification::UrlKind;
use crate::types::config::{CrawlBudget, CrawlConfig};
use crate::types::page::FetchOutcome;
use crate::types::site::SiteConfig;

/// Why a URL produced no page.
#[derive(Debug)]
enum FetchFailure {
    /// Retries exhausted or the error was permanent
    Abandoned(FetchError),
    /// The job stopped while the URL was still being retried
    Stopped(FetchError),
}

/// Runs crawl jobs. Holds no per-job state, so one orchestrator can drive
/// many jobs concurrently.
///
/// # Example
///
/// ```rust,ignore
/// let orchestrator = CrawlOrchestrator::new(selector).with_config(CrawlConfig::default());
/// let site = SiteConfig::for_seed("https://example.com/")?;
/// let report = orchestrator.run("https://example.com/", site, CrawlBudget::new(5)).await;
/// for url in report.recipe_urls() {
///     println!("{}", url);
/// }
/// ```
#[derive(Clone)]
pub struct CrawlOrchestrator {
    classifier: UrlClassifier,
    selector: FetchStrategySelector,
    extractor: Arc<dyn LinkExtractor>,
    config: CrawlConfig,
}

impl CrawlOrchestrator {
    /// Default classifier, HTML link extractor and crawl config.
    pub fn new(selector: FetchStrategySelector) -> Self {
        Self {
            classifier: UrlClassifier::new(),
            selector,
            extractor: Arc::new(HtmlLinkExtractor::new()),
            config: CrawlConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CrawlConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_classifier(mut self, classifier: UrlClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn LinkExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Validate the seed and build the job with its frontier seeded.
    pub fn prepare(
        &self,
        seed_url: &str,
        site: SiteConfig,
        budget: CrawlBudget,
    ) -> SetupResult<CrawlJob> {
        if self.config.worker_count == 0 {
            return Err(JobSetupError::InvalidConfig {
                reason: "worker_count must be at least 1".to_string(),
            });
        }
        if Duration::try_from_secs_f64(self.config.politeness_delay_secs).is_err() {
            return Err(JobSetupError::InvalidConfig {
                reason: format!(
                    "politeness_delay_secs must be a finite, non-negative number of seconds, got {}",
                    self.config.politeness_delay_secs
                ),
            });
        }

        let parsed = Url::parse(seed_url).map_err(|e| JobSetupError::InvalidSeed {
            url: seed_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(JobSetupError::InvalidSeed {
                url: seed_url.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        let seed_host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
        if !site.owns_host(&seed_host) {
            return Err(JobSetupError::HostMismatch {
                seed_host,
                site_host: site.host.clone(),
            });
        }

        let classification = self.classifier.classify(seed_url);
        if classification.is_excluded() {
            return Err(JobSetupError::ExcludedSeed {
                url: seed_url.to_string(),
            });
        }

        let seed = FrontierEntry::seed(classification).map_err(|e| JobSetupError::InvalidSeed {
            url: seed_url.to_string(),
            reason: e.to_string(),
        })?;

        let job = CrawlJob::new(seed.url.clone(), site, budget, self.config.clone());
        job.stats.record_kind(seed.kind());
        job.frontier.push(seed);

        if self.config.seed_alternate_entry_points {
            for alternate in &job.site.alternate_entry_points {
                let classification = self.classifier.classify(alternate);
                job.stats.record_kind(classification.kind);
                if classification.is_excluded() {
                    continue;
                }
                if let Ok(entry) = FrontierEntry::seed(classification) {
                    job.frontier.push(entry);
                }
            }
        }

        Ok(job)
    }

    /// Run a job to completion.
    pub async fn run(&self, seed_url: &str, site: SiteConfig, budget: CrawlBudget) -> CrawlReport {
        self.run_with_cancel(seed_url, site, budget, CancellationToken::new())
            .await
    }

    /// Run a job that stops early when `cancel` fires.
    ///
    /// Cancellation lets in-flight fetches finish but dispatches nothing new;
    /// the job ends `BudgetedOut(Cancelled)` with its partial results.
    pub async fn run_with_cancel(
        &self,
        seed_url: &str,
        site: SiteConfig,
        budget: CrawlBudget,
        cancel: CancellationToken,
    ) -> CrawlReport {
        let started_at = chrono::Utc::now();
        let host = site.host.clone();

        let job = match self.prepare(seed_url, site, budget) {
            Ok(job) => Arc::new(job),
            Err(e) => {
                warn!(seed = %seed_url, error = %e, "Crawl job setup failed");
                return CrawlReport::failed(
                    uuid::Uuid::now_v7(),
                    seed_url,
                    &host,
                    &e,
                    started_at,
                );
            }
        };

        info!(
            job_id = %job.id,
            seed = %job.seed_url,
            host = %job.site.host,
            workers = self.config.worker_count,
            max_recipes = job.budget.max_recipe_urls,
            max_depth = job.budget.max_depth,
            "Crawl job starting"
        );

        if job.budget.max_recipe_urls == 0 {
            return job.report(JobState::BudgetedOut(BudgetReason::RecipeLimit));
        }

        let stop = cancel.child_token();
        let ctx = Arc::new(WorkerContext {
            job: Arc::clone(&job),
            classifier: self.classifier.clone(),
            selector: self.selector.clone(),
            extractor: Arc::clone(&self.extractor),
            retry: RetryPolicy::from_config(&self.config),
            stop: stop.clone(),
            reason: OnceLock::new(),
        });

        let deadline = job.budget.time_limit.map(|limit| {
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                tokio::select! {
                    _ = ctx.stop.cancelled() => {}
                    _ = tokio::time::sleep(limit) => {
                        info!(job_id = %ctx.job.id, "Crawl deadline reached");
                        ctx.stop_with(BudgetReason::Deadline);
                    }
                }
            })
        });

        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.worker_count {
            let ctx = Arc::clone(&ctx);
            workers.spawn(async move { ctx.worker_loop(worker_id).await });
        }
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(job_id = %job.id, error = %e, "Crawl worker task failed");
            }
        }

        let state = ctx.final_state(&cancel);
        stop.cancel();
        if let Some(handle) = deadline {
            let _ = handle.await;
        }

        let report = job.report(state);
        info!(
            job_id = %job.id,
            host = %job.site.host,
            state = ?report.state,
            recipes = report.recipes.len(),
            fetched = report.stats.fetched,
            failures = report.stats.fetch_failures,
            fallbacks = report.stats.fallback_invocations,
            elapsed_ms = report.elapsed_ms(),
            "Crawl job finished"
        );
        report
    }
}

/// Everything one job's workers share.
struct WorkerContext {
    job: Arc<CrawlJob>,
    classifier: UrlClassifier,
    selector: FetchStrategySelector,
    extractor: Arc<dyn LinkExtractor>,
    retry: RetryPolicy,
    stop: CancellationToken,
    /// First budget reason to stop the job wins
    reason: OnceLock<BudgetReason>,
}

impl WorkerContext {
    fn stop_with(&self, reason: BudgetReason) {
        let _ = self.reason.set(reason);
        self.stop.cancel();
        self.job.frontier.wake_all();
    }

    fn final_state(&self, cancel: &CancellationToken) -> JobState {
        if let Some(reason) = self.reason.get() {
            return JobState::BudgetedOut(*reason);
        }
        if cancel.is_cancelled() {
            return JobState::BudgetedOut(BudgetReason::Cancelled);
        }
        if self.job.frontier.recipe_limit_reached() {
            return JobState::BudgetedOut(BudgetReason::RecipeLimit);
        }
        if self.job.frontier.depth_rejections() > 0 {
            return JobState::BudgetedOut(BudgetReason::DepthLimit);
        }
        JobState::Completed
    }

    async fn worker_loop(&self, worker_id: usize) {
        let frontier = &self.job.frontier;
        let config = &self.job.config;

        loop {
            if self.stop.is_cancelled() {
                break;
            }
            if frontier.recipe_limit_reached() {
                self.stop_with(BudgetReason::RecipeLimit);
                break;
            }

            let poll = tokio::select! {
                _ = self.stop.cancelled() => break,
                poll = frontier.next(config.frontier_wait()) => poll,
            };
            let entry = match poll {
                FrontierPoll::Entry(entry) => entry,
                FrontierPoll::Drained => {
                    debug!(worker_id, "Frontier drained, worker exiting");
                    frontier.wake_all();
                    break;
                }
                FrontierPoll::Idle => continue,
            };

            if !self.job.try_dispatch() {
                frontier.complete();
                self.stop_with(BudgetReason::FetchLimit);
                break;
            }

            let url = entry.url.clone();
            let processed = AssertUnwindSafe(self.process(worker_id, entry))
                .catch_unwind()
                .await;
            if processed.is_err() {
                self.job.stats.record_failure();
                error!(worker_id, url = %url, "Processing panicked, abandoning URL");
            }
            frontier.complete();

            if frontier.recipe_limit_reached() {
                self.stop_with(BudgetReason::RecipeLimit);
                break;
            }

            let delay = jittered(config.politeness_delay(), config.politeness_jitter);
            if !delay.is_zero() {
                tokio::select! {
                    _ = self.stop.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    async fn process(&self, worker_id: usize, entry: FrontierEntry) {
        let job = &self.job;

        // Catalog may have changed since the entry was queued.
        if self.classifier.classify(&entry.url).is_excluded() {
            debug!(url = %entry.url, "Skipping entry excluded after enqueue");
            return;
        }

        let is_entry = entry.depth == 0;
        debug!(worker_id, url = %entry.url, depth = entry.depth, kind = %entry.kind(), "Fetching");

        let outcome = match self.fetch_with_retry(&entry.url, is_entry).await {
            Ok(outcome) => outcome,
            Err(FetchFailure::Abandoned(e)) => {
                job.stats.record_failure();
                warn!(url = %entry.url, error = %e, "Abandoning URL");
                return;
            }
            Err(FetchFailure::Stopped(e)) => {
                debug!(url = %entry.url, error = %e, "Job stopped before URL could be retried");
                return;
            }
        };
        job.stats.record_fetched();

        if outcome.page.url != entry.url {
            // An alternate entry point answered instead of the seed.
            job.frontier.mark_seen(&outcome.page.url);
        }

        let base = if outcome.page.final_url.is_empty() {
            outcome.page.url.as_str()
        } else {
            outcome.page.final_url.as_str()
        };
        let links = self.extractor.extract(&outcome.page.body, base);
        let mut pushed = 0usize;

        for link in links {
            if job.config.same_host_only {
                match host_of(&link) {
                    Some(host) if job.site.owns_host(&host) => {}
                    _ => continue,
                }
            }

            let classification = self.classifier.classify(&link);
            job.stats.record_kind(classification.kind);
            if classification.kind == UrlKind::Excluded {
                continue;
            }

            let Ok(child) =
                FrontierEntry::new(classification, entry.depth + 1, Some(entry.url.clone()))
            else {
                continue;
            };
            let child_url = child.url.clone();
            match job.frontier.push(child) {
                PushOutcome::Pushed => {
                    pushed += 1;
                    debug!(url = %child_url, from = %entry.url, "Queued link");
                }
                PushOutcome::RecipeLimit => {
                    debug!(url = %child_url, "Recipe budget full, link dropped");
                }
                _ => {}
            }
        }

        debug!(
            url = %entry.url,
            used_fallback = outcome.used_fallback,
            pushed,
            "Page processed"
        );
    }

    async fn fetch_with_retry(
        &self,
        url: &str,
        is_entry: bool,
    ) -> Result<FetchOutcome, FetchFailure> {
        let job = &self.job;
        let timeout = self.timeout_for(is_entry);

        let mut result = if is_entry {
            with_timeout(url, timeout, self.selector.fetch_entry(url, &job.site, &job.stats)).await
        } else {
            with_timeout(url, timeout, self.selector.fetch(url, &job.site, &job.stats)).await
        };
        let mut attempt = 0;

        loop {
            let err = match result {
                Ok(outcome) => return Ok(outcome),
                Err(err) => err,
            };
            attempt += 1;
            if !self.retry.should_retry(&err, attempt) {
                return Err(FetchFailure::Abandoned(err.into_permanent()));
            }
            if self.stop.is_cancelled() {
                return Err(FetchFailure::Stopped(err));
            }

            job.stats.record_retry();
            debug!(url = %url, attempt, error = %err, "Retrying after transient failure");
            tokio::select! {
                _ = self.stop.cancelled() => return Err(FetchFailure::Stopped(err)),
                _ = tokio::time::sleep(self.retry.backoff(attempt)) => {}
            }

            let retry = self
                .selector
                .fetch_via_fallback(url, &job.site, &job.stats, is_entry);
            result = with_timeout(url, timeout, retry).await;
        }
    }

    fn timeout_for(&self, is_entry: bool) -> Duration {
        let base = self.job.config.fetch_timeout();
        if is_entry {
            // Entry fetches may walk every alternate entry point.
            base.saturating_mul(1 + self.job.site.alternate_entry_points.len() as u32)
        } else {
            base
        }
    }
}

async fn with_timeout<F>(url: &str, timeout: Duration, fut: F) -> FetchResult<FetchOutcome>
where
    F: std::future::Future<Output = FetchResult<FetchOutcome>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::timeout(url)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockFetcher, StaticSite};

    fn fast_config() -> CrawlConfig {
        CrawlConfig::new()
            .with_workers(2)
            .with_politeness_delay(0.0)
            .with_retries(2, 1)
            .with_frontier_wait(20)
    }

    fn orchestrator(fetcher: MockFetcher) -> CrawlOrchestrator {
        CrawlOrchestrator::new(FetchStrategySelector::new(Arc::new(fetcher)))
            .with_config(fast_config())
    }

    #[tokio::test]
    async fn test_setup_errors_fail_only_the_job() {
        let orch = orchestrator(MockFetcher::new());

        let report = orch
            .run("not a url", SiteConfig::new("example.com"), CrawlBudget::default())
            .await;
        assert_eq!(report.state, JobState::Failed);
        assert!(report.setup_error.is_some());

        let report = orch
            .run(
                "https://example.com/about",
                SiteConfig::new("example.com"),
                CrawlBudget::default(),
            )
            .await;
        assert_eq!(report.state, JobState::Failed);

        let err = orch
            .prepare(
                "https://other.com/",
                SiteConfig::new("example.com"),
                CrawlBudget::default(),
            )
            .unwrap_err();
        assert!(matches!(err, JobSetupError::HostMismatch { .. }));
    }

    #[tokio::test]
    async fn test_zero_workers_is_setup_error() {
        let orch = orchestrator(MockFetcher::new()).with_config(fast_config().with_workers(0));
        let err = orch
            .prepare(
                "https://example.com/",
                SiteConfig::new("example.com"),
                CrawlBudget::default(),
            )
            .unwrap_err();
        assert!(matches!(err, JobSetupError::InvalidConfig { .. }));
    }

    #[tokio::test]
    async fn test_completes_when_frontier_empties() {
        let site = StaticSite::new("https://example.com")
            .page("/", &["/category/desserts/"])
            .page("/category/desserts", &["/2023/05/02/lemon-tart/"])
            .page("/2023/05/02/lemon-tart", &[]);

        let report = orchestrator(site.fetcher())
            .run(
                "https://example.com/",
                SiteConfig::new("example.com"),
                CrawlBudget::new(5),
            )
            .await;

        assert_eq!(report.state, JobState::Completed);
        assert_eq!(
            report.recipe_urls(),
            vec!["https://example.com/2023/05/02/lemon-tart"]
        );
        assert_eq!(report.stats.fetched, 3);
        assert_eq!(report.stats.fetch_failures, 0);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let fetcher = MockFetcher::new()
            .with_error("https://example.com/", FetchError::timeout("https://example.com/"))
            .with_page("https://example.com/", StaticSite::render(&[]));

        let report = orchestrator(fetcher.clone())
            .run(
                "https://example.com/",
                SiteConfig::new("example.com"),
                CrawlBudget::new(5),
            )
            .await;

        assert_eq!(report.stats.retries, 1);
        assert_eq!(report.stats.fetched, 1);
        assert_eq!(report.stats.fetch_failures, 0);
        assert_eq!(fetcher.calls_for("https://example.com/"), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let fetcher = MockFetcher::new().with_status("https://example.com/", 404);
        let report = orchestrator(fetcher.clone())
            .run(
                "https://example.com/",
                SiteConfig::new("example.com"),
                CrawlBudget::new(5),
            )
            .await;

        assert_eq!(report.state, JobState::Completed);
        assert_eq!(report.stats.fetch_failures, 1);
        assert_eq!(report.stats.retries, 0);
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cross_host_links_are_dropped() {
        let site = StaticSite::new("https://example.com").page(
            "/",
            &[
                "https://other.com/2023/05/01/banana-bread",
                "https://www.example.com/2023/05/01/apple-pie",
            ],
        );
        let report = orchestrator(site.fetcher())
            .run(
                "https://example.com/",
                SiteConfig::new("example.com"),
                CrawlBudget::new(5),
            )
            .await;

        assert_eq!(
            report.recipe_urls(),
            vec!["https://www.example.com/2023/05/01/apple-pie"]
        );
    }

    #[tokio::test]
    async fn test_depth_limit_reported() {
        let site = StaticSite::new("https://example.com")
            .page("/", &["/misc-one"])
            .page("/misc-one", &["/misc-two"]);
        let report = orchestrator(site.fetcher())
            .run(
                "https://example.com/",
                SiteConfig::new("example.com"),
                CrawlBudget::new(5).with_max_depth(1),
            )
            .await;

        assert_eq!(report.state, JobState::BudgetedOut(BudgetReason::DepthLimit));
        assert_eq!(report.stats.fetched, 2);
    }

    #[tokio::test]
    async fn test_fetch_limit_stops_job() {
        let site = StaticSite::new("https://example.com")
            .page("/", &["/a-one", "/b-two", "/c-three"])
            .page("/a-one", &[])
            .page("/b-two", &[])
            .page("/c-three", &[]);
        let report = orchestrator(site.fetcher())
            .with_config(fast_config().with_workers(1))
            .run(
                "https://example.com/",
                SiteConfig::new("example.com"),
                CrawlBudget::new(5).with_max_fetches(2),
            )
            .await;

        assert_eq!(report.state, JobState::BudgetedOut(BudgetReason::FetchLimit));
        assert_eq!(report.stats.dispatched, 2);
    }

    #[tokio::test]
    async fn test_seed_alternates_are_queued_when_enabled() {
        let site = StaticSite::new("https://example.com")
            .page("/", &[])
            .page("/recipes", &["/2023/05/01/banana-bread"]);
        let orch = orchestrator(site.fetcher()).with_config(fast_config().seed_alternates());
        let site_config =
            SiteConfig::new("example.com").with_alternates(["https://example.com/recipes"]);

        let report = orch
            .run("https://example.com/", site_config, CrawlBudget::new(5))
            .await;
        assert_eq!(
            report.recipe_urls(),
            vec!["https://example.com/2023/05/01/banana-bread"]
        );
    }

    #[tokio::test]
    async fn test_back_links_within_depth_still_complete() {
        let site = StaticSite::new("https://example.com")
            .page("/", &["/misc-one"])
            .page("/misc-one", &["/"]);
        let report = orchestrator(site.fetcher())
            .run(
                "https://example.com/",
                SiteConfig::new("example.com"),
                CrawlBudget::new(5).with_max_depth(1),
            )
            .await;

        assert_eq!(report.state, JobState::Completed);
        assert_eq!(report.stats.fetched, 2);
    }

    /// Panics when asked for any URL containing `/boom`.
    struct PanickingFetcher(MockFetcher);

    #[async_trait::async_trait]
    impl crate::traits::fetcher::Fetcher for PanickingFetcher {
        async fn fetch(&self, url: &str) -> FetchResult<crate::types::page::FetchedPage> {
            if url.contains("/boom") {
                panic!("fetcher exploded on {}", url);
            }
            self.0.fetch(url).await
        }
    }

    #[tokio::test]
    async fn test_panicking_fetch_abandons_url_and_job_terminates() {
        let site = StaticSite::new("https://example.com")
            .page("/", &["/boom-page", "/2023/05/01/soup"])
            .page("/2023/05/01/soup", &[]);
        let orch = CrawlOrchestrator::new(FetchStrategySelector::new(Arc::new(
            PanickingFetcher(site.fetcher()),
        )))
        .with_config(fast_config());

        let report = tokio::time::timeout(
            Duration::from_secs(5),
            orch.run(
                "https://example.com/",
                SiteConfig::new("example.com"),
                CrawlBudget::new(5),
            ),
        )
        .await
        .expect("job must terminate after a panicking fetch");

        assert_eq!(report.state, JobState::Completed);
        assert_eq!(report.stats.fetch_failures, 1);
        assert_eq!(report.stats.fetched, 2);
    }

    #[tokio::test]
    async fn test_stop_during_retry_is_not_a_failure() {
        let fetcher = MockFetcher::new()
            .with_error("https://example.com/", FetchError::timeout("https://example.com/"));
        let report = orchestrator(fetcher)
            .with_config(fast_config().with_workers(1).with_retries(2, 10_000))
            .run(
                "https://example.com/",
                SiteConfig::new("example.com"),
                CrawlBudget::new(5).with_time_limit(Duration::from_millis(200)),
            )
            .await;

        assert_eq!(report.state, JobState::BudgetedOut(BudgetReason::Deadline));
        assert_eq!(report.stats.retries, 1);
        assert_eq!(report.stats.fetch_failures, 0);
    }

    #[tokio::test]
    async fn test_unrepresentable_politeness_delay_is_setup_error() {
        for secs in [f64::INFINITY, f64::NAN, -1.0, 1e300] {
            let orch = orchestrator(MockFetcher::new())
                .with_config(fast_config().with_politeness_delay(secs));
            let err = orch
                .prepare(
                    "https://example.com/",
                    SiteConfig::new("example.com"),
                    CrawlBudget::default(),
                )
                .unwrap_err();
            assert!(matches!(err, JobSetupError::InvalidConfig { .. }));
        }
    }
}
