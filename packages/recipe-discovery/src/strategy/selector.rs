//! Fetch strategy selector.
//!
//! Tries the cheap fetcher first, falls back to the anti-scraping fetcher
//! when the site is known to block or when the cheap response looks like a
//! block (empty body, soft-block page, 403/429/503).

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::strategy::soft_block::SoftBlockDetector;
use crate::traits::fetcher::Fetcher;
use crate::types::page::{FetchOutcome, FetchedPage};
use crate::types::site::SiteConfig;
use crate::types::stats::CrawlStats;

/// How a single fetch attempt came out.
enum Assessment {
    Usable(FetchedPage),
    /// The site refused us; worth one try with the fallback
    Blocked(FetchError),
    Failed(FetchError),
}

/// Picks a fetcher per request and escalates on blocking.
///
/// # Example
///
/// ```rust,ignore
/// let selector = FetchStrategySelector::new(Arc::new(HttpFetcher::new(timeout)?))
///     .with_fallback(Arc::new(FirecrawlFetcher::new(api_key)?));
/// let outcome = selector.fetch(url, &site, &stats).await?;
/// ```
#[derive(Clone)]
pub struct FetchStrategySelector {
    cheap: Arc<dyn Fetcher>,
    fallback: Option<Arc<dyn Fetcher>>,
    detector: SoftBlockDetector,
}

impl FetchStrategySelector {
    /// Selector with only a cheap fetcher; escalation is disabled.
    pub fn new(cheap: Arc<dyn Fetcher>) -> Self {
        Self {
            cheap,
            fallback: None,
            detector: SoftBlockDetector::default(),
        }
    }

    /// Enable escalation to a fallback fetcher.
    pub fn with_fallback(mut self, fallback: Arc<dyn Fetcher>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Optional fallback; `None` leaves escalation disabled.
    pub fn with_optional_fallback(mut self, fallback: Option<Arc<dyn Fetcher>>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Replace the soft-block detector.
    pub fn with_detector(mut self, detector: SoftBlockDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Fetch a link-discovered URL.
    pub async fn fetch(
        &self,
        url: &str,
        site: &SiteConfig,
        stats: &CrawlStats,
    ) -> FetchResult<FetchOutcome> {
        self.fetch_inner(url, site, stats, false).await
    }

    /// Fetch an entry URL; on fallback failure the site's alternate entry
    /// points are walked in order.
    pub async fn fetch_entry(
        &self,
        url: &str,
        site: &SiteConfig,
        stats: &CrawlStats,
    ) -> FetchResult<FetchOutcome> {
        self.fetch_inner(url, site, stats, true).await
    }

    /// Go straight to the fallback (used by retries after a first failure).
    ///
    /// Without a configured fallback this is a plain cheap fetch.
    pub async fn fetch_via_fallback(
        &self,
        url: &str,
        site: &SiteConfig,
        stats: &CrawlStats,
        walk_alternates: bool,
    ) -> FetchResult<FetchOutcome> {
        match &self.fallback {
            Some(fallback) => {
                stats.record_fallback();
                self.run_fallback(fallback.as_ref(), url, site, walk_alternates)
                    .await
            }
            None => self.cheap_only(url).await,
        }
    }

    async fn fetch_inner(
        &self,
        url: &str,
        site: &SiteConfig,
        stats: &CrawlStats,
        walk_alternates: bool,
    ) -> FetchResult<FetchOutcome> {
        let Some(fallback) = &self.fallback else {
            if site.known_anti_scraping {
                warn!(url = %url, host = %site.host, "Site flagged anti-scraping but no fallback configured");
            }
            return self.cheap_only(url).await;
        };

        if site.known_anti_scraping {
            debug!(url = %url, fetcher = fallback.name(), "Known anti-scraping site, using fallback");
            stats.record_fallback();
            return self
                .run_fallback(fallback.as_ref(), url, site, walk_alternates)
                .await;
        }

        match self.assess(url, self.cheap.fetch(url).await) {
            Assessment::Usable(page) => Ok(FetchOutcome {
                page,
                used_fallback: false,
            }),
            Assessment::Failed(err) => Err(err),
            Assessment::Blocked(err) => {
                warn!(
                    url = %url,
                    error = %err,
                    fetcher = fallback.name(),
                    "Cheap fetcher blocked, falling back"
                );
                stats.record_fallback();
                self.run_fallback(fallback.as_ref(), url, site, walk_alternates)
                    .await
            }
        }
    }

    async fn cheap_only(&self, url: &str) -> FetchResult<FetchOutcome> {
        match self.assess(url, self.cheap.fetch(url).await) {
            Assessment::Usable(page) => Ok(FetchOutcome {
                page,
                used_fallback: false,
            }),
            Assessment::Blocked(err) | Assessment::Failed(err) => Err(err),
        }
    }

    async fn run_fallback(
        &self,
        fallback: &dyn Fetcher,
        url: &str,
        site: &SiteConfig,
        walk_alternates: bool,
    ) -> FetchResult<FetchOutcome> {
        let primary_err = match self.assess(url, fallback.fetch(url).await) {
            Assessment::Usable(page) => {
                return Ok(FetchOutcome {
                    page,
                    used_fallback: true,
                })
            }
            Assessment::Blocked(err) | Assessment::Failed(err) => err,
        };

        if !walk_alternates || site.alternate_entry_points.is_empty() {
            return Err(primary_err);
        }

        debug!(
            url = %url,
            alternates = site.alternate_entry_points.len(),
            "Primary entry failed via fallback, walking alternate entry points"
        );
        for alternate in &site.alternate_entry_points {
            if alternate == url {
                continue;
            }
            match self.assess(alternate, fallback.fetch(alternate).await) {
                Assessment::Usable(page) => {
                    debug!(url = %url, alternate = %alternate, "Alternate entry point succeeded");
                    return Ok(FetchOutcome {
                        page,
                        used_fallback: true,
                    });
                }
                Assessment::Blocked(err) | Assessment::Failed(err) => {
                    debug!(alternate = %alternate, error = %err, "Alternate entry point failed");
                }
            }
        }

        Err(primary_err)
    }

    fn assess(&self, url: &str, result: FetchResult<FetchedPage>) -> Assessment {
        match result {
            Ok(page) if page.is_success() => match self.detector.inspect(&page) {
                None => Assessment::Usable(page),
                Some(block) => Assessment::Blocked(FetchError::transient(
                    url,
                    format!("soft block: {}", block),
                )),
            },
            Ok(page) => {
                let err = FetchError::from_status(url, page.status);
                if err.is_blocking() {
                    Assessment::Blocked(err)
                } else {
                    Assessment::Failed(err)
                }
            }
            Err(err) if err.is_blocking() => Assessment::Blocked(err),
            Err(err) => Assessment::Failed(err),
        }
    }
}
