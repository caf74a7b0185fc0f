//! Configuration types for classification and crawling.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::classification::MIN_RECIPE_SCORE;

/// Scoring knobs for the URL classifier.
///
/// The numbers are policy, not structure. What must hold is the ordering
/// exclusion > date override > pattern match > keyword-only, which
/// [`ScoringConfig::validate`] enforces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Score assigned to excluded URLs. Default: 100.
    pub exclusion_score: u8,

    /// Bonus for the first matching recipe path pattern. Default: 40.
    pub recipe_pattern_bonus: u8,

    /// Points per vocabulary keyword found in the last path segment. Default: 10.
    pub per_keyword: u8,

    /// Ceiling on the keyword contribution. Default: 30.
    pub keyword_cap: u8,

    /// Bonus for the first matching category pattern. Default: 40.
    pub category_bonus: u8,

    /// Minimum recipe score for a `Recipe` verdict. Default: 40.
    pub recipe_threshold: u8,

    /// Score floor applied by the date override. Default: 70.
    pub date_floor: u8,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            exclusion_score: 100,
            recipe_pattern_bonus: 40,
            per_keyword: 10,
            keyword_cap: 30,
            category_bonus: 40,
            recipe_threshold: 40,
            date_floor: 70,
        }
    }
}

impl ScoringConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the keyword weighting.
    pub fn with_keywords(mut self, per_keyword: u8, cap: u8) -> Self {
        self.per_keyword = per_keyword;
        self.keyword_cap = cap;
        self
    }

    /// Set the pattern bonuses.
    pub fn with_bonuses(mut self, recipe: u8, category: u8) -> Self {
        self.recipe_pattern_bonus = recipe;
        self.category_bonus = category;
        self
    }

    /// Set the date override floor.
    pub fn with_date_floor(mut self, floor: u8) -> Self {
        self.date_floor = floor;
        self
    }

    /// Check that the knobs preserve the signal ordering.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordering = |msg: &str| Err(ConfigError::Ordering(msg.to_string()));

        if [
            self.exclusion_score,
            self.recipe_pattern_bonus,
            self.keyword_cap,
            self.category_bonus,
            self.recipe_threshold,
            self.date_floor,
        ]
        .iter()
        .any(|v| *v > 100)
        {
            return ordering("scores must be within [0, 100]");
        }
        if self.exclusion_score < self.date_floor {
            return ordering("exclusion_score must be >= date_floor");
        }
        if self.date_floor <= self.recipe_pattern_bonus {
            return ordering("date_floor must exceed recipe_pattern_bonus");
        }
        if self.recipe_pattern_bonus <= self.keyword_cap {
            return ordering("recipe_pattern_bonus must exceed keyword_cap");
        }
        if self.recipe_threshold < MIN_RECIPE_SCORE {
            return ordering("recipe_threshold must be at least 40");
        }
        if self.recipe_threshold > self.recipe_pattern_bonus {
            return ordering("recipe_threshold must not exceed recipe_pattern_bonus");
        }
        if self.date_floor < self.recipe_threshold {
            return ordering("date_floor must be >= recipe_threshold");
        }
        Ok(())
    }
}

/// Per-job crawl behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Workers draining the frontier concurrently. Default: 4.
    pub worker_count: usize,

    /// Delay between one fetch completing and the same worker's next dispatch.
    ///
    /// Default: 1.0 second.
    pub politeness_delay_secs: f64,

    /// Random spread applied to the politeness delay (0.0 to 1.0).
    ///
    /// 0.5 means the delay lands in `[0.5 × delay, 1.5 × delay]`. Default: 0.5.
    pub politeness_jitter: f64,

    /// Retries for transient failures before a URL is abandoned. Default: 2.
    pub max_retries: u32,

    /// Linear backoff step between retries. Default: 500ms.
    pub retry_backoff_ms: u64,

    /// Upper bound on a single fetch. Default: 30 seconds.
    pub fetch_timeout_secs: u64,

    /// How long an idle worker waits on an empty frontier before re-checking.
    ///
    /// Default: 500ms.
    pub frontier_wait_ms: u64,

    /// Only follow links on the site's own host. Default: true.
    pub same_host_only: bool,

    /// Push the site's alternate entry points at depth 0 along with the seed.
    ///
    /// Default: false (alternates are only walked by the fallback fetcher).
    pub seed_alternate_entry_points: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            politeness_delay_secs: 1.0,
            politeness_jitter: 0.5,
            max_retries: 2,
            retry_backoff_ms: 500,
            fetch_timeout_secs: 30,
            frontier_wait_ms: 500,
            same_host_only: true,
            seed_alternate_entry_points: false,
        }
    }
}

impl CrawlConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker pool size.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.worker_count = workers;
        self
    }

    /// Set the politeness delay in seconds.
    pub fn with_politeness_delay(mut self, secs: f64) -> Self {
        self.politeness_delay_secs = secs;
        self
    }

    /// Set the politeness jitter fraction.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.politeness_jitter = jitter;
        self
    }

    /// Set retry count and backoff step.
    pub fn with_retries(mut self, max_retries: u32, backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff_ms = backoff_ms;
        self
    }

    /// Set the per-fetch timeout.
    pub fn with_fetch_timeout(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = secs;
        self
    }

    /// Set the idle frontier wait.
    pub fn with_frontier_wait(mut self, ms: u64) -> Self {
        self.frontier_wait_ms = ms;
        self
    }

    /// Allow links to other hosts.
    pub fn allow_cross_host(mut self) -> Self {
        self.same_host_only = false;
        self
    }

    /// Seed alternate entry points into the frontier.
    pub fn seed_alternates(mut self) -> Self {
        self.seed_alternate_entry_points = true;
        self
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.politeness_delay_secs.max(0.0)).unwrap_or(Duration::ZERO)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn frontier_wait(&self) -> Duration {
        Duration::from_millis(self.frontier_wait_ms.max(1))
    }

}

/// Discovery budget for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlBudget {
    /// Stop once this many recipe URLs were discovered. Default: 5.
    pub max_recipe_urls: usize,

    /// Links deeper than this are never enqueued (seed is depth 0). Default: 3.
    pub max_depth: usize,

    /// Cap on dequeued URLs (the iteration cap). Default: 200.
    pub max_fetches: Option<usize>,

    /// Wall-clock limit for the job. Default: none.
    pub time_limit: Option<Duration>,
}

impl Default for CrawlBudget {
    fn default() -> Self {
        Self {
            max_recipe_urls: 5,
            max_depth: 3,
            max_fetches: Some(200),
            time_limit: None,
        }
    }
}

impl CrawlBudget {
    pub fn new(max_recipe_urls: usize) -> Self {
        Self {
            max_recipe_urls,
            ..Default::default()
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_fetches(mut self, fetches: usize) -> Self {
        self.max_fetches = Some(fetches);
        self
    }

    pub fn unlimited_fetches(mut self) -> Self {
        self.max_fetches = None;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }
}

/// Outer layer: how many site jobs run and how they are grouped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Sites per batch; batches run one after another. Default: 20.
    pub site_batch_size: usize,

    /// Site jobs running concurrently within a batch. Default: 4.
    pub site_concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            site_batch_size: 20,
            site_concurrency: 4,
        }
    }
}

impl BatchConfig {
    pub fn new(site_batch_size: usize, site_concurrency: usize) -> Self {
        Self {
            site_batch_size,
            site_concurrency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scoring_is_valid() {
        assert!(ScoringConfig::default().validate().is_ok());
    }

    #[test]
    fn test_keyword_cap_must_stay_below_pattern() {
        let config = ScoringConfig::default().with_keywords(20, 50);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_date_floor_must_beat_pattern() {
        let config = ScoringConfig::default().with_date_floor(40);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_crawl_config_builder() {
        let config = CrawlConfig::new()
            .with_workers(8)
            .with_politeness_delay(0.25)
            .with_retries(3, 100)
            .allow_cross_host();

        assert_eq!(config.worker_count, 8);
        assert_eq!(config.politeness_delay(), Duration::from_millis(250));
        assert_eq!(config.retry_backoff_ms, 100);
        assert!(!config.same_host_only);
    }

    #[test]
    fn test_unrepresentable_politeness_delay_does_not_panic() {
        for secs in [f64::INFINITY, f64::NAN, -3.0, 1e300] {
            let config = CrawlConfig::new().with_politeness_delay(secs);
            assert_eq!(config.politeness_delay(), Duration::ZERO);
        }
    }

    #[test]
    fn test_budget_builder() {
        let budget = CrawlBudget::new(10).with_max_depth(1).unlimited_fetches();
        assert_eq!(budget.max_recipe_urls, 10);
        assert_eq!(budget.max_depth, 1);
        assert!(budget.max_fetches.is_none());
    }
}
