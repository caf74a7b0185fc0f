//! Crawl job state and reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::frontier::Frontier;
use crate::types::classification::UrlClassification;
use crate::types::config::{CrawlBudget, CrawlConfig};
use crate::types::site::SiteConfig;
use crate::types::stats::{CrawlStats, StatsSnapshot};

/// Why a job stopped before its frontier emptied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetReason {
    /// `max_recipe_urls` reached
    RecipeLimit,
    /// `max_fetches` reached
    FetchLimit,
    /// Frontier drained, but links were dropped for depth
    DepthLimit,
    /// `time_limit` expired
    Deadline,
    /// External stop signal
    Cancelled,
}

/// Lifecycle of a crawl job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Running,
    /// Frontier emptied before any budget was hit
    Completed,
    BudgetedOut(BudgetReason),
    /// Setup failed; nothing was fetched
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Idle | JobState::Running)
    }
}

/// Everything that survives a finished job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    pub job_id: Uuid,
    pub seed_url: String,
    pub host: String,
    pub state: JobState,

    /// Discovered recipe URLs with their score and features, in discovery order
    pub recipes: Vec<UrlClassification>,

    pub stats: StatsSnapshot,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_error: Option<String>,
}

impl CrawlReport {
    /// Report for a job that failed before or instead of crawling.
    pub fn failed(
        job_id: Uuid,
        seed_url: &str,
        host: &str,
        error: impl ToString,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id,
            seed_url: seed_url.to_string(),
            host: host.to_string(),
            state: JobState::Failed,
            recipes: Vec::new(),
            stats: StatsSnapshot::default(),
            started_at,
            finished_at: Utc::now(),
            setup_error: Some(error.to_string()),
        }
    }

    pub fn recipe_urls(&self) -> Vec<&str> {
        self.recipes.iter().map(|r| r.url.as_str()).collect()
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// One site's crawl: the frontier, visited set and counters it owns exclusively.
///
/// Workers hold it behind an `Arc`; nothing in it is shared with other jobs.
#[derive(Debug)]
pub struct CrawlJob {
    pub id: Uuid,
    pub seed_url: String,
    pub site: SiteConfig,
    pub budget: CrawlBudget,
    pub config: CrawlConfig,
    pub frontier: Frontier,
    pub stats: CrawlStats,
    pub started_at: DateTime<Utc>,
}

impl CrawlJob {
    pub fn new(seed_url: String, site: SiteConfig, budget: CrawlBudget, config: CrawlConfig) -> Self {
        let frontier = Frontier::new(budget.max_depth, budget.max_recipe_urls);
        Self {
            id: Uuid::now_v7(),
            seed_url,
            site,
            budget,
            config,
            frontier,
            stats: CrawlStats::new(),
            started_at: Utc::now(),
        }
    }

    /// Claim one slot of the fetch budget. `false` once the budget is spent.
    pub fn try_dispatch(&self) -> bool {
        self.stats
            .try_dispatch(self.budget.max_fetches.map(|max| max as u64))
    }

    /// Snapshot the job's surviving state into a report.
    pub fn report(&self, state: JobState) -> CrawlReport {
        CrawlReport {
            job_id: self.id,
            seed_url: self.seed_url.clone(),
            host: self.site.host.clone(),
            state,
            recipes: self.frontier.recipes(),
            stats: self.stats.snapshot(),
            started_at: self.started_at,
            finished_at: Utc::now(),
            setup_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_state_serialization() {
        let json = serde_json::to_value(JobState::BudgetedOut(BudgetReason::RecipeLimit)).unwrap();
        assert_eq!(json["state"], "budgeted_out");
        assert_eq!(json["reason"], "recipe_limit");

        let json = serde_json::to_value(JobState::Completed).unwrap();
        assert_eq!(json["state"], "completed");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Running.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::BudgetedOut(BudgetReason::Deadline).is_terminal());
    }

    #[test]
    fn test_fetch_budget() {
        let job = CrawlJob::new(
            "https://a.com/".into(),
            SiteConfig::new("a.com"),
            CrawlBudget::new(5).with_max_fetches(1),
            CrawlConfig::default(),
        );
        assert!(job.try_dispatch());
        assert!(!job.try_dispatch());
        assert!(!job.try_dispatch());
        assert_eq!(job.stats.snapshot().dispatched, 1);
    }
}
