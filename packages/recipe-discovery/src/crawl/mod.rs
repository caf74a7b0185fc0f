//! Crawl jobs, the worker-pool orchestrator and the batch layer.

pub mod batch;
pub mod job;
pub mod orchestrator;
pub mod retry;

pub use batch::{BatchReport, BatchRunner, SiteSeed};
pub use job::{BudgetReason, CrawlJob, CrawlReport, JobState};
pub use orchestrator::CrawlOrchestrator;
pub use retry::RetryPolicy;
