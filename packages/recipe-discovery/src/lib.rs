//! Recipe Discovery Library
//!
//! Finds recipe pages on arbitrary websites by crawling outward from a seed
//! URL, classifying every discovered link, and deciding which links are worth
//! fetching next.
//!
//! # Design Philosophy
//!
//! - URL shape first: a pure classifier scores every link before anything is fetched
//! - Recipe-shaped leads before hub pages, hub pages before unknown links
//! - Cheap fetches by default, escalation only when a site pushes back
//! - Every job is budget-bounded and returns partial results
//!
//! # Usage
//!
//! ```rust,ignore
//! use recipe_discovery::{
//!     CrawlBudget, CrawlOrchestrator, FetchStrategySelector, HttpFetcher, SiteConfig,
//! };
//! use std::sync::Arc;
//!
//! let selector = FetchStrategySelector::new(Arc::new(HttpFetcher::new(timeout)?));
//! let orchestrator = CrawlOrchestrator::new(selector);
//!
//! let site = SiteConfig::for_seed("https://example.com/")?;
//! let report = orchestrator
//!     .run("https://example.com/", site, CrawlBudget::new(5))
//!     .await;
//! ```
//!
//! # Modules
//!
//! - [`classifier`] - URL classification (recipe, category, excluded, unknown)
//! - [`frontier`] - Priority frontier with the per-job visited set
//! - [`strategy`] - Cheap-then-fallback fetch selection and soft-block detection
//! - [`crawl`] - Crawl jobs, the worker-pool orchestrator, and the batch runner
//! - [`fetchers`] - Fetcher implementations (HTTP, Firecrawl)
//! - [`extractors`] - Link extraction from HTML
//! - [`traits`] - Fetcher and link-extractor seams
//! - [`testing`] - Mock fetchers and in-memory sites for testing

pub mod classifier;
pub mod crawl;
pub mod error;
pub mod extractors;
pub mod fetchers;
pub mod frontier;
pub mod strategy;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{
    BatchError, BatchResult, ClassificationError, ConfigError, FetchError, FetchResult,
    JobSetupError, SetupResult,
};
pub use traits::{fetcher::Fetcher, link_extractor::LinkExtractor};
pub use types::{
    classification::{CategorizedUrls, UrlClassification, UrlDate, UrlKind, MIN_RECIPE_SCORE},
    config::{BatchConfig, CrawlBudget, CrawlConfig, ScoringConfig},
    page::{FetchOutcome, FetchedPage},
    site::SiteConfig,
    stats::{CrawlStats, StatsSnapshot},
};

// Re-export classifier
pub use classifier::{classify, PatternCatalog, UrlClassifier};

// Re-export frontier
pub use frontier::{normalize_url, Frontier, FrontierEntry, FrontierPoll, PushOutcome};

// Re-export strategy
pub use strategy::{FetchStrategySelector, SoftBlock, SoftBlockDetector};

// Re-export crawl
pub use crawl::{
    BatchReport, BatchRunner, BudgetReason, CrawlJob, CrawlOrchestrator, CrawlReport, JobState,
    RetryPolicy, SiteSeed,
};

// Re-export fetchers and extractors
pub use extractors::HtmlLinkExtractor;
pub use fetchers::HttpFetcher;

#[cfg(feature = "firecrawl")]
pub use fetchers::FirecrawlFetcher;

// Re-export testing utilities
pub use testing::{EndlessSite, MockFetcher, StaticSite};
