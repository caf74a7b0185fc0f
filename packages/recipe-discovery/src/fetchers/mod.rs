//! Fetcher implementations.

pub mod http;

#[cfg(feature = "firecrawl")]
pub mod firecrawl;

pub use http::HttpFetcher;

#[cfg(feature = "firecrawl")]
pub use firecrawl::FirecrawlFetcher;
